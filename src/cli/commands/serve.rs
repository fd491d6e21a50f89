//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for summaries and windowed transcripts.

use crate::captions::CaptionEntry;
use crate::cli::Output;
use crate::config::{RequestDefaults, Settings};
use crate::error::{ErrorKind, ShortitError};
use crate::pipeline::{Pipeline, SummaryReport, SummaryRequest};
use crate::transcript::TimeWindow;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Shared application state.
pub struct AppState {
    pipeline: Pipeline,
    defaults: RequestDefaults,
}

impl AppState {
    pub fn new(pipeline: Pipeline, defaults: RequestDefaults) -> Self {
        Self { pipeline, defaults }
    }
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/summarize", post(summarize))
        .route("/transcript", post(transcript))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(&settings)?;
    let summarizer = pipeline.summarizer_name();
    let state = Arc::new(AppState::new(pipeline, settings.defaults.clone()));
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("ShortIt API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    Output::kv("Summarizer", &summarizer);
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Summarize", "POST /summarize");
    Output::kv("Transcript", "POST /transcript");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct SummarizeBody {
    url: String,
    #[serde(default)]
    start: Option<f64>,
    #[serde(default)]
    end: Option<f64>,
    #[serde(default)]
    max_words: Option<usize>,
    #[serde(default)]
    search_term: Option<String>,
}

#[derive(Deserialize)]
struct TranscriptBody {
    url: String,
    #[serde(default)]
    start: Option<f64>,
    #[serde(default)]
    end: Option<f64>,
}

#[derive(Serialize)]
struct TranscriptResponse {
    video_id: String,
    window: TimeWindow,
    text: String,
    entries: Vec<CaptionEntry>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: ErrorKind,
}

/// A library error rendered as a JSON error response.
struct ApiError(ShortitError);

impl From<ShortitError> for ApiError {
    fn from(e: ShortitError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ShortitError::InvalidInput(rejection.body_text()))
    }
}

/// HTTP status for an error kind.
fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InputError => StatusCode::BAD_REQUEST,
        ErrorKind::EmptyResult => StatusCode::NOT_FOUND,
        ErrorKind::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        if kind != ErrorKind::InputError && kind != ErrorKind::EmptyResult {
            warn!("Request failed: {}", self.0);
        }
        (
            status_for(kind),
            Json(ErrorResponse {
                error: self.0.to_string(),
                kind,
            }),
        )
            .into_response()
    }
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn summarize(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SummarizeBody>, JsonRejection>,
) -> Result<Json<SummaryReport>, ApiError> {
    let Json(req) = body?;
    let defaults = &state.defaults;
    let request = SummaryRequest::new(req.url, defaults)
        .with_window(
            req.start.unwrap_or(defaults.start),
            req.end.unwrap_or(defaults.end),
        )
        .with_max_words(req.max_words.unwrap_or(defaults.words))
        .with_search_term(req.search_term);

    let report = state.pipeline.run(&request).await?;
    Ok(Json(report))
}

async fn transcript(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TranscriptBody>, JsonRejection>,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let Json(req) = body?;
    let transcript = state
        .pipeline
        .transcript(
            &req.url,
            req.start.unwrap_or(state.defaults.start),
            req.end.unwrap_or(state.defaults.end),
        )
        .await?;

    Ok(Json(TranscriptResponse {
        video_id: transcript.video_id.to_string(),
        window: transcript.window,
        text: transcript.text,
        entries: transcript.entries,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::testing::{FixedCaptions, UnavailableCaptions};
    use crate::captions::CaptionProvider;
    use crate::error::NO_TRANSCRIPT_MESSAGE;
    use crate::pipeline::testing::EchoSummarizer;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(provider: impl CaptionProvider + 'static) -> Router {
        let pipeline = Pipeline::with_components(Arc::new(provider), Arc::new(EchoSummarizer));
        router(Arc::new(AppState::new(pipeline, RequestDefaults::default())))
    }

    async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(FixedCaptions::hello_world())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_summarize_ok() {
        let (status, body) = post_json(
            app(FixedCaptions::hello_world()),
            "/summarize",
            serde_json::json!({
                "url": "https://youtu.be/dQw4w9WgXcQ",
                "end": 10,
                "search_term": "Hello"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["video_id"], "dQw4w9WgXcQ");
        assert_eq!(body["summary"], "hello world");
        assert_eq!(body["thumbnail_url"], "http://img.youtube.com/vi/dQw4w9WgXcQ/0.jpg");
        assert_eq!(body["search"]["found"], true);
        assert_eq!(
            body["search_result"],
            "The term 'Hello' was found in the summary."
        );
    }

    #[tokio::test]
    async fn test_bad_url_is_400() {
        let (status, body) = post_json(
            app(FixedCaptions::hello_world()),
            "/summarize",
            serde_json::json!({ "url": "https://example.com/watch" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "input_error");
    }

    #[tokio::test]
    async fn test_bad_word_count_is_400() {
        let (status, _) = post_json(
            app(FixedCaptions::hello_world()),
            "/summarize",
            serde_json::json!({ "url": "dQw4w9WgXcQ", "max_words": 42 }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        for body in [
            serde_json::json!({ "start": 0 }),
            serde_json::json!({ "url": "dQw4w9WgXcQ", "max_words": -50 }),
            serde_json::json!({ "url": "dQw4w9WgXcQ", "start": "zero" }),
        ] {
            let (status, response) =
                post_json(app(FixedCaptions::hello_world()), "/summarize", body.clone()).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
            assert_eq!(response["kind"], "input_error");
            assert!(response["error"].as_str().unwrap().starts_with("Invalid input"));
        }

        let (status, response) = post_json(
            app(FixedCaptions::hello_world()),
            "/transcript",
            serde_json::json!({ "end": 10 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["kind"], "input_error");
    }

    #[tokio::test]
    async fn test_empty_window_is_404_with_sentinel() {
        let (status, body) = post_json(
            app(FixedCaptions::hello_world()),
            "/summarize",
            serde_json::json!({ "url": "dQw4w9WgXcQ", "start": 100, "end": 200 }),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], NO_TRANSCRIPT_MESSAGE);
        assert_eq!(body["kind"], "empty_result");
    }

    #[tokio::test]
    async fn test_provider_failure_is_502() {
        let (status, body) = post_json(
            app(UnavailableCaptions),
            "/transcript",
            serde_json::json!({ "url": "dQw4w9WgXcQ" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "upstream_unavailable");
    }

    #[tokio::test]
    async fn test_transcript_ok() {
        let (status, body) = post_json(
            app(FixedCaptions::hello_world()),
            "/transcript",
            serde_json::json!({ "url": "dQw4w9WgXcQ", "start": 5, "end": 60 }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text"], " world late");
        assert_eq!(body["entries"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::Internal), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for(ErrorKind::UpstreamUnavailable), StatusCode::BAD_GATEWAY);
    }
}
