//! Request pipeline for ShortIt.
//!
//! Ties caption windowing, summarization and term lookup together for one
//! "get summary" request.

use crate::captions::{create_provider, CaptionProvider, VideoId};
use crate::config::{Prompts, RequestDefaults, Settings};
use crate::error::{Result, ShortitError};
use crate::search::{locate_optional, TermSearch};
use crate::summarizer::{create_summarizer, Summarizer};
use crate::transcript::{TimeWindow, TranscriptWindower, WindowedTranscript};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Smallest accepted summary length in words.
pub const MIN_WORDS: usize = 50;
/// Largest accepted summary length in words.
pub const MAX_WORDS: usize = 500;
/// Summary lengths must be a multiple of this.
pub const WORDS_STEP: usize = 10;

/// One "get summary" request.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRequest {
    pub video_url: String,
    pub start: f64,
    pub end: f64,
    pub max_words: usize,
    pub search_term: Option<String>,
}

impl SummaryRequest {
    /// A request for `video_url` with window and length taken from `defaults`.
    pub fn new(video_url: impl Into<String>, defaults: &RequestDefaults) -> Self {
        Self {
            video_url: video_url.into(),
            start: defaults.start,
            end: defaults.end,
            max_words: defaults.words,
            search_term: None,
        }
    }

    pub fn with_window(mut self, start: f64, end: f64) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_max_words(mut self, max_words: usize) -> Self {
        self.max_words = max_words;
        self
    }

    pub fn with_search_term(mut self, term: Option<String>) -> Self {
        self.search_term = term;
        self
    }

    /// Check the word budget and parse the id and window.
    pub fn validate(&self) -> Result<(VideoId, TimeWindow)> {
        validate_max_words(self.max_words)?;
        let window = TimeWindow::new(self.start, self.end)?;
        let video_id = VideoId::parse(&self.video_url)?;
        Ok((video_id, window))
    }
}

/// Accept 50 to 500 words in steps of 10.
pub fn validate_max_words(max_words: usize) -> Result<()> {
    if !(MIN_WORDS..=MAX_WORDS).contains(&max_words) || max_words % WORDS_STEP != 0 {
        return Err(ShortitError::InvalidInput(format!(
            "summary length must be between {} and {} words in steps of {} (got {})",
            MIN_WORDS, MAX_WORDS, WORDS_STEP, max_words
        )));
    }
    Ok(())
}

/// Result of a successful request.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub video_id: VideoId,
    pub thumbnail_url: String,
    pub window: TimeWindow,
    /// Word count of the windowed transcript fed to the summarizer.
    pub transcript_words: usize,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<TermSearch>,
    /// Sentence describing `search`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_result: Option<String>,
}

/// Runs summary requests against a caption provider and a summarizer.
#[derive(Clone)]
pub struct Pipeline {
    windower: TranscriptWindower,
    summarizer: Arc<dyn Summarizer>,
}

impl Pipeline {
    /// Build the pipeline described by the settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let summarizer = create_summarizer(settings, prompts)?;
        info!(
            "Using {} captions and {} summarizer",
            settings.captions.ytdlp_path,
            summarizer.name()
        );
        Ok(Self::with_components(create_provider(settings), summarizer))
    }

    /// Build a pipeline from explicit components.
    pub fn with_components(
        provider: Arc<dyn CaptionProvider>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            windower: TranscriptWindower::new(provider),
            summarizer,
        }
    }

    pub fn summarizer_name(&self) -> String {
        self.summarizer.name()
    }

    /// Windowed transcript only, without summarizing.
    pub async fn transcript(&self, video_url: &str, start: f64, end: f64) -> Result<WindowedTranscript> {
        self.windower.extract(video_url, start, end).await
    }

    /// Run one request end to end. Any failing step aborts the request.
    #[instrument(skip(self, request), fields(url = %request.video_url, words = request.max_words))]
    pub async fn run(&self, request: &SummaryRequest) -> Result<SummaryReport> {
        let (video_id, window) = request.validate()?;
        let thumbnail_url = video_id.thumbnail_url();

        let transcript = self.windower.extract_window(&video_id, window).await?;
        debug!("Transcript window has {} words", transcript.word_count());

        let summary = self
            .summarizer
            .summarize(&transcript.text, request.max_words)
            .await?;
        info!("Summary has {} words", summary.split_whitespace().count());

        let search = locate_optional(&summary, request.search_term.as_deref());
        let search_result = search.as_ref().map(TermSearch::message);

        Ok(SummaryReport {
            video_id,
            thumbnail_url,
            window,
            transcript_words: transcript.word_count(),
            summary,
            search,
            search_result,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::summarizer::truncate_words;
    use async_trait::async_trait;

    /// Summarizer that echoes its input, capped at the word budget.
    pub struct EchoSummarizer;

    #[async_trait]
    impl Summarizer for EchoSummarizer {
        fn name(&self) -> String {
            "echo".to_string()
        }

        async fn summarize(&self, text: &str, max_words: usize) -> Result<String> {
            Ok(truncate_words(text, max_words))
        }
    }

    /// Summarizer that always fails to load its model.
    pub struct BrokenSummarizer;

    #[async_trait]
    impl Summarizer for BrokenSummarizer {
        fn name(&self) -> String {
            "broken".to_string()
        }

        async fn summarize(&self, _text: &str, _max_words: usize) -> Result<String> {
            Err(ShortitError::ModelUnavailable("hub unreachable".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{BrokenSummarizer, EchoSummarizer};
    use super::*;
    use crate::captions::testing::FixedCaptions;
    use crate::captions::CaptionEntry;
    use crate::error::{ErrorKind, NO_TRANSCRIPT_MESSAGE};

    const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    fn pipeline() -> Pipeline {
        Pipeline::with_components(Arc::new(FixedCaptions::hello_world()), Arc::new(EchoSummarizer))
    }

    fn request() -> SummaryRequest {
        SummaryRequest::new(URL, &RequestDefaults::default()).with_window(0.0, 10.0)
    }

    #[tokio::test]
    async fn test_run_produces_report() {
        let report = pipeline()
            .run(&request().with_search_term(Some("WORLD".to_string())))
            .await
            .unwrap();

        assert_eq!(report.video_id.as_str(), "dQw4w9WgXcQ");
        assert_eq!(report.thumbnail_url, "http://img.youtube.com/vi/dQw4w9WgXcQ/0.jpg");
        assert_eq!(report.summary, "hello world");
        assert_eq!(report.transcript_words, 2);
        assert_eq!(
            report.search_result.as_deref(),
            Some("The term 'WORLD' was found in the summary.")
        );
    }

    #[tokio::test]
    async fn test_empty_search_term_is_skipped() {
        let report = pipeline()
            .run(&request().with_search_term(Some(String::new())))
            .await
            .unwrap();

        assert!(report.search.is_none());
        assert!(report.search_result.is_none());

        let report = pipeline()
            .run(&request().with_search_term(Some("  ".to_string())))
            .await
            .unwrap();
        assert_eq!(report.search.map(|s| s.found), Some(false));
    }

    #[tokio::test]
    async fn test_summary_respects_word_budget() {
        let entries: Vec<CaptionEntry> = (0..200)
            .map(|i| CaptionEntry::new(i as f64 * 0.25, 0.25, format!("word{}", i)))
            .collect();
        let pipeline =
            Pipeline::with_components(Arc::new(FixedCaptions::new(entries)), Arc::new(EchoSummarizer));

        let report = pipeline
            .run(&request().with_window(0.0, 60.0).with_max_words(50))
            .await
            .unwrap();

        assert_eq!(report.transcript_words, 200);
        assert_eq!(report.summary.split_whitespace().count(), 50);
    }

    #[tokio::test]
    async fn test_empty_window_aborts_before_summarizing() {
        let pipeline = Pipeline::with_components(
            Arc::new(FixedCaptions::hello_world()),
            Arc::new(BrokenSummarizer),
        );
        let err = pipeline
            .run(&request().with_window(30.0, 40.0))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::EmptyResult);
        assert_eq!(err.to_string(), NO_TRANSCRIPT_MESSAGE);
    }

    #[tokio::test]
    async fn test_summarizer_failure_is_upstream() {
        let pipeline = Pipeline::with_components(
            Arc::new(FixedCaptions::hello_world()),
            Arc::new(BrokenSummarizer),
        );
        let err = pipeline.run(&request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
    }

    #[tokio::test]
    async fn test_malformed_url_is_input_error() {
        let mut req = request();
        req.video_url = "not a youtube link".to_string();

        let err = pipeline().run(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputError);
    }

    #[test]
    fn test_validate_max_words() {
        assert!(validate_max_words(50).is_ok());
        assert!(validate_max_words(250).is_ok());
        assert!(validate_max_words(500).is_ok());
        assert!(validate_max_words(40).is_err());
        assert!(validate_max_words(510).is_err());
        assert!(validate_max_words(255).is_err());
    }

    #[test]
    fn test_request_defaults() {
        let req = SummaryRequest::new(URL, &RequestDefaults::default());
        assert_eq!(req.start, 0.0);
        assert_eq!(req.end, 60.0);
        assert_eq!(req.max_words, 250);
        assert_eq!(req.search_term, None);
    }
}
