//! Error types for ShortIt.

use thiserror::Error;

/// Text shown when a time window contains no captions.
pub const NO_TRANSCRIPT_MESSAGE: &str = "No transcript found for the given time range.";

/// Library-level error type for ShortIt operations.
#[derive(Error, Debug)]
pub enum ShortitError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported YouTube URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid time range: {0}")]
    InvalidTimeWindow(String),

    #[error("Captions unavailable: {0}")]
    CaptionsUnavailable(String),

    #[error("{}", NO_TRANSCRIPT_MESSAGE)]
    EmptyTranscript { start: f64, end: f64 },

    #[error("Summarization model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Summarization failed: {0}")]
    Summarization(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Coarse classification of a [`ShortitError`].
///
/// Callers that only need to decide how to present a failure (banner text,
/// HTTP status) match on this instead of on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed URL, time range or request parameter.
    InputError,
    /// Captions provider, model repository or API could not be reached.
    UpstreamUnavailable,
    /// The request was valid but produced nothing to summarize.
    EmptyResult,
    /// Anything else.
    Internal,
}

impl ShortitError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShortitError::InvalidInput(_)
            | ShortitError::InvalidUrl(_)
            | ShortitError::InvalidTimeWindow(_) => ErrorKind::InputError,

            ShortitError::CaptionsUnavailable(_)
            | ShortitError::ToolNotFound(_)
            | ShortitError::ToolFailed(_)
            | ShortitError::ModelUnavailable(_)
            | ShortitError::OpenAI(_)
            | ShortitError::Http(_) => ErrorKind::UpstreamUnavailable,

            ShortitError::EmptyTranscript { .. } => ErrorKind::EmptyResult,

            ShortitError::Config(_)
            | ShortitError::Summarization(_)
            | ShortitError::Io(_)
            | ShortitError::Json(_)
            | ShortitError::TomlParse(_) => ErrorKind::Internal,
        }
    }
}

/// Result type alias for ShortIt operations.
pub type Result<T> = std::result::Result<T, ShortitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_transcript_message_is_sentinel() {
        let err = ShortitError::EmptyTranscript { start: 0.0, end: 10.0 };
        assert_eq!(err.to_string(), NO_TRANSCRIPT_MESSAGE);
        assert_eq!(err.kind(), ErrorKind::EmptyResult);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ShortitError::InvalidUrl("x".into()).kind(),
            ErrorKind::InputError
        );
        assert_eq!(
            ShortitError::ToolNotFound("yt-dlp".into()).kind(),
            ErrorKind::UpstreamUnavailable
        );
        assert_eq!(
            ShortitError::Summarization("boom".into()).kind(),
            ErrorKind::Internal
        );
    }
}
