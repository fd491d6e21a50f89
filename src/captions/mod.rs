//! Caption retrieval for ShortIt.
//!
//! Provides a trait-based interface over caption sources. The default source
//! shells out to yt-dlp and reads YouTube's json3 caption format.

mod video_id;
mod youtube;

pub use video_id::VideoId;
pub use youtube::{parse_json3, YtDlpCaptionProvider};

use crate::config::Settings;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One timed caption line from a video's transcript track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionEntry {
    /// Start time in seconds.
    pub start: f64,
    /// Duration in seconds.
    pub duration: f64,
    /// Caption text.
    pub text: String,
}

impl CaptionEntry {
    pub fn new(start: f64, duration: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            duration,
            text: text.into(),
        }
    }

    /// End time in seconds.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Trait for caption providers.
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    /// Short provider name for logs and diagnostics.
    fn name(&self) -> &str;

    /// Fetch the full caption list for a video, ordered by start time.
    async fn fetch_captions(&self, video_id: &VideoId) -> Result<Vec<CaptionEntry>>;
}

/// Create the caption provider described by the settings.
pub fn create_provider(settings: &Settings) -> Arc<dyn CaptionProvider> {
    Arc::new(YtDlpCaptionProvider::from_settings(settings))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::ShortitError;

    /// Provider that serves a fixed caption list for every video.
    pub struct FixedCaptions {
        entries: Vec<CaptionEntry>,
    }

    impl FixedCaptions {
        pub fn new(entries: Vec<CaptionEntry>) -> Self {
            Self { entries }
        }

        /// The three-line track used throughout the tests.
        pub fn hello_world() -> Self {
            Self::new(vec![
                CaptionEntry::new(0.0, 5.0, "hello"),
                CaptionEntry::new(5.0, 5.0, "world"),
                CaptionEntry::new(12.0, 3.0, "late"),
            ])
        }
    }

    #[async_trait]
    impl CaptionProvider for FixedCaptions {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch_captions(&self, _video_id: &VideoId) -> Result<Vec<CaptionEntry>> {
            Ok(self.entries.clone())
        }
    }

    /// Provider that always fails as if the captions service were down.
    pub struct UnavailableCaptions;

    #[async_trait]
    impl CaptionProvider for UnavailableCaptions {
        fn name(&self) -> &str {
            "unavailable"
        }

        async fn fetch_captions(&self, video_id: &VideoId) -> Result<Vec<CaptionEntry>> {
            Err(ShortitError::CaptionsUnavailable(format!(
                "no captions for {}",
                video_id
            )))
        }
    }
}
