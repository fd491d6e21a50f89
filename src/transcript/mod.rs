//! Transcript windowing.
//!
//! Selects the caption entries that start inside a time window and joins
//! their text into the string handed to the summarizer.

mod format;

pub use format::{format_transcript, CaptionExport, OutputFormat, TranscriptExport};

use crate::captions::{CaptionEntry, CaptionProvider, VideoId};
use crate::error::{Result, ShortitError};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// A closed time interval in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    /// Create a window, rejecting negative, non-finite or inverted bounds.
    ///
    /// The window is not checked against the video length.
    pub fn new(start: f64, end: f64) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(ShortitError::InvalidTimeWindow(format!(
                "bounds must be finite (got {} to {})",
                start, end
            )));
        }
        if start < 0.0 || end < 0.0 {
            return Err(ShortitError::InvalidTimeWindow(format!(
                "bounds must not be negative (got {} to {})",
                start, end
            )));
        }
        if start > end {
            return Err(ShortitError::InvalidTimeWindow(format!(
                "start {}s is after end {}s",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Whether `t` lies in `[start, end]`.
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - {}",
            format_timestamp(self.start),
            format_timestamp(self.end)
        )
    }
}

/// Captions of one video restricted to a time window.
#[derive(Debug, Clone, Serialize)]
pub struct WindowedTranscript {
    pub video_id: VideoId,
    pub window: TimeWindow,
    /// Matching entries in their original order.
    pub entries: Vec<CaptionEntry>,
    /// Entry texts, each preceded by a single space.
    pub text: String,
}

impl WindowedTranscript {
    /// Number of whitespace-separated words in the text.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Keep the entries whose start time lies in the window.
///
/// An entry that begins before `window.start` is excluded even if it is still
/// on screen inside the window; one that begins at or before `window.end` is
/// included even if it runs past it.
pub fn window_captions(entries: &[CaptionEntry], window: &TimeWindow) -> Vec<CaptionEntry> {
    entries
        .iter()
        .filter(|entry| window.contains(entry.start))
        .cloned()
        .collect()
}

/// Join caption texts, each preceded by one space.
pub fn join_caption_text(entries: &[CaptionEntry]) -> String {
    entries.iter().map(|e| format!(" {}", e.text)).collect()
}

/// Fetches captions and cuts them down to a time window.
#[derive(Clone)]
pub struct TranscriptWindower {
    provider: Arc<dyn CaptionProvider>,
}

impl TranscriptWindower {
    pub fn new(provider: Arc<dyn CaptionProvider>) -> Self {
        Self { provider }
    }

    /// Windowed transcript for a video URL and a `[start, end]` range in seconds.
    pub async fn extract(&self, video_url: &str, start: f64, end: f64) -> Result<WindowedTranscript> {
        let video_id = VideoId::parse(video_url)?;
        let window = TimeWindow::new(start, end)?;
        self.extract_window(&video_id, window).await
    }

    /// Windowed transcript for an already parsed id and window.
    #[instrument(skip(self), fields(video_id = %video_id, provider = self.provider.name()))]
    pub async fn extract_window(
        &self,
        video_id: &VideoId,
        window: TimeWindow,
    ) -> Result<WindowedTranscript> {
        let captions = self.provider.fetch_captions(video_id).await?;
        let entries = window_captions(&captions, &window);

        debug!(
            "{} of {} caption entries start inside {}",
            entries.len(),
            captions.len(),
            window
        );

        if entries.is_empty() {
            return Err(ShortitError::EmptyTranscript {
                start: window.start,
                end: window.end,
            });
        }

        let text = join_caption_text(&entries);
        info!("Windowed transcript has {} entries", entries.len());

        Ok(WindowedTranscript {
            video_id: video_id.clone(),
            window,
            entries,
            text,
        })
    }
}

/// Format seconds as MM:SS or HH:MM:SS.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
