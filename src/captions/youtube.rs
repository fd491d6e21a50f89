//! YouTube captions via yt-dlp.

use super::{CaptionEntry, CaptionProvider, VideoId};
use crate::config::Settings;
use crate::error::{Result, ShortitError};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Caption provider backed by the yt-dlp executable.
pub struct YtDlpCaptionProvider {
    ytdlp_path: String,
    languages: Vec<String>,
    temp_dir: PathBuf,
    timeout: Duration,
}

impl YtDlpCaptionProvider {
    pub fn new(
        ytdlp_path: impl Into<String>,
        languages: Vec<String>,
        temp_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
            languages,
            temp_dir: temp_dir.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.captions.ytdlp_path.clone(),
            settings.captions.languages.clone(),
            settings.temp_dir(),
            Duration::from_secs(settings.captions.timeout_seconds),
        )
    }

    /// Download the caption track(s) for a video into `dir`.
    async fn download_tracks(&self, video_id: &VideoId, dir: &Path) -> Result<()> {
        let template = dir.join("%(id)s.%(ext)s");
        let languages = self.languages.join(",");

        let mut command = Command::new(&self.ytdlp_path);
        command
            .arg("--skip-download")
            .arg("--write-subs")
            .arg("--write-auto-subs")
            .arg("--sub-format").arg("json3")
            .arg("--sub-langs").arg(&languages)
            .arg("--output").arg(template.to_str().unwrap_or_default())
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("--no-warnings")
            .arg(video_id.watch_url())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let result = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                ShortitError::ToolFailed(format!(
                    "{} timed out after {}s",
                    self.ytdlp_path,
                    self.timeout.as_secs()
                ))
            })?;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ShortitError::ToolNotFound(self.ytdlp_path.clone()));
            }
            Err(e) => {
                return Err(ShortitError::ToolFailed(format!(
                    "{} execution failed: {e}",
                    self.ytdlp_path
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ShortitError::CaptionsUnavailable(format!(
                "yt-dlp failed for {}: {}",
                video_id,
                stderr.trim()
            )));
        }

        Ok(())
    }

    /// Pick the downloaded track for the most preferred language.
    fn select_track(&self, video_id: &VideoId, dir: &Path) -> Result<PathBuf> {
        let mut tracks: Vec<PathBuf> = std::fs::read_dir(dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json3"))
            .collect();
        tracks.sort();

        for language in &self.languages {
            let expected = dir.join(format!("{}.{}.json3", video_id, language));
            if tracks.contains(&expected) {
                return Ok(expected);
            }
        }

        // Language patterns like "en.*" produce names we cannot predict
        tracks.into_iter().next().ok_or_else(|| {
            ShortitError::CaptionsUnavailable(format!(
                "no captions available for video {} in languages [{}]",
                video_id,
                self.languages.join(", ")
            ))
        })
    }
}

#[async_trait]
impl CaptionProvider for YtDlpCaptionProvider {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    #[instrument(skip(self), fields(video_id = %video_id))]
    async fn fetch_captions(&self, video_id: &VideoId) -> Result<Vec<CaptionEntry>> {
        std::fs::create_dir_all(&self.temp_dir)?;
        let workdir = tempfile::Builder::new()
            .prefix("captions-")
            .tempdir_in(&self.temp_dir)?;

        info!("Fetching captions for {}", video_id);
        self.download_tracks(video_id, workdir.path()).await?;

        let track = self.select_track(video_id, workdir.path())?;
        debug!("Using caption track {:?}", track);

        let content = tokio::fs::read_to_string(&track).await?;
        let entries = parse_json3(&content)?;

        info!("Fetched {} caption entries", entries.len());
        Ok(entries)
    }
}

#[derive(Debug, Deserialize)]
struct Json3Track {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: f64,
    #[serde(default)]
    d_duration_ms: f64,
    #[serde(default)]
    segs: Vec<Json3Segment>,
}

#[derive(Debug, Deserialize)]
struct Json3Segment {
    #[serde(default)]
    utf8: String,
}

/// Parse a YouTube json3 caption track into caption entries ordered by start time.
///
/// Events without text (window styling, bare line breaks in auto captions)
/// are dropped.
pub fn parse_json3(content: &str) -> Result<Vec<CaptionEntry>> {
    let track: Json3Track = serde_json::from_str(content)?;

    let mut entries: Vec<CaptionEntry> = track
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
            let text = text.replace('\n', " ").trim().to_string();
            if text.is_empty() {
                return None;
            }
            Some(CaptionEntry::new(
                event.t_start_ms / 1000.0,
                event.d_duration_ms / 1000.0,
                text,
            ))
        })
        .collect();

    entries.sort_by(|a, b| a.start.total_cmp(&b.start));
    Ok(entries)
}
