//! Windowed transcript output formatting (text, JSON, SRT, VTT).

use super::WindowedTranscript;
use serde::Serialize;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
    Srt,
    Vtt,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "srt" => Ok(OutputFormat::Srt),
            "vtt" | "webvtt" => Ok(OutputFormat::Vtt),
            _ => Err(format!("Unknown format: {}. Use text, json, srt, or vtt.", s)),
        }
    }
}

/// JSON-serializable transcript for export.
#[derive(Debug, Serialize)]
pub struct TranscriptExport {
    pub video_id: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
    pub captions: Vec<CaptionExport>,
}

#[derive(Debug, Serialize)]
pub struct CaptionExport {
    pub text: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

impl From<&WindowedTranscript> for TranscriptExport {
    fn from(transcript: &WindowedTranscript) -> Self {
        Self {
            video_id: transcript.video_id.to_string(),
            start_seconds: transcript.window.start,
            end_seconds: transcript.window.end,
            text: transcript.text.clone(),
            captions: transcript
                .entries
                .iter()
                .map(|c| CaptionExport {
                    text: c.text.clone(),
                    start_seconds: c.start,
                    end_seconds: c.end(),
                })
                .collect(),
        }
    }
}

/// Format a windowed transcript for output.
pub fn format_transcript(transcript: &WindowedTranscript, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => transcript.text.clone(),
        OutputFormat::Json => format_json(transcript),
        OutputFormat::Srt => format_srt(transcript),
        OutputFormat::Vtt => format_vtt(transcript),
    }
}

fn format_json(transcript: &WindowedTranscript) -> String {
    let export = TranscriptExport::from(transcript);
    serde_json::to_string_pretty(&export).unwrap_or_else(|_| "{}".to_string())
}

/// Format as SRT (SubRip).
fn format_srt(transcript: &WindowedTranscript) -> String {
    let mut output = String::new();

    for (i, caption) in transcript.entries.iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_timestamp(caption.start),
            format_srt_timestamp(caption.end())
        ));
        output.push_str(&caption.text);
        output.push_str("\n\n");
    }

    output
}

/// Format as WebVTT.
fn format_vtt(transcript: &WindowedTranscript) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for (i, caption) in transcript.entries.iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_vtt_timestamp(caption.start),
            format_vtt_timestamp(caption.end())
        ));
        output.push_str(&caption.text);
        output.push_str("\n\n");
    }

    output
}

/// Format timestamp for SRT (00:00:00,000).
fn format_srt_timestamp(seconds: f64) -> String {
    let (h, m, s, ms) = split_millis(seconds);
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

/// Format timestamp for VTT (00:00:00.000).
fn format_vtt_timestamp(seconds: f64) -> String {
    let (h, m, s, ms) = split_millis(seconds);
    format!("{:02}:{:02}:{:02}.{:03}", h, m, s, ms)
}

fn split_millis(seconds: f64) -> (u64, u64, u64, u64) {
    let total_ms = (seconds * 1000.0).round() as u64;
    (
        total_ms / 3_600_000,
        (total_ms % 3_600_000) / 60_000,
        (total_ms % 60_000) / 1000,
        total_ms % 1000,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::{CaptionEntry, VideoId};
    use crate::transcript::{join_caption_text, TimeWindow};

    fn sample_transcript() -> WindowedTranscript {
        let entries = vec![
            CaptionEntry::new(0.0, 2.5, "Hello world."),
            CaptionEntry::new(2.5, 2.5, "This is a test."),
        ];
        WindowedTranscript {
            video_id: VideoId::parse("dQw4w9WgXcQ").unwrap(),
            window: TimeWindow::new(0.0, 10.0).unwrap(),
            text: join_caption_text(&entries),
            entries,
        }
    }

    #[test]
    fn test_format_text_keeps_leading_space() {
        let text = format_transcript(&sample_transcript(), OutputFormat::Text);
        assert_eq!(text, " Hello world. This is a test.");
    }

    #[test]
    fn test_format_json() {
        let json = format_transcript(&sample_transcript(), OutputFormat::Json);
        assert!(json.contains("\"video_id\": \"dQw4w9WgXcQ\""));
        assert!(json.contains("\"end_seconds\": 5.0"));
    }

    #[test]
    fn test_format_srt() {
        let srt = format_transcript(&sample_transcript(), OutputFormat::Srt);
        assert!(srt.contains("1\n00:00:00,000 --> 00:00:02,500\nHello world."));
        assert!(srt.contains("2\n00:00:02,500 --> 00:00:05,000"));
    }

    #[test]
    fn test_format_vtt() {
        let vtt = format_transcript(&sample_transcript(), OutputFormat::Vtt);
        assert!(vtt.starts_with("WEBVTT"));
        assert!(vtt.contains("00:00:00.000 --> 00:00:02.500"));
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("SRT".parse::<OutputFormat>().unwrap(), OutputFormat::Srt);
        assert_eq!("webvtt".parse::<OutputFormat>().unwrap(), OutputFormat::Vtt);
        assert!("docx".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_srt_timestamp() {
        assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_srt_timestamp(61.5), "00:01:01,500");
        assert_eq!(format_srt_timestamp(3661.123), "01:01:01,123");
    }
}
