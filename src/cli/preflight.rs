//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before a request starts, so it fails fast with a clear message.

use crate::config::{Settings, SummarizerProvider};
use crate::error::{Result, ShortitError};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Fetching captions requires yt-dlp.
    Transcript,
    /// Summarizing additionally requires the summarizer's credentials.
    Summarize,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    check_tool(&settings.captions.ytdlp_path)?;
    if let Operation::Summarize = operation {
        if settings.summarizer.provider == SummarizerProvider::OpenAI {
            check_api_key()?;
        }
    }
    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(ShortitError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(ShortitError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(ShortitError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ShortitError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(ShortitError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
