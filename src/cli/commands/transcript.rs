//! Transcript command implementation.

use crate::captions::create_provider;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::transcript::{format_transcript, OutputFormat, TranscriptWindower};
use anyhow::Result;

/// Run the transcript command.
pub async fn run_transcript(
    url: &str,
    start: Option<f64>,
    end: Option<f64>,
    format: &str,
    output: Option<String>,
    settings: Settings,
) -> Result<()> {
    let output_format: OutputFormat = format.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    if let Err(e) = preflight::check(Operation::Transcript, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'shortit doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let start = start.unwrap_or(settings.defaults.start);
    let end = end.unwrap_or(settings.defaults.end);
    let windower = TranscriptWindower::new(create_provider(&settings));

    let spinner = Output::spinner("Fetching captions...");
    let result = windower.extract(url, start, end).await;
    spinner.finish_and_clear();

    let transcript = match result {
        Ok(t) => t,
        Err(e) => {
            Output::error(&format!("Error: {}", e));
            return Err(e.into());
        }
    };

    let output_str = format_transcript(&transcript, output_format);

    match output {
        Some(path) if path != "-" => {
            std::fs::write(&path, &output_str)?;
            Output::success(&format!(
                "Wrote {} caption lines ({}) to {}",
                transcript.entries.len(),
                transcript.window,
                path
            ));
        }
        _ => {
            println!("{}", output_str);
        }
    }

    Ok(())
}
