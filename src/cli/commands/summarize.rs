//! Summarize command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::{Pipeline, SummaryReport, SummaryRequest};
use anyhow::Result;

/// Options for a summarize run; unset values fall back to the config defaults.
#[derive(Debug, Default)]
pub struct SummarizeArgs {
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub words: Option<usize>,
    pub search: Option<String>,
    pub json: bool,
}

/// Build the request for a URL, filling gaps from the settings.
pub fn build_request(url: &str, args: &SummarizeArgs, settings: &Settings) -> SummaryRequest {
    let defaults = &settings.defaults;
    SummaryRequest::new(url, defaults)
        .with_window(
            args.start.unwrap_or(defaults.start),
            args.end.unwrap_or(defaults.end),
        )
        .with_max_words(args.words.unwrap_or(defaults.words))
        .with_search_term(args.search.clone())
}

/// Run the summarize command.
pub async fn run_summarize(url: &str, args: SummarizeArgs, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Summarize, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'shortit doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let request = build_request(url, &args, &settings);
    if let Err(e) = request.validate() {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let pipeline = Pipeline::new(&settings)?;

    let spinner = Output::spinner("Fetching captions and summarizing...");
    let result = pipeline.run(&request).await;
    spinner.finish_and_clear();

    match result {
        Ok(report) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Error: {}", e));
            Err(e.into())
        }
    }
}

fn print_report(report: &SummaryReport) {
    Output::header("Video");
    Output::kv("ID", report.video_id.as_str());
    Output::kv("Thumbnail", &report.thumbnail_url);
    Output::kv("Section", &report.window.to_string());
    Output::kv("Transcript words", &report.transcript_words.to_string());

    Output::block("Section Summary", &report.summary);

    if let Some(result) = &report.search_result {
        Output::block("Search Result", result);
    }
    println!();
}
