//! CLI module for ShortIt.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// ShortIt - summarize a section of a YouTube video
///
/// Fetches the captions of a video, keeps the lines inside a time range and
/// condenses them into a short abstractive summary.
#[derive(Parser, Debug)]
#[command(name = "shortit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize a time range of a video
    Summarize {
        /// YouTube URL or video ID
        url: String,

        /// Start of the range in seconds (default from config: 0)
        #[arg(short, long)]
        start: Option<f64>,

        /// End of the range in seconds (default from config: 60)
        #[arg(short, long)]
        end: Option<f64>,

        /// Summary length in words, 50-500 in steps of 10 (default from config: 250)
        #[arg(short, long)]
        words: Option<usize>,

        /// Report whether this term appears in the summary
        #[arg(long)]
        search: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the captions inside a time range without summarizing
    Transcript {
        /// YouTube URL or video ID
        url: String,

        /// Start of the range in seconds
        #[arg(short, long)]
        start: Option<f64>,

        /// End of the range in seconds
        #[arg(short, long)]
        end: Option<f64>,

        /// Output format (text, json, srt, vtt)
        #[arg(long, default_value = "text")]
        format: String,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Start HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
