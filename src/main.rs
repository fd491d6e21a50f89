//! ShortIt CLI entry point.

use anyhow::Result;
use clap::Parser;
use shortit::cli::{commands, Cli, Commands};
use shortit::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(Settings::default_config_path);
    let settings = Settings::load_from(Some(&config_path))?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("shortit={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    std::fs::create_dir_all(settings.temp_dir())?;

    match &cli.command {
        Commands::Summarize {
            url,
            start,
            end,
            words,
            search,
            json,
        } => {
            let args = commands::SummarizeArgs {
                start: *start,
                end: *end,
                words: *words,
                search: search.clone(),
                json: *json,
            };
            commands::run_summarize(url, args, settings).await?;
        }

        Commands::Transcript {
            url,
            start,
            end,
            format,
            output,
        } => {
            commands::run_transcript(url, *start, *end, format, output.clone(), settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, *port, settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings, &config_path)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, config_path)?;
        }
    }

    Ok(())
}
