//! ShortIt - YouTube section summarizer
//!
//! Summarizes a chosen time range of a YouTube video from its captions.
//!
//! # Overview
//!
//! For one request ShortIt:
//! - fetches the video's captions and keeps the lines that start inside the range
//! - condenses them with a pretrained abstractive model, capped at a word budget
//! - optionally reports whether a term appears in the summary
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `captions` - Caption providers (yt-dlp) and video id parsing
//! - `transcript` - Time-window selection and transcript export formats
//! - `summarizer` - Summarization backends (local DistilBART, OpenAI)
//! - `search` - Term lookup in the summary
//! - `pipeline` - Request coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use shortit::config::Settings;
//! use shortit::pipeline::{Pipeline, SummaryRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let pipeline = Pipeline::new(&settings)?;
//!
//!     let request = SummaryRequest::new("https://youtu.be/dQw4w9WgXcQ", &settings.defaults)
//!         .with_window(0.0, 60.0)
//!         .with_max_words(100);
//!     let report = pipeline.run(&request).await?;
//!     println!("{}", report.summary);
//!
//!     Ok(())
//! }
//! ```

pub mod captions;
pub mod cli;
pub mod config;
pub mod error;
pub mod openai;
pub mod pipeline;
pub mod search;
pub mod summarizer;
pub mod transcript;

pub use error::{ErrorKind, Result, ShortitError};
