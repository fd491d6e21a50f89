//! CLI command implementations.

mod config;
mod doctor;
mod serve;
mod summarize;
mod transcript;

pub use config::run_config;
pub use doctor::run_doctor;
pub use serve::{router, run_serve, AppState};
pub use summarize::{build_request, run_summarize, SummarizeArgs};
pub use transcript::run_transcript;
