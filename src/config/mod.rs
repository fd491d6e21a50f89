//! Configuration module for ShortIt.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, SummaryPrompts};
pub use settings::{
    CaptionSettings, GeneralSettings, PromptSettings, RequestDefaults, Settings,
    SummarizerProvider, SummarizerSettings,
};
