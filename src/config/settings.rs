//! Configuration settings for ShortIt.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub captions: CaptionSettings,
    pub summarizer: SummarizerSettings,
    pub defaults: RequestDefaults,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for temporary files (caption downloads).
    pub temp_dir: String,
    /// Log level when no -v flag is given (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            temp_dir: "/tmp/shortit".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Caption retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionSettings {
    /// Caption languages to try, in order of preference.
    pub languages: Vec<String>,
    /// Path or name of the yt-dlp executable.
    pub ytdlp_path: String,
    /// Timeout for a single caption download.
    pub timeout_seconds: u64,
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string()],
            ytdlp_path: "yt-dlp".to_string(),
            timeout_seconds: 120,
        }
    }
}

/// Summarization backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SummarizerProvider {
    /// Local pretrained seq2seq model (DistilBART via ONNX Runtime).
    #[default]
    Local,
    /// OpenAI chat completion.
    OpenAI,
}

impl std::str::FromStr for SummarizerProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "distilbart" | "onnx" => Ok(SummarizerProvider::Local),
            "openai" => Ok(SummarizerProvider::OpenAI),
            _ => Err(format!("Unknown summarizer provider: {}", s)),
        }
    }
}

impl std::fmt::Display for SummarizerProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummarizerProvider::Local => write!(f, "local"),
            SummarizerProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Summarizer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerSettings {
    /// Summarization backend (local, openai).
    pub provider: SummarizerProvider,
    /// Hugging Face repository of the ONNX seq2seq model.
    pub model: String,
    /// Chat model used by the openai provider.
    pub openai_model: String,
    /// Maximum number of input tokens fed to the encoder.
    pub max_input_tokens: usize,
    /// Token budget per requested word.
    pub tokens_per_word: f64,
    /// Minimum generated length as a fraction of the token budget.
    pub min_length_ratio: f64,
    /// Beam width.
    pub num_beams: usize,
    /// Exponent applied to hypothesis length when ranking finished beams.
    pub length_penalty: f32,
    /// Stop once `num_beams` hypotheses have finished.
    pub early_stopping: bool,
    /// Instruction prepended to the transcript before encoding.
    pub prompt_prefix: String,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            provider: SummarizerProvider::Local,
            model: "Xenova/distilbart-cnn-12-6".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            max_input_tokens: 1024,
            tokens_per_word: 1.33,
            min_length_ratio: 0.5,
            num_beams: 4,
            length_penalty: 2.0,
            early_stopping: true,
            prompt_prefix: "summarize: ".to_string(),
        }
    }
}

/// Defaults applied when a request omits a value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestDefaults {
    /// Window start in seconds.
    pub start: f64,
    /// Window end in seconds.
    pub end: f64,
    /// Summary length in words.
    pub words: usize,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: 60.0,
            words: 250,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ShortitError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shortit")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }
}
