//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::{Settings, SummarizerProvider};
use crate::summarizer::is_model_cached;
use console::style;
use std::path::Path;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Print a group of checks under a heading.
fn print_section(title: &str, checks: &[CheckResult]) {
    println!("{}", style(title).bold());
    for check in checks {
        check.print();
    }
    println!();
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("ShortIt Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    let tools = vec![check_ytdlp(&settings.captions.ytdlp_path)];
    print_section("External Tools", &tools);
    checks.extend(tools);

    let summarizer = check_summarizer(settings);
    print_section("Summarizer", &summarizer);
    checks.extend(summarizer);

    let config = vec![check_config_file(config_path), check_defaults(settings)];
    print_section("Configuration", &config);
    checks.extend(config);

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using ShortIt.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! ShortIt is ready to use.");
    }

    Ok(())
}

/// Check that yt-dlp runs.
fn check_ytdlp(path: &str) -> CheckResult {
    match Command::new(path).arg("--version").output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();
            CheckResult::ok("yt-dlp", &version)
        }
        Ok(_) => CheckResult::error("yt-dlp", "installed but not working", install_hint_ytdlp()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error("yt-dlp", &format!("{} not found", path), install_hint_ytdlp())
        }
        Err(e) => CheckResult::error("yt-dlp", &format!("error: {}", e), install_hint_ytdlp()),
    }
}

/// Check the configured summarization backend.
fn check_summarizer(settings: &Settings) -> Vec<CheckResult> {
    let summarizer = &settings.summarizer;
    let mut results = vec![CheckResult::ok("Provider", &summarizer.provider.to_string())];

    match summarizer.provider {
        SummarizerProvider::Local => {
            if is_model_cached(&summarizer.model) {
                results.push(CheckResult::ok("Model", &format!("{} (cached)", summarizer.model)));
            } else {
                results.push(CheckResult::warning(
                    "Model",
                    &format!("{} (not downloaded yet)", summarizer.model),
                    "The model is fetched from the Hugging Face Hub on the first summary",
                ));
            }
        }
        SummarizerProvider::OpenAI => {
            results.push(CheckResult::ok("Model", &summarizer.openai_model));
            results.push(check_openai_api_key());
        }
    }

    results
}

/// Check if OpenAI API key is configured.
fn check_openai_api_key() -> CheckResult {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if key.starts_with("sk-") && key.chars().count() > 20 => {
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", mask_key(&key)))
        }
        Ok(key) if key.is_empty() => CheckResult::error(
            "OPENAI_API_KEY",
            "empty",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
        Ok(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        Err(_) => CheckResult::error(
            "OPENAI_API_KEY",
            "not set",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
    }
}

/// Show the first seven and last four characters of a key.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 11 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..7].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Check if the config file in use exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: shortit config edit",
        )
    }
}

/// Check that the request defaults form a valid request.
fn check_defaults(settings: &Settings) -> CheckResult {
    let defaults = &settings.defaults;
    let summary = format!(
        "{}s to {}s, {} words",
        defaults.start, defaults.end, defaults.words
    );
    let valid = crate::transcript::TimeWindow::new(defaults.start, defaults.end)
        .and_then(|_| crate::pipeline::validate_max_words(defaults.words));

    match valid {
        Ok(()) => CheckResult::ok("Request defaults", &summary),
        Err(e) => CheckResult::error(
            "Request defaults",
            &format!("{} ({})", summary, e),
            "Fix the [defaults] section of the config file",
        ),
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_missing_ytdlp() {
        let result = check_ytdlp("shortit-definitely-missing-ytdlp");
        assert_eq!(result.status, CheckStatus::Error);
    }

    #[test]
    fn test_invalid_defaults() {
        let mut settings = Settings::default();
        assert_eq!(check_defaults(&settings).status, CheckStatus::Ok);

        settings.defaults.words = 42;
        assert_eq!(check_defaults(&settings).status, CheckStatus::Error);
    }

    #[test]
    fn test_mask_key_respects_char_boundaries() {
        assert_eq!(mask_key("sk-abcdefghijklmnopqrstuvwxyz"), "sk-abcd...wxyz");
        assert_eq!(mask_key("sk-ééééééééééééééééééé€"), "sk-éééé...ééé€");
        assert_eq!(mask_key("sk-short"), "********");
    }

    #[test]
    fn test_config_file_check_uses_given_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        assert_eq!(check_config_file(&path).status, CheckStatus::Warning);

        std::fs::write(&path, "").unwrap();
        let result = check_config_file(&path);
        assert_eq!(result.status, CheckStatus::Ok);
        assert_eq!(result.message, path.display().to_string());
    }

    #[test]
    fn test_openai_provider_checks_key() {
        let mut settings = Settings::default();
        settings.summarizer.provider = SummarizerProvider::OpenAI;

        let results = check_summarizer(&settings);
        assert!(results.iter().any(|r| r.name == "OPENAI_API_KEY"));
    }
}
