//! Doctor command - verify credentials and configuration.

use crate::cli::Output;
use crate::config::Settings;
use crate::session::mask;
use console::style;
use std::path::{Path, PathBuf};

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

/// Run all diagnostic checks.
///
/// `config_path` is the `--config` override, if one was given.
pub fn run_doctor(settings: &Settings, config_path: Option<&PathBuf>) -> anyhow::Result<()> {
    Output::header("Critic Doctor");
    println!();
    println!("Checking credentials and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("API Configuration").bold());
    let api_check = check_api_key(std::env::var("GOOGLE_API_KEY").ok().as_deref());
    api_check.print();
    checks.push(api_check);
    Output::kv("Model", &settings.gemini.model);
    Output::kv("Endpoint", &settings.gemini.base_url);

    println!();

    println!("{}", style("Directories").bold());
    let dir_check = check_temp_dir(&settings.temp_dir());
    dir_check.print();
    checks.push(dir_check);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file(&Settings::resolve_config_path(config_path));
    config_check.print();
    checks.push(config_check);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Critic.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Critic is ready to use.");
    }

    Ok(())
}

/// Check the Google API key.
///
/// Keys from Google AI Studio start with `AIza` and are 39 characters long.
fn check_api_key(key: Option<&str>) -> CheckResult {
    const HINT: &str = "Set with: export GOOGLE_API_KEY='AIza...' (or pass --api-key)";

    match key.map(str::trim) {
        Some(key) if key.starts_with("AIza") && key.len() == 39 => {
            CheckResult::ok("GOOGLE_API_KEY", &format!("configured ({})", mask(key)))
        }
        Some("") => CheckResult::error("GOOGLE_API_KEY", "empty", HINT),
        Some(_) => CheckResult::warning(
            "GOOGLE_API_KEY",
            "set but format looks unusual",
            "Expected format: AIza... (Google AI Studio API key)",
        ),
        None => CheckResult::warning(
            "GOOGLE_API_KEY",
            "not set",
            "The web UI asks for a key; the critique command needs --api-key or this variable",
        ),
    }
}

/// Check that the staging directory exists and is writable.
fn check_temp_dir(dir: &Path) -> CheckResult {
    if let Err(e) = std::fs::create_dir_all(dir) {
        return CheckResult::error(
            "Temp directory",
            &format!("{} ({})", dir.display(), e),
            "Set general.temp_dir to a writable directory",
        );
    }

    match tempfile::tempfile_in(dir) {
        Ok(_) => CheckResult::ok("Temp directory", &format!("{}", dir.display())),
        Err(e) => CheckResult::error(
            "Temp directory",
            &format!("{} is not writable ({})", dir.display(), e),
            "Set general.temp_dir to a writable directory",
        ),
    }
}

/// Check if config file exists and parses.
fn check_config_file(path: &Path) -> CheckResult {
    if !path.exists() {
        return CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: critic config edit",
        );
    }

    match Settings::load_from(Some(&path.to_path_buf())) {
        Ok(_) => CheckResult::ok("Config file", &format!("{}", path.display())),
        Err(e) => CheckResult::error(
            "Config file",
            &format!("{} is invalid: {}", path.display(), e),
            "Fix the file or remove it to use defaults",
        ),
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
    fn test_api_key_checks() {
        let key = format!("AIza{}", "x".repeat(35));
        let result = check_api_key(Some(&key));
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(!result.message.contains(&key));

        assert_eq!(check_api_key(Some("")).status, CheckStatus::Error);
        assert_eq!(check_api_key(Some("abc123")).status, CheckStatus::Warning);
        assert_eq!(check_api_key(None).status, CheckStatus::Warning);
    }

    #[test]
    fn test_temp_dir_check() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("staging");
        assert_eq!(check_temp_dir(&nested).status, CheckStatus::Ok);
        assert!(nested.exists());
    }

    #[test]
    fn test_config_file_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(check_config_file(&path).status, CheckStatus::Warning);

        std::fs::write(&path, "[server]\nport = 9000\n").unwrap();
        assert_eq!(check_config_file(&path).status, CheckStatus::Ok);

        std::fs::write(&path, "[server\n").unwrap();
        assert_eq!(check_config_file(&path).status, CheckStatus::Error);
    }

    #[test]
    fn test_config_override_is_the_file_checked() {
        let dir = tempfile::tempdir().unwrap();
        let custom = dir.path().join("custom.toml");
        std::fs::write(&custom, "[agent\n").unwrap();

        let result = check_config_file(&Settings::resolve_config_path(Some(&custom)));
        assert_eq!(result.status, CheckStatus::Error);
        assert!(result.message.contains(&custom.display().to_string()));
    }
}
