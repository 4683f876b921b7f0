//! Configuration settings for Critic.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub gemini: GeminiSettings,
    pub agent: AgentSettings,
    pub search: SearchSettings,
    pub readiness: ReadinessSettings,
    pub video: VideoSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for staged uploads.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            temp_dir: "/tmp/critic".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Gemini API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    /// Model used for critiques.
    pub model: String,
    /// Base URL of the Generative Language API.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash-exp".to_string(),
            base_url: "https://generativelanguage.googleapis.com/".to_string(),
            timeout_secs: 300,
        }
    }
}

/// Critique agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Display name of the agent.
    pub name: String,
    /// Ask the model to format its answer as markdown.
    pub markdown: bool,
    /// Give the agent the web search tool.
    pub web_search: bool,
    /// Maximum model calls per critique (tool round trips included).
    pub max_iterations: usize,
    /// Agents kept per server; the least recently used one is dropped beyond this.
    pub cache_capacity: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            name: "AI Media Critic".to_string(),
            markdown: true,
            web_search: true,
            max_iterations: 8,
            cache_capacity: 32,
        }
    }
}

/// Web search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Default number of results handed back to the model.
    pub max_results: usize,
    /// DuckDuckGo region code.
    pub region: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_results: 5,
            region: "wt-wt".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Settings for waiting on remote video processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessSettings {
    /// Seconds between status checks.
    pub poll_interval_secs: u64,
    /// Maximum number of status checks.
    pub max_attempts: u32,
    /// Overall deadline in seconds (none = bounded by attempts only).
    pub deadline_secs: Option<u64>,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 2,
            max_attempts: 150, // 5 minutes at the default interval
            deadline_secs: None,
        }
    }
}

impl ReadinessSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

/// Video critique settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct VideoSettings {
    /// Delete the remote upload once the critique finished.
    pub delete_remote_after: bool,
}

/// Web UI server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Maximum accepted upload size in megabytes.
    pub max_upload_mb: usize,
    /// Browser sessions remembered at once (each holds one API key).
    pub max_sessions: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            max_upload_mb: 200,
            max_sessions: 1024,
        }
    }
}

impl ServerSettings {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
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
        let config_path = Self::resolve_config_path(path);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::CriticError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The `--config` override if one was given, else the default location.
    pub fn resolve_config_path(path: Option<&PathBuf>) -> PathBuf {
        path.cloned().unwrap_or_else(Self::default_config_path)
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("critic")
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.gemini.model, "gemini-2.0-flash-exp");
        assert_eq!(settings.readiness.poll_interval(), Duration::from_secs(2));
        assert_eq!(settings.readiness.max_attempts, 150);
        assert!(settings.readiness.deadline().is_none());
        assert_eq!(settings.server.max_upload_bytes(), 200 * 1024 * 1024);
        assert_eq!(settings.agent.cache_capacity, 32);
        assert_eq!(settings.server.max_sessions, 1024);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [readiness]
            poll_interval_secs = 5

            [agent]
            web_search = false
            "#,
        )
        .unwrap();

        assert_eq!(settings.readiness.poll_interval_secs, 5);
        assert_eq!(settings.readiness.max_attempts, 150);
        assert!(!settings.agent.web_search);
        assert_eq!(settings.agent.name, "AI Media Critic");
        assert_eq!(settings.server.port, 8501);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.gemini.model = "gemini-1.5-pro".to_string();
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.gemini.model, "gemini-1.5-pro");
    }

    #[test]
    fn test_resolve_config_path() {
        let custom = PathBuf::from("/etc/critic/custom.toml");
        assert_eq!(Settings::resolve_config_path(Some(&custom)), custom);
        assert_eq!(
            Settings::resolve_config_path(None),
            Settings::default_config_path()
        );
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.general.temp_dir, "/tmp/critic");
    }
}
