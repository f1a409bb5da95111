//! Configuration settings for Feedscope.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub model: ModelSettings,
    pub agent: AgentSettings,
    pub dataset: DatasetSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Chat model used by the agent.
    pub name: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Consume responses as a chunk stream instead of a single completion.
    pub streaming: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            name: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            timeout_secs: crate::openai::DEFAULT_TIMEOUT_SECS,
            streaming: false,
        }
    }
}

/// Bounded retry configuration with linear backoff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `n * backoff_ms` before the next try.
    pub backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff_ms: 1000,
        }
    }
}

impl RetrySettings {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Agent loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Hard cap on model invocations per run.
    pub max_iterations: usize,
    /// Characters of each prior tool result rendered into the prompt.
    pub history_result_chars: usize,
    /// Retries around the model call.
    pub model_retry: RetrySettings,
    /// Retries around a tool that reports an error.
    pub tool_retry: RetrySettings,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            history_result_chars: 500,
            model_retry: RetrySettings {
                max_attempts: 2,
                backoff_ms: 2000,
            },
            tool_retry: RetrySettings::default(),
        }
    }
}

/// Locations of the JSON datasets the tools read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSettings {
    /// Base directory that relative paths are resolved against.
    pub root: String,
    /// Directory holding `<platform>_consolidated.json` and `<platform>_summary.json`.
    pub consolidated_dir: String,
    /// Directories searched (in order) when a file name does not resolve directly.
    pub search_dirs: Vec<String>,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            consolidated_dir: "data/consolidated".to_string(),
            search_dirs: vec![
                ".".to_string(),
                "data".to_string(),
                "data/accounts".to_string(),
            ],
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
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
            settings.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Reject values the agent loop cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.agent.max_iterations == 0 {
            return Err(crate::error::FeedscopeError::Config(
                "agent.max_iterations must be at least 1".to_string(),
            ));
        }
        if self.agent.model_retry.max_attempts == 0 || self.agent.tool_retry.max_attempts == 0 {
            return Err(crate::error::FeedscopeError::Config(
                "retry max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::FeedscopeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("feedscope")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded dataset root.
    pub fn dataset_root(&self) -> PathBuf {
        Self::expand_path(&self.dataset.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_agent_contract() {
        let settings = Settings::default();
        assert_eq!(settings.agent.max_iterations, 3);
        assert_eq!(settings.agent.tool_retry.max_attempts, 2);
        assert_eq!(settings.agent.model_retry.backoff(), Duration::from_secs(2));
        assert_eq!(settings.dataset.search_dirs.len(), 3);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [agent]
            max_iterations = 5

            [dataset]
            root = "/srv/feeds"
            "#,
        )
        .unwrap();

        assert_eq!(settings.agent.max_iterations, 5);
        assert_eq!(settings.agent.history_result_chars, 500);
        assert_eq!(settings.dataset.root, "/srv/feeds");
        assert_eq!(settings.dataset.consolidated_dir, "data/consolidated");
        assert_eq!(settings.model.name, "gpt-4o-mini");
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let mut settings = Settings::default();
        settings.agent.max_iterations = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.server.port = 9100;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.server.port, 9100);
    }
}
