//! Settings configuration
//!
//! Default values are defined in `config/default.toml`; a user file only needs
//! the keys it wants to change.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default configuration TOML embedded from config/default.toml
const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Language model backend
    pub model: ModelSettings,
    /// Malformed-response retry layer
    pub retry: RetrySettings,
    /// HTTP retry layer
    pub transport: TransportSettings,
    /// Values used for notes minted during enrichment
    pub deck: DeckSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Model id sent with every request
    pub name: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// API root, without the `/v1/messages` suffix
    pub base_url: String,
    pub api_version: String,
    /// Environment variable the API key is read from
    pub api_key_env: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Retries after the first attempt
    pub max_attempts: u32,
    /// Constant delay between attempts
    pub delay_ms: u64,
}

impl RetrySettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSettings {
    pub max_retries: u32,
    /// First backoff; doubled on each further retry
    pub base_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckSettings {
    /// `__type__` of minted notes
    pub note_type: String,
    /// `note_model_uuid` of minted notes
    pub new_note_model_uuid: String,
}

impl Default for Settings {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("embedded default.toml must be valid")
    }
}

impl Default for DeckSettings {
    fn default() -> Self {
        Settings::default().deck
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Settings::default().retry
    }
}

/// Recursively merge `overlay` TOML values on top of `base`.
fn merge_toml(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(key) {
                    merge_toml(base_value, value);
                } else {
                    base_table.insert(key.clone(), value.clone());
                }
            }
        }
        (base, _) => {
            *base = overlay.clone();
        }
    }
}

/// Parse user TOML content merged on top of default.toml.
fn parse_with_defaults(user_content: &str) -> Result<Settings> {
    let mut base: toml::Value = toml::from_str(DEFAULT_CONFIG_TOML)?;
    let user: toml::Value = toml::from_str(user_content)?;
    merge_toml(&mut base, &user);
    let settings: Settings = base.try_into()?;
    Ok(settings)
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "kham", "kham")
}

impl Settings {
    /// Get the configuration file path
    pub fn config_file() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load settings from the default configuration file.
    /// Falls back to embedded default.toml if the config file does not exist.
    pub fn load() -> Result<Self> {
        let Some(config_file) = Self::config_file() else {
            debug!("Could not determine config directory, using defaults");
            return Ok(Self::default());
        };

        if !config_file.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        debug!("Loading config from {:?}", config_file);
        let content = fs::read_to_string(&config_file)?;
        parse_with_defaults(&content)
    }

    /// Load settings from a specific file, merged on top of defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        parse_with_defaults(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.model.max_tokens, 20000);
        assert_eq!(settings.model.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(settings.retry.max_attempts, 3);
        assert_eq!(settings.retry.delay(), Duration::from_secs(1));
        assert_eq!(settings.deck.note_type, "Note");
    }

    #[test]
    fn test_partial_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[model]
name = "claude-haiku"

[retry]
delay_ms = 10
"#
        )
        .unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.model.name, "claude-haiku");
        assert_eq!(settings.retry.delay_ms, 10);
        // Untouched keys keep their defaults
        assert_eq!(settings.model.max_tokens, 20000);
        assert_eq!(settings.retry.max_attempts, 3);
        assert_eq!(settings.transport.max_retries, 2);
    }

    #[test]
    fn test_invalid_type_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[retry]\nmax_attempts = \"many\"").unwrap();
        assert!(Settings::load_from(file.path()).is_err());
    }

    #[test]
    fn test_config_file_name() {
        if let Some(path) = Settings::config_file() {
            assert!(path.ends_with("config.toml"));
        }
    }
}
