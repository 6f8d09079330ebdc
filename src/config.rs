// apikeys — Configuration file
//
// Optional TOML file at `<config_dir>/apikeys/config.toml`. Every field is
// optional; command-line flags override it, built-in defaults fill the rest.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::DEFAULT_BUSY_TIMEOUT;

const APP_DIR: &str = "apikeys";
const DEFAULT_LOG_FILTER: &str = "apikeys=info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(String),

    #[error("Failed to parse config file: {0}")]
    Parse(String),

    #[error("Failed to write config file: {0}")]
    Write(String),

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_path: Option<PathBuf>,
    pub busy_timeout_ms: Option<u64>,
    pub log_filter: Option<String>,
}

impl AppConfig {
    /// Config written by `config init`.
    pub fn defaults() -> Self {
        Self {
            database_path: Some(default_database_path()),
            busy_timeout_ms: Some(DEFAULT_BUSY_TIMEOUT.as_millis() as u64),
            log_filter: Some(DEFAULT_LOG_FILTER.to_string()),
        }
    }

    /// Merge this config with another, where `other` takes precedence.
    pub fn merge(self, other: Self) -> Self {
        Self {
            database_path: other.database_path.or(self.database_path),
            busy_timeout_ms: other.busy_timeout_ms.or(self.busy_timeout_ms),
            log_filter: other.log_filter.or(self.log_filter),
        }
    }

    pub fn database_path_or_default(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(default_database_path)
    }

    pub fn busy_timeout_or_default(&self) -> Duration {
        self.busy_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_BUSY_TIMEOUT)
    }

    pub fn log_filter_or_default(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

/// `<data_dir>/apikeys/apikeys.db`
pub fn default_database_path() -> PathBuf {
    dirs_next::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("apikeys.db")
}

/// Loads and saves the TOML config file.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new() -> Self {
        let config_dir = dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        Self {
            path: config_dir.join("config.toml"),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the config. A missing file yields an empty config.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.exists() {
            return Ok(AppConfig::default());
        }

        let content =
            std::fs::read_to_string(&self.path).map_err(|e| ConfigError::Read(e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write(e.to_string()))?;
        }

        let content =
            toml::to_string_pretty(config).map_err(|e| ConfigError::Write(e.to_string()))?;
        std::fs::write(&self.path, content).map_err(|e| ConfigError::Write(e.to_string()))
    }

    /// Write the default config. Refuses to overwrite an existing file.
    pub fn init(&self) -> Result<(), ConfigError> {
        if self.exists() {
            return Err(ConfigError::AlreadyExists(
                self.path.to_string_lossy().to_string(),
            ));
        }
        self.save(&AppConfig::defaults())
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}
