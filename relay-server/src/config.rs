//! Server configuration.
//!
//! Configuration is loaded in the following order (later overrides
//! earlier):
//! 1. Default values
//! 2. YAML config file (if specified via RELAY_CONFIG)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Server configuration. Every option has a default; a zero-value
/// configuration serves RPCs with stdout logging and no store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TCP port for the HTTP listener.
    pub port: u16,
    /// Log to standard output.
    pub stdout_logging: bool,
    /// Log to a dated file under `logs/`.
    pub file_logging: bool,
    /// Path to the record store file; absent skips store init.
    pub database_path: Option<PathBuf>,
    /// Per-host request ceiling within the one-minute window.
    pub max_requests_per_minute: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 6600,
            stdout_logging: true,
            file_logging: false,
            database_path: None,
            max_requests_per_minute: 120,
        }
    }
}

impl Config {
    /// Loads configuration from file, then applies environment variable
    /// overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("RELAY_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("RELAY_PORT") {
            if let Ok(parsed) = port.parse() {
                self.port = parsed;
            }
        }
        if let Ok(flag) = std::env::var("RELAY_STDOUT_LOGGING") {
            self.stdout_logging = parse_flag(&flag);
        }
        if let Ok(flag) = std::env::var("RELAY_FILE_LOGGING") {
            self.file_logging = parse_flag(&flag);
        }
        if let Ok(path) = std::env::var("RELAY_DATABASE_PATH") {
            if !path.is_empty() {
                self.database_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(max) = std::env::var("RELAY_MAX_REQUESTS_PER_MINUTE") {
            if let Ok(parsed) = max.parse() {
                self.max_requests_per_minute = parsed;
            }
        }
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
