//! Configuration for the Bugs world and its logging
//!
//! Values come from defaults, an optional TOML file, then environment
//! variables, in that order.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("IO error reading config file: {message}")]
    Io { message: String },

    #[error("Configuration parsing error: {message}")]
    Parse { message: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct BugsConfig {
    pub world: WorldConfig,
    pub logging: LoggingConfig,
}

/// Scheduling and resource limits for a world
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Pause between rounds in continuous mode
    pub round_delay_ms: u64,
    /// Start continuous mode paused
    pub start_paused: bool,
    /// Maximum nesting of user function calls per bug
    pub max_call_depth: usize,
    /// Stack size of each bug thread, in bytes
    pub agent_stack_size: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            round_delay_ms: 600,
            start_paused: false,
            max_call_depth: 256,
            agent_stack_size: 8 * 1024 * 1024,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl BugsConfig {
    /// Parse a TOML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            message: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// File (or defaults), then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `BUGS_ROUND_DELAY_MS`, `BUGS_START_PAUSED` and `BUGS_LOG_LEVEL`.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(delay) = env::var("BUGS_ROUND_DELAY_MS") {
            self.world.round_delay_ms =
                delay.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: "BUGS_ROUND_DELAY_MS".to_string(),
                    reason: format!("'{}' is not a number of milliseconds", delay),
                })?;
        }

        if let Ok(paused) = env::var("BUGS_START_PAUSED") {
            self.world.start_paused = match paused.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(ConfigError::InvalidValue {
                        key: "BUGS_START_PAUSED".to_string(),
                        reason: format!("'{}' is not a boolean", other),
                    })
                }
            };
        }

        if let Ok(level) = env::var("BUGS_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world.max_call_depth == 0 {
            return Err(ConfigError::InvalidValue {
                key: "world.max_call_depth".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.world.agent_stack_size < 64 * 1024 {
            return Err(ConfigError::InvalidValue {
                key: "world.agent_stack_size".to_string(),
                reason: "must be at least 64 KiB".to_string(),
            });
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                reason: "cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}
