//! Engine configuration
//!
//! Loaded from a JSON file; every field is optional and defaulted.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Severity;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Ceiling on simultaneously open storage scans (must be > 0)
    #[serde(default = "default_max_open_scans")]
    pub max_open_scans: usize,

    /// Initial capacity of the right-outer matched row set
    #[serde(default = "default_right_outer_set_capacity")]
    pub right_outer_set_capacity: usize,

    /// Minimum severity logged by execution contexts
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_open_scans() -> usize {
    1024
}

fn default_right_outer_set_capacity() -> usize {
    64
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_open_scans: default_max_open_scans(),
            right_outer_set_capacity: default_right_outer_set_capacity(),
            log_level: default_log_level(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_open_scans == 0 {
            return Err(ConfigError::Invalid {
                field: "max_open_scans",
                reason: "must be > 0".to_string(),
            });
        }

        self.log_level
            .parse::<Severity>()
            .map_err(|reason| ConfigError::Invalid {
                field: "log_level",
                reason,
            })?;

        Ok(())
    }

    /// Parsed log threshold. An unparseable level falls back to WARN.
    pub fn log_threshold(&self) -> Severity {
        self.log_level.parse().unwrap_or(Severity::Warn)
    }
}
