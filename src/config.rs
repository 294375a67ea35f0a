//! Database configuration
//!
//! JSON file, e.g.:
//!
//! ```json
//! { "data_dir": "./bookshelf-data", "sync_on_commit": true }
//! ```
//!
//! Exactly one location is set: `data_dir` for an on-disk log, or
//! `in_memory_identifier` for a process-local one.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{log_event_with_fields, Event, Severity};

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

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Where and how the database keeps its commit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding the on-disk log
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Label of a process-local, non-persistent database
    #[serde(default)]
    pub in_memory_identifier: Option<String>,

    /// fsync the log after every commit (default: true)
    #[serde(default = "default_sync_on_commit")]
    pub sync_on_commit: bool,

    /// Rewrite the log down to live records when opening (default: false)
    #[serde(default)]
    pub compact_on_open: bool,

    /// Minimum log severity (default: "warn")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_sync_on_commit() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Resolved storage location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    OnDisk(PathBuf),
    InMemory(String),
}

impl DatabaseConfig {
    /// On-disk database rooted at `data_dir`
    pub fn on_disk(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: Some(data_dir.as_ref().to_string_lossy().into_owned()),
            in_memory_identifier: None,
            sync_on_commit: default_sync_on_commit(),
            compact_on_open: false,
            log_level: default_log_level(),
        }
    }

    /// In-memory database labelled `identifier`
    pub fn in_memory(identifier: impl Into<String>) -> Self {
        Self {
            data_dir: None,
            in_memory_identifier: Some(identifier.into()),
            sync_on_commit: default_sync_on_commit(),
            compact_on_open: false,
            log_level: default_log_level(),
        }
    }

    /// Load and validate configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;

        let config: DatabaseConfig = serde_json::from_str(&content)?;
        config.validate()?;

        let path = path.display().to_string();
        let location = config.location()?.to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[("path", path.as_str()), ("location", location.as_str())],
        );

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.location()?;
        self.severity()?;
        Ok(())
    }

    /// The configured location; exactly one must be set
    pub fn location(&self) -> Result<Location, ConfigError> {
        match (&self.data_dir, &self.in_memory_identifier) {
            (Some(dir), None) if dir.trim().is_empty() => {
                Err(ConfigError::Invalid("data_dir must not be empty".to_string()))
            }
            (Some(dir), None) => Ok(Location::OnDisk(PathBuf::from(dir))),
            (None, Some(id)) if id.trim().is_empty() => Err(ConfigError::Invalid(
                "in_memory_identifier must not be empty".to_string(),
            )),
            (None, Some(id)) => Ok(Location::InMemory(id.clone())),
            (Some(_), Some(_)) => Err(ConfigError::Invalid(
                "data_dir and in_memory_identifier are mutually exclusive".to_string(),
            )),
            (None, None) => Err(ConfigError::Invalid(
                "one of data_dir or in_memory_identifier is required".to_string(),
            )),
        }
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> Result<Severity, ConfigError> {
        self.log_level.parse().map_err(ConfigError::Invalid)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::OnDisk(path) => write!(f, "{}", path.display()),
            Location::InMemory(id) => write!(f, "memory:{}", id),
        }
    }
}
