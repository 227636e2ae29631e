//! Logger configuration
//!
//! `LoggerConfig` is the serde-facing description a service loads from its
//! own configuration source. Missing keys fall back to the defaults below.

use super::error::{LoggerError, Result};
use super::fields::Fields;
use super::log_level::LogLevel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const DEFAULT_BUFFER_SIZE: usize = 1000;
pub const DEFAULT_WORKER_COUNT: usize = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Queue capacity in records
    pub buffer_size: usize,
    /// Number of worker threads draining the queue
    pub worker_count: usize,
    /// Development mode attaches the colorized console sink
    pub is_dev: bool,
    /// Render call-site locations captured by the logging macros
    pub add_source: bool,
    /// Directory holding the log file; must already exist
    pub dir: PathBuf,
    pub file_name: String,
    pub min_level: LogLevel,
    /// Fields attached to every record, e.g. `service` and `environment`
    pub base_fields: BTreeMap<String, String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            worker_count: DEFAULT_WORKER_COUNT,
            is_dev: false,
            add_source: true,
            dir: PathBuf::from("logs"),
            file_name: "app.log".to_string(),
            min_level: LogLevel::Debug,
            base_fields: BTreeMap::new(),
        }
    }
}

impl LoggerConfig {
    /// Defaults for a service running in `mode`; only `"development"` enables
    /// the console sink.
    pub fn for_mode(mode: &str) -> Self {
        Self {
            is_dev: mode.eq_ignore_ascii_case("development"),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(LoggerError::config(
                "LoggerConfig",
                "buffer_size must be a positive integer",
            ));
        }
        if self.worker_count == 0 {
            return Err(LoggerError::config(
                "LoggerConfig",
                "worker_count must be a positive integer",
            ));
        }
        if self.file_name.trim().is_empty() {
            return Err(LoggerError::config("LoggerConfig", "file_name must not be empty"));
        }
        Ok(())
    }

    pub fn file_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    pub fn base_fields(&self) -> Fields {
        self.base_fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}
