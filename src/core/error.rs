//! Error types for the logging pipeline

use std::time::Duration;

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Workers did not drain the queue before the shutdown deadline
    #[error("Logger shutdown timed out after {timeout:?} with {pending} records still queued")]
    ShutdownTimeout { timeout: Duration, pending: usize },

    /// A worker thread could not be started
    #[error("Failed to spawn log worker #{worker_id}: {source}")]
    WorkerSpawn {
        worker_id: usize,
        #[source]
        source: std::io::Error,
    },
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn shutdown_timeout(timeout: Duration, pending: usize) -> Self {
        LoggerError::ShutdownTimeout { timeout, pending }
    }

    /// True for the error returned when shutdown missed its deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, LoggerError::ShutdownTimeout { .. })
    }
}
