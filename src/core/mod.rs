//! Core pipeline types: records, queue, workers, and the logger facade

pub mod config;
pub mod error;
pub mod fields;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod queue;
pub mod record;
pub mod sink;
pub mod worker;

pub use config::LoggerConfig;
pub use error::{LoggerError, Result};
pub use fields::{FieldValue, Fields};
pub use log_level::LogLevel;
pub use logger::{LogHandle, Logger, LoggerBuilder, OverflowCallback, DEFAULT_SHUTDOWN_TIMEOUT};
pub use metrics::LoggerMetrics;
pub use queue::{bounded_queue, CancelToken, PushError, QueueReader, QueueWriter};
pub use record::{Record, SourceLocation};
pub use sink::Sink;
pub use worker::{WorkerPool, WorkerState};
