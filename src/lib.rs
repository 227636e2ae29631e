//! # Async Log Pipeline
//!
//! An in-process asynchronous logging pipeline for request-serving
//! applications.
//!
//! Call sites stamp a [`Record`] and push it onto a bounded queue without
//! blocking; when the queue is full the record is dropped and a diagnostic
//! line goes to stderr. A pool of worker threads drains the queue into a
//! fan-out of sinks: a JSON-lines file and, in development mode, a colorized
//! console. [`Logger::shutdown`] closes intake and waits, up to a deadline,
//! for everything already queued to be written.
//!
//! ```no_run
//! use async_log_pipeline::prelude::*;
//! use async_log_pipeline::info;
//! use std::time::Duration;
//!
//! let logger = Logger::from_config(&LoggerConfig::for_mode("development"))?;
//! let orders = logger.handle().with_field("component", "orders");
//!
//! info!(orders, "order created"; "order_id" => 1042, "total" => 99.5);
//!
//! logger.shutdown(Duration::from_secs(5))?;
//! # Ok::<(), async_log_pipeline::LoggerError>(())
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    #[cfg(feature = "console")]
    pub use crate::sinks::ConsoleSink;
    pub use crate::sinks::{FanOut, FileSink};
    pub use crate::core::{
        FieldValue, Fields, LogHandle, LogLevel, Logger, LoggerBuilder, LoggerConfig,
        LoggerError, LoggerMetrics, OverflowCallback, Record, Result, Sink, SourceLocation,
        WorkerState, DEFAULT_SHUTDOWN_TIMEOUT,
    };
}

#[cfg(feature = "console")]
pub use sinks::ConsoleSink;
pub use sinks::{FanOut, FileSink};
pub use self::core::{
    FieldValue, Fields, LogHandle, LogLevel, Logger, LoggerBuilder, LoggerConfig, LoggerError,
    LoggerMetrics, OverflowCallback, Record, Result, Sink, SourceLocation, WorkerState,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
