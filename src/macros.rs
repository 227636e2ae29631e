//! Logging macros that capture the call site.
//!
//! Each macro accepts either `println!`-style format arguments or a message
//! followed by `;` and inline `key => value` fields. Both forms work with a
//! [`Logger`](crate::Logger) or a [`LogHandle`](crate::LogHandle).
//!
//! # Examples
//!
//! ```no_run
//! use async_log_pipeline::prelude::*;
//! use async_log_pipeline::{info, warn};
//!
//! let logger = Logger::builder().file("logs/app.log").build()?;
//!
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//! warn!(logger, "slow query"; "table" => "products", "elapsed_ms" => 1250);
//! # Ok::<(), async_log_pipeline::LoggerError>(())
//! ```

/// Log at an explicit level.
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $message:expr; $($key:expr => $value:expr),+ $(,)?) => {
        $logger.log_at(
            $level,
            $message,
            $crate::Fields::new()$(.with($key, $value))+,
            ::core::option::Option::Some($crate::SourceLocation::new(file!(), line!())),
        )
    };
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log_at(
            $level,
            ::std::format!($($arg)+),
            $crate::Fields::new(),
            ::core::option::Option::Some($crate::SourceLocation::new(file!(), line!())),
        )
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}
