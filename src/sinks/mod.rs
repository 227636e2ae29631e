//! Sink implementations and the fan-out dispatcher

#[cfg(feature = "console")]
pub mod console;
pub mod fan_out;
pub mod file;

#[cfg(feature = "console")]
pub use console::ConsoleSink;
pub use fan_out::FanOut;
pub use file::FileSink;

pub use crate::core::Sink;
