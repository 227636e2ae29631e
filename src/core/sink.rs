//! Sink trait for log output destinations

use super::{error::Result, record::Record};

/// A destination that renders records.
///
/// Sinks are only ever driven from worker threads, one record at a time.
pub trait Sink: Send {
    fn write(&mut self, record: &Record) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;
}
