//! Fan-out dispatcher over a fixed list of sinks

use crate::core::{Record, Sink};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Writes every record to each configured sink, in order.
///
/// A sink that returns an error or panics is reported on stderr and skipped
/// for that record only; the remaining sinks still receive it.
pub struct FanOut {
    sinks: Vec<Box<dyn Sink>>,
}

impl FanOut {
    pub fn new(sinks: Vec<Box<dyn Sink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.sinks.iter().map(|s| s.name().to_string()).collect()
    }

    /// Dispatch one record. Returns the number of sinks that failed.
    pub fn write(&mut self, record: &Record) -> usize {
        let mut failures = 0;

        for (idx, sink) in self.sinks.iter_mut().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| sink.write(record))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    eprintln!(
                        "[LOGGER ERROR] Sink #{} ({}) failed to write record: {}",
                        idx,
                        sink.name(),
                        e
                    );
                    failures += 1;
                }
                Err(panic_info) => {
                    eprintln!(
                        "[LOGGER CRITICAL] Sink #{} ({}) panicked: {}. \
                         Other sinks continue to function.",
                        idx,
                        sink.name(),
                        panic_message(&*panic_info)
                    );
                    failures += 1;
                }
            }
        }

        failures
    }

    /// Flush every sink. Returns the number of sinks that failed.
    pub fn flush(&mut self) -> usize {
        let mut failures = 0;

        for (idx, sink) in self.sinks.iter_mut().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| sink.flush())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    eprintln!("[LOGGER ERROR] Sink #{} ({}) flush failed: {}", idx, sink.name(), e);
                    failures += 1;
                }
                Err(panic_info) => {
                    eprintln!(
                        "[LOGGER CRITICAL] Sink #{} ({}) panicked during flush: {}",
                        idx,
                        sink.name(),
                        panic_message(&*panic_info)
                    );
                    failures += 1;
                }
            }
        }

        failures
    }

    /// Flush and release every sink, closing their handles.
    ///
    /// After this the dispatcher is empty and further writes are no-ops.
    pub fn close(&mut self) -> usize {
        let failures = self.flush();
        self.sinks.clear();
        failures
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Fields, LogLevel, LoggerError, Result};
    use parking_lot::Mutex;
    use std::io;
    use std::sync::Arc;

    struct Collecting {
        seen: Arc<Mutex<Vec<String>>>,
        flushed: Arc<Mutex<usize>>,
    }

    impl Sink for Collecting {
        fn write(&mut self, record: &Record) -> Result<()> {
            self.seen.lock().push(record.message().to_string());
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            *self.flushed.lock() += 1;
            Ok(())
        }

        fn name(&self) -> &str {
            "collecting"
        }
    }

    struct Failing;

    impl Sink for Failing {
        fn write(&mut self, _record: &Record) -> Result<()> {
            Err(LoggerError::io_operation(
                "writing log file",
                "read-only file system",
                io::Error::new(io::ErrorKind::PermissionDenied, "read-only file system"),
            ))
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct Panicking;

    impl Sink for Panicking {
        fn write(&mut self, _record: &Record) -> Result<()> {
            panic!("formatter bug");
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    fn collecting() -> (Collecting, Arc<Mutex<Vec<String>>>, Arc<Mutex<usize>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let flushed = Arc::new(Mutex::new(0));
        (
            Collecting {
                seen: Arc::clone(&seen),
                flushed: Arc::clone(&flushed),
            },
            seen,
            flushed,
        )
    }

    #[test]
    fn test_failure_does_not_block_later_sinks() {
        let (sink, seen, _) = collecting();
        let sinks: Vec<Box<dyn Sink>> = vec![Box::new(Failing), Box::new(Panicking), Box::new(sink)];
        let mut fan_out = FanOut::new(sinks);

        let record = Record::new(LogLevel::Warn, "still delivered", Fields::new());
        assert_eq!(fan_out.write(&record), 2);
        assert_eq!(*seen.lock(), vec!["still delivered".to_string()]);
    }

    #[test]
    fn test_sinks_invoked_in_order() {
        let (first, first_seen, _) = collecting();
        let (second, second_seen, _) = collecting();
        let sinks: Vec<Box<dyn Sink>> = vec![Box::new(first), Box::new(second)];
        let mut fan_out = FanOut::new(sinks);

        for i in 0..3 {
            fan_out.write(&Record::new(LogLevel::Info, format!("r{}", i), Fields::new()));
        }

        assert_eq!(*first_seen.lock(), *second_seen.lock());
        assert_eq!(fan_out.sink_names(), vec!["collecting", "collecting"]);
    }

    #[test]
    fn test_close_flushes_and_releases() {
        let (sink, _, flushed) = collecting();
        let mut fan_out = FanOut::new(vec![Box::new(sink)]);

        assert_eq!(fan_out.close(), 0);
        assert_eq!(*flushed.lock(), 1);
        assert!(fan_out.is_empty());
        assert_eq!(fan_out.write(&Record::new(LogLevel::Info, "late", Fields::new())), 0);
    }
}
