//! Pipeline metrics for observability
//!
//! Counters for records accepted, dropped at intake, written by workers, and
//! sink failures. All counters are relaxed atomics; they are diagnostics, not
//! synchronization.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for logger observability
///
/// # Example
///
/// ```
/// use async_log_pipeline::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
/// metrics.record_enqueued();
/// metrics.record_overflow();
///
/// assert_eq!(metrics.enqueued(), 1);
/// assert_eq!(metrics.dropped_count(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records accepted into the queue
    enqueued: AtomicU64,

    /// Records discarded because the queue was full
    dropped_overflow: AtomicU64,

    /// Records discarded because intake was already closed
    dropped_closed: AtomicU64,

    /// Records handed to every sink by a worker
    written: AtomicU64,

    /// Individual sink write failures (one record can fail on several sinks)
    sink_failures: AtomicU64,
}

impl LoggerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            enqueued: AtomicU64::new(0),
            dropped_overflow: AtomicU64::new(0),
            dropped_closed: AtomicU64::new(0),
            written: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_overflow(&self) -> u64 {
        self.dropped_overflow.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_closed(&self) -> u64 {
        self.dropped_closed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    /// Total records lost at intake
    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_overflow() + self.dropped_closed()
    }

    #[inline]
    pub fn record_enqueued(&self) -> u64 {
        self.enqueued.fetch_add(1, Ordering::Relaxed)
    }

    /// Record an overflow drop, returning the previous overflow count
    #[inline]
    pub fn record_overflow(&self) -> u64 {
        self.dropped_overflow.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_closed_drop(&self) -> u64 {
        self.dropped_closed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_written(&self) -> u64 {
        self.written.fetch_add(1, Ordering::Relaxed)
    }

    /// Add the failure count reported by one dispatch or flush pass
    #[inline]
    pub fn record_sink_failures(&self, failures: usize) -> u64 {
        self.sink_failures.fetch_add(failures as u64, Ordering::Relaxed)
    }

    /// Get drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been logged.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.enqueued() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            enqueued: AtomicU64::new(self.enqueued()),
            dropped_overflow: AtomicU64::new(self.dropped_overflow()),
            dropped_closed: AtomicU64::new(self.dropped_closed()),
            written: AtomicU64::new(self.written()),
            sink_failures: AtomicU64::new(self.sink_failures()),
        }
    }
}
