//! Logger facade: record intake, drop policy, and the shutdown protocol

use super::{
    config::LoggerConfig,
    error::{LoggerError, Result},
    fields::{FieldValue, Fields},
    log_level::LogLevel,
    metrics::LoggerMetrics,
    queue::{bounded_queue, PushError, QueueReader, QueueWriter},
    record::{Record, SourceLocation},
    sink::Sink,
    worker::{WorkerPool, WorkerState},
};
use crate::sinks::{FanOut, FileSink};
use parking_lot::Mutex;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default shutdown timeout for logger cleanup (5 seconds)
///
/// Used when a `Logger` is dropped without an explicit `shutdown()`.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest pause between checks for producers still inside `submit`
const MAX_CLOSE_BACKOFF: Duration = Duration::from_millis(1);

/// Callback type for overflow notifications
///
/// Called once per record dropped because the queue was full. The parameter
/// is the total count of overflow drops so far.
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Write end of the pipeline shared by the logger and all of its handles.
struct Intake {
    writer: QueueWriter,
    closed: AtomicBool,
    in_flight: AtomicUsize,
    min_level: LogLevel,
    metrics: Arc<LoggerMetrics>,
    on_overflow: Option<OverflowCallback>,
}

impl Intake {
    fn submit(&self, record: Record) {
        // Register before checking `closed` so shutdown can wait out any push
        // that saw the intake open.
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        if self.closed.load(Ordering::SeqCst) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.reject_closed(record);
            return;
        }
        let pushed = self.writer.push(record);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match pushed {
            Ok(()) => {
                self.metrics.record_enqueued();
            }
            Err(PushError::Full(record)) => self.reject_overflow(record),
            Err(PushError::Disconnected(record)) => self.reject_closed(record),
        }
    }

    fn reject_overflow(&self, record: Record) {
        let dropped = self.metrics.record_overflow() + 1;
        eprintln!(
            "[LOGGER WARNING] Log queue full ({} records), dropping {} message: {}",
            self.writer.capacity(),
            record.level(),
            record.message()
        );
        if let Some(ref callback) = self.on_overflow {
            callback(dropped);
        }
    }

    fn reject_closed(&self, record: Record) {
        self.metrics.record_closed_drop();
        eprintln!(
            "[LOGGER WARNING] Logger is shut down, dropping {} message: {}",
            record.level(),
            record.message()
        );
    }

    /// Stop accepting records and wait for pushes already past the gate.
    fn close(&self, deadline: Instant) {
        self.closed.store(true, Ordering::SeqCst);
        let mut pause = Duration::from_micros(10);
        while self.in_flight.load(Ordering::SeqCst) > 0 {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(pause.min(deadline - now));
            pause = (pause * 2).min(MAX_CLOSE_BACKOFF);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Cheap, cloneable submission handle for components that log.
///
/// Handles share the owning [`Logger`]'s queue; once the logger shuts down,
/// every handle's calls are dropped with a diagnostic. A handle may carry
/// base fields that are merged into each record it emits.
#[derive(Clone)]
pub struct LogHandle {
    intake: Arc<Intake>,
    base: Arc<Fields>,
}

impl LogHandle {
    /// Child handle with an extra base field
    #[must_use]
    pub fn with_field<K, V>(&self, key: K, value: V) -> LogHandle
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let mut base = (*self.base).clone();
        base.insert(key, value);
        LogHandle {
            intake: Arc::clone(&self.intake),
            base: Arc::new(base),
        }
    }

    pub fn base_fields(&self) -> &Fields {
        &self.base
    }

    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.intake.min_level
    }

    /// Submit a record without blocking. Overflow and post-shutdown calls
    /// are dropped with a line on stderr.
    pub fn log(&self, level: LogLevel, message: impl Into<String>, fields: Fields) {
        self.log_at(level, message, fields, None);
    }

    /// Like [`log`](Self::log), with the call-site location attached
    pub fn log_at(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        fields: Fields,
        source: Option<SourceLocation>,
    ) {
        if !self.enabled(level) {
            return;
        }
        let record = Record::new(level, message, fields.merge_base(&self.base)).with_source(source);
        self.intake.submit(record);
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message, Fields::new());
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message, Fields::new());
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message, Fields::new());
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message, Fields::new());
    }

    pub fn debug_with(&self, message: impl Into<String>, fields: Fields) {
        self.log(LogLevel::Debug, message, fields);
    }

    pub fn info_with(&self, message: impl Into<String>, fields: Fields) {
        self.log(LogLevel::Info, message, fields);
    }

    pub fn warn_with(&self, message: impl Into<String>, fields: Fields) {
        self.log(LogLevel::Warn, message, fields);
    }

    pub fn error_with(&self, message: impl Into<String>, fields: Fields) {
        self.log(LogLevel::Error, message, fields);
    }
}

#[derive(Debug, Clone, Copy)]
enum ShutdownState {
    Running,
    Completed,
    TimedOut { timeout: Duration, pending: usize },
}

struct Lifecycle {
    pool: WorkerPool,
    state: ShutdownState,
}

/// The pipeline owner.
///
/// Created once at process startup and shut down once at teardown. Pass
/// [`LogHandle`]s (from [`Logger::handle`]) to the components that log.
pub struct Logger {
    handle: LogHandle,
    reader: QueueReader,
    dispatcher: Arc<Mutex<FanOut>>,
    metrics: Arc<LoggerMetrics>,
    lifecycle: Mutex<Lifecycle>,
}

impl Logger {
    /// Create a builder for Logger
    ///
    /// # Example
    /// ```no_run
    /// use async_log_pipeline::prelude::*;
    /// use std::time::Duration;
    ///
    /// let logger = Logger::builder()
    ///     .capacity(1000)
    ///     .workers(2)
    ///     .file("logs/app.log")
    ///     .development(true)
    ///     .build()
    ///     .expect("log file must be writable");
    ///
    /// logger.info("catalog service started");
    /// logger.shutdown(Duration::from_secs(5)).expect("log drain timed out");
    /// ```
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Build a pipeline from a validated [`LoggerConfig`].
    ///
    /// The log directory must already exist; the file is created if missing.
    pub fn from_config(config: &LoggerConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Logger::builder()
            .capacity(config.buffer_size)
            .workers(config.worker_count)
            .min_level(config.min_level)
            .add_source(config.add_source)
            .development(config.is_dev)
            .file(config.file_path());
        for (key, value) in &config.base_fields {
            builder = builder.base_field(key.as_str(), value.as_str());
        }
        builder.build()
    }

    /// A cloneable handle sharing this logger's queue
    pub fn handle(&self) -> LogHandle {
        self.handle.clone()
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>, fields: Fields) {
        self.handle.log(level, message, fields);
    }

    pub fn log_at(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        fields: Fields,
        source: Option<SourceLocation>,
    ) {
        self.handle.log_at(level, message, fields, source);
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.handle.debug(message);
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.handle.info(message);
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) {
        self.handle.warn(message);
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.handle.error(message);
    }

    pub fn debug_with(&self, message: impl Into<String>, fields: Fields) {
        self.handle.debug_with(message, fields);
    }

    pub fn info_with(&self, message: impl Into<String>, fields: Fields) {
        self.handle.info_with(message, fields);
    }

    pub fn warn_with(&self, message: impl Into<String>, fields: Fields) {
        self.handle.warn_with(message, fields);
    }

    pub fn error_with(&self, message: impl Into<String>, fields: Fields) {
        self.handle.error_with(message, fields);
    }

    /// Records currently waiting in the queue
    pub fn queue_len(&self) -> usize {
        self.reader.len()
    }

    pub fn capacity(&self) -> usize {
        self.handle.intake.writer.capacity()
    }

    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.lifecycle.lock().pool.states()
    }

    /// Names of the attached sinks in dispatch order; empty once closed
    pub fn sink_names(&self) -> Vec<String> {
        self.dispatcher.lock().sink_names()
    }

    pub fn is_closed(&self) -> bool {
        self.handle.intake.is_closed()
    }

    /// Get the logger metrics for detailed observability
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    pub fn dropped_count(&self) -> u64 {
        self.metrics.dropped_count()
    }

    /// Close intake, drain the queue, and release the sinks.
    ///
    /// Blocks until every worker has stopped or `timeout` elapses. On
    /// timeout the sinks are left open (a worker may still be writing) and
    /// [`LoggerError::ShutdownTimeout`] is returned; the caller decides
    /// whether that is fatal.
    ///
    /// Idempotent: later or concurrent calls wait for the first one and
    /// return its outcome.
    pub fn shutdown(&self, timeout: Duration) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        if let Some(outcome) = Self::recorded_outcome(lifecycle.state) {
            return outcome;
        }

        let deadline = deadline_after(timeout);
        self.handle.intake.close(deadline);
        lifecycle.pool.cancel();

        let state = if !lifecycle.pool.wait_stopped(deadline) {
            let pending = self.reader.len();
            eprintln!(
                "[LOGGER WARNING] Log workers did not finish within {:?}; {} records still queued",
                timeout, pending
            );
            ShutdownState::TimedOut { timeout, pending }
        } else if !self.reader.is_empty() {
            // No worker is left to drain; nothing can change before the deadline.
            let pending = self.reader.len();
            eprintln!(
                "[LOGGER WARNING] No log worker is draining the queue; {} records still queued",
                pending
            );
            thread::sleep(deadline.saturating_duration_since(Instant::now()));
            ShutdownState::TimedOut { timeout, pending }
        } else {
            let failures = self.dispatcher.lock().close();
            self.metrics.record_sink_failures(failures);
            if failures > 0 {
                eprintln!("[LOGGER ERROR] {} sinks failed to flush on close", failures);
            }
            ShutdownState::Completed
        };

        lifecycle.state = state;
        Self::recorded_outcome(state).unwrap_or(Ok(()))
    }

    fn recorded_outcome(state: ShutdownState) -> Option<Result<()>> {
        match state {
            ShutdownState::Running => None,
            ShutdownState::Completed => Some(Ok(())),
            ShutdownState::TimedOut { timeout, pending } => {
                Some(Err(LoggerError::shutdown_timeout(timeout, pending)))
            }
        }
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if matches!(self.lifecycle.lock().state, ShutdownState::Running) {
            if let Err(e) = self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT) {
                eprintln!("[LOGGER ERROR] Implicit shutdown failed: {}", e);
            }
        }

        let dropped = self.metrics.dropped_count();
        if dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger shut down with {} dropped records (drop rate: {:.2}%)",
                dropped,
                self.metrics.drop_rate()
            );
        }
    }
}

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(60 * 60 * 24 * 365))
}

/// Builder for constructing a Logger with a fluent API
///
/// Sinks are attached in a fixed order: file, console (development mode
/// only), then any custom sinks in the order they were added.
pub struct LoggerBuilder {
    capacity: usize,
    workers: usize,
    min_level: LogLevel,
    file_path: Option<PathBuf>,
    development: bool,
    add_source: bool,
    console_writer: Option<Box<dyn Write + Send>>,
    sinks: Vec<Box<dyn Sink>>,
    base_fields: Fields,
    on_overflow: Option<OverflowCallback>,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            capacity: super::config::DEFAULT_BUFFER_SIZE,
            workers: super::config::DEFAULT_WORKER_COUNT,
            min_level: LogLevel::Debug,
            file_path: None,
            development: false,
            add_source: true,
            console_writer: None,
            sinks: Vec::new(),
            base_fields: Fields::new(),
            on_overflow: None,
        }
    }

    /// Queue capacity in records; must be at least 1
    #[must_use = "builder methods return a new value"]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Number of worker threads.
    ///
    /// Zero is accepted with a warning: records queue up and are never
    /// written, and shutting down a non-empty pipeline times out.
    #[must_use = "builder methods return a new value"]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Append structured lines to this file
    #[must_use = "builder methods return a new value"]
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Attach the colorized console sink
    #[must_use = "builder methods return a new value"]
    pub fn development(mut self, development: bool) -> Self {
        self.development = development;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn add_source(mut self, add_source: bool) -> Self {
        self.add_source = add_source;
        self
    }

    /// Redirect the development console sink away from stdout
    #[must_use = "builder methods return a new value"]
    pub fn console_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.console_writer = Some(Box::new(writer));
        self
    }

    /// Attach an additional sink after the built-in ones
    #[must_use = "builder methods return a new value"]
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn base_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.base_fields.insert(key, value);
        self
    }

    /// Set a callback invoked on every overflow drop
    #[must_use = "builder methods return a new value"]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    /// Open the sinks, then start the workers.
    ///
    /// Fails without starting anything if a sink cannot be opened.
    pub fn build(self) -> Result<Logger> {
        if self.capacity == 0 {
            return Err(LoggerError::config(
                "LoggerBuilder",
                "capacity must be at least 1",
            ));
        }
        if self.workers == 0 {
            eprintln!(
                "[LOGGER WARNING] Logger built with zero workers; queued records will not be written"
            );
        }

        let mut sinks: Vec<Box<dyn Sink>> = Vec::new();
        if let Some(path) = self.file_path {
            sinks.push(Box::new(FileSink::new(path)?.with_source(self.add_source)));
        }
        if self.development {
            sinks.push(console_sink(self.console_writer, self.add_source)?);
        }
        sinks.extend(self.sinks);
        if sinks.is_empty() {
            eprintln!("[LOGGER WARNING] Logger built without sinks; records will be discarded");
        }

        let (writer, reader) = bounded_queue(self.capacity);
        let metrics = Arc::new(LoggerMetrics::new());
        let dispatcher = Arc::new(Mutex::new(FanOut::new(sinks)));
        let pool = WorkerPool::spawn(
            self.workers,
            reader.clone(),
            Arc::clone(&dispatcher),
            Arc::clone(&metrics),
        )?;

        let intake = Arc::new(Intake {
            writer,
            closed: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            min_level: self.min_level,
            metrics: Arc::clone(&metrics),
            on_overflow: self.on_overflow,
        });

        Ok(Logger {
            handle: LogHandle {
                intake,
                base: Arc::new(self.base_fields),
            },
            reader,
            dispatcher,
            metrics,
            lifecycle: Mutex::new(Lifecycle {
                pool,
                state: ShutdownState::Running,
            }),
        })
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "console")]
fn console_sink(writer: Option<Box<dyn Write + Send>>, add_source: bool) -> Result<Box<dyn Sink>> {
    use crate::sinks::ConsoleSink;

    let sink = match writer {
        Some(writer) => ConsoleSink::with_writer(writer),
        None => ConsoleSink::new(),
    };
    Ok(Box::new(sink.with_source(add_source)))
}

#[cfg(not(feature = "console"))]
fn console_sink(_writer: Option<Box<dyn Write + Send>>, _add_source: bool) -> Result<Box<dyn Sink>> {
    Err(LoggerError::config(
        "LoggerBuilder",
        "development mode requires the `console` feature",
    ))
}
