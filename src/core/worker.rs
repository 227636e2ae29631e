//! Worker pool draining the record queue into the fan-out dispatcher

use super::error::{LoggerError, Result};
use super::metrics::LoggerMetrics;
use super::queue::{CancelToken, QueueReader};
use crate::sinks::FanOut;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Lifecycle of a single worker: `Running -> Draining -> Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    Draining,
    Stopped,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Running => write!(f, "running"),
            WorkerState::Draining => write!(f, "draining"),
            WorkerState::Stopped => write!(f, "stopped"),
        }
    }
}

type SharedStates = Arc<Mutex<Vec<WorkerState>>>;

/// Marks the worker stopped and reports it, even if the loop unwinds.
struct StopGuard {
    id: usize,
    states: SharedStates,
    done: Sender<usize>,
}

impl Drop for StopGuard {
    fn drop(&mut self) {
        self.states.lock()[self.id] = WorkerState::Stopped;
        let _ = self.done.send(self.id);
    }
}

pub struct WorkerPool {
    count: usize,
    handles: Vec<JoinHandle<()>>,
    states: SharedStates,
    cancel: CancelToken,
    done: Receiver<usize>,
    stopped: usize,
}

impl WorkerPool {
    /// Start `count` workers. The dispatcher's sinks must already be open.
    pub fn spawn(
        count: usize,
        reader: QueueReader,
        dispatcher: Arc<Mutex<FanOut>>,
        metrics: Arc<LoggerMetrics>,
    ) -> Result<Self> {
        let states: SharedStates = Arc::new(Mutex::new(vec![WorkerState::Running; count]));
        let cancel = CancelToken::new();
        let (done_tx, done_rx) = unbounded();
        let mut handles = Vec::with_capacity(count);

        for id in 0..count {
            let worker = Worker {
                id,
                reader: reader.clone(),
                cancel: cancel.clone(),
                dispatcher: Arc::clone(&dispatcher),
                metrics: Arc::clone(&metrics),
                states: Arc::clone(&states),
            };
            let guard = StopGuard {
                id,
                states: Arc::clone(&states),
                done: done_tx.clone(),
            };

            let spawned = thread::Builder::new()
                .name(format!("log-worker-{}", id))
                .spawn(move || {
                    let _guard = guard;
                    worker.run();
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    // Workers already running exit once the queue is empty.
                    cancel.cancel();
                    return Err(LoggerError::WorkerSpawn {
                        worker_id: id,
                        source,
                    });
                }
            }
        }

        Ok(Self {
            count,
            handles,
            states,
            cancel,
            done: done_rx,
            stopped: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn states(&self) -> Vec<WorkerState> {
        self.states.lock().clone()
    }

    /// Broadcast the drain-then-stop signal to every worker
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait until every worker has stopped or `deadline` passes.
    ///
    /// Returns `true` once all workers are stopped and joined. Safe to call
    /// again after a `false` result; stop reports already received are kept.
    pub fn wait_stopped(&mut self, deadline: Instant) -> bool {
        while self.stopped < self.count {
            match self.done.recv_deadline(deadline) {
                Ok(_) => self.stopped += 1,
                Err(RecvTimeoutError::Timeout) => return false,
                // Unreachable while the pool holds workers: each guard owns a sender.
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        for (idx, handle) in self.handles.drain(..).enumerate() {
            if let Err(e) = handle.join() {
                eprintln!("[LOGGER ERROR] Log worker #{} panicked: {:?}", idx, e);
            }
        }
        true
    }
}

struct Worker {
    id: usize,
    reader: QueueReader,
    cancel: CancelToken,
    dispatcher: Arc<Mutex<FanOut>>,
    metrics: Arc<LoggerMetrics>,
    states: SharedStates,
}

impl Worker {
    fn run(self) {
        let mut draining = false;

        while let Some(record) = self.reader.pop(&self.cancel) {
            if !draining && self.cancel.is_cancelled() {
                draining = true;
                self.set_state(WorkerState::Draining);
            }

            let mut dispatcher = self.dispatcher.lock();
            let mut failures = dispatcher.write(&record);
            // Flush once the backlog is gone rather than per record.
            if self.reader.is_empty() {
                failures += dispatcher.flush();
            }
            drop(dispatcher);

            self.metrics.record_written();
            self.metrics.record_sink_failures(failures);
        }

        if !draining {
            self.set_state(WorkerState::Draining);
        }
        let failures = self.dispatcher.lock().flush();
        self.metrics.record_sink_failures(failures);
    }

    fn set_state(&self, state: WorkerState) {
        self.states.lock()[self.id] = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::queue::bounded_queue;
    use crate::core::{Fields, LogLevel, Record, Result as LogResult, Sink};
    use std::time::Duration;

    struct Recording(Arc<Mutex<Vec<String>>>);

    impl Sink for Recording {
        fn write(&mut self, record: &Record) -> LogResult<()> {
            self.0.lock().push(record.message().to_string());
            Ok(())
        }

        fn flush(&mut self) -> LogResult<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn pool_with(
        count: usize,
        capacity: usize,
    ) -> (WorkerPool, crate::core::queue::QueueWriter, Arc<Mutex<Vec<String>>>, Arc<LoggerMetrics>) {
        let (writer, reader) = bounded_queue(capacity);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sinks: Vec<Box<dyn Sink>> = vec![Box::new(Recording(Arc::clone(&seen)))];
        let dispatcher = Arc::new(Mutex::new(FanOut::new(sinks)));
        let metrics = Arc::new(LoggerMetrics::new());
        let pool = WorkerPool::spawn(count, reader, dispatcher, Arc::clone(&metrics)).unwrap();
        (pool, writer, seen, metrics)
    }

    #[test]
    fn test_single_worker_preserves_order() {
        let (mut pool, writer, seen, metrics) = pool_with(1, 64);
        for i in 0..20 {
            writer
                .push(Record::new(LogLevel::Info, format!("m{}", i), Fields::new()))
                .unwrap();
        }

        pool.cancel();
        assert!(pool.wait_stopped(Instant::now() + Duration::from_secs(5)));

        let expected: Vec<String> = (0..20).map(|i| format!("m{}", i)).collect();
        assert_eq!(*seen.lock(), expected);
        assert_eq!(metrics.written(), 20);
        assert_eq!(pool.states(), vec![WorkerState::Stopped]);
    }

    #[test]
    fn test_all_workers_stop_after_cancel() {
        let (mut pool, writer, seen, _) = pool_with(4, 256);
        for i in 0..200 {
            writer
                .push(Record::new(LogLevel::Debug, format!("m{}", i), Fields::new()))
                .unwrap();
        }

        pool.cancel();
        assert!(pool.wait_stopped(Instant::now() + Duration::from_secs(5)));
        assert_eq!(seen.lock().len(), 200);
        assert!(pool.states().iter().all(|s| *s == WorkerState::Stopped));
        assert_eq!(pool.len(), 4);
    }

    struct FlushFails;

    impl Sink for FlushFails {
        fn write(&mut self, _record: &Record) -> LogResult<()> {
            Ok(())
        }

        fn flush(&mut self) -> LogResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "no space left on device").into())
        }

        fn name(&self) -> &str {
            "flush-fails"
        }
    }

    #[test]
    fn test_flush_failures_are_counted() {
        let (writer, reader) = bounded_queue(16);
        let sinks: Vec<Box<dyn Sink>> = vec![Box::new(FlushFails)];
        let dispatcher = Arc::new(Mutex::new(FanOut::new(sinks)));
        let metrics = Arc::new(LoggerMetrics::new());
        let mut pool = WorkerPool::spawn(1, reader, dispatcher, Arc::clone(&metrics)).unwrap();

        for i in 0..3 {
            writer
                .push(Record::new(LogLevel::Info, format!("m{}", i), Fields::new()))
                .unwrap();
        }
        pool.cancel();
        assert!(pool.wait_stopped(Instant::now() + Duration::from_secs(5)));

        assert_eq!(metrics.written(), 3);
        // At least the final flush on exit fails.
        assert!(metrics.sink_failures() >= 1);
    }

    #[test]
    fn test_running_until_cancelled() {
        let (mut pool, _writer, _, _) = pool_with(2, 8);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(pool.states(), vec![WorkerState::Running, WorkerState::Running]);
        assert!(!pool.wait_stopped(Instant::now() + Duration::from_millis(20)));

        pool.cancel();
        assert!(pool.wait_stopped(Instant::now() + Duration::from_secs(5)));
    }

    #[test]
    fn test_zero_workers_stop_immediately() {
        let (mut pool, _writer, _, _) = pool_with(0, 8);
        pool.cancel();
        assert!(pool.wait_stopped(Instant::now()));
        assert!(pool.is_empty());
        assert!(pool.states().is_empty());
    }
}
