//! Bounded record queue between the logger facade and the worker pool
//!
//! The queue is split into a write end owned by the facade and a read end
//! owned by the workers. Pushing never blocks; popping blocks until a record
//! arrives or the shared [`CancelToken`] fires, after which it keeps handing
//! out records until the queue is observed empty.

use super::record::Record;
use crossbeam_channel::{bounded, select, Receiver, Sender, TryRecvError, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Reason a push was rejected. The record is handed back to the caller.
#[derive(Debug)]
pub enum PushError {
    /// The queue is at capacity
    Full(Record),
    /// Every reader is gone
    Disconnected(Record),
}

/// Create a queue holding at most `capacity` records.
///
/// `capacity` must be positive; a zero-capacity crossbeam channel is a
/// rendezvous channel, which would make every non-blocking push fail.
pub fn bounded_queue(capacity: usize) -> (QueueWriter, QueueReader) {
    debug_assert!(capacity > 0, "queue capacity must be positive");
    let (tx, rx) = bounded(capacity);
    (QueueWriter { tx, capacity }, QueueReader { rx })
}

/// Producer side of the queue
#[derive(Clone)]
pub struct QueueWriter {
    tx: Sender<Record>,
    capacity: usize,
}

impl QueueWriter {
    /// Enqueue without waiting.
    pub fn push(&self, record: Record) -> Result<(), PushError> {
        self.tx.try_send(record).map_err(|e| match e {
            TrySendError::Full(record) => PushError::Full(record),
            TrySendError::Disconnected(record) => PushError::Disconnected(record),
        })
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Consumer side of the queue
#[derive(Clone)]
pub struct QueueReader {
    rx: Receiver<Record>,
}

impl QueueReader {
    /// Wait for the next record.
    ///
    /// Returns `None` only when `cancel` has fired and the queue is empty, or
    /// when every writer has been dropped and the queue is empty.
    pub fn pop(&self, cancel: &CancelToken) -> Option<Record> {
        if cancel.is_cancelled() {
            return self.try_pop();
        }

        select! {
            recv(self.rx) -> msg => msg.ok(),
            recv(cancel.signal()) -> _ => self.try_pop(),
        }
    }

    /// Take a record if one is immediately available
    pub fn try_pop(&self) -> Option<Record> {
        match self.rx.try_recv() {
            Ok(record) => Some(record),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

struct CancelInner {
    // Dropping the sender disconnects `signal`, waking every receiver at once.
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
    cancelled: AtomicBool,
}

/// One-shot broadcast cancellation shared by all workers.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (trigger, signal) = bounded(0);
        Self {
            inner: Arc::new(CancelInner {
                trigger: Mutex::new(Some(trigger)),
                signal,
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    /// Fire the token. Returns `true` for the call that actually cancelled.
    pub fn cancel(&self) -> bool {
        let first = !self.inner.cancelled.swap(true, Ordering::SeqCst);
        drop(self.inner.trigger.lock().take());
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    fn signal(&self) -> &Receiver<()> {
        &self.inner.signal
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
