//! Bounded FIFO hand-off between the gatherer and the worker pool
//!
//! Built on an async MPMC channel:
//! - enqueue awaits under backpressure when the queue is at capacity
//! - dequeue awaits until a record is available or the queue is closed
//!   and fully drained
//! - closing intake is the cooperative drain signal: queued records are
//!   still handed out, new ones are refused

use crate::error::{QueueError, QueueResult};
use crate::record::FileRecord;

/// Bounded, thread-safe FIFO of FileRecords
#[derive(Debug)]
pub struct JobQueue {
    tx: async_channel::Sender<FileRecord>,
    rx: async_channel::Receiver<FileRecord>,
    capacity: usize,
}

impl JobQueue {
    /// Create a queue with the given capacity ceiling
    pub fn new(capacity: usize) -> QueueResult<Self> {
        if capacity == 0 {
            return Err(QueueError::InvalidCapacity(capacity));
        }
        let (tx, rx) = async_channel::bounded(capacity);
        Ok(Self { tx, rx, capacity })
    }

    /// Enqueue a record, awaiting if the queue is at capacity
    ///
    /// Terminal records are refused outright: the queue must never hold
    /// a record with nothing left to do.
    pub async fn enqueue(&self, record: FileRecord) -> QueueResult<()> {
        if record.status().is_terminal() {
            return Err(QueueError::TerminalRecord {
                file_name: record.file_name.clone(),
                status: record.status().to_string(),
            });
        }
        self.tx
            .send(record)
            .await
            .map_err(|_| QueueError::Closed)
    }

    /// Dequeue the next record, awaiting until one is available
    ///
    /// Returns `None` once intake has closed and every queued record has
    /// been handed out.
    pub async fn dequeue(&self) -> Option<FileRecord> {
        self.rx.recv().await.ok()
    }

    /// Stop admitting new records. Queued records remain dequeueable.
    /// Idempotent.
    pub fn close_intake(&self) {
        self.tx.close();
    }

    /// Whether intake has closed
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Number of records currently queued
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether the queue is currently empty
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Configured capacity ceiling
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
