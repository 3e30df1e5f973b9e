//! Queue module for the gatherer-to-worker hand-off
//!
//! A bounded FIFO of FileRecords. The gatherer blocks under
//! backpressure rather than dropping records; workers drain remaining
//! records even after intake closes during shutdown.

mod job_queue;

pub use job_queue::JobQueue;
