//! Worker module for status monitoring
//!
//! A fixed pool of pollers consumes the JobQueue. Each poller owns one
//! FileRecord at a time and polls the external status source until the
//! record resolves or its attempt budget runs out.

mod poller;
mod pool;

pub use poller::{PollOutcome, StatusPoller};
pub use pool::{PoolStats, WorkerPool};
