//! Error types for arrival-warden
//!
//! Covers the error taxonomy of the pipeline:
//! - Collaborator (arrival/status/alert/manifest) errors
//! - Queue hand-off errors
//! - Poll-loop errors
//! - Configuration errors

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for arrival-warden
#[derive(Error, Debug)]
pub enum WardenError {
    /// Collaborator (external source) errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Queue errors
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Gather-cycle errors
    #[error("Gather error: {0}")]
    Gather(#[from] GatherError),

    /// Status-poll errors
    #[error("Poll error: {0}")]
    Poll(#[from] PollError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by external collaborators
#[derive(Error, Debug)]
pub enum SourceError {
    /// The source could not be reached; the caller may retry later
    #[error("Source unavailable: {reason}")]
    Unavailable { reason: String },

    /// The source answered with something the caller cannot use
    #[error("Malformed response from source: {reason}")]
    Malformed { reason: String },

    /// Underlying I/O failure
    #[error("Source I/O error at '{path}': {reason}")]
    Io { path: PathBuf, reason: String },
}

impl SourceError {
    /// Transient errors consume one attempt and are retried on the next
    /// scheduled poll; they are never escalated on their own.
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Unavailable { .. } | SourceError::Io { .. })
    }
}

/// Queue hand-off errors
#[derive(Error, Debug)]
pub enum QueueError {
    /// Intake has closed (drain in progress); no new records are admitted
    #[error("Queue intake is closed")]
    Closed,

    /// A record that already reached a terminal state was offered
    #[error("Refusing terminal record '{file_name}' (status {status})")]
    TerminalRecord { file_name: String, status: String },

    /// Queue construction failed
    #[error("Invalid queue capacity {0}: must be at least 1")]
    InvalidCapacity(usize),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid pool size {count}: must be between 1 and {max}")]
    InvalidPoolSize { count: usize, max: usize },

    /// Invalid queue capacity
    #[error("Invalid queue capacity {0}: must be at least 1")]
    InvalidQueueCapacity(usize),

    /// A per-cycle or per-file budget of zero would never make progress
    #[error("Invalid {name}: must be at least 1")]
    ZeroBudget { name: &'static str },

    /// Invalid path argument
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: PathBuf, reason: String },
}

/// Gather-cycle errors
#[derive(Error, Debug)]
pub enum GatherError {
    /// Every record of a closed batch was refused by the queue
    #[error("Batch '{batch_id}' was not admitted: {reason}")]
    BatchRejected { batch_id: String, reason: String },
}

/// Status-poll errors
#[derive(Error, Debug)]
pub enum PollError {
    /// The record was already terminal when the worker received it
    #[error("Record '{file_name}' was already terminal on dequeue")]
    AlreadyTerminal { file_name: String },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, WardenError>;

/// Result type for collaborator operations
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Result type for queue operations
pub type QueueResult<T> = std::result::Result<T, QueueError>;
