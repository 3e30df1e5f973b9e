//! Collaborator contracts consumed by the pipeline
//!
//! The core never talks to the outside world directly: arrivals, status
//! lookups, alerts, and manifests all go through these traits. The
//! filesystem-backed reference implementations live alongside them.

mod filesystem;

pub use filesystem::{DirArrivalSource, FsManifestStore, LogAlertSink, MarkerStatusSource};

use crate::error::SourceResult;
use crate::record::FileStatus;

/// Why an alert was raised for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertReason {
    /// The status source reported the file as failed
    FileFailed,
    /// The poll-attempt budget ran out without a terminal status
    Timeout,
}

impl std::fmt::Display for AlertReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertReason::FileFailed => write!(f, "file_failed"),
            AlertReason::Timeout => write!(f, "timeout"),
        }
    }
}

/// Source of newly arrived files
///
/// May be partial or eventually consistent; must be safe to call
/// repeatedly within one gather cycle.
#[async_trait::async_trait]
pub trait ArrivalSource: Send + Sync {
    /// List the file names currently visible at the arrival location
    async fn list_arrived_files(&self) -> SourceResult<Vec<String>>;
}

/// Point-in-time status lookups for arrived files
#[async_trait::async_trait]
pub trait StatusSource: Send + Sync {
    /// Look up the current processing status of one file
    async fn file_status(&self, file_name: &str) -> SourceResult<FileStatus>;
}

/// Fire-and-forget notification channel
///
/// Callers swallow delivery failures; an alert must never affect
/// pipeline control flow.
#[async_trait::async_trait]
pub trait AlertSink: Send + Sync {
    /// Raise an alert for a file
    async fn raise_alert(
        &self,
        file_name: &str,
        reason: AlertReason,
        context: &str,
    ) -> SourceResult<()>;
}

/// Best-effort manifest artifact creation
#[async_trait::async_trait]
pub trait ManifestStore: Send + Sync {
    /// Create a manifest for a closed batch, returning a reference to it
    async fn create_manifest(&self, batch_id: &str, file_names: &[String])
        -> SourceResult<String>;
}
