//! File and batch record types
//!
//! A FileRecord tracks one arrived file from discovery to terminal
//! resolution. A BatchRecord is the immutable result of one gather
//! cycle: the ordered, deduplicated set of files sighted during its
//! observation window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Status of a file in the monitoring pipeline
///
/// Transitions are monotonic along `Pending -> Working -> {Complete | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Discovered but not yet picked up by a worker
    Pending,
    /// A worker owns the record and is polling its status
    Working,
    /// The status source reported successful completion
    Complete,
    /// The status source reported failure, or the poll budget ran out
    Failed,
}

impl FileStatus {
    /// Terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, FileStatus::Complete | FileStatus::Failed)
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileStatus::Pending => write!(f, "pending"),
            FileStatus::Working => write!(f, "working"),
            FileStatus::Complete => write!(f, "complete"),
            FileStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for FileStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(FileStatus::Pending),
            "working" => Ok(FileStatus::Working),
            "complete" => Ok(FileStatus::Complete),
            "failed" => Ok(FileStatus::Failed),
            other => Err(format!("unknown file status '{}'", other)),
        }
    }
}

/// A single arrived file tracked through the pipeline
///
/// Created by the gatherer at first sighting; mutated only by the one
/// worker that dequeued it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// File name as reported by the arrival source
    pub file_name: String,
    /// Id of the batch this record belongs to, for its whole lifetime
    pub batch_id: String,
    /// Current pipeline status
    status: FileStatus,
    /// Number of status polls consumed so far
    attempts: u32,
    /// When the arrival source first reported this file
    pub first_seen: DateTime<Utc>,
    /// When a worker took ownership and began monitoring
    pub started_at: Option<DateTime<Utc>>,
    /// When a worker last polled the status source for this file
    pub last_checked: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// Create a pending record at first sighting
    pub fn new(file_name: &str, batch_id: &str, first_seen: DateTime<Utc>) -> Self {
        Self {
            file_name: file_name.to_string(),
            batch_id: batch_id.to_string(),
            status: FileStatus::Pending,
            attempts: 0,
            first_seen,
            started_at: None,
            last_checked: None,
        }
    }

    /// Current status
    pub fn status(&self) -> FileStatus {
        self.status
    }

    /// Polls consumed so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Mark as picked up by a worker. No-op once terminal.
    pub fn mark_working(&mut self) {
        if self.status == FileStatus::Pending {
            self.status = FileStatus::Working;
            self.started_at = Some(Utc::now());
        }
    }

    /// Mark as successfully completed. No-op once terminal.
    pub fn mark_complete(&mut self) {
        if !self.status.is_terminal() {
            self.status = FileStatus::Complete;
        }
    }

    /// Mark as failed. No-op once terminal.
    pub fn mark_failed(&mut self) {
        if !self.status.is_terminal() {
            self.status = FileStatus::Failed;
        }
    }

    /// Consume one poll attempt and stamp the check time
    pub fn record_poll(&mut self, at: DateTime<Utc>) {
        self.attempts += 1;
        self.last_checked = Some(at);
    }
}

/// Immutable result of one closed gather cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRecord {
    /// Unique batch identifier
    pub id: String,
    /// When the cycle opened
    pub created_at: DateTime<Utc>,
    /// Records in discovery order, each name at most once
    pub files: Vec<FileRecord>,
    /// Reference to the manifest artifact, if creation succeeded
    pub manifest_ref: Option<String>,
}

impl BatchRecord {
    /// Batch id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of files in the batch
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the cycle sighted no files at all
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// File names in discovery order
    pub fn file_names(&self) -> Vec<String> {
        self.files.iter().map(|f| f.file_name.clone()).collect()
    }
}

/// Accumulates sightings during an open gather cycle
///
/// Duplicate names across polls within the same cycle are coalesced:
/// a file is recorded once, at first sighting.
pub struct BatchBuilder {
    id: String,
    created_at: DateTime<Utc>,
    files: Vec<FileRecord>,
    seen: HashSet<String>,
}

impl BatchBuilder {
    /// Open a new cycle with a fresh batch id
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            files: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Batch id of the in-progress cycle
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Record a sighting. Returns true if the name was new to this cycle.
    pub fn merge_sighting(&mut self, file_name: &str, at: DateTime<Utc>) -> bool {
        if !self.seen.insert(file_name.to_string()) {
            return false;
        }
        self.files.push(FileRecord::new(file_name, &self.id, at));
        true
    }

    /// Number of distinct files sighted so far
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no files have been sighted yet
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Close the cycle and freeze the batch
    pub fn close(self) -> BatchRecord {
        BatchRecord {
            id: self.id,
            created_at: self.created_at,
            files: self.files,
            manifest_ref: None,
        }
    }
}

impl Default for BatchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        let mut record = FileRecord::new("a.txt", "batch-1", Utc::now());
        assert_eq!(record.status(), FileStatus::Pending);

        record.mark_working();
        assert_eq!(record.status(), FileStatus::Working);
        assert!(record.started_at.is_some());

        record.mark_complete();
        assert_eq!(record.status(), FileStatus::Complete);
        assert!(record.status().is_terminal());

        // Terminal states never move backward
        record.mark_working();
        record.mark_failed();
        assert_eq!(record.status(), FileStatus::Complete);
    }

    #[test]
    fn test_failed_is_terminal() {
        let mut record = FileRecord::new("b.txt", "batch-1", Utc::now());
        record.mark_working();
        record.mark_failed();
        assert_eq!(record.status(), FileStatus::Failed);

        record.mark_complete();
        assert_eq!(record.status(), FileStatus::Failed);
    }

    #[test]
    fn test_record_poll() {
        let mut record = FileRecord::new("c.txt", "batch-1", Utc::now());
        assert_eq!(record.attempts(), 0);
        assert!(record.last_checked.is_none());

        let now = Utc::now();
        record.record_poll(now);
        record.record_poll(now);
        assert_eq!(record.attempts(), 2);
        assert_eq!(record.last_checked, Some(now));
    }

    #[test]
    fn test_batch_builder_dedup() {
        let mut builder = BatchBuilder::new();
        let now = Utc::now();

        // Poll 1 sees a and b, poll 2 sees a, b and c
        assert!(builder.merge_sighting("a.txt", now));
        assert!(builder.merge_sighting("b.txt", now));
        assert!(!builder.merge_sighting("a.txt", now));
        assert!(!builder.merge_sighting("b.txt", now));
        assert!(builder.merge_sighting("c.txt", now));

        let batch = builder.close();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.file_names(), vec!["a.txt", "b.txt", "c.txt"]);
        assert!(batch.files.iter().all(|f| f.status() == FileStatus::Pending));
        assert!(batch.files.iter().all(|f| f.batch_id == batch.id));
    }

    #[test]
    fn test_status_parse_roundtrip() {
        for status in [
            FileStatus::Pending,
            FileStatus::Working,
            FileStatus::Complete,
            FileStatus::Failed,
        ] {
            let parsed: FileStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("bogus".parse::<FileStatus>().is_err());
    }
}
