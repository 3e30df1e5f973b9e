//! Filesystem-backed collaborator implementations
//!
//! Reference backends for running the pipeline against a local or
//! mounted directory: arrivals are the regular files in a watched
//! directory, statuses come from `<name>.status` marker files, manifests
//! are JSON artifacts, and alerts go to the structured log.

use crate::error::{SourceError, SourceResult};
use crate::record::FileStatus;
use crate::source::{AlertSink, AlertReason, ArrivalSource, ManifestStore, StatusSource};

use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;

/// Arrival source backed by a watched directory
///
/// Every visible regular file in the directory counts as arrived;
/// dotfiles are control markers, not arrivals. Names are returned
/// sorted so repeated listings are deterministic.
pub struct DirArrivalSource {
    watch_dir: PathBuf,
}

impl DirArrivalSource {
    /// Watch the given directory for arrivals
    pub fn new(watch_dir: impl Into<PathBuf>) -> Self {
        Self {
            watch_dir: watch_dir.into(),
        }
    }
}

#[async_trait::async_trait]
impl ArrivalSource for DirArrivalSource {
    async fn list_arrived_files(&self) -> SourceResult<Vec<String>> {
        let mut entries =
            tokio::fs::read_dir(&self.watch_dir)
                .await
                .map_err(|e| SourceError::Unavailable {
                    reason: format!("cannot list '{}': {}", self.watch_dir.display(), e),
                })?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| SourceError::Io {
            path: self.watch_dir.clone(),
            reason: e.to_string(),
        })? {
            let file_type = entry.file_type().await.map_err(|e| SourceError::Io {
                path: entry.path(),
                reason: e.to_string(),
            })?;
            if !file_type.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }
}

/// Status source backed by `<name>.status` marker files
///
/// The marker holds one of `pending`, `working`, `complete`, `failed`.
/// A missing marker means the external processor has not started yet,
/// which reads as `Pending`.
pub struct MarkerStatusSource {
    status_dir: PathBuf,
}

impl MarkerStatusSource {
    /// Read status markers from the given directory
    pub fn new(status_dir: impl Into<PathBuf>) -> Self {
        Self {
            status_dir: status_dir.into(),
        }
    }

    fn marker_path(&self, file_name: &str) -> PathBuf {
        self.status_dir.join(format!("{}.status", file_name))
    }
}

#[async_trait::async_trait]
impl StatusSource for MarkerStatusSource {
    async fn file_status(&self, file_name: &str) -> SourceResult<FileStatus> {
        let path = self.marker_path(file_name);

        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(FileStatus::Pending);
            }
            Err(e) => {
                return Err(SourceError::Unavailable {
                    reason: format!("cannot read '{}': {}", path.display(), e),
                });
            }
        };

        raw.parse().map_err(|reason| SourceError::Malformed { reason })
    }
}

#[derive(Serialize)]
struct Manifest<'a> {
    batch_id: &'a str,
    created_at: chrono::DateTime<Utc>,
    file_count: usize,
    files: &'a [String],
}

/// Manifest store writing JSON artifacts into a directory
pub struct FsManifestStore {
    manifest_dir: PathBuf,
}

impl FsManifestStore {
    /// Write manifests into the given directory
    pub fn new(manifest_dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest_dir: manifest_dir.into(),
        }
    }

    /// Deterministic manifest path for a batch id
    pub fn manifest_path(&self, batch_id: &str) -> PathBuf {
        self.manifest_dir
            .join(format!("{}_arrival_file_name.manifest", batch_id))
    }
}

#[async_trait::async_trait]
impl ManifestStore for FsManifestStore {
    async fn create_manifest(
        &self,
        batch_id: &str,
        file_names: &[String],
    ) -> SourceResult<String> {
        let manifest = Manifest {
            batch_id,
            created_at: Utc::now(),
            file_count: file_names.len(),
            files: file_names,
        };

        let body = serde_json::to_vec_pretty(&manifest).map_err(|e| SourceError::Malformed {
            reason: e.to_string(),
        })?;

        let path = self.manifest_path(batch_id);
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| SourceError::Io {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        Ok(path.display().to_string())
    }
}

/// Alert sink that emits through the structured log
pub struct LogAlertSink;

#[async_trait::async_trait]
impl AlertSink for LogAlertSink {
    async fn raise_alert(
        &self,
        file_name: &str,
        reason: AlertReason,
        context: &str,
    ) -> SourceResult<()> {
        tracing::error!(
            file = file_name,
            reason = %reason,
            context = context,
            "File alert raised"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_dir_arrival_source_lists_files_sorted() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"x").unwrap();
        std::fs::write(dir.path().join(".shutdown.trigger"), b"").unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();

        let source = DirArrivalSource::new(dir.path());
        let names = source.list_arrived_files().await.unwrap();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_dir_arrival_source_missing_dir_is_unavailable() {
        let source = DirArrivalSource::new("/definitely/not/here");
        let err = source.list_arrived_files().await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_marker_status_source() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt.status"), "complete\n").unwrap();
        std::fs::write(dir.path().join("b.txt.status"), "FAILED").unwrap();

        let source = MarkerStatusSource::new(dir.path());
        assert_eq!(
            source.file_status("a.txt").await.unwrap(),
            FileStatus::Complete
        );
        assert_eq!(
            source.file_status("b.txt").await.unwrap(),
            FileStatus::Failed
        );
        // No marker yet: the external processor has not started
        assert_eq!(
            source.file_status("c.txt").await.unwrap(),
            FileStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_manifest_store_writes_deterministic_name() {
        let dir = tempdir().unwrap();
        let store = FsManifestStore::new(dir.path());

        let files = vec!["a.txt".to_string(), "b.txt".to_string()];
        let reference = store.create_manifest("batch-42", &files).await.unwrap();

        let expected = dir.path().join("batch-42_arrival_file_name.manifest");
        assert_eq!(reference, expected.display().to_string());

        let body = std::fs::read_to_string(expected).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["batch_id"], "batch-42");
        assert_eq!(parsed["file_count"], 2);
        assert_eq!(parsed["files"][1], "b.txt");
    }
}
