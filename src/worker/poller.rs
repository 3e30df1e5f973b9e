//! Status poller: owns one FileRecord from dequeue to resolution
//!
//! The poller asks the external status source about its file on a fixed
//! interval, up to a fixed attempt budget. Transient source errors
//! consume an attempt and are retried on the next scheduled poll;
//! exhausting the budget is a timeout and fails the record.

use crate::record::{FileRecord, FileStatus};
use crate::source::{AlertReason, AlertSink, StatusSource};
use crate::worker::pool::PoolStats;

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Terminal resolution of one monitored record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The status source reported `Complete`
    Completed,
    /// The status source reported `Failed`
    Failed,
    /// The attempt budget ran out without a terminal status
    TimedOut,
}

/// Polls the status source for one record at a time
pub struct StatusPoller {
    worker_id: usize,
    status: Arc<dyn StatusSource>,
    alerts: Arc<dyn AlertSink>,
    poll_interval: Duration,
    max_attempts: u32,
    stats: Arc<PoolStats>,
}

impl StatusPoller {
    /// Create a poller bound to one worker slot
    pub fn new(
        worker_id: usize,
        status: Arc<dyn StatusSource>,
        alerts: Arc<dyn AlertSink>,
        poll_interval: Duration,
        max_attempts: u32,
        stats: Arc<PoolStats>,
    ) -> Self {
        Self {
            worker_id,
            status,
            alerts,
            poll_interval,
            max_attempts,
            stats,
        }
    }

    /// Monitor one record until it resolves or its budget runs out
    ///
    /// Each attempt is preceded by one interval sleep, so the monitoring
    /// ceiling is `poll_interval * max_attempts`.
    pub async fn monitor(&self, record: &mut FileRecord) -> PollOutcome {
        record.mark_working();
        debug!(
            worker_id = self.worker_id,
            file = %record.file_name,
            batch = %record.batch_id,
            "Monitoring file"
        );

        for attempt in 1..=self.max_attempts {
            tokio::time::sleep(self.poll_interval).await;
            record.record_poll(Utc::now());

            match self.status.file_status(&record.file_name).await {
                Ok(FileStatus::Complete) => {
                    record.mark_complete();
                    debug!(
                        worker_id = self.worker_id,
                        file = %record.file_name,
                        attempts = attempt,
                        "File completed"
                    );
                    return PollOutcome::Completed;
                }
                Ok(FileStatus::Failed) => {
                    record.mark_failed();
                    self.raise_alert(
                        record,
                        AlertReason::FileFailed,
                        &format!("status source reported failure on attempt {}", attempt),
                    )
                    .await;
                    return PollOutcome::Failed;
                }
                Ok(_) => {
                    // Still pending or working at the source; keep waiting
                }
                Err(e) => {
                    // One consumed attempt, not an automatic failure
                    self.stats.record_poll_error();
                    warn!(
                        worker_id = self.worker_id,
                        file = %record.file_name,
                        attempt = attempt,
                        error = %e,
                        "Status poll failed, will retry on next interval"
                    );
                }
            }
        }

        record.mark_failed();
        self.raise_alert(
            record,
            AlertReason::Timeout,
            &format!(
                "no terminal status after {} attempts ({:?} apart)",
                self.max_attempts, self.poll_interval
            ),
        )
        .await;
        PollOutcome::TimedOut
    }

    /// Deliver an alert; delivery failures are logged and swallowed so
    /// the worker always returns to the pool.
    async fn raise_alert(&self, record: &FileRecord, reason: AlertReason, context: &str) {
        self.stats.record_alert();
        if let Err(e) = self
            .alerts
            .raise_alert(&record.file_name, reason, context)
            .await
        {
            warn!(
                worker_id = self.worker_id,
                file = %record.file_name,
                reason = %reason,
                error = %e,
                "Alert delivery failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SourceError, SourceResult};
    use crate::source::AlertReason;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    /// Status source that replays a scripted sequence of responses
    struct ScriptedStatusSource {
        script: Mutex<VecDeque<SourceResult<FileStatus>>>,
        polls: AtomicU64,
    }

    impl ScriptedStatusSource {
        fn new(script: Vec<SourceResult<FileStatus>>) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
                polls: AtomicU64::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl StatusSource for ScriptedStatusSource {
        async fn file_status(&self, _file_name: &str) -> SourceResult<FileStatus> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(FileStatus::Pending))
        }
    }

    /// Alert sink recording every delivery
    #[derive(Default)]
    struct RecordingAlertSink {
        alerts: Mutex<Vec<(String, AlertReason)>>,
        fail_delivery: bool,
    }

    #[async_trait::async_trait]
    impl AlertSink for RecordingAlertSink {
        async fn raise_alert(
            &self,
            file_name: &str,
            reason: AlertReason,
            _context: &str,
        ) -> SourceResult<()> {
            self.alerts
                .lock()
                .unwrap()
                .push((file_name.to_string(), reason));
            if self.fail_delivery {
                return Err(SourceError::Unavailable {
                    reason: "smtp down".into(),
                });
            }
            Ok(())
        }
    }

    fn poller(
        status: Arc<ScriptedStatusSource>,
        alerts: Arc<RecordingAlertSink>,
        max_attempts: u32,
    ) -> StatusPoller {
        StatusPoller::new(
            0,
            status,
            alerts,
            Duration::from_millis(1),
            max_attempts,
            Arc::new(PoolStats::default()),
        )
    }

    fn unavailable() -> SourceResult<FileStatus> {
        Err(SourceError::Unavailable {
            reason: "connection refused".into(),
        })
    }

    #[tokio::test]
    async fn test_completes_after_pending_polls() {
        let status = Arc::new(ScriptedStatusSource::new(vec![
            Ok(FileStatus::Pending),
            Ok(FileStatus::Working),
            Ok(FileStatus::Complete),
        ]));
        let alerts = Arc::new(RecordingAlertSink::default());
        let poller = poller(Arc::clone(&status), Arc::clone(&alerts), 15);

        let mut record = FileRecord::new("a.txt", "batch-1", Utc::now());
        let outcome = poller.monitor(&mut record).await;

        assert_eq!(outcome, PollOutcome::Completed);
        assert_eq!(record.status(), FileStatus::Complete);
        assert_eq!(record.attempts(), 3);
        assert!(record.last_checked.is_some());
        assert!(alerts.alerts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transient_errors_consume_attempts_then_complete() {
        // Transient errors on attempts 1-3, Complete on attempt 4
        let status = Arc::new(ScriptedStatusSource::new(vec![
            unavailable(),
            unavailable(),
            unavailable(),
            Ok(FileStatus::Complete),
        ]));
        let alerts = Arc::new(RecordingAlertSink::default());
        let poller = poller(Arc::clone(&status), Arc::clone(&alerts), 15);

        let mut record = FileRecord::new("a.txt", "batch-1", Utc::now());
        let outcome = poller.monitor(&mut record).await;

        assert_eq!(outcome, PollOutcome::Completed);
        assert_eq!(record.attempts(), 4);
        assert_eq!(status.polls.load(Ordering::SeqCst), 4);
        assert!(alerts.alerts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_source_failure_alerts_and_resolves() {
        let status = Arc::new(ScriptedStatusSource::new(vec![
            Ok(FileStatus::Working),
            Ok(FileStatus::Failed),
        ]));
        let alerts = Arc::new(RecordingAlertSink::default());
        let poller = poller(status, Arc::clone(&alerts), 15);

        let mut record = FileRecord::new("a.txt", "batch-1", Utc::now());
        let outcome = poller.monitor(&mut record).await;

        assert_eq!(outcome, PollOutcome::Failed);
        assert_eq!(record.status(), FileStatus::Failed);
        let raised = alerts.alerts.lock().unwrap();
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0], ("a.txt".to_string(), AlertReason::FileFailed));
    }

    #[tokio::test]
    async fn test_budget_exhaustion_times_out_with_one_alert() {
        // Source never resolves: budget of 15 ends in a timeout alert
        let status = Arc::new(ScriptedStatusSource::new(vec![]));
        let alerts = Arc::new(RecordingAlertSink::default());
        let poller = poller(Arc::clone(&status), Arc::clone(&alerts), 15);

        let mut record = FileRecord::new("stuck.txt", "batch-1", Utc::now());
        let outcome = poller.monitor(&mut record).await;

        assert_eq!(outcome, PollOutcome::TimedOut);
        assert_eq!(record.status(), FileStatus::Failed);
        assert_eq!(record.attempts(), 15);
        assert_eq!(status.polls.load(Ordering::SeqCst), 15);

        let raised = alerts.alerts.lock().unwrap();
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].1, AlertReason::Timeout);
    }

    #[tokio::test]
    async fn test_alert_delivery_failure_is_swallowed() {
        let status = Arc::new(ScriptedStatusSource::new(vec![Ok(FileStatus::Failed)]));
        let alerts = Arc::new(RecordingAlertSink {
            fail_delivery: true,
            ..Default::default()
        });
        let poller = poller(status, Arc::clone(&alerts), 15);

        let mut record = FileRecord::new("a.txt", "batch-1", Utc::now());
        let outcome = poller.monitor(&mut record).await;

        // The worker still resolves and releases despite the sink error
        assert_eq!(outcome, PollOutcome::Failed);
        assert_eq!(alerts.alerts.lock().unwrap().len(), 1);
    }
}
