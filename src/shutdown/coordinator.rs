//! Drain state machine and trigger watch loop
//!
//! States move one way: `Running -> DrainRequested -> Drained`. The
//! trigger is a sentinel marker file at a well-known path; detection
//! renames it to `<name>.in-progress` so a second trigger finds nothing
//! and cannot re-fire the drain.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const STATE_RUNNING: u8 = 0;
const STATE_DRAIN_REQUESTED: u8 = 1;
const STATE_DRAINED: u8 = 2;

/// Drain progress of the whole system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainState {
    /// Accepting and processing work
    Running,
    /// No new work; in-flight work finishing
    DrainRequested,
    /// Everything finished; safe to exit
    Drained,
}

/// Watches for the shutdown trigger and tracks drain progress
///
/// Cheap to clone; all clones share one state machine.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    trigger_path: PathBuf,
    poll_interval: Duration,
    state: AtomicU8,
    drain_token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a coordinator watching the given trigger path
    pub fn new(trigger_path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                trigger_path: trigger_path.into(),
                poll_interval,
                state: AtomicU8::new(STATE_RUNNING),
                drain_token: CancellationToken::new(),
            }),
        }
    }

    /// Current drain state
    pub fn state(&self) -> DrainState {
        match self.inner.state.load(Ordering::SeqCst) {
            STATE_RUNNING => DrainState::Running,
            STATE_DRAIN_REQUESTED => DrainState::DrainRequested,
            _ => DrainState::Drained,
        }
    }

    /// Whether drain has been requested (or already finished)
    pub fn drain_requested(&self) -> bool {
        self.inner.state.load(Ordering::SeqCst) != STATE_RUNNING
    }

    /// Token cancelled exactly once, when drain is first requested
    pub fn drain_token(&self) -> CancellationToken {
        self.inner.drain_token.clone()
    }

    /// Request a drain. Returns true for the first caller only.
    pub fn request_drain(&self) -> bool {
        let won = self
            .inner
            .state
            .compare_exchange(
                STATE_RUNNING,
                STATE_DRAIN_REQUESTED,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if won {
            info!("Drain requested, no new work will be accepted");
            self.inner.drain_token.cancel();
        }
        won
    }

    /// Record that the system has fully drained
    pub fn mark_drained(&self) {
        let moved = self
            .inner
            .state
            .compare_exchange(
                STATE_DRAIN_REQUESTED,
                STATE_DRAINED,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if moved {
            info!("System drained");
        }
    }

    /// The in-progress path a detected trigger is renamed to
    pub fn in_progress_path(&self) -> PathBuf {
        in_progress_path(&self.inner.trigger_path)
    }

    /// Watch for the trigger marker until drain is requested
    ///
    /// Detection renames the marker before requesting drain, so a
    /// re-created marker after rename belongs to the next run, and a
    /// concurrent detector losing the rename race is a no-op.
    pub async fn watch(&self) {
        debug!(
            trigger = %self.inner.trigger_path.display(),
            "Shutdown watch started"
        );

        let mut interval = tokio::time::interval(self.inner.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.inner.drain_token.cancelled() => break,
                _ = interval.tick() => {
                    if self.check_trigger() {
                        break;
                    }
                }
            }
        }

        debug!("Shutdown watch exited");
    }

    /// One trigger check. Returns true if this call initiated the drain.
    fn check_trigger(&self) -> bool {
        let trigger = &self.inner.trigger_path;
        if !trigger.exists() {
            return false;
        }

        let claimed = self.in_progress_path();
        match std::fs::rename(trigger, &claimed) {
            Ok(()) => {
                info!(
                    trigger = %trigger.display(),
                    claimed = %claimed.display(),
                    "Shutdown trigger detected"
                );
                self.request_drain()
            }
            Err(e) => {
                // Lost the rename race or the marker vanished; either way
                // someone else owns the trigger now
                warn!(
                    trigger = %trigger.display(),
                    error = %e,
                    "Could not claim shutdown trigger"
                );
                false
            }
        }
    }
}

/// In-progress variant of a trigger path
fn in_progress_path(trigger: &Path) -> PathBuf {
    let mut name = trigger
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "shutdown".to_string());
    name.push_str(".in-progress");
    trigger.with_file_name(name)
}
