//! Pipeline orchestration
//!
//! Startup wiring, the periodic gather scheduler, and the drain path.
//! Cancellation is observed at loop-iteration boundaries only: an open
//! gather window finishes, and workers finish their in-flight records.

use crate::config::WardenConfig;
use crate::error::Result;
use crate::gather::ArrivalGatherer;
use crate::queue::JobQueue;
use crate::shutdown::ShutdownCoordinator;
use crate::source::{AlertSink, ArrivalSource, ManifestStore, StatusSource};
use crate::worker::WorkerPool;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Point-in-time snapshot for progress reporting
#[derive(Debug, Clone, Default)]
pub struct PipelineProgress {
    /// Gather cycles completed
    pub cycles_completed: u64,
    /// Distinct files discovered across all batches
    pub files_discovered: u64,
    /// Records admitted to the queue
    pub files_enqueued: u64,
    /// Records waiting in the queue right now
    pub queued: u64,
    /// Records being polled right now
    pub working: u64,
    /// Records resolved `Complete`
    pub files_completed: u64,
    /// Records resolved `Failed` by the status source
    pub files_failed: u64,
    /// Records that exhausted their attempt budget
    pub files_timed_out: u64,
    /// Transient status-poll errors
    pub poll_errors: u64,
    /// Elapsed run time
    pub elapsed: Duration,
}

/// Final accounting of one orchestrator run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Gather cycles completed
    pub cycles_completed: u64,
    /// Distinct files discovered across all batches
    pub files_discovered: u64,
    /// Records admitted to the queue
    pub files_enqueued: u64,
    /// Records refused because intake closed mid-cycle
    pub files_refused: u64,
    /// Records resolved `Complete`
    pub files_completed: u64,
    /// Records resolved `Failed` by the status source
    pub files_failed: u64,
    /// Records that exhausted their attempt budget
    pub files_timed_out: u64,
    /// Alerts handed to the alert sink
    pub alerts_raised: u64,
    /// Transient status-poll errors
    pub poll_errors: u64,
    /// Arrival polls skipped because the source was unreachable
    pub skipped_arrival_polls: u64,
    /// Gather cycles whose manifest could not be created
    pub manifest_failures: u64,
    /// Total run time
    pub duration: Duration,
}

/// Counters the gather loop shares with the progress reporter
#[derive(Debug, Default)]
struct GatherCounters {
    cycles: AtomicU64,
    discovered: AtomicU64,
    enqueued: AtomicU64,
    refused: AtomicU64,
    skipped_polls: AtomicU64,
    manifest_failures: AtomicU64,
}

/// Wires the gatherer, queue, worker pool, and shutdown coordinator
pub struct Orchestrator {
    config: WardenConfig,
    arrivals: Arc<dyn ArrivalSource>,
    status: Arc<dyn StatusSource>,
    alerts: Arc<dyn AlertSink>,
    manifests: Arc<dyn ManifestStore>,
    coordinator: ShutdownCoordinator,
}

impl Orchestrator {
    /// Validate configuration and wire the pipeline
    ///
    /// This is the only fatal path: an invalid pool size or queue
    /// capacity aborts startup. Everything after `run` starts is
    /// recovered at loop level.
    pub fn new(
        config: WardenConfig,
        arrivals: Arc<dyn ArrivalSource>,
        status: Arc<dyn StatusSource>,
        alerts: Arc<dyn AlertSink>,
        manifests: Arc<dyn ManifestStore>,
    ) -> Result<Self> {
        config.validate()?;
        let coordinator =
            ShutdownCoordinator::new(&config.trigger_path, config.trigger_poll_interval);
        Ok(Self {
            config,
            arrivals,
            status,
            alerts,
            manifests,
            coordinator,
        })
    }

    /// Handle for external drain requests (signal handlers, tests)
    pub fn coordinator(&self) -> ShutdownCoordinator {
        self.coordinator.clone()
    }

    /// Run until drained
    ///
    /// Starts the shutdown watch and the worker pool, then drives gather
    /// cycles on the configured period until drain is requested; after
    /// that, waits for the queue to empty and every in-flight poll to
    /// resolve before returning.
    pub async fn run<F>(self, progress_callback: F) -> Result<RunSummary>
    where
        F: Fn(PipelineProgress) + Send + Sync + 'static,
    {
        let start = Instant::now();

        let queue = Arc::new(JobQueue::new(self.config.queue_capacity)?);
        let drain_token = self.coordinator.drain_token();

        info!(
            watch_dir = %self.config.watch_dir.display(),
            pool_size = self.config.pool_size,
            queue_capacity = queue.capacity(),
            gather_period_secs = self.config.gather_period.as_secs(),
            "Starting arrival pipeline"
        );

        // Shutdown trigger watch
        let watch_handle = {
            let coordinator = self.coordinator.clone();
            tokio::spawn(async move { coordinator.watch().await })
        };

        // Close queue intake the moment drain is requested, so queued
        // records drain while new ones are refused
        {
            let token = drain_token.clone();
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                token.cancelled().await;
                queue.close_intake();
            });
        }

        let pool = WorkerPool::spawn(
            &self.config,
            Arc::clone(&queue),
            Arc::clone(&self.status),
            Arc::clone(&self.alerts),
        );
        let pool_stats = pool.stats();
        let working_gauge = pool.working_gauge();

        let counters = Arc::new(GatherCounters::default());

        // Progress reporter
        let finished = Arc::new(AtomicBool::new(false));
        let reporter_handle = if self.config.show_progress {
            let counters = Arc::clone(&counters);
            let pool_stats = Arc::clone(&pool_stats);
            let working_gauge = Arc::clone(&working_gauge);
            let queue = Arc::clone(&queue);
            let finished = Arc::clone(&finished);
            let callback = Arc::new(progress_callback);

            Some(tokio::spawn(async move {
                let start = Instant::now();
                while !finished.load(Ordering::Relaxed) {
                    callback(PipelineProgress {
                        cycles_completed: counters.cycles.load(Ordering::Relaxed),
                        files_discovered: counters.discovered.load(Ordering::Relaxed),
                        files_enqueued: counters.enqueued.load(Ordering::Relaxed),
                        queued: queue.len() as u64,
                        working: working_gauge.load(Ordering::SeqCst),
                        files_completed: pool_stats.completed.load(Ordering::Relaxed),
                        files_failed: pool_stats.failed.load(Ordering::Relaxed),
                        files_timed_out: pool_stats.timed_out.load(Ordering::Relaxed),
                        poll_errors: pool_stats.poll_errors.load(Ordering::Relaxed),
                        elapsed: start.elapsed(),
                    });
                    tokio::time::sleep(Duration::from_millis(250)).await;
                }
            }))
        } else {
            None
        };

        // Gather scheduler: cycles never overlap because each one is
        // awaited inline, and a missed tick just delays the next cycle
        let gatherer = ArrivalGatherer::new(
            &self.config,
            Arc::clone(&self.arrivals),
            Arc::clone(&self.manifests),
            Arc::clone(&queue),
        );

        let mut interval = tokio::time::interval(self.config.gather_period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = drain_token.cancelled() => break,
                _ = interval.tick() => {
                    let outcome = gatherer.run_gather_cycle().await;
                    counters.cycles.fetch_add(1, Ordering::Relaxed);
                    counters
                        .discovered
                        .fetch_add(outcome.batch.len() as u64, Ordering::Relaxed);
                    counters
                        .enqueued
                        .fetch_add(outcome.enqueued as u64, Ordering::Relaxed);
                    counters.refused.fetch_add(
                        (outcome.batch.len() - outcome.enqueued) as u64,
                        Ordering::Relaxed,
                    );
                    counters
                        .skipped_polls
                        .fetch_add(outcome.skipped_polls as u64, Ordering::Relaxed);
                    if !outcome.manifest_created {
                        counters.manifest_failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }

        info!(
            queued = queue.len(),
            working = pool.working_count(),
            "Gather scheduler stopped, draining"
        );

        // Intake is closed by the drain task; workers exit once the
        // queue is empty and their in-flight polls resolve
        queue.close_intake();
        pool.join().await;

        let _ = watch_handle.await;
        finished.store(true, Ordering::SeqCst);
        if let Some(handle) = reporter_handle {
            let _ = handle.await;
        }

        self.coordinator.mark_drained();

        let refused = counters.refused.load(Ordering::Relaxed);
        if refused > 0 {
            warn!(refused = refused, "Records discovered after drain were not admitted");
        }

        let summary = RunSummary {
            cycles_completed: counters.cycles.load(Ordering::Relaxed),
            files_discovered: counters.discovered.load(Ordering::Relaxed),
            files_enqueued: counters.enqueued.load(Ordering::Relaxed),
            files_refused: refused,
            files_completed: pool_stats.completed.load(Ordering::Relaxed),
            files_failed: pool_stats.failed.load(Ordering::Relaxed),
            files_timed_out: pool_stats.timed_out.load(Ordering::Relaxed),
            alerts_raised: pool_stats.alerts_raised.load(Ordering::Relaxed),
            poll_errors: pool_stats.poll_errors.load(Ordering::Relaxed),
            skipped_arrival_polls: counters.skipped_polls.load(Ordering::Relaxed),
            manifest_failures: counters.manifest_failures.load(Ordering::Relaxed),
            duration: start.elapsed(),
        };

        info!(
            cycles = summary.cycles_completed,
            discovered = summary.files_discovered,
            completed = summary.files_completed,
            failed = summary.files_failed,
            timed_out = summary.files_timed_out,
            duration_secs = summary.duration.as_secs(),
            "Pipeline drained"
        );

        Ok(summary)
    }
}
