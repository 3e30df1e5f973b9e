//! Fixed-size pool of status pollers
//!
//! Workers are symmetric and stateless between assignments; the pool
//! size is the sole concurrency throttle on status polling. Exclusive
//! record ownership is structural: a record leaves the queue exactly
//! once and belongs to the worker that dequeued it until resolution.

use crate::config::WardenConfig;
use crate::queue::JobQueue;
use crate::source::{AlertSink, StatusSource};
use crate::worker::poller::{PollOutcome, StatusPoller};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Terminal-outcome and error counters shared across the pool
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Records that resolved `Complete`
    pub completed: AtomicU64,
    /// Records the status source reported as failed
    pub failed: AtomicU64,
    /// Records that exhausted their attempt budget
    pub timed_out: AtomicU64,
    /// Alerts handed to the alert sink
    pub alerts_raised: AtomicU64,
    /// Transient status-source errors (each consumed one attempt)
    pub poll_errors: AtomicU64,
}

impl PoolStats {
    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alert(&self) {
        self.alerts_raised.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poll_error(&self) {
        self.poll_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Total records resolved, regardless of outcome
    pub fn resolved(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
            + self.failed.load(Ordering::Relaxed)
            + self.timed_out.load(Ordering::Relaxed)
    }
}

/// Fixed set of concurrently running status pollers
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    working: Arc<AtomicU64>,
    stats: Arc<PoolStats>,
}

impl WorkerPool {
    /// Spawn `config.pool_size` workers consuming the shared queue
    pub fn spawn(
        config: &WardenConfig,
        queue: Arc<JobQueue>,
        status: Arc<dyn StatusSource>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        let working = Arc::new(AtomicU64::new(0));
        let stats = Arc::new(PoolStats::default());

        let mut handles = Vec::with_capacity(config.pool_size);
        for worker_id in 0..config.pool_size {
            let poller = StatusPoller::new(
                worker_id,
                Arc::clone(&status),
                Arc::clone(&alerts),
                config.status_poll_interval,
                config.max_poll_attempts,
                Arc::clone(&stats),
            );
            let queue = Arc::clone(&queue);
            let working = Arc::clone(&working);
            let stats = Arc::clone(&stats);

            handles.push(tokio::spawn(async move {
                worker_loop(worker_id, queue, poller, working, stats).await;
            }));
        }

        Self {
            handles,
            working,
            stats,
        }
    }

    /// Number of records being polled right now
    pub fn working_count(&self) -> u64 {
        self.working.load(Ordering::SeqCst)
    }

    /// Shared gauge of records being polled, for progress reporting
    pub fn working_gauge(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.working)
    }

    /// Shared outcome counters
    pub fn stats(&self) -> Arc<PoolStats> {
        Arc::clone(&self.stats)
    }

    /// Wait for every worker to exit
    ///
    /// Workers exit once the queue has closed intake and drained, so
    /// joining the pool is the drain barrier for in-flight monitoring.
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

/// One worker: dequeue, resolve, repeat until the queue is drained
async fn worker_loop(
    worker_id: usize,
    queue: Arc<JobQueue>,
    poller: StatusPoller,
    working: Arc<AtomicU64>,
    stats: Arc<PoolStats>,
) {
    debug!(worker_id = worker_id, "Worker starting");

    while let Some(mut record) = queue.dequeue().await {
        working.fetch_add(1, Ordering::SeqCst);

        let outcome = poller.monitor(&mut record).await;
        match outcome {
            PollOutcome::Completed => stats.record_completed(),
            PollOutcome::Failed => stats.record_failed(),
            PollOutcome::TimedOut => stats.record_timed_out(),
        }

        working.fetch_sub(1, Ordering::SeqCst);
    }

    debug!(worker_id = worker_id, "Worker exited, queue drained");
}
