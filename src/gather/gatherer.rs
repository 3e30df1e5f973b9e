//! Bounded arrival-discovery cycles
//!
//! A cycle queries the arrival source a fixed number of times on a
//! fixed spacing, merging new names into the in-progress batch at first
//! sighting. An unreachable source skips that single poll and consumes
//! one of the cycle's polls. Manifest creation after the window closes
//! is best-effort bookkeeping, never a correctness gate.

use crate::config::WardenConfig;
use crate::queue::JobQueue;
use crate::record::{BatchBuilder, BatchRecord};
use crate::source::{ArrivalSource, ManifestStore};

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Result of one completed gather cycle
#[derive(Debug)]
pub struct GatherOutcome {
    /// The closed, immutable batch
    pub batch: BatchRecord,
    /// Records admitted to the queue (differs from batch size only when
    /// intake closed mid-cycle)
    pub enqueued: usize,
    /// Arrival polls that failed and were skipped
    pub skipped_polls: u32,
    /// Whether the manifest artifact was created
    pub manifest_created: bool,
}

/// Discovers newly arrived files and produces one batch per cycle
pub struct ArrivalGatherer {
    arrivals: Arc<dyn ArrivalSource>,
    manifests: Arc<dyn ManifestStore>,
    queue: Arc<JobQueue>,
    polls_per_cycle: u32,
    poll_spacing: Duration,
}

impl ArrivalGatherer {
    /// Create a gatherer feeding the given queue
    pub fn new(
        config: &WardenConfig,
        arrivals: Arc<dyn ArrivalSource>,
        manifests: Arc<dyn ManifestStore>,
        queue: Arc<JobQueue>,
    ) -> Self {
        Self {
            arrivals,
            manifests,
            queue,
            polls_per_cycle: config.arrival_polls_per_cycle,
            poll_spacing: config.arrival_poll_spacing,
        }
    }

    /// Run one observation window and hand its batch to the queue
    pub async fn run_gather_cycle(&self) -> GatherOutcome {
        let mut builder = BatchBuilder::new();
        let mut skipped_polls = 0u32;

        debug!(
            batch = builder.id(),
            polls = self.polls_per_cycle,
            "Gather cycle opened"
        );

        for poll in 1..=self.polls_per_cycle {
            if poll > 1 {
                tokio::time::sleep(self.poll_spacing).await;
            }

            match self.arrivals.list_arrived_files().await {
                Ok(names) => {
                    let now = Utc::now();
                    let mut new_names = 0usize;
                    for name in &names {
                        if builder.merge_sighting(name, now) {
                            new_names += 1;
                        }
                    }
                    debug!(
                        batch = builder.id(),
                        poll = poll,
                        visible = names.len(),
                        new = new_names,
                        "Arrival poll merged"
                    );
                }
                Err(e) => {
                    // Single poll skipped; still counts toward the window
                    skipped_polls += 1;
                    warn!(
                        batch = builder.id(),
                        poll = poll,
                        error = %e,
                        "Arrival source unreachable, skipping this poll"
                    );
                }
            }
        }

        let mut batch = builder.close();

        let manifest_created = match self
            .manifests
            .create_manifest(batch.id(), &batch.file_names())
            .await
        {
            Ok(reference) => {
                batch.manifest_ref = Some(reference);
                true
            }
            Err(e) => {
                warn!(
                    batch = batch.id(),
                    error = %e,
                    "Manifest creation failed, continuing without one"
                );
                false
            }
        };

        let enqueued = self.enqueue_batch(&batch).await;

        info!(
            batch = batch.id(),
            files = batch.len(),
            enqueued = enqueued,
            skipped_polls = skipped_polls,
            "Gather cycle closed"
        );

        GatherOutcome {
            batch,
            enqueued,
            skipped_polls,
            manifest_created,
        }
    }

    /// Enqueue the closed batch in discovery order
    ///
    /// Backpressure from a full queue simply awaits; a closed intake
    /// (drain started mid-cycle) refuses the rest of the batch, which is
    /// logged loudly rather than dropped silently.
    async fn enqueue_batch(&self, batch: &BatchRecord) -> usize {
        let mut enqueued = 0usize;
        for record in batch.files.iter().cloned() {
            match self.queue.enqueue(record).await {
                Ok(()) => enqueued += 1,
                Err(e) => {
                    error!(
                        batch = batch.id(),
                        admitted = enqueued,
                        refused = batch.len() - enqueued,
                        error = %e,
                        "Queue refused remainder of batch"
                    );
                    break;
                }
            }
        }
        enqueued
    }
}
