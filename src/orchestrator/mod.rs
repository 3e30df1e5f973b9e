//! Orchestrator module wiring the pipeline together
//!
//! Owns the gather-cycle scheduler and the lifecycle of the queue,
//! worker pool, and shutdown watch. All state is explicit; there are no
//! process-wide singletons.

mod engine;

pub use engine::{Orchestrator, PipelineProgress, RunSummary};
