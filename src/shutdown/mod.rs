//! Shutdown module for cooperative drain
//!
//! A watch loop polls for a trigger marker; on detection the system
//! stops taking new work and finishes what is in flight. There is no
//! drain deadline: in-flight monitoring is already bounded by the
//! per-file attempt budget.

mod coordinator;

pub use coordinator::{DrainState, ShutdownCoordinator};
