//! Controller error definitions.
//!
//! The controller recognizes exactly two classes of failure:
//! 1. **Bugs:** A broken world-model invariant. These panic with a diagnostic
//!    at the mutation site; they are never represented as a value.
//! 2. **Hard failures:** Conditions the controller cannot recover from but
//!    that are the environment's fault, surfaced as [`ControllerError`]
//!    through every event entry point.
//!
//! Transient conditions (a busy destination, a stale wake-queue entry) are
//! recovered locally inside the policies and never reach this type.

use thiserror::Error;

use super::ids::TaskId;

/// Hard failures surfaced by the controller's event handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// No machine in the cluster — awake or asleep — has a compatible CPU
    /// family and enough spare memory for the task. The cluster is
    /// considered misconfigured for the workload.
    #[error("no machine with a compatible CPU and spare memory for task {task} after SLA violation")]
    NoPlacementPossible {
        /// The task that could not be placed.
        task: TaskId,
    },

    /// The replay scenario is malformed (empty cluster, impossible trace).
    #[error("invalid scenario: {0}")]
    Scenario(String),
}
