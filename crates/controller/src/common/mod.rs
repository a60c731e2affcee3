//! Common types shared across the controller.
//!
//! This module collects the vocabulary every other module speaks:
//! 1. **Identifiers:** Opaque ID newtypes for machines, VMs, and tasks.
//! 2. **Domain enums:** CPU families, VM types, SLA classes, priorities, and
//!    power states, with the single canonical `Display` set.
//! 3. **Errors:** The controller error type returned through every event
//!    entry point.

/// Error types surfaced by the controller.
pub mod error;
/// Strong ID newtypes for machines, VMs, and tasks.
pub mod ids;
/// Domain enums and their canonical string forms.
pub mod types;

pub use error::ControllerError;
pub use ids::{MachineId, TaskId, VmId};
pub use types::{CpuFamily, Priority, PowerState, SlaClass, VmType};

/// Simulated time in microseconds, as delivered by the simulator's events.
///
/// The end-of-run report divides by 1,000,000 to print seconds.
pub type Time = u64;
