//! Simulator boundary: facade trait, scenario input, and replay harness.
//!
//! The controller never talks to a simulator directly; everything goes
//! through the [`Simulator`] trait defined here. This module provides:
//! 1. **Facade:** The trait and the snapshot structs its queries return.
//! 2. **Scenario:** Declarative cluster + workload descriptions (serde).
//! 3. **Replay:** A deterministic harness that drives the controller from a
//!    scenario, used by the CLI and the integration tests.

/// The simulator facade trait and snapshot types.
pub mod facade;
/// Deterministic replay harness.
pub mod replay;
/// Declarative scenario types.
pub mod scenario;

pub use facade::{MachineSnapshot, Simulator, TaskSnapshot, VmSnapshot};
pub use replay::ReplayCluster;
pub use scenario::{MachineSpec, Scenario, TaskSpec};
