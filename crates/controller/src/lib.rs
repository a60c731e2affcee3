//! Power- and SLA-aware VM placement controller library.
//!
//! This crate implements a placement controller for a simulated virtualized
//! datacenter with the following:
//! 1. **World model:** The controller's private mirror of power transitions,
//!    in-flight migrations, memory reservations, wake queues, and the
//!    task→VM index, with invariant-asserting mutators.
//! 2. **Classifier:** Stateless predicates over task requirements and
//!    machine/VM state.
//! 3. **Policies:** Greedy, P-Mapper, and E-Eco strategies behind a common
//!    nine-event capability, selected at init time.
//! 4. **Engine:** The controller owner struct, the event router, and the
//!    invariant-ordered action dispatcher.
//! 5. **Simulator boundary:** The facade trait plus a deterministic replay
//!    harness for end-to-end runs.

/// Stateless placement predicates.
pub mod classify;
/// Common types: IDs, domain enums, errors, simulated time.
pub mod common;
/// Controller configuration (defaults, policy selection, replay timing).
pub mod config;
/// Controller engine: owner struct, event router, action dispatcher.
pub mod engine;
/// World model: power transitions, migrations, reservations, indices.
pub mod model;
/// Placement policies and policy dispatch.
pub mod policy;
/// Simulator boundary: facade trait, scenario input, replay harness.
pub mod sim;
/// Run statistics and the end-of-run report.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// The placement controller; owns the world model and the active policy.
pub use crate::engine::Controller;
/// Policy selection enum.
pub use crate::policy::PolicyKind;
/// The simulator facade the controller binds to.
pub use crate::sim::Simulator;
