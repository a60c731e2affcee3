//! The controller's private world model.
//!
//! The simulator owns machine/VM/task facts; this module owns everything the
//! controller must remember between events:
//! 1. **Power:** Per-machine transition state machine and the believes-awake
//!    set (`power.rs`).
//! 2. **Migration:** In-flight migration records and the reservations that
//!    back them (`migration.rs`).
//! 3. **World:** The single owner struct tying it together with the wake
//!    queues and the task→VM index (`world.rs`).
//!
//! Every mutator asserts its invariants and panics on violation; a broken
//! invariant is a controller bug, not a recoverable condition.

/// In-flight migration records.
pub mod migration;
/// Per-machine power transition state machine.
pub mod power;
/// The world model owner struct.
pub mod world;

pub use migration::MigrationRecord;
pub use power::{PowerStatus, TransitionOutcome};
pub use world::{WakeItem, WorldModel};
