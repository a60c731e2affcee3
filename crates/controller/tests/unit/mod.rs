//! Unit tests for the controller components.
//!
//! Grouped by module: classifier predicates, configuration parsing, the
//! world model, the policies, the event router, and end-to-end replay
//! traces.

/// Classifier predicate tests.
pub mod classify;
/// World-model tests: power transitions, migrations, reservations, queues.
pub mod model;
/// Per-policy behavior tests against the mock cluster.
pub mod policy;
