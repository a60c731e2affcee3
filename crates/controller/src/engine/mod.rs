//! The controller engine: owner struct, event router, and action dispatcher.
//!
//! This module reshapes the event-keyed free functions of a classical
//! scheduler into a single owner:
//! 1. **`Controller`** — owns the world model, the policy dispatch, the
//!    configuration, and the run statistics.
//! 2. **Router** (`router.rs`) — the entry points the simulator calls;
//!    updates the world model for observed facts, then invokes the policy.
//! 3. **Actions** (`actions.rs`) — composite operations that keep the
//!    world-model bookkeeping and the facade calls in invariant-safe order.
//!
//! The simulator is passed into every entry point as `&mut dyn Simulator`:
//! the controller is a callee, not an owner, of the event source.

/// Invariant-ordered composite operations (the dispatcher).
pub mod actions;
mod router;

use crate::config::Config;
use crate::model::WorldModel;
use crate::policy::PolicyDispatch;
use crate::sim::Simulator;
use crate::stats::RunStats;

/// Everything a policy handler may touch, bundled for one event.
///
/// Borrows are split per field so a handler can, e.g., query the simulator
/// while mutating the world model.
pub struct Context<'a> {
    /// The simulator facade.
    pub sim: &'a mut dyn Simulator,
    /// The controller's private state.
    pub world: &'a mut WorldModel,
    /// Run configuration.
    pub config: &'a Config,
    /// Run counters.
    pub stats: &'a mut RunStats,
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").finish_non_exhaustive()
    }
}

/// The placement controller: world model plus the selected policy.
///
/// Construct with [`Controller::new`], call [`Controller::init`] once, then
/// forward every simulator event to the matching entry point.
#[derive(Debug)]
pub struct Controller {
    config: Config,
    world: WorldModel,
    policy: PolicyDispatch,
    stats: RunStats,
}

impl Controller {
    /// Creates a controller with the policy selected in `config`.
    pub fn new(config: Config) -> Self {
        let policy = PolicyDispatch::new(config.policy);
        Self { config, world: WorldModel::new(), policy, stats: RunStats::new() }
    }

    /// Read access to the run configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read access to the world model, for tests and property checks.
    pub fn world(&self) -> &WorldModel {
        &self.world
    }

    pub(crate) fn world_mut(&mut self) -> &mut WorldModel {
        &mut self.world
    }

    /// Read access to the run counters.
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Read access to the active policy.
    pub fn policy(&self) -> &PolicyDispatch {
        &self.policy
    }

    /// Splits the controller into a policy handle and a [`Context`] over the
    /// remaining fields.
    pub(crate) fn split<'a>(
        &'a mut self,
        sim: &'a mut dyn Simulator,
    ) -> (&'a mut PolicyDispatch, Context<'a>) {
        (
            &mut self.policy,
            Context { sim, world: &mut self.world, config: &self.config, stats: &mut self.stats },
        )
    }
}
