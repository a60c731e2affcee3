//! Per-machine power transition state machine.
//!
//! Power transitions are asynchronous: the controller issues a target state
//! and learns about completion from a later event. Between the two, the
//! machine is *transitioning* and ineligible for placement, migration,
//! shutdown requests, or consolidation. This module tracks that window.

use crate::common::PowerState;

/// Controller-side view of one machine's power state.
///
/// `Steady` mirrors the simulator's last reported state. `Transitioning`
/// means a `set_power_state` has been issued whose completion event has not
/// arrived yet; the simulator's reported state is stale for its duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerStatus {
    /// No transition in flight; the simulator's state is authoritative.
    Steady(PowerState),
    /// A transition to `target` has been issued and not yet completed.
    Transitioning {
        /// The state requested from the simulator.
        target: PowerState,
    },
}

impl PowerStatus {
    /// Returns `true` while a transition is in flight.
    #[inline]
    pub fn is_transitioning(&self) -> bool {
        matches!(self, PowerStatus::Transitioning { .. })
    }

    /// Returns the in-flight target, if any.
    pub fn target(&self) -> Option<PowerState> {
        match self {
            PowerStatus::Transitioning { target } => Some(*target),
            PowerStatus::Steady(_) => None,
        }
    }
}

/// What a completion event did to the machine's power status.
///
/// The router uses this to decide whether to invoke the policy at all: a
/// repeated completion for a state the machine already settled in is a
/// no-op and must not re-trigger queue drains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The machine settled in ACTIVE; wake-pending work may now be drained.
    WokeUp,
    /// The machine settled in a non-ACTIVE state.
    WentToSleep,
    /// The machine was already steady in the reported state.
    AlreadySteady,
}
