//! Placement policies and policy dispatch.
//!
//! This module defines the trait hierarchy for pluggable placement
//! strategies:
//! 1. **`Policy`** — the nine-event capability every strategy implements.
//! 2. **`PolicyKind`** — config-level selection enum.
//! 3. **`PolicyDispatch`** — enum dispatch for type-erased policy storage in
//!    the controller.
//! 4. **Strategies** — Greedy, P-Mapper, and E-Eco.

use serde::Deserialize;

use crate::common::{ControllerError, MachineId, PowerState, TaskId, Time, VmId};
use crate::engine::Context;
use crate::model::MigrationRecord;

/// The E-Eco pooled policy.
pub mod eeco;
/// The Greedy first-fit consolidating policy.
pub mod greedy;
/// Selection and queue-drain helpers shared by the strategies.
pub mod helpers;
/// The P-Mapper energy-ordered policy.
pub mod pmapper;

pub use eeco::EEcoPolicy;
pub use greedy::GreedyPolicy;
pub use pmapper::PMapperPolicy;

/// Policy selection, deserialized from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PolicyKind {
    /// First-fit placement with aggressive consolidation (default).
    #[default]
    Greedy,
    /// Energy-ordered placement with median-targeted consolidation.
    #[serde(alias = "PMAPPER")]
    PMapper,
    /// Two-pool (fully-on / idle) placement.
    #[serde(alias = "EECO")]
    EEco,
}

/// The placement strategy capability — implemented by each policy and by
/// [`PolicyDispatch`].
///
/// The router performs the world-model fact updates (transition completion,
/// migration-record retirement) before invoking these handlers; a handler
/// only decides and issues actions through the dispatcher operations in
/// [`crate::engine::actions`].
pub trait Policy {
    /// Called once after the world model has registered every machine.
    fn on_init(&mut self, cx: &mut Context<'_>);

    /// A task arrived and needs a placement.
    fn on_new_task(&mut self, cx: &mut Context<'_>, now: Time, task: TaskId)
    -> Result<(), ControllerError>;

    /// A task finished; its binding is still in the index.
    fn on_task_complete(&mut self, cx: &mut Context<'_>, now: Time, task: TaskId);

    /// The simulator flagged a task as violating its SLA.
    fn on_sla_warning(&mut self, cx: &mut Context<'_>, now: Time, task: TaskId)
    -> Result<(), ControllerError>;

    /// The simulator flagged a machine as memory-overcommitted.
    fn on_memory_warning(&mut self, cx: &mut Context<'_>, now: Time, pm: MachineId)
    -> Result<(), ControllerError>;

    /// A migration finished; `record` is the retired migration record.
    fn on_migration_complete(
        &mut self,
        cx: &mut Context<'_>,
        now: Time,
        vm: VmId,
        record: &MigrationRecord,
    );

    /// A power transition finished; `state` is the machine's settled state.
    fn on_state_change_complete(
        &mut self,
        cx: &mut Context<'_>,
        now: Time,
        pm: MachineId,
        state: PowerState,
    );

    /// Periodic hook with no associated event.
    fn on_tick(&mut self, cx: &mut Context<'_>, now: Time);

    /// The simulation is ending; release everything that can be released.
    fn on_shutdown(&mut self, cx: &mut Context<'_>, now: Time);
}

/// Type-erased policy storage for the non-generic controller struct.
#[derive(Debug)]
pub enum PolicyDispatch {
    /// Greedy strategy.
    Greedy(GreedyPolicy),
    /// P-Mapper strategy.
    PMapper(PMapperPolicy),
    /// E-Eco strategy.
    EEco(EEcoPolicy),
}

impl PolicyDispatch {
    /// Instantiates the policy selected by configuration.
    pub fn new(kind: PolicyKind) -> Self {
        match kind {
            PolicyKind::Greedy => Self::Greedy(GreedyPolicy::new()),
            PolicyKind::PMapper => Self::PMapper(PMapperPolicy::new()),
            PolicyKind::EEco => Self::EEco(EEcoPolicy::new()),
        }
    }

    /// Returns the E-Eco policy if that is the active strategy; used by
    /// pool-bound checks in tests.
    pub fn as_eeco(&self) -> Option<&EEcoPolicy> {
        match self {
            Self::EEco(policy) => Some(policy),
            _ => None,
        }
    }
}

impl Policy for PolicyDispatch {
    fn on_init(&mut self, cx: &mut Context<'_>) {
        match self {
            Self::Greedy(p) => p.on_init(cx),
            Self::PMapper(p) => p.on_init(cx),
            Self::EEco(p) => p.on_init(cx),
        }
    }

    fn on_new_task(
        &mut self,
        cx: &mut Context<'_>,
        now: Time,
        task: TaskId,
    ) -> Result<(), ControllerError> {
        match self {
            Self::Greedy(p) => p.on_new_task(cx, now, task),
            Self::PMapper(p) => p.on_new_task(cx, now, task),
            Self::EEco(p) => p.on_new_task(cx, now, task),
        }
    }

    fn on_task_complete(&mut self, cx: &mut Context<'_>, now: Time, task: TaskId) {
        match self {
            Self::Greedy(p) => p.on_task_complete(cx, now, task),
            Self::PMapper(p) => p.on_task_complete(cx, now, task),
            Self::EEco(p) => p.on_task_complete(cx, now, task),
        }
    }

    fn on_sla_warning(
        &mut self,
        cx: &mut Context<'_>,
        now: Time,
        task: TaskId,
    ) -> Result<(), ControllerError> {
        match self {
            Self::Greedy(p) => p.on_sla_warning(cx, now, task),
            Self::PMapper(p) => p.on_sla_warning(cx, now, task),
            Self::EEco(p) => p.on_sla_warning(cx, now, task),
        }
    }

    fn on_memory_warning(
        &mut self,
        cx: &mut Context<'_>,
        now: Time,
        pm: MachineId,
    ) -> Result<(), ControllerError> {
        match self {
            Self::Greedy(p) => p.on_memory_warning(cx, now, pm),
            Self::PMapper(p) => p.on_memory_warning(cx, now, pm),
            Self::EEco(p) => p.on_memory_warning(cx, now, pm),
        }
    }

    fn on_migration_complete(
        &mut self,
        cx: &mut Context<'_>,
        now: Time,
        vm: VmId,
        record: &MigrationRecord,
    ) {
        match self {
            Self::Greedy(p) => p.on_migration_complete(cx, now, vm, record),
            Self::PMapper(p) => p.on_migration_complete(cx, now, vm, record),
            Self::EEco(p) => p.on_migration_complete(cx, now, vm, record),
        }
    }

    fn on_state_change_complete(
        &mut self,
        cx: &mut Context<'_>,
        now: Time,
        pm: MachineId,
        state: PowerState,
    ) {
        match self {
            Self::Greedy(p) => p.on_state_change_complete(cx, now, pm, state),
            Self::PMapper(p) => p.on_state_change_complete(cx, now, pm, state),
            Self::EEco(p) => p.on_state_change_complete(cx, now, pm, state),
        }
    }

    fn on_tick(&mut self, cx: &mut Context<'_>, now: Time) {
        match self {
            Self::Greedy(p) => p.on_tick(cx, now),
            Self::PMapper(p) => p.on_tick(cx, now),
            Self::EEco(p) => p.on_tick(cx, now),
        }
    }

    fn on_shutdown(&mut self, cx: &mut Context<'_>, now: Time) {
        match self {
            Self::Greedy(p) => p.on_shutdown(cx, now),
            Self::PMapper(p) => p.on_shutdown(cx, now),
            Self::EEco(p) => p.on_shutdown(cx, now),
        }
    }
}
