//! Event router: the entry points the simulator calls.
//!
//! Each entry point updates the world model for the observed fact (a
//! completed transition, a retired migration record), then invokes the
//! active policy's handler with a [`Context`](crate::engine::Context) over
//! the controller's state. In debug builds every entry point cross-checks
//! the world model's invariants after the handler returns.

use tracing::{debug, info, warn};

use crate::common::{ControllerError, MachineId, TaskId, Time, VmId};
use crate::engine::Controller;
use crate::model::TransitionOutcome;
use crate::policy::Policy;
use crate::sim::Simulator;

impl Controller {
    /// Registers every machine with the world model and initializes the
    /// policy. Call exactly once, before any event.
    pub fn init(&mut self, sim: &mut dyn Simulator) {
        info!(policy = ?self.config().policy, machines = sim.machine_total(), "controller init");
        for i in 0..sim.machine_total() {
            self.world_mut().register_machine(MachineId::new(i as u32));
        }
        let (policy, mut cx) = self.split(sim);
        policy.on_init(&mut cx);
    }

    /// A task arrived.
    ///
    /// # Errors
    ///
    /// [`ControllerError::NoPlacementPossible`] when no machine in the
    /// cluster can ever host the task.
    pub fn on_new_task(
        &mut self,
        sim: &mut dyn Simulator,
        now: Time,
        task: TaskId,
    ) -> Result<(), ControllerError> {
        debug!(time = now, %task, "event: new task");
        let (policy, mut cx) = self.split(sim);
        cx.stats.tasks_arrived += 1;
        let result = policy.on_new_task(&mut cx, now, task);
        self.check_world();
        result
    }

    /// A task finished.
    pub fn on_task_complete(&mut self, sim: &mut dyn Simulator, now: Time, task: TaskId) {
        debug!(time = now, %task, "event: task complete");
        let (policy, mut cx) = self.split(sim);
        cx.stats.tasks_completed += 1;
        policy.on_task_complete(&mut cx, now, task);
        self.check_world();
    }

    /// The simulator flagged a task as violating its SLA.
    ///
    /// # Errors
    ///
    /// [`ControllerError::NoPlacementPossible`] when no machine in the
    /// cluster can ever host the task.
    pub fn on_sla_warning(
        &mut self,
        sim: &mut dyn Simulator,
        now: Time,
        task: TaskId,
    ) -> Result<(), ControllerError> {
        debug!(time = now, %task, "event: SLA warning");
        let (policy, mut cx) = self.split(sim);
        cx.stats.sla_warnings += 1;
        let result = policy.on_sla_warning(&mut cx, now, task);
        self.check_world();
        result
    }

    /// The simulator flagged a machine as memory-overcommitted.
    ///
    /// # Errors
    ///
    /// [`ControllerError::NoPlacementPossible`] when the displaced task can
    /// never be hosted elsewhere.
    pub fn on_memory_warning(
        &mut self,
        sim: &mut dyn Simulator,
        now: Time,
        pm: MachineId,
    ) -> Result<(), ControllerError> {
        debug!(time = now, machine = %pm, "event: memory warning");
        let (policy, mut cx) = self.split(sim);
        cx.stats.memory_warnings += 1;
        let result = policy.on_memory_warning(&mut cx, now, pm);
        self.check_world();
        result
    }

    /// A migration the controller issued has completed. The record is
    /// retired — releasing the destination reservation — before the policy
    /// runs.
    pub fn on_migration_complete(&mut self, sim: &mut dyn Simulator, now: Time, vm: VmId) {
        let Some(record) = self.world_mut().end_migration(vm) else {
            warn!(time = now, %vm, "migration completion with no record in flight");
            return;
        };
        debug!(time = now, %vm, src = %record.src, dst = %record.dst, "event: migration complete");
        let (policy, mut cx) = self.split(sim);
        cx.stats.migrations_completed += 1;
        policy.on_migration_complete(&mut cx, now, vm, &record);
        self.check_world();
    }

    /// A power transition the controller issued has completed. The world
    /// model settles first (flag cleared, believes-awake toggled); a
    /// repeated completion for an already-settled state is a no-op and the
    /// policy is not invoked.
    pub fn on_state_change_complete(&mut self, sim: &mut dyn Simulator, now: Time, pm: MachineId) {
        let observed = sim.machine_info(pm).power_state;
        let outcome = self.world_mut().complete_transition(pm, observed);
        if outcome == TransitionOutcome::AlreadySteady {
            debug!(time = now, machine = %pm, state = %observed, "repeated state-change completion");
            return;
        }
        debug!(time = now, machine = %pm, state = %observed, "event: state change complete");
        let (policy, mut cx) = self.split(sim);
        policy.on_state_change_complete(&mut cx, now, pm, observed);
        self.check_world();
    }

    /// Periodic hook with no associated event.
    pub fn on_tick(&mut self, sim: &mut dyn Simulator, now: Time) {
        let (policy, mut cx) = self.split(sim);
        policy.on_tick(&mut cx, now);
        self.check_world();
    }

    /// The simulation is ending: the policy releases what it can, then the
    /// end-of-run report is printed.
    pub fn on_simulation_complete(&mut self, sim: &mut dyn Simulator, now: Time) {
        info!(time = now, "event: simulation complete");
        let (policy, mut cx) = self.split(&mut *sim);
        policy.on_shutdown(&mut cx, now);
        self.check_world();
        self.stats().report(&*sim, now);
    }

    #[cfg(debug_assertions)]
    fn check_world(&self) {
        self.world().assert_consistent();
    }

    #[cfg(not(debug_assertions))]
    fn check_world(&self) {}
}
