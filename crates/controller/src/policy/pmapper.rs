//! P-Mapper placement policy.
//!
//! Shares the Greedy event skeleton and differs only in ordering: new tasks
//! prefer the machines that have consumed the least energy, and
//! consolidation moves a single small VM toward the *median* of the
//! utilization order instead of packing aggressively onto the hottest
//! machines, to avoid manufacturing hotspots.

use tracing::{debug, info};

use crate::common::{ControllerError, MachineId, PowerState, TaskId, Time, VmId};
use crate::engine::{Context, actions};
use crate::model::MigrationRecord;
use crate::policy::{Policy, helpers};

/// P-Mapper strategy state: the machine list in its current scan order.
#[derive(Debug, Default)]
pub struct PMapperPolicy {
    machines: Vec<MachineId>,
}

impl PMapperPolicy {
    /// Creates the policy with an empty machine list; filled at init.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consolidation pass: take the least-loaded VM off the least-loaded
    /// occupied machine and move it to the first machine at or past the
    /// median of the utilization order that will hold it. When nothing past
    /// the median can take it, no migration happens this round.
    fn consolidate(&mut self, cx: &mut Context<'_>) {
        helpers::order_by_load(cx.sim, &mut self.machines);

        let Some(first_occupied) = self
            .machines
            .iter()
            .position(|&pm| cx.sim.machine_info(pm).active_tasks > 0)
        else {
            return;
        };
        let src = self.machines[first_occupied];
        if !cx.world.stable_awake(src) {
            return;
        }
        let smallest = cx
            .world
            .vms_on(src)
            .into_iter()
            .min_by_key(|&vm| (cx.sim.vm_info(vm).active_tasks.len(), vm));
        let Some(vm) = smallest else {
            return;
        };

        let median = (first_occupied + self.machines.len()) / 2;
        for k in median..self.machines.len() {
            let dst = self.machines[k];
            if dst == src {
                continue;
            }
            if actions::start_migration(cx, vm, dst) {
                break;
            }
        }
    }
}

impl Policy for PMapperPolicy {
    fn on_init(&mut self, cx: &mut Context<'_>) {
        let total = cx.sim.machine_total();
        self.machines = (0..total).map(|i| MachineId::new(i as u32)).collect();
        info!(machines = total, "p-mapper policy initialized");
    }

    fn on_new_task(
        &mut self,
        cx: &mut Context<'_>,
        _now: Time,
        task: TaskId,
    ) -> Result<(), ControllerError> {
        // Cold machines first, so the hot ones can finish and idle down.
        helpers::order_by_energy(cx.sim, &mut self.machines);
        if helpers::place_first_fit(cx, &self.machines, task) {
            for &pm in &self.machines {
                let _ = actions::request_shutdown(cx, pm);
            }
            Ok(())
        } else {
            debug!(%task, "no energy-ordered placement, escalating");
            helpers::reallocate_for_sla(cx, &mut self.machines, task)
        }
    }

    fn on_task_complete(&mut self, cx: &mut Context<'_>, _now: Time, task: TaskId) {
        let Some(vm) = cx.world.unbind_task(task) else {
            debug!(%task, "completion for a task that was never placed");
            return;
        };
        if cx.world.is_migrating(vm) {
            return;
        }
        if cx.sim.vm_info(vm).active_tasks.is_empty() {
            let _ = actions::retire_vm(cx, vm);
        }
        self.consolidate(cx);
    }

    fn on_sla_warning(
        &mut self,
        cx: &mut Context<'_>,
        _now: Time,
        task: TaskId,
    ) -> Result<(), ControllerError> {
        helpers::reallocate_for_sla(cx, &mut self.machines, task)
    }

    fn on_memory_warning(
        &mut self,
        cx: &mut Context<'_>,
        _now: Time,
        pm: MachineId,
    ) -> Result<(), ControllerError> {
        let mut vms = cx.world.vms_on(pm);
        vms.sort_by_key(|&vm| (cx.sim.vm_info(vm).active_tasks.len(), vm));
        for vm in vms {
            if let Some(task) = cx.sim.vm_info(vm).active_tasks.first().copied() {
                return helpers::reallocate_for_sla(cx, &mut self.machines, task);
            }
        }
        Ok(())
    }

    fn on_migration_complete(
        &mut self,
        cx: &mut Context<'_>,
        _now: Time,
        vm: VmId,
        record: &MigrationRecord,
    ) {
        if cx.sim.vm_info(vm).active_tasks.is_empty() {
            let _ = actions::retire_vm(cx, vm);
        }
        let _ = actions::request_shutdown(cx, record.src);
    }

    fn on_state_change_complete(
        &mut self,
        cx: &mut Context<'_>,
        _now: Time,
        pm: MachineId,
        state: PowerState,
    ) {
        if state.is_active() {
            helpers::drain_wake_queue(cx, pm);
        }
    }

    fn on_tick(&mut self, _cx: &mut Context<'_>, _now: Time) {}

    fn on_shutdown(&mut self, cx: &mut Context<'_>, _now: Time) {
        let live: Vec<VmId> = cx.world.live_vms().collect();
        for vm in live {
            let _ = actions::retire_vm(cx, vm);
        }
    }
}
