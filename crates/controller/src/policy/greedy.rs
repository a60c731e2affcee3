//! Greedy placement policy.
//!
//! First-fit placement over the machine list in its current order, with
//! aggressive consolidation on every task completion: the least-loaded
//! machines try to push their VMs onto more-loaded ones, and machines that
//! empty out are powered down. The goal is the fewest awake machines that
//! still meet SLA.

use tracing::{debug, info};

use crate::common::{ControllerError, MachineId, PowerState, TaskId, Time, VmId};
use crate::engine::{Context, actions};
use crate::model::MigrationRecord;
use crate::policy::{Policy, helpers};

/// Greedy strategy state: the machine list in its current scan order.
///
/// The order starts as insertion order and is re-sorted by utilization on
/// every completion; new-task scans deliberately use whatever the current
/// order is.
#[derive(Debug, Default)]
pub struct GreedyPolicy {
    machines: Vec<MachineId>,
}

impl GreedyPolicy {
    /// Creates the policy with an empty machine list; filled at init.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consolidation pass: sort machines ascending by load, then for every
    /// source machine try to push each of its resident VMs onto a machine
    /// strictly later in the order. The resident set is snapshotted before
    /// any migration is issued.
    fn consolidate(&mut self, cx: &mut Context<'_>) {
        helpers::order_by_load(cx.sim, &mut self.machines);
        for j in 0..self.machines.len() {
            let src = self.machines[j];
            if !cx.world.stable_awake(src) {
                continue;
            }
            let residents = cx.world.vms_on(src);
            for vm in residents {
                for k in (j + 1)..self.machines.len() {
                    if actions::start_migration(cx, vm, self.machines[k]) {
                        break;
                    }
                }
            }
        }
    }
}

impl Policy for GreedyPolicy {
    fn on_init(&mut self, cx: &mut Context<'_>) {
        let total = cx.sim.machine_total();
        self.machines = (0..total).map(|i| MachineId::new(i as u32)).collect();
        info!(machines = total, "greedy policy initialized");
    }

    fn on_new_task(
        &mut self,
        cx: &mut Context<'_>,
        _now: Time,
        task: TaskId,
    ) -> Result<(), ControllerError> {
        if helpers::place_first_fit(cx, &self.machines, task) {
            // Placement landed; pack the cluster by powering down anything
            // that emptied out.
            for &pm in &self.machines {
                let _ = actions::request_shutdown(cx, pm);
            }
            Ok(())
        } else {
            // No stable-awake machine qualifies; escalate to the SLA
            // reallocation routine, which may wake a sleeper.
            debug!(%task, "no first-fit placement, escalating");
            helpers::reallocate_for_sla(cx, &mut self.machines, task)
        }
    }

    fn on_task_complete(&mut self, cx: &mut Context<'_>, _now: Time, task: TaskId) {
        let Some(vm) = cx.world.unbind_task(task) else {
            debug!(%task, "completion for a task that was never placed");
            return;
        };
        if cx.world.is_migrating(vm) {
            // Buffered: the VM is retired at migration completion if empty.
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
        // Relieve the overcommitted machine by reallocating one resident
        // task, smallest VM first.
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
            // Its task completed mid-flight; retire now that it landed.
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
