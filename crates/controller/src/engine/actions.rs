//! Composite control actions in invariant-safe order.
//!
//! Policies never call the facade's action surface directly; they go through
//! these composites, which keep the world-model bookkeeping and the facade
//! calls ordered so the model stays consistent between any two simulator
//! callbacks: reservations are taken before migrations are issued, VMs are
//! accounted before tasks are bound, machines leave the believes-awake set
//! the moment a sleep is issued.
//!
//! Composites that can hit a transient condition (busy destination, VM in
//! flight) return `false` instead of erroring; the caller skips to its next
//! candidate or queues the work.

use tracing::debug;

use crate::classify;
use crate::common::{MachineId, PowerState, VmId};
use crate::engine::Context;
use crate::sim::{Simulator, TaskSnapshot, VmSnapshot};

/// Returns the memory a VM occupies on a host: its tasks' memory plus the
/// per-VM overhead.
pub fn vm_footprint(sim: &dyn Simulator, vm: &VmSnapshot, vm_overhead: u64) -> u64 {
    vm.active_tasks.iter().map(|task| sim.task_memory(*task)).sum::<u64>() + vm_overhead
}

/// Creates a fresh VM on `pm`, attaches it, and adds the task to it.
///
/// The caller has already established that the machine is stable awake and
/// that the task fits. Returns the new VM's id.
pub fn place_fresh(cx: &mut Context<'_>, pm: MachineId, task: &TaskSnapshot) -> VmId {
    debug_assert!(cx.world.stable_awake(pm));
    let vm = cx.sim.vm_create(task.required_vm, task.required_cpu);
    cx.sim.vm_attach(vm, pm);
    cx.world.note_vm_created(vm, pm);
    let priority = cx.config.placement.sla_priority.priority_for(task.sla);
    cx.sim.vm_add_task(vm, task.id, priority);
    cx.world.bind_task(task.id, vm);
    debug!(task = %task.id, %vm, machine = %pm, "placed task on fresh VM");
    vm
}

/// Adds the task to an existing resident VM.
///
/// The caller has already matched the VM's flavor and checked that it is not
/// migrating.
pub fn place_on_existing(cx: &mut Context<'_>, vm: VmId, task: &TaskSnapshot) {
    debug_assert!(!cx.world.is_migrating(vm));
    let priority = cx.config.placement.sla_priority.priority_for(task.sla);
    cx.sim.vm_add_task(vm, task.id, priority);
    cx.world.bind_task(task.id, vm);
    debug!(task = %task.id, %vm, "placed task on existing VM");
}

/// Starts migrating a VM to `dst`: reserves the footprint on the
/// destination first, then issues the migration.
///
/// Returns `false` without side effects when the move is not currently
/// possible: the VM is gone or already in flight, the destination is its
/// current host, is not stable awake, has a different CPU family, or cannot
/// fit the footprint next to its live use and existing reservations.
pub fn start_migration(cx: &mut Context<'_>, vm: VmId, dst: MachineId) -> bool {
    if !cx.world.vm_live(vm) || cx.world.is_migrating(vm) {
        return false;
    }
    let Some(src) = cx.world.vm_host(vm) else {
        return false;
    };
    if src == dst || !cx.world.stable_awake(dst) {
        return false;
    }
    let vm_info = cx.sim.vm_info(vm);
    let dst_info = cx.sim.machine_info(dst);
    if vm_info.cpu != dst_info.cpu {
        return false;
    }
    let footprint = vm_footprint(cx.sim, &vm_info, cx.config.placement.vm_overhead);
    if !classify::vm_fits(&dst_info, cx.world, footprint) {
        return false;
    }
    let record = cx.world.begin_migration(vm, dst, footprint, &dst_info);
    cx.sim.vm_migrate(vm, dst);
    cx.stats.migrations_started += 1;
    debug!(%vm, src = %record.src, %dst, reserved = footprint, "migration started");
    true
}

/// Requests a transition to ACTIVE for a sleeping machine.
///
/// Returns `false` when the machine is already awake or mid-transition; a
/// pending wake then waits for the in-flight transition to complete.
pub fn request_wake(cx: &mut Context<'_>, pm: MachineId) -> bool {
    if cx.world.is_awake(pm) || cx.world.is_transitioning(pm) {
        return false;
    }
    cx.world.begin_transition(pm, PowerState::Active);
    cx.sim.set_power_state(pm, PowerState::Active);
    cx.stats.wake_requests += 1;
    debug!(machine = %pm, "wake requested");
    true
}

/// Requests a transition to `target` for an empty machine.
///
/// Only proceeds when the machine passes the shutdown-eligibility check:
/// stable awake, nothing running or resident, no migration touching it.
pub fn request_sleep(cx: &mut Context<'_>, pm: MachineId, target: PowerState) -> bool {
    let info = cx.sim.machine_info(pm);
    if !cx.world.can_shutdown(&info) {
        return false;
    }
    cx.world.begin_transition(pm, target);
    cx.sim.set_power_state(pm, target);
    cx.stats.shutdown_requests += 1;
    debug!(machine = %pm, %target, "power-down requested");
    true
}

/// Requests the configured shutdown state for an empty machine.
pub fn request_shutdown(cx: &mut Context<'_>, pm: MachineId) -> bool {
    let target = cx.config.power.shutdown_state;
    request_sleep(cx, pm, target)
}

/// Shuts a VM down if it is empty, resident, and has no bound tasks.
///
/// Returns `false` when the VM is gone, in flight, or still busy.
pub fn retire_vm(cx: &mut Context<'_>, vm: VmId) -> bool {
    if !cx.world.vm_live(vm) || cx.world.is_migrating(vm) {
        return false;
    }
    if !cx.sim.vm_info(vm).active_tasks.is_empty() || !cx.world.tasks_bound_to(vm).is_empty() {
        return false;
    }
    cx.sim.vm_shutdown(vm);
    cx.world.note_vm_retired(vm);
    debug!(%vm, "VM retired");
    true
}
