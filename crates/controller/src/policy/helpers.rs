//! Selection and queue-drain helpers shared by the policy strategies.
//!
//! Greedy and P-Mapper share their entire event skeleton and differ only in
//! candidate ordering; the shared pieces live here. E-Eco reuses the queue
//! drain.

use tracing::debug;

use crate::classify;
use crate::common::{ControllerError, MachineId, TaskId};
use crate::engine::{Context, actions};
use crate::model::WakeItem;
use crate::sim::Simulator;

/// Sorts machines ascending by active-task count, ties by id.
pub fn order_by_load(sim: &dyn Simulator, machines: &mut [MachineId]) {
    machines.sort_by_key(|pm| (sim.machine_info(*pm).active_tasks, *pm));
}

/// Sorts machines ascending by energy consumed, ties by id.
pub fn order_by_energy(sim: &dyn Simulator, machines: &mut [MachineId]) {
    machines.sort_by_key(|pm| (sim.machine_info(*pm).energy_consumed, *pm));
}

/// First-fit placement scan over `machines` in the given order.
///
/// The first machine passing the full predicate chain (CPU, fit, GPU,
/// stable awake) receives the task: on an existing resident VM of the
/// required flavor when one is present and not in flight, otherwise on a
/// fresh VM. Returns `false` when no machine qualifies.
pub fn place_first_fit(cx: &mut Context<'_>, machines: &[MachineId], task: TaskId) -> bool {
    let info = cx.sim.task_info(task);
    let overhead = cx.config.placement.vm_overhead;
    for &pm in machines {
        if !cx.world.stable_awake(pm) {
            continue;
        }
        let m = cx.sim.machine_info(pm);
        if !(classify::cpu_ok(&m, &info)
            && classify::task_fits(&m, cx.world, &info, overhead)
            && classify::gpu_ok(&m, &info))
        {
            continue;
        }
        let existing = cx.world.vms_on(pm).into_iter().find(|&vm| {
            !cx.world.is_migrating(vm) && classify::vm_type_matches(&cx.sim.vm_info(vm), &info)
        });
        match existing {
            Some(vm) => actions::place_on_existing(cx, vm, &info),
            None => {
                let _ = actions::place_fresh(cx, pm, &info);
            }
        }
        return true;
    }
    false
}

/// The SLA reallocation routine shared by Greedy and P-Mapper.
///
/// Scans machines ascending by utilization — sleeping ones included — for
/// the first with a compatible CPU and enough spare memory. A bound task
/// has its VM migrated there; an unbound task gets a fresh VM. If the
/// chosen machine is not stable awake, the work is queued on its
/// wake-pending list and a wake is requested (unless one is already in
/// flight, in which case the pending wake simply waits).
///
/// # Errors
///
/// [`ControllerError::NoPlacementPossible`] when no machine in the cluster
/// qualifies; the cluster is misconfigured for the workload.
pub fn reallocate_for_sla(
    cx: &mut Context<'_>,
    machines: &mut [MachineId],
    task: TaskId,
) -> Result<(), ControllerError> {
    let info = cx.sim.task_info(task);
    let overhead = cx.config.placement.vm_overhead;
    order_by_load(cx.sim, machines);

    let mut dest = None;
    for &pm in machines.iter() {
        let m = cx.sim.machine_info(pm);
        if classify::cpu_ok(&m, &info) && classify::task_fits(&m, cx.world, &info, overhead) {
            dest = Some(pm);
            break;
        }
    }
    let Some(dest) = dest else {
        return Err(ControllerError::NoPlacementPossible { task });
    };

    if cx.world.stable_awake(dest) {
        match cx.world.vm_of(task) {
            // A placed task moves with its VM; a busy VM is left alone and
            // the next warning retries.
            Some(vm) => {
                let _ = actions::start_migration(cx, vm, dest);
            }
            None => {
                let _ = actions::place_fresh(cx, dest, &info);
            }
        }
    } else {
        let item = match cx.world.vm_of(task) {
            Some(vm) => WakeItem::Vm(vm),
            None => WakeItem::Task(task),
        };
        cx.world.enqueue_wakeup(dest, item);
        if !cx.world.is_transitioning(dest) {
            let _ = actions::request_wake(cx, dest);
        }
    }
    Ok(())
}

/// Drains a machine's wake-pending queue after it settled in ACTIVE.
///
/// Stale entries — tasks that completed or were placed elsewhere while the
/// machine was waking, VMs that were shut down or are already in flight —
/// are dropped. Entries that still apply but do not fit yet are requeued
/// for the machine's next wake.
pub fn drain_wake_queue(cx: &mut Context<'_>, pm: MachineId) {
    let overhead = cx.config.placement.vm_overhead;
    for item in cx.world.drain_wakeups(pm) {
        match item {
            WakeItem::Task(task) => {
                let info = cx.sim.task_info(task);
                if info.completed || cx.world.vm_of(task).is_some() {
                    cx.stats.stale_entries_dropped += 1;
                    debug!(%task, machine = %pm, "dropped stale wake-pending task");
                    continue;
                }
                let m = cx.sim.machine_info(pm);
                if classify::cpu_ok(&m, &info) && classify::task_fits(&m, cx.world, &info, overhead)
                {
                    let _ = actions::place_fresh(cx, pm, &info);
                } else {
                    cx.world.enqueue_wakeup(pm, item);
                }
            }
            WakeItem::Vm(vm) => {
                if !cx.world.vm_live(vm) || cx.world.is_migrating(vm) {
                    cx.stats.stale_entries_dropped += 1;
                    debug!(%vm, machine = %pm, "dropped stale wake-pending VM");
                    continue;
                }
                if !actions::start_migration(cx, vm, pm) {
                    cx.world.enqueue_wakeup(pm, item);
                }
            }
        }
    }
}
