//! E-Eco placement policy.
//!
//! Partitions the cluster into a **fully-on** pool that takes work and an
//! **idle** pool kept in a shallow sleep for quick wakes. Placement spreads
//! across the fully-on pool (fewest active tasks wins, GPU presence matched
//! to the task's need); completions demote empty machines into the idle
//! pool until it holds half the cluster; SLA pressure promotes one idle
//! machine back.

use tracing::{debug, info};

use crate::classify;
use crate::common::{ControllerError, MachineId, PowerState, TaskId, Time, VmId};
use crate::engine::{Context, actions};
use crate::model::{MigrationRecord, WakeItem};
use crate::policy::{Policy, helpers};
use crate::sim::TaskSnapshot;

/// E-Eco strategy state: the two machine pools.
///
/// Every machine is in exactly one pool. Pool membership changes at
/// *request* time (promote/demote), not at transition completion, so the
/// pools always reflect the controller's intent.
#[derive(Debug, Default)]
pub struct EEcoPolicy {
    fully_on: Vec<MachineId>,
    idle: Vec<MachineId>,
}

impl EEcoPolicy {
    /// Creates the policy with empty pools; filled at init.
    pub fn new() -> Self {
        Self::default()
    }

    /// The fully-on pool, in promotion order.
    pub fn fully_on(&self) -> &[MachineId] {
        &self.fully_on
    }

    /// The idle pool, in demotion order.
    pub fn idle(&self) -> &[MachineId] {
        &self.idle
    }

    /// Largest idle-pool size the configuration allows.
    fn idle_cap(&self, cx: &Context<'_>) -> usize {
        (cx.sim.machine_total() as f64 * cx.config.power.eeco_idle_fraction) as usize
    }

    /// Promotes one idle machine that could host the task: requests the
    /// wake and moves it to the fully-on pool. Returns the machine woken.
    fn promote_for(&mut self, cx: &mut Context<'_>, info: &TaskSnapshot) -> Option<MachineId> {
        let overhead = cx.config.placement.vm_overhead;
        for i in 0..self.idle.len() {
            let pm = self.idle[i];
            let m = cx.sim.machine_info(pm);
            if m.cpu != info.required_cpu || m.memory_size < info.required_memory + overhead {
                continue;
            }
            if actions::request_wake(cx, pm) {
                let pm = self.idle.remove(i);
                self.fully_on.push(pm);
                debug!(machine = %pm, "promoted idle machine");
                return Some(pm);
            }
        }
        None
    }

    /// Demotes empty fully-on machines into the idle pool until only one
    /// fully-on machine remains or the idle pool reaches its cap.
    fn demote(&mut self, cx: &mut Context<'_>) {
        let cap = self.idle_cap(cx);
        let target = cx.config.power.eeco_idle_state;
        let mut i = 0;
        while i < self.fully_on.len() {
            if self.fully_on.len() == 1 || self.idle.len() >= cap {
                break;
            }
            let pm = self.fully_on[i];
            if actions::request_sleep(cx, pm, target) {
                let pm = self.fully_on.remove(i);
                self.idle.push(pm);
                debug!(machine = %pm, "demoted machine to idle pool");
            } else {
                i += 1;
            }
        }
    }

    /// Any machine in the cluster whose CPU family and total memory could
    /// ever host the task, pool and power state ignored.
    fn any_capable(&self, cx: &Context<'_>, info: &TaskSnapshot) -> Option<MachineId> {
        let overhead = cx.config.placement.vm_overhead;
        self.fully_on.iter().chain(self.idle.iter()).copied().find(|&pm| {
            let m = cx.sim.machine_info(pm);
            m.cpu == info.required_cpu && m.memory_size >= info.required_memory + overhead
        })
    }
}

impl Policy for EEcoPolicy {
    fn on_init(&mut self, cx: &mut Context<'_>) {
        let total = cx.sim.machine_total();
        self.fully_on = (0..total).map(|i| MachineId::new(i as u32)).collect();
        self.idle.clear();
        info!(machines = total, "e-eco policy initialized");
    }

    fn on_new_task(
        &mut self,
        cx: &mut Context<'_>,
        _now: Time,
        task: TaskId,
    ) -> Result<(), ControllerError> {
        let info = cx.sim.task_info(task);
        let overhead = cx.config.placement.vm_overhead;

        // Fewest active tasks wins; among equals, a machine whose GPU
        // presence matches the task's need beats one that merely
        // satisfies it.
        let mut best: Option<(usize, bool, MachineId)> = None;
        for &pm in &self.fully_on {
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
            let key = (m.active_tasks, m.gpu != info.gpu_capable, pm);
            if best.map_or(true, |b| key < b) {
                best = Some(key);
            }
        }
        if let Some((_, _, pm)) = best {
            let _ = actions::place_fresh(cx, pm, &info);
            return Ok(());
        }

        // Nothing fully-on qualifies: promote one idle machine and park the
        // task on its wake queue.
        if let Some(pm) = self.promote_for(cx, &info) {
            cx.world.enqueue_wakeup(pm, WakeItem::Task(task));
            return Ok(());
        }
        // No idle machine qualifies either. Park the task on any machine
        // that could ever host it (a later wake or SLA retry picks it up);
        // a cluster with no such machine is misconfigured.
        match self.any_capable(cx, &info) {
            Some(pm) => {
                debug!(%task, machine = %pm, "no pool candidate, task parked");
                cx.world.enqueue_wakeup(pm, WakeItem::Task(task));
                Ok(())
            }
            None => Err(ControllerError::NoPlacementPossible { task }),
        }
    }

    fn on_task_complete(&mut self, cx: &mut Context<'_>, _now: Time, task: TaskId) {
        if let Some(vm) = cx.world.unbind_task(task) {
            if !cx.world.is_migrating(vm) && cx.sim.vm_info(vm).active_tasks.is_empty() {
                let _ = actions::retire_vm(cx, vm);
            }
        }
        self.demote(cx);
    }

    fn on_sla_warning(
        &mut self,
        cx: &mut Context<'_>,
        _now: Time,
        task: TaskId,
    ) -> Result<(), ControllerError> {
        let info = cx.sim.task_info(task);
        let bound = cx.world.vm_of(task).is_some();
        if let Some(pm) = self.promote_for(cx, &info) {
            if !bound && !info.completed {
                cx.world.enqueue_wakeup(pm, WakeItem::Task(task));
            }
            return Ok(());
        }
        if bound || info.completed {
            // The task is running; the warning is capacity pressure and
            // there is nothing idle left to promote.
            return Ok(());
        }
        match self.any_capable(cx, &info) {
            Some(pm) => {
                cx.world.enqueue_wakeup(pm, WakeItem::Task(task));
                Ok(())
            }
            None => Err(ControllerError::NoPlacementPossible { task }),
        }
    }

    fn on_memory_warning(
        &mut self,
        cx: &mut Context<'_>,
        _now: Time,
        pm: MachineId,
    ) -> Result<(), ControllerError> {
        // Capacity relief: bring one idle machine back regardless of shape.
        debug!(machine = %pm, "memory warning, promoting an idle machine");
        for i in 0..self.idle.len() {
            let candidate = self.idle[i];
            if actions::request_wake(cx, candidate) {
                let candidate = self.idle.remove(i);
                self.fully_on.push(candidate);
                break;
            }
        }
        Ok(())
    }

    fn on_migration_complete(
        &mut self,
        cx: &mut Context<'_>,
        _now: Time,
        vm: VmId,
        _record: &MigrationRecord,
    ) {
        if cx.sim.vm_info(vm).active_tasks.is_empty() {
            let _ = actions::retire_vm(cx, vm);
        }
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
