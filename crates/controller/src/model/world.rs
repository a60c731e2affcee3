//! The world model: everything the controller remembers between events.
//!
//! One owner struct holds the believes-awake set, the per-machine power
//! transition status, the per-VM residency/migration state, destination
//! memory reservations, wake-pending queues, and the task→VM index. All
//! mutators assert their invariants and panic on violation — the controller
//! treats a broken invariant as a bug, never as a recoverable error.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::common::{MachineId, PowerState, TaskId, VmId};
use crate::model::migration::MigrationRecord;
use crate::model::power::{PowerStatus, TransitionOutcome};
use crate::sim::MachineSnapshot;

/// An item deferred until a machine's transition to ACTIVE completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WakeItem {
    /// A task waiting for a fresh VM on the waking machine.
    Task(TaskId),
    /// A VM waiting to be migrated to the waking machine.
    Vm(VmId),
}

/// Controller-side state of one VM.
///
/// A VM the controller created is either resident on exactly one machine or
/// in flight with a migration record; a VM absent from the map is gone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum VmState {
    Resident(MachineId),
    Migrating(MigrationRecord),
}

/// The controller's private state, with invariant-asserting mutators.
#[derive(Debug, Default)]
pub struct WorldModel {
    /// Machines not asked to leave ACTIVE since their last observed wake.
    awake: BTreeSet<MachineId>,
    /// Per-machine power transition status.
    power: BTreeMap<MachineId, PowerStatus>,
    /// Per-VM residency or in-flight migration.
    vms: BTreeMap<VmId, VmState>,
    /// Memory reserved per machine for inbound migrations.
    reserved: BTreeMap<MachineId, u64>,
    /// Items deferred until a machine finishes waking.
    wake_pending: BTreeMap<MachineId, VecDeque<WakeItem>>,
    /// Which VM each controller-placed task runs on.
    task_index: BTreeMap<TaskId, VmId>,
}

impl WorldModel {
    /// Creates an empty world model. Machines are added via
    /// [`register_machine`](Self::register_machine) at init.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a machine at init time. Machines start steady in ACTIVE
    /// and believed awake, matching the simulator's initial cluster state.
    pub fn register_machine(&mut self, pm: MachineId) {
        let prev = self.power.insert(pm, PowerStatus::Steady(PowerState::Active));
        assert!(prev.is_none(), "machine {pm} registered twice");
        let _ = self.awake.insert(pm);
    }

    /// Returns the number of registered machines.
    pub fn machine_count(&self) -> usize {
        self.power.len()
    }

    // ---- power -----------------------------------------------------------

    /// Returns `true` if the machine is in the believes-awake set.
    pub fn is_awake(&self, pm: MachineId) -> bool {
        self.awake.contains(&pm)
    }

    /// Iterates the believes-awake set in id order.
    pub fn awake(&self) -> impl Iterator<Item = MachineId> + '_ {
        self.awake.iter().copied()
    }

    /// Returns the machine's power transition status.
    ///
    /// # Panics
    ///
    /// Panics if the machine was never registered.
    pub fn status(&self, pm: MachineId) -> PowerStatus {
        match self.power.get(&pm) {
            Some(status) => *status,
            None => panic!("machine {pm} not registered"),
        }
    }

    /// Returns `true` while a power transition is in flight for the machine.
    pub fn is_transitioning(&self, pm: MachineId) -> bool {
        self.status(pm).is_transitioning()
    }

    /// Returns `true` if the machine is believed awake with no transition
    /// in flight — the only condition under which it may receive work.
    pub fn stable_awake(&self, pm: MachineId) -> bool {
        self.is_awake(pm) && !self.is_transitioning(pm)
    }

    /// Records that a power transition to `target` has been issued.
    ///
    /// Issuing any non-ACTIVE target removes the machine from the
    /// believes-awake set immediately; a wake leaves it out of the set until
    /// the completion event arrives.
    ///
    /// # Panics
    ///
    /// Panics if a transition is already in flight for the machine.
    pub fn begin_transition(&mut self, pm: MachineId, target: PowerState) {
        assert!(
            !self.is_transitioning(pm),
            "transition to {target} issued for machine {pm} while another is in flight",
        );
        assert!(
            !(target.is_active() && self.is_awake(pm)),
            "wake issued for machine {pm} already believed awake",
        );
        if !target.is_active() {
            let _ = self.awake.remove(&pm);
        }
        let _ = self.power.insert(pm, PowerStatus::Transitioning { target });
    }

    /// Records a completed power transition reported by the simulator.
    ///
    /// A repeated completion for a state the machine already settled in is
    /// a no-op and reports [`TransitionOutcome::AlreadySteady`], so the
    /// caller can skip queue draining.
    ///
    /// # Panics
    ///
    /// Panics on a completion the controller never requested, or on a
    /// completion whose observed state differs from the issued target.
    pub fn complete_transition(&mut self, pm: MachineId, observed: PowerState) -> TransitionOutcome {
        match self.status(pm) {
            PowerStatus::Steady(state) if state == observed => TransitionOutcome::AlreadySteady,
            PowerStatus::Steady(state) => {
                panic!("unsolicited power transition on machine {pm}: {state} -> {observed}")
            }
            PowerStatus::Transitioning { target } => {
                assert_eq!(
                    target, observed,
                    "machine {pm} completed a transition to {observed} but {target} was issued",
                );
                let _ = self.power.insert(pm, PowerStatus::Steady(observed));
                if observed.is_active() {
                    let _ = self.awake.insert(pm);
                    TransitionOutcome::WokeUp
                } else {
                    let _ = self.awake.remove(&pm);
                    TransitionOutcome::WentToSleep
                }
            }
        }
    }

    // ---- VMs and migrations ----------------------------------------------

    /// Records a VM the controller created and attached to `pm`.
    ///
    /// # Panics
    ///
    /// Panics if the VM is already tracked.
    pub fn note_vm_created(&mut self, vm: VmId, pm: MachineId) {
        let prev = self.vms.insert(vm, VmState::Resident(pm));
        assert!(prev.is_none(), "VM {vm} created twice");
    }

    /// Returns `true` if the controller created this VM and has not retired
    /// it.
    pub fn vm_live(&self, vm: VmId) -> bool {
        self.vms.contains_key(&vm)
    }

    /// Returns the machine a VM is resident on, or `None` if the VM is in
    /// flight or unknown.
    pub fn vm_host(&self, vm: VmId) -> Option<MachineId> {
        match self.vms.get(&vm) {
            Some(VmState::Resident(pm)) => Some(*pm),
            _ => None,
        }
    }

    /// Returns `true` if the VM has a migration in flight.
    pub fn is_migrating(&self, vm: VmId) -> bool {
        matches!(self.vms.get(&vm), Some(VmState::Migrating(_)))
    }

    /// Returns the VM's in-flight migration record, if any.
    pub fn migration(&self, vm: VmId) -> Option<&MigrationRecord> {
        match self.vms.get(&vm) {
            Some(VmState::Migrating(record)) => Some(record),
            _ => None,
        }
    }

    /// Returns the VMs resident on a machine, in id order. VMs in flight
    /// count on neither endpoint.
    pub fn vms_on(&self, pm: MachineId) -> Vec<VmId> {
        self.vms
            .iter()
            .filter(|(_, state)| matches!(state, VmState::Resident(host) if *host == pm))
            .map(|(vm, _)| *vm)
            .collect()
    }

    /// Iterates every live VM in id order.
    pub fn live_vms(&self) -> impl Iterator<Item = VmId> + '_ {
        self.vms.keys().copied()
    }

    /// Records the start of a migration and reserves the VM's footprint on
    /// the destination. `footprint` is the VM's task memory plus the per-VM
    /// overhead; `dst_info` is the destination's current snapshot.
    ///
    /// # Panics
    ///
    /// Panics if the VM is not resident, if the destination is not stable
    /// awake, or if the reservation would exceed the destination's capacity.
    pub fn begin_migration(
        &mut self,
        vm: VmId,
        dst: MachineId,
        footprint: u64,
        dst_info: &MachineSnapshot,
    ) -> MigrationRecord {
        let src = match self.vms.get(&vm) {
            Some(VmState::Resident(pm)) => *pm,
            Some(VmState::Migrating(_)) => panic!("VM {vm} is already migrating"),
            None => panic!("migration of unknown VM {vm}"),
        };
        assert_ne!(src, dst, "migration of VM {vm} to its own host {dst}");
        assert!(
            self.stable_awake(dst),
            "migration destination {dst} is not stable awake",
        );
        debug_assert_eq!(dst_info.id, dst);
        let already = self.reserved_on(dst);
        assert!(
            footprint + dst_info.memory_used + already <= dst_info.memory_size,
            "reservation of {footprint} on machine {dst} would exceed capacity \
             ({} used, {already} reserved, {} total)",
            dst_info.memory_used,
            dst_info.memory_size,
        );
        let record = MigrationRecord { vm, src, dst, reserved: footprint };
        let _ = self.vms.insert(vm, VmState::Migrating(record));
        *self.reserved.entry(dst).or_insert(0) += footprint;
        record
    }

    /// Records a completed migration: releases the destination reservation
    /// and marks the VM resident there. Returns `None` when no migration
    /// was in flight for the VM (a duplicate or unsolicited completion the
    /// caller may log and ignore).
    pub fn end_migration(&mut self, vm: VmId) -> Option<MigrationRecord> {
        let record = match self.vms.get(&vm) {
            Some(VmState::Migrating(record)) => *record,
            _ => return None,
        };
        let reserved = self
            .reserved
            .get_mut(&record.dst)
            .unwrap_or_else(|| panic!("no reservation on machine {} for VM {vm}", record.dst));
        assert!(
            *reserved >= record.reserved,
            "reservation underflow on machine {}: {reserved} < {}",
            record.dst,
            record.reserved,
        );
        *reserved -= record.reserved;
        if *reserved == 0 {
            let _ = self.reserved.remove(&record.dst);
        }
        let _ = self.vms.insert(vm, VmState::Resident(record.dst));
        Some(record)
    }

    /// Returns the memory currently reserved on a machine for inbound
    /// migrations.
    pub fn reserved_on(&self, pm: MachineId) -> u64 {
        self.reserved.get(&pm).copied().unwrap_or(0)
    }

    /// Returns `true` if any in-flight migration targets this machine.
    pub fn is_migration_destination(&self, pm: MachineId) -> bool {
        self.vms
            .values()
            .any(|state| matches!(state, VmState::Migrating(record) if record.dst == pm))
    }

    /// Returns `true` if any in-flight migration is leaving this machine.
    pub fn has_outbound_migration(&self, pm: MachineId) -> bool {
        self.vms
            .values()
            .any(|state| matches!(state, VmState::Migrating(record) if record.src == pm))
    }

    /// Forgets a VM the controller has shut down.
    ///
    /// # Panics
    ///
    /// Panics if the VM is migrating, unknown, or still has bound tasks.
    pub fn note_vm_retired(&mut self, vm: VmId) {
        match self.vms.get(&vm) {
            Some(VmState::Resident(_)) => {}
            Some(VmState::Migrating(_)) => panic!("VM {vm} retired while migrating"),
            None => panic!("unknown VM {vm} retired"),
        }
        assert!(
            !self.task_index.values().any(|bound| *bound == vm),
            "VM {vm} retired with tasks still bound to it",
        );
        let _ = self.vms.remove(&vm);
    }

    // ---- task index ------------------------------------------------------

    /// Binds a task to the VM it was placed on.
    ///
    /// # Panics
    ///
    /// Panics if the task is already bound, or if the VM is unknown or
    /// currently migrating.
    pub fn bind_task(&mut self, task: TaskId, vm: VmId) {
        assert!(self.vm_live(vm), "task {task} bound to unknown VM {vm}");
        assert!(!self.is_migrating(vm), "task {task} bound to migrating VM {vm}");
        let prev = self.task_index.insert(task, vm);
        assert!(prev.is_none(), "task {task} bound twice");
    }

    /// Removes a task's binding, returning the VM it ran on. `None` means
    /// the controller never placed the task (e.g., it was still queued).
    pub fn unbind_task(&mut self, task: TaskId) -> Option<VmId> {
        self.task_index.remove(&task)
    }

    /// Returns the VM a task is bound to, if any.
    pub fn vm_of(&self, task: TaskId) -> Option<VmId> {
        self.task_index.get(&task).copied()
    }

    /// Returns the tasks bound to a VM, in id order.
    pub fn tasks_bound_to(&self, vm: VmId) -> Vec<TaskId> {
        self.task_index
            .iter()
            .filter(|(_, bound)| **bound == vm)
            .map(|(task, _)| *task)
            .collect()
    }

    // ---- wake-pending queues ---------------------------------------------

    /// Appends an item to a machine's wake-pending queue.
    pub fn enqueue_wakeup(&mut self, pm: MachineId, item: WakeItem) {
        assert!(self.power.contains_key(&pm), "wakeup queued on unregistered machine {pm}");
        self.wake_pending.entry(pm).or_default().push_back(item);
    }

    /// Returns and clears a machine's wake-pending queue.
    pub fn drain_wakeups(&mut self, pm: MachineId) -> Vec<WakeItem> {
        self.wake_pending.remove(&pm).map(Vec::from).unwrap_or_default()
    }

    /// Returns the number of items queued on a machine.
    pub fn wake_pending_len(&self, pm: MachineId) -> usize {
        self.wake_pending.get(&pm).map_or(0, VecDeque::len)
    }

    // ---- shutdown eligibility and consistency ----------------------------

    /// Returns `true` if the machine may be asked to power down: stable
    /// awake, nothing running, nothing resident, and no migration touching
    /// it in either direction.
    pub fn can_shutdown(&self, info: &MachineSnapshot) -> bool {
        let pm = info.id;
        self.stable_awake(pm)
            && info.active_tasks == 0
            && info.active_vms == 0
            && !self.is_migration_destination(pm)
            && !self.has_outbound_migration(pm)
    }

    /// Cross-checks the redundant parts of the model against each other.
    ///
    /// The router calls this after every event in debug builds; the test
    /// suite calls it directly.
    ///
    /// # Panics
    ///
    /// Panics if any internal invariant is violated.
    pub fn assert_consistent(&self) {
        // Reservations balance the in-flight records exactly.
        let mut expected: BTreeMap<MachineId, u64> = BTreeMap::new();
        for state in self.vms.values() {
            if let VmState::Migrating(record) = state {
                *expected.entry(record.dst).or_insert(0) += record.reserved;
                assert!(
                    self.is_awake(record.dst) && !self.is_transitioning(record.dst),
                    "in-flight migration of VM {} targets unstable machine {}",
                    record.vm,
                    record.dst,
                );
            }
        }
        assert_eq!(
            expected, self.reserved,
            "reservations out of sync with in-flight migration records",
        );

        // A transitioning machine is never believed awake.
        for (pm, status) in &self.power {
            if status.is_transitioning() {
                assert!(!self.awake.contains(pm), "machine {pm} awake mid-transition");
            }
        }

        // Every bound task points at a live VM.
        for (task, vm) in &self.task_index {
            assert!(self.vms.contains_key(vm), "task {task} bound to dead VM {vm}");
        }
    }
}
