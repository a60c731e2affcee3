//! Simulator facade trait.
//!
//! This module defines the boundary between the controller and the external
//! discrete-event simulator. It provides:
//! 1. **Queries:** Cheap, read-only snapshots of machine, VM, and task facts.
//! 2. **Actions:** The control surface (power transitions, VM lifecycle,
//!    task placement, migration).
//! 3. **Asynchrony contract:** Which actions complete later via callbacks.
//!
//! The simulator owns all machine/VM/task facts; the controller queries them
//! on demand and never caches a snapshot across events.

use crate::common::{CpuFamily, MachineId, Priority, PowerState, SlaClass, TaskId, Time, VmId, VmType};

/// Point-in-time facts about a physical machine.
///
/// `memory_used` reflects live placements only; the controller layers its
/// own migration reservations on top when computing fits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MachineSnapshot {
    /// Machine identity.
    pub id: MachineId,
    /// CPU family of every core on the machine.
    pub cpu: CpuFamily,
    /// Whether the machine carries a GPU.
    pub gpu: bool,
    /// Total installed memory.
    pub memory_size: u64,
    /// Memory in live use by resident VMs and their tasks.
    pub memory_used: u64,
    /// Power state as of the last completed transition.
    pub power_state: PowerState,
    /// Number of VMs currently resident.
    pub active_vms: usize,
    /// Number of tasks running across resident VMs.
    pub active_tasks: usize,
    /// Energy consumed so far, in simulator units.
    pub energy_consumed: u64,
}

/// Point-in-time facts about a virtual machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VmSnapshot {
    /// VM identity.
    pub id: VmId,
    /// Guest flavor.
    pub vm_type: VmType,
    /// CPU family the VM was created for.
    pub cpu: CpuFamily,
    /// Host machine. During a migration this remains the source until the
    /// simulator reports completion.
    pub host: MachineId,
    /// Tasks currently running on the VM.
    pub active_tasks: Vec<TaskId>,
}

/// Point-in-time facts about a task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskSnapshot {
    /// Task identity.
    pub id: TaskId,
    /// Required CPU family.
    pub required_cpu: CpuFamily,
    /// Required guest flavor.
    pub required_vm: VmType,
    /// Memory the task needs on its host machine.
    pub required_memory: u64,
    /// Whether the task benefits from (and therefore requires) a GPU host.
    pub gpu_capable: bool,
    /// SLA tier.
    pub sla: SlaClass,
    /// Scheduling priority the simulator derived for the task.
    pub priority: Priority,
    /// Arrival time.
    pub arrival: Time,
    /// Target completion time for SLA accounting.
    pub target_completion: Time,
    /// Whether the task has already finished.
    pub completed: bool,
}

/// The simulator operation set the controller binds to.
///
/// Queries take `&self` and are pure; actions take `&mut self`. The two
/// asynchronous actions — [`set_power_state`](Simulator::set_power_state)
/// and [`vm_migrate`](Simulator::vm_migrate) — complete via later
/// `on_state_change_complete` / `on_migration_complete` events, never
/// synchronously. The controller must track the in-flight intent itself.
pub trait Simulator {
    /// Returns the number of machines in the cluster.
    fn machine_total(&self) -> usize;

    /// Returns the current facts for a machine.
    fn machine_info(&self, pm: MachineId) -> MachineSnapshot;

    /// Returns a machine's CPU family (cheaper than a full snapshot).
    fn machine_cpu(&self, pm: MachineId) -> CpuFamily;

    /// Returns the current facts for a VM.
    fn vm_info(&self, vm: VmId) -> VmSnapshot;

    /// Returns the current facts for a task.
    fn task_info(&self, task: TaskId) -> TaskSnapshot;

    /// Returns a task's required memory (cheaper than a full snapshot).
    fn task_memory(&self, task: TaskId) -> u64;

    /// Returns the violation percentage recorded so far for an SLA tier.
    fn sla_report(&self, sla: SlaClass) -> f64;

    /// Returns total energy consumed by the cluster, in simulator units.
    fn cluster_energy(&self) -> u64;

    /// Requests a power-state transition. Asynchronous: completion arrives
    /// as a later state-change event.
    fn set_power_state(&mut self, pm: MachineId, state: PowerState);

    /// Creates a detached VM of the given flavor and CPU family.
    fn vm_create(&mut self, vm_type: VmType, cpu: CpuFamily) -> VmId;

    /// Attaches a freshly created VM to a machine. Synchronous.
    fn vm_attach(&mut self, vm: VmId, pm: MachineId);

    /// Adds a task to a VM at the given priority. Synchronous.
    fn vm_add_task(&mut self, vm: VmId, task: TaskId, priority: Priority);

    /// Starts migrating a VM to a destination machine. Asynchronous:
    /// completion arrives as a later migration event.
    fn vm_migrate(&mut self, vm: VmId, dst: MachineId);

    /// Destroys a VM. Synchronous. Precondition: the VM has no active tasks
    /// and is not migrating.
    fn vm_shutdown(&mut self, vm: VmId);
}
