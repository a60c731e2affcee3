//! Stateless placement predicates.
//!
//! Every placement decision in every policy reduces to conjunctions of
//! these predicates. They take snapshots (and the world model where
//! reservations or transition flags matter) and never mutate anything.

use crate::common::MachineId;
use crate::model::WorldModel;
use crate::sim::{MachineSnapshot, TaskSnapshot, VmSnapshot};

/// The machine's CPU family equals the task's required family.
#[inline]
pub fn cpu_ok(machine: &MachineSnapshot, task: &TaskSnapshot) -> bool {
    machine.cpu == task.required_cpu
}

/// The task does not need a GPU, or the machine has one.
#[inline]
pub fn gpu_ok(machine: &MachineSnapshot, task: &TaskSnapshot) -> bool {
    !task.gpu_capable || machine.gpu
}

/// The VM's guest flavor equals the task's required flavor.
#[inline]
pub fn vm_type_matches(vm: &VmSnapshot, task: &TaskSnapshot) -> bool {
    vm.vm_type == task.required_vm
}

/// The task fits on the machine, counting live use, the controller's
/// migration reservations, and the overhead of the VM that would host it.
pub fn task_fits(
    machine: &MachineSnapshot,
    world: &WorldModel,
    task: &TaskSnapshot,
    vm_overhead: u64,
) -> bool {
    task.required_memory + machine.memory_used + world.reserved_on(machine.id) + vm_overhead
        <= machine.memory_size
}

/// A VM of the given footprint (task memory plus overhead) fits on the
/// machine, counting live use and existing reservations.
pub fn vm_fits(machine: &MachineSnapshot, world: &WorldModel, footprint: u64) -> bool {
    footprint + machine.memory_used + world.reserved_on(machine.id) <= machine.memory_size
}

/// The machine is believed awake and has no power transition in flight.
#[inline]
pub fn stable_awake(world: &WorldModel, pm: MachineId) -> bool {
    world.stable_awake(pm)
}
