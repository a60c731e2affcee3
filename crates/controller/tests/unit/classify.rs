//! Classifier predicate tests.
//!
//! The fit predicates must honor live use, the controller's migration
//! reservations, and the per-VM overhead; the compatibility predicates are
//! exercised as truth tables.

use rstest::rstest;

use vmplace_core::classify;
use vmplace_core::common::{CpuFamily, MachineId, SlaClass, VmId, VmType};
use vmplace_core::model::WorldModel;
use vmplace_core::sim::Simulator;

use crate::common::{MockCluster, TaskDef, x86_snapshot};

const OVERHEAD: u64 = 8;

fn fixture() -> (MockCluster, WorldModel) {
    let mut sim = MockCluster::new();
    let _ = sim.add_machine(CpuFamily::X86, 128, false);
    let _ = sim.add_machine(CpuFamily::X86, 64, true);
    let _ = sim.add_machine(CpuFamily::Arm, 128, false);
    let mut world = WorldModel::new();
    for i in 0..3 {
        world.register_machine(MachineId::new(i));
    }
    (sim, world)
}

#[rstest]
#[case(CpuFamily::X86, 0, true)]
#[case(CpuFamily::X86, 2, false)]
#[case(CpuFamily::Arm, 2, true)]
#[case(CpuFamily::Arm, 1, false)]
fn cpu_ok_matches_families(#[case] cpu: CpuFamily, #[case] machine: u32, #[case] expect: bool) {
    let (mut sim, _world) = fixture();
    let task = sim.add_task(TaskDef::new(cpu, VmType::Linux, 16));
    let info = sim.task_info(task);
    let m = sim.machine_info(MachineId::new(machine));
    assert_eq!(classify::cpu_ok(&m, &info), expect);
}

#[rstest]
#[case(false, 0, true)] // no GPU needed, plain machine
#[case(false, 1, true)] // no GPU needed, GPU machine is still fine
#[case(true, 1, true)] // GPU needed, GPU machine
#[case(true, 0, false)] // GPU needed, plain machine
fn gpu_ok_requires_gpu_only_when_needed(
    #[case] gpu: bool,
    #[case] machine: u32,
    #[case] expect: bool,
) {
    let (mut sim, _world) = fixture();
    let mut def = TaskDef::new(CpuFamily::X86, VmType::Linux, 16);
    if gpu {
        def = def.gpu();
    }
    let task = sim.add_task(def);
    let info = sim.task_info(task);
    let m = sim.machine_info(MachineId::new(machine));
    assert_eq!(classify::gpu_ok(&m, &info), expect);
}

#[test]
fn task_fits_counts_overhead() {
    let (mut sim, world) = fixture();
    // 64 total on M1: 48 + 8 overhead fits, 60 + 8 does not.
    let fits = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 48));
    let too_big = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 60));
    let m1 = sim.machine_info(MachineId::new(1));
    assert!(classify::task_fits(&m1, &world, &sim.task_info(fits), OVERHEAD));
    assert!(!classify::task_fits(&m1, &world, &sim.task_info(too_big), OVERHEAD));
}

#[test]
fn task_fits_honors_migration_reservations() {
    let (mut sim, mut world) = fixture();
    let task = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 40));
    let m1 = MachineId::new(1);

    // Before the reservation: 40 + 8 <= 64.
    assert!(classify::task_fits(&sim.machine_info(m1), &world, &sim.task_info(task), OVERHEAD));

    // An inbound flight reserves 24 on M1: 40 + 24 + 8 > 64.
    let vm = VmId::new(0);
    world.note_vm_created(vm, MachineId::new(0));
    let _ = world.begin_migration(vm, m1, 24, &x86_snapshot(m1, 0, 64));
    assert!(
        !classify::task_fits(&sim.machine_info(m1), &world, &sim.task_info(task), OVERHEAD),
        "reserved memory must count against new placements",
    );

    // The flight lands; the room comes back.
    let _ = world.end_migration(vm);
    assert!(classify::task_fits(&sim.machine_info(m1), &world, &sim.task_info(task), OVERHEAD));
}

#[test]
fn vm_fits_uses_footprint_against_reservations() {
    let (sim, mut world) = fixture();
    let m1 = MachineId::new(1);
    assert!(classify::vm_fits(&sim.machine_info(m1), &world, 64));
    assert!(!classify::vm_fits(&sim.machine_info(m1), &world, 65));

    let vm = VmId::new(0);
    world.note_vm_created(vm, MachineId::new(0));
    let _ = world.begin_migration(vm, m1, 32, &x86_snapshot(m1, 0, 64));
    assert!(classify::vm_fits(&sim.machine_info(m1), &world, 32));
    assert!(!classify::vm_fits(&sim.machine_info(m1), &world, 33));
}

#[test]
fn vm_type_matches_compares_flavors() {
    let (mut sim, _world) = fixture();
    let task = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Win, 16).sla(SlaClass::Sla2));
    let info = sim.task_info(task);

    let win = sim.vm_create(VmType::Win, CpuFamily::X86);
    sim.vm_attach(win, MachineId::new(0));
    let linux = sim.vm_create(VmType::Linux, CpuFamily::X86);
    sim.vm_attach(linux, MachineId::new(0));

    assert!(classify::vm_type_matches(&sim.vm_info(win), &info));
    assert!(!classify::vm_type_matches(&sim.vm_info(linux), &info));
}

#[test]
fn stable_awake_rejects_transitioning_machines() {
    let (_sim, mut world) = fixture();
    let pm = MachineId::new(0);
    assert!(classify::stable_awake(&world, pm));

    world.begin_transition(pm, vmplace_core::common::PowerState::Off);
    assert!(!classify::stable_awake(&world, pm), "mid-transition machines take no work");

    let _ = world.complete_transition(pm, vmplace_core::common::PowerState::Off);
    assert!(!classify::stable_awake(&world, pm), "asleep machines take no work");
}
