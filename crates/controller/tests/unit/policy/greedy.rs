//! Greedy policy tests: first-fit placement, SLA wake path, consolidation,
//! in-flight reservations, and the no-placement failure.

use pretty_assertions::assert_eq;

use vmplace_core::classify;
use vmplace_core::common::{
    ControllerError, CpuFamily, MachineId, Priority, PowerState, TaskId, VmId, VmType,
};
use vmplace_core::engine::Controller;
use vmplace_core::sim::Simulator;
use vmplace_core::{Config, PolicyKind};

use crate::common::{Action, MockCluster, TaskDef, init_tracing, three_hosts};

fn greedy() -> Controller {
    Controller::new(Config { policy: PolicyKind::Greedy, ..Config::default() })
}

#[test]
fn first_task_lands_on_first_fit_and_empties_power_down() {
    init_tracing();
    let mut sim = three_hosts();
    let mut ctrl = greedy();
    ctrl.init(&mut sim);

    let t0 = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 32));
    ctrl.on_new_task(&mut sim, 0, t0).expect("placement succeeds");

    let vm = VmId::new(0);
    let m0 = MachineId::new(0);
    assert!(sim.log.contains(&Action::Create(vm)));
    assert!(sim.log.contains(&Action::Attach(vm, m0)), "first fit is M0");
    assert!(
        sim.log.contains(&Action::AddTask(vm, t0, Priority::High)),
        "SLA1 maps to HIGH priority",
    );
    assert_eq!(ctrl.world().vm_of(t0), Some(vm));
    assert!(ctrl.world().stable_awake(m0));

    // The post-placement sweep powers down both empty machines.
    for pm in [MachineId::new(1), MachineId::new(2)] {
        assert!(sim.log.contains(&Action::SetPower(pm, PowerState::Off)));
        assert!(!ctrl.world().is_awake(pm), "believes-awake drops at issue time");
        assert!(ctrl.world().is_transitioning(pm));
    }
}

#[test]
fn gpu_task_skips_machines_without_gpu() {
    init_tracing();
    let mut sim = three_hosts();
    let mut ctrl = greedy();
    ctrl.init(&mut sim);

    let t0 = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 16).gpu());
    ctrl.on_new_task(&mut sim, 0, t0).expect("placement succeeds");
    assert!(sim.log.contains(&Action::Attach(VmId::new(0), MachineId::new(1))));
}

#[test]
fn second_task_reuses_resident_vm_of_matching_flavor() {
    init_tracing();
    let mut sim = three_hosts();
    let mut ctrl = greedy();
    ctrl.init(&mut sim);

    let t0 = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 16));
    let t1 = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 16));
    ctrl.on_new_task(&mut sim, 0, t0).expect("placement succeeds");
    ctrl.on_new_task(&mut sim, 1, t1).expect("placement succeeds");

    let creates = sim.log.iter().filter(|a| matches!(a, Action::Create(_))).count();
    assert_eq!(creates, 1, "matching flavor reuses the VM");
    assert_eq!(ctrl.world().vm_of(t0), ctrl.world().vm_of(t1));
}

#[test]
fn mismatched_flavor_gets_a_fresh_vm() {
    init_tracing();
    let mut sim = three_hosts();
    let mut ctrl = greedy();
    ctrl.init(&mut sim);

    let t0 = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 16));
    let t1 = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Win, 16));
    ctrl.on_new_task(&mut sim, 0, t0).expect("placement succeeds");
    ctrl.on_new_task(&mut sim, 1, t1).expect("placement succeeds");

    let creates = sim.log.iter().filter(|a| matches!(a, Action::Create(_))).count();
    assert_eq!(creates, 2);
    assert_ne!(ctrl.world().vm_of(t0), ctrl.world().vm_of(t1));
}

#[test]
fn unplaceable_task_is_queued_on_a_sleeper_and_placed_on_wake() {
    init_tracing();
    let mut sim = three_hosts();
    let mut ctrl = greedy();
    ctrl.init(&mut sim);

    // Fill M0; the sweep puts M1 and M2 into OFF.
    let t0 = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 112));
    ctrl.on_new_task(&mut sim, 0, t0).expect("placement succeeds");
    for pm in [MachineId::new(1), MachineId::new(2)] {
        sim.finish_power(pm);
        ctrl.on_state_change_complete(&mut sim, 1, pm);
        assert_eq!(sim.power_of(pm), PowerState::Off);
    }

    // An ARM task fits only the sleeping M2: queued there, wake issued.
    let m2 = MachineId::new(2);
    let t2 = sim.add_task(TaskDef::new(CpuFamily::Arm, VmType::Linux, 16));
    ctrl.on_new_task(&mut sim, 2, t2).expect("queued, not fatal");
    assert_eq!(ctrl.world().wake_pending_len(m2), 1);
    assert!(ctrl.world().is_transitioning(m2));
    assert!(sim.log.contains(&Action::SetPower(m2, PowerState::Active)));
    assert_eq!(ctrl.world().vm_of(t2), None, "nothing placed while the machine wakes");

    // The wake completes; the queue drains into a fresh VM on M2.
    sim.finish_power(m2);
    ctrl.on_state_change_complete(&mut sim, 3, m2);
    let vm = ctrl.world().vm_of(t2).expect("task placed after the wake");
    assert_eq!(ctrl.world().vm_host(vm), Some(m2));
    assert_eq!(ctrl.world().wake_pending_len(m2), 0);
}

#[test]
fn completion_for_an_unplaced_task_is_ignored() {
    init_tracing();
    let mut sim = three_hosts();
    let mut ctrl = greedy();
    ctrl.init(&mut sim);
    let ghost = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 16));
    // Never handed to on_new_task; completion must not panic.
    ctrl.on_task_complete(&mut sim, 5, ghost);
    assert!(sim.log.is_empty());
}

#[test]
fn impossible_cpu_family_is_fatal() {
    init_tracing();
    let mut sim = three_hosts();
    let mut ctrl = greedy();
    ctrl.init(&mut sim);

    let task = sim.add_task(TaskDef::new(CpuFamily::Power, VmType::Aix, 16));
    let err = ctrl.on_new_task(&mut sim, 0, task).expect_err("no POWER machine exists");
    assert_eq!(err, ControllerError::NoPlacementPossible { task });
}

/// Builds the consolidation fixture: M0 (32) hosts vm0{t0} and vm1{t1},
/// M1 (128) hosts vm2{t2,t3}, M2 (128) asleep. Returns the controller, the
/// cluster, and (t0, vm1).
///
/// The detour through the wake queue mirrors how greedy actually reaches a
/// two-machine layout: the first placement sweeps everything else to OFF,
/// and capacity pressure wakes M1 back up.
fn consolidation_fixture() -> (MockCluster, Controller, TaskId, VmId) {
    let mut sim = MockCluster::new();
    let m0 = sim.add_machine(CpuFamily::X86, 32, false);
    let m1 = sim.add_machine(CpuFamily::X86, 128, false);
    let m2 = sim.add_machine(CpuFamily::X86, 128, false);
    let mut ctrl = greedy();
    ctrl.init(&mut sim);

    // t0 and t1 pack M0 exactly: 8 + 8 + 8 + 8 = 32.
    let t0 = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 8));
    ctrl.on_new_task(&mut sim, 0, t0).expect("t0 placed");
    let t1 = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Win, 8));
    ctrl.on_new_task(&mut sim, 1, t1).expect("t1 placed");
    assert_eq!(ctrl.world().vm_host(VmId::new(0)), Some(m0));
    assert_eq!(ctrl.world().vm_host(VmId::new(1)), Some(m0));

    // Let the sweep's shutdowns of M1 and M2 settle.
    for pm in [m1, m2] {
        sim.finish_power(pm);
        ctrl.on_state_change_complete(&mut sim, 2, pm);
    }

    // t2 no longer fits M0; the SLA path wakes M1 and drains onto it.
    let t2 = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 16));
    ctrl.on_new_task(&mut sim, 3, t2).expect("t2 queued");
    assert_eq!(ctrl.world().wake_pending_len(m1), 1);
    sim.finish_power(m1);
    ctrl.on_state_change_complete(&mut sim, 4, m1);
    assert_eq!(ctrl.world().vm_host(ctrl.world().vm_of(t2).expect("t2 placed")), Some(m1));

    // t3 joins vm2 on M1 (machine order was re-sorted by the SLA scan).
    let t3 = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 16));
    ctrl.on_new_task(&mut sim, 5, t3).expect("t3 placed");
    assert_eq!(ctrl.world().vm_of(t3), ctrl.world().vm_of(t2));

    (sim, ctrl, t0, VmId::new(1))
}

#[test]
fn completion_consolidates_light_machine_onto_busier_one() {
    init_tracing();
    let (mut sim, mut ctrl, t0, vm1) = consolidation_fixture();
    let m1 = MachineId::new(1);

    // t0 completes; vm0 empties and is retired; vm1 (one task) is pushed
    // from the lighter M0 toward the busier M1.
    sim.finish_task(t0);
    ctrl.on_task_complete(&mut sim, 10, t0);

    assert!(sim.log.contains(&Action::Shutdown(VmId::new(0))), "emptied VM retired");
    assert!(sim.log.contains(&Action::Migrate(vm1, m1)));
    assert!(ctrl.world().is_migrating(vm1));
    assert_eq!(ctrl.world().reserved_on(m1), 16, "task memory 8 plus overhead 8");
}

#[test]
fn inflight_reservation_blocks_placement_and_task_falls_through() {
    init_tracing();
    let (mut sim, mut ctrl, t0, _vm1) = consolidation_fixture();
    let m1 = MachineId::new(1);
    let m2 = MachineId::new(2);

    sim.finish_task(t0);
    ctrl.on_task_complete(&mut sim, 10, t0);
    assert_eq!(ctrl.world().reserved_on(m1), 16);

    // 80 would fit M1 on live use alone (80+40+8=128), but not on top of
    // the in-flight reservation.
    let t4 = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 80));
    let info = sim.task_info(t4);
    assert!(
        !classify::task_fits(&sim.machine_info(m1), ctrl.world(), &info, 8),
        "reservation must be charged against the destination",
    );

    // The policy falls through to the sleeping M2 and queues there.
    ctrl.on_new_task(&mut sim, 11, t4).expect("queued on the sleeper");
    assert_eq!(ctrl.world().vm_of(t4), None);
    assert_eq!(ctrl.world().wake_pending_len(m2), 1);
    assert!(sim.log.contains(&Action::SetPower(m2, PowerState::Active)));
}

#[test]
fn migration_completion_releases_reservation_and_shuts_down_source() {
    init_tracing();
    let (mut sim, mut ctrl, t0, vm1) = consolidation_fixture();
    let m0 = MachineId::new(0);
    let m1 = MachineId::new(1);

    sim.finish_task(t0);
    ctrl.on_task_complete(&mut sim, 10, t0);

    sim.finish_migration(vm1);
    ctrl.on_migration_complete(&mut sim, 12, vm1);

    assert_eq!(ctrl.world().reserved_on(m1), 0);
    assert_eq!(ctrl.world().vm_host(vm1), Some(m1));
    assert!(!sim.log.contains(&Action::Shutdown(vm1)), "vm1 still has its task");
    assert!(
        sim.log.contains(&Action::SetPower(m0, PowerState::Off)),
        "emptied source machine powers down",
    );
    assert!(!ctrl.world().is_awake(m0));
}

#[test]
fn stale_wake_queue_entry_is_dropped_on_drain() {
    init_tracing();
    let mut sim = three_hosts();
    let mut ctrl = greedy();
    ctrl.init(&mut sim);

    // Fill M0 and let the sweep's shutdowns settle.
    let t0 = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 112));
    ctrl.on_new_task(&mut sim, 0, t0).expect("t0 placed");
    for pm in [MachineId::new(1), MachineId::new(2)] {
        sim.finish_power(pm);
        ctrl.on_state_change_complete(&mut sim, 1, pm);
    }

    // The ARM task queues on M2 and a wake is issued...
    let m2 = MachineId::new(2);
    let t2 = sim.add_task(TaskDef::new(CpuFamily::Arm, VmType::Linux, 16));
    ctrl.on_new_task(&mut sim, 2, t2).expect("queued");
    assert_eq!(ctrl.world().wake_pending_len(m2), 1);

    // ...but the task completes (is withdrawn) before the machine is up.
    sim.finish_task(t2);
    ctrl.on_task_complete(&mut sim, 3, t2);

    sim.finish_power(m2);
    ctrl.on_state_change_complete(&mut sim, 4, m2);
    assert_eq!(ctrl.world().vm_of(t2), None, "stale entry dropped, nothing placed");
    assert_eq!(ctrl.world().wake_pending_len(m2), 0);
    assert_eq!(ctrl.stats().stale_entries_dropped, 1);
}
