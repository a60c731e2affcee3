//! E-Eco policy tests: pool management, GPU matching, promotion and
//! demotion bounds.

use pretty_assertions::assert_eq;

use vmplace_core::common::{ControllerError, CpuFamily, MachineId, PowerState, VmId, VmType};
use vmplace_core::engine::Controller;
use vmplace_core::{Config, PolicyKind};

use crate::common::{Action, TaskDef, init_tracing, three_hosts};

fn eeco() -> Controller {
    Controller::new(Config { policy: PolicyKind::EEco, ..Config::default() })
}

fn pools(ctrl: &Controller) -> (Vec<MachineId>, Vec<MachineId>) {
    let policy = ctrl.policy().as_eeco().expect("e-eco is active");
    (policy.fully_on().to_vec(), policy.idle().to_vec())
}

#[test]
fn init_puts_every_machine_fully_on() {
    init_tracing();
    let mut sim = three_hosts();
    let mut ctrl = eeco();
    ctrl.init(&mut sim);
    let (fully_on, idle) = pools(&ctrl);
    assert_eq!(fully_on.len(), 3);
    assert!(idle.is_empty());
}

#[test]
fn placement_spreads_to_the_least_loaded_machine() {
    init_tracing();
    let mut sim = three_hosts();
    let mut ctrl = eeco();
    ctrl.init(&mut sim);

    // First task: M0 and M1 tie on load; M0's GPU-free shape matches a
    // GPU-free task better.
    let t0 = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 16));
    ctrl.on_new_task(&mut sim, 0, t0).expect("t0 placed");
    assert!(sim.log.contains(&Action::Attach(VmId::new(0), MachineId::new(0))));

    // Second task: M1 is now the least loaded compatible machine.
    let t1 = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 16));
    ctrl.on_new_task(&mut sim, 1, t1).expect("t1 placed");
    assert!(sim.log.contains(&Action::Attach(VmId::new(1), MachineId::new(1))));
}

#[test]
fn gpu_task_must_land_on_the_gpu_machine() {
    init_tracing();
    let mut sim = three_hosts();
    let mut ctrl = eeco();
    ctrl.init(&mut sim);

    let t0 = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 16).gpu());
    ctrl.on_new_task(&mut sim, 0, t0).expect("t0 placed");
    assert!(sim.log.contains(&Action::Attach(VmId::new(0), MachineId::new(1))));
}

#[test]
fn completion_demotes_empties_up_to_the_idle_cap() {
    init_tracing();
    let mut sim = three_hosts();
    let mut ctrl = eeco();
    ctrl.init(&mut sim);

    let t0 = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 16));
    ctrl.on_new_task(&mut sim, 0, t0).expect("t0 placed");

    sim.finish_task(t0);
    ctrl.on_task_complete(&mut sim, 1, t0);

    // Cap is floor(3 * 0.5) = 1: exactly one machine demotes, to the
    // configured intermediate sleep state, and at least one stays on.
    let (fully_on, idle) = pools(&ctrl);
    assert_eq!(idle, vec![MachineId::new(0)]);
    assert_eq!(fully_on.len(), 2);
    assert!(sim.log.contains(&Action::SetPower(MachineId::new(0), PowerState::SleepMedium)));
    assert!(!sim.log.iter().any(|a| matches!(a, Action::SetPower(_, PowerState::Off))));
}

#[test]
fn pool_bounds_hold_across_repeated_completions() {
    init_tracing();
    let mut sim = three_hosts();
    let mut ctrl = eeco();
    ctrl.init(&mut sim);

    for i in 0..4 {
        let t = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 8));
        ctrl.on_new_task(&mut sim, i, t).expect("placed");
        sim.finish_task(t);
        ctrl.on_task_complete(&mut sim, i + 10, t);

        let (fully_on, idle) = pools(&ctrl);
        assert!(idle.len() <= 1, "idle pool capped at floor(N/2)");
        assert!(!fully_on.is_empty(), "at least one machine stays fully on");
    }
}

#[test]
fn unplaceable_task_promotes_an_idle_machine_and_queues() {
    init_tracing();
    let mut sim = three_hosts();
    let mut ctrl = eeco();
    ctrl.init(&mut sim);

    // Demote M0 and let its sleep settle.
    let t0 = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 16));
    ctrl.on_new_task(&mut sim, 0, t0).expect("t0 placed");
    sim.finish_task(t0);
    ctrl.on_task_complete(&mut sim, 1, t0);
    let m0 = MachineId::new(0);
    sim.finish_power(m0);
    ctrl.on_state_change_complete(&mut sim, 2, m0);

    // 120 fits neither M1 (64) nor M2 (ARM): the idle M0 is promoted and
    // the task parks on its wake queue.
    let big = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 112));
    ctrl.on_new_task(&mut sim, 3, big).expect("queued on the promoted machine");
    assert!(sim.log.contains(&Action::SetPower(m0, PowerState::Active)));
    assert_eq!(ctrl.world().wake_pending_len(m0), 1);
    let (fully_on, idle) = pools(&ctrl);
    assert!(fully_on.contains(&m0));
    assert!(idle.is_empty());

    // The wake completes and the queue drains onto M0.
    sim.finish_power(m0);
    ctrl.on_state_change_complete(&mut sim, 4, m0);
    let vm = ctrl.world().vm_of(big).expect("placed after the wake");
    assert_eq!(ctrl.world().vm_host(vm), Some(m0));
}

#[test]
fn sla_warning_for_a_running_task_promotes_without_queueing() {
    init_tracing();
    let mut sim = three_hosts();
    let mut ctrl = eeco();
    ctrl.init(&mut sim);

    // Demote M0, settle its sleep, then place a task on M1.
    let t0 = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 16));
    ctrl.on_new_task(&mut sim, 0, t0).expect("t0 placed");
    sim.finish_task(t0);
    ctrl.on_task_complete(&mut sim, 1, t0);
    let m0 = MachineId::new(0);
    sim.finish_power(m0);
    ctrl.on_state_change_complete(&mut sim, 2, m0);

    let t1 = sim.add_task(TaskDef::new(CpuFamily::X86, VmType::Linux, 16));
    ctrl.on_new_task(&mut sim, 3, t1).expect("t1 placed");

    ctrl.on_sla_warning(&mut sim, 4, t1).expect("promotion is not fatal");
    assert!(sim.log.contains(&Action::SetPower(m0, PowerState::Active)));
    assert_eq!(ctrl.world().wake_pending_len(m0), 0, "running task is not queued");
    let (fully_on, _) = pools(&ctrl);
    assert!(fully_on.contains(&m0));
}

#[test]
fn impossible_cpu_family_is_fatal() {
    init_tracing();
    let mut sim = three_hosts();
    let mut ctrl = eeco();
    ctrl.init(&mut sim);

    let task = sim.add_task(TaskDef::new(CpuFamily::Power, VmType::Aix, 16));
    let err = ctrl.on_new_task(&mut sim, 0, task).expect_err("no POWER machine");
    assert_eq!(err, ControllerError::NoPlacementPossible { task });
}
