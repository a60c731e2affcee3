//! Deterministic replay harness.
//!
//! Replays a [`Scenario`] against a [`Controller`], implementing the
//! [`Simulator`] facade over a small in-memory cluster model. It is not a
//! datacenter simulator: tasks run for exactly their scripted duration once
//! placed, and the two asynchronous actions complete after fixed
//! configurable latencies. What it gives the repo is an end-to-end, fully
//! deterministic event source for every policy — the CLI runs it, and the
//! trace-level tests drive it one event at a time.
//!
//! SLA accounting: a task violates its tier when it finishes after its
//! deadline, or never finishes at all. The harness fires an SLA warning the
//! first time an unplaced task can no longer meet its deadline.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::common::{
    ControllerError, CpuFamily, MachineId, Priority, PowerState, SlaClass, TaskId, Time, VmId,
    VmType,
};
use crate::config::Config;
use crate::engine::Controller;
use crate::sim::facade::{MachineSnapshot, Simulator, TaskSnapshot, VmSnapshot};
use crate::sim::scenario::{Scenario, TaskSpec};

/// Energy draw per simulated second for each power state, in abstract
/// units. Each running task adds [`DRAW_PER_TASK`] on top.
fn draw_base(state: PowerState) -> u64 {
    match state {
        PowerState::Active => 400,
        PowerState::IdleLight => 200,
        PowerState::IdleMedium => 150,
        PowerState::SleepLight => 80,
        PowerState::SleepMedium => 40,
        PowerState::SleepDeep1 => 20,
        PowerState::SleepDeep2 => 10,
        PowerState::Off => 0,
    }
}

/// Additional draw per running task, per simulated second.
const DRAW_PER_TASK: u64 = 60;

/// One event popped and processed by [`ReplayCluster::step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReplayEvent {
    /// A task arrived and was handed to the controller.
    Arrival(TaskId),
    /// A task finished.
    Completion(TaskId),
    /// A migration completed.
    MigrationDone(VmId),
    /// A power transition completed.
    StateChangeDone(MachineId),
    /// A periodic tick (SLA and memory checks run here).
    Tick,
}

#[derive(Debug)]
struct MachineSlot {
    cpu: CpuFamily,
    memory: u64,
    gpu: bool,
    power: PowerState,
    pending: Option<PowerState>,
    energy_micro: u64,
}

#[derive(Debug)]
struct VmSlot {
    vm_type: VmType,
    cpu: CpuFamily,
    host: Option<MachineId>,
    tasks: Vec<TaskId>,
    migrating_to: Option<MachineId>,
    gone: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TaskState {
    Pending,
    Running(VmId),
    Done(Time),
}

#[derive(Debug)]
struct TaskSlot {
    spec: TaskSpec,
    priority: Priority,
    state: TaskState,
    warned: bool,
}

/// In-memory cluster model driving a controller from a scenario.
#[derive(Debug)]
pub struct ReplayCluster {
    machines: Vec<MachineSlot>,
    vms: Vec<VmSlot>,
    tasks: Vec<TaskSlot>,
    events: BinaryHeap<Reverse<(Time, u64, ReplayEvent)>>,
    seq: u64,
    now: Time,
    last_energy_at: Time,
    vm_overhead: u64,
    migration_latency: Time,
    wake_latency: Time,
    sleep_latency: Time,
    tick_period: Time,
}

impl ReplayCluster {
    /// Builds a cluster from a validated scenario and the run config.
    ///
    /// # Errors
    ///
    /// Propagates [`Scenario::validate`] failures.
    pub fn new(scenario: &Scenario, config: &Config) -> Result<Self, ControllerError> {
        scenario.validate()?;
        let machines = scenario
            .machines
            .iter()
            .map(|spec| MachineSlot {
                cpu: spec.cpu,
                memory: spec.memory,
                gpu: spec.gpu,
                power: PowerState::Active,
                pending: None,
                energy_micro: 0,
            })
            .collect();
        let tasks: Vec<TaskSlot> = scenario
            .tasks
            .iter()
            .map(|spec| TaskSlot {
                priority: config.placement.sla_priority.priority_for(spec.sla),
                spec: spec.clone(),
                state: TaskState::Pending,
                warned: false,
            })
            .collect();

        let mut cluster = Self {
            machines,
            vms: Vec::new(),
            tasks,
            events: BinaryHeap::new(),
            seq: 0,
            now: 0,
            last_energy_at: 0,
            vm_overhead: config.placement.vm_overhead,
            migration_latency: config.replay.migration_latency,
            wake_latency: config.replay.wake_latency,
            sleep_latency: config.replay.sleep_latency,
            tick_period: config.replay.tick_period,
        };
        for (i, task) in scenario.tasks.iter().enumerate() {
            cluster.push(task.arrival, ReplayEvent::Arrival(TaskId::new(i as u64)));
        }
        let first_tick = cluster.tick_period;
        cluster.push(first_tick, ReplayEvent::Tick);
        Ok(cluster)
    }

    /// Current simulated time.
    pub fn now(&self) -> Time {
        self.now
    }

    fn push(&mut self, at: Time, event: ReplayEvent) {
        self.events.push(Reverse((at, self.seq, event)));
        self.seq += 1;
    }

    fn machine(&self, pm: MachineId) -> &MachineSlot {
        &self.machines[pm.val() as usize]
    }

    fn vm(&self, vm: VmId) -> &VmSlot {
        let slot = &self.vms[vm.val() as usize];
        assert!(!slot.gone, "VM {vm} is gone");
        slot
    }

    fn task(&self, task: TaskId) -> &TaskSlot {
        &self.tasks[task.val() as usize]
    }

    /// Live memory in use on a machine: each resident VM's overhead plus
    /// its tasks' memory. A VM in flight counts on its source until the
    /// migration completes.
    fn memory_used(&self, pm: MachineId) -> u64 {
        self.vms
            .iter()
            .filter(|slot| !slot.gone && slot.host == Some(pm))
            .map(|slot| {
                self.vm_overhead
                    + slot.tasks.iter().map(|t| self.task(*t).spec.memory).sum::<u64>()
            })
            .sum()
    }

    fn accrue_energy(&mut self, to: Time) {
        let dt = to - self.last_energy_at;
        if dt == 0 {
            return;
        }
        for (i, slot) in self.machines.iter_mut().enumerate() {
            let pm = MachineId::new(i as u32);
            let tasks: usize = self
                .vms
                .iter()
                .filter(|vm| !vm.gone && vm.host == Some(pm))
                .map(|vm| vm.tasks.len())
                .sum();
            let rate = draw_base(slot.power) + DRAW_PER_TASK * tasks as u64;
            slot.energy_micro += rate * dt;
        }
        self.last_energy_at = to;
    }

    fn violated(&self, slot: &TaskSlot) -> bool {
        let deadline = slot.spec.effective_deadline();
        match slot.state {
            TaskState::Done(at) => at > deadline,
            TaskState::Pending | TaskState::Running(_) => self.now > deadline,
        }
    }

    /// Pops and processes one event, forwarding it to the controller.
    /// Returns the event, or `None` when the trace is exhausted.
    ///
    /// # Errors
    ///
    /// Propagates hard failures from the controller.
    pub fn step(
        &mut self,
        controller: &mut Controller,
    ) -> Result<Option<(Time, ReplayEvent)>, ControllerError> {
        let Some(Reverse((at, _, event))) = self.events.pop() else {
            return Ok(None);
        };
        self.now = at;
        self.accrue_energy(at);

        match event {
            ReplayEvent::Arrival(task) => {
                controller.on_new_task(self, at, task)?;
            }
            ReplayEvent::Completion(task) => {
                let TaskState::Running(vm) = self.task(task).state else {
                    panic!("completion for task {task} that is not running");
                };
                self.vms[vm.val() as usize].tasks.retain(|t| *t != task);
                self.tasks[task.val() as usize].state = TaskState::Done(at);
                controller.on_task_complete(self, at, task);
            }
            ReplayEvent::MigrationDone(vm) => {
                let slot = &mut self.vms[vm.val() as usize];
                let dst = slot.migrating_to.take();
                assert!(dst.is_some(), "migration completion for VM {vm} not in flight");
                slot.host = dst;
                controller.on_migration_complete(self, at, vm);
            }
            ReplayEvent::StateChangeDone(pm) => {
                let slot = &mut self.machines[pm.val() as usize];
                let target = slot.pending.take();
                match target {
                    Some(state) => slot.power = state,
                    None => panic!("state-change completion for machine {pm} not in transition"),
                }
                controller.on_state_change_complete(self, at, pm);
            }
            ReplayEvent::Tick => {
                self.run_tick_checks(controller, at)?;
                controller.on_tick(self, at);
                // Keep ticking while anything can still happen: other
                // events are queued, or an unwarned pending task is
                // heading toward its deadline. A stalled trace (warned
                // tasks nothing will ever place) is allowed to end.
                let pending_unwarned = self
                    .tasks
                    .iter()
                    .any(|t| t.state == TaskState::Pending && !t.warned);
                if !self.events.is_empty() || pending_unwarned {
                    let next = at + self.tick_period;
                    self.push(next, ReplayEvent::Tick);
                }
            }
        }
        Ok(Some((at, event)))
    }

    /// SLA and memory checks performed on every tick.
    fn run_tick_checks(
        &mut self,
        controller: &mut Controller,
        at: Time,
    ) -> Result<(), ControllerError> {
        // An unplaced task that can no longer meet its deadline gets one
        // SLA warning.
        let late: Vec<TaskId> = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, slot)| {
                slot.state == TaskState::Pending
                    && !slot.warned
                    && slot.spec.arrival <= at
                    && at + slot.spec.duration > slot.spec.effective_deadline()
            })
            .map(|(i, _)| TaskId::new(i as u64))
            .collect();
        for task in late {
            self.tasks[task.val() as usize].warned = true;
            controller.on_sla_warning(self, at, task)?;
        }

        // A machine running past its installed memory gets a warning.
        let over: Vec<MachineId> = (0..self.machines.len())
            .map(|i| MachineId::new(i as u32))
            .filter(|&pm| self.memory_used(pm) > self.machine(pm).memory)
            .collect();
        for pm in over {
            controller.on_memory_warning(self, at, pm)?;
        }
        Ok(())
    }

    /// Runs the whole trace: every event through [`step`](Self::step), then
    /// the simulation-complete callback.
    ///
    /// # Errors
    ///
    /// Propagates hard failures from the controller.
    pub fn drive(&mut self, controller: &mut Controller) -> Result<(), ControllerError> {
        while self.step(controller)?.is_some() {}
        let end = self.now;
        self.accrue_energy(end);
        controller.on_simulation_complete(self, end);
        Ok(())
    }
}

impl Simulator for ReplayCluster {
    fn machine_total(&self) -> usize {
        self.machines.len()
    }

    fn machine_info(&self, pm: MachineId) -> MachineSnapshot {
        let slot = self.machine(pm);
        let resident: Vec<&VmSlot> =
            self.vms.iter().filter(|vm| !vm.gone && vm.host == Some(pm)).collect();
        MachineSnapshot {
            id: pm,
            cpu: slot.cpu,
            gpu: slot.gpu,
            memory_size: slot.memory,
            memory_used: self.memory_used(pm),
            power_state: slot.power,
            active_vms: resident.len(),
            active_tasks: resident.iter().map(|vm| vm.tasks.len()).sum(),
            energy_consumed: slot.energy_micro / 1_000_000,
        }
    }

    fn machine_cpu(&self, pm: MachineId) -> CpuFamily {
        self.machine(pm).cpu
    }

    fn vm_info(&self, vm: VmId) -> VmSnapshot {
        let slot = self.vm(vm);
        let host = match (slot.host, slot.migrating_to) {
            (Some(pm), _) => pm,
            (None, Some(dst)) => dst,
            (None, None) => panic!("VM {vm} was never attached"),
        };
        VmSnapshot {
            id: vm,
            vm_type: slot.vm_type,
            cpu: slot.cpu,
            host,
            active_tasks: slot.tasks.clone(),
        }
    }

    fn task_info(&self, task: TaskId) -> TaskSnapshot {
        let slot = self.task(task);
        TaskSnapshot {
            id: task,
            required_cpu: slot.spec.cpu,
            required_vm: slot.spec.vm_type,
            required_memory: slot.spec.memory,
            gpu_capable: slot.spec.gpu,
            sla: slot.spec.sla,
            priority: slot.priority,
            arrival: slot.spec.arrival,
            target_completion: slot.spec.effective_deadline(),
            completed: matches!(slot.state, TaskState::Done(_)),
        }
    }

    fn task_memory(&self, task: TaskId) -> u64 {
        self.task(task).spec.memory
    }

    fn sla_report(&self, sla: SlaClass) -> f64 {
        let of_class: Vec<&TaskSlot> =
            self.tasks.iter().filter(|t| t.spec.sla == sla).collect();
        if of_class.is_empty() {
            return 0.0;
        }
        let violated = of_class.iter().filter(|t| self.violated(t)).count();
        100.0 * violated as f64 / of_class.len() as f64
    }

    fn cluster_energy(&self) -> u64 {
        self.machines.iter().map(|m| m.energy_micro).sum::<u64>() / 1_000_000
    }

    fn set_power_state(&mut self, pm: MachineId, state: PowerState) {
        let at = self.now + if state.is_active() { self.wake_latency } else { self.sleep_latency };
        let slot = &mut self.machines[pm.val() as usize];
        assert!(
            slot.pending.is_none(),
            "power transition issued for machine {pm} while one is in flight",
        );
        slot.pending = Some(state);
        self.push(at, ReplayEvent::StateChangeDone(pm));
    }

    fn vm_create(&mut self, vm_type: VmType, cpu: CpuFamily) -> VmId {
        let id = VmId::new(self.vms.len() as u32);
        self.vms.push(VmSlot {
            vm_type,
            cpu,
            host: None,
            tasks: Vec::new(),
            migrating_to: None,
            gone: false,
        });
        id
    }

    fn vm_attach(&mut self, vm: VmId, pm: MachineId) {
        assert!(
            self.machine(pm).power.is_active(),
            "VM {vm} attached to machine {pm} which is not ACTIVE",
        );
        let slot = &mut self.vms[vm.val() as usize];
        assert!(!slot.gone && slot.host.is_none(), "VM {vm} attached twice");
        slot.host = Some(pm);
    }

    fn vm_add_task(&mut self, vm: VmId, task: TaskId, priority: Priority) {
        let done = self.now + self.task(task).spec.duration;
        let slot = &mut self.vms[vm.val() as usize];
        assert!(!slot.gone, "task {task} added to gone VM {vm}");
        assert!(slot.migrating_to.is_none(), "task {task} added to migrating VM {vm}");
        slot.tasks.push(task);
        let task_slot = &mut self.tasks[task.val() as usize];
        assert_eq!(task_slot.state, TaskState::Pending, "task {task} added twice");
        task_slot.state = TaskState::Running(vm);
        task_slot.priority = priority;
        self.push(done, ReplayEvent::Completion(task));
    }

    fn vm_migrate(&mut self, vm: VmId, dst: MachineId) {
        let at = self.now + self.migration_latency;
        let slot = &mut self.vms[vm.val() as usize];
        assert!(!slot.gone, "migration of gone VM {vm}");
        assert!(slot.migrating_to.is_none(), "VM {vm} is already migrating");
        slot.migrating_to = Some(dst);
        self.push(at, ReplayEvent::MigrationDone(vm));
    }

    fn vm_shutdown(&mut self, vm: VmId) {
        let slot = &mut self.vms[vm.val() as usize];
        assert!(!slot.gone, "VM {vm} shut down twice");
        assert!(slot.tasks.is_empty(), "VM {vm} shut down with running tasks");
        assert!(slot.migrating_to.is_none(), "VM {vm} shut down while migrating");
        slot.gone = true;
        slot.host = None;
    }
}
