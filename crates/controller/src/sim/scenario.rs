//! Declarative scenario input for the replay harness.
//!
//! A scenario describes a cluster (machine shapes) and a workload trace
//! (task arrivals with durations and requirements). Scenarios are plain
//! JSON; the CLI loads them from disk and the tests build them inline.
//!
//! # Examples
//!
//! ```
//! use vmplace_core::sim::Scenario;
//!
//! let scenario = Scenario::from_json(r#"{
//!     "machines": [
//!         { "cpu": "X86", "memory": 128, "gpu": false },
//!         { "cpu": "X86", "memory": 64, "gpu": true },
//!         { "cpu": "ARM", "memory": 128 }
//!     ],
//!     "tasks": [
//!         { "arrival": 0, "duration": 2000000, "cpu": "X86",
//!           "vm_type": "LINUX", "memory": 32, "sla": "SLA1" }
//!     ]
//! }"#).unwrap();
//! assert_eq!(scenario.machines.len(), 3);
//! scenario.validate().unwrap();
//! ```

use serde::Deserialize;

use crate::common::{ControllerError, CpuFamily, SlaClass, Time, VmType};

/// A cluster plus a workload trace.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Machine shapes; the machine's index is its id.
    pub machines: Vec<MachineSpec>,
    /// Task trace; the task's index is its id.
    pub tasks: Vec<TaskSpec>,
}

/// Shape of one machine.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineSpec {
    /// CPU family of every core.
    pub cpu: CpuFamily,
    /// Installed memory.
    pub memory: u64,
    /// Whether the machine carries a GPU.
    #[serde(default)]
    pub gpu: bool,
}

/// One task in the workload trace.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskSpec {
    /// Arrival time (µs).
    pub arrival: Time,
    /// Run time once placed (µs).
    pub duration: Time,
    /// Required CPU family.
    pub cpu: CpuFamily,
    /// Required guest flavor.
    pub vm_type: VmType,
    /// Required memory.
    pub memory: u64,
    /// Whether the task requires a GPU host.
    #[serde(default)]
    pub gpu: bool,
    /// SLA tier.
    pub sla: SlaClass,
    /// Absolute completion deadline. Defaults to arrival + duration plus a
    /// quarter of the duration as slack.
    #[serde(default)]
    pub deadline: Option<Time>,
}

impl TaskSpec {
    /// The task's effective deadline.
    pub fn effective_deadline(&self) -> Time {
        self.deadline.unwrap_or(self.arrival + self.duration + self.duration / 4)
    }
}

impl Scenario {
    /// Parses a scenario from JSON text.
    ///
    /// # Errors
    ///
    /// Returns the underlying deserialization error on malformed input.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Checks the scenario for structural problems the type system cannot
    /// catch.
    ///
    /// # Errors
    ///
    /// [`ControllerError::Scenario`] on an empty cluster, a zero-duration
    /// task, or a deadline before its task's arrival.
    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.machines.is_empty() {
            return Err(ControllerError::Scenario("no machines defined".into()));
        }
        for (i, task) in self.tasks.iter().enumerate() {
            if task.duration == 0 {
                return Err(ControllerError::Scenario(format!("task {i} has zero duration")));
            }
            if task.effective_deadline() < task.arrival {
                return Err(ControllerError::Scenario(format!(
                    "task {i} deadline precedes its arrival"
                )));
            }
        }
        Ok(())
    }
}
