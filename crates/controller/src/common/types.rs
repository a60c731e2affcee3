//! Domain enums and their canonical string forms.
//!
//! This module defines the closed enum sets the simulator and the controller
//! agree on. It provides:
//! 1. **Hardware:** CPU families and machine power states.
//! 2. **Workload:** VM types, SLA classes, and scheduling priorities.
//! 3. **Formatting:** One `Display` implementation per enum; every log line
//!    and report goes through these, nothing is stringified ad hoc.

use std::fmt;

use serde::Deserialize;

/// CPU instruction-set family of a machine, VM, or task requirement.
///
/// A task can only run on a machine of its required family, and a VM can only
/// migrate between machines of the same family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CpuFamily {
    /// ARM cores.
    Arm,
    /// IBM POWER cores.
    Power,
    /// RISC-V cores.
    Riscv,
    /// x86-64 cores.
    X86,
}

/// Guest operating-system flavor of a virtual machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VmType {
    /// Standard Linux guest.
    Linux,
    /// Real-time Linux guest.
    LinuxRt,
    /// Windows guest.
    Win,
    /// AIX guest.
    Aix,
}

/// Service-level agreement tier of a task.
///
/// SLA0 is the strictest tier and SLA3 the loosest; the tier maps to a
/// default scheduling [`Priority`] and to per-tier violation accounting in
/// the end-of-run report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SlaClass {
    /// Strictest tier.
    Sla0,
    /// Strict tier.
    Sla1,
    /// Relaxed tier.
    Sla2,
    /// Loosest tier; violations are not tracked.
    Sla3,
}

/// Scheduling priority attached to a task when it is added to a VM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    /// Runs ahead of everything else on the VM.
    High,
    /// Default priority.
    Mid,
    /// Background work.
    Low,
}

/// Power state of a physical machine.
///
/// ACTIVE is the only state in which a machine can host work. The idle
/// states keep the machine instantly available at reduced draw; the sleep
/// states trade wake latency for deeper savings; OFF draws nothing.
/// Transitions between states are asynchronous and tracked per machine by
/// the world model's power state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerState {
    /// Fully on; can host VMs and tasks.
    Active,
    /// Shallow idle, instant resume.
    IdleLight,
    /// Deeper idle, instant resume.
    IdleMedium,
    /// Light sleep, fast wake.
    SleepLight,
    /// Medium sleep.
    SleepMedium,
    /// Deep sleep, first level.
    #[serde(rename = "SLEEP_DEEP_1")]
    SleepDeep1,
    /// Deep sleep, second level.
    #[serde(rename = "SLEEP_DEEP_2")]
    SleepDeep2,
    /// Powered off.
    Off,
}

impl SlaClass {
    /// All SLA classes, strictest first. Used by the report loop.
    pub const ALL: [SlaClass; 4] = [SlaClass::Sla0, SlaClass::Sla1, SlaClass::Sla2, SlaClass::Sla3];

    /// Returns the default scheduling priority for this tier.
    ///
    /// SLA0 and SLA1 map to HIGH, SLA2 to MID, SLA3 to LOW.
    pub fn default_priority(self) -> Priority {
        match self {
            SlaClass::Sla0 | SlaClass::Sla1 => Priority::High,
            SlaClass::Sla2 => Priority::Mid,
            SlaClass::Sla3 => Priority::Low,
        }
    }
}

impl PowerState {
    /// Returns `true` if this is the ACTIVE state.
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, PowerState::Active)
    }
}

impl fmt::Display for CpuFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CpuFamily::Arm => "ARM",
            CpuFamily::Power => "POWER",
            CpuFamily::Riscv => "RISCV",
            CpuFamily::X86 => "X86",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for VmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VmType::Linux => "LINUX",
            VmType::LinuxRt => "LINUX_RT",
            VmType::Win => "WIN",
            VmType::Aix => "AIX",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for SlaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SlaClass::Sla0 => "SLA0",
            SlaClass::Sla1 => "SLA1",
            SlaClass::Sla2 => "SLA2",
            SlaClass::Sla3 => "SLA3",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::High => "HIGH",
            Priority::Mid => "MID",
            Priority::Low => "LOW",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PowerState::Active => "ACTIVE",
            PowerState::IdleLight => "IDLE_LIGHT",
            PowerState::IdleMedium => "IDLE_MEDIUM",
            PowerState::SleepLight => "SLEEP_LIGHT",
            PowerState::SleepMedium => "SLEEP_MEDIUM",
            PowerState::SleepDeep1 => "SLEEP_DEEP_1",
            PowerState::SleepDeep2 => "SLEEP_DEEP_2",
            PowerState::Off => "OFF",
        };
        write!(f, "{s}")
    }
}
