//! Configuration system for the placement controller.
//!
//! This module defines all configuration structures used to parameterize the
//! controller and the replay harness. It provides:
//! 1. **Defaults:** Baseline constants (VM overhead, idle-pool fraction,
//!    harness latencies).
//! 2. **Structures:** Hierarchical config for policy selection, placement
//!    arithmetic, power management, and replay timing.
//!
//! Configuration is supplied via JSON (the CLI's `--config` file) or use
//! `Config::default()`.

use serde::Deserialize;

use crate::common::{Priority, PowerState, SlaClass, Time};
use crate::policy::PolicyKind;

/// Default configuration constants for the controller.
///
/// These values define the baseline behavior when not explicitly overridden
/// in a JSON configuration file.
mod defaults {
    /// Memory charged to a machine for every hosted VM, on top of the VM's
    /// task memory. Added to every placement and fit calculation.
    pub const VM_OVERHEAD: u64 = 8;

    /// Largest fraction of the cluster E-Eco may hold in its idle pool.
    pub const EECO_IDLE_FRACTION: f64 = 0.5;

    /// Simulated time a VM migration takes in the replay harness (µs).
    pub const MIGRATION_LATENCY: u64 = 1_000_000;

    /// Simulated time a wake transition takes in the replay harness (µs).
    pub const WAKE_LATENCY: u64 = 200_000;

    /// Simulated time a sleep/off transition takes in the replay harness (µs).
    pub const SLEEP_LATENCY: u64 = 50_000;

    /// Period of the replay harness's tick events (µs).
    pub const TICK_PERIOD: u64 = 100_000;
}

/// Root configuration structure containing all controller settings.
///
/// # Examples
///
/// Creating a default configuration:
///
/// ```
/// use vmplace_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.placement.vm_overhead, 8);
/// ```
///
/// Deserializing from JSON (typical CLI usage):
///
/// ```
/// use vmplace_core::config::Config;
/// use vmplace_core::policy::PolicyKind;
///
/// let json = r#"{
///     "policy": "PMapper",
///     "placement": { "vm_overhead": 16 },
///     "power": { "shutdown_state": "SLEEP_DEEP_2" }
/// }"#;
///
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.policy, PolicyKind::PMapper);
/// assert_eq!(config.placement.vm_overhead, 16);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Placement policy selected at init time.
    #[serde(default)]
    pub policy: PolicyKind,

    /// Placement arithmetic parameters.
    #[serde(default)]
    pub placement: PlacementConfig,

    /// Power management parameters.
    #[serde(default)]
    pub power: PowerConfig,

    /// Replay harness timing (ignored outside the harness).
    #[serde(default)]
    pub replay: ReplayConfig,
}

/// Placement arithmetic parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct PlacementConfig {
    /// Memory charged per hosted VM on top of its task memory.
    #[serde(default = "PlacementConfig::default_vm_overhead")]
    pub vm_overhead: u64,

    /// SLA tier to scheduling priority mapping.
    #[serde(default)]
    pub sla_priority: SlaPriorityMap,
}

impl PlacementConfig {
    /// Returns the default per-VM memory overhead.
    fn default_vm_overhead() -> u64 {
        defaults::VM_OVERHEAD
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            vm_overhead: defaults::VM_OVERHEAD,
            sla_priority: SlaPriorityMap::default(),
        }
    }
}

/// SLA tier to scheduling priority mapping.
///
/// The default is the standard map: SLA0→HIGH, SLA1→HIGH, SLA2→MID,
/// SLA3→LOW.
#[derive(Debug, Clone, Deserialize)]
pub struct SlaPriorityMap {
    /// Priority for SLA0 tasks.
    #[serde(default = "SlaPriorityMap::default_sla0")]
    pub sla0: Priority,
    /// Priority for SLA1 tasks.
    #[serde(default = "SlaPriorityMap::default_sla1")]
    pub sla1: Priority,
    /// Priority for SLA2 tasks.
    #[serde(default = "SlaPriorityMap::default_sla2")]
    pub sla2: Priority,
    /// Priority for SLA3 tasks.
    #[serde(default = "SlaPriorityMap::default_sla3")]
    pub sla3: Priority,
}

impl SlaPriorityMap {
    fn default_sla0() -> Priority {
        SlaClass::Sla0.default_priority()
    }
    fn default_sla1() -> Priority {
        SlaClass::Sla1.default_priority()
    }
    fn default_sla2() -> Priority {
        SlaClass::Sla2.default_priority()
    }
    fn default_sla3() -> Priority {
        SlaClass::Sla3.default_priority()
    }

    /// Returns the configured priority for the given SLA tier.
    pub fn priority_for(&self, sla: SlaClass) -> Priority {
        match sla {
            SlaClass::Sla0 => self.sla0,
            SlaClass::Sla1 => self.sla1,
            SlaClass::Sla2 => self.sla2,
            SlaClass::Sla3 => self.sla3,
        }
    }
}

impl Default for SlaPriorityMap {
    fn default() -> Self {
        Self {
            sla0: Self::default_sla0(),
            sla1: Self::default_sla1(),
            sla2: Self::default_sla2(),
            sla3: Self::default_sla3(),
        }
    }
}

/// Power management parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct PowerConfig {
    /// Target state for every machine-shutdown site.
    ///
    /// One state used consistently by the post-placement sweep, the
    /// migration-drain path, and the final shutdown.
    #[serde(default = "PowerConfig::default_shutdown_state")]
    pub shutdown_state: PowerState,

    /// Target state E-Eco uses when demoting a machine to its idle pool.
    #[serde(default = "PowerConfig::default_eeco_idle_state")]
    pub eeco_idle_state: PowerState,

    /// Largest fraction of the cluster E-Eco may hold in its idle pool.
    #[serde(default = "PowerConfig::default_eeco_idle_fraction")]
    pub eeco_idle_fraction: f64,
}

impl PowerConfig {
    /// Returns the default shutdown target state.
    fn default_shutdown_state() -> PowerState {
        PowerState::Off
    }

    /// Returns the default E-Eco idle-pool state.
    fn default_eeco_idle_state() -> PowerState {
        PowerState::SleepMedium
    }

    /// Returns the default E-Eco idle-pool cap.
    fn default_eeco_idle_fraction() -> f64 {
        defaults::EECO_IDLE_FRACTION
    }
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            shutdown_state: Self::default_shutdown_state(),
            eeco_idle_state: Self::default_eeco_idle_state(),
            eeco_idle_fraction: Self::default_eeco_idle_fraction(),
        }
    }
}

/// Replay harness timing parameters.
///
/// These only affect the deterministic replay harness; the controller core
/// never reads them.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayConfig {
    /// Simulated duration of a VM migration (µs).
    #[serde(default = "ReplayConfig::default_migration_latency")]
    pub migration_latency: Time,

    /// Simulated duration of a transition to ACTIVE (µs).
    #[serde(default = "ReplayConfig::default_wake_latency")]
    pub wake_latency: Time,

    /// Simulated duration of a transition to any non-ACTIVE state (µs).
    #[serde(default = "ReplayConfig::default_sleep_latency")]
    pub sleep_latency: Time,

    /// Period of the harness tick events (µs).
    #[serde(default = "ReplayConfig::default_tick_period")]
    pub tick_period: Time,
}

impl ReplayConfig {
    /// Returns the default migration latency.
    fn default_migration_latency() -> Time {
        defaults::MIGRATION_LATENCY
    }

    /// Returns the default wake latency.
    fn default_wake_latency() -> Time {
        defaults::WAKE_LATENCY
    }

    /// Returns the default sleep latency.
    fn default_sleep_latency() -> Time {
        defaults::SLEEP_LATENCY
    }

    /// Returns the default tick period.
    fn default_tick_period() -> Time {
        defaults::TICK_PERIOD
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            migration_latency: defaults::MIGRATION_LATENCY,
            wake_latency: defaults::WAKE_LATENCY,
            sleep_latency: defaults::SLEEP_LATENCY,
            tick_period: defaults::TICK_PERIOD,
        }
    }
}
