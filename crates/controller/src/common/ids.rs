//! Machine, VM, and Task identifier types.
//!
//! This module defines strong types for the three entity identifiers to
//! prevent accidental mixing of ID spaces. It provides:
//! 1. **Type Safety:** A machine index can never be passed where a VM or task
//!    id is expected.
//! 2. **Opaque Identity:** Entities never hold references to each other; all
//!    relationships go through these IDs and a lookup on the world model or
//!    the simulator facade.

use std::fmt;

/// Identifier of a physical machine (PM) in the simulated datacenter.
///
/// Machine ids are dense indices assigned by the simulator at init time:
/// `0..machine_total()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MachineId(pub u32);

/// Identifier of a virtual machine created by the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VmId(pub u32);

/// Identifier of a task delivered by the simulator's arrival events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

impl MachineId {
    /// Creates a machine id from a raw index.
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw index value.
    #[inline]
    pub fn val(&self) -> u32 {
        self.0
    }
}

impl VmId {
    /// Creates a VM id from a raw value.
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    pub fn val(&self) -> u32 {
        self.0
    }
}

impl TaskId {
    /// Creates a task id from a raw value.
    #[inline]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    pub fn val(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for VmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
