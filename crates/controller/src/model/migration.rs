//! In-flight migration records.
//!
//! A migration is the controller's only multi-event action on a VM: it is
//! issued against a destination, reserves memory there, and completes via a
//! later event. The record carries everything needed to release the
//! reservation without re-querying the simulator at completion time.

use crate::common::{MachineId, VmId};

/// One in-flight VM migration.
///
/// Created atomically with its destination reservation; destroyed when the
/// simulator reports completion. `reserved` is the VM's full footprint
/// (task memory plus the per-VM overhead) as computed at issue time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MigrationRecord {
    /// The VM in flight.
    pub vm: VmId,
    /// Machine the VM is leaving.
    pub src: MachineId,
    /// Machine the VM is moving to.
    pub dst: MachineId,
    /// Memory reserved on `dst` for the duration of the flight.
    pub reserved: u64,
}
