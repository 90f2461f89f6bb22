mod schedule;
pub use schedule::Schedule;

mod slot;
pub use slot::{SlotKey, SlotKind, SlotState};

mod run_id;
pub use run_id::RunId;

mod run_status;
pub use run_status::RunStatus;

mod capability;
pub use capability::{Capability, DenialReason, ParseCapabilityError, PermissionStatus};

mod service;
pub use service::{ServiceAction, ServiceDisposition};

/// Name of a background workload (service slot name and WorkloadFlag key).
pub type WorkloadName = String;

/// Duration value in milliseconds.
///
/// Used by schedules and configuration structs where an explicit time value is required.
pub type DurationMs = u64;
