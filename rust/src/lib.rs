//! Dispatch optimization for mobile vehicle-calibration technicians.
//!
//! A pass loads a snapshot of jobs, technicians, vans and equipment
//! requirements, then assigns each backlog job to a technician and start
//! time. Fixed-time jobs are placed first as immovable constraints; the rest
//! of the backlog is ordered by aging-aware priority and allocated greedily.

pub mod logging;
pub mod aging;
pub mod calendar;
pub mod candidates;
pub mod capability;
mod config;
pub mod conflicts;
pub mod engine;
pub mod equipment;
mod error;
mod models;
pub mod scheduler;
mod snapshot;
pub mod sorting;
pub mod validation;

pub use aging::AgingLedger;
pub use calendar::{AvailabilityCalendar, OpenWindow};
pub use capability::CapabilityResolver;
pub use config::DispatchConfig;
pub use engine::{DispatchEngine, HealthStatus, UNHEALTHY_AFTER_FAILURES};
pub use equipment::{EquipmentSet, VanEquipmentIndex};
pub use error::{
    DispatchError, FailureReason, JobFailure, PassWarning, SnapshotError, UnknownRequirement,
    ValidationIssue,
};
pub use models::{
    Address, Assignment, AvailabilityException, CalibrationKind, Coordinates, DefaultHours,
    EquipmentInstance, EquipmentRequirement, EquipmentType, Job, JobId, JobStatus, KeySource,
    ServiceCategory, ServiceDetail, Technician, TechnicianId, Van, VanId, VehicleKey,
    MAX_JOB_MINUTES, MAX_KEYS_PER_JOB,
};
pub use scheduler::{DispatchScheduler, PassResult, PassState};
pub use snapshot::{Horizon, OptimizeRequest, Snapshot, SnapshotSource};
pub use sorting::{effective_priority, sort_jobs, SortKey};
