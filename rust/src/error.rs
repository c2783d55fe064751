//! Error and failure types.
//!
//! Pass-fatal problems are [`DispatchError`]s. Everything that only affects a
//! single job is a [`FailureReason`] recorded in the pass result.

use thiserror::Error;

use crate::models::{JobId, ServiceCategory, TechnicianId, VehicleKey};

/// Why a single job could not be placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureReason {
    /// No equipment-requirement entry for the job's (service, vehicle).
    UnknownRequirement,
    /// No single van carries the full requirement set.
    InsufficientEquipmentCoverage,
    /// Capable technicians exist but none has a long-enough window.
    NoCapacityInHorizon,
    /// Windows exist but are consumed by earlier allocations in this pass.
    AllCandidatesOverbooked,
    /// Two fixed jobs overlap on one technician.
    FixedTimeCollision,
}

impl FailureReason {
    /// Stable reason code surfaced to callers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownRequirement => "unknown-requirement",
            Self::InsufficientEquipmentCoverage => "insufficient-equipment-coverage",
            Self::NoCapacityInHorizon => "no-capacity-in-horizon",
            Self::AllCandidatesOverbooked => "all-candidates-overbooked",
            Self::FixedTimeCollision => "fixed-time-collision",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A job the pass could not place, with its reason.
#[derive(Clone, Debug, PartialEq)]
pub struct JobFailure {
    pub job_id: JobId,
    pub reason: FailureReason,
    pub detail: String,
}

impl JobFailure {
    pub fn new(job_id: &str, reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            job_id: job_id.to_string(),
            reason,
            detail: detail.into(),
        }
    }
}

/// Lookup miss in the equipment-requirement table.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("No equipment requirement for {service} on {vehicle}")]
pub struct UnknownRequirement {
    pub service: ServiceCategory,
    pub vehicle: VehicleKey,
}

/// Pass-level data-integrity warnings that do not block other jobs.
#[derive(Clone, Debug, PartialEq)]
pub enum PassWarning {
    FixedTimeCollision {
        technician_id: TechnicianId,
        kept_job: JobId,
        rejected_job: JobId,
    },
    /// An en-route/in-progress job without technician or start time.
    InFlightWithoutPlacement { job_id: JobId },
}

impl std::fmt::Display for PassWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FixedTimeCollision {
                technician_id,
                kept_job,
                rejected_job,
            } => write!(
                f,
                "fixed job {} collides with {} on {}",
                rejected_job, kept_job, technician_id
            ),
            Self::InFlightWithoutPlacement { job_id } => {
                write!(f, "in-flight job {} has no technician or start", job_id)
            }
        }
    }
}

/// One structural problem found in a snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
    pub entity: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.entity, self.message)
    }
}

/// Failure to produce a snapshot for a pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("Snapshot source unavailable: {0}")]
    Unavailable(String),
    #[error("Snapshot does not cover horizon starting {0}")]
    HorizonNotCovered(chrono::NaiveDate),
}

/// Errors that abort a whole pass. No assignments are proposed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Failed to load snapshot: {0}")]
    SnapshotLoad(#[from] SnapshotError),
    #[error("Invalid snapshot: {}", format_issues(.0))]
    InvalidSnapshot(Vec<ValidationIssue>),
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
