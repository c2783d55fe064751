//! Read-only input snapshot and the horizon a pass covers.

use chrono::{Days, NaiveDate, NaiveDateTime};

use crate::config::DispatchConfig;
use crate::error::SnapshotError;
use crate::models::{EquipmentRequirement, Job, Technician, Van};

/// Date range covered by one pass: `days` whole days from `start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Horizon {
    pub start: NaiveDate,
    pub days: u32,
}

impl Horizon {
    pub fn new(start: NaiveDate, days: u32) -> Self {
        Self { start, days }
    }

    pub fn from_config(start: NaiveDate, config: &DispatchConfig) -> Self {
        Self::new(start, config.default_horizon_days)
    }

    /// Dates in the horizon, in order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.days).filter_map(move |offset| self.start.checked_add_days(Days::new(offset as u64)))
    }

    /// Last date inside the horizon.
    pub fn last_date(&self) -> NaiveDate {
        self.start
            .checked_add_days(Days::new(self.days.saturating_sub(1) as u64))
            .unwrap_or(self.start)
    }
}

/// Everything a pass reads. Owned, so each pass works on its own copy.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub jobs: Vec<Job>,
    pub technicians: Vec<Technician>,
    pub vans: Vec<Van>,
    pub requirements: Vec<EquipmentRequirement>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job(mut self, job: Job) -> Self {
        self.jobs.push(job);
        self
    }

    pub fn with_technician(mut self, technician: Technician) -> Self {
        self.technicians.push(technician);
        self
    }

    pub fn with_van(mut self, van: Van) -> Self {
        self.vans.push(van);
        self
    }

    pub fn with_requirement(mut self, requirement: EquipmentRequirement) -> Self {
        self.requirements.push(requirement);
        self
    }
}

/// Where a pass gets its snapshot from.
///
/// Implemented by the surrounding system's storage layer; loading happens
/// exactly once at the start of a pass.
pub trait SnapshotSource {
    fn load(&self, horizon: &Horizon) -> Result<Snapshot, SnapshotError>;
}

impl SnapshotSource for Snapshot {
    fn load(&self, _horizon: &Horizon) -> Result<Snapshot, SnapshotError> {
        Ok(self.clone())
    }
}

/// One "optimize schedule for horizon H" request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptimizeRequest {
    pub horizon: Horizon,
    /// Evaluation instant; no window is ever returned before it
    pub now: NaiveDateTime,
}

impl OptimizeRequest {
    pub fn new(horizon: Horizon, now: NaiveDateTime) -> Self {
        Self { horizon, now }
    }
}
