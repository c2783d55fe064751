//! Core data types for the dispatch engine.
//!
//! Every entity here is a read-only input for a pass, except [`Assignment`],
//! which is the only thing a pass writes back.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Identifier of a job.
pub type JobId = String;
/// Identifier of a technician.
pub type TechnicianId = String;
/// Identifier of a van.
pub type VanId = String;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Service categories offered by the field team.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceCategory {
    AdasCalibration,
    KeyProgramming,
    ModuleProgramming,
    DiagnosticScan,
    AirbagReset,
}

impl ServiceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdasCalibration => "adas_calibration",
            Self::KeyProgramming => "key_programming",
            Self::ModuleProgramming => "module_programming",
            Self::DiagnosticScan => "diagnostic_scan",
            Self::AirbagReset => "airbag_reset",
        }
    }

    /// Whether equipment for this category is matched down to the model.
    ///
    /// Calibration targets are model specific; every other category is
    /// satisfied by any tool of the right type.
    pub fn requires_model_match(&self) -> bool {
        matches!(self, Self::AdasCalibration)
    }
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of ADAS calibration performed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationKind {
    Static,
    Dynamic,
    Both,
}

/// Who supplies the key blanks for a key programming job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeySource {
    CustomerSupplied,
    ShopSupplied,
}

/// Maximum keys programmed in one visit.
pub const MAX_KEYS_PER_JOB: u32 = 8;

/// Category-specific job payload.
///
/// The category of a job is derived from its detail, so the two can never
/// disagree.
#[derive(Clone, Debug, PartialEq)]
pub enum ServiceDetail {
    AdasCalibration {
        calibration: CalibrationKind,
    },
    KeyProgramming {
        quantity: u32,
        source: KeySource,
        part_number: Option<String>,
    },
    ModuleProgramming {
        module: String,
    },
    DiagnosticScan,
    AirbagReset {
        modules_deployed: u32,
    },
}

impl ServiceDetail {
    pub fn category(&self) -> ServiceCategory {
        match self {
            Self::AdasCalibration { .. } => ServiceCategory::AdasCalibration,
            Self::KeyProgramming { .. } => ServiceCategory::KeyProgramming,
            Self::ModuleProgramming { .. } => ServiceCategory::ModuleProgramming,
            Self::DiagnosticScan => ServiceCategory::DiagnosticScan,
            Self::AirbagReset { .. } => ServiceCategory::AirbagReset,
        }
    }

    /// Check the category-specific rules, returning a description of the
    /// first violation.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::AdasCalibration { .. } | Self::DiagnosticScan => Ok(()),
            Self::KeyProgramming {
                quantity,
                source,
                part_number,
            } => {
                if *quantity == 0 || *quantity > MAX_KEYS_PER_JOB {
                    return Err(format!(
                        "key quantity {} outside 1..={}",
                        quantity, MAX_KEYS_PER_JOB
                    ));
                }
                let has_part = part_number
                    .as_deref()
                    .map(|p| !p.trim().is_empty())
                    .unwrap_or(false);
                if *source == KeySource::ShopSupplied && !has_part {
                    return Err("shop-supplied keys require a part number".to_string());
                }
                Ok(())
            }
            Self::ModuleProgramming { module } => {
                if module.trim().is_empty() {
                    Err("module programming requires a module name".to_string())
                } else {
                    Ok(())
                }
            }
            Self::AirbagReset { modules_deployed } => {
                if *modules_deployed == 0 {
                    Err("airbag reset requires at least one deployed module".to_string())
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Geographic coordinates in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance in meters.
    pub fn distance_meters(&self, other: &Coordinates) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlng = (other.lng - self.lng).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().asin()
    }
}

/// Service address. Coordinates are a coarse clustering signal only.
#[derive(Clone, Debug, PartialEq)]
pub struct Address {
    pub street: String,
    pub coordinates: Option<Coordinates>,
}

impl Address {
    pub fn new(street: impl Into<String>) -> Self {
        Self {
            street: street.into(),
            coordinates: None,
        }
    }

    pub fn with_coordinates(mut self, lat: f64, lng: f64) -> Self {
        self.coordinates = Some(Coordinates::new(lat, lng));
        self
    }

    /// Street normalized for comparison: lowercase, single-spaced, no
    /// trailing punctuation.
    pub fn location_key(&self) -> String {
        self.street
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| c == ',' || c == '.'))
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// Whether two addresses are the same site for batching purposes.
    pub fn same_site(&self, other: &Address, radius_meters: f64) -> bool {
        let key = self.location_key();
        if !key.is_empty() && key == other.location_key() {
            return true;
        }
        match (&self.coordinates, &other.coordinates) {
            (Some(a), Some(b)) => a.distance_meters(b) <= radius_meters,
            _ => false,
        }
    }
}

/// Vehicle identity (year/make/model), normalized for table lookups.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleKey {
    pub year: i32,
    pub make: String,
    pub model: String,
}

impl VehicleKey {
    pub fn new(year: i32, make: &str, model: &str) -> Self {
        Self {
            year,
            make: normalize(make),
            model: normalize(model),
        }
    }
}

impl std::fmt::Display for VehicleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.year, self.make, self.model)
    }
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Job lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobStatus {
    PendingReview,
    Queued,
    EnRoute,
    InProgress,
    PendingRevisit,
    Completed,
    Cancelled,
    FixedTime,
}

impl JobStatus {
    /// Technician is on the way or working: capacity already consumed.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::EnRoute | Self::InProgress)
    }

    /// Nothing left to schedule.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Longest job accepted in a snapshot: one full day.
pub const MAX_JOB_MINUTES: i64 = 24 * 60;

/// A schedulable unit of work.
#[derive(Clone, Debug)]
pub struct Job {
    pub id: JobId,
    pub order_id: Option<String>,
    pub address: Address,
    pub vehicle: VehicleKey,
    pub service: ServiceDetail,
    /// Soft preference, used as a tie-breaker only
    pub requested_time: Option<NaiveDateTime>,
    /// Higher = more urgent
    pub priority: i32,
    pub duration_minutes: i64,
    pub status: JobStatus,
    pub fixed_assignment: bool,
    pub fixed_schedule_time: Option<NaiveDateTime>,
    /// Current technician (input; immutable for fixed and in-flight jobs)
    pub technician_id: Option<TechnicianId>,
    /// Current start (input; used for in-flight jobs)
    pub scheduled_start: Option<NaiveDateTime>,
    /// Number of passes this job survived without being placed
    pub passes_unassigned: u32,
}

impl Job {
    pub fn new(
        id: impl Into<String>,
        address: Address,
        vehicle: VehicleKey,
        service: ServiceDetail,
        duration_minutes: i64,
    ) -> Self {
        Self {
            id: id.into(),
            order_id: None,
            address,
            vehicle,
            service,
            requested_time: None,
            priority: 5,
            duration_minutes,
            status: JobStatus::PendingReview,
            fixed_assignment: false,
            fixed_schedule_time: None,
            technician_id: None,
            scheduled_start: None,
            passes_unassigned: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_order(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn with_requested_time(mut self, at: NaiveDateTime) -> Self {
        self.requested_time = Some(at);
        self
    }

    /// Pin the job to a start time and, optionally, a technician.
    pub fn with_fixed_time(mut self, at: NaiveDateTime, technician: Option<&str>) -> Self {
        self.fixed_assignment = true;
        self.fixed_schedule_time = Some(at);
        self.technician_id = technician.map(str::to_string);
        self.status = JobStatus::FixedTime;
        self
    }

    /// Record an existing technician/start pair (e.g. for in-flight jobs).
    pub fn assigned_to(mut self, technician: &str, start: NaiveDateTime) -> Self {
        self.technician_id = Some(technician.to_string());
        self.scheduled_start = Some(start);
        self
    }

    pub fn category(&self) -> ServiceCategory {
        self.service.category()
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.duration_minutes)
    }

    /// Fixed jobs are constraints on everyone else, never decisions.
    pub fn is_fixed(&self) -> bool {
        self.fixed_assignment
    }

    /// Whether this job takes part in the pass as backlog.
    pub fn in_backlog(&self) -> bool {
        if self.status.is_closed() || self.status.is_in_flight() {
            return false;
        }
        self.fixed_assignment
            || matches!(
                self.status,
                JobStatus::PendingReview
                    | JobStatus::Queued
                    | JobStatus::PendingRevisit
                    | JobStatus::FixedTime
            )
    }
}

/// One row of a technician's weekly default hours.
#[derive(Clone, Debug, PartialEq)]
pub struct DefaultHours {
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub is_available: bool,
}

impl DefaultHours {
    pub fn new(weekday: Weekday, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            weekday,
            start,
            end,
            is_available: true,
        }
    }

    pub fn day_off(weekday: Weekday) -> Self {
        Self {
            weekday,
            start: NaiveTime::MIN,
            end: NaiveTime::MIN,
            is_available: false,
        }
    }
}

/// A dated override of a technician's default hours.
#[derive(Clone, Debug, PartialEq)]
pub struct AvailabilityException {
    pub date: NaiveDate,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
    pub is_available: bool,
    pub reason: Option<String>,
}

impl AvailabilityException {
    /// The technician is off for the whole date.
    pub fn unavailable(date: NaiveDate, reason: impl Into<String>) -> Self {
        Self {
            date,
            start: None,
            end: None,
            is_available: false,
            reason: Some(reason.into()),
        }
    }

    /// The technician works different hours on this date.
    pub fn hours(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            date,
            start: Some(start),
            end: Some(end),
            is_available: true,
            reason: None,
        }
    }
}

/// A field worker with one van and an availability calendar.
#[derive(Clone, Debug)]
pub struct Technician {
    pub id: TechnicianId,
    pub name: String,
    pub van_id: Option<VanId>,
    pub default_hours: Vec<DefaultHours>,
    pub exceptions: Vec<AvailabilityException>,
}

impl Technician {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            van_id: None,
            default_hours: Vec::new(),
            exceptions: Vec::new(),
        }
    }

    pub fn with_van(mut self, van_id: impl Into<String>) -> Self {
        self.van_id = Some(van_id.into());
        self
    }

    pub fn with_hours(mut self, hours: DefaultHours) -> Self {
        self.default_hours.push(hours);
        self
    }

    pub fn with_exception(mut self, exception: AvailabilityException) -> Self {
        self.exceptions.push(exception);
        self
    }
}

/// A typed (and for some categories, modeled) piece of equipment.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EquipmentType {
    pub category: ServiceCategory,
    pub model: Option<String>,
}

impl EquipmentType {
    pub fn new(category: ServiceCategory) -> Self {
        Self {
            category,
            model: None,
        }
    }

    pub fn with_model(category: ServiceCategory, model: &str) -> Self {
        Self {
            category,
            model: Some(normalize(model)),
        }
    }
}

impl std::fmt::Display for EquipmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.model {
            Some(model) => write!(f, "{}[{}]", self.category, model),
            None => write!(f, "{}", self.category),
        }
    }
}

/// One physical tool carried on a van.
#[derive(Clone, Debug, PartialEq)]
pub struct EquipmentInstance {
    pub id: String,
    pub equipment_type: EquipmentType,
}

/// A technician vehicle and the tools on it.
#[derive(Clone, Debug, PartialEq)]
pub struct Van {
    pub id: VanId,
    pub equipment: Vec<EquipmentInstance>,
}

impl Van {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            equipment: Vec::new(),
        }
    }

    pub fn carrying(mut self, instance_id: &str, equipment_type: EquipmentType) -> Self {
        self.equipment.push(EquipmentInstance {
            id: instance_id.to_string(),
            equipment_type,
        });
        self
    }
}

/// Equipment needed for one (service, vehicle) pair.
#[derive(Clone, Debug, PartialEq)]
pub struct EquipmentRequirement {
    pub service: ServiceCategory,
    pub vehicle: VehicleKey,
    pub required: Vec<EquipmentType>,
}

/// A scheduler decision: job placed on a technician at a time.
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub job_id: JobId,
    pub technician_id: TechnicianId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Carried over from a fixed-time input rather than computed
    pub fixed: bool,
    /// Placed next to another job at the same site
    pub batched: bool,
}

impl Assignment {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Half-open interval overlap.
    pub fn overlaps(&self, other: &Assignment) -> bool {
        self.start < other.end && other.start < self.end
    }
}
