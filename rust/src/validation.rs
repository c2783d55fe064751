//! Structural validation of a snapshot before a pass.
//!
//! Any issue found here is pass-fatal. All issues are collected so the caller
//! can fix the data in one go.

use chrono::Weekday;
use rustc_hash::FxHashSet;

use crate::error::ValidationIssue;
use crate::models::MAX_JOB_MINUTES;
use crate::snapshot::{Horizon, Snapshot};

/// Validate `snapshot` for a pass over `horizon`.
pub fn validate_snapshot(snapshot: &Snapshot, horizon: &Horizon) -> Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    if horizon.days == 0 {
        issues.push(ValidationIssue::new("horizon", "must cover at least one day"));
    }

    let mut van_ids = FxHashSet::default();
    for van in &snapshot.vans {
        if !van_ids.insert(van.id.as_str()) {
            issues.push(ValidationIssue::new(format!("van {}", van.id), "duplicate id"));
        }
    }

    let mut tech_ids = FxHashSet::default();
    for tech in &snapshot.technicians {
        let entity = format!("technician {}", tech.id);
        if tech.id.trim().is_empty() {
            issues.push(ValidationIssue::new(&entity, "empty id"));
        }
        if !tech_ids.insert(tech.id.as_str()) {
            issues.push(ValidationIssue::new(&entity, "duplicate id"));
        }
        if let Some(van_id) = &tech.van_id {
            if !van_ids.contains(van_id.as_str()) {
                issues.push(ValidationIssue::new(
                    &entity,
                    format!("references unknown van {}", van_id),
                ));
            }
        }

        let mut weekdays: FxHashSet<Weekday> = FxHashSet::default();
        for row in &tech.default_hours {
            if !weekdays.insert(row.weekday) {
                issues.push(ValidationIssue::new(
                    &entity,
                    format!("duplicate default hours for {}", row.weekday),
                ));
            }
            if row.is_available && row.end <= row.start {
                issues.push(ValidationIssue::new(
                    &entity,
                    format!("default hours for {} end before they start", row.weekday),
                ));
            }
        }

        for exception in &tech.exceptions {
            if let (Some(start), Some(end)) = (exception.start, exception.end) {
                if exception.is_available && end <= start {
                    issues.push(ValidationIssue::new(
                        &entity,
                        format!("exception on {} ends before it starts", exception.date),
                    ));
                }
            }
        }
    }

    let mut job_ids = FxHashSet::default();
    for job in &snapshot.jobs {
        let entity = format!("job {}", job.id);
        if !job_ids.insert(job.id.as_str()) {
            issues.push(ValidationIssue::new(&entity, "duplicate id"));
        }
        if job.duration_minutes <= 0 || job.duration_minutes > MAX_JOB_MINUTES {
            issues.push(ValidationIssue::new(
                &entity,
                format!(
                    "duration must be within 1..={} minutes, got {}",
                    MAX_JOB_MINUTES, job.duration_minutes
                ),
            ));
        }
        if let Err(msg) = job.service.validate() {
            issues.push(ValidationIssue::new(&entity, msg));
        }
        if job.fixed_assignment && job.fixed_schedule_time.is_none() {
            issues.push(ValidationIssue::new(
                &entity,
                "fixed assignment without fixed_schedule_time",
            ));
        }
        let pins_technician = job.fixed_assignment || job.status.is_in_flight();
        if let Some(tech_id) = &job.technician_id {
            if pins_technician && !tech_ids.contains(tech_id.as_str()) {
                issues.push(ValidationIssue::new(
                    &entity,
                    format!("references unknown technician {}", tech_id),
                ));
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}
