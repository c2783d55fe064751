//! Backlog ordering for flexible jobs.
//!
//! Sort order (most urgent first):
//! 1. Effective priority, descending. Effective priority is the job's own
//!    priority plus an aging boost for every pass it survived unassigned, so
//!    a job that keeps losing eventually outranks any fresh arrival.
//! 2. Raw priority, descending.
//! 3. Requested time, earliest first; jobs without one go last.
//! 4. Job id, for determinism.

use chrono::NaiveDateTime;
use std::cmp::Ordering;

use crate::models::Job;

/// Priority after aging. Saturates instead of overflowing.
pub fn effective_priority(priority: i32, passes_unassigned: u32, boost_per_pass: i64) -> i64 {
    i64::from(priority).saturating_add(boost_per_pass.max(1).saturating_mul(i64::from(passes_unassigned)))
}

/// Sort key for one flexible job. Lower = more urgent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub effective_priority: i64,
    pub priority: i32,
    pub requested_time: Option<NaiveDateTime>,
    pub job_id: String,
}

impl SortKey {
    pub fn for_job(job: &Job, boost_per_pass: i64) -> Self {
        Self {
            effective_priority: effective_priority(job.priority, job.passes_unassigned, boost_per_pass),
            priority: job.priority,
            requested_time: job.requested_time,
            job_id: job.id.clone(),
        }
    }
}

/// Earliest requested time first, missing last.
fn cmp_requested(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .effective_priority
            .cmp(&self.effective_priority)
            .then(other.priority.cmp(&self.priority))
            .then(cmp_requested(self.requested_time, other.requested_time))
            .then(self.job_id.cmp(&other.job_id))
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort jobs into processing order (most urgent first).
pub fn sort_jobs<'a>(jobs: &[&'a Job], boost_per_pass: i64) -> Vec<&'a Job> {
    let mut keyed: Vec<(SortKey, &'a Job)> = jobs
        .iter()
        .map(|job| (SortKey::for_job(job, boost_per_pass), *job))
        .collect();

    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    keyed.into_iter().map(|(_, job)| job).collect()
}
