//! Priority and conflict resolution for one pass.
//!
//! Splits the backlog into fixed and flexible jobs, places fixed jobs that
//! already name a technician onto timelines before any decision is made, and
//! reports overlapping fixed commitments as data-integrity collisions.

use rustc_hash::FxHashMap;

use crate::error::{FailureReason, JobFailure, PassWarning};
use crate::{log_changes, log_warn};
use crate::models::{Assignment, Job, TechnicianId};
use crate::scheduler::{Booking, BookingKind, TechnicianTimeline};
use crate::sorting::sort_jobs;

/// The backlog split into processing groups, each already in order.
#[derive(Debug, Default)]
pub struct OrderedBacklog<'a> {
    /// Fixed jobs with a technician, by (start, id)
    pub pinned: Vec<&'a Job>,
    /// Fixed jobs whose technician the engine must pick, by (start, id)
    pub fixed_unassigned: Vec<&'a Job>,
    /// Flexible jobs, most urgent first
    pub flexible: Vec<&'a Job>,
}

impl<'a> OrderedBacklog<'a> {
    pub fn len(&self) -> usize {
        self.pinned.len() + self.fixed_unassigned.len() + self.flexible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition and order the backlog.
///
/// Fixed jobs are constraints, so they are ordered only for deterministic
/// collision reporting; flexible jobs use the aging-aware sort key.
pub fn order_backlog<'a>(backlog: &[&'a Job], aging_boost_per_pass: i64) -> OrderedBacklog<'a> {
    let (mut fixed, flexible): (Vec<&'a Job>, Vec<&'a Job>) =
        backlog.iter().copied().partition(|job| job.is_fixed());

    fixed.sort_by(|a, b| {
        a.fixed_schedule_time
            .cmp(&b.fixed_schedule_time)
            .then(a.id.cmp(&b.id))
    });

    let (pinned, fixed_unassigned): (Vec<&'a Job>, Vec<&'a Job>) = fixed
        .into_iter()
        .partition(|job| job.technician_id.is_some());

    OrderedBacklog {
        pinned,
        fixed_unassigned,
        flexible: sort_jobs(&flexible, aging_boost_per_pass),
    }
}

/// Outcome of placing pinned fixed jobs.
#[derive(Debug, Default)]
pub struct FixedPlacement {
    pub assignments: Vec<Assignment>,
    pub failures: Vec<JobFailure>,
    pub warnings: Vec<PassWarning>,
}

/// Place pinned fixed jobs unconditionally, in (start, id) order.
///
/// A job that overlaps something already on its technician's timeline is a
/// collision: the earlier commitment keeps the slot and the later job is
/// reported, never moved.
pub fn place_pinned(
    pinned: &[&Job],
    timelines: &mut FxHashMap<TechnicianId, TechnicianTimeline>,
    verbosity: u8,
) -> FixedPlacement {
    let mut placement = FixedPlacement::default();

    for job in pinned {
        let (Some(technician_id), Some(start)) = (&job.technician_id, job.fixed_schedule_time)
        else {
            continue;
        };
        let end = start + job.duration();

        let timeline = timelines
            .entry(technician_id.clone())
            .or_insert_with(|| TechnicianTimeline::new(technician_id.clone()));

        if let Some(existing) = timeline.overlapping_booking(start, end) {
            // In-flight work keeps its slot like an earlier fixed job
            let holder = match existing.kind {
                BookingKind::InFlight => "in-flight job",
                BookingKind::Fixed | BookingKind::Allocated => "fixed job",
            };
            log_warn!(
                verbosity,
                "Fixed-time collision on {}: {} overlaps {} {}",
                technician_id,
                job.id,
                holder,
                existing.job_id
            );
            placement.warnings.push(PassWarning::FixedTimeCollision {
                technician_id: technician_id.clone(),
                kept_job: existing.job_id.clone(),
                rejected_job: job.id.clone(),
            });
            placement.failures.push(JobFailure::new(
                &job.id,
                FailureReason::FixedTimeCollision,
                format!(
                    "overlaps {} {} on {} at {}",
                    holder, existing.job_id, technician_id, start
                ),
            ));
            continue;
        }

        timeline.book(Booking {
            job_id: job.id.clone(),
            start,
            end,
            address: job.address.clone(),
            kind: BookingKind::Fixed,
        });
        log_changes!(
            verbosity,
            "  Fixed job {} on {} from {} to {}",
            job.id,
            technician_id,
            start,
            end
        );
        placement.assignments.push(Assignment {
            job_id: job.id.clone(),
            technician_id: technician_id.clone(),
            start,
            end,
            fixed: true,
            batched: false,
        });
    }

    placement
}
