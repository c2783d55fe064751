//! Slot allocator: earliest feasible slot per technician, ranked across
//! candidates.
//!
//! Ranking across candidate technicians:
//! 1. Batched: the slot lands on a day where the technician already has a
//!    job at the same site (adjacent slots are tried first).
//! 2. Earliest start.
//! 3. Lowest workload (booked minutes in the pass).
//! 4. Technician id.

use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;

use crate::calendar::OpenWindow;
use crate::error::{FailureReason, JobFailure};
use crate::models::{Job, Technician, TechnicianId};
use crate::{log_checks, log_debug};

use super::timeline::TechnicianTimeline;

/// A feasible placement for a job on one technician.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotOption {
    pub technician_id: TechnicianId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub batched: bool,
    pub workload_minutes: i64,
}

impl SlotOption {
    /// Ranking order; `Less` means `self` is preferred.
    fn rank(&self, other: &Self) -> Ordering {
        other
            .batched
            .cmp(&self.batched)
            .then(self.start.cmp(&other.start))
            .then(self.workload_minutes.cmp(&other.workload_minutes))
            .then(self.technician_id.cmp(&other.technician_id))
    }
}

/// Finds slots on technician timelines. Never mutates a timeline.
pub struct SlotAllocator<'a> {
    windows: &'a FxHashMap<TechnicianId, Vec<OpenWindow>>,
    granularity: i64,
    same_site_radius_meters: f64,
    verbosity: u8,
}

impl<'a> SlotAllocator<'a> {
    pub fn new(
        windows: &'a FxHashMap<TechnicianId, Vec<OpenWindow>>,
        granularity: i64,
        same_site_radius_meters: f64,
        verbosity: u8,
    ) -> Self {
        Self {
            windows,
            granularity,
            same_site_radius_meters,
            verbosity,
        }
    }

    fn windows_of(&self, technician_id: &str) -> &'a [OpenWindow] {
        self.windows
            .get(technician_id)
            .map(|w| w.as_slice())
            .unwrap_or(&[])
    }

    /// Best slot for `job` on one technician, or `None` if fully booked.
    pub fn best_slot_for(&self, job: &Job, timeline: &TechnicianTimeline) -> Option<SlotOption> {
        let duration = job.duration();
        let windows = self.windows_of(&timeline.technician_id);

        let option = |start: NaiveDateTime, batched: bool| SlotOption {
            technician_id: timeline.technician_id.clone(),
            start,
            end: start + duration,
            batched,
            workload_minutes: timeline.booked_minutes(),
        };

        let mut earliest: Option<SlotOption> = None;

        for window in windows {
            if !window.fits(job.duration_minutes) {
                continue;
            }

            let same_site: Vec<_> = timeline
                .bookings_on(window.date)
                .filter(|b| b.address.same_site(&job.address, self.same_site_radius_meters))
                .collect();

            if !same_site.is_empty() {
                // Probe slots touching a same-site booking first
                let adjacent = same_site
                    .iter()
                    .flat_map(|b| [b.end, b.start - duration])
                    .filter(|start| {
                        window.contains(*start, *start + duration)
                            && timeline.is_free(*start, *start + duration)
                    })
                    .min();

                let batched_start =
                    adjacent.or_else(|| timeline.first_fit(window, duration, self.granularity));

                if let Some(start) = batched_start {
                    log_debug!(
                        self.verbosity,
                        "    {} batched slot for {} at {}",
                        timeline.technician_id,
                        job.id,
                        start
                    );
                    return Some(option(start, true));
                }
            }

            if earliest.is_none() {
                if let Some(start) = timeline.first_fit(window, duration, self.granularity) {
                    earliest = Some(option(start, false));
                }
            }
        }

        earliest
    }

    /// Place `job` on the best candidate. Candidates come from the
    /// candidate filter, so each has a long-enough window somewhere.
    pub fn allocate(
        &self,
        job: &Job,
        candidates: &[&Technician],
        timelines: &FxHashMap<TechnicianId, TechnicianTimeline>,
    ) -> Result<SlotOption, JobFailure> {
        let mut best: Option<SlotOption> = None;

        for tech in candidates {
            let Some(timeline) = timelines.get(&tech.id) else {
                continue;
            };
            match self.best_slot_for(job, timeline) {
                Some(slot) => {
                    log_checks!(
                        self.verbosity,
                        "    {} can take {} at {} (batched={}, load={}m)",
                        tech.id,
                        job.id,
                        slot.start,
                        slot.batched,
                        slot.workload_minutes
                    );
                    if best.as_ref().map_or(true, |b| slot.rank(b) == Ordering::Less) {
                        best = Some(slot);
                    }
                }
                None => {
                    log_checks!(self.verbosity, "    {} fully booked for {}", tech.id, job.id);
                }
            }
        }

        best.ok_or_else(|| {
            JobFailure::new(
                &job.id,
                FailureReason::AllCandidatesOverbooked,
                format!(
                    "{} candidate(s) have windows but no free {}-minute slot",
                    candidates.len(),
                    job.duration_minutes
                ),
            )
        })
    }

    /// Place `job` at a fixed `start` on the best free candidate.
    ///
    /// Used for fixed-time jobs that have no technician yet: the time is
    /// immutable, only the technician is chosen.
    pub fn allocate_at(
        &self,
        job: &Job,
        start: NaiveDateTime,
        candidates: &[&Technician],
        timelines: &FxHashMap<TechnicianId, TechnicianTimeline>,
    ) -> Result<SlotOption, JobFailure> {
        let end = start + job.duration();
        let mut any_window = false;
        let mut best: Option<SlotOption> = None;

        for tech in candidates {
            let Some(timeline) = timelines.get(&tech.id) else {
                continue;
            };
            let Some(window) = self
                .windows_of(&tech.id)
                .iter()
                .find(|w| w.contains(start, end))
            else {
                continue;
            };
            any_window = true;
            if !timeline.is_free(start, end) {
                continue;
            }

            let batched = timeline
                .bookings_on(window.date)
                .any(|b| b.address.same_site(&job.address, self.same_site_radius_meters));
            let slot = SlotOption {
                technician_id: tech.id.clone(),
                start,
                end,
                batched,
                workload_minutes: timeline.booked_minutes(),
            };
            if best.as_ref().map_or(true, |b| slot.rank(b) == Ordering::Less) {
                best = Some(slot);
            }
        }

        best.ok_or_else(|| {
            if any_window {
                JobFailure::new(
                    &job.id,
                    FailureReason::AllCandidatesOverbooked,
                    format!("every equipped technician is busy at {}", start),
                )
            } else {
                JobFailure::new(
                    &job.id,
                    FailureReason::NoCapacityInHorizon,
                    format!("no equipped technician is working at {}", start),
                )
            }
        })
    }
}
