//! Pass orchestrator: drives one end-to-end optimization pass.

use rustc_hash::FxHashMap;
use std::collections::HashMap;

use crate::calendar::{AvailabilityCalendar, OpenWindow};
use crate::candidates::CandidateFilter;
use crate::capability::CapabilityResolver;
use crate::config::DispatchConfig;
use crate::conflicts::{order_backlog, place_pinned};
use crate::equipment::VanEquipmentIndex;
use crate::error::{DispatchError, JobFailure, PassWarning};
use crate::models::{Assignment, Job, TechnicianId};
use crate::snapshot::{OptimizeRequest, Snapshot, SnapshotSource};
use crate::validation::validate_snapshot;
use crate::{log_changes, log_checks, log_warn};

use super::allocator::{SlotAllocator, SlotOption};
use super::state::{PassResult, PassState};
use super::timeline::{Booking, BookingKind, TechnicianTimeline};

/// Runs one optimization pass over its own snapshot.
///
/// The pass owns every timeline it builds; nothing is shared with other
/// passes, so concurrent passes never interfere.
pub struct DispatchScheduler {
    config: DispatchConfig,
    request: OptimizeRequest,
    state: PassState,
}

impl DispatchScheduler {
    pub fn new(config: DispatchConfig, request: OptimizeRequest) -> Self {
        Self {
            config,
            request,
            state: PassState::Idle,
        }
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    fn advance(&mut self, next: PassState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal pass transition {} -> {}",
            self.state,
            next
        );
        log_changes!(self.config.verbosity, "Pass: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Enter `Loading`, returning to `Idle` first if a previous pass on this
    /// scheduler already finished.
    fn begin(&mut self) {
        if self.state.is_terminal() {
            self.advance(PassState::Idle);
        }
        self.advance(PassState::Loading);
    }

    /// Load a snapshot from `source` and run the pass.
    ///
    /// Either the whole result set is returned or the pass fails with no
    /// assignments proposed.
    pub fn run<S: SnapshotSource + ?Sized>(&mut self, source: &S) -> Result<PassResult, DispatchError> {
        self.begin();

        let snapshot = match source.load(&self.request.horizon) {
            Ok(s) => s,
            Err(e) => {
                self.advance(PassState::Failed);
                return Err(e.into());
            }
        };

        self.schedule(&snapshot)
    }

    /// Run the pass on an already-loaded snapshot.
    pub fn schedule(&mut self, snapshot: &Snapshot) -> Result<PassResult, DispatchError> {
        if self.state != PassState::Loading {
            self.begin();
        }

        if let Err(issues) = validate_snapshot(snapshot, &self.request.horizon) {
            for issue in &issues {
                log_warn!(self.config.verbosity, "Snapshot rejected: {}", issue);
            }
            self.advance(PassState::Failed);
            return Err(DispatchError::InvalidSnapshot(issues));
        }

        let verbosity = self.config.verbosity;
        let horizon = self.request.horizon;

        // Reference tables for the pass
        let capability = CapabilityResolver::new(&snapshot.requirements);
        let equipment = VanEquipmentIndex::new(&snapshot.technicians, &snapshot.vans);
        let calendar = AvailabilityCalendar::new(self.request.now, verbosity);

        let mut windows: FxHashMap<TechnicianId, Vec<OpenWindow>> = FxHashMap::default();
        let mut timelines: FxHashMap<TechnicianId, TechnicianTimeline> = FxHashMap::default();
        for tech in &snapshot.technicians {
            windows.insert(tech.id.clone(), calendar.open_windows(tech, &horizon));
            timelines.insert(tech.id.clone(), TechnicianTimeline::new(tech.id.clone()));
        }

        let mut warnings = self.block_in_flight(snapshot, &mut timelines);

        self.advance(PassState::Ordering);

        let backlog: Vec<&Job> = snapshot.jobs.iter().filter(|j| j.in_backlog()).collect();
        let ordered = order_backlog(&backlog, self.config.aging_boost_per_pass);
        log_changes!(
            verbosity,
            "  Backlog: {} pinned, {} fixed without technician, {} flexible",
            ordered.pinned.len(),
            ordered.fixed_unassigned.len(),
            ordered.flexible.len()
        );

        let pinned = place_pinned(&ordered.pinned, &mut timelines, verbosity);
        let mut assignments: Vec<Assignment> = pinned.assignments;
        let mut failures: Vec<JobFailure> = pinned.failures;
        warnings.extend(pinned.warnings);

        self.advance(PassState::Allocating);

        let filter = CandidateFilter::new(
            &snapshot.technicians,
            &capability,
            &equipment,
            &windows,
            self.config.granularity(),
            verbosity,
        );
        let allocator = SlotAllocator::new(
            &windows,
            self.config.granularity(),
            self.config.same_site_radius_meters,
            verbosity,
        );

        // Fixed times are immutable: only the technician is chosen
        for job in &ordered.fixed_unassigned {
            let Some(start) = job.fixed_schedule_time else {
                continue;
            };
            log_checks!(verbosity, "  Considering fixed job {} at {}", job.id, start);
            let outcome = filter
                .equipped_for(job)
                .and_then(|techs| allocator.allocate_at(job, start, &techs, &timelines));
            match outcome {
                Ok(slot) => {
                    assignments.push(commit(job, slot, true, &mut timelines, verbosity));
                }
                Err(failure) => record_failure(failure, &mut failures, verbosity),
            }
        }

        for job in &ordered.flexible {
            log_checks!(
                verbosity,
                "  Considering job {} (priority={}, waited={} passes)",
                job.id,
                job.priority,
                job.passes_unassigned
            );
            let outcome = filter
                .candidates_for(job)
                .and_then(|techs| allocator.allocate(job, &techs, &timelines));
            match outcome {
                Ok(slot) => {
                    assignments.push(commit(job, slot, false, &mut timelines, verbosity));
                }
                Err(failure) => record_failure(failure, &mut failures, verbosity),
            }
        }

        let mut metadata = HashMap::new();
        metadata.insert("jobs_considered".to_string(), ordered.len().to_string());
        metadata.insert("assigned".to_string(), assignments.len().to_string());
        metadata.insert("failed".to_string(), failures.len().to_string());
        metadata.insert(
            "technicians".to_string(),
            snapshot.technicians.len().to_string(),
        );
        metadata.insert("horizon_start".to_string(), horizon.start.to_string());
        metadata.insert("horizon_end".to_string(), horizon.last_date().to_string());
        metadata.insert("horizon_days".to_string(), horizon.days.to_string());

        self.advance(PassState::Committed);

        Ok(PassResult {
            assignments,
            failures,
            warnings,
            metadata,
            final_state: self.state,
        })
    }

    /// Block en-route and in-progress jobs onto their technician's timeline.
    fn block_in_flight(
        &self,
        snapshot: &Snapshot,
        timelines: &mut FxHashMap<TechnicianId, TechnicianTimeline>,
    ) -> Vec<PassWarning> {
        let mut warnings = Vec::new();

        for job in snapshot.jobs.iter().filter(|j| j.status.is_in_flight()) {
            let placed = job
                .technician_id
                .as_ref()
                .zip(job.scheduled_start)
                .and_then(|(tech, start)| Some((timelines.get_mut(tech)?, start)));

            match placed {
                Some((timeline, start)) => {
                    log_checks!(
                        self.config.verbosity,
                        "  In-flight job {} holds {} from {}",
                        job.id,
                        timeline.technician_id,
                        start
                    );
                    timeline.book(Booking {
                        job_id: job.id.clone(),
                        start,
                        end: start + job.duration(),
                        address: job.address.clone(),
                        kind: BookingKind::InFlight,
                    });
                }
                None => {
                    let warning = PassWarning::InFlightWithoutPlacement {
                        job_id: job.id.clone(),
                    };
                    log_warn!(self.config.verbosity, "{}", warning);
                    warnings.push(warning);
                }
            }
        }

        warnings
    }
}

/// Book a chosen slot on its timeline and turn it into an assignment.
fn commit(
    job: &Job,
    slot: SlotOption,
    fixed: bool,
    timelines: &mut FxHashMap<TechnicianId, TechnicianTimeline>,
    verbosity: u8,
) -> Assignment {
    if let Some(timeline) = timelines.get_mut(&slot.technician_id) {
        timeline.book(Booking {
            job_id: job.id.clone(),
            start: slot.start,
            end: slot.end,
            address: job.address.clone(),
            kind: if fixed {
                BookingKind::Fixed
            } else {
                BookingKind::Allocated
            },
        });
    }
    log_changes!(
        verbosity,
        "  Assigned {} to {} from {} to {}{}",
        job.id,
        slot.technician_id,
        slot.start,
        slot.end,
        if slot.batched { " (batched)" } else { "" }
    );
    Assignment {
        job_id: job.id.clone(),
        technician_id: slot.technician_id,
        start: slot.start,
        end: slot.end,
        fixed,
        batched: slot.batched,
    }
}

fn record_failure(failure: JobFailure, failures: &mut Vec<JobFailure>, verbosity: u8) {
    log_changes!(
        verbosity,
        "  Could not place {}: {} ({})",
        failure.job_id,
        failure.reason,
        failure.detail
    );
    failures.push(failure);
}
