//! Candidate filter: which technicians could physically perform a job.
//!
//! A technician is a candidate iff their van covers the job's full equipment
//! requirement and they have at least one open window in the horizon long
//! enough for the job once its start is put on the slot grid. Jobs are never split across technicians.

use rustc_hash::FxHashMap;

use crate::calendar::OpenWindow;
use crate::capability::CapabilityResolver;
use crate::equipment::VanEquipmentIndex;
use crate::error::{FailureReason, JobFailure};
use crate::log_checks;
use crate::models::{Job, Technician, TechnicianId};

/// Composes the capability resolver, van index and calendar windows.
pub struct CandidateFilter<'a> {
    technicians: &'a [Technician],
    capability: &'a CapabilityResolver,
    equipment: &'a VanEquipmentIndex,
    windows: &'a FxHashMap<TechnicianId, Vec<OpenWindow>>,
    granularity: i64,
    verbosity: u8,
}

impl<'a> CandidateFilter<'a> {
    pub fn new(
        technicians: &'a [Technician],
        capability: &'a CapabilityResolver,
        equipment: &'a VanEquipmentIndex,
        windows: &'a FxHashMap<TechnicianId, Vec<OpenWindow>>,
        granularity: i64,
        verbosity: u8,
    ) -> Self {
        Self {
            technicians,
            capability,
            equipment,
            windows,
            granularity,
            verbosity,
        }
    }

    /// Technicians whose van covers the job's requirement, ignoring time.
    pub fn equipped_for(&self, job: &Job) -> Result<Vec<&'a Technician>, JobFailure> {
        let required = self
            .capability
            .required_equipment(job.category(), &job.vehicle)
            .map_err(|e| JobFailure::new(&job.id, FailureReason::UnknownRequirement, e.to_string()))?;

        let equipped: Vec<&'a Technician> = self
            .technicians
            .iter()
            .filter(|tech| {
                let ok = self.equipment.has_van(&tech.id)
                    && self.equipment.equipment_of(&tech.id).covers(required);
                if !ok {
                    log_checks!(
                        self.verbosity,
                        "    {} lacks equipment for {}",
                        tech.id,
                        job.id
                    );
                }
                ok
            })
            .collect();

        if equipped.is_empty() {
            let needed = required
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(JobFailure::new(
                &job.id,
                FailureReason::InsufficientEquipmentCoverage,
                format!("no single van carries [{}]", needed),
            ));
        }

        Ok(equipped)
    }

    /// Equipped technicians with at least one window that fits the job.
    pub fn candidates_for(&self, job: &Job) -> Result<Vec<&'a Technician>, JobFailure> {
        let equipped = self.equipped_for(job)?;

        let candidates: Vec<&'a Technician> = equipped
            .into_iter()
            .filter(|tech| {
                let fits = self
                    .windows_of(&tech.id)
                    .iter()
                    .any(|w| w.fits_on_grid(job.duration_minutes, self.granularity));
                if !fits {
                    log_checks!(
                        self.verbosity,
                        "    {} has no {}-minute window for {}",
                        tech.id,
                        job.duration_minutes,
                        job.id
                    );
                }
                fits
            })
            .collect();

        if candidates.is_empty() {
            return Err(JobFailure::new(
                &job.id,
                FailureReason::NoCapacityInHorizon,
                format!(
                    "no equipped technician has a {}-minute window in the horizon",
                    job.duration_minutes
                ),
            ));
        }

        Ok(candidates)
    }

    pub fn windows_of(&self, technician_id: &str) -> &'a [OpenWindow] {
        self.windows
            .get(technician_id)
            .map(|w| w.as_slice())
            .unwrap_or(&[])
    }
}
