//! Caller-side bookkeeping for the anti-starvation rule.
//!
//! The engine keeps no state between passes, so how long a job has waited is
//! input data (`Job::passes_unassigned`). `AgingLedger` lets a caller carry
//! that count from one pass result into the next snapshot.

use rustc_hash::FxHashMap;

use crate::models::{Job, JobId};
use crate::scheduler::PassResult;

#[derive(Clone, Debug, Default)]
pub struct AgingLedger {
    waited: FxHashMap<JobId, u32>,
}

impl AgingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more pass for every failed job; forget placed jobs.
    pub fn record(&mut self, result: &PassResult) {
        for failure in &result.failures {
            *self.waited.entry(failure.job_id.clone()).or_insert(0) += 1;
        }
        for assignment in &result.assignments {
            self.waited.remove(&assignment.job_id);
        }
    }

    /// Passes `job_id` has survived unassigned so far.
    pub fn passes_waited(&self, job_id: &str) -> u32 {
        self.waited.get(job_id).copied().unwrap_or(0)
    }

    /// Write the counts onto the jobs of the next snapshot.
    pub fn apply(&self, jobs: &mut [Job]) {
        for job in jobs {
            job.passes_unassigned = self.passes_waited(&job.id);
        }
    }
}
