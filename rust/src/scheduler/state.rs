//! Pass state machine and the result a pass returns.

use rustc_hash::FxHashMap;
use std::collections::HashMap;

use crate::error::{FailureReason, JobFailure, PassWarning};
use crate::models::Assignment;

/// Lifecycle of one optimization pass.
///
/// `Idle -> Loading -> Ordering -> Allocating -> Committed`, with `Failed`
/// reachable from any non-terminal state. A terminal state may return to
/// `Idle` to start the next pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassState {
    Idle,
    Loading,
    Ordering,
    Allocating,
    Committed,
    Failed,
}

impl PassState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Failed)
    }

    /// Whether moving to `next` is a legal transition.
    pub fn can_advance_to(&self, next: PassState) -> bool {
        match (self, next) {
            (Self::Idle, Self::Loading)
            | (Self::Loading, Self::Ordering)
            | (Self::Ordering, Self::Allocating)
            | (Self::Allocating, Self::Committed)
            | (Self::Committed, Self::Idle)
            | (Self::Failed, Self::Idle) => true,
            (from, Self::Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for PassState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ordering => "ordering",
            Self::Allocating => "allocating",
            Self::Committed => "committed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Full result set of a committed pass.
///
/// Every backlog job appears exactly once, either in `assignments` or in
/// `failures`.
#[derive(Clone, Debug)]
pub struct PassResult {
    pub assignments: Vec<Assignment>,
    pub failures: Vec<JobFailure>,
    pub warnings: Vec<PassWarning>,
    pub metadata: HashMap<String, String>,
    pub final_state: PassState,
}

impl PassResult {
    pub fn assignment_for(&self, job_id: &str) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.job_id == job_id)
    }

    pub fn failure_for(&self, job_id: &str) -> Option<&JobFailure> {
        self.failures.iter().find(|f| f.job_id == job_id)
    }

    /// Failed job ids grouped by reason.
    pub fn failures_by_reason(&self) -> FxHashMap<FailureReason, Vec<String>> {
        let mut grouped: FxHashMap<FailureReason, Vec<String>> = FxHashMap::default();
        for failure in &self.failures {
            grouped
                .entry(failure.reason)
                .or_default()
                .push(failure.job_id.clone());
        }
        grouped
    }

    /// Assignments of one technician, by start time.
    pub fn assignments_of(&self, technician_id: &str) -> Vec<&Assignment> {
        let mut mine: Vec<&Assignment> = self
            .assignments
            .iter()
            .filter(|a| a.technician_id == technician_id)
            .collect();
        mine.sort_by_key(|a| a.start);
        mine
    }

    pub fn len(&self) -> usize {
        self.assignments.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
