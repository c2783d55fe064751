//! Trigger surface: synchronous optimize requests and a health check.

use chrono::NaiveDateTime;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::scheduler::{DispatchScheduler, PassResult};
use crate::snapshot::{Horizon, OptimizeRequest, SnapshotSource};

/// Failed passes in a row after which the engine reports itself unhealthy.
pub const UNHEALTHY_AFTER_FAILURES: u64 = 3;

/// Liveness report. Built from counters only, independent of backlog size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HealthStatus {
    /// False once the last `UNHEALTHY_AFTER_FAILURES` passes all failed
    pub healthy: bool,
    pub passes_started: u64,
    pub passes_committed: u64,
    pub passes_failed: u64,
    pub passes_in_flight: u64,
    pub consecutive_failures: u64,
}

/// Dispatch engine bound to a snapshot source.
///
/// `optimize` may be called from several threads at once; each call builds
/// its own pass from its own snapshot and only the counters are shared.
pub struct DispatchEngine<S> {
    source: S,
    config: DispatchConfig,
    passes_started: AtomicU64,
    passes_committed: AtomicU64,
    passes_failed: AtomicU64,
    consecutive_failures: AtomicU64,
}

impl<S: SnapshotSource> DispatchEngine<S> {
    pub fn new(source: S, config: DispatchConfig) -> Self {
        Self {
            source,
            config,
            passes_started: AtomicU64::new(0),
            passes_committed: AtomicU64::new(0),
            passes_failed: AtomicU64::new(0),
            consecutive_failures: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Optimize the schedule for the request's horizon.
    pub fn optimize(&self, request: &OptimizeRequest) -> Result<PassResult, DispatchError> {
        self.passes_started.fetch_add(1, Ordering::Relaxed);

        let mut scheduler = DispatchScheduler::new(self.config.clone(), *request);
        let outcome = scheduler.run(&self.source);

        match &outcome {
            Ok(_) => {
                self.passes_committed.fetch_add(1, Ordering::Relaxed);
                self.consecutive_failures.store(0, Ordering::Relaxed);
            }
            Err(_) => {
                self.passes_failed.fetch_add(1, Ordering::Relaxed);
                self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
            }
        }

        outcome
    }

    /// Optimize from `now` over the configured default horizon.
    pub fn optimize_from(&self, now: NaiveDateTime) -> Result<PassResult, DispatchError> {
        let horizon = Horizon::from_config(now.date(), &self.config);
        self.optimize(&OptimizeRequest::new(horizon, now))
    }

    /// O(1) liveness check.
    pub fn health(&self) -> HealthStatus {
        let started = self.passes_started.load(Ordering::Relaxed);
        let committed = self.passes_committed.load(Ordering::Relaxed);
        let failed = self.passes_failed.load(Ordering::Relaxed);
        let consecutive_failures = self.consecutive_failures.load(Ordering::Relaxed);
        HealthStatus {
            healthy: consecutive_failures < UNHEALTHY_AFTER_FAILURES,
            passes_started: started,
            passes_committed: committed,
            passes_failed: failed,
            passes_in_flight: started.saturating_sub(committed + failed),
            consecutive_failures,
        }
    }
}
