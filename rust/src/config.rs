//! Configuration types for the dispatch engine.

/// Tuning knobs for one optimization pass.
#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug
    pub verbosity: u8,
    /// Effective priority gained for every pass a job survived unassigned
    pub aging_boost_per_pass: i64,
    /// Computed start times are rounded up to this many minutes (1 = no rounding)
    pub slot_granularity_minutes: u32,
    /// Two geocoded addresses closer than this are treated as one site
    pub same_site_radius_meters: f64,
    /// Horizon length used when the caller does not pick one
    pub default_horizon_days: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            aging_boost_per_pass: 2,
            slot_granularity_minutes: 15,
            same_site_radius_meters: 75.0,
            default_horizon_days: 7,
        }
    }
}

impl DispatchConfig {
    /// Builder-style verbosity override.
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Builder-style aging override.
    pub fn with_aging_boost(mut self, boost: i64) -> Self {
        self.aging_boost_per_pass = boost;
        self
    }

    /// Builder-style granularity override. Zero is treated as one minute.
    pub fn with_slot_granularity(mut self, minutes: u32) -> Self {
        self.slot_granularity_minutes = minutes.max(1);
        self
    }

    /// Granularity clamped to at least one minute.
    pub(crate) fn granularity(&self) -> i64 {
        i64::from(self.slot_granularity_minutes.max(1))
    }
}
