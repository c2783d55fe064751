//! Per-technician timeline with sorted, non-overlapping busy periods.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::calendar::{round_up_to_grid, OpenWindow};
use crate::models::{Address, JobId, TechnicianId};

/// Why a block of time on a timeline is taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BookingKind {
    /// Fixed-time job placed before any decision
    Fixed,
    /// En-route or in-progress job: capacity already consumed
    InFlight,
    /// Placed by this pass
    Allocated,
}

/// A job occupying [start, end) on a technician's timeline.
#[derive(Clone, Debug)]
pub struct Booking {
    pub job_id: JobId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub address: Address,
    pub kind: BookingKind,
}

/// Tracks busy periods for one technician within a pass.
///
/// Maintains the invariant that busy_periods is always sorted by start and
/// contains no overlapping periods (touching periods are merged). Intervals
/// are half-open, so a job ending at 10:00 and one starting at 10:00 do not
/// overlap.
#[derive(Clone, Debug)]
pub struct TechnicianTimeline {
    pub technician_id: TechnicianId,
    /// Sorted list of [start, end) busy periods
    pub busy_periods: Vec<(NaiveDateTime, NaiveDateTime)>,
    bookings: Vec<Booking>,
    booked_minutes: i64,
}

impl TechnicianTimeline {
    pub fn new(technician_id: impl Into<String>) -> Self {
        Self {
            technician_id: technician_id.into(),
            busy_periods: Vec::new(),
            bookings: Vec::new(),
            booked_minutes: 0,
        }
    }

    /// Add a busy period, merging with existing periods if they overlap or touch.
    pub fn add_busy_period(&mut self, start: NaiveDateTime, end: NaiveDateTime) {
        if end <= start {
            return;
        }

        // Find insertion point using binary search
        let idx = self.busy_periods.partition_point(|(s, _)| *s < start);

        let mut new_start = start;
        let mut new_end = end;
        let mut merge_start = idx;
        let mut merge_end = idx;

        // Merge with previous period if overlapping or touching
        if idx > 0 {
            let (prev_start, prev_end) = self.busy_periods[idx - 1];
            if prev_end >= start {
                new_start = prev_start;
                new_end = new_end.max(prev_end);
                merge_start = idx - 1;
            }
        }

        // Merge with subsequent periods if overlapping or touching
        while merge_end < self.busy_periods.len() {
            let (next_start, next_end) = self.busy_periods[merge_end];
            if next_start <= new_end {
                new_end = new_end.max(next_end);
                merge_end += 1;
            } else {
                break;
            }
        }

        if merge_start < merge_end {
            self.busy_periods.drain(merge_start..merge_end);
        }
        self.busy_periods.insert(merge_start, (new_start, new_end));
    }

    /// Record a booking and mark its interval busy.
    pub fn book(&mut self, booking: Booking) {
        self.add_busy_period(booking.start, booking.end);
        self.booked_minutes += (booking.end - booking.start).num_minutes();
        let idx = self.bookings.partition_point(|b| b.start <= booking.start);
        self.bookings.insert(idx, booking);
    }

    /// Find the busy period that contains `at` or is the next one after it.
    fn find_next_busy_period(&self, at: NaiveDateTime) -> Option<(NaiveDateTime, NaiveDateTime)> {
        // Leftmost period whose (exclusive) end is after `at`
        let idx = self.busy_periods.partition_point(|(_, end)| *end <= at);
        self.busy_periods.get(idx).copied()
    }

    /// Whether [start, end) is free of every busy period.
    pub fn is_free(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        match self.find_next_busy_period(start) {
            None => true,
            Some((busy_start, _)) => busy_start >= end,
        }
    }

    /// The booking that overlaps [start, end), if any.
    pub fn overlapping_booking(&self, start: NaiveDateTime, end: NaiveDateTime) -> Option<&Booking> {
        self.bookings
            .iter()
            .find(|b| b.start < end && start < b.end)
    }

    /// Earliest start inside `window` where `duration` fits, on the
    /// `granularity`-minute grid.
    pub fn first_fit(
        &self,
        window: &OpenWindow,
        duration: Duration,
        granularity: i64,
    ) -> Option<NaiveDateTime> {
        let mut candidate = round_up_to_grid(window.start, granularity)?;

        loop {
            let end = candidate + duration;
            if end > window.end {
                return None;
            }
            match self.find_next_busy_period(candidate) {
                Some((busy_start, busy_end)) if busy_start < end => {
                    // Blocked: jump past the busy period
                    candidate = round_up_to_grid(busy_end, granularity)?;
                }
                _ => return Some(candidate),
            }
        }
    }

    /// Bookings whose start falls on `date`, in start order.
    pub fn bookings_on(&self, date: NaiveDate) -> impl Iterator<Item = &Booking> {
        self.bookings.iter().filter(move |b| b.start.date() == date)
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    /// Total minutes booked on this timeline in the pass (workload).
    pub fn booked_minutes(&self) -> i64 {
        self.booked_minutes
    }
}
