//! Availability calendar: weekly default hours overridden by dated exceptions.
//!
//! Precedence for a date:
//! 1. The exception for that date, if any, fully replaces the default row.
//!    A partial override (only start or only end) borrows the missing bound
//!    from the default row; with no usable default row the day is closed.
//! 2. Otherwise the default row for the weekday applies.
//! 3. No default row for the weekday means the day is closed.
//!
//! Windows are never returned in the past relative to the evaluation instant.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::log_debug;
use crate::models::{AvailabilityException, DefaultHours, Technician};
use crate::snapshot::Horizon;

/// An open block of time on one date: [start, end).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpenWindow {
    pub date: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl OpenWindow {
    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Whether the window is long enough for a job of this length.
    pub fn fits(&self, duration_minutes: i64) -> bool {
        self.minutes() >= duration_minutes
    }

    /// First start inside the window on the `granularity`-minute grid.
    pub fn first_start(&self, granularity: i64) -> Option<NaiveDateTime> {
        round_up_to_grid(self.start, granularity).filter(|start| *start < self.end)
    }

    /// Whether a job of this length fits once its start is put on the grid.
    ///
    /// A window clipped to `now` (say 16:01-17:00) can be 59 minutes long
    /// and still have no room for 55 minutes starting at 16:15.
    pub fn fits_on_grid(&self, duration_minutes: i64, granularity: i64) -> bool {
        self.first_start(granularity)
            .map_or(false, |start| (self.end - start).num_minutes() >= duration_minutes)
    }

    /// Whether [start, end) lies entirely inside the window.
    pub fn contains(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        start >= self.start && end <= self.end
    }
}

/// Expands technician calendars into open windows as of an instant.
#[derive(Clone, Copy, Debug)]
pub struct AvailabilityCalendar {
    now: NaiveDateTime,
    verbosity: u8,
}

impl AvailabilityCalendar {
    pub fn new(now: NaiveDateTime, verbosity: u8) -> Self {
        Self { now, verbosity }
    }

    /// Open windows for `technician` across `horizon`, in chronological order.
    pub fn open_windows(&self, technician: &Technician, horizon: &Horizon) -> Vec<OpenWindow> {
        let mut windows = Vec::new();

        for date in horizon.dates() {
            if date < self.now.date() {
                continue;
            }

            let Some((start, end)) = working_hours(technician, date) else {
                log_debug!(self.verbosity, "    {} closed on {}", technician.id, date);
                continue;
            };

            let mut window_start = date.and_time(start);
            let window_end = date.and_time(end);
            if window_start < self.now {
                window_start = self.now;
            }
            if window_end <= window_start {
                continue;
            }

            log_debug!(
                self.verbosity,
                "    {} open {} {}-{}",
                technician.id,
                date,
                window_start.time(),
                end
            );
            windows.push(OpenWindow {
                date,
                start: window_start,
                end: window_end,
            });
        }

        windows
    }
}

/// Working hours for one date after applying exceptions, or `None` if closed.
pub fn working_hours(technician: &Technician, date: NaiveDate) -> Option<(NaiveTime, NaiveTime)> {
    let default = default_row(technician, date);

    if let Some(exception) = exception_for(technician, date) {
        if !exception.is_available {
            return None;
        }
        let start = exception.start.or_else(|| default.map(|d| d.start))?;
        let end = exception.end.or_else(|| default.map(|d| d.end))?;
        return (start < end).then_some((start, end));
    }

    let row = default?;
    (row.start < row.end).then_some((row.start, row.end))
}

/// Usable default row for the date's weekday.
fn default_row(technician: &Technician, date: NaiveDate) -> Option<&DefaultHours> {
    technician
        .default_hours
        .iter()
        .find(|h| h.weekday == date.weekday() && h.is_available)
}

/// The exception in force for a date. Later entries win.
fn exception_for(technician: &Technician, date: NaiveDate) -> Option<&AvailabilityException> {
    technician.exceptions.iter().rev().find(|e| e.date == date)
}

/// Round up to the next multiple of `granularity` minutes after midnight.
///
/// Returns `None` if rounding would cross into the next day.
pub(crate) fn round_up_to_grid(at: NaiveDateTime, granularity: i64) -> Option<NaiveDateTime> {
    if granularity <= 1 && at.second() == 0 && at.nanosecond() == 0 {
        return Some(at);
    }
    let granularity = granularity.max(1);
    let secs = i64::from(at.num_seconds_from_midnight());
    let has_fraction = at.nanosecond() > 0;
    let step = granularity * 60;
    let mut rounded = (secs + step - 1) / step * step;
    if has_fraction && rounded == secs {
        rounded += step;
    }
    if rounded >= 24 * 60 * 60 {
        return None;
    }
    let time = NaiveTime::from_num_seconds_from_midnight_opt(rounded as u32, 0)?;
    Some(at.date().and_time(time))
}
