//! Free-slot computation over busy intervals and a daily work window.
//!
//! For each day in a half-open date range the work window
//! `[day@start_hour:00, day@end_hour:00)` is swept left to right. Busy
//! intervals overlapping the window are clamped to it and stably sorted by
//! start; a cursor that never moves backwards implicitly merges overlapping
//! intervals, so two overlapping events never split a gap into fragments.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::calendar::{BusyInterval, FreeSlot};
use crate::models::time::{parse_clock, parse_date};
use crate::{AppError, Result};

/// Gaps shorter than this many minutes are not reported by default.
pub const DEFAULT_MIN_GAP_MINUTES: i64 = 30;

/// Longest date range a single query may cover.
pub const MAX_RANGE_DAYS: i64 = 366;

/// Daily work window expressed in whole hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkHours {
    start_hour: u32,
    end_hour: u32,
}

impl WorkHours {
    /// Build a window; `start_hour` must be earlier than `end_hour` and
    /// both must be valid clock hours.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an empty or out-of-range window.
    pub fn new(start_hour: u32, end_hour: u32) -> Result<Self> {
        if end_hour > 23 {
            return Err(AppError::Validation(format!(
                "work_end hour {end_hour} is out of range"
            )));
        }
        if start_hour >= end_hour {
            return Err(AppError::Validation(format!(
                "work_start ({start_hour:02}:00) must be earlier than work_end ({end_hour:02}:00)"
            )));
        }
        Ok(Self {
            start_hour,
            end_hour,
        })
    }

    /// Parse `HH:MM` bounds. Only the hour is significant.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for malformed times or an empty window.
    pub fn parse(work_start: &str, work_end: &str) -> Result<Self> {
        use chrono::Timelike;
        let start = parse_clock(work_start)?;
        let end = parse_clock(work_end)?;
        Self::new(start.hour(), end.hour())
    }

    /// First hour of the window.
    #[must_use]
    pub fn start_hour(self) -> u32 {
        self.start_hour
    }

    /// Hour at which the window closes.
    #[must_use]
    pub fn end_hour(self) -> u32 {
        self.end_hour
    }

    fn window(self, day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let at = |hour: u32| day.and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN));
        (at(self.start_hour), at(self.end_hour))
    }
}

/// Half-open range of calendar days `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range. An inverted range is allowed and simply yields no days.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` when the range spans more than
    /// [`MAX_RANGE_DAYS`] days.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let span = (end - start).num_days();
        if span > MAX_RANGE_DAYS {
            return Err(AppError::Validation(format!(
                "date range spans {span} days; at most {MAX_RANGE_DAYS} are allowed"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse `YYYY-MM-DD` bounds.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for malformed dates or oversized ranges.
    pub fn parse(start_date: &str, end_date: &str) -> Result<Self> {
        Self::new(parse_date(start_date)?, parse_date(end_date)?)
    }

    /// First day (inclusive).
    #[must_use]
    pub fn start(self) -> NaiveDate {
        self.start
    }

    /// Last day (exclusive).
    #[must_use]
    pub fn end(self) -> NaiveDate {
        self.end
    }

    /// Every day in the range, in order; `end` is excluded.
    pub fn days(self) -> impl Iterator<Item = NaiveDate> {
        self.start
            .iter_days()
            .take_while(move |day| *day < self.end)
    }
}

/// Compute the free gaps of at least `min_gap_minutes` inside the work
/// window of every day in `range`.
#[must_use]
pub fn compute_free_slots(
    busy: &[BusyInterval],
    range: DateRange,
    hours: WorkHours,
    min_gap_minutes: i64,
) -> Vec<FreeSlot> {
    let mut slots = Vec::new();
    for day in range.days() {
        let (window_start, window_end) = hours.window(day);
        for (gap_start, gap_end) in window_gaps(busy, window_start, window_end) {
            let minutes = (gap_end - gap_start).num_minutes();
            if minutes >= min_gap_minutes {
                slots.push(FreeSlot {
                    date: gap_start.date(),
                    start: gap_start.time(),
                    end: gap_end.time(),
                    duration_minutes: minutes,
                });
            }
        }
    }
    slots
}

/// Unfiltered gaps of one window, in order.
fn window_gaps(
    busy: &[BusyInterval],
    window_start: NaiveDateTime,
    window_end: NaiveDateTime,
) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    let mut clamped: Vec<BusyInterval> = busy
        .iter()
        .filter(|iv| iv.end > window_start && iv.start < window_end)
        .map(|iv| BusyInterval::new(iv.start.max(window_start), iv.end.min(window_end)))
        .collect();
    // Stable: equal starts keep their input order.
    clamped.sort_by_key(|iv| iv.start);

    let mut gaps = Vec::new();
    let mut cursor = window_start;
    for iv in clamped {
        if iv.start > cursor {
            gaps.push((cursor, iv.start));
        }
        cursor = cursor.max(iv.end);
    }
    if cursor < window_end {
        gaps.push((cursor, window_end));
    }
    gaps
}

/// Total free minutes across `slots`.
#[must_use]
pub fn total_free_minutes(slots: &[FreeSlot]) -> i64 {
    slots.iter().map(|s| s.duration_minutes).sum()
}
