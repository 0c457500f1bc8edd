//! The scheduling-context aggregate handed to the planning agent.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::calendar::{fetch_busy_intervals, FeedFetcher};
use super::dependencies::find_blocked;
use super::free_slots::{compute_free_slots, DateRange, WorkHours};
use super::patterns::{completion_patterns, estimation_multipliers, CompletionPattern};
use super::PlannerStore;
use crate::config::ScheduleConfig;
use crate::models::time::parse_date;
use crate::models::{FreeSlot, SourceStatus};
use crate::{AppError, Result};

/// Days covered when a query names no end date.
pub const DEFAULT_RANGE_DAYS: u64 = 7;

/// Raw free-slot query as received from HTTP or MCP callers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotParams {
    /// First day (`YYYY-MM-DD`); defaults to today.
    pub start_date: Option<String>,
    /// Day after the last (`YYYY-MM-DD`); defaults to a week after the start.
    pub end_date: Option<String>,
    /// Work window start (`HH:MM`).
    pub work_start: Option<String>,
    /// Work window end (`HH:MM`).
    pub work_end: Option<String>,
    /// Shortest reported gap in minutes.
    #[serde(alias = "min_gap_minutes")]
    pub min_gap: Option<i64>,
}

impl SlotParams {
    /// Fail unless both range bounds were given.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` naming the missing bound.
    pub fn require_dates(&self) -> Result<()> {
        if self.start_date.is_none() {
            return Err(AppError::Validation("start_date is required".into()));
        }
        if self.end_date.is_none() {
            return Err(AppError::Validation("end_date is required".into()));
        }
        Ok(())
    }

    /// Fill absent fields from `defaults` and `today`, then validate.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for malformed dates or times, an
    /// empty work window, an oversized range, or a non-positive gap.
    pub fn resolve(self, defaults: &ScheduleConfig, today: NaiveDate) -> Result<SlotQuery> {
        let start = self.start_date.as_deref().map_or(Ok(today), parse_date)?;
        let end = match self.end_date.as_deref() {
            Some(raw) => parse_date(raw)?,
            None => start
                .checked_add_days(Days::new(DEFAULT_RANGE_DAYS))
                .ok_or_else(|| {
                    AppError::Validation(format!("no default end date after {start}"))
                })?,
        };
        let hours = WorkHours::parse(
            self.work_start.as_deref().unwrap_or(&defaults.work_start),
            self.work_end.as_deref().unwrap_or(&defaults.work_end),
        )?;
        let min_gap_minutes = self
            .min_gap
            .unwrap_or_else(|| i64::from(defaults.min_gap_minutes));
        if min_gap_minutes < 1 {
            return Err(AppError::Validation(format!(
                "min_gap must be at least 1 minute, got {min_gap_minutes}"
            )));
        }
        Ok(SlotQuery {
            range: DateRange::new(start, end)?,
            hours,
            min_gap_minutes,
        })
    }
}

/// Parameters of a free-slot query, already validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotQuery {
    /// Days to scan.
    pub range: DateRange,
    /// Daily work window.
    pub hours: WorkHours,
    /// Shortest reported gap.
    pub min_gap_minutes: i64,
}

/// Free slots together with how each calendar source fared.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FreeSlotReport {
    /// Free gaps in chronological order.
    pub free_slots: Vec<FreeSlot>,
    /// One entry per configured calendar source.
    pub sources: Vec<SourceStatus>,
}

/// Read every configured calendar source and compute free slots.
///
/// Unreadable sources are skipped and reported in [`FreeSlotReport::sources`].
///
/// # Errors
///
/// Returns `AppError::Db` if the source list cannot be loaded.
pub async fn free_slot_report(
    store: &dyn PlannerStore,
    fetcher: &dyn FeedFetcher,
    query: SlotQuery,
    fetch_timeout: Duration,
) -> Result<FreeSlotReport> {
    let sources = store.list_sources().await?;
    let aggregate = fetch_busy_intervals(fetcher, &sources, fetch_timeout).await;
    Ok(FreeSlotReport {
        free_slots: compute_free_slots(
            &aggregate.intervals,
            query.range,
            query.hours,
            query.min_gap_minutes,
        ),
        sources: aggregate.statuses,
    })
}

/// Everything the planning agent consults before committing a day's plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SchedulingContext {
    /// Completion-hour pattern per category.
    pub completion_patterns: BTreeMap<String, CompletionPattern>,
    /// Estimation multiplier per category.
    pub estimation_multipliers: BTreeMap<String, f64>,
    /// Open tasks waiting on an open prerequisite.
    pub blocked_task_ids: Vec<i64>,
    /// Free gaps over the requested range.
    pub calendar_free_slots: Vec<FreeSlot>,
    /// Per-source outcome of the calendar read.
    pub calendar_sources: Vec<SourceStatus>,
}

/// Assemble the scheduling context.
///
/// Each part is computed independently. A failing store read or calendar
/// pass leaves its part empty and is logged; the call itself never fails.
pub async fn build_context(
    store: &dyn PlannerStore,
    fetcher: &dyn FeedFetcher,
    query: SlotQuery,
    fetch_timeout: Duration,
) -> SchedulingContext {
    let (archive, tasks, slots) = tokio::join!(
        store.list_archived(),
        store.list_all_tasks(),
        free_slot_report(store, fetcher, query, fetch_timeout),
    );

    let mut context = SchedulingContext::default();

    match archive {
        Ok(archive) => {
            context.completion_patterns = completion_patterns(&archive);
            context.estimation_multipliers = estimation_multipliers(&archive);
        }
        Err(err) => warn!(%err, "archive unavailable; omitting historical patterns"),
    }

    match tasks {
        Ok(tasks) => context.blocked_task_ids = find_blocked(&tasks),
        Err(err) => warn!(%err, "tasks unavailable; omitting blocked task ids"),
    }

    match slots {
        Ok(report) => {
            context.calendar_free_slots = report.free_slots;
            context.calendar_sources = report.sources;
        }
        Err(err) => warn!(%err, "calendar sources unavailable; omitting free slots"),
    }

    context
}
