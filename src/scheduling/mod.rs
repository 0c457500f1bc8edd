//! Scheduling-context engine.
//!
//! Pure computations (free slots, historical patterns, dependency
//! blocking) plus the calendar aggregation and the aggregate that bundles
//! them. Storage and feed access go through the [`PlannerStore`] and
//! [`calendar::FeedFetcher`] seams so the engine can run against fakes.

use std::future::Future;
use std::pin::Pin;

use crate::models::{ArchivedTask, CalendarSource, Task};
use crate::Result;

pub mod calendar;
pub mod context;
pub mod dependencies;
pub mod free_slots;
pub mod ical;
pub mod patterns;

pub use calendar::{FeedFetcher, HttpFeedFetcher};
pub use context::{build_context, free_slot_report, SchedulingContext, SlotParams, SlotQuery};
pub use free_slots::{compute_free_slots, DateRange, WorkHours};

/// Boxed future returned by [`PlannerStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Read-only snapshot access to the planner's persistent state.
pub trait PlannerStore: Send + Sync {
    /// Tasks that are not completed, by due date.
    fn list_pending(&self) -> StoreFuture<'_, Vec<Task>>;

    /// Every live task, by due date.
    fn list_all_tasks(&self) -> StoreFuture<'_, Vec<Task>>;

    /// One task by id; `AppError::NotFound` when absent.
    fn get_task(&self, id: i64) -> StoreFuture<'_, Task>;

    /// The whole archive in archive-id order.
    fn list_archived(&self) -> StoreFuture<'_, Vec<ArchivedTask>>;

    /// Configured calendar sources.
    fn list_sources(&self) -> StoreFuture<'_, Vec<CalendarSource>>;
}
