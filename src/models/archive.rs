//! Immutable snapshots of completed tasks.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::priority::Priority;
use super::task::{Effort, Task};
use super::time::{opt_timestamp, timestamp};

/// A completed task moved out of the live list.
///
/// Archive records are written once by the cleanup pass and never
/// mutated afterwards; they feed the historical pattern analytics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchivedTask {
    /// Archive record identifier (assigned on insert, `0` before).
    pub id: i64,
    /// Identifier the task had while it was live.
    pub original_id: i64,
    /// Title at archival time.
    pub title: String,
    /// Description at archival time.
    pub description: String,
    /// Deadline at archival time.
    #[serde(with = "timestamp")]
    pub due_date: NaiveDateTime,
    /// Priority at archival time.
    pub priority: Priority,
    /// Estimated work at archival time.
    #[serde(rename = "time_required")]
    pub effort: Effort,
    /// Category at archival time.
    pub category: String,
    /// Original creation timestamp.
    #[serde(with = "timestamp")]
    pub created_at: NaiveDateTime,
    /// Completion timestamp.
    #[serde(with = "timestamp")]
    pub completed_at: NaiveDateTime,
    /// Start timestamp, if work start was recorded.
    #[serde(with = "opt_timestamp", default)]
    pub started_at: Option<NaiveDateTime>,
    /// Whole minutes between start and completion, when start was recorded.
    #[serde(default)]
    pub actual_duration_minutes: Option<i64>,
    /// Suggested priority in effect at archival time.
    #[serde(default)]
    pub suggested_priority: Option<Priority>,
}

impl ArchivedTask {
    /// Snapshot `task`, completed at `completed_at`.
    ///
    /// The actual duration is the floor-minute difference between
    /// completion and start; a start recorded after completion yields zero.
    #[must_use]
    pub fn from_task(task: &Task, completed_at: NaiveDateTime) -> Self {
        let actual_duration_minutes = task
            .started_at
            .map(|started| (completed_at - started).num_minutes().max(0));

        Self {
            id: 0,
            original_id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date,
            priority: task.priority,
            effort: task.effort,
            category: task.category.clone(),
            created_at: task.created_at,
            completed_at,
            started_at: task.started_at,
            actual_duration_minutes,
            suggested_priority: task.suggested_priority,
        }
    }
}
