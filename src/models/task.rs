//! Task model, estimated effort, and validated inputs for create/update.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::priority::Priority;
use super::time::{opt_timestamp, parse_timestamp, timestamp};
use crate::{AppError, Result};

/// Estimated (or actual) amount of work, rendered as `HH:MM:SS`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Effort {
    seconds: u32,
}

impl Effort {
    /// Build an effort from whole minutes.
    #[must_use]
    pub fn from_minutes(minutes: u32) -> Self {
        Self {
            seconds: minutes.saturating_mul(60),
        }
    }

    /// Build an effort from seconds.
    #[must_use]
    pub fn from_seconds(seconds: u32) -> Self {
        Self { seconds }
    }

    /// Total seconds.
    #[must_use]
    pub fn seconds(self) -> u32 {
        self.seconds
    }

    /// Whole minutes, ignoring leftover seconds.
    #[must_use]
    pub fn minutes(self) -> u32 {
        self.seconds / 60
    }
}

impl Display for Effort {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let hours = self.seconds / 3600;
        let minutes = (self.seconds % 3600) / 60;
        let seconds = self.seconds % 60;
        write!(f, "{hours:02}:{minutes:02}:{seconds:02}")
    }
}

impl FromStr for Effort {
    type Err = AppError;

    /// Accepts `HH:MM:SS` or `HH:MM`; hours may exceed 23.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || AppError::Validation(format!("invalid duration '{s}' (expected HH:MM:SS)"));
        let parts: Vec<&str> = s.trim().split(':').collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(invalid());
        }
        let mut fields = [0_u32; 3];
        for (slot, part) in fields.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| invalid())?;
        }
        let [hours, minutes, seconds] = fields;
        if minutes >= 60 || seconds >= 60 {
            return Err(invalid());
        }
        let total = hours
            .checked_mul(3600)
            .and_then(|h| h.checked_add(minutes * 60 + seconds))
            .ok_or_else(invalid)?;
        Ok(Self::from_seconds(total))
    }
}

impl TryFrom<String> for Effort {
    type Error = AppError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Effort> for String {
    fn from(value: Effort) -> Self {
        value.to_string()
    }
}

/// A planned unit of work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    /// Store-assigned identifier.
    pub id: i64,
    /// Short title.
    pub title: String,
    /// Free-text description (may be empty).
    pub description: String,
    /// Deadline.
    #[serde(with = "timestamp")]
    pub due_date: NaiveDateTime,
    /// Priority rank.
    pub priority: Priority,
    /// Estimated work.
    #[serde(rename = "time_required")]
    pub effort: Effort,
    /// Free-text category.
    pub category: String,
    /// Completion flag.
    pub completed: bool,
    /// Creation timestamp.
    #[serde(with = "timestamp")]
    pub created_at: NaiveDateTime,
    /// When work on the task began, if recorded.
    #[serde(with = "opt_timestamp", default)]
    pub started_at: Option<NaiveDateTime>,
    /// When the task was last marked completed.
    #[serde(with = "opt_timestamp", default)]
    pub completed_at: Option<NaiveDateTime>,
    /// Advisory priority suggested by the planning agent.
    #[serde(default)]
    pub suggested_priority: Option<Priority>,
    /// Advisory start time suggested by the planning agent.
    #[serde(default)]
    pub suggested_start_time: Option<NaiveTime>,
    /// Direct prerequisites, in the order they were set.
    #[serde(default)]
    pub dependencies: Vec<i64>,
}

impl Task {
    /// Whether the deadline lies on a day before `today` and the task is still open.
    #[must_use]
    pub fn is_overdue(&self, today: chrono::NaiveDate) -> bool {
        !self.completed && self.due_date.date() < today
    }
}

fn default_priority() -> String {
    "B".into()
}

fn default_effort() -> String {
    "00:30:00".into()
}

/// Raw task creation payload as received from HTTP or MCP callers.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskDraft {
    /// Short title.
    pub title: String,
    /// Optional description.
    #[serde(default)]
    pub description: String,
    /// Deadline (`YYYY-MM-DD HH:MM:SS`).
    pub due_date: String,
    /// Priority token (`S`/`A`/`B`/`C`/`D`).
    #[serde(default = "default_priority")]
    pub priority: String,
    /// Estimated work (`HH:MM:SS`).
    #[serde(default = "default_effort")]
    pub time_required: String,
    /// Category.
    pub category: String,
}

/// Validated task creation input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Short title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Deadline.
    pub due_date: NaiveDateTime,
    /// Priority rank.
    pub priority: Priority,
    /// Estimated work.
    pub effort: Effort,
    /// Category.
    pub category: String,
}

impl TaskDraft {
    /// Validate every field and produce a typed [`NewTask`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for empty titles/categories and
    /// malformed timestamps, priorities, or durations.
    pub fn validate(self) -> Result<NewTask> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(AppError::Validation("title must not be empty".into()));
        }
        let category = self.category.trim().to_owned();
        if category.is_empty() {
            return Err(AppError::Validation("category must not be empty".into()));
        }
        Ok(NewTask {
            title,
            description: self.description,
            due_date: parse_timestamp(&self.due_date)?,
            priority: self.priority.parse()?,
            effort: self.time_required.parse()?,
            category,
        })
    }
}

/// Raw partial update payload; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New deadline (`YYYY-MM-DD HH:MM:SS`).
    pub due_date: Option<String>,
    /// New priority token.
    pub priority: Option<String>,
    /// New estimated work (`HH:MM:SS`).
    pub time_required: Option<String>,
    /// New category.
    pub category: Option<String>,
}

/// Validated partial update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New deadline.
    pub due_date: Option<NaiveDateTime>,
    /// New priority.
    pub priority: Option<Priority>,
    /// New estimated work.
    pub effort: Option<Effort>,
    /// New category.
    pub category: Option<String>,
}

impl TaskChanges {
    /// Whether the update touches no field at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl TaskPatch {
    /// Validate the present fields.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for malformed values.
    pub fn validate(self) -> Result<TaskChanges> {
        if matches!(self.title.as_deref().map(str::trim), Some("")) {
            return Err(AppError::Validation("title must not be empty".into()));
        }
        if matches!(self.category.as_deref().map(str::trim), Some("")) {
            return Err(AppError::Validation("category must not be empty".into()));
        }
        Ok(TaskChanges {
            title: self.title.map(|t| t.trim().to_owned()),
            description: self.description,
            due_date: self.due_date.as_deref().map(parse_timestamp).transpose()?,
            priority: self.priority.as_deref().map(str::parse::<Priority>).transpose()?,
            effort: self.time_required.as_deref().map(str::parse::<Effort>).transpose()?,
            category: self.category.map(|c| c.trim().to_owned()),
        })
    }
}

/// Raw advisory-field update sent by the planning agent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestionPatch {
    /// Suggested priority token.
    pub suggested_priority: Option<String>,
    /// Suggested start time (`HH:MM:SS`).
    pub suggested_start_time: Option<String>,
}

/// Validated advisory-field update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Suggestions {
    /// Suggested priority.
    pub priority: Option<Priority>,
    /// Suggested start time.
    pub start_time: Option<NaiveTime>,
}

impl SuggestionPatch {
    /// Validate the present fields.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for malformed values or when both fields are absent.
    pub fn validate(self) -> Result<Suggestions> {
        if self.suggested_priority.is_none() && self.suggested_start_time.is_none() {
            return Err(AppError::Validation(
                "pass suggested_priority and/or suggested_start_time".into(),
            ));
        }
        let start_time = self
            .suggested_start_time
            .as_deref()
            .map(|raw| {
                NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S").map_err(|err| {
                    AppError::Validation(format!(
                        "invalid suggested_start_time '{raw}' (expected HH:MM:SS): {err}"
                    ))
                })
            })
            .transpose()?;
        Ok(Suggestions {
            priority: self
                .suggested_priority
                .as_deref()
                .map(str::parse::<Priority>)
                .transpose()?,
            start_time,
        })
    }
}
