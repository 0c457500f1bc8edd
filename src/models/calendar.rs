//! Calendar sources and the ephemeral busy/free intervals derived from them.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::time::{clock_hm, opt_timestamp, timestamp};
use crate::{AppError, Result};

/// Where a calendar source's bytes come from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Remote iCalendar feed (`https://` or `webcal://`).
    Url,
    /// Local `.ics` file.
    File,
}

impl SourceKind {
    /// Storage token.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::File => "file",
        }
    }

    /// Parse a storage token.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for unknown tokens.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "url" => Ok(Self::Url),
            "file" => Ok(Self::File),
            other => Err(AppError::Validation(format!(
                "invalid source type '{other}'; expected 'url' or 'file'"
            ))),
        }
    }
}

/// A configured origin of busy time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarSource {
    /// Store-assigned identifier.
    pub id: i64,
    /// Remote feed or local file.
    pub source_type: SourceKind,
    /// URL or file path.
    pub source_value: String,
    /// Optional display label.
    pub label: Option<String>,
    /// Creation timestamp.
    #[serde(with = "timestamp")]
    pub created_at: NaiveDateTime,
    /// Last successful explicit sync/test.
    #[serde(with = "opt_timestamp", default)]
    pub last_synced_at: Option<NaiveDateTime>,
}

impl CalendarSource {
    /// Label if present, otherwise the location.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.source_value)
    }
}

/// Raw calendar source creation payload.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarSourceDraft {
    /// `url` or `file`.
    pub source_type: String,
    /// URL or file path.
    pub source_value: String,
    /// Optional display label.
    #[serde(default)]
    pub label: Option<String>,
}

/// Validated calendar source creation input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCalendarSource {
    /// Remote feed or local file.
    pub kind: SourceKind,
    /// URL or file path.
    pub location: String,
    /// Optional display label.
    pub label: Option<String>,
}

impl CalendarSourceDraft {
    /// Validate the payload.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for unknown kinds or an empty location.
    pub fn validate(self) -> Result<NewCalendarSource> {
        let kind = SourceKind::parse(self.source_type.trim())?;
        let location = self.source_value.trim().to_owned();
        if location.is_empty() {
            return Err(AppError::Validation("source_value must not be empty".into()));
        }
        Ok(NewCalendarSource {
            kind,
            location,
            label: self.label.filter(|l| !l.trim().is_empty()),
        })
    }
}

/// A span during which the user is occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyInterval {
    /// Inclusive start.
    pub start: NaiveDateTime,
    /// Exclusive end.
    pub end: NaiveDateTime,
}

impl BusyInterval {
    /// Build an interval from its bounds.
    #[must_use]
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }
}

/// A free gap inside the work window of one day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FreeSlot {
    /// Day of the gap.
    pub date: NaiveDate,
    /// Gap start (`HH:MM`).
    #[serde(with = "clock_hm")]
    pub start: NaiveTime,
    /// Gap end (`HH:MM`).
    #[serde(with = "clock_hm")]
    pub end: NaiveTime,
    /// Whole minutes in the gap.
    pub duration_minutes: i64,
}

/// Outcome of reading one calendar source during aggregation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceStatus {
    /// Source identifier.
    pub source_id: i64,
    /// Display label, if configured.
    pub label: Option<String>,
    /// URL or file path.
    pub location: String,
    /// Whether the source contributed intervals.
    pub ok: bool,
    /// Number of busy intervals contributed.
    pub event_count: usize,
    /// Failure description when `ok` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceStatus {
    /// Successful read of `source` contributing `event_count` intervals.
    #[must_use]
    pub fn ok(source: &CalendarSource, event_count: usize) -> Self {
        Self {
            source_id: source.id,
            label: source.label.clone(),
            location: source.source_value.clone(),
            ok: true,
            event_count,
            error: None,
        }
    }

    /// Failed read of `source`.
    #[must_use]
    pub fn failed(source: &CalendarSource, error: String) -> Self {
        Self {
            source_id: source.id,
            label: source.label.clone(),
            location: source.source_value.clone(),
            ok: false,
            event_count: 0,
            error: Some(error),
        }
    }
}
