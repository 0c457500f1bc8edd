//! Naive local date/time parsing and the wire formats used by the API.
//!
//! All timestamps are naive local time; no timezone conversion happens
//! anywhere in the planner.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::{AppError, Result};

/// Wire format for task timestamps (`2025-06-01 18:30:00`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Wire format for calendar days.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` calendar day.
///
/// # Errors
///
/// Returns `AppError::Validation` when the string is not a valid date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|err| AppError::Validation(format!("invalid date '{raw}' (expected YYYY-MM-DD): {err}")))
}

/// Parse an `HH:MM` clock time (seconds are accepted and kept).
///
/// # Errors
///
/// Returns `AppError::Validation` when the string is not a valid time.
pub fn parse_clock(raw: &str) -> Result<NaiveTime> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|err| AppError::Validation(format!("invalid time '{raw}' (expected HH:MM): {err}")))
}

/// Parse a `YYYY-MM-DD HH:MM:SS` timestamp.
///
/// # Errors
///
/// Returns `AppError::Validation` when the string is not a valid timestamp.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).map_err(|err| {
        AppError::Validation(format!(
            "invalid timestamp '{raw}' (expected YYYY-MM-DD HH:MM:SS): {err}"
        ))
    })
}

/// Render a timestamp in the API wire format.
#[must_use]
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Current local wall-clock time, truncated to whole seconds.
#[must_use]
pub fn now_local() -> NaiveDateTime {
    let now = chrono::Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Serde adapter for `NaiveDateTime` in [`TIMESTAMP_FORMAT`].
pub mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    /// Serialize as `YYYY-MM-DD HH:MM:SS`.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&ts.format(TIMESTAMP_FORMAT))
    }

    /// Deserialize from `YYYY-MM-DD HH:MM:SS`.
    ///
    /// # Errors
    ///
    /// Returns a custom error when the string is malformed.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `Option<NaiveDateTime>` in [`TIMESTAMP_FORMAT`].
pub mod opt_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    /// Serialize as `YYYY-MM-DD HH:MM:SS` or `null`.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn serialize<S: Serializer>(ts: &Option<NaiveDateTime>, s: S) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => s.collect_str(&ts.format(TIMESTAMP_FORMAT)),
            None => s.serialize_none(),
        }
    }

    /// Deserialize from `YYYY-MM-DD HH:MM:SS` or `null`.
    ///
    /// # Errors
    ///
    /// Returns a custom error when the string is malformed.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|raw| {
                NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}

/// Serde adapter rendering a `NaiveTime` as `HH:MM`.
pub mod clock_hm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as `HH:MM`.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&t.format("%H:%M"))
    }

    /// Deserialize from `HH:MM`.
    ///
    /// # Errors
    ///
    /// Returns a custom error when the string is malformed.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(serde::de::Error::custom)
    }
}
