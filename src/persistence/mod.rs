//! Persistence layer modules.

use chrono::{NaiveDateTime, NaiveTime};

use crate::models::time::TIMESTAMP_FORMAT;
use crate::{AppError, Result};

pub mod archive_repo;
pub mod calendar_repo;
pub mod db;
pub mod schema;
pub mod store;
pub mod task_repo;
pub mod today_repo;

/// Re-export the database pool type for convenience.
pub use sqlx::SqlitePool;

/// Decode a stored `YYYY-MM-DD HH:MM:SS` column.
fn decode_ts(column: &str, raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map_err(|e| AppError::Db(format!("invalid {column}: {e}")))
}

fn decode_opt_ts(column: &str, raw: Option<&str>) -> Result<Option<NaiveDateTime>> {
    raw.map(|raw| decode_ts(column, raw)).transpose()
}

fn decode_clock(column: &str, raw: Option<&str>) -> Result<Option<NaiveTime>> {
    raw.map(|raw| {
        NaiveTime::parse_from_str(raw, "%H:%M:%S")
            .map_err(|e| AppError::Db(format!("invalid {column}: {e}")))
    })
    .transpose()
}

/// Re-tag a stored enum token that fails to parse as a storage fault.
fn decode_token<T: std::str::FromStr<Err = AppError>>(column: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|e: AppError| AppError::Db(format!("invalid {column}: {e}")))
}

fn encode_ts(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}
