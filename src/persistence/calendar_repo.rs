//! Calendar source repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::models::calendar::{CalendarSource, NewCalendarSource, SourceKind};
use crate::models::time::now_local;
use crate::{AppError, Result};

use super::db::Database;
use super::{decode_opt_ts, decode_ts, encode_ts};

/// Repository for configured calendar sources.
#[derive(Clone)]
pub struct CalendarRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct SourceRow {
    id: i64,
    source_type: String,
    source_value: String,
    label: Option<String>,
    created_at: String,
    last_synced_at: Option<String>,
}

impl SourceRow {
    fn into_source(self) -> Result<CalendarSource> {
        let source_type = SourceKind::parse(&self.source_type)
            .map_err(|e| AppError::Db(format!("invalid source_type: {e}")))?;
        Ok(CalendarSource {
            id: self.id,
            source_type,
            source_value: self.source_value,
            label: self.label,
            created_at: decode_ts("created_at", &self.created_at)?,
            last_synced_at: decode_opt_ts("last_synced_at", self.last_synced_at.as_deref())?,
        })
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("calendar source {id} not found"))
}

impl CalendarRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Register a new source.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    pub async fn create(&self, source: &NewCalendarSource) -> Result<CalendarSource> {
        let result = sqlx::query(
            "INSERT INTO calendar_source (source_type, source_value, label, created_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(source.kind.as_str())
        .bind(&source.location)
        .bind(&source.label)
        .bind(encode_ts(&now_local()))
        .execute(self.db.as_ref())
        .await?;
        self.get(result.last_insert_rowid()).await
    }

    /// Retrieve a source by identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the source does not exist.
    pub async fn get(&self, id: i64) -> Result<CalendarSource> {
        let row: Option<SourceRow> = sqlx::query_as(
            "SELECT id, source_type, source_value, label, created_at, last_synced_at
             FROM calendar_source WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(self.db.as_ref())
        .await?;
        row.ok_or_else(|| not_found(id))?.into_source()
    }

    /// All sources in creation order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list(&self) -> Result<Vec<CalendarSource>> {
        let rows: Vec<SourceRow> = sqlx::query_as(
            "SELECT id, source_type, source_value, label, created_at, last_synced_at
             FROM calendar_source ORDER BY id ASC",
        )
        .fetch_all(self.db.as_ref())
        .await?;
        rows.into_iter().map(SourceRow::into_source).collect()
    }

    /// Remove a source.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the source does not exist.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM calendar_source WHERE id = ?1")
            .bind(id)
            .execute(self.db.as_ref())
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    /// Record a successful explicit read of the source at `now`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the source does not exist.
    pub async fn mark_synced(&self, id: i64, now: NaiveDateTime) -> Result<CalendarSource> {
        let result = sqlx::query("UPDATE calendar_source SET last_synced_at = ?1 WHERE id = ?2")
            .bind(encode_ts(&now))
            .bind(id)
            .execute(self.db.as_ref())
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        self.get(id).await
    }
}
