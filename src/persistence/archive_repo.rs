//! Archive repository: the append-only history of completed tasks, and
//! the cleanup pass that fills it.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::SqliteConnection;
use tracing::info;

use crate::models::{ArchivedTask, Effort, Priority};
use crate::Result;

use super::db::Database;
use super::task_repo::{delete_task_rows, TaskRow, TASK_COLUMNS};
use super::{decode_opt_ts, decode_token, decode_ts, encode_ts};

/// Repository for `archived_task` records.
#[derive(Clone)]
pub struct ArchiveRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct ArchivedRow {
    id: i64,
    original_id: i64,
    title: String,
    description: String,
    due_date: String,
    priority: String,
    time_required: String,
    category: String,
    created_at: String,
    completed_at: String,
    started_at: Option<String>,
    actual_duration_minutes: Option<i64>,
    suggested_priority: Option<String>,
}

impl ArchivedRow {
    fn into_archived(self) -> Result<ArchivedTask> {
        Ok(ArchivedTask {
            id: self.id,
            original_id: self.original_id,
            title: self.title,
            description: self.description,
            due_date: decode_ts("due_date", &self.due_date)?,
            priority: decode_token::<Priority>("priority", &self.priority)?,
            effort: decode_token::<Effort>("time_required", &self.time_required)?,
            category: self.category,
            created_at: decode_ts("created_at", &self.created_at)?,
            completed_at: decode_ts("completed_at", &self.completed_at)?,
            started_at: decode_opt_ts("started_at", self.started_at.as_deref())?,
            actual_duration_minutes: self.actual_duration_minutes,
            suggested_priority: self
                .suggested_priority
                .as_deref()
                .map(|raw| decode_token::<Priority>("suggested_priority", raw))
                .transpose()?,
        })
    }
}

async fn insert(conn: &mut SqliteConnection, record: &ArchivedTask) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO archived_task (original_id, title, description, due_date, priority, time_required,
             category, created_at, completed_at, started_at, actual_duration_minutes, suggested_priority)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )
    .bind(record.original_id)
    .bind(&record.title)
    .bind(&record.description)
    .bind(encode_ts(&record.due_date))
    .bind(record.priority.as_str())
    .bind(record.effort.to_string())
    .bind(&record.category)
    .bind(encode_ts(&record.created_at))
    .bind(encode_ts(&record.completed_at))
    .bind(record.started_at.as_ref().map(encode_ts))
    .bind(record.actual_duration_minutes)
    .bind(record.suggested_priority.map(Priority::as_str))
    .execute(conn)
    .await?;
    Ok(result.last_insert_rowid())
}

const ARCHIVE_COLUMNS: &str = "id, original_id, title, description, due_date, priority, time_required, \
     category, created_at, completed_at, started_at, actual_duration_minutes, suggested_priority";

impl ArchiveRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Whole archive in archive-id order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<ArchivedTask>> {
        let rows: Vec<ArchivedRow> = sqlx::query_as(&format!(
            "SELECT {ARCHIVE_COLUMNS} FROM archived_task ORDER BY id ASC"
        ))
        .fetch_all(self.db.as_ref())
        .await?;
        rows.into_iter().map(ArchivedRow::into_archived).collect()
    }

    /// Whole archive, most recently completed first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_newest_first(&self) -> Result<Vec<ArchivedTask>> {
        let rows: Vec<ArchivedRow> = sqlx::query_as(&format!(
            "SELECT {ARCHIVE_COLUMNS} FROM archived_task ORDER BY completed_at DESC, id DESC"
        ))
        .fetch_all(self.db.as_ref())
        .await?;
        rows.into_iter().map(ArchivedRow::into_archived).collect()
    }

    /// Append one record; its `id` field is ignored and the assigned id is
    /// returned in the stored copy.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    pub async fn append(&self, record: &ArchivedTask) -> Result<ArchivedTask> {
        let mut conn = self.db.acquire().await?;
        let id = insert(&mut *conn, record).await?;
        Ok(ArchivedTask {
            id,
            ..record.clone()
        })
    }

    /// Move completed tasks into the archive.
    ///
    /// A completed task is archived when it was planned for a day before
    /// `today` or was never planned at all; tasks completed off today's plan
    /// stay visible until the next day's pass. Completion time falls back
    /// to `now` when none was recorded. Runs in a single transaction and
    /// returns the number of tasks archived.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if any statement fails; nothing is archived then.
    pub async fn cleanup(&self, today: NaiveDate, now: NaiveDateTime) -> Result<usize> {
        let mut tx = self.db.begin().await?;
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM task
             WHERE task.completed = 1 AND (
                 EXISTS (SELECT 1 FROM today_task WHERE today_task.task_id = task.id AND today_task.day < ?1)
                 OR NOT EXISTS (SELECT 1 FROM today_task WHERE today_task.task_id = task.id))
             ORDER BY task.id ASC"
        ))
        .bind(today.format("%Y-%m-%d").to_string())
        .fetch_all(&mut *tx)
        .await?;

        let mut archived = 0;
        for row in rows {
            let task = row.into_task(Vec::new())?;
            let record = ArchivedTask::from_task(&task, task.completed_at.unwrap_or(now));
            insert(&mut *tx, &record).await?;
            delete_task_rows(&mut *tx, task.id).await?;
            archived += 1;
        }

        tx.commit().await?;
        info!(archived, "archived completed tasks");
        Ok(archived)
    }
}
