//! `SQLite` schema bootstrap logic.
//!
//! All definitions use `IF NOT EXISTS`, so the bootstrap is safe to re-run
//! on every server startup.

use sqlx::SqlitePool;

use crate::Result;

/// Apply all table definitions to the connected database.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS task (
    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    title                TEXT NOT NULL,
    description          TEXT NOT NULL DEFAULT '',
    due_date             TEXT NOT NULL,
    priority             TEXT NOT NULL CHECK(priority IN ('S','A','B','C','D')),
    time_required        TEXT NOT NULL,
    category             TEXT NOT NULL,
    completed            INTEGER NOT NULL DEFAULT 0,
    created_at           TEXT NOT NULL,
    started_at           TEXT,
    completed_at         TEXT,
    suggested_priority   TEXT CHECK(suggested_priority IN ('S','A','B','C','D')),
    suggested_start_time TEXT
);

CREATE TABLE IF NOT EXISTS task_dependency (
    task_id       INTEGER NOT NULL,
    depends_on_id INTEGER NOT NULL,
    position      INTEGER NOT NULL,
    PRIMARY KEY (task_id, depends_on_id)
);

CREATE TABLE IF NOT EXISTS today_task (
    task_id  INTEGER NOT NULL,
    day      TEXT NOT NULL,
    rank     INTEGER NOT NULL,
    PRIMARY KEY (task_id, day),
    UNIQUE (day, rank)
);

CREATE TABLE IF NOT EXISTS archived_task (
    id                      INTEGER PRIMARY KEY AUTOINCREMENT,
    original_id             INTEGER NOT NULL,
    title                   TEXT NOT NULL,
    description             TEXT NOT NULL DEFAULT '',
    due_date                TEXT NOT NULL,
    priority                TEXT NOT NULL,
    time_required           TEXT NOT NULL,
    category                TEXT NOT NULL,
    created_at              TEXT NOT NULL,
    completed_at            TEXT NOT NULL,
    started_at              TEXT,
    actual_duration_minutes INTEGER,
    suggested_priority      TEXT
);

CREATE TABLE IF NOT EXISTS calendar_source (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    source_type    TEXT NOT NULL CHECK(source_type IN ('url','file')),
    source_value   TEXT NOT NULL,
    label          TEXT,
    created_at     TEXT NOT NULL,
    last_synced_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_task_due ON task(due_date);
CREATE INDEX IF NOT EXISTS idx_today_day ON today_task(day);
CREATE INDEX IF NOT EXISTS idx_archived_category ON archived_task(category);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
