//! Task repository for `SQLite` persistence.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use sqlx::SqliteConnection;

use crate::models::task::{NewTask, Suggestions, TaskChanges};
use crate::models::time::now_local;
use crate::models::{Effort, Priority, Task};
use crate::{AppError, Result};

use super::db::Database;
use super::{decode_clock, decode_opt_ts, decode_token, decode_ts, encode_ts};

/// Columns selected for every task read, in [`TaskRow`] order.
pub(super) const TASK_COLUMNS: &str = "task.id AS id, task.title AS title, task.description AS description, \
     task.due_date AS due_date, task.priority AS priority, \
     task.time_required AS time_required, task.category AS category, \
     task.completed AS completed, task.created_at AS created_at, \
     task.started_at AS started_at, task.completed_at AS completed_at, \
     task.suggested_priority AS suggested_priority, \
     task.suggested_start_time AS suggested_start_time";

/// Repository for task records and their dependency lists.
#[derive(Clone)]
pub struct TaskRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
pub(super) struct TaskRow {
    id: i64,
    title: String,
    description: String,
    due_date: String,
    priority: String,
    time_required: String,
    category: String,
    completed: i64,
    created_at: String,
    started_at: Option<String>,
    completed_at: Option<String>,
    suggested_priority: Option<String>,
    suggested_start_time: Option<String>,
}

impl TaskRow {
    pub(super) fn id(&self) -> i64 {
        self.id
    }

    pub(super) fn into_task(self, dependencies: Vec<i64>) -> Result<Task> {
        Ok(Task {
            id: self.id,
            title: self.title,
            description: self.description,
            due_date: decode_ts("due_date", &self.due_date)?,
            priority: decode_token::<Priority>("priority", &self.priority)?,
            effort: decode_token::<Effort>("time_required", &self.time_required)?,
            category: self.category,
            completed: self.completed != 0,
            created_at: decode_ts("created_at", &self.created_at)?,
            started_at: decode_opt_ts("started_at", self.started_at.as_deref())?,
            completed_at: decode_opt_ts("completed_at", self.completed_at.as_deref())?,
            suggested_priority: self
                .suggested_priority
                .as_deref()
                .map(|raw| decode_token::<Priority>("suggested_priority", raw))
                .transpose()?,
            suggested_start_time: decode_clock(
                "suggested_start_time",
                self.suggested_start_time.as_deref(),
            )?,
            dependencies,
        })
    }
}

/// Every task's prerequisites, keyed by dependent task id, in set order.
pub(super) async fn dependency_map(conn: &mut SqliteConnection) -> Result<HashMap<i64, Vec<i64>>> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT task_id, depends_on_id FROM task_dependency ORDER BY task_id, position",
    )
    .fetch_all(conn)
    .await?;

    let mut map: HashMap<i64, Vec<i64>> = HashMap::new();
    for (task_id, depends_on) in rows {
        map.entry(task_id).or_default().push(depends_on);
    }
    Ok(map)
}

/// Attach prerequisites to a batch of rows.
pub(super) fn assemble(
    rows: Vec<TaskRow>,
    mut dependencies: HashMap<i64, Vec<i64>>,
) -> Result<Vec<Task>> {
    rows.into_iter()
        .map(|row| {
            let deps = dependencies.remove(&row.id()).unwrap_or_default();
            row.into_task(deps)
        })
        .collect()
}

/// Remove a task together with its plan entries and its own prerequisite rows.
///
/// Rows naming the task as someone else's prerequisite are left in place.
pub(super) async fn delete_task_rows(conn: &mut SqliteConnection, id: i64) -> Result<u64> {
    sqlx::query("DELETE FROM today_task WHERE task_id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM task_dependency WHERE task_id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    let result = sqlx::query("DELETE FROM task WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Load one task with its prerequisites on `conn`.
async fn fetch_task(conn: &mut SqliteConnection, id: i64) -> Result<Task> {
    let row: Option<TaskRow> =
        sqlx::query_as(&format!("SELECT {TASK_COLUMNS} FROM task WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    let row = row.ok_or_else(|| not_found(id))?;

    let deps: Vec<(i64,)> = sqlx::query_as(
        "SELECT depends_on_id FROM task_dependency WHERE task_id = ?1 ORDER BY position",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;
    row.into_task(deps.into_iter().map(|(d,)| d).collect())
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("task {id} not found"))
}

impl TaskRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new open task.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the database insert fails.
    pub async fn create(&self, task: &NewTask) -> Result<Task> {
        let created_at = encode_ts(&now_local());
        let result = sqlx::query(
            "INSERT INTO task (title, description, due_date, priority, time_required, category, completed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(encode_ts(&task.due_date))
        .bind(task.priority.as_str())
        .bind(task.effort.to_string())
        .bind(&task.category)
        .bind(&created_at)
        .execute(self.db.as_ref())
        .await?;

        self.get(result.last_insert_rowid()).await
    }

    /// Retrieve a task by identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the task does not exist.
    pub async fn get(&self, id: i64) -> Result<Task> {
        let mut conn = self.db.acquire().await?;
        fetch_task(&mut *conn, id).await
    }

    /// List every task ordered by due date.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Task>> {
        self.list_where("1 = 1").await
    }

    /// List tasks that are not completed, ordered by due date.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_pending(&self) -> Result<Vec<Task>> {
        self.list_where("task.completed = 0").await
    }

    async fn list_where(&self, predicate: &str) -> Result<Vec<Task>> {
        let mut conn = self.db.acquire().await?;
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM task WHERE {predicate} ORDER BY task.due_date ASC, task.id ASC"
        ))
        .fetch_all(&mut *conn)
        .await?;
        let deps = dependency_map(&mut *conn).await?;
        assemble(rows, deps)
    }

    /// Apply a partial update and return the updated task.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the task does not exist.
    pub async fn update(&self, id: i64, changes: TaskChanges) -> Result<Task> {
        if changes.is_empty() {
            return self.get(id).await;
        }

        let mut tx = self.db.begin().await?;
        // Absent fields keep their stored value.
        let result = sqlx::query(
            "UPDATE task SET title = COALESCE(?1, title), description = COALESCE(?2, description),
                 due_date = COALESCE(?3, due_date), priority = COALESCE(?4, priority),
                 time_required = COALESCE(?5, time_required), category = COALESCE(?6, category)
             WHERE id = ?7",
        )
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.due_date.as_ref().map(encode_ts))
        .bind(changes.priority.map(Priority::as_str))
        .bind(changes.effort.map(|effort| effort.to_string()))
        .bind(changes.category)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        let task = fetch_task(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(task)
    }

    /// Delete a task, its plan entries, and its prerequisite list.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the task does not exist.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.db.begin().await?;
        if delete_task_rows(&mut *tx, id).await? == 0 {
            return Err(not_found(id));
        }
        tx.commit().await?;
        Ok(())
    }

    /// Flip the completion flag; completing stamps `completed_at` with
    /// `now`, reopening clears it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the task does not exist.
    pub async fn toggle_complete(&self, id: i64, now: NaiveDateTime) -> Result<Task> {
        let task = self.get(id).await?;
        let completed_at = (!task.completed).then(|| encode_ts(&now));
        sqlx::query("UPDATE task SET completed = ?1, completed_at = ?2 WHERE id = ?3")
            .bind(i64::from(!task.completed))
            .bind(completed_at)
            .bind(id)
            .execute(self.db.as_ref())
            .await?;
        self.get(id).await
    }

    /// Mark a task completed at `now`; already-completed tasks keep their
    /// original completion time.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the task does not exist.
    pub async fn mark_complete(&self, id: i64, now: NaiveDateTime) -> Result<Task> {
        let result = sqlx::query(
            "UPDATE task SET completed = 1, completed_at = COALESCE(completed_at, ?1) WHERE id = ?2",
        )
        .bind(encode_ts(&now))
        .bind(id)
        .execute(self.db.as_ref())
        .await?;
        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        self.get(id).await
    }

    /// Record that work on a task began at `now`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the task does not exist.
    pub async fn start(&self, id: i64, now: NaiveDateTime) -> Result<Task> {
        let result = sqlx::query("UPDATE task SET started_at = ?1 WHERE id = ?2")
            .bind(encode_ts(&now))
            .bind(id)
            .execute(self.db.as_ref())
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        self.get(id).await
    }

    /// Replace a task's prerequisites. Repeated ids are collapsed to their
    /// first occurrence.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the task lists itself,
    /// `AppError::NotFound` if the task or any prerequisite does not exist.
    pub async fn set_dependencies(&self, id: i64, depends_on: &[i64]) -> Result<Task> {
        if depends_on.contains(&id) {
            return Err(AppError::Validation(format!("task {id} cannot depend on itself")));
        }
        let mut ordered: Vec<i64> = Vec::with_capacity(depends_on.len());
        for dep in depends_on {
            if !ordered.contains(dep) {
                ordered.push(*dep);
            }
        }

        let mut tx = self.db.begin().await?;
        for task_id in std::iter::once(&id).chain(&ordered) {
            let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM task WHERE id = ?1")
                .bind(task_id)
                .fetch_optional(&mut *tx)
                .await?;
            if exists.is_none() {
                return Err(not_found(*task_id));
            }
        }

        sqlx::query("DELETE FROM task_dependency WHERE task_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for (position, dep) in (0_i64..).zip(&ordered) {
            sqlx::query(
                "INSERT INTO task_dependency (task_id, depends_on_id, position) VALUES (?1, ?2, ?3)",
            )
            .bind(id)
            .bind(dep)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        self.get(id).await
    }

    /// Store the planning agent's advisory priority and/or start time.
    /// Absent fields keep their current value.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the task does not exist.
    pub async fn set_suggestions(&self, id: i64, suggestions: Suggestions) -> Result<Task> {
        let result = sqlx::query(
            "UPDATE task SET
                 suggested_priority = COALESCE(?1, suggested_priority),
                 suggested_start_time = COALESCE(?2, suggested_start_time)
             WHERE id = ?3",
        )
        .bind(suggestions.priority.map(Priority::as_str))
        .bind(suggestions.start_time.map(|t| t.format("%H:%M:%S").to_string()))
        .bind(id)
        .execute(self.db.as_ref())
        .await?;
        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        self.get(id).await
    }
}
