//! Repository for the per-day ordered plan.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::models::today::PlanReplacement;
use crate::models::PlannedTask;
use crate::Result;

use super::db::Database;
use super::task_repo::{dependency_map, TaskRow, TASK_COLUMNS};

/// Repository for `today_task` assignments.
#[derive(Clone)]
pub struct TodayRepo {
    db: Arc<Database>,
}

/// Plan row joined with its task.
#[derive(sqlx::FromRow)]
struct PlannedRow {
    rank: i64,
    #[sqlx(flatten)]
    task: TaskRow,
}

fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

impl TodayRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Atomically replace the plan for `day` with `task_ids`, in order.
    ///
    /// Unknown and completed tasks are skipped, as are repeats of an id
    /// already placed. Ranks are contiguous from 1 over the accepted tasks.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the transaction fails; the previous plan
    /// is then left untouched.
    pub async fn replace_for_day(&self, day: NaiveDate, task_ids: &[i64]) -> Result<PlanReplacement> {
        let key = day_key(day);
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM today_task WHERE day = ?1")
            .bind(&key)
            .execute(&mut *tx)
            .await?;

        let mut outcome = PlanReplacement::default();
        let mut placed: HashSet<i64> = HashSet::new();
        for &task_id in task_ids {
            if placed.contains(&task_id) {
                outcome.skipped.push(task_id);
                continue;
            }
            let completed: Option<(i64,)> = sqlx::query_as("SELECT completed FROM task WHERE id = ?1")
                .bind(task_id)
                .fetch_optional(&mut *tx)
                .await?;
            if !matches!(completed, Some((0,))) {
                outcome.skipped.push(task_id);
                continue;
            }

            let rank = i64::try_from(outcome.assigned + 1).unwrap_or(i64::MAX);
            sqlx::query("INSERT INTO today_task (task_id, day, rank) VALUES (?1, ?2, ?3)")
                .bind(task_id)
                .bind(&key)
                .bind(rank)
                .execute(&mut *tx)
                .await?;
            placed.insert(task_id);
            outcome.assigned += 1;
        }

        tx.commit().await?;
        debug!(day = %key, assigned = outcome.assigned, skipped = outcome.skipped.len(), "replaced today plan");
        Ok(outcome)
    }

    /// The plan for `day`, in rank order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_for_day(&self, day: NaiveDate) -> Result<Vec<PlannedTask>> {
        let mut conn = self.db.acquire().await?;
        let rows: Vec<PlannedRow> = sqlx::query_as(&format!(
            "SELECT today_task.rank AS rank, {TASK_COLUMNS}
             FROM today_task JOIN task ON task.id = today_task.task_id
             WHERE today_task.day = ?1
             ORDER BY today_task.rank ASC"
        ))
        .bind(day_key(day))
        .fetch_all(&mut *conn)
        .await?;
        let mut deps = dependency_map(&mut *conn).await?;

        rows.into_iter()
            .map(|row| {
                let dependencies = deps.remove(&row.task.id()).unwrap_or_default();
                Ok(PlannedTask {
                    order: u32::try_from(row.rank).unwrap_or(u32::MAX),
                    task: row.task.into_task(dependencies)?,
                })
            })
            .collect()
    }

    /// Open tasks that appeared in the plan of some day before `today`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn carried_over_ids(&self, today: NaiveDate) -> Result<HashSet<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT DISTINCT today_task.task_id
             FROM today_task JOIN task ON task.id = today_task.task_id
             WHERE today_task.day < ?1 AND task.completed = 0",
        )
        .bind(day_key(today))
        .fetch_all(self.db.as_ref())
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
