//! `/tasks` routes: CRUD, completion, dependencies, today's plan, archive.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use super::SharedState;
use crate::models::task::{SuggestionPatch, TaskDraft, TaskPatch};
use crate::models::time::now_local;
use crate::models::today::PlanReplacement;
use crate::models::{ArchivedTask, PlannedTask, Task};
use crate::persistence::archive_repo::ArchiveRepo;
use crate::persistence::task_repo::TaskRepo;
use crate::persistence::today_repo::TodayRepo;
use crate::Result;

/// Body of `PUT /tasks/{id}/dependencies`.
#[derive(Debug, Deserialize)]
pub struct DependenciesBody {
    /// Prerequisite ids, in order.
    pub depends_on: Vec<i64>,
}

/// Body of `PUT /tasks/today`.
#[derive(Debug, Deserialize)]
pub struct TodayBody {
    /// Task ids, highest priority first.
    pub task_ids: Vec<i64>,
}

pub(super) fn routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/today", get(today).put(set_today))
        .route("/archived", get(archived))
        .route("/cleanup", post(cleanup))
        .route("/{id}", get(fetch).patch(update).delete(remove))
        .route("/{id}/complete", patch(toggle_complete))
        .route("/{id}/start", post(start))
        .route("/{id}/dependencies", put(set_dependencies))
        .route("/{id}/suggestions", patch(set_suggestions))
}

fn repo(state: &SharedState) -> TaskRepo {
    TaskRepo::new(Arc::clone(&state.db))
}

async fn list(State(state): State<SharedState>) -> Result<Json<Vec<Task>>> {
    Ok(Json(repo(&state).list_all().await?))
}

async fn create(
    State(state): State<SharedState>,
    Json(draft): Json<TaskDraft>,
) -> Result<(StatusCode, Json<Task>)> {
    let task = repo(&state).create(&draft.validate()?).await?;
    info!(task_id = task.id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

async fn fetch(State(state): State<SharedState>, Path(id): Path<i64>) -> Result<Json<Task>> {
    Ok(Json(repo(&state).get(id).await?))
}

async fn update(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>> {
    Ok(Json(repo(&state).update(id, patch.validate()?).await?))
}

async fn remove(State(state): State<SharedState>, Path(id): Path<i64>) -> Result<StatusCode> {
    repo(&state).delete(id).await?;
    info!(task_id = id, "task deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_complete(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Task>> {
    Ok(Json(repo(&state).toggle_complete(id, now_local()).await?))
}

async fn start(State(state): State<SharedState>, Path(id): Path<i64>) -> Result<Json<Task>> {
    Ok(Json(repo(&state).start(id, now_local()).await?))
}

async fn set_dependencies(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(body): Json<DependenciesBody>,
) -> Result<Json<Task>> {
    Ok(Json(repo(&state).set_dependencies(id, &body.depends_on).await?))
}

async fn set_suggestions(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(patch): Json<SuggestionPatch>,
) -> Result<Json<Task>> {
    Ok(Json(repo(&state).set_suggestions(id, patch.validate()?).await?))
}

async fn today(State(state): State<SharedState>) -> Result<Json<Vec<PlannedTask>>> {
    let plan = TodayRepo::new(Arc::clone(&state.db))
        .list_for_day(state.today())
        .await?;
    Ok(Json(plan))
}

async fn set_today(
    State(state): State<SharedState>,
    Json(body): Json<TodayBody>,
) -> Result<Json<PlanReplacement>> {
    let outcome = TodayRepo::new(Arc::clone(&state.db))
        .replace_for_day(state.today(), &body.task_ids)
        .await?;
    info!(assigned = outcome.assigned, skipped = outcome.skipped.len(), "today plan replaced");
    Ok(Json(outcome))
}

async fn archived(State(state): State<SharedState>) -> Result<Json<Vec<ArchivedTask>>> {
    Ok(Json(
        ArchiveRepo::new(Arc::clone(&state.db))
            .list_newest_first()
            .await?,
    ))
}

async fn cleanup(State(state): State<SharedState>) -> Result<Json<serde_json::Value>> {
    let archived = ArchiveRepo::new(Arc::clone(&state.db))
        .cleanup(state.today(), now_local())
        .await?;
    Ok(Json(serde_json::json!({ "archived": archived })))
}
