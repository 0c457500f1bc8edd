//! `/analytics` routes: the scheduling engine and calendar sources.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::SharedState;
use crate::models::calendar::CalendarSourceDraft;
use crate::models::time::now_local;
use crate::models::CalendarSource;
use crate::persistence::calendar_repo::CalendarRepo;
use crate::scheduling::calendar::test_source;
use crate::scheduling::context::FreeSlotReport;
use crate::scheduling::patterns::{
    completion_patterns, estimation_accuracy, priority_suggestion, PrioritySuggestion,
};
use crate::scheduling::{
    build_context, free_slot_report, PlannerStore, SchedulingContext, SlotParams,
};
use crate::Result;

/// Query of `GET /analytics/priority-patterns`.
#[derive(Debug, Deserialize)]
pub struct PriorityQuery {
    /// Category to look up.
    pub category: String,
    /// Optional title/description filter.
    pub keyword: Option<String>,
}

pub(super) fn routes() -> Router<SharedState> {
    Router::new()
        .route("/calendar-free-slots", get(free_slots))
        .route("/scheduling-context", get(scheduling_context))
        .route("/estimation-accuracy", get(accuracy))
        .route("/priority-patterns", get(priority_patterns))
        .route("/completion-patterns", get(completion))
        .route("/calendar", get(list_sources).post(add_source))
        .route("/calendar/{id}", delete(remove_source))
        .route("/calendar/{id}/test", post(check_source))
}

async fn free_slots(
    State(state): State<SharedState>,
    Query(params): Query<SlotParams>,
) -> Result<Json<FreeSlotReport>> {
    params.require_dates()?;
    let query = params.resolve(&state.config.schedule, state.today())?;
    let report = free_slot_report(
        &state.store(),
        state.fetcher.as_ref(),
        query,
        state.config.fetch_timeout(),
    )
    .await?;
    Ok(Json(report))
}

async fn scheduling_context(
    State(state): State<SharedState>,
    Query(params): Query<SlotParams>,
) -> Result<Json<SchedulingContext>> {
    let query = params.resolve(&state.config.schedule, state.today())?;
    let context = build_context(
        &state.store(),
        state.fetcher.as_ref(),
        query,
        state.config.fetch_timeout(),
    )
    .await;
    Ok(Json(context))
}

async fn accuracy(State(state): State<SharedState>) -> Result<Json<Value>> {
    let archive = state.store().list_archived().await?;
    Ok(Json(json!({ "accuracy_by_category": estimation_accuracy(&archive) })))
}

async fn priority_patterns(
    State(state): State<SharedState>,
    Query(query): Query<PriorityQuery>,
) -> Result<Json<PrioritySuggestion>> {
    let archive = state.store().list_archived().await?;
    Ok(Json(priority_suggestion(
        &archive,
        &query.category,
        query.keyword.as_deref(),
    )))
}

async fn completion(State(state): State<SharedState>) -> Result<Json<Value>> {
    let archive = state.store().list_archived().await?;
    Ok(Json(json!({ "completion_patterns": completion_patterns(&archive) })))
}

fn calendars(state: &SharedState) -> CalendarRepo {
    CalendarRepo::new(Arc::clone(&state.db))
}

async fn list_sources(State(state): State<SharedState>) -> Result<Json<Vec<CalendarSource>>> {
    Ok(Json(calendars(&state).list().await?))
}

async fn add_source(
    State(state): State<SharedState>,
    Json(draft): Json<CalendarSourceDraft>,
) -> Result<(StatusCode, Json<CalendarSource>)> {
    let source = calendars(&state).create(&draft.validate()?).await?;
    info!(source_id = source.id, kind = source.source_type.as_str(), "calendar source added");
    Ok((StatusCode::CREATED, Json(source)))
}

async fn remove_source(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    calendars(&state).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn check_source(State(state): State<SharedState>, Path(id): Path<i64>) -> Result<Json<Value>> {
    let repo = calendars(&state);
    let source = repo.get(id).await?;
    let event_count = test_source(
        state.fetcher.as_ref(),
        &source,
        state.config.fetch_timeout(),
    )
    .await?;
    let source = repo.mark_synced(id, now_local()).await?;
    info!(source_id = id, event_count, "calendar source verified");
    Ok(Json(json!({ "source": source, "event_count": event_count })))
}
