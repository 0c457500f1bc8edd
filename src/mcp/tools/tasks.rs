//! Task tools: listing, lookup, creation, completion, start tracking,
//! dependencies, suggestions, and archival.

use std::sync::Arc;

use rmcp::handler::server::tool::ToolCallContext;
use rmcp::model::CallToolResult;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, Instrument};

use super::util::{json_result, parse_args, tool_error};
use crate::mcp::handler::PlannerServer;
use crate::models::task::{SuggestionPatch, TaskDraft};
use crate::models::time::now_local;
use crate::models::Task;
use crate::persistence::archive_repo::ArchiveRepo;
use crate::persistence::task_repo::TaskRepo;
use crate::persistence::today_repo::TodayRepo;
use crate::scheduling::dependencies::blocking_prerequisites;
use crate::scheduling::PlannerStore;

/// An open task annotated for the planning agent.
#[derive(Debug, Serialize)]
struct TaskView {
    #[serde(flatten)]
    task: Task,
    /// Was on an earlier day's plan and is still open.
    carried_over: bool,
    /// Waiting on an open prerequisite.
    blocked: bool,
    /// Open direct prerequisites, in dependency order.
    blocked_by: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct TaskIdInput {
    task_id: i64,
}

#[derive(Debug, Deserialize)]
struct DependenciesInput {
    task_id: i64,
    depends_on: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct SuggestionsInput {
    task_id: i64,
    #[serde(flatten)]
    patch: SuggestionPatch,
}

/// Handle `get_all_tasks`.
///
/// # Errors
///
/// Returns `rmcp::ErrorData` on persistence failures.
pub async fn get_all(
    context: ToolCallContext<'_, PlannerServer>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let state = Arc::clone(context.service.state());
    let span = info_span!("get_all_tasks");

    async move {
        let pending = state
            .store()
            .list_pending()
            .await
            .map_err(|e| tool_error(&e))?;
        let carried = TodayRepo::new(Arc::clone(&state.db))
            .carried_over_ids(state.today())
            .await
            .map_err(|e| tool_error(&e))?;

        // Completed prerequisites are absent from `pending` and so never block.
        let tasks: Vec<TaskView> = pending
            .iter()
            .map(|task| {
                let blocked_by = blocking_prerequisites(task, &pending);
                TaskView {
                    carried_over: carried.contains(&task.id),
                    blocked: !blocked_by.is_empty(),
                    blocked_by,
                    task: task.clone(),
                }
            })
            .collect();

        info!(count = tasks.len(), "listed open tasks");
        json_result("get_all_tasks", &serde_json::json!({ "tasks": tasks }))
    }
    .instrument(span)
    .await
}

/// Handle `get_task_by_id`.
///
/// # Errors
///
/// Returns `invalid_params` for unknown ids.
pub async fn get_by_id(
    context: ToolCallContext<'_, PlannerServer>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let state = Arc::clone(context.service.state());
    let input: TaskIdInput = parse_args("get_task_by_id", context.arguments)?;
    let span = info_span!("get_task_by_id", task_id = input.task_id);

    async move {
        let task = state
            .store()
            .get_task(input.task_id)
            .await
            .map_err(|e| tool_error(&e))?;
        json_result("get_task_by_id", &task)
    }
    .instrument(span)
    .await
}

/// Handle `add_task`.
///
/// # Errors
///
/// Returns `invalid_params` for malformed fields.
pub async fn add(
    context: ToolCallContext<'_, PlannerServer>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let state = Arc::clone(context.service.state());
    let draft: TaskDraft = parse_args("add_task", context.arguments)?;
    let span = info_span!("add_task", category = %draft.category);

    async move {
        let new_task = draft.validate().map_err(|e| tool_error(&e))?;
        let task = TaskRepo::new(Arc::clone(&state.db))
            .create(&new_task)
            .await
            .map_err(|e| tool_error(&e))?;
        info!(task_id = task.id, "task created");
        json_result("add_task", &task)
    }
    .instrument(span)
    .await
}

/// Handle `mark_task_complete`.
///
/// # Errors
///
/// Returns `invalid_params` for unknown ids.
pub async fn mark_complete(
    context: ToolCallContext<'_, PlannerServer>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let state = Arc::clone(context.service.state());
    let input: TaskIdInput = parse_args("mark_task_complete", context.arguments)?;
    let span = info_span!("mark_task_complete", task_id = input.task_id);

    async move {
        let task = TaskRepo::new(Arc::clone(&state.db))
            .mark_complete(input.task_id, now_local())
            .await
            .map_err(|e| tool_error(&e))?;
        info!("task completed");
        json_result("mark_task_complete", &task)
    }
    .instrument(span)
    .await
}

/// Handle `start_task`.
///
/// # Errors
///
/// Returns `invalid_params` for unknown ids.
pub async fn start(
    context: ToolCallContext<'_, PlannerServer>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let state = Arc::clone(context.service.state());
    let input: TaskIdInput = parse_args("start_task", context.arguments)?;
    let span = info_span!("start_task", task_id = input.task_id);

    async move {
        let task = TaskRepo::new(Arc::clone(&state.db))
            .start(input.task_id, now_local())
            .await
            .map_err(|e| tool_error(&e))?;
        json_result("start_task", &task)
    }
    .instrument(span)
    .await
}

/// Handle `set_task_dependencies`.
///
/// # Errors
///
/// Returns `invalid_params` for unknown ids or a self-reference.
pub async fn set_dependencies(
    context: ToolCallContext<'_, PlannerServer>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let state = Arc::clone(context.service.state());
    let input: DependenciesInput = parse_args("set_task_dependencies", context.arguments)?;
    let span = info_span!(
        "set_task_dependencies",
        task_id = input.task_id,
        count = input.depends_on.len()
    );

    async move {
        let task = TaskRepo::new(Arc::clone(&state.db))
            .set_dependencies(input.task_id, &input.depends_on)
            .await
            .map_err(|e| tool_error(&e))?;
        json_result("set_task_dependencies", &task)
    }
    .instrument(span)
    .await
}

/// Handle `set_task_suggestions`.
///
/// # Errors
///
/// Returns `invalid_params` for unknown ids or malformed values.
pub async fn set_suggestions(
    context: ToolCallContext<'_, PlannerServer>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let state = Arc::clone(context.service.state());
    let input: SuggestionsInput = parse_args("set_task_suggestions", context.arguments)?;
    let span = info_span!("set_task_suggestions", task_id = input.task_id);

    async move {
        let suggestions = input.patch.validate().map_err(|e| tool_error(&e))?;
        let task = TaskRepo::new(Arc::clone(&state.db))
            .set_suggestions(input.task_id, suggestions)
            .await
            .map_err(|e| tool_error(&e))?;
        json_result("set_task_suggestions", &task)
    }
    .instrument(span)
    .await
}

/// Handle `cleanup_completed_tasks`.
///
/// # Errors
///
/// Returns `internal_error` if the archival transaction fails.
pub async fn cleanup(
    context: ToolCallContext<'_, PlannerServer>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let state = Arc::clone(context.service.state());
    let span = info_span!("cleanup_completed_tasks");

    async move {
        let archived = ArchiveRepo::new(Arc::clone(&state.db))
            .cleanup(state.today(), now_local())
            .await
            .map_err(|e| tool_error(&e))?;
        json_result(
            "cleanup_completed_tasks",
            &serde_json::json!({ "archived": archived }),
        )
    }
    .instrument(span)
    .await
}
