//! Today's plan tools.

use std::sync::Arc;

use rmcp::handler::server::tool::ToolCallContext;
use rmcp::model::CallToolResult;
use serde::Deserialize;
use tracing::{info, info_span, Instrument};

use super::util::{json_result, parse_args, tool_error};
use crate::mcp::handler::PlannerServer;
use crate::models::time::parse_date;
use crate::persistence::today_repo::TodayRepo;

#[derive(Debug, Default, Deserialize)]
struct DayInput {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SetTodayInput {
    task_ids: Vec<i64>,
    date: Option<String>,
}

/// Handle `get_today_tasks`.
///
/// # Errors
///
/// Returns `invalid_params` for a malformed date.
pub async fn get(
    context: ToolCallContext<'_, PlannerServer>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let state = Arc::clone(context.service.state());
    let input: DayInput = parse_args("get_today_tasks", context.arguments)?;
    let span = info_span!("get_today_tasks");

    async move {
        let day = match input.date.as_deref() {
            Some(raw) => parse_date(raw).map_err(|e| tool_error(&e))?,
            None => state.today(),
        };
        let tasks = TodayRepo::new(Arc::clone(&state.db))
            .list_for_day(day)
            .await
            .map_err(|e| tool_error(&e))?;
        json_result(
            "get_today_tasks",
            &serde_json::json!({ "date": day, "tasks": tasks }),
        )
    }
    .instrument(span)
    .await
}

/// Handle `set_today_tasks`.
///
/// # Errors
///
/// Returns `invalid_params` for a malformed date and `internal_error` if
/// the replacement transaction fails.
pub async fn set(
    context: ToolCallContext<'_, PlannerServer>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let state = Arc::clone(context.service.state());
    let input: SetTodayInput = parse_args("set_today_tasks", context.arguments)?;
    let span = info_span!("set_today_tasks", requested = input.task_ids.len());

    async move {
        let day = match input.date.as_deref() {
            Some(raw) => parse_date(raw).map_err(|e| tool_error(&e))?,
            None => state.today(),
        };
        let outcome = TodayRepo::new(Arc::clone(&state.db))
            .replace_for_day(day, &input.task_ids)
            .await
            .map_err(|e| tool_error(&e))?;
        info!(
            assigned = outcome.assigned,
            skipped = outcome.skipped.len(),
            "today plan replaced"
        );
        json_result(
            "set_today_tasks",
            &serde_json::json!({
                "date": day,
                "assigned": outcome.assigned,
                "skipped": outcome.skipped,
            }),
        )
    }
    .instrument(span)
    .await
}
