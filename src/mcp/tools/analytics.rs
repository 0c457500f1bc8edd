//! Scheduling and history tools consumed by the planning agent.

use std::sync::Arc;

use rmcp::handler::server::tool::ToolCallContext;
use rmcp::model::CallToolResult;
use serde::Deserialize;
use tracing::{info, info_span, Instrument};

use super::util::{json_result, parse_args, tool_error};
use crate::mcp::handler::PlannerServer;
use crate::scheduling::free_slots::total_free_minutes;
use crate::scheduling::patterns::{
    completion_patterns as completion_by_category, estimation_accuracy as accuracy_by_category,
    priority_suggestion,
};
use crate::scheduling::{build_context, free_slot_report, PlannerStore, SlotParams};

#[derive(Debug, Deserialize)]
struct PriorityInput {
    category: String,
    keyword: Option<String>,
}

/// Handle `get_scheduling_context`.
///
/// # Errors
///
/// Returns `invalid_params` for malformed slot parameters. Failures
/// while assembling the context only empty the affected part.
pub async fn scheduling_context(
    context: ToolCallContext<'_, PlannerServer>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let state = Arc::clone(context.service.state());
    let params: SlotParams = parse_args("get_scheduling_context", context.arguments)?;
    let span = info_span!("get_scheduling_context");

    async move {
        let query = params
            .resolve(&state.config.schedule, state.today())
            .map_err(|e| tool_error(&e))?;
        let store = state.store();
        let built = build_context(
            &store,
            state.fetcher.as_ref(),
            query,
            state.config.fetch_timeout(),
        )
        .await;
        info!(
            blocked = built.blocked_task_ids.len(),
            free_slots = built.calendar_free_slots.len(),
            "scheduling context assembled"
        );
        json_result("get_scheduling_context", &built)
    }
    .instrument(span)
    .await
}

/// Handle `get_free_slots`.
///
/// # Errors
///
/// Returns `invalid_params` for malformed slot parameters.
pub async fn free_slots(
    context: ToolCallContext<'_, PlannerServer>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let state = Arc::clone(context.service.state());
    let params: SlotParams = parse_args("get_free_slots", context.arguments)?;
    let span = info_span!("get_free_slots");

    async move {
        let query = params
            .resolve(&state.config.schedule, state.today())
            .map_err(|e| tool_error(&e))?;
        let store = state.store();
        let report = free_slot_report(
            &store,
            state.fetcher.as_ref(),
            query,
            state.config.fetch_timeout(),
        )
        .await
        .map_err(|e| tool_error(&e))?;
        json_result(
            "get_free_slots",
            &serde_json::json!({
                "free_slots": report.free_slots,
                "total_free_minutes": total_free_minutes(&report.free_slots),
                "sources": report.sources,
            }),
        )
    }
    .instrument(span)
    .await
}

/// Handle `get_estimation_accuracy`.
///
/// # Errors
///
/// Returns `internal_error` if the archive cannot be read.
pub async fn estimation_accuracy(
    context: ToolCallContext<'_, PlannerServer>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let state = Arc::clone(context.service.state());
    let span = info_span!("get_estimation_accuracy");

    async move {
        let archive = state
            .store()
            .list_archived()
            .await
            .map_err(|e| tool_error(&e))?;
        json_result(
            "get_estimation_accuracy",
            &serde_json::json!({ "accuracy_by_category": accuracy_by_category(&archive) }),
        )
    }
    .instrument(span)
    .await
}

/// Handle `get_priority_patterns`.
///
/// # Errors
///
/// Returns `invalid_params` when `category` is missing and
/// `internal_error` if the archive cannot be read.
pub async fn priority_patterns(
    context: ToolCallContext<'_, PlannerServer>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let state = Arc::clone(context.service.state());
    let input: PriorityInput = parse_args("get_priority_patterns", context.arguments)?;
    let span = info_span!("get_priority_patterns", category = %input.category);

    async move {
        let archive = state
            .store()
            .list_archived()
            .await
            .map_err(|e| tool_error(&e))?;
        let suggestion = priority_suggestion(&archive, &input.category, input.keyword.as_deref());
        json_result("get_priority_patterns", &suggestion)
    }
    .instrument(span)
    .await
}

/// Handle `get_completion_patterns`.
///
/// # Errors
///
/// Returns `internal_error` if the archive cannot be read.
pub async fn completion_patterns(
    context: ToolCallContext<'_, PlannerServer>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let state = Arc::clone(context.service.state());
    let span = info_span!("get_completion_patterns");

    async move {
        let archive = state
            .store()
            .list_archived()
            .await
            .map_err(|e| tool_error(&e))?;
        json_result(
            "get_completion_patterns",
            &serde_json::json!({ "completion_patterns": completion_by_category(&archive) }),
        )
    }
    .instrument(span)
    .await
}
