//! MCP server handler, shared application state, and tool router.

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use rmcp::handler::server::{
    tool::{ToolCallContext, ToolRoute, ToolRouter},
    ServerHandler,
};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, ListToolsResult, PaginatedRequestParam,
    ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use tracing::info_span;

use crate::config::GlobalConfig;
use crate::models::time::now_local;
use crate::persistence::db::Database;
use crate::persistence::store::SqliteStore;
use crate::scheduling::FeedFetcher;

use super::tools;

/// Shared application state used by MCP tool handlers and HTTP routes.
pub struct AppState {
    /// Global configuration.
    pub config: Arc<GlobalConfig>,
    /// `SQLite` connection pool.
    pub db: Arc<Database>,
    /// Calendar feed reader.
    pub fetcher: Arc<dyn FeedFetcher>,
}

impl AppState {
    /// Read-side view over the database for the scheduling engine.
    #[must_use]
    pub fn store(&self) -> SqliteStore {
        SqliteStore::new(Arc::clone(&self.db))
    }

    /// Today's date in local time.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        now_local().date()
    }
}

/// MCP server exposing the planner's task and scheduling tools.
pub struct PlannerServer {
    state: Arc<AppState>,
}

impl PlannerServer {
    /// Create a new MCP server bound to shared application state.
    #[must_use]
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Access the shared application state.
    #[must_use]
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    #[allow(clippy::too_many_lines)] // One arm per tool.
    fn tool_router() -> ToolRouter<Self> {
        let mut router = ToolRouter::new();

        for tool in Self::all_tools() {
            let name = tool.name.to_string();
            match name.as_str() {
                "get_all_tasks" => {
                    router.add_route(ToolRoute::new_dyn(tool, |context| {
                        Box::pin(tools::tasks::get_all(context))
                    }));
                }
                "get_task_by_id" => {
                    router.add_route(ToolRoute::new_dyn(tool, |context| {
                        Box::pin(tools::tasks::get_by_id(context))
                    }));
                }
                "add_task" => {
                    router.add_route(ToolRoute::new_dyn(tool, |context| {
                        Box::pin(tools::tasks::add(context))
                    }));
                }
                "mark_task_complete" => {
                    router.add_route(ToolRoute::new_dyn(tool, |context| {
                        Box::pin(tools::tasks::mark_complete(context))
                    }));
                }
                "start_task" => {
                    router.add_route(ToolRoute::new_dyn(tool, |context| {
                        Box::pin(tools::tasks::start(context))
                    }));
                }
                "set_task_dependencies" => {
                    router.add_route(ToolRoute::new_dyn(tool, |context| {
                        Box::pin(tools::tasks::set_dependencies(context))
                    }));
                }
                "set_task_suggestions" => {
                    router.add_route(ToolRoute::new_dyn(tool, |context| {
                        Box::pin(tools::tasks::set_suggestions(context))
                    }));
                }
                "cleanup_completed_tasks" => {
                    router.add_route(ToolRoute::new_dyn(tool, |context| {
                        Box::pin(tools::tasks::cleanup(context))
                    }));
                }
                "get_today_tasks" => {
                    router.add_route(ToolRoute::new_dyn(tool, |context| {
                        Box::pin(tools::today::get(context))
                    }));
                }
                "set_today_tasks" => {
                    router.add_route(ToolRoute::new_dyn(tool, |context| {
                        Box::pin(tools::today::set(context))
                    }));
                }
                "get_scheduling_context" => {
                    router.add_route(ToolRoute::new_dyn(tool, |context| {
                        Box::pin(tools::analytics::scheduling_context(context))
                    }));
                }
                "get_free_slots" => {
                    router.add_route(ToolRoute::new_dyn(tool, |context| {
                        Box::pin(tools::analytics::free_slots(context))
                    }));
                }
                "get_estimation_accuracy" => {
                    router.add_route(ToolRoute::new_dyn(tool, |context| {
                        Box::pin(tools::analytics::estimation_accuracy(context))
                    }));
                }
                "get_priority_patterns" => {
                    router.add_route(ToolRoute::new_dyn(tool, |context| {
                        Box::pin(tools::analytics::priority_patterns(context))
                    }));
                }
                "get_completion_patterns" => {
                    router.add_route(ToolRoute::new_dyn(tool, |context| {
                        Box::pin(tools::analytics::completion_patterns(context))
                    }));
                }
                _ => {
                    router.add_route(ToolRoute::new_dyn(tool, |_context| {
                        Box::pin(async {
                            Err(rmcp::ErrorData::internal_error(
                                "tool not implemented",
                                None,
                            ))
                        })
                    }));
                }
            }
        }

        router
    }

    /// Convert a `serde_json::Value::Object` into the `Arc<Map>` expected by `Tool`.
    fn schema(value: serde_json::Value) -> Arc<serde_json::Map<String, serde_json::Value>> {
        match value {
            serde_json::Value::Object(map) => Arc::new(map),
            _ => Arc::new(serde_json::Map::default()),
        }
    }

    fn no_args() -> Arc<serde_json::Map<String, serde_json::Value>> {
        Self::schema(serde_json::json!({ "type": "object", "properties": {} }))
    }

    fn task_id_only() -> Arc<serde_json::Map<String, serde_json::Value>> {
        Self::schema(serde_json::json!({
            "type": "object",
            "properties": { "task_id": { "type": "integer" } },
            "required": ["task_id"]
        }))
    }

    fn slot_properties() -> serde_json::Map<String, serde_json::Value> {
        let value = serde_json::json!({
            "start_date": { "type": "string", "description": "YYYY-MM-DD, defaults to today" },
            "end_date": { "type": "string", "description": "YYYY-MM-DD (exclusive), defaults to a week after start_date" },
            "work_start": { "type": "string", "description": "HH:MM" },
            "work_end": { "type": "string", "description": "HH:MM" }
        });
        match value {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::default(),
        }
    }

    #[allow(clippy::too_many_lines)] // Tool definitions are intentionally verbose for clarity.
    fn all_tools() -> Vec<Tool> {
        let context_props = Self::slot_properties();
        let mut free_slot_props = Self::slot_properties();
        free_slot_props.insert(
            "min_gap_minutes".into(),
            serde_json::json!({ "type": "integer", "minimum": 1 }),
        );

        vec![
            Tool::new(
                "get_all_tasks",
                "List every open task with its dependencies, whether it was carried over \
                 from an earlier day's plan, and which open prerequisites block it.",
                Self::no_args(),
            ),
            Tool::new(
                "get_today_tasks",
                "Return the ordered plan for today (or the given date).",
                Self::schema(serde_json::json!({
                    "type": "object",
                    "properties": { "date": { "type": "string", "description": "YYYY-MM-DD" } }
                })),
            ),
            Tool::new(
                "set_today_tasks",
                "Replace today's plan with the given task ids, highest priority first. \
                 Unknown, completed, and repeated ids are skipped.",
                Self::schema(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "task_ids": { "type": "array", "items": { "type": "integer" } },
                        "date": { "type": "string", "description": "YYYY-MM-DD" }
                    },
                    "required": ["task_ids"]
                })),
            ),
            Tool::new("get_task_by_id", "Fetch one task.", Self::task_id_only()),
            Tool::new(
                "mark_task_complete",
                "Mark a task completed now.",
                Self::task_id_only(),
            ),
            Tool::new(
                "add_task",
                "Create a task.",
                Self::schema(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "description": { "type": "string" },
                        "due_date": { "type": "string", "description": "YYYY-MM-DD HH:MM:SS" },
                        "priority": { "type": "string", "enum": ["S", "A", "B", "C", "D"], "default": "B" },
                        "time_required": { "type": "string", "description": "HH:MM:SS", "default": "00:30:00" },
                        "category": { "type": "string" }
                    },
                    "required": ["title", "due_date", "category"]
                })),
            ),
            Tool::new(
                "start_task",
                "Record that work on a task has begun; used to measure actual duration.",
                Self::task_id_only(),
            ),
            Tool::new(
                "set_task_dependencies",
                "Replace the list of tasks that must be completed before this one.",
                Self::schema(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "task_id": { "type": "integer" },
                        "depends_on": { "type": "array", "items": { "type": "integer" } }
                    },
                    "required": ["task_id", "depends_on"]
                })),
            ),
            Tool::new(
                "set_task_suggestions",
                "Store an advisory priority and/or start time for a task.",
                Self::schema(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "task_id": { "type": "integer" },
                        "suggested_priority": { "type": "string", "enum": ["S", "A", "B", "C", "D"] },
                        "suggested_start_time": { "type": "string", "description": "HH:MM:SS" }
                    },
                    "required": ["task_id"]
                })),
            ),
            Tool::new(
                "cleanup_completed_tasks",
                "Archive completed tasks that are not on today's plan.",
                Self::no_args(),
            ),
            Tool::new(
                "get_scheduling_context",
                "Completion-hour patterns, estimation multipliers, blocked task ids, and \
                 calendar free slots in one call. Consult before setting today's plan.",
                Self::schema(serde_json::json!({
                    "type": "object",
                    "properties": context_props
                })),
            ),
            Tool::new(
                "get_free_slots",
                "Free gaps inside the work window across all calendar sources.",
                Self::schema(serde_json::json!({
                    "type": "object",
                    "properties": free_slot_props
                })),
            ),
            Tool::new(
                "get_estimation_accuracy",
                "Per-category estimated versus actual minutes and a suggested multiplier.",
                Self::no_args(),
            ),
            Tool::new(
                "get_priority_patterns",
                "Suggest a priority for new work from archived tasks in the same category.",
                Self::schema(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "category": { "type": "string" },
                        "keyword": { "type": "string" }
                    },
                    "required": ["category"]
                })),
            ),
            Tool::new(
                "get_completion_patterns",
                "Per-category histogram of the hour tasks get completed.",
                Self::no_args(),
            ),
        ]
    }

    /// Names of every registered tool, in listing order.
    #[must_use]
    pub fn tool_names() -> Vec<String> {
        Self::all_tools()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect()
    }
}

impl ServerHandler for PlannerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Task planner tools. Call get_scheduling_context before set_today_tasks.".into(),
            ),
            ..ServerInfo::default()
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, rmcp::ErrorData>> + Send + '_ {
        let router = Self::tool_router();
        let _span = info_span!("call_tool", tool = %request.name).entered();

        async move {
            router
                .call(ToolCallContext::new(self, request, context))
                .await
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, rmcp::ErrorData>> + Send + '_ {
        let tools = Self::all_tools();

        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }
}
