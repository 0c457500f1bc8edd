//! MCP tool dispatch through the streamable HTTP endpoint.
//!
//! Every request is a POST to `/mcp`; the `Mcp-Session-Id` header returned
//! by `initialize` rides on all later requests.

use chrono::Days;
use serde_json::{json, Value};
use smart_planner::mcp::handler::PlannerServer;
use smart_planner::models::time::now_local;

use super::test_helpers::{spawn_server, task_body, TestServer};

struct McpConnection {
    mcp_url: String,
    session_id: Option<String>,
    client: reqwest::Client,
    next_id: u64,
}

impl McpConnection {
    async fn open(server: &TestServer) -> Self {
        let mut conn = Self {
            mcp_url: server.url("/mcp"),
            session_id: None,
            client: reqwest::Client::new(),
            next_id: 1,
        };
        conn.handshake().await;
        conn
    }

    async fn handshake(&mut self) {
        let response = self
            .post(&json!({
                "jsonrpc": "2.0",
                "id": 0,
                "method": "initialize",
                "params": {
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": { "name": "planner-test", "version": "0.0.1" }
                }
            }))
            .await;
        self.session_id = response
            .headers()
            .get("mcp-session-id")
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned);
        let init = read_rpc(response).await;
        assert!(init.get("result").is_some(), "initialize failed: {init}");

        self.post(&json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized",
            "params": {}
        }))
        .await;
    }

    async fn post(&self, body: &Value) -> reqwest::Response {
        let mut request = self
            .client
            .post(&self.mcp_url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream")
            .body(serde_json::to_string(body).expect("serialize"));
        if let Some(sid) = &self.session_id {
            request = request.header("mcp-session-id", sid.clone());
        }
        request.send().await.expect("POST /mcp")
    }

    async fn request(&mut self, method: &str, params: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        let response = self
            .post(&json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }))
            .await;
        read_rpc(response).await
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> Value {
        self.request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await
    }

    /// Call a tool that must succeed and decode its JSON payload.
    async fn call_ok(&mut self, name: &str, arguments: Value) -> Value {
        let response = self.call_tool(name, arguments).await;
        assert!(response.get("error").is_none(), "{name} failed: {response}");
        let text = response["result"]["content"][0]["text"]
            .as_str()
            .expect("text content");
        serde_json::from_str(text).expect("tool result is JSON")
    }
}

/// The body may be plain JSON or a `text/event-stream` with one `data:` line.
async fn read_rpc(response: reqwest::Response) -> Value {
    let text = response.text().await.expect("body");
    let payload = text
        .lines()
        .find_map(|line| line.strip_prefix("data:").map(str::trim).filter(|s| !s.is_empty()))
        .map_or_else(|| text.clone(), ToOwned::to_owned);
    serde_json::from_str(&payload).unwrap_or(Value::Null)
}

#[tokio::test]
async fn lists_every_planner_tool() {
    let server = spawn_server().await;
    let mut conn = McpConnection::open(&server).await;

    let response = conn.request("tools/list", json!({})).await;
    let mut listed: Vec<String> = response["result"]["tools"]
        .as_array()
        .expect("tools array")
        .iter()
        .map(|tool| tool["name"].as_str().expect("name").to_owned())
        .collect();
    listed.sort();

    let mut expected = PlannerServer::tool_names();
    expected.sort();
    assert_eq!(listed.len(), 15);
    assert_eq!(listed, expected);
}

#[tokio::test]
async fn add_and_fetch_task() {
    let server = spawn_server().await;
    let mut conn = McpConnection::open(&server).await;

    let created = conn.call_ok("add_task", task_body("Draft slides", "Work")).await;
    let id = created["id"].as_i64().expect("id");
    assert_eq!(created["priority"], "A");

    let fetched = conn.call_ok("get_task_by_id", json!({ "task_id": id })).await;
    assert_eq!(fetched["title"], "Draft slides");

    let (status, _) = server.get_json(&format!("/tasks/{id}")).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn all_tasks_carry_blocked_and_carried_over_flags() {
    let server = spawn_server().await;
    let mut conn = McpConnection::open(&server).await;

    let prereq = conn.call_ok("add_task", task_body("Outline", "Work")).await["id"]
        .as_i64()
        .expect("id");
    let blocked = conn.call_ok("add_task", task_body("Write", "Work")).await["id"]
        .as_i64()
        .expect("id");
    conn.call_ok(
        "set_task_dependencies",
        json!({ "task_id": blocked, "depends_on": [prereq] }),
    )
    .await;

    let yesterday = now_local().date() - Days::new(1);
    let outcome = conn
        .call_ok(
            "set_today_tasks",
            json!({ "task_ids": [prereq], "date": yesterday.format("%Y-%m-%d").to_string() }),
        )
        .await;
    assert_eq!(outcome["assigned"], 1);

    let listing = conn.call_ok("get_all_tasks", json!({})).await;
    let tasks = listing["tasks"].as_array().expect("tasks");
    assert_eq!(tasks.len(), 2);
    let find = |id: i64| {
        tasks
            .iter()
            .find(|task| task["id"] == id)
            .expect("task listed")
            .clone()
    };
    assert_eq!(find(prereq)["carried_over"], true);
    assert_eq!(find(prereq)["blocked"], false);
    assert_eq!(find(prereq)["blocked_by"], json!([]));
    assert_eq!(find(blocked)["blocked"], true);
    assert_eq!(find(blocked)["blocked_by"], json!([prereq]));
    assert_eq!(find(blocked)["carried_over"], false);

    conn.call_ok("mark_task_complete", json!({ "task_id": prereq }))
        .await;
    let listing = conn.call_ok("get_all_tasks", json!({})).await;
    let tasks = listing["tasks"].as_array().expect("tasks");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"], blocked);
    assert_eq!(tasks[0]["blocked"], false);
    assert_eq!(tasks[0]["blocked_by"], json!([]));
}

#[tokio::test]
async fn today_plan_round_trips_through_tools() {
    let server = spawn_server().await;
    let mut conn = McpConnection::open(&server).await;
    let id = conn.call_ok("add_task", task_body("Plan", "Home")).await["id"]
        .as_i64()
        .expect("id");

    let outcome = conn
        .call_ok("set_today_tasks", json!({ "task_ids": [id, 77] }))
        .await;
    assert_eq!(outcome["skipped"], json!([77]));

    let plan = conn.call_ok("get_today_tasks", json!({})).await;
    assert_eq!(plan["tasks"][0]["id"], id);
    assert_eq!(plan["tasks"][0]["order"], 1);
}

#[tokio::test]
async fn scheduling_tools_answer_on_an_empty_store() {
    let server = spawn_server().await;
    let mut conn = McpConnection::open(&server).await;

    let context = conn
        .call_ok(
            "get_scheduling_context",
            json!({ "start_date": "2030-01-14", "end_date": "2030-01-15" }),
        )
        .await;
    assert_eq!(context["blocked_task_ids"], json!([]));
    assert_eq!(
        context["calendar_free_slots"].as_array().expect("slots").len(),
        1
    );

    let slots = conn
        .call_ok(
            "get_free_slots",
            json!({
                "start_date": "2030-01-14",
                "end_date": "2030-01-16",
                "work_start": "09:00",
                "work_end": "17:00",
            }),
        )
        .await;
    assert_eq!(slots["total_free_minutes"], 960);

    let accuracy = conn.call_ok("get_estimation_accuracy", json!({})).await;
    assert_eq!(accuracy["accuracy_by_category"], json!({}));

    let priority = conn
        .call_ok("get_priority_patterns", json!({ "category": "Work" }))
        .await;
    assert_eq!(priority["confidence"], "none");
    assert!(priority["suggested_priority"].is_null());

    let cleanup = conn.call_ok("cleanup_completed_tasks", json!({})).await;
    assert_eq!(cleanup["archived"], 0);
}

#[tokio::test]
async fn caller_mistakes_are_invalid_params() {
    let server = spawn_server().await;
    let mut conn = McpConnection::open(&server).await;

    let missing = conn
        .call_tool("get_task_by_id", json!({ "task_id": 4040 }))
        .await;
    assert_eq!(missing["error"]["code"], -32602, "got {missing}");

    let malformed = conn
        .call_tool("add_task", json!({ "title": "No due date" }))
        .await;
    assert_eq!(malformed["error"]["code"], -32602, "got {malformed}");

    let bad_priority = conn
        .call_tool(
            "set_task_suggestions",
            json!({ "task_id": 1, "suggested_priority": "Q" }),
        )
        .await;
    assert!(bad_priority.get("error").is_some(), "got {bad_priority}");
}
