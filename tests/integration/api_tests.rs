//! REST API behaviour over a live listener.

use std::io::Write;

use reqwest::Method;
use serde_json::{json, Value};

use super::test_helpers::{spawn_server, task_body};

const STANDUP: &str = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20300114T090000\r\n\
DTEND:20300114T100000\r\n\
SUMMARY:Standup\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

#[tokio::test]
async fn health_answers_ok() {
    let server = spawn_server().await;
    let response = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .expect("GET /health");
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.expect("body"), "ok");
}

#[tokio::test]
async fn task_crud_round_trip() {
    let server = spawn_server().await;

    let (status, created) = server
        .send_json(Method::POST, "/tasks", &task_body("Write report", "Work"))
        .await;
    assert_eq!(status, 201);
    let id = created["id"].as_i64().expect("id");
    assert_eq!(created["time_required"], "01:30:00");
    assert_eq!(created["completed"], false);

    let (status, fetched) = server.get_json(&format!("/tasks/{id}")).await;
    assert_eq!(status, 200);
    assert_eq!(fetched["title"], "Write report");

    let (status, updated) = server
        .send_json(
            Method::PATCH,
            &format!("/tasks/{id}"),
            &json!({ "priority": "S", "description": "quarterly" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(updated["priority"], "S");
    assert_eq!(updated["title"], "Write report");

    let (status, toggled) = server
        .send_json(Method::PATCH, &format!("/tasks/{id}/complete"), &json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(toggled["completed"], true);

    let response = server
        .client
        .delete(server.url(&format!("/tasks/{id}")))
        .send()
        .await
        .expect("DELETE");
    assert_eq!(response.status().as_u16(), 204);

    let (status, body) = server.get_json(&format!("/tasks/{id}")).await;
    assert_eq!(status, 404);
    assert!(body["detail"].as_str().expect("detail").contains(&id.to_string()));
}

#[tokio::test]
async fn invalid_task_is_rejected_with_detail() {
    let server = spawn_server().await;
    let mut body = task_body("Bad", "Work");
    body["priority"] = json!("Z");

    let (status, error) = server.send_json(Method::POST, "/tasks", &body).await;
    assert_eq!(status, 400);
    assert!(error["detail"].is_string());

    let (_, tasks) = server.get_json("/tasks").await;
    assert_eq!(tasks, json!([]));
}

#[tokio::test]
async fn today_plan_replaces_and_skips() {
    let server = spawn_server().await;
    let (_, first) = server
        .send_json(Method::POST, "/tasks", &task_body("First", "Work"))
        .await;
    let (_, second) = server
        .send_json(Method::POST, "/tasks", &task_body("Second", "Home"))
        .await;
    let first = first["id"].as_i64().expect("id");
    let second = second["id"].as_i64().expect("id");

    let (status, outcome) = server
        .send_json(
            Method::PUT,
            "/tasks/today",
            &json!({ "task_ids": [second, 999, first, second] }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(outcome["assigned"], 2);
    assert_eq!(outcome["skipped"], json!([999, second]));

    let (status, plan) = server.get_json("/tasks/today").await;
    assert_eq!(status, 200);
    let plan = plan.as_array().expect("plan");
    assert_eq!(plan.len(), 2);
    assert_eq!(plan[0]["id"], second);
    assert_eq!(plan[0]["order"], 1);
    assert_eq!(plan[1]["id"], first);
}

#[tokio::test]
async fn dependencies_surface_in_scheduling_context() {
    let server = spawn_server().await;
    let (_, prereq) = server
        .send_json(Method::POST, "/tasks", &task_body("Design", "Work"))
        .await;
    let (_, blocked) = server
        .send_json(Method::POST, "/tasks", &task_body("Build", "Work"))
        .await;
    let prereq = prereq["id"].as_i64().expect("id");
    let blocked = blocked["id"].as_i64().expect("id");

    let (status, task) = server
        .send_json(
            Method::PUT,
            &format!("/tasks/{blocked}/dependencies"),
            &json!({ "depends_on": [prereq] }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(task["dependencies"], json!([prereq]));

    let (status, _) = server
        .send_json(
            Method::PUT,
            &format!("/tasks/{blocked}/dependencies"),
            &json!({ "depends_on": [blocked] }),
        )
        .await;
    assert_eq!(status, 400);

    let (status, context) = server
        .get_json("/analytics/scheduling-context?start_date=2030-01-14&end_date=2030-01-15")
        .await;
    assert_eq!(status, 200);
    assert_eq!(context["blocked_task_ids"], json!([blocked]));
    assert_eq!(context["completion_patterns"], json!({}));
}

#[tokio::test]
async fn cleanup_moves_completed_work_to_the_archive() {
    let server = spawn_server().await;
    let (_, task) = server
        .send_json(Method::POST, "/tasks", &task_body("Done", "Work"))
        .await;
    let id = task["id"].as_i64().expect("id");
    server
        .send_json(Method::POST, &format!("/tasks/{id}/start"), &json!({}))
        .await;
    let (_, completed) = server
        .send_json(Method::PATCH, &format!("/tasks/{id}/complete"), &json!({}))
        .await;
    assert!(completed["started_at"].is_string());

    let (status, outcome) = server
        .send_json(Method::POST, "/tasks/cleanup", &json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(outcome["archived"], 1);

    let (_, archived) = server.get_json("/tasks/archived").await;
    let archived = archived.as_array().expect("archive");
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0]["original_id"], id);
    let (_, tasks) = server.get_json("/tasks").await;
    assert_eq!(tasks, json!([]));

    let (status, accuracy) = server.get_json("/analytics/estimation-accuracy").await;
    assert_eq!(status, 200);
    assert_eq!(accuracy["accuracy_by_category"]["Work"]["sample_size"], 1);

    let (status, patterns) = server
        .get_json("/analytics/priority-patterns?category=Work")
        .await;
    assert_eq!(status, 200);
    assert_eq!(patterns["suggested_priority"], "A");
    assert_eq!(patterns["confidence"], "low");

    let (_, completion) = server.get_json("/analytics/completion-patterns").await;
    assert_eq!(completion["completion_patterns"]["Work"]["sample_size"], 1);
}

#[tokio::test]
async fn free_slots_require_both_dates() {
    let server = spawn_server().await;
    let (status, body) = server
        .get_json("/analytics/calendar-free-slots?start_date=2030-01-14")
        .await;
    assert_eq!(status, 400);
    assert!(body["detail"].as_str().expect("detail").contains("end_date"));

    let (status, _) = server
        .get_json("/analytics/calendar-free-slots?start_date=2030-01-15&end_date=2030-01-14")
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn calendar_source_lifecycle() {
    let server = spawn_server().await;
    let mut file = tempfile::Builder::new()
        .suffix(".ics")
        .tempfile()
        .expect("temp file");
    file.write_all(STANDUP.as_bytes()).expect("write");

    let (status, source) = server
        .send_json(
            Method::POST,
            "/analytics/calendar",
            &json!({
                "source_type": "file",
                "source_value": file.path().to_string_lossy(),
                "label": "Team",
            }),
        )
        .await;
    assert_eq!(status, 201);
    let id = source["id"].as_i64().expect("id");
    assert!(source["last_synced_at"].is_null());

    let (status, checked) = server
        .send_json(Method::POST, &format!("/analytics/calendar/{id}/test"), &json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(checked["event_count"], 1);
    assert!(checked["source"]["last_synced_at"].is_string());

    let (status, report) = server
        .get_json(
            "/analytics/calendar-free-slots?start_date=2030-01-14&end_date=2030-01-15\
             &work_start=08:00&work_end=12:00",
        )
        .await;
    assert_eq!(status, 200);
    let slots: Vec<(Value, Value)> = report["free_slots"]
        .as_array()
        .expect("slots")
        .iter()
        .map(|slot| (slot["start"].clone(), slot["end"].clone()))
        .collect();
    assert_eq!(
        slots,
        vec![
            (json!("08:00"), json!("09:00")),
            (json!("10:00"), json!("12:00")),
        ]
    );
    assert_eq!(report["sources"][0]["ok"], true);

    let response = server
        .client
        .delete(server.url(&format!("/analytics/calendar/{id}")))
        .send()
        .await
        .expect("DELETE");
    assert_eq!(response.status().as_u16(), 204);
    let (_, sources) = server.get_json("/analytics/calendar").await;
    assert_eq!(sources, json!([]));
}

#[tokio::test]
async fn unreadable_calendar_fails_the_test_call() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let (_, source) = server
        .send_json(
            Method::POST,
            "/analytics/calendar",
            &json!({
                "source_type": "file",
                "source_value": dir.path().join("missing.ics").to_string_lossy(),
            }),
        )
        .await;
    let id = source["id"].as_i64().expect("id");

    let (status, body) = server
        .send_json(Method::POST, &format!("/analytics/calendar/{id}/test"), &json!({}))
        .await;
    assert_eq!(status, 400);
    assert!(body["detail"].is_string());

    let (status, _) = server
        .send_json(Method::POST, "/analytics/calendar/4242/test", &json!({}))
        .await;
    assert_eq!(status, 404);
}
