use std::sync::Arc;

use smart_planner::models::task::{Effort, SuggestionPatch, TaskDraft, TaskPatch};
use smart_planner::models::time::parse_timestamp;
use smart_planner::models::Priority;
use smart_planner::persistence::{db, task_repo::TaskRepo};
use smart_planner::AppError;

fn draft(title: &str, due: &str, priority: &str) -> TaskDraft {
    TaskDraft {
        title: title.into(),
        description: String::new(),
        due_date: due.into(),
        priority: priority.into(),
        time_required: "01:00:00".into(),
        category: "Work".into(),
    }
}

async fn repo() -> TaskRepo {
    TaskRepo::new(Arc::new(db::connect_memory().await.expect("db connect")))
}

#[tokio::test]
async fn in_memory_connect_creates_all_tables() {
    let pool = db::connect_memory().await.expect("in-memory connect");
    for table in [
        "task",
        "task_dependency",
        "today_task",
        "archived_task",
        "calendar_source",
    ] {
        let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("table '{table}' should be queryable: {e}"));
        assert_eq!(row.0, 0, "table '{table}' should start empty");
    }
}

#[tokio::test]
async fn file_database_is_created_with_parent_dirs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("planner.db");
    let pool = db::connect(&path).await.expect("file connect");
    let repo = TaskRepo::new(Arc::new(pool));
    repo.create(&draft("Persist", "2025-06-01 09:00:00", "B").validate().expect("valid"))
        .await
        .expect("create");
    assert!(path.exists());
}

#[tokio::test]
async fn create_then_get_round_trips_fields() {
    let repo = repo().await;
    let mut input = draft("Write report", "2025-06-01 18:00:00", "A");
    input.description = "Quarterly numbers".into();
    input.time_required = "01:30:00".into();

    let created = repo.create(&input.validate().expect("valid")).await.expect("create");
    assert!(!created.completed);
    assert_eq!(created.priority, Priority::A);
    assert_eq!(created.effort, Effort::from_minutes(90));
    assert!(created.started_at.is_none());
    assert!(created.dependencies.is_empty());

    let fetched = repo.get(created.id).await.expect("get");
    assert_eq!(fetched, created);
    assert_eq!(fetched.description, "Quarterly numbers");
}

#[tokio::test]
async fn missing_task_is_not_found() {
    let repo = repo().await;
    assert!(matches!(repo.get(42).await, Err(AppError::NotFound(_))));
    assert!(matches!(repo.delete(42).await, Err(AppError::NotFound(_))));
    assert!(matches!(
        repo.start(42, parse_timestamp("2025-06-01 09:00:00").expect("ts")).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn lists_order_by_due_date() {
    let repo = repo().await;
    let late = repo
        .create(&draft("Late", "2025-06-03 09:00:00", "B").validate().expect("valid"))
        .await
        .expect("create");
    let early = repo
        .create(&draft("Early", "2025-06-01 09:00:00", "B").validate().expect("valid"))
        .await
        .expect("create");
    let now = parse_timestamp("2025-06-01 10:00:00").expect("ts");
    repo.mark_complete(early.id, now).await.expect("complete");

    let all: Vec<i64> = repo.list_all().await.expect("list").iter().map(|t| t.id).collect();
    assert_eq!(all, vec![early.id, late.id]);

    let pending: Vec<i64> = repo
        .list_pending()
        .await
        .expect("pending")
        .iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(pending, vec![late.id]);
}

#[tokio::test]
async fn partial_update_touches_only_given_fields() {
    let repo = repo().await;
    let task = repo
        .create(&draft("Draft", "2025-06-01 09:00:00", "C").validate().expect("valid"))
        .await
        .expect("create");

    let patch = TaskPatch {
        priority: Some("S".into()),
        time_required: Some("00:45:00".into()),
        ..TaskPatch::default()
    };
    let updated = repo
        .update(task.id, patch.validate().expect("valid patch"))
        .await
        .expect("update");
    assert_eq!(updated.priority, Priority::S);
    assert_eq!(updated.effort, Effort::from_minutes(45));
    assert_eq!(updated.title, "Draft");
    assert_eq!(repo.get(task.id).await.expect("get"), updated);
}

#[tokio::test]
async fn concurrent_updates_of_different_fields_both_land() {
    let repo = repo().await;
    let task = repo
        .create(&draft("Draft", "2025-06-01 09:00:00", "C").validate().expect("valid"))
        .await
        .expect("create");

    let retitle = TaskPatch {
        title: Some("Final".into()),
        ..TaskPatch::default()
    };
    let reprioritize = TaskPatch {
        priority: Some("A".into()),
        ..TaskPatch::default()
    };
    let (first, second) = tokio::join!(
        repo.update(task.id, retitle.validate().expect("valid patch")),
        repo.update(task.id, reprioritize.validate().expect("valid patch")),
    );
    first.expect("retitle");
    second.expect("reprioritize");

    let stored = repo.get(task.id).await.expect("get");
    assert_eq!(stored.title, "Final");
    assert_eq!(stored.priority, Priority::A);
    assert_eq!(stored.category, "Work");
}

#[tokio::test]
async fn updating_a_missing_task_is_not_found() {
    let repo = repo().await;
    let patch = TaskPatch {
        title: Some("Ghost".into()),
        ..TaskPatch::default()
    };
    assert!(matches!(
        repo.update(99, patch.validate().expect("valid patch")).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn toggle_complete_sets_and_clears_completion_time() {
    let repo = repo().await;
    let task = repo
        .create(&draft("Toggle", "2025-06-01 09:00:00", "B").validate().expect("valid"))
        .await
        .expect("create");
    let now = parse_timestamp("2025-06-01 15:20:00").expect("ts");

    let done = repo.toggle_complete(task.id, now).await.expect("toggle on");
    assert!(done.completed);
    assert_eq!(done.completed_at, Some(now));

    let reopened = repo.toggle_complete(task.id, now).await.expect("toggle off");
    assert!(!reopened.completed);
    assert_eq!(reopened.completed_at, None);
}

#[tokio::test]
async fn mark_complete_keeps_first_completion_time() {
    let repo = repo().await;
    let task = repo
        .create(&draft("Once", "2025-06-01 09:00:00", "B").validate().expect("valid"))
        .await
        .expect("create");
    let first = parse_timestamp("2025-06-01 10:00:00").expect("ts");
    let second = parse_timestamp("2025-06-01 11:00:00").expect("ts");

    repo.mark_complete(task.id, first).await.expect("complete");
    let again = repo.mark_complete(task.id, second).await.expect("complete again");
    assert_eq!(again.completed_at, Some(first));
}

#[tokio::test]
async fn dependencies_keep_order_and_collapse_repeats() {
    let repo = repo().await;
    let mut ids = Vec::new();
    for title in ["Main", "First", "Second"] {
        let task = repo
            .create(&draft(title, "2025-06-01 09:00:00", "B").validate().expect("valid"))
            .await
            .expect("create");
        ids.push(task.id);
    }

    let task = repo
        .set_dependencies(ids[0], &[ids[2], ids[1], ids[2]])
        .await
        .expect("set deps");
    assert_eq!(task.dependencies, vec![ids[2], ids[1]]);

    let cleared = repo.set_dependencies(ids[0], &[]).await.expect("clear deps");
    assert!(cleared.dependencies.is_empty());
}

#[tokio::test]
async fn invalid_dependency_sets_are_rejected() {
    let repo = repo().await;
    let task = repo
        .create(&draft("Solo", "2025-06-01 09:00:00", "B").validate().expect("valid"))
        .await
        .expect("create");

    assert!(matches!(
        repo.set_dependencies(task.id, &[task.id]).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        repo.set_dependencies(task.id, &[999]).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        repo.set_dependencies(999, &[task.id]).await,
        Err(AppError::NotFound(_))
    ));
    assert!(repo.get(task.id).await.expect("get").dependencies.is_empty());
}

#[tokio::test]
async fn deleting_a_prerequisite_leaves_a_dangling_reference() {
    let repo = repo().await;
    let main = repo
        .create(&draft("Main", "2025-06-01 09:00:00", "B").validate().expect("valid"))
        .await
        .expect("create");
    let prereq = repo
        .create(&draft("Prereq", "2025-06-01 08:00:00", "B").validate().expect("valid"))
        .await
        .expect("create");
    repo.set_dependencies(main.id, &[prereq.id]).await.expect("deps");

    repo.delete(prereq.id).await.expect("delete");
    assert_eq!(repo.get(main.id).await.expect("get").dependencies, vec![prereq.id]);
}

#[tokio::test]
async fn suggestions_update_only_present_fields() {
    let repo = repo().await;
    let task = repo
        .create(&draft("Suggest", "2025-06-01 09:00:00", "B").validate().expect("valid"))
        .await
        .expect("create");

    let first = SuggestionPatch {
        suggested_priority: Some("A".into()),
        suggested_start_time: Some("09:30:00".into()),
    };
    repo.set_suggestions(task.id, first.validate().expect("valid"))
        .await
        .expect("suggest");

    let second = SuggestionPatch {
        suggested_priority: Some("S".into()),
        suggested_start_time: None,
    };
    let updated = repo
        .set_suggestions(task.id, second.validate().expect("valid"))
        .await
        .expect("suggest again");
    assert_eq!(updated.suggested_priority, Some(Priority::S));
    assert_eq!(
        updated.suggested_start_time.map(|t| t.format("%H:%M:%S").to_string()),
        Some("09:30:00".to_owned())
    );
}
