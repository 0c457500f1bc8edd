//! Pattern analytics over an archive read back from the store.

use std::sync::Arc;

use smart_planner::models::time::parse_timestamp;
use smart_planner::models::{ArchivedTask, Effort, Priority};
use smart_planner::persistence::{archive_repo::ArchiveRepo, db};
use smart_planner::scheduling::patterns::{
    completion_patterns, estimation_accuracy, priority_suggestion, Confidence,
};

fn record(category: &str, title: &str, priority: Priority, completed: &str) -> ArchivedTask {
    ArchivedTask {
        id: 0,
        original_id: 1,
        title: title.into(),
        description: String::new(),
        due_date: parse_timestamp("2025-05-01 18:00:00").expect("ts"),
        priority,
        effort: Effort::from_minutes(60),
        category: category.into(),
        created_at: parse_timestamp("2025-04-30 09:00:00").expect("ts"),
        completed_at: parse_timestamp(completed).expect("ts"),
        started_at: None,
        actual_duration_minutes: None,
        suggested_priority: None,
    }
}

async fn archive_of(records: Vec<ArchivedTask>) -> Vec<ArchivedTask> {
    let repo = ArchiveRepo::new(Arc::new(db::connect_memory().await.expect("db connect")));
    for record in &records {
        repo.append(record).await.expect("append");
    }
    repo.list_all().await.expect("list")
}

#[tokio::test]
async fn stored_archive_keeps_tie_break_order() {
    let archive = archive_of(vec![
        record("Work", "Ship release", Priority::C, "2025-05-01 10:00:00"),
        record("Work", "Fix outage", Priority::S, "2025-05-01 11:00:00"),
        record("Work", "Write notes", Priority::C, "2025-05-02 16:00:00"),
        record("Work", "Fix flaky test", Priority::S, "2025-05-02 16:30:00"),
    ])
    .await;

    let suggestion = priority_suggestion(&archive, "Work", None);
    assert_eq!(suggestion.suggested_priority, Some(Priority::C));
    assert_eq!(suggestion.sample_size, 4);
    assert_eq!(suggestion.confidence, Confidence::Medium);
    assert_eq!(suggestion.priority_distribution.get(&Priority::S), Some(&2));

    let fixes = priority_suggestion(&archive, "Work", Some("FIX"));
    assert_eq!(fixes.suggested_priority, Some(Priority::S));
    assert_eq!(fixes.confidence, Confidence::Low);
}

#[tokio::test]
async fn unknown_category_has_no_suggestion() {
    let archive = archive_of(vec![record(
        "Work",
        "Ship release",
        Priority::A,
        "2025-05-01 10:00:00",
    )])
    .await;
    let suggestion = priority_suggestion(&archive, "Garden", None);
    assert_eq!(suggestion.suggested_priority, None);
    assert_eq!(suggestion.confidence, Confidence::None);
    assert_eq!(suggestion.sample_size, 0);
    assert!(suggestion.priority_distribution.is_empty());
}

#[tokio::test]
async fn estimation_accuracy_of_stored_records() {
    let mut slow = record("Work", "Slow", Priority::B, "2025-05-01 10:00:00");
    slow.actual_duration_minutes = Some(120);
    let mut fast = record("Work", "Fast", Priority::B, "2025-05-01 11:00:00");
    fast.actual_duration_minutes = Some(60);
    let unmeasured = record("Home", "Dishes", Priority::D, "2025-05-01 20:00:00");

    let accuracy = estimation_accuracy(&archive_of(vec![slow, fast, unmeasured]).await);
    assert_eq!(accuracy.len(), 1);
    let work = accuracy.get("Work").expect("work stats");
    assert_eq!(work.sample_size, 2);
    assert!((work.avg_estimated_minutes - 60.0).abs() < f64::EPSILON);
    assert!((work.avg_actual_minutes - 90.0).abs() < f64::EPSILON);
    assert!((work.suggested_multiplier - 1.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn completion_hours_group_by_category() {
    let archive = archive_of(vec![
        record("Work", "a", Priority::B, "2025-05-01 09:10:00"),
        record("Work", "b", Priority::B, "2025-05-02 14:00:00"),
        record("Work", "c", Priority::B, "2025-05-03 14:45:00"),
        record("Home", "d", Priority::B, "2025-05-03 21:00:00"),
    ])
    .await;

    let patterns = completion_patterns(&archive);
    let work = patterns.get("Work").expect("work pattern");
    assert_eq!(work.most_common_hour, Some(14));
    assert_eq!(work.sample_size, 3);
    assert_eq!(work.hour_distribution.get(&9), Some(&1));
    assert_eq!(patterns.get("Home").and_then(|p| p.most_common_hour), Some(21));
}
