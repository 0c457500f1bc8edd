use std::sync::Arc;

use smart_planner::models::calendar::CalendarSourceDraft;
use smart_planner::models::time::parse_timestamp;
use smart_planner::models::SourceKind;
use smart_planner::persistence::{calendar_repo::CalendarRepo, db};
use smart_planner::AppError;

async fn repo() -> CalendarRepo {
    CalendarRepo::new(Arc::new(db::connect_memory().await.expect("db connect")))
}

fn draft(kind: &str, location: &str, label: Option<&str>) -> CalendarSourceDraft {
    CalendarSourceDraft {
        source_type: kind.into(),
        source_value: location.into(),
        label: label.map(str::to_owned),
    }
}

#[tokio::test]
async fn sources_are_listed_in_creation_order() {
    let repo = repo().await;
    let work = repo
        .create(&draft("url", "webcal://example.com/work.ics", Some("Work")).validate().expect("valid"))
        .await
        .expect("create");
    let home = repo
        .create(&draft("file", "/tmp/home.ics", None).validate().expect("valid"))
        .await
        .expect("create");

    assert_eq!(work.source_type, SourceKind::Url);
    assert_eq!(work.label.as_deref(), Some("Work"));
    assert_eq!(home.source_type, SourceKind::File);
    assert!(home.last_synced_at.is_none());

    let listed: Vec<i64> = repo.list().await.expect("list").iter().map(|s| s.id).collect();
    assert_eq!(listed, vec![work.id, home.id]);
}

#[tokio::test]
async fn invalid_drafts_are_rejected() {
    assert!(matches!(
        draft("ftp", "ftp://example.com/a.ics", None).validate(),
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        draft("file", "   ", None).validate(),
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn blank_label_is_dropped() {
    let source = draft("file", "/tmp/a.ics", Some("  ")).validate().expect("valid");
    assert!(source.label.is_none());
}

#[tokio::test]
async fn mark_synced_records_time() {
    let repo = repo().await;
    let source = repo
        .create(&draft("file", "/tmp/a.ics", None).validate().expect("valid"))
        .await
        .expect("create");
    let now = parse_timestamp("2025-06-01 12:00:00").expect("ts");

    let synced = repo.mark_synced(source.id, now).await.expect("sync");
    assert_eq!(synced.last_synced_at, Some(now));
}

#[tokio::test]
async fn delete_removes_and_reports_missing() {
    let repo = repo().await;
    let source = repo
        .create(&draft("file", "/tmp/a.ics", None).validate().expect("valid"))
        .await
        .expect("create");

    repo.delete(source.id).await.expect("delete");
    assert!(matches!(repo.get(source.id).await, Err(AppError::NotFound(_))));
    assert!(matches!(repo.delete(source.id).await, Err(AppError::NotFound(_))));
}
