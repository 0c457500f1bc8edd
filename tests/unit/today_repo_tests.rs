use std::sync::Arc;

use smart_planner::models::task::TaskDraft;
use smart_planner::models::time::{parse_date, parse_timestamp};
use smart_planner::models::Task;
use smart_planner::persistence::db::{self, Database};
use smart_planner::persistence::{task_repo::TaskRepo, today_repo::TodayRepo};

async fn setup() -> (Arc<Database>, TaskRepo, TodayRepo) {
    let db = Arc::new(db::connect_memory().await.expect("db connect"));
    (
        Arc::clone(&db),
        TaskRepo::new(Arc::clone(&db)),
        TodayRepo::new(db),
    )
}

async fn add(repo: &TaskRepo, title: &str) -> Task {
    let draft = TaskDraft {
        title: title.into(),
        description: String::new(),
        due_date: "2025-06-02 17:00:00".into(),
        priority: "B".into(),
        time_required: "00:30:00".into(),
        category: "Home".into(),
    };
    repo.create(&draft.validate().expect("valid"))
        .await
        .expect("create")
}

#[tokio::test]
async fn replacing_the_plan_assigns_contiguous_ranks() {
    let (_db, tasks, today) = setup().await;
    let a = add(&tasks, "A").await;
    let b = add(&tasks, "B").await;
    let c = add(&tasks, "C").await;
    let day = parse_date("2025-06-02").expect("date");

    let outcome = today
        .replace_for_day(day, &[c.id, a.id, b.id])
        .await
        .expect("replace");
    assert_eq!(outcome.assigned, 3);
    assert!(outcome.skipped.is_empty());

    let plan = today.list_for_day(day).await.expect("list");
    let ordered: Vec<(u32, i64)> = plan.iter().map(|p| (p.order, p.task.id)).collect();
    assert_eq!(ordered, vec![(1, c.id), (2, a.id), (3, b.id)]);
}

#[tokio::test]
async fn second_replacement_discards_the_first() {
    let (_db, tasks, today) = setup().await;
    let a = add(&tasks, "A").await;
    let b = add(&tasks, "B").await;
    let day = parse_date("2025-06-02").expect("date");

    today.replace_for_day(day, &[a.id, b.id]).await.expect("first");
    today.replace_for_day(day, &[b.id]).await.expect("second");

    let plan = today.list_for_day(day).await.expect("list");
    assert_eq!(plan.len(), 1);
    assert_eq!((plan[0].order, plan[0].task.id), (1, b.id));
}

#[tokio::test]
async fn completed_missing_and_repeated_ids_are_skipped() {
    let (_db, tasks, today) = setup().await;
    let open = add(&tasks, "Open").await;
    let done = add(&tasks, "Done").await;
    let other = add(&tasks, "Other").await;
    tasks
        .mark_complete(done.id, parse_timestamp("2025-06-01 12:00:00").expect("ts"))
        .await
        .expect("complete");
    let day = parse_date("2025-06-02").expect("date");

    let outcome = today
        .replace_for_day(day, &[open.id, done.id, 404, open.id, other.id])
        .await
        .expect("replace");
    assert_eq!(outcome.assigned, 2);
    assert_eq!(outcome.skipped, vec![done.id, 404, open.id]);

    let plan = today.list_for_day(day).await.expect("list");
    let ordered: Vec<(u32, i64)> = plan.iter().map(|p| (p.order, p.task.id)).collect();
    assert_eq!(ordered, vec![(1, open.id), (2, other.id)]);
}

#[tokio::test]
async fn plans_for_different_days_are_independent() {
    let (_db, tasks, today) = setup().await;
    let a = add(&tasks, "A").await;
    let monday = parse_date("2025-06-02").expect("date");
    let tuesday = parse_date("2025-06-03").expect("date");

    today.replace_for_day(monday, &[a.id]).await.expect("monday");
    today.replace_for_day(tuesday, &[]).await.expect("tuesday");

    assert_eq!(today.list_for_day(monday).await.expect("list").len(), 1);
    assert!(today.list_for_day(tuesday).await.expect("list").is_empty());
}

#[tokio::test]
async fn open_tasks_from_earlier_plans_are_carried_over() {
    let (_db, tasks, today) = setup().await;
    let stale = add(&tasks, "Stale").await;
    let finished = add(&tasks, "Finished").await;
    let fresh = add(&tasks, "Fresh").await;
    let yesterday = parse_date("2025-06-01").expect("date");
    let now_day = parse_date("2025-06-02").expect("date");

    today
        .replace_for_day(yesterday, &[stale.id, finished.id])
        .await
        .expect("yesterday");
    today.replace_for_day(now_day, &[fresh.id]).await.expect("today");
    tasks
        .mark_complete(finished.id, parse_timestamp("2025-06-01 20:00:00").expect("ts"))
        .await
        .expect("complete");

    let carried = today.carried_over_ids(now_day).await.expect("carried");
    assert!(carried.contains(&stale.id));
    assert!(!carried.contains(&finished.id));
    assert!(!carried.contains(&fresh.id));
}

#[tokio::test]
async fn deleting_a_task_removes_it_from_plans() {
    let (_db, tasks, today) = setup().await;
    let a = add(&tasks, "A").await;
    let b = add(&tasks, "B").await;
    let day = parse_date("2025-06-02").expect("date");
    today.replace_for_day(day, &[a.id, b.id]).await.expect("replace");

    tasks.delete(a.id).await.expect("delete");

    let plan = today.list_for_day(day).await.expect("list");
    assert_eq!(plan.iter().map(|p| p.task.id).collect::<Vec<_>>(), vec![b.id]);
}
