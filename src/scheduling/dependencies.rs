//! One-hop dependency blocking.

use std::collections::HashMap;

use crate::models::Task;

/// Ids of open tasks that have at least one open prerequisite, in input order.
///
/// Only direct prerequisites are consulted. Ids that do not appear in
/// `tasks` are treated as satisfied, and cycles are not detected.
#[must_use]
pub fn find_blocked(tasks: &[Task]) -> Vec<i64> {
    let completed: HashMap<i64, bool> = tasks.iter().map(|t| (t.id, t.completed)).collect();
    tasks
        .iter()
        .filter(|task| !task.completed && !open_prerequisites(task, &completed).is_empty())
        .map(|task| task.id)
        .collect()
}

/// Direct prerequisites of `task` that exist in `tasks` and are not completed.
#[must_use]
pub fn blocking_prerequisites(task: &Task, tasks: &[Task]) -> Vec<i64> {
    let completed: HashMap<i64, bool> = tasks.iter().map(|t| (t.id, t.completed)).collect();
    open_prerequisites(task, &completed)
}

fn open_prerequisites(task: &Task, completed: &HashMap<i64, bool>) -> Vec<i64> {
    task.dependencies
        .iter()
        .copied()
        .filter(|dep| completed.get(dep) == Some(&false))
        .collect()
}
