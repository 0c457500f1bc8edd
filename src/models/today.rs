//! Ordered daily plan entries.

use serde::{Deserialize, Serialize};

use super::task::Task;

/// A plan entry joined with its task, as shown to the agent and the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlannedTask {
    /// 1-based position within the day.
    pub order: u32,
    /// The assigned task.
    #[serde(flatten)]
    pub task: Task,
}

/// Outcome of replacing a day's plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanReplacement {
    /// Number of tasks that made it into the plan.
    pub assigned: usize,
    /// Requested ids that were dropped (missing, completed, or repeated).
    pub skipped: Vec<i64>,
}
