#![forbid(unsafe_code)]

//! `smart-planner-ctl`: terminal viewer for the `smart-planner` HTTP API.
//!
//! Prints today's plan, the task list, and the archive as aligned
//! tables, and forwards simple edits to the server.

use std::io::{BufRead, Write};

use chrono::{Days, Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use smart_planner::models::{ArchivedTask, PlannedTask, Task};
use smart_planner::scheduling::context::FreeSlotReport;
use smart_planner::scheduling::SchedulingContext;

#[derive(Debug, Parser)]
#[command(
    name = "smart-planner-ctl",
    about = "Terminal viewer for the smart-planner API",
    version,
    long_about = None
)]
struct Cli {
    /// Base URL of the planner API.
    #[arg(long, env = "SMART_PLANNER_API", default_value = "http://localhost:8000")]
    api: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show today's ordered plan.
    Today,

    /// List every task.
    Ls,

    /// Add a task.
    Add {
        /// Task title.
        title: String,
        /// Due timestamp (`YYYY-MM-DD HH:MM:SS`).
        #[arg(long, short = 'd')]
        due: String,
        /// Priority (S/A/B/C/D).
        #[arg(long, short = 'p', default_value = "B")]
        priority: String,
        /// Estimated time (`HH:MM:SS`).
        #[arg(long, short = 't', default_value = "00:30:00")]
        time: String,
        /// Category.
        #[arg(long, short = 'c', default_value = "Personal")]
        category: String,
        /// Description.
        #[arg(long = "desc", default_value = "")]
        description: String,
    },

    /// Toggle a task's completion.
    Complete {
        /// Task id.
        task_id: i64,
    },

    /// Delete a task.
    Delete {
        /// Task id.
        task_id: i64,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Change fields of a task.
    Update {
        /// Task id.
        task_id: i64,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        /// New due timestamp.
        #[arg(long, short = 'd')]
        due: Option<String>,
        /// New priority.
        #[arg(long, short = 'p')]
        priority: Option<String>,
        /// New estimated time.
        #[arg(long, short = 't')]
        time: Option<String>,
        /// New category.
        #[arg(long, short = 'c')]
        category: Option<String>,
        /// New description.
        #[arg(long = "desc")]
        description: Option<String>,
    },

    /// Show archived tasks, newest first.
    Archived,

    /// Archive completed tasks from earlier days.
    Cleanup,

    /// Show free calendar slots.
    Slots {
        /// First day (`YYYY-MM-DD`), defaults to today.
        #[arg(long)]
        start: Option<String>,
        /// Day after the last (`YYYY-MM-DD`), defaults to a week later.
        #[arg(long)]
        end: Option<String>,
        /// Work window start (`HH:MM`).
        #[arg(long)]
        work_start: Option<String>,
        /// Work window end (`HH:MM`).
        #[arg(long)]
        work_end: Option<String>,
        /// Shortest gap in minutes.
        #[arg(long)]
        min_gap: Option<i64>,
    },

    /// Dump the scheduling context the planning agent sees.
    Context {
        /// First day (`YYYY-MM-DD`), defaults to today.
        #[arg(long)]
        start: Option<String>,
        /// Day after the last (`YYYY-MM-DD`).
        #[arg(long)]
        end: Option<String>,
    },
}

type CtlResult<T> = std::result::Result<T, String>;

struct Api {
    base: String,
    client: reqwest::Client,
}

impl Api {
    fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_owned(),
            client: reqwest::Client::new(),
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> CtlResult<T> {
        let response = request
            .send()
            .await
            .map_err(|err| format!("cannot reach {}: {err}", self.base))?;
        let status = response.status();
        let body = response.text().await.map_err(|err| err.to_string())?;
        if !status.is_success() {
            return Err(error_detail(&body).unwrap_or_else(|| format!("HTTP {status}")));
        }
        let body = if body.is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body).map_err(|err| format!("unexpected response: {err}"))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> CtlResult<T> {
        let url = reqwest::Url::parse_with_params(&format!("{}{path}", self.base), query)
            .map_err(|err| format!("invalid API URL {}: {err}", self.base))?;
        self.send(self.client.get(url)).await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> CtlResult<T> {
        let mut request = self.client.request(method, format!("{}{path}", self.base));
        if let Some(body) = body {
            request = request.json(&body);
        }
        self.send(request).await
    }
}

fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("detail")?.as_str().map(str::to_owned)
}

fn main() {
    let args = Cli::parse();
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };
    if let Err(detail) = runtime.block_on(run(args)) {
        eprintln!("Error: {detail}");
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_lines)] // One arm per subcommand.
async fn run(args: Cli) -> CtlResult<()> {
    let api = Api::new(&args.api);
    let today = Local::now().date_naive();

    match args.command {
        Command::Today => {
            let plan: Vec<PlannedTask> = api.get("/tasks/today", &[]).await?;
            if plan.is_empty() {
                println!("No tasks planned for today. Ask the planner to plan your day!");
                return Ok(());
            }
            println!("\nToday's Tasks ({})", today.format("%A, %b %d"));
            let rows = plan
                .iter()
                .map(|entry| {
                    let mut row = vec![entry.task.id.to_string(), entry.order.to_string()];
                    row.extend(task_cells(&entry.task, today, false));
                    row
                })
                .collect();
            print_table(&["ID", "#", "Title", "Priority", "Time", "Due", "Status"], rows);
        }
        Command::Ls => {
            let tasks: Vec<Task> = api.get("/tasks", &[]).await?;
            if tasks.is_empty() {
                println!("No tasks found.");
                return Ok(());
            }
            println!("\nAll Tasks ({} total)", tasks.len());
            let rows = tasks
                .iter()
                .map(|task| {
                    let mut row = vec![task.id.to_string()];
                    row.extend(task_cells(task, today, true));
                    row
                })
                .collect();
            print_table(
                &["ID", "Title", "Priority", "Time", "Due", "Category", "Status"],
                rows,
            );
        }
        Command::Add {
            title,
            due,
            priority,
            time,
            category,
            description,
        } => {
            let body = json!({
                "title": title,
                "description": description,
                "due_date": due,
                "priority": priority,
                "time_required": time,
                "category": category,
            });
            let task: Task = api.call(reqwest::Method::POST, "/tasks", Some(body)).await?;
            println!("✓ Task {} added (id {})", task.title, task.id);
        }
        Command::Complete { task_id } => {
            let task: Task = api
                .call(reqwest::Method::PATCH, &format!("/tasks/{task_id}/complete"), None)
                .await?;
            if task.completed {
                println!("✓ Task {task_id} completed");
            } else {
                println!("✓ Task {task_id} reopened");
            }
        }
        Command::Delete { task_id, yes } => {
            if !yes && !confirm(&format!("Delete task {task_id}?"))? {
                println!("Cancelled");
                return Ok(());
            }
            api.call::<()>(reqwest::Method::DELETE, &format!("/tasks/{task_id}"), None)
                .await?;
            println!("✓ Task {task_id} deleted");
        }
        Command::Update {
            task_id,
            title,
            due,
            priority,
            time,
            category,
            description,
        } => {
            let mut payload = Map::new();
            for (key, value) in [
                ("title", title),
                ("due_date", due),
                ("priority", priority),
                ("time_required", time),
                ("category", category),
                ("description", description),
            ] {
                if let Some(value) = value {
                    payload.insert(key.into(), Value::String(value));
                }
            }
            if payload.is_empty() {
                println!("Nothing to update; pass at least one option");
                return Ok(());
            }
            let _: Task = api
                .call(
                    reqwest::Method::PATCH,
                    &format!("/tasks/{task_id}"),
                    Some(Value::Object(payload)),
                )
                .await?;
            println!("✓ Task {task_id} updated");
        }
        Command::Archived => {
            let archive: Vec<ArchivedTask> = api.get("/tasks/archived", &[]).await?;
            if archive.is_empty() {
                println!("No archived tasks yet.");
                return Ok(());
            }
            println!("\nArchived Tasks ({} completed)", archive.len());
            let rows = archive
                .iter()
                .map(|task| {
                    vec![
                        task.original_id.to_string(),
                        task.title.clone(),
                        task.priority.to_string(),
                        task.category.clone(),
                        task.completed_at.format("%b %d %H:%M").to_string(),
                        task.actual_duration_minutes
                            .map_or_else(|| "-".into(), |m| format!("{m}m")),
                    ]
                })
                .collect();
            print_table(
                &["ID", "Title", "Priority", "Category", "Completed At", "Took"],
                rows,
            );
        }
        Command::Cleanup => {
            let outcome: Value = api.call(reqwest::Method::POST, "/tasks/cleanup", None).await?;
            let archived = outcome.get("archived").and_then(Value::as_u64).unwrap_or(0);
            println!("✓ Archived {archived} completed tasks");
        }
        Command::Slots {
            start,
            end,
            work_start,
            work_end,
            min_gap,
        } => {
            let (start, end) = date_window(start, end, today);
            let mut query = vec![("start_date", start), ("end_date", end)];
            if let Some(value) = work_start {
                query.push(("work_start", value));
            }
            if let Some(value) = work_end {
                query.push(("work_end", value));
            }
            if let Some(value) = min_gap {
                query.push(("min_gap", value.to_string()));
            }
            let report: FreeSlotReport = api.get("/analytics/calendar-free-slots", &query).await?;
            for source in report.sources.iter().filter(|s| !s.ok) {
                eprintln!(
                    "warning: calendar '{}' skipped: {}",
                    source.label.as_deref().unwrap_or(&source.location),
                    source.error.as_deref().unwrap_or("unknown error")
                );
            }
            if report.free_slots.is_empty() {
                println!("No free slots in range.");
                return Ok(());
            }
            let rows = report
                .free_slots
                .iter()
                .map(|slot| {
                    vec![
                        slot.date.format("%a %b %d").to_string(),
                        slot.start.format("%H:%M").to_string(),
                        slot.end.format("%H:%M").to_string(),
                        format!("{}m", slot.duration_minutes),
                    ]
                })
                .collect();
            print_table(&["Day", "From", "To", "Free"], rows);
        }
        Command::Context { start, end } => {
            let (start, end) = date_window(start, end, today);
            let context: SchedulingContext = api
                .get(
                    "/analytics/scheduling-context",
                    &[("start_date", start), ("end_date", end)],
                )
                .await?;
            let pretty = serde_json::to_string_pretty(&context).map_err(|err| err.to_string())?;
            println!("{pretty}");
        }
    }
    Ok(())
}

fn date_window(start: Option<String>, end: Option<String>, today: NaiveDate) -> (String, String) {
    let start = start.unwrap_or_else(|| today.to_string());
    let end = end.unwrap_or_else(|| {
        NaiveDate::parse_from_str(&start, "%Y-%m-%d")
            .ok()
            .and_then(|day| day.checked_add_days(Days::new(7)))
            .map_or_else(|| start.clone(), |day| day.to_string())
    });
    (start, end)
}

/// Title, priority, time, due, optional category, and status cells.
fn task_cells(task: &Task, today: NaiveDate, with_category: bool) -> Vec<String> {
    let status = if task.completed {
        "✓ done"
    } else if task.is_overdue(today) {
        "⚠ overdue"
    } else {
        "pending"
    };
    let mut cells = vec![
        task.title.clone(),
        task.priority.to_string(),
        task.effort.to_string(),
        task.due_date.format("%b %d %H:%M").to_string(),
    ];
    if with_category {
        cells.push(task.category.clone());
    }
    cells.push(status.into());
    cells
}

fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<w$}", w = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_owned()
    };

    println!("{}", render(headers.iter().map(|h| (*h).to_owned()).collect()));
    println!(
        "{}",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  ")
    );
    for row in rows {
        println!("{}", render(row));
    }
}

fn confirm(prompt: &str) -> CtlResult<bool> {
    print!("{prompt} [y/N]: ");
    std::io::stdout().flush().map_err(|err| err.to_string())?;
    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(|err| err.to_string())?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
