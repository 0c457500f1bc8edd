//! [`PlannerStore`] backed by the `SQLite` repositories.

use std::sync::Arc;

use crate::models::{ArchivedTask, CalendarSource, Task};
use crate::scheduling::{PlannerStore, StoreFuture};

use super::archive_repo::ArchiveRepo;
use super::calendar_repo::CalendarRepo;
use super::db::Database;
use super::task_repo::TaskRepo;

/// Snapshot reads for the scheduling engine.
#[derive(Clone)]
pub struct SqliteStore {
    tasks: TaskRepo,
    archive: ArchiveRepo,
    calendars: CalendarRepo,
}

impl SqliteStore {
    /// Build a store over a shared pool.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            tasks: TaskRepo::new(Arc::clone(&db)),
            archive: ArchiveRepo::new(Arc::clone(&db)),
            calendars: CalendarRepo::new(db),
        }
    }
}

impl PlannerStore for SqliteStore {
    fn list_pending(&self) -> StoreFuture<'_, Vec<Task>> {
        Box::pin(self.tasks.list_pending())
    }

    fn list_all_tasks(&self) -> StoreFuture<'_, Vec<Task>> {
        Box::pin(self.tasks.list_all())
    }

    fn get_task(&self, id: i64) -> StoreFuture<'_, Task> {
        Box::pin(self.tasks.get(id))
    }

    fn list_archived(&self) -> StoreFuture<'_, Vec<ArchivedTask>> {
        Box::pin(self.archive.list_all())
    }

    fn list_sources(&self) -> StoreFuture<'_, Vec<CalendarSource>> {
        Box::pin(self.calendars.list())
    }
}
