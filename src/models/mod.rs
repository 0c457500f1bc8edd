//! Domain model module declarations.

pub mod archive;
pub mod calendar;
pub mod priority;
pub mod task;
pub mod time;
pub mod today;

pub use archive::ArchivedTask;
pub use calendar::{BusyInterval, CalendarSource, FreeSlot, SourceKind, SourceStatus};
pub use priority::Priority;
pub use task::{Effort, Task};
pub use today::PlannedTask;
