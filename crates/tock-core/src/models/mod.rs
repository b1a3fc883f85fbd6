//! Data models for tock

mod id;
mod project;
mod task;
mod time_entry;
mod timer;

pub use id::{ProjectId, TaskId, TimeEntryId, TimerSessionId};
pub use project::{is_valid_color, Project, ProjectPatch, DEFAULT_PROJECT_COLOR};
pub use task::{Task, TaskPatch};
pub use time_entry::{TimeEntry, TimeEntryPatch};
pub use timer::ActiveTimerSession;
