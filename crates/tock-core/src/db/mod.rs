//! Database layer for tock

mod connection;
mod migrations;
mod project_repository;
mod settings_repository;
mod task_repository;
mod time_entry_repository;
mod timer_repository;

use std::str::FromStr;

use crate::error::{Error, Result};

pub use connection::Database;
pub use project_repository::{LibSqlProjectRepository, ProjectRepository};
pub use settings_repository::{LibSqlSettingsRepository, SettingsRepository};
pub use task_repository::{LibSqlTaskRepository, TaskRepository};
pub use time_entry_repository::{LibSqlTimeEntryRepository, TimeEntryRepository};
pub use timer_repository::{LibSqlTimerRepository, TimerRepository};

/// Parse a stored id column, reporting corrupt rows as database errors
fn parse_id<T: FromStr>(raw: &str, kind: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| Error::Database(format!("invalid {kind} id in local store: {raw}")))
}
