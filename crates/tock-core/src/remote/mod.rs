//! Remote entity service: the authoritative CRUD collections for projects,
//! tasks and time entries.
//!
//! Every operation crosses a network boundary and can fail with
//! [`Error::NetworkUnavailable`](crate::Error::NetworkUnavailable) or
//! [`Error::RemoteRequestFailed`](crate::Error::RemoteRequestFailed).
//! `get` reports a missing record as `Ok(None)`; `update` and `delete`
//! report it as [`Error::RemoteNotFound`](crate::Error::RemoteNotFound).

mod http;
mod memory;
mod wire;

pub use http::HttpRemoteService;
pub use memory::{InMemoryRemote, RemoteOperation};

use crate::models::{
    Project, ProjectId, ProjectPatch, Task, TaskId, TaskPatch, TimeEntry, TimeEntryId,
    TimeEntryPatch,
};
use crate::Result;

/// Inclusive bounds on time entry start timestamps (Unix ms)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl TimeRange {
    /// No bounds: every entry
    pub const fn all() -> Self {
        Self {
            from: None,
            to: None,
        }
    }

    pub const fn between(from: i64, to: i64) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn contains(&self, start_time: i64) -> bool {
        self.from.is_none_or(|from| start_time >= from)
            && self.to.is_none_or(|to| start_time <= to)
    }
}

/// CRUD operations exposed by the authoritative store
#[allow(async_fn_in_trait)]
pub trait RemoteEntityService {
    async fn list_projects(&self) -> Result<Vec<Project>>;
    async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>>;
    /// Create a project keeping the client-supplied id
    async fn create_project(&self, project: &Project) -> Result<Project>;
    async fn update_project(&self, id: &ProjectId, patch: &ProjectPatch) -> Result<Project>;
    /// Delete a project; the remote removes its tasks and entries with it
    async fn delete_project(&self, id: &ProjectId) -> Result<()>;

    /// List the tasks of one project
    async fn list_tasks(&self, project_id: &ProjectId) -> Result<Vec<Task>>;
    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>>;
    /// Create a task under its project keeping the client-supplied id
    async fn create_task(&self, task: &Task) -> Result<Task>;
    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task>;
    async fn delete_task(&self, id: &TaskId) -> Result<()>;

    /// List entries whose start lies in `range`, including in-progress ones
    async fn list_time_entries(&self, range: TimeRange) -> Result<Vec<TimeEntry>>;
    async fn get_time_entry(&self, id: &TimeEntryId) -> Result<Option<TimeEntry>>;
    /// Create an entry keeping the client-supplied id
    async fn create_time_entry(&self, entry: &TimeEntry) -> Result<TimeEntry>;
    async fn update_time_entry(
        &self,
        id: &TimeEntryId,
        patch: &TimeEntryPatch,
    ) -> Result<TimeEntry>;
    async fn delete_time_entry(&self, id: &TimeEntryId) -> Result<()>;
}
