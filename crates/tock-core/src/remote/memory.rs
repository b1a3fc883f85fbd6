//! In-process remote used by tests and offline demos.
//!
//! Behaves like the HTTP API: ids are kept as supplied, deletes cascade to
//! children, and missing records surface as [`Error::RemoteNotFound`].
//! Reachability, latency and per-operation failures can be controlled.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use super::{RemoteEntityService, TimeRange};
use crate::models::{
    Project, ProjectId, ProjectPatch, Task, TaskId, TaskPatch, TimeEntry, TimeEntryId,
    TimeEntryPatch,
};
use crate::util::now_ms;
use crate::{Error, Result};

/// Operations that can be observed or made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOperation {
    ListProjects,
    GetProject,
    CreateProject,
    UpdateProject,
    DeleteProject,
    ListTasks,
    GetTask,
    CreateTask,
    UpdateTask,
    DeleteTask,
    ListTimeEntries,
    GetTimeEntry,
    CreateTimeEntry,
    UpdateTimeEntry,
    DeleteTimeEntry,
}

#[derive(Debug)]
struct State {
    reachable: bool,
    latency: Option<Duration>,
    projects: BTreeMap<ProjectId, Project>,
    tasks: BTreeMap<TaskId, Task>,
    time_entries: BTreeMap<TimeEntryId, TimeEntry>,
    failing_operations: HashSet<RemoteOperation>,
    failing_ids: HashSet<(RemoteOperation, String)>,
    calls: HashMap<RemoteOperation, usize>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            reachable: true,
            latency: None,
            projects: BTreeMap::new(),
            tasks: BTreeMap::new(),
            time_entries: BTreeMap::new(),
            failing_operations: HashSet::new(),
            failing_ids: HashSet::new(),
            calls: HashMap::new(),
        }
    }
}

impl State {
    fn check(&mut self, operation: RemoteOperation, id: Option<String>) -> Result<()> {
        *self.calls.entry(operation).or_default() += 1;
        if !self.reachable {
            return Err(Error::NetworkUnavailable);
        }
        let targeted = id.is_some_and(|id| self.failing_ids.contains(&(operation, id)));
        if targeted || self.failing_operations.contains(&operation) {
            return Err(Error::RemoteRequestFailed {
                status: Some(500),
                message: format!("injected failure for {operation:?}"),
            });
        }
        Ok(())
    }

    fn remove_task_cascade(&mut self, id: &TaskId) {
        self.time_entries.retain(|_, entry| entry.task_id != *id);
        self.tasks.remove(id);
    }
}

/// Thread-safe in-memory [`RemoteEntityService`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryRemote {
    state: Arc<Mutex<State>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing or regaining the network
    pub async fn set_reachable(&self, reachable: bool) {
        self.state.lock().await.reachable = reachable;
    }

    /// Delay every call by `latency` before it touches any state
    pub async fn set_latency(&self, latency: Duration) {
        self.state.lock().await.latency = Some(latency);
    }

    /// Make every call of `operation` fail with a 500
    pub async fn fail_operation(&self, operation: RemoteOperation) {
        self.state.lock().await.failing_operations.insert(operation);
    }

    /// Make `operation` fail only when it targets `id`
    pub async fn fail_for_id(&self, operation: RemoteOperation, id: impl ToString) {
        self.state
            .lock()
            .await
            .failing_ids
            .insert((operation, id.to_string()));
    }

    pub async fn clear_failures(&self) {
        let mut state = self.state.lock().await;
        state.failing_operations.clear();
        state.failing_ids.clear();
    }

    /// Number of times `operation` was invoked, failed calls included
    pub async fn call_count(&self, operation: RemoteOperation) -> usize {
        self.state
            .lock()
            .await
            .calls
            .get(&operation)
            .copied()
            .unwrap_or_default()
    }

    pub async fn insert_project(&self, project: Project) {
        self.state
            .lock()
            .await
            .projects
            .insert(project.id, project);
    }

    pub async fn insert_task(&self, task: Task) {
        self.state.lock().await.tasks.insert(task.id, task);
    }

    pub async fn insert_time_entry(&self, entry: TimeEntry) {
        self.state
            .lock()
            .await
            .time_entries
            .insert(entry.id, entry);
    }

    pub async fn projects(&self) -> Vec<Project> {
        self.state.lock().await.projects.values().cloned().collect()
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.state.lock().await.tasks.values().cloned().collect()
    }

    pub async fn time_entries(&self) -> Vec<TimeEntry> {
        self.state
            .lock()
            .await
            .time_entries
            .values()
            .cloned()
            .collect()
    }

    async fn begin(&self, operation: RemoteOperation, id: Option<String>) -> Result<()> {
        let latency = self.state.lock().await.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.state.lock().await.check(operation, id)
    }
}

fn conflict(kind: &str, id: impl std::fmt::Display) -> Error {
    Error::RemoteRequestFailed {
        status: Some(409),
        message: format!("{kind} {id} already exists"),
    }
}

impl RemoteEntityService for InMemoryRemote {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.begin(RemoteOperation::ListProjects, None).await?;
        Ok(self.projects().await)
    }

    async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>> {
        self.begin(RemoteOperation::GetProject, Some(id.to_string()))
            .await?;
        Ok(self.state.lock().await.projects.get(id).cloned())
    }

    async fn create_project(&self, project: &Project) -> Result<Project> {
        self.begin(RemoteOperation::CreateProject, Some(project.id.to_string()))
            .await?;
        let mut state = self.state.lock().await;
        if state.projects.contains_key(&project.id) {
            return Err(conflict("project", project.id));
        }
        state.projects.insert(project.id, project.clone());
        Ok(project.clone())
    }

    async fn update_project(&self, id: &ProjectId, patch: &ProjectPatch) -> Result<Project> {
        self.begin(RemoteOperation::UpdateProject, Some(id.to_string()))
            .await?;
        let mut state = self.state.lock().await;
        let project = state
            .projects
            .get_mut(id)
            .ok_or_else(|| Error::RemoteNotFound(format!("project {id}")))?;
        patch.apply(project);
        Ok(project.clone())
    }

    async fn delete_project(&self, id: &ProjectId) -> Result<()> {
        self.begin(RemoteOperation::DeleteProject, Some(id.to_string()))
            .await?;
        let mut state = self.state.lock().await;
        if state.projects.remove(id).is_none() {
            return Err(Error::RemoteNotFound(format!("project {id}")));
        }
        let task_ids: Vec<TaskId> = state
            .tasks
            .values()
            .filter(|task| task.project_id == *id)
            .map(|task| task.id)
            .collect();
        for task_id in &task_ids {
            state.remove_task_cascade(task_id);
        }
        state.time_entries.retain(|_, entry| entry.project_id != *id);
        Ok(())
    }

    async fn list_tasks(&self, project_id: &ProjectId) -> Result<Vec<Task>> {
        self.begin(RemoteOperation::ListTasks, Some(project_id.to_string()))
            .await?;
        let state = self.state.lock().await;
        if !state.projects.contains_key(project_id) {
            return Err(Error::RemoteNotFound(format!("project {project_id}")));
        }
        Ok(state
            .tasks
            .values()
            .filter(|task| task.project_id == *project_id)
            .cloned()
            .collect())
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>> {
        self.begin(RemoteOperation::GetTask, Some(id.to_string()))
            .await?;
        Ok(self.state.lock().await.tasks.get(id).cloned())
    }

    async fn create_task(&self, task: &Task) -> Result<Task> {
        self.begin(RemoteOperation::CreateTask, Some(task.id.to_string()))
            .await?;
        let mut state = self.state.lock().await;
        if !state.projects.contains_key(&task.project_id) {
            return Err(Error::RemoteNotFound(format!("project {}", task.project_id)));
        }
        if state.tasks.contains_key(&task.id) {
            return Err(conflict("task", task.id));
        }
        state.tasks.insert(task.id, task.clone());
        Ok(task.clone())
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task> {
        self.begin(RemoteOperation::UpdateTask, Some(id.to_string()))
            .await?;
        let mut state = self.state.lock().await;
        if let Some(project_id) = patch.project_id {
            if !state.projects.contains_key(&project_id) {
                return Err(Error::RemoteRequestFailed {
                    status: Some(400),
                    message: format!("unknown project {project_id}"),
                });
            }
        }
        let task = state
            .tasks
            .get_mut(id)
            .ok_or_else(|| Error::RemoteNotFound(format!("task {id}")))?;
        patch.apply(task);
        Ok(task.clone())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<()> {
        self.begin(RemoteOperation::DeleteTask, Some(id.to_string()))
            .await?;
        let mut state = self.state.lock().await;
        if !state.tasks.contains_key(id) {
            return Err(Error::RemoteNotFound(format!("task {id}")));
        }
        state.remove_task_cascade(id);
        Ok(())
    }

    async fn list_time_entries(&self, range: TimeRange) -> Result<Vec<TimeEntry>> {
        self.begin(RemoteOperation::ListTimeEntries, None).await?;
        Ok(self
            .state
            .lock()
            .await
            .time_entries
            .values()
            .filter(|entry| range.contains(entry.start_time))
            .cloned()
            .collect())
    }

    async fn get_time_entry(&self, id: &TimeEntryId) -> Result<Option<TimeEntry>> {
        self.begin(RemoteOperation::GetTimeEntry, Some(id.to_string()))
            .await?;
        Ok(self.state.lock().await.time_entries.get(id).cloned())
    }

    async fn create_time_entry(&self, entry: &TimeEntry) -> Result<TimeEntry> {
        self.begin(RemoteOperation::CreateTimeEntry, Some(entry.id.to_string()))
            .await?;
        let mut state = self.state.lock().await;
        let task_matches = state
            .tasks
            .get(&entry.task_id)
            .is_some_and(|task| task.project_id == entry.project_id);
        if !task_matches {
            return Err(Error::RemoteRequestFailed {
                status: Some(400),
                message: format!(
                    "unknown task {} for project {}",
                    entry.task_id, entry.project_id
                ),
            });
        }
        if state.time_entries.contains_key(&entry.id) {
            return Err(conflict("time entry", entry.id));
        }
        state.time_entries.insert(entry.id, entry.clone());
        Ok(entry.clone())
    }

    async fn update_time_entry(
        &self,
        id: &TimeEntryId,
        patch: &TimeEntryPatch,
    ) -> Result<TimeEntry> {
        self.begin(RemoteOperation::UpdateTimeEntry, Some(id.to_string()))
            .await?;
        let mut state = self.state.lock().await;
        let entry = state
            .time_entries
            .get_mut(id)
            .ok_or_else(|| Error::RemoteNotFound(format!("time entry {id}")))?;
        patch.apply(entry, now_ms());
        Ok(entry.clone())
    }

    async fn delete_time_entry(&self, id: &TimeEntryId) -> Result<()> {
        self.begin(RemoteOperation::DeleteTimeEntry, Some(id.to_string()))
            .await?;
        if self.state.lock().await.time_entries.remove(id).is_none() {
            return Err(Error::RemoteNotFound(format!("time entry {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn seeded() -> (InMemoryRemote, Project, Task, TimeEntry) {
        let remote = InMemoryRemote::new();
        let project = Project::new("Client work");
        let task = Task::new(project.id, "Review");
        let entry = TimeEntry::completed(project.id, task.id, 1_000, 61_000);
        remote.insert_project(project.clone()).await;
        remote.insert_task(task.clone()).await;
        remote.insert_time_entry(entry.clone()).await;
        (remote, project, task, entry)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_project_cascades_to_children() {
        let (remote, project, _, _) = seeded().await;
        remote.delete_project(&project.id).await.unwrap();
        assert!(remote.projects().await.is_empty());
        assert!(remote.tasks().await.is_empty());
        assert!(remote.time_entries().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_keeps_client_ids_and_rejects_duplicates() {
        let (remote, project, _, _) = seeded().await;
        let task = Task::new(project.id, "Write");
        let created = remote.create_task(&task).await.unwrap();
        assert_eq!(created, task);

        let error = remote.create_task(&task).await.unwrap_err();
        assert!(matches!(
            error,
            Error::RemoteRequestFailed {
                status: Some(409),
                ..
            }
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_records() {
        let remote = InMemoryRemote::new();
        let id = TaskId::new();
        assert_eq!(remote.get_task(&id).await.unwrap(), None);
        assert!(matches!(
            remote.delete_task(&id).await,
            Err(Error::RemoteNotFound(_))
        ));
        assert!(matches!(
            remote.list_tasks(&ProjectId::new()).await,
            Err(Error::RemoteNotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn list_time_entries_filters_by_start() {
        let (remote, project, task, _) = seeded().await;
        let later = TimeEntry::completed(project.id, task.id, 100_000, 160_000);
        remote.insert_time_entry(later.clone()).await;

        let entries = remote
            .list_time_entries(TimeRange::between(50_000, 100_000))
            .await
            .unwrap();
        assert_eq!(entries, vec![later]);
        assert_eq!(
            remote.list_time_entries(TimeRange::all()).await.unwrap().len(),
            2
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn injected_failures_and_reachability() {
        let (remote, project, task, entry) = seeded().await;
        remote
            .fail_for_id(RemoteOperation::DeleteTask, task.id)
            .await;
        assert!(remote.delete_task(&task.id).await.is_err());
        assert!(remote.get_project(&project.id).await.unwrap().is_some());

        remote.set_reachable(false).await;
        assert!(matches!(
            remote.get_time_entry(&entry.id).await,
            Err(Error::NetworkUnavailable)
        ));
        remote.set_reachable(true).await;
        remote.clear_failures().await;
        remote.delete_task(&task.id).await.unwrap();
        assert!(remote.time_entries().await.is_empty());
        assert_eq!(remote.call_count(RemoteOperation::DeleteTask).await, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_time_entry_bumps_updated_at() {
        let (remote, _, _, entry) = seeded().await;
        let patch = TimeEntryPatch {
            notes: Some("done".to_string()),
            ..TimeEntryPatch::default()
        };
        let updated = remote.update_time_entry(&entry.id, &patch).await.unwrap();
        assert_eq!(updated.notes, "done");
        assert!(updated.updated_at >= entry.updated_at);
    }
}
