//! Local replica store shared by the reconciliation engine, the timer and
//! direct user actions.
//!
//! All access goes through one tokio mutex around the libSQL connection, so
//! a cascade or an upsert never interleaves with another writer.

use std::path::PathBuf;
use std::sync::Arc;

use libsql::Connection;
use tokio::sync::Mutex;

use crate::db::{
    Database, LibSqlProjectRepository, LibSqlSettingsRepository, LibSqlTaskRepository,
    LibSqlTimeEntryRepository, LibSqlTimerRepository, ProjectRepository, SettingsRepository,
    TaskRepository, TimeEntryRepository, TimerRepository,
};
use crate::models::{
    is_valid_color, ActiveTimerSession, Project, ProjectId, ProjectPatch, Task, TaskId, TimeEntry,
    TimeEntryId, TimeEntryPatch,
};
use crate::{Error, Result};

/// Rows removed by a cascading delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeSummary {
    pub projects: u64,
    pub tasks: u64,
    pub time_entries: u64,
}

impl CascadeSummary {
    pub const fn is_empty(&self) -> bool {
        self.projects == 0 && self.tasks == 0 && self.time_entries == 0
    }
}

/// Thread-safe handle to the local replica.
///
/// Cloning is cheap and every clone shares the same database.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl LocalStore {
    /// Open a store at the given filesystem path, creating parent directories.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Filesystem path of the store, `None` when in memory.
    pub fn path(&self) -> Option<&std::path::Path> {
        self.db_path.as_deref()
    }

    // -- projects ----------------------------------------------------------

    pub async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>> {
        let db = self.db.lock().await;
        LibSqlProjectRepository::new(db.connection()).get(id).await
    }

    /// List projects, oldest first.
    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        let db = self.db.lock().await;
        LibSqlProjectRepository::new(db.connection()).list().await
    }

    /// Insert or overwrite a project by id.
    pub async fn upsert_project(&self, project: &Project) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlProjectRepository::new(db.connection())
            .upsert(project)
            .await
    }

    /// Create a project locally with a fresh id.
    pub async fn create_project(
        &self,
        name: &str,
        subtitle: Option<&str>,
        color: Option<&str>,
    ) -> Result<Project> {
        let mut project = Project::new(validate_name(name)?);
        if let Some(subtitle) = subtitle {
            project.subtitle = subtitle.trim().to_string();
        }
        if let Some(color) = color {
            project.color = validate_color(color)?;
        }

        self.upsert_project(&project).await?;
        tracing::debug!("Created project {} locally", project.id);
        Ok(project)
    }

    /// Apply a partial update to a project.
    pub async fn update_project(&self, id: &ProjectId, patch: &ProjectPatch) -> Result<Project> {
        let mut patch = patch.clone();
        if let Some(name) = &patch.name {
            patch.name = Some(validate_name(name)?);
        }
        if let Some(color) = &patch.color {
            patch.color = Some(validate_color(color)?);
        }

        let db = self.db.lock().await;
        let repo = LibSqlProjectRepository::new(db.connection());
        let mut project = repo
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("project {id}")))?;
        patch.apply(&mut project);
        repo.upsert(&project).await?;
        Ok(project)
    }

    /// Delete a project together with its tasks and their time entries.
    ///
    /// Children go first, and an active timer pointing into the project is
    /// cleared, so nothing is left orphaned.
    pub async fn delete_project(&self, id: &ProjectId) -> Result<CascadeSummary> {
        let db = self.db.lock().await;
        in_transaction(db.connection(), |conn| async move {
            cascade_delete_project(conn, id).await
        })
        .await
    }

    // -- tasks -------------------------------------------------------------

    pub async fn get_task(&self, id: &TaskId) -> Result<Option<Task>> {
        let db = self.db.lock().await;
        LibSqlTaskRepository::new(db.connection()).get(id).await
    }

    /// List all tasks, oldest first.
    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        let db = self.db.lock().await;
        LibSqlTaskRepository::new(db.connection()).list().await
    }

    /// List the tasks of a project, oldest first.
    pub async fn list_tasks_by_project(&self, project_id: &ProjectId) -> Result<Vec<Task>> {
        let db = self.db.lock().await;
        LibSqlTaskRepository::new(db.connection())
            .list_by_project(project_id)
            .await
    }

    /// Oldest task of a project, if it has any.
    pub async fn first_task_of_project(&self, project_id: &ProjectId) -> Result<Option<Task>> {
        Ok(self
            .list_tasks_by_project(project_id)
            .await?
            .into_iter()
            .next())
    }

    /// Insert or overwrite a task by id.
    pub async fn upsert_task(&self, task: &Task) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlTaskRepository::new(db.connection()).upsert(task).await
    }

    /// Create a task under an existing project.
    pub async fn create_task(&self, project_id: &ProjectId, name: &str) -> Result<Task> {
        let name = validate_name(name)?;
        let db = self.db.lock().await;
        if LibSqlProjectRepository::new(db.connection())
            .get(project_id)
            .await?
            .is_none()
        {
            return Err(Error::NotFound(format!("project {project_id}")));
        }

        let task = Task::new(*project_id, name);
        LibSqlTaskRepository::new(db.connection())
            .upsert(&task)
            .await?;
        tracing::debug!("Created task {} locally", task.id);
        Ok(task)
    }

    /// Rename a task.
    pub async fn rename_task(&self, id: &TaskId, name: &str) -> Result<Task> {
        let name = validate_name(name)?;
        let db = self.db.lock().await;
        let repo = LibSqlTaskRepository::new(db.connection());
        let mut task = repo
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("task {id}")))?;
        task.name = name;
        repo.upsert(&task).await?;
        Ok(task)
    }

    /// Delete a task together with its time entries.
    pub async fn delete_task(&self, id: &TaskId) -> Result<CascadeSummary> {
        let db = self.db.lock().await;
        in_transaction(db.connection(), |conn| async move {
            cascade_delete_task(conn, id).await
        })
        .await
    }

    // -- time entries ------------------------------------------------------

    pub async fn get_time_entry(&self, id: &TimeEntryId) -> Result<Option<TimeEntry>> {
        let db = self.db.lock().await;
        LibSqlTimeEntryRepository::new(db.connection())
            .get(id)
            .await
    }

    /// List every entry, including in-progress ones, by start time.
    pub async fn list_time_entries(&self) -> Result<Vec<TimeEntry>> {
        let db = self.db.lock().await;
        LibSqlTimeEntryRepository::new(db.connection()).list().await
    }

    /// List entries that have an end timestamp.
    pub async fn list_reconcilable_time_entries(&self) -> Result<Vec<TimeEntry>> {
        let db = self.db.lock().await;
        LibSqlTimeEntryRepository::new(db.connection())
            .list_completed()
            .await
    }

    /// List entries whose start lies within `from..=to`.
    pub async fn list_time_entries_in_range(
        &self,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Result<Vec<TimeEntry>> {
        let db = self.db.lock().await;
        LibSqlTimeEntryRepository::new(db.connection())
            .list_in_range(from, to)
            .await
    }

    pub async fn list_time_entries_by_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<TimeEntry>> {
        let db = self.db.lock().await;
        LibSqlTimeEntryRepository::new(db.connection())
            .list_by_project(project_id)
            .await
    }

    pub async fn list_time_entries_by_task(&self, task_id: &TaskId) -> Result<Vec<TimeEntry>> {
        let db = self.db.lock().await;
        LibSqlTimeEntryRepository::new(db.connection())
            .list_by_task(task_id)
            .await
    }

    /// Insert or overwrite an entry by id.
    pub async fn upsert_time_entry(&self, entry: &TimeEntry) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlTimeEntryRepository::new(db.connection())
            .upsert(entry)
            .await
    }

    /// Record a completed interval for a task.
    pub async fn create_time_entry(
        &self,
        task_id: &TaskId,
        start_time: i64,
        end_time: i64,
        notes: &str,
    ) -> Result<TimeEntry> {
        validate_interval(start_time, Some(end_time))?;

        let db = self.db.lock().await;
        let task = LibSqlTaskRepository::new(db.connection())
            .get(task_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("task {task_id}")))?;

        let mut entry = TimeEntry::completed(task.project_id, task.id, start_time, end_time);
        entry.notes = notes.trim().to_string();
        LibSqlTimeEntryRepository::new(db.connection())
            .upsert(&entry)
            .await?;
        Ok(entry)
    }

    /// Apply a partial update to an entry, keeping project and task consistent.
    pub async fn update_time_entry(
        &self,
        id: &TimeEntryId,
        patch: &TimeEntryPatch,
    ) -> Result<TimeEntry> {
        let db = self.db.lock().await;
        let entries = LibSqlTimeEntryRepository::new(db.connection());
        let mut entry = entries
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("time entry {id}")))?;

        patch.apply(&mut entry, chrono::Utc::now().timestamp_millis());
        validate_interval(entry.start_time, entry.end_time)?;

        let task = LibSqlTaskRepository::new(db.connection())
            .get(&entry.task_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("task {}", entry.task_id)))?;
        if patch.project_id.is_some() && task.project_id != entry.project_id {
            return Err(Error::InvalidInput(format!(
                "task {} does not belong to project {}",
                task.id, entry.project_id
            )));
        }
        entry.project_id = task.project_id;

        entries.upsert(&entry).await?;
        Ok(entry)
    }

    /// Delete one entry; returns whether it existed.
    pub async fn delete_time_entry(&self, id: &TimeEntryId) -> Result<bool> {
        let db = self.db.lock().await;
        LibSqlTimeEntryRepository::new(db.connection())
            .delete(id)
            .await
    }

    // -- active timer ------------------------------------------------------

    pub async fn active_timer(&self) -> Result<Option<ActiveTimerSession>> {
        let db = self.db.lock().await;
        LibSqlTimerRepository::new(db.connection()).get().await
    }

    /// Store the session, replacing any existing one.
    pub async fn save_active_timer(&self, session: &ActiveTimerSession) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlTimerRepository::new(db.connection())
            .save(session)
            .await
    }

    pub async fn clear_active_timer(&self) -> Result<bool> {
        let db = self.db.lock().await;
        LibSqlTimerRepository::new(db.connection()).clear().await
    }

    // -- sync bookkeeping --------------------------------------------------

    pub async fn last_sync_at(&self) -> Result<Option<i64>> {
        let db = self.db.lock().await;
        LibSqlSettingsRepository::new(db.connection())
            .last_sync_at()
            .await
    }

    pub async fn set_last_sync_at(&self, timestamp_ms: i64) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlSettingsRepository::new(db.connection())
            .set_last_sync_at(timestamp_ms)
            .await
    }
}

async fn cascade_delete_task(conn: &Connection, id: &TaskId) -> Result<CascadeSummary> {
    let time_entries = LibSqlTimeEntryRepository::new(conn)
        .delete_by_task(id)
        .await?;

    let timers = LibSqlTimerRepository::new(conn);
    if timers
        .get()
        .await?
        .is_some_and(|session| session.task_id == *id)
    {
        timers.clear().await?;
    }

    let tasks = u64::from(LibSqlTaskRepository::new(conn).delete(id).await?);
    Ok(CascadeSummary {
        projects: 0,
        tasks,
        time_entries,
    })
}

async fn cascade_delete_project(conn: &Connection, id: &ProjectId) -> Result<CascadeSummary> {
    let mut summary = CascadeSummary::default();

    for task in LibSqlTaskRepository::new(conn).list_by_project(id).await? {
        let removed = cascade_delete_task(conn, &task.id).await?;
        summary.tasks += removed.tasks;
        summary.time_entries += removed.time_entries;
    }
    // Entries pointing at the project through a task of another project
    summary.time_entries += LibSqlTimeEntryRepository::new(conn)
        .delete_by_project(id)
        .await?;

    let timers = LibSqlTimerRepository::new(conn);
    if timers
        .get()
        .await?
        .is_some_and(|session| session.project_id == *id)
    {
        timers.clear().await?;
    }

    summary.projects = u64::from(LibSqlProjectRepository::new(conn).delete(id).await?);
    Ok(summary)
}

async fn in_transaction<'c, T, F, Fut>(conn: &'c Connection, work: F) -> Result<T>
where
    F: FnOnce(&'c Connection) -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    conn.execute("BEGIN TRANSACTION", ()).await?;
    match work(conn).await {
        Ok(value) => {
            if let Err(e) = conn.execute("COMMIT", ()).await {
                conn.execute("ROLLBACK", ()).await.ok();
                return Err(e.into());
            }
            Ok(value)
        }
        Err(error) => {
            conn.execute("ROLLBACK", ()).await.ok();
            Err(error)
        }
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("name must not be empty".to_string()));
    }
    if name.chars().count() > 200 {
        return Err(Error::InvalidInput(
            "name must be at most 200 characters".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn validate_color(color: &str) -> Result<String> {
    let color = color.trim();
    if is_valid_color(color) {
        Ok(color.to_ascii_lowercase())
    } else {
        Err(Error::InvalidInput(format!(
            "color must look like #rrggbb, got {color}"
        )))
    }
}

fn validate_interval(start_time: i64, end_time: Option<i64>) -> Result<()> {
    match end_time {
        Some(end_time) if end_time < start_time => Err(Error::InvalidInput(
            "end time must not be before start time".to_string(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn seeded() -> (LocalStore, Project, Task) {
        let store = LocalStore::open_in_memory().await.unwrap();
        let project = store.create_project("Client", None, None).await.unwrap();
        let task = store.create_task(&project.id, "Design").await.unwrap();
        (store, project, task)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_project_validates_input() {
        let store = LocalStore::open_in_memory().await.unwrap();
        assert!(store.create_project("   ", None, None).await.is_err());
        assert!(store
            .create_project("Ok", None, Some("red"))
            .await
            .is_err());

        let project = store
            .create_project("  Ok ", Some(" sub "), Some("#ABCDEF"))
            .await
            .unwrap();
        assert_eq!(project.name, "Ok");
        assert_eq!(project.subtitle, "sub");
        assert_eq!(project.color, "#abcdef");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_task_requires_project() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let error = store
            .create_task(&ProjectId::new(), "Lost")
            .await
            .unwrap_err();
        assert!(matches!(error, Error::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn deleting_project_cascades_to_tasks_and_entries() {
        let (store, project, task) = seeded().await;
        let second = store.create_task(&project.id, "Build").await.unwrap();
        store
            .create_time_entry(&task.id, 1_000, 2_000, "")
            .await
            .unwrap();
        store
            .create_time_entry(&second.id, 3_000, 4_000, "")
            .await
            .unwrap();

        let keep = store.create_project("Keep", None, None).await.unwrap();
        let keep_task = store.create_task(&keep.id, "Stay").await.unwrap();
        store
            .create_time_entry(&keep_task.id, 5_000, 6_000, "")
            .await
            .unwrap();

        let summary = store.delete_project(&project.id).await.unwrap();
        assert_eq!(
            summary,
            CascadeSummary {
                projects: 1,
                tasks: 2,
                time_entries: 2,
            }
        );

        assert!(store.get_project(&project.id).await.unwrap().is_none());
        let tasks = store.list_tasks().await.unwrap();
        assert_eq!(tasks, vec![keep_task.clone()]);
        let entries = store.list_time_entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].task_id, keep_task.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn lists_entries_by_project_and_task() {
        let (store, project, task) = seeded().await;
        let second = store.create_task(&project.id, "Build").await.unwrap();
        let first = store
            .create_time_entry(&task.id, 1_000, 2_000, "")
            .await
            .unwrap();
        let other = store
            .create_time_entry(&second.id, 3_000, 4_000, "")
            .await
            .unwrap();
        let elsewhere = store.create_project("Other", None, None).await.unwrap();
        let elsewhere_task = store.create_task(&elsewhere.id, "Misc").await.unwrap();
        store
            .create_time_entry(&elsewhere_task.id, 5_000, 6_000, "")
            .await
            .unwrap();

        let by_task = store.list_time_entries_by_task(&task.id).await.unwrap();
        assert_eq!(by_task, vec![first.clone()]);

        let ids: Vec<_> = store
            .list_time_entries_by_project(&project.id)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.id)
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&first.id));
        assert!(ids.contains(&other.id));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn deleting_task_cascades_and_clears_its_timer() {
        let (store, project, task) = seeded().await;
        store
            .create_time_entry(&task.id, 1_000, 2_000, "")
            .await
            .unwrap();
        store
            .save_active_timer(&ActiveTimerSession::start(project.id, task.id, 10))
            .await
            .unwrap();

        let summary = store.delete_task(&task.id).await.unwrap();
        assert_eq!(summary.tasks, 1);
        assert_eq!(summary.time_entries, 1);
        assert!(store.active_timer().await.unwrap().is_none());
        assert!(store.get_project(&project.id).await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn deleting_missing_project_is_empty_cascade() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let summary = store.delete_project(&ProjectId::new()).await.unwrap();
        assert!(summary.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_time_entry_rejects_inverted_interval() {
        let (store, _project, task) = seeded().await;
        let entry = store
            .create_time_entry(&task.id, 1_000, 2_000, "note")
            .await
            .unwrap();

        let patch = TimeEntryPatch {
            end_time: Some(500),
            ..TimeEntryPatch::default()
        };
        assert!(store.update_time_entry(&entry.id, &patch).await.is_err());

        let patch = TimeEntryPatch {
            notes: Some("edited".to_string()),
            ..TimeEntryPatch::default()
        };
        let updated = store.update_time_entry(&entry.id, &patch).await.unwrap();
        assert_eq!(updated.notes, "edited");
        assert!(updated.updated_at >= entry.updated_at);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_time_entry_moves_project_with_task() {
        let (store, _project, task) = seeded().await;
        let other = store.create_project("Other", None, None).await.unwrap();
        let other_task = store.create_task(&other.id, "Elsewhere").await.unwrap();
        let entry = store
            .create_time_entry(&task.id, 1_000, 2_000, "")
            .await
            .unwrap();

        let patch = TimeEntryPatch {
            task_id: Some(other_task.id),
            ..TimeEntryPatch::default()
        };
        let updated = store.update_time_entry(&entry.id, &patch).await.unwrap();
        assert_eq!(updated.project_id, other.id);

        let mismatched = TimeEntryPatch {
            project_id: Some(entry.project_id),
            ..TimeEntryPatch::default()
        };
        assert!(store.update_time_entry(&entry.id, &mismatched).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn first_task_is_oldest() {
        let (store, project, task) = seeded().await;
        let mut later = Task::new(project.id, "Later");
        later.created_at = task.created_at + 10;
        store.upsert_task(&later).await.unwrap();

        let first = store.first_task_of_project(&project.id).await.unwrap();
        assert_eq!(first, Some(task));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn on_disk_store_creates_parent_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("tock.db");
        let store = LocalStore::open_path(&path).await.unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        store.set_last_sync_at(42).await.unwrap();
        assert_eq!(store.last_sync_at().await.unwrap(), Some(42));
    }
}
