//! Timer session controller.
//!
//! The running session lives only in the local store. Stopping it creates
//! the time entry on the remote first; the local copy is written and the
//! session cleared only after the remote accepted it.

use tracing::{info, warn};

use crate::models::{ActiveTimerSession, ProjectId, TaskId, TimeEntry, TimeEntryId};
use crate::remote::RemoteEntityService;
use crate::services::LocalStore;
use crate::sync::Connectivity;
use crate::util::now_ms;
use crate::{Error, Result};

pub struct TimerController<R, C> {
    store: LocalStore,
    remote: R,
    connectivity: C,
}

impl<R: RemoteEntityService, C: Connectivity> TimerController<R, C> {
    pub const fn new(store: LocalStore, remote: R, connectivity: C) -> Self {
        Self {
            store,
            remote,
            connectivity,
        }
    }

    /// The running session, if any
    pub async fn current(&self) -> Result<Option<ActiveTimerSession>> {
        self.store.active_timer().await
    }

    /// Start timing `task_id`, discarding any session already running
    pub async fn start(
        &self,
        project_id: &ProjectId,
        task_id: &TaskId,
    ) -> Result<ActiveTimerSession> {
        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("task {task_id}")))?;
        if task.project_id != *project_id {
            return Err(Error::InvalidInput(format!(
                "task {task_id} does not belong to project {project_id}"
            )));
        }

        if let Some(previous) = self.store.active_timer().await? {
            warn!(session_id = %previous.id, "discarding running timer");
        }
        let session = ActiveTimerSession::start(*project_id, *task_id, now_ms());
        self.store.save_active_timer(&session).await?;
        info!(session_id = %session.id, task_id = %task_id, "timer started");
        Ok(session)
    }

    /// Switch the running session to the oldest task of `project_id`.
    ///
    /// Leaves the session alone when idle or when the project has no tasks.
    pub async fn change_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<Option<ActiveTimerSession>> {
        let Some(mut session) = self.store.active_timer().await? else {
            return Ok(None);
        };
        let Some(task) = self.store.first_task_of_project(project_id).await? else {
            return Ok(Some(session));
        };
        session.project_id = task.project_id;
        session.task_id = task.id;
        self.store.save_active_timer(&session).await?;
        Ok(Some(session))
    }

    /// Switch the running session to `task_id` and its project
    pub async fn change_task(&self, task_id: &TaskId) -> Result<Option<ActiveTimerSession>> {
        let Some(mut session) = self.store.active_timer().await? else {
            return Ok(None);
        };
        let Some(task) = self.store.get_task(task_id).await? else {
            return Ok(Some(session));
        };
        session.project_id = task.project_id;
        session.task_id = task.id;
        self.store.save_active_timer(&session).await?;
        Ok(Some(session))
    }

    /// Stop the running session and record it as a time entry.
    ///
    /// Returns `Ok(None)` when idle. On any failure the session keeps
    /// running and the error is returned, so stopping can be retried.
    pub async fn stop(&self) -> Result<Option<TimeEntry>> {
        let Some(session) = self.store.active_timer().await? else {
            return Ok(None);
        };
        self.connectivity.ensure_online()?;

        let end_time = now_ms().max(session.start_time);
        let mut entry = TimeEntry::completed(
            session.project_id,
            session.task_id,
            session.start_time,
            end_time,
        );
        // Same id on every retry, so a create that landed but timed out is
        // recognised instead of duplicated.
        entry.id = TimeEntryId::from_uuid(session.id.as_uuid());

        let stored = match self.remote.create_time_entry(&entry).await {
            Ok(created) => created,
            Err(error @ Error::RemoteRequestFailed { status: Some(409), .. }) => {
                match self.remote.get_time_entry(&entry.id).await? {
                    Some(existing) => existing,
                    None => return Err(error),
                }
            }
            Err(error) => {
                warn!(session_id = %session.id, error = %error, "timer stop failed, session kept");
                return Err(error);
            }
        };

        self.store.upsert_time_entry(&stored).await?;
        self.store.clear_active_timer().await?;
        info!(entry_id = %stored.id, duration_ms = stored.duration_ms(), "timer stopped");
        Ok(Some(stored))
    }

    /// Milliseconds since the running session started, `None` when idle
    pub async fn elapsed(&self, now: i64) -> Result<Option<i64>> {
        Ok(self
            .store
            .active_timer()
            .await?
            .map(|session| session.elapsed_ms(now)))
    }
}

/// Render a duration as `m:ss`, or `h:mm:ss` from one hour on
pub fn format_duration(duration_ms: i64) -> String {
    let total_seconds = duration_ms.max(0) / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;
    use crate::remote::{InMemoryRemote, RemoteOperation};
    use crate::sync::{AlwaysOnline, ConnectivityFlag};
    use pretty_assertions::assert_eq;

    struct Fixture {
        timer: TimerController<InMemoryRemote, ConnectivityFlag>,
        store: LocalStore,
        remote: InMemoryRemote,
        online: ConnectivityFlag,
        project: ProjectId,
        task: TaskId,
    }

    async fn fixture() -> Fixture {
        let store = LocalStore::open_in_memory().await.unwrap();
        let remote = InMemoryRemote::new();
        let online = ConnectivityFlag::new(true);
        let project = store.create_project("Work", None, None).await.unwrap();
        let task = store.create_task(&project.id, "Focus").await.unwrap();
        remote.insert_project(project.clone()).await;
        remote.insert_task(task.clone()).await;
        Fixture {
            timer: TimerController::new(store.clone(), remote.clone(), online.clone()),
            store,
            remote,
            online,
            project: project.id,
            task: task.id,
        }
    }

    #[test]
    fn format_duration_switches_to_hours() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(65_000), "1:05");
        assert_eq!(format_duration(3_599_999), "59:59");
        assert_eq!(format_duration(3_723_000), "1:02:03");
        assert_eq!(format_duration(-5), "0:00");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn repeated_start_keeps_one_session() {
        let f = fixture().await;
        f.timer.start(&f.project, &f.task).await.unwrap();
        f.timer.start(&f.project, &f.task).await.unwrap();
        let last = f.timer.start(&f.project, &f.task).await.unwrap();
        assert_eq!(f.timer.current().await.unwrap(), Some(last));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn start_rejects_task_of_another_project() {
        let f = fixture().await;
        let other = f.store.create_project("Other", None, None).await.unwrap();
        let error = f.timer.start(&other.id, &f.task).await.unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
        assert!(matches!(
            f.timer.start(&f.project, &TaskId::new()).await,
            Err(Error::NotFound(_))
        ));
        assert_eq!(f.timer.current().await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_creates_entry_remotely_then_locally() {
        let f = fixture().await;
        let session = f.timer.start(&f.project, &f.task).await.unwrap();

        let entry = f.timer.stop().await.unwrap().unwrap();
        assert_eq!(entry.start_time, session.start_time);
        assert_eq!(entry.task_id, f.task);
        assert_eq!(entry.notes, "");
        assert!(entry.is_reconcilable());
        assert_eq!(f.remote.time_entries().await, vec![entry.clone()]);
        assert_eq!(f.store.get_time_entry(&entry.id).await.unwrap(), Some(entry));
        assert_eq!(f.timer.current().await.unwrap(), None);
        assert_eq!(f.timer.stop().await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_stop_keeps_session() {
        let f = fixture().await;
        let session = f.timer.start(&f.project, &f.task).await.unwrap();
        f.remote.fail_operation(RemoteOperation::CreateTimeEntry).await;

        let error = f.timer.stop().await.unwrap_err();
        assert!(matches!(error, Error::RemoteRequestFailed { .. }));
        assert_eq!(f.timer.current().await.unwrap(), Some(session));
        assert!(f.store.list_time_entries().await.unwrap().is_empty());

        f.remote.clear_failures().await;
        assert!(f.timer.stop().await.unwrap().is_some());
        assert_eq!(f.timer.current().await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_stop_keeps_session() {
        let f = fixture().await;
        f.timer.start(&f.project, &f.task).await.unwrap();
        f.online.set_online(false);

        assert!(matches!(f.timer.stop().await, Err(Error::NetworkUnavailable)));
        assert!(f.timer.current().await.unwrap().is_some());
        assert_eq!(f.remote.call_count(RemoteOperation::CreateTimeEntry).await, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_retry_after_lost_response_does_not_duplicate() {
        let f = fixture().await;
        let session = f.timer.start(&f.project, &f.task).await.unwrap();
        let mut landed = TimeEntry::completed(f.project, f.task, session.start_time, now_ms());
        landed.id = TimeEntryId::from_uuid(session.id.as_uuid());
        f.remote.insert_time_entry(landed.clone()).await;

        let entry = f.timer.stop().await.unwrap().unwrap();
        assert_eq!(entry, landed);
        assert_eq!(f.remote.time_entries().await.len(), 1);
        assert_eq!(f.timer.current().await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn change_project_and_task_while_running() {
        let f = fixture().await;
        let other = f.store.create_project("Other", None, None).await.unwrap();
        let empty = f.store.create_project("Empty", None, None).await.unwrap();
        let first = f.store.create_task(&other.id, "First").await.unwrap();
        f.store.create_task(&other.id, "Second").await.unwrap();

        assert_eq!(f.timer.change_project(&other.id).await.unwrap(), None);

        f.timer.start(&f.project, &f.task).await.unwrap();
        let moved = f.timer.change_project(&other.id).await.unwrap().unwrap();
        assert_eq!((moved.project_id, moved.task_id), (other.id, first.id));

        let unchanged = f.timer.change_project(&empty.id).await.unwrap().unwrap();
        assert_eq!(unchanged, moved);

        let back = f.timer.change_task(&f.task).await.unwrap().unwrap();
        assert_eq!((back.project_id, back.task_id), (f.project, f.task));
        let same = f.timer.change_task(&TaskId::new()).await.unwrap().unwrap();
        assert_eq!(same, back);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn elapsed_reads_running_session() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let project = store.create_project("Work", None, None).await.unwrap();
        let task: Task = store.create_task(&project.id, "Focus").await.unwrap();
        let timer = TimerController::new(store, InMemoryRemote::new(), AlwaysOnline);

        assert_eq!(timer.elapsed(now_ms()).await.unwrap(), None);
        let session = timer.start(&project.id, &task.id).await.unwrap();
        assert_eq!(
            timer.elapsed(session.start_time + 1_500).await.unwrap(),
            Some(1_500)
        );
    }
}
