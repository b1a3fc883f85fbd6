//! Remote to local: the remote decides both content and existence.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::report::{PushBacklog, SyncDirection, SyncReport};
use crate::models::{Project, ProjectId, Task, TaskId, TimeEntry, TimeEntryId};
use crate::remote::{RemoteEntityService, TimeRange};
use crate::services::LocalStore;
use crate::Result;

/// Overwrite the local replica with the remote state.
///
/// Rows already identical to the remote are left untouched, so a second
/// pull against an unchanged remote writes nothing. Rows held in `backlog`
/// are never deleted, nor cascaded away with a parent. Only local store
/// failures are returned as errors.
pub async fn pull<R: RemoteEntityService>(
    store: &LocalStore,
    remote: &R,
    backlog: &PushBacklog,
) -> Result<SyncReport> {
    let mut report = SyncReport::new(SyncDirection::Pull);

    let remote_projects = match remote.list_projects().await {
        Ok(projects) => projects,
        Err(error) if error.is_remote() => {
            warn!(error = %error, "pull: project list unavailable");
            report.abort(error.to_string());
            report.log();
            return Ok(report);
        }
        Err(error) => return Err(error),
    };

    pull_projects(store, &remote_projects, backlog, &mut report).await?;
    pull_tasks(store, remote, &remote_projects, backlog, &mut report).await?;
    pull_time_entries(store, remote, backlog, &mut report).await?;

    report.log();
    Ok(report)
}

async fn pull_projects(
    store: &LocalStore,
    remote_projects: &[Project],
    backlog: &PushBacklog,
    report: &mut SyncReport,
) -> Result<()> {
    let local: HashMap<ProjectId, Project> = store
        .list_projects()
        .await?
        .into_iter()
        .map(|project| (project.id, project))
        .collect();

    for project in remote_projects {
        if local.get(&project.id) == Some(project) {
            report.projects.unchanged += 1;
            continue;
        }
        debug!(project_id = %project.id, "pull: upsert project");
        store.upsert_project(project).await?;
        report.projects.upserted += 1;
    }

    let remote_ids: HashSet<ProjectId> = remote_projects.iter().map(|project| project.id).collect();
    for id in local.keys().filter(|id| !remote_ids.contains(id)) {
        if backlog.holds_project(id) {
            debug!(project_id = %id, "pull: project awaits push, kept");
            report.projects.skipped += 1;
            continue;
        }
        debug!(project_id = %id, "pull: delete project");
        let removed = store.delete_project(id).await?;
        report.projects.deleted += removed.projects;
        report.tasks.deleted += removed.tasks;
        report.time_entries.deleted += removed.time_entries;
    }
    Ok(())
}

async fn pull_tasks<R: RemoteEntityService>(
    store: &LocalStore,
    remote: &R,
    remote_projects: &[Project],
    backlog: &PushBacklog,
    report: &mut SyncReport,
) -> Result<()> {
    // Upsert every fetched list before deleting anything so a task moved
    // between projects is re-parented instead of cascaded away.
    let mut fetched: Vec<(ProjectId, HashSet<TaskId>)> = Vec::new();
    for project in remote_projects {
        let remote_tasks = match remote.list_tasks(&project.id).await {
            Ok(tasks) => tasks,
            Err(error) if error.is_remote() => {
                warn!(project_id = %project.id, error = %error, "pull: task list unavailable");
                report.tasks.failed += 1;
                continue;
            }
            Err(error) => return Err(error),
        };

        let local: HashMap<TaskId, Task> = store
            .list_tasks_by_project(&project.id)
            .await?
            .into_iter()
            .map(|task| (task.id, task))
            .collect();
        for task in &remote_tasks {
            if local.get(&task.id) == Some(task) {
                report.tasks.unchanged += 1;
                continue;
            }
            debug!(task_id = %task.id, "pull: upsert task");
            store.upsert_task(task).await?;
            report.tasks.upserted += 1;
        }
        fetched.push((project.id, remote_tasks.iter().map(|task| task.id).collect()));
    }

    for (project_id, remote_ids) in &fetched {
        for task in store.list_tasks_by_project(project_id).await? {
            if remote_ids.contains(&task.id) {
                continue;
            }
            if backlog.holds_task(&task.id) {
                debug!(task_id = %task.id, "pull: task awaits push, kept");
                report.tasks.skipped += 1;
                continue;
            }
            debug!(task_id = %task.id, "pull: delete task");
            let removed = store.delete_task(&task.id).await?;
            report.tasks.deleted += removed.tasks;
            report.time_entries.deleted += removed.time_entries;
        }
    }
    Ok(())
}

async fn pull_time_entries<R: RemoteEntityService>(
    store: &LocalStore,
    remote: &R,
    backlog: &PushBacklog,
    report: &mut SyncReport,
) -> Result<()> {
    let remote_entries = match remote.list_time_entries(TimeRange::all()).await {
        Ok(entries) => entries,
        Err(error) if error.is_remote() => {
            warn!(error = %error, "pull: time entry list unavailable");
            report.time_entries.failed += 1;
            return Ok(());
        }
        Err(error) => return Err(error),
    };

    let known_projects: HashSet<ProjectId> = store
        .list_projects()
        .await?
        .into_iter()
        .map(|project| project.id)
        .collect();
    let known_tasks: HashSet<TaskId> = store
        .list_tasks()
        .await?
        .into_iter()
        .map(|task| task.id)
        .collect();
    let local: HashMap<TimeEntryId, TimeEntry> = store
        .list_reconcilable_time_entries()
        .await?
        .into_iter()
        .map(|entry| (entry.id, entry))
        .collect();

    let mut remote_ids = HashSet::new();
    for entry in remote_entries.iter().filter(|entry| entry.is_reconcilable()) {
        remote_ids.insert(entry.id);
        if local.get(&entry.id) == Some(entry) {
            report.time_entries.unchanged += 1;
            continue;
        }
        if !known_tasks.contains(&entry.task_id) || !known_projects.contains(&entry.project_id) {
            debug!(entry_id = %entry.id, task_id = %entry.task_id, "pull: unknown task, entry skipped");
            report.time_entries.skipped += 1;
            continue;
        }
        store.upsert_time_entry(entry).await?;
        report.time_entries.upserted += 1;
    }

    for id in local.keys().filter(|id| !remote_ids.contains(id)) {
        if backlog.holds_time_entry(id) {
            debug!(entry_id = %id, "pull: entry awaits push, kept");
            report.time_entries.skipped += 1;
            continue;
        }
        debug!(entry_id = %id, "pull: delete time entry");
        if store.delete_time_entry(id).await? {
            report.time_entries.deleted += 1;
        }
    }
    Ok(())
}
