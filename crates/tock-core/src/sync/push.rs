//! Local to remote: local existence is authoritative.
//!
//! Each entity type is diffed by id against one remote snapshot; rows missing
//! remotely are created, rows missing locally are deleted. Remote failures
//! skip the item (or the whole entity type when its snapshot is missing).
//! Local rows left unconfirmed this way go into the report's backlog.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;

use tracing::{debug, warn};

use super::report::{EntityCounts, SyncDirection, SyncReport};
use crate::models::{Project, ProjectId, TaskId, TimeEntryId};
use crate::remote::{RemoteEntityService, TimeRange};
use crate::services::LocalStore;
use crate::util::now_ms;
use crate::{Error, Result};

/// Make the remote hold exactly the local projects, tasks and completed entries.
///
/// Stamps the last-sync marker when done, even if some items failed.
pub async fn push<R: RemoteEntityService>(store: &LocalStore, remote: &R) -> Result<SyncReport> {
    let mut report = SyncReport::new(SyncDirection::Push);

    let local_projects = store.list_projects().await?;
    let remote_projects = push_projects(remote, &local_projects, &mut report).await?;
    push_tasks(store, remote, &local_projects, remote_projects.as_deref(), &mut report).await?;
    push_time_entries(store, remote, &mut report).await?;

    store.set_last_sync_at(now_ms()).await?;
    report.log();
    Ok(report)
}

/// Count a failed remote call, or hand back a local error
fn skip_item(
    counts: &mut EntityCounts,
    action: &str,
    id: impl Display,
    error: Error,
) -> Result<()> {
    if !error.is_remote() {
        return Err(error);
    }
    warn!(action, id = %id, error = %error, "push: item skipped");
    counts.failed += 1;
    Ok(())
}

async fn push_projects<R: RemoteEntityService>(
    remote: &R,
    local_projects: &[Project],
    report: &mut SyncReport,
) -> Result<Option<Vec<ProjectId>>> {
    let remote_ids: Vec<ProjectId> = match remote.list_projects().await {
        Ok(projects) => projects.into_iter().map(|project| project.id).collect(),
        Err(error) if error.is_remote() => {
            warn!(error = %error, "push: project list unavailable, skipping projects");
            report.projects.failed += 1;
            for project in local_projects {
                report.backlog.hold_project(project.id);
            }
            return Ok(None);
        }
        Err(error) => return Err(error),
    };
    let remote_set: HashSet<ProjectId> = remote_ids.iter().copied().collect();
    let local_set: HashSet<ProjectId> = local_projects.iter().map(|project| project.id).collect();

    for project in local_projects.iter().filter(|project| !remote_set.contains(&project.id)) {
        debug!(project_id = %project.id, "push: create project");
        match remote.create_project(project).await {
            Ok(_) => report.projects.created += 1,
            Err(error) => {
                skip_item(&mut report.projects, "create project", project.id, error)?;
                report.backlog.hold_project(project.id);
            }
        }
    }

    for id in remote_ids.iter().filter(|id| !local_set.contains(id)) {
        debug!(project_id = %id, "push: delete project");
        match remote.delete_project(id).await {
            Ok(()) | Err(Error::RemoteNotFound(_)) => report.projects.deleted += 1,
            Err(error) => skip_item(&mut report.projects, "delete project", id, error)?,
        }
    }

    Ok(Some(remote_ids))
}

/// Remote task ids of one project, `None` when the list could not be fetched
async fn fetch_task_ids<R: RemoteEntityService>(
    remote: &R,
    project_id: &ProjectId,
    report: &mut SyncReport,
) -> Option<HashSet<TaskId>> {
    match remote.list_tasks(project_id).await {
        Ok(tasks) => Some(tasks.into_iter().map(|task| task.id).collect()),
        Err(error) => {
            warn!(project_id = %project_id, error = %error, "push: task list unavailable");
            report.tasks.failed += 1;
            None
        }
    }
}

async fn push_tasks<R: RemoteEntityService>(
    store: &LocalStore,
    remote: &R,
    local_projects: &[Project],
    remote_projects: Option<&[ProjectId]>,
    report: &mut SyncReport,
) -> Result<()> {
    let local_tasks = store.list_tasks().await?;
    let local_ids: HashSet<TaskId> = local_tasks.iter().map(|task| task.id).collect();
    let mut snapshots: HashMap<ProjectId, Option<HashSet<TaskId>>> = HashMap::new();

    for task in &local_tasks {
        let snapshot = match snapshots.entry(task.project_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let fetched = fetch_task_ids(remote, &task.project_id, report).await;
                entry.insert(fetched)
            }
        };
        let Some(remote_ids) = snapshot else {
            report.backlog.hold_task(task);
            continue;
        };
        if remote_ids.contains(&task.id) {
            continue;
        }
        debug!(task_id = %task.id, "push: create task");
        match remote.create_task(task).await {
            Ok(_) => {
                remote_ids.insert(task.id);
                report.tasks.created += 1;
            }
            Err(error) => {
                skip_item(&mut report.tasks, "create task", task.id, error)?;
                report.backlog.hold_task(task);
            }
        }
    }

    // Projects deleted above took their tasks with them remotely.
    let Some(remote_projects) = remote_projects else {
        return Ok(());
    };
    let local_projects: HashSet<ProjectId> =
        local_projects.iter().map(|project| project.id).collect();
    for project_id in remote_projects.iter().filter(|id| local_projects.contains(id)) {
        let remote_ids = match snapshots.get(project_id) {
            Some(Some(ids)) => ids.clone(),
            Some(None) => continue,
            None => match fetch_task_ids(remote, project_id, report).await {
                Some(ids) => ids,
                None => continue,
            },
        };
        for id in remote_ids.iter().filter(|id| !local_ids.contains(id)) {
            debug!(task_id = %id, "push: delete task");
            match remote.delete_task(id).await {
                Ok(()) | Err(Error::RemoteNotFound(_)) => report.tasks.deleted += 1,
                Err(error) => skip_item(&mut report.tasks, "delete task", id, error)?,
            }
        }
    }
    Ok(())
}

async fn push_time_entries<R: RemoteEntityService>(
    store: &LocalStore,
    remote: &R,
    report: &mut SyncReport,
) -> Result<()> {
    let local_entries = store.list_reconcilable_time_entries().await?;
    let remote_ids: Vec<TimeEntryId> = match remote.list_time_entries(TimeRange::all()).await {
        Ok(entries) => entries
            .into_iter()
            .filter(|entry| entry.is_reconcilable())
            .map(|entry| entry.id)
            .collect(),
        Err(error) if error.is_remote() => {
            warn!(error = %error, "push: time entry list unavailable, skipping entries");
            report.time_entries.failed += 1;
            for entry in &local_entries {
                report.backlog.hold_time_entry(entry);
            }
            return Ok(());
        }
        Err(error) => return Err(error),
    };
    let remote_set: HashSet<TimeEntryId> = remote_ids.iter().copied().collect();
    let local_set: HashSet<TimeEntryId> = local_entries.iter().map(|entry| entry.id).collect();

    for entry in local_entries.iter().filter(|entry| !remote_set.contains(&entry.id)) {
        debug!(entry_id = %entry.id, "push: create time entry");
        match remote.create_time_entry(entry).await {
            Ok(_) => report.time_entries.created += 1,
            Err(error) => {
                skip_item(&mut report.time_entries, "create time entry", entry.id, error)?;
                report.backlog.hold_time_entry(entry);
            }
        }
    }

    for id in remote_ids.iter().filter(|id| !local_set.contains(id)) {
        debug!(entry_id = %id, "push: delete time entry");
        match remote.delete_time_entry(id).await {
            Ok(()) | Err(Error::RemoteNotFound(_)) => report.time_entries.deleted += 1,
            Err(error) => skip_item(&mut report.time_entries, "delete time entry", id, error)?,
        }
    }
    Ok(())
}
