use std::collections::HashSet;
use std::fmt;

use tracing::{info, warn};

use crate::models::{ProjectId, Task, TaskId, TimeEntry, TimeEntryId};

/// Which way a pass moved data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    Push,
    Pull,
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push => f.write_str("push"),
            Self::Pull => f.write_str("pull"),
        }
    }
}

/// Per-entity tallies for one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    /// Created on the other side (push)
    pub created: u64,
    /// Deleted on the target side, cascades included
    pub deleted: u64,
    /// Written locally from the remote (pull)
    pub upserted: u64,
    /// Already identical, nothing written
    pub unchanged: u64,
    /// Left alone: a dependency was missing, or the row still awaits push
    pub skipped: u64,
    /// Remote calls that failed and were skipped
    pub failed: u64,
}

impl EntityCounts {
    pub const ZERO: Self = Self {
        created: 0,
        deleted: 0,
        upserted: 0,
        unchanged: 0,
        skipped: 0,
        failed: 0,
    };

    pub const fn changes(&self) -> u64 {
        self.created + self.deleted + self.upserted
    }
}

/// Local rows a push could not confirm on the remote.
///
/// Recording a row also records its parents, so a pull in the same round
/// keeps the whole chain instead of cascading it away.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushBacklog {
    pub projects: HashSet<ProjectId>,
    pub tasks: HashSet<TaskId>,
    pub time_entries: HashSet<TimeEntryId>,
}

impl PushBacklog {
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty() && self.tasks.is_empty() && self.time_entries.is_empty()
    }

    pub fn holds_project(&self, id: &ProjectId) -> bool {
        self.projects.contains(id)
    }

    pub fn holds_task(&self, id: &TaskId) -> bool {
        self.tasks.contains(id)
    }

    pub fn holds_time_entry(&self, id: &TimeEntryId) -> bool {
        self.time_entries.contains(id)
    }

    pub(crate) fn hold_project(&mut self, id: ProjectId) {
        self.projects.insert(id);
    }

    pub(crate) fn hold_task(&mut self, task: &Task) {
        self.tasks.insert(task.id);
        self.projects.insert(task.project_id);
    }

    pub(crate) fn hold_time_entry(&mut self, entry: &TimeEntry) {
        self.time_entries.insert(entry.id);
        self.tasks.insert(entry.task_id);
        self.projects.insert(entry.project_id);
    }
}

/// Outcome of one push or pull pass
///
/// Item failures are counted, never raised. `aborted` is set when the pass
/// could not start because its top-level snapshot was unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub direction: SyncDirection,
    pub projects: EntityCounts,
    pub tasks: EntityCounts,
    pub time_entries: EntityCounts,
    pub aborted: Option<String>,
    /// Filled by push; empty for pull
    pub backlog: PushBacklog,
}

impl SyncReport {
    pub fn new(direction: SyncDirection) -> Self {
        Self {
            direction,
            projects: EntityCounts::ZERO,
            tasks: EntityCounts::ZERO,
            time_entries: EntityCounts::ZERO,
            aborted: None,
            backlog: PushBacklog::default(),
        }
    }

    pub const fn failed(&self) -> u64 {
        self.projects.failed + self.tasks.failed + self.time_entries.failed
    }

    pub const fn changes(&self) -> u64 {
        self.projects.changes() + self.tasks.changes() + self.time_entries.changes()
    }

    /// Completed with no failed remote call
    pub const fn is_clean(&self) -> bool {
        self.aborted.is_none() && self.failed() == 0
    }

    pub(crate) fn abort(&mut self, reason: impl Into<String>) {
        self.aborted = Some(reason.into());
    }

    pub(crate) fn log(&self) {
        if let Some(reason) = &self.aborted {
            warn!(direction = %self.direction, reason = %reason, "sync pass aborted");
            return;
        }
        info!(
            direction = %self.direction,
            projects = ?self.projects,
            tasks = ?self.tasks,
            time_entries = ?self.time_entries,
            failed = self.failed(),
            "sync pass finished"
        );
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(reason) = &self.aborted {
            return write!(f, "{}: aborted ({reason})", self.direction);
        }
        write!(f, "{}:", self.direction)?;
        for (label, counts) in [
            ("projects", &self.projects),
            ("tasks", &self.tasks),
            ("entries", &self.time_entries),
        ] {
            write!(
                f,
                " {label} +{} -{} ~{}",
                counts.created, counts.deleted, counts.upserted
            )?;
            if counts.failed > 0 {
                write!(f, " !{}", counts.failed)?;
            }
        }
        Ok(())
    }
}
