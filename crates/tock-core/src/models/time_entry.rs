//! Time entry model

use serde::{Deserialize, Serialize};

use super::id::{ProjectId, TaskId, TimeEntryId};

/// A tracked interval of work on a task
///
/// Only entries with an end timestamp are reconcilable; an entry without one
/// is in progress and never leaves the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    /// Unique identifier
    pub id: TimeEntryId,
    /// Project of the task (denormalized)
    pub project_id: ProjectId,
    /// Task the time was spent on
    pub task_id: TaskId,
    /// Start timestamp (Unix ms)
    pub start_time: i64,
    /// End timestamp (Unix ms), `None` while running
    pub end_time: Option<i64>,
    /// Free-form notes (may be empty)
    pub notes: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl TimeEntry {
    /// Create a completed entry covering `start_time..end_time`
    #[must_use]
    pub fn completed(
        project_id: ProjectId,
        task_id: TaskId,
        start_time: i64,
        end_time: i64,
    ) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: TimeEntryId::new(),
            project_id,
            task_id,
            start_time,
            end_time: Some(end_time),
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this entry takes part in reconciliation
    pub const fn is_reconcilable(&self) -> bool {
        self.end_time.is_some()
    }

    /// Tracked duration in milliseconds, `None` while running
    pub fn duration_ms(&self) -> Option<i64> {
        self.end_time.map(|end| (end - self.start_time).max(0))
    }
}

/// Partial time entry update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntryPatch {
    pub project_id: Option<ProjectId>,
    pub task_id: Option<TaskId>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub notes: Option<String>,
}

impl TimeEntryPatch {
    /// Apply the patch and bump `updated_at`
    pub fn apply(&self, entry: &mut TimeEntry, now: i64) {
        if let Some(project_id) = self.project_id {
            entry.project_id = project_id;
        }
        if let Some(task_id) = self.task_id {
            entry.task_id = task_id;
        }
        if let Some(start_time) = self.start_time {
            entry.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            entry.end_time = Some(end_time);
        }
        if let Some(notes) = &self.notes {
            entry.notes.clone_from(notes);
        }
        entry.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_entry_is_reconcilable() {
        let entry = TimeEntry::completed(ProjectId::new(), TaskId::new(), 1_000, 61_000);
        assert!(entry.is_reconcilable());
        assert_eq!(entry.duration_ms(), Some(60_000));
        assert!(entry.notes.is_empty());
    }

    #[test]
    fn running_entry_is_not_reconcilable() {
        let mut entry = TimeEntry::completed(ProjectId::new(), TaskId::new(), 1_000, 2_000);
        entry.end_time = None;
        assert!(!entry.is_reconcilable());
        assert_eq!(entry.duration_ms(), None);
    }

    #[test]
    fn patch_bumps_updated_at() {
        let mut entry = TimeEntry::completed(ProjectId::new(), TaskId::new(), 1_000, 2_000);
        let patch = TimeEntryPatch {
            notes: Some("standup".to_string()),
            end_time: Some(5_000),
            ..TimeEntryPatch::default()
        };
        patch.apply(&mut entry, 9_999);
        assert_eq!(entry.notes, "standup");
        assert_eq!(entry.end_time, Some(5_000));
        assert_eq!(entry.updated_at, 9_999);
        assert_eq!(entry.start_time, 1_000);
    }
}
