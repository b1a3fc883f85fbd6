//! Active timer session model

use serde::{Deserialize, Serialize};

use super::id::{ProjectId, TaskId, TimerSessionId};

/// The single in-progress timing session
///
/// Lives only in the local store and is never synced. Stopping it turns it
/// into a completed [`super::TimeEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveTimerSession {
    pub id: TimerSessionId,
    pub project_id: ProjectId,
    pub task_id: TaskId,
    /// Start timestamp (Unix ms)
    pub start_time: i64,
}

impl ActiveTimerSession {
    #[must_use]
    pub fn start(project_id: ProjectId, task_id: TaskId, start_time: i64) -> Self {
        Self {
            id: TimerSessionId::new(),
            project_id,
            task_id,
            start_time,
        }
    }

    /// Milliseconds elapsed at `now`, clamped at zero for clock skew
    pub fn elapsed_ms(&self, now: i64) -> i64 {
        (now - self.start_time).max(0)
    }
}
