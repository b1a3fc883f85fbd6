//! Task model

use serde::{Deserialize, Serialize};

use super::id::{ProjectId, TaskId};

/// A task within a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,
    /// Owning project
    pub project_id: ProjectId,
    /// Display name
    pub name: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl Task {
    /// Create a new task under the given project
    #[must_use]
    pub fn new(project_id: ProjectId, name: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            project_id,
            name: name.into(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Partial task update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub project_id: Option<ProjectId>,
    pub name: Option<String>,
}

impl TaskPatch {
    pub fn apply(&self, task: &mut Task) {
        if let Some(project_id) = self.project_id {
            task.project_id = project_id;
        }
        if let Some(name) = &self.name {
            task.name.clone_from(name);
        }
    }
}
