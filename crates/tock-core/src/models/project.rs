//! Project model

use serde::{Deserialize, Serialize};

use super::id::ProjectId;

/// Display color assigned to projects created without one
pub const DEFAULT_PROJECT_COLOR: &str = "#0d9488";

/// A project owning zero or more tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier
    pub id: ProjectId,
    /// Display name
    pub name: String,
    /// Secondary line shown under the name (may be empty)
    pub subtitle: String,
    /// Display color as `#rrggbb`
    pub color: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl Project {
    /// Create a new project with a fresh id and the default color
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ProjectId::new(),
            name: name.into(),
            subtitle: String::new(),
            color: DEFAULT_PROJECT_COLOR.to_string(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    #[must_use]
    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }
}

/// Partial project update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub subtitle: Option<String>,
    pub color: Option<String>,
}

impl ProjectPatch {
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.subtitle.is_none() && self.color.is_none()
    }

    /// Apply the patch to a project in place
    pub fn apply(&self, project: &mut Project) {
        if let Some(name) = &self.name {
            project.name.clone_from(name);
        }
        if let Some(subtitle) = &self.subtitle {
            project.subtitle.clone_from(subtitle);
        }
        if let Some(color) = &self.color {
            project.color.clone_from(color);
        }
    }
}

/// Check that a color is a `#rrggbb` hex triple
pub fn is_valid_color(value: &str) -> bool {
    let Some(hex) = value.strip_prefix('#') else {
        return false;
    };
    hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())
}
