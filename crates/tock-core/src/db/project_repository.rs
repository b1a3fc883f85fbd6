//! Project repository implementation

use crate::error::Result;
use crate::models::{Project, ProjectId};
use libsql::{params, Connection, Row};

use super::parse_id;

/// Trait for project storage operations (async)
#[allow(async_fn_in_trait)]
pub trait ProjectRepository {
    /// Get a project by ID
    async fn get(&self, id: &ProjectId) -> Result<Option<Project>>;

    /// List all projects, oldest first
    async fn list(&self) -> Result<Vec<Project>>;

    /// Insert a project or overwrite every field of the existing row
    async fn upsert(&self, project: &Project) -> Result<()>;

    /// Delete a project row; returns whether a row was removed
    ///
    /// Fails while tasks or time entries still reference the project.
    async fn delete(&self, id: &ProjectId) -> Result<bool>;
}

/// libSQL implementation of `ProjectRepository`
pub struct LibSqlProjectRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlProjectRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_project(row: &Row) -> Result<Project> {
        Ok(Project {
            id: parse_id(&row.get::<String>(0)?, "project")?,
            name: row.get(1)?,
            subtitle: row.get(2)?,
            color: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl ProjectRepository for LibSqlProjectRepository<'_> {
    async fn get(&self, id: &ProjectId) -> Result<Option<Project>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, subtitle, color, created_at FROM projects WHERE id = ?",
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_project(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Project>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, subtitle, color, created_at
                 FROM projects
                 ORDER BY created_at ASC, id ASC",
                (),
            )
            .await?;

        let mut projects = Vec::new();
        while let Some(row) = rows.next().await? {
            projects.push(Self::parse_project(&row)?);
        }
        Ok(projects)
    }

    async fn upsert(&self, project: &Project) -> Result<()> {
        // ON CONFLICT keeps the row in place; REPLACE would delete it first
        self.conn
            .execute(
                "INSERT INTO projects (id, name, subtitle, color, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    subtitle = excluded.subtitle,
                    color = excluded.color,
                    created_at = excluded.created_at",
                params![
                    project.id.as_str(),
                    project.name.as_str(),
                    project.subtitle.as_str(),
                    project.color.as_str(),
                    project.created_at
                ],
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &ProjectId) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?", params![id.as_str()])
            .await?;
        Ok(rows > 0)
    }
}
