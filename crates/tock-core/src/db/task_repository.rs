//! Task repository implementation

use crate::error::Result;
use crate::models::{ProjectId, Task, TaskId};
use libsql::{params, Connection, Row};

use super::parse_id;

/// Trait for task storage operations (async)
#[allow(async_fn_in_trait)]
pub trait TaskRepository {
    /// Get a task by ID
    async fn get(&self, id: &TaskId) -> Result<Option<Task>>;

    /// List all tasks, oldest first
    async fn list(&self) -> Result<Vec<Task>>;

    /// List the tasks of one project, oldest first
    async fn list_by_project(&self, project_id: &ProjectId) -> Result<Vec<Task>>;

    /// Insert a task or overwrite every field of the existing row
    async fn upsert(&self, task: &Task) -> Result<()>;

    /// Delete a task row; returns whether a row was removed
    async fn delete(&self, id: &TaskId) -> Result<bool>;
}

/// libSQL implementation of `TaskRepository`
pub struct LibSqlTaskRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlTaskRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_task(row: &Row) -> Result<Task> {
        Ok(Task {
            id: parse_id(&row.get::<String>(0)?, "task")?,
            project_id: parse_id(&row.get::<String>(1)?, "project")?,
            name: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    async fn collect(&self, mut rows: libsql::Rows) -> Result<Vec<Task>> {
        let mut tasks = Vec::new();
        while let Some(row) = rows.next().await? {
            tasks.push(Self::parse_task(&row)?);
        }
        Ok(tasks)
    }
}

impl TaskRepository for LibSqlTaskRepository<'_> {
    async fn get(&self, id: &TaskId) -> Result<Option<Task>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, project_id, name, created_at FROM tasks WHERE id = ?",
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_task(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Task>> {
        let rows = self
            .conn
            .query(
                "SELECT id, project_id, name, created_at
                 FROM tasks
                 ORDER BY created_at ASC, id ASC",
                (),
            )
            .await?;
        self.collect(rows).await
    }

    async fn list_by_project(&self, project_id: &ProjectId) -> Result<Vec<Task>> {
        let rows = self
            .conn
            .query(
                "SELECT id, project_id, name, created_at
                 FROM tasks
                 WHERE project_id = ?
                 ORDER BY created_at ASC, id ASC",
                params![project_id.as_str()],
            )
            .await?;
        self.collect(rows).await
    }

    async fn upsert(&self, task: &Task) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO tasks (id, project_id, name, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    project_id = excluded.project_id,
                    name = excluded.name,
                    created_at = excluded.created_at",
                params![
                    task.id.as_str(),
                    task.project_id.as_str(),
                    task.name.as_str(),
                    task.created_at
                ],
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &TaskId) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?", params![id.as_str()])
            .await?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, LibSqlProjectRepository, ProjectRepository};
    use crate::models::Project;

    async fn setup() -> (Database, Project) {
        let db = Database::open_in_memory().await.unwrap();
        let project = Project::new("Parent");
        LibSqlProjectRepository::new(db.connection())
            .upsert(&project)
            .await
            .unwrap();
        (db, project)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_by_project() {
        let (db, project) = setup().await;
        let other = Project::new("Other");
        LibSqlProjectRepository::new(db.connection())
            .upsert(&other)
            .await
            .unwrap();
        let repo = LibSqlTaskRepository::new(db.connection());

        let mut first = Task::new(project.id, "Design");
        first.created_at = 1;
        let mut second = Task::new(project.id, "Build");
        second.created_at = 2;
        repo.upsert(&second).await.unwrap();
        repo.upsert(&first).await.unwrap();
        repo.upsert(&Task::new(other.id, "Elsewhere")).await.unwrap();

        let tasks = repo.list_by_project(&project.id).await.unwrap();
        assert_eq!(tasks, vec![first, second]);
        assert_eq!(repo.list().await.unwrap().len(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_requires_existing_project() {
        let (db, _project) = setup().await;
        let repo = LibSqlTaskRepository::new(db.connection());

        let orphan = Task::new(ProjectId::new(), "Orphan");
        assert!(repo.upsert(&orphan).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_project_delete_blocked_by_tasks() {
        let (db, project) = setup().await;
        let tasks = LibSqlTaskRepository::new(db.connection());
        let task = Task::new(project.id, "Child");
        tasks.upsert(&task).await.unwrap();

        let projects = LibSqlProjectRepository::new(db.connection());
        assert!(projects.delete(&project.id).await.is_err());

        assert!(tasks.delete(&task.id).await.unwrap());
        assert!(projects.delete(&project.id).await.unwrap());
    }
}
