//! Time entry repository implementation

use crate::error::Result;
use crate::models::{ProjectId, TaskId, TimeEntry, TimeEntryId};
use libsql::{params, Connection, Row, Value};

use super::parse_id;

const COLUMNS: &str =
    "id, project_id, task_id, start_time, end_time, notes, created_at, updated_at";

/// Trait for time entry storage operations (async)
#[allow(async_fn_in_trait)]
pub trait TimeEntryRepository {
    /// Get an entry by ID
    async fn get(&self, id: &TimeEntryId) -> Result<Option<TimeEntry>>;

    /// List all entries ordered by start time
    async fn list(&self) -> Result<Vec<TimeEntry>>;

    /// List entries that have an end timestamp
    async fn list_completed(&self) -> Result<Vec<TimeEntry>>;

    /// List entries whose start lies within `from..=to`; `None` leaves a side open
    async fn list_in_range(&self, from: Option<i64>, to: Option<i64>)
        -> Result<Vec<TimeEntry>>;

    /// List entries of one task
    async fn list_by_task(&self, task_id: &TaskId) -> Result<Vec<TimeEntry>>;

    /// List entries of one project
    async fn list_by_project(&self, project_id: &ProjectId) -> Result<Vec<TimeEntry>>;

    /// Insert an entry or overwrite every field of the existing row
    async fn upsert(&self, entry: &TimeEntry) -> Result<()>;

    /// Delete an entry; returns whether a row was removed
    async fn delete(&self, id: &TimeEntryId) -> Result<bool>;

    /// Delete every entry of a task; returns the number removed
    async fn delete_by_task(&self, task_id: &TaskId) -> Result<u64>;

    /// Delete every entry of a project; returns the number removed
    async fn delete_by_project(&self, project_id: &ProjectId) -> Result<u64>;
}

/// libSQL implementation of `TimeEntryRepository`
pub struct LibSqlTimeEntryRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlTimeEntryRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_entry(row: &Row) -> Result<TimeEntry> {
        Ok(TimeEntry {
            id: parse_id(&row.get::<String>(0)?, "time entry")?,
            project_id: parse_id(&row.get::<String>(1)?, "project")?,
            task_id: parse_id(&row.get::<String>(2)?, "task")?,
            start_time: row.get(3)?,
            end_time: row.get::<Option<i64>>(4)?,
            notes: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    async fn select(
        &self,
        filter: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<TimeEntry>> {
        let sql =
            format!("SELECT {COLUMNS} FROM time_entries {filter} ORDER BY start_time ASC, id ASC");
        let mut rows = self.conn.query(&sql, params).await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(Self::parse_entry(&row)?);
        }
        Ok(entries)
    }
}

fn optional_integer(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

impl TimeEntryRepository for LibSqlTimeEntryRepository<'_> {
    async fn get(&self, id: &TimeEntryId) -> Result<Option<TimeEntry>> {
        let mut entries = self.select("WHERE id = ?", params![id.as_str()]).await?;
        Ok(entries.pop())
    }

    async fn list(&self) -> Result<Vec<TimeEntry>> {
        self.select("", ()).await
    }

    async fn list_completed(&self) -> Result<Vec<TimeEntry>> {
        self.select("WHERE end_time IS NOT NULL", ()).await
    }

    async fn list_in_range(&self, from: Option<i64>, to: Option<i64>) -> Result<Vec<TimeEntry>> {
        self.select(
            "WHERE (?1 IS NULL OR start_time >= ?1) AND (?2 IS NULL OR start_time <= ?2)",
            params![optional_integer(from), optional_integer(to)],
        )
        .await
    }

    async fn list_by_task(&self, task_id: &TaskId) -> Result<Vec<TimeEntry>> {
        self.select("WHERE task_id = ?", params![task_id.as_str()])
            .await
    }

    async fn list_by_project(&self, project_id: &ProjectId) -> Result<Vec<TimeEntry>> {
        self.select("WHERE project_id = ?", params![project_id.as_str()])
            .await
    }

    async fn upsert(&self, entry: &TimeEntry) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO time_entries
                    (id, project_id, task_id, start_time, end_time, notes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                    project_id = excluded.project_id,
                    task_id = excluded.task_id,
                    start_time = excluded.start_time,
                    end_time = excluded.end_time,
                    notes = excluded.notes,
                    created_at = excluded.created_at,
                    updated_at = excluded.updated_at",
                params![
                    entry.id.as_str(),
                    entry.project_id.as_str(),
                    entry.task_id.as_str(),
                    entry.start_time,
                    optional_integer(entry.end_time),
                    entry.notes.as_str(),
                    entry.created_at,
                    entry.updated_at
                ],
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &TimeEntryId) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM time_entries WHERE id = ?", params![id.as_str()])
            .await?;
        Ok(rows > 0)
    }

    async fn delete_by_task(&self, task_id: &TaskId) -> Result<u64> {
        Ok(self
            .conn
            .execute(
                "DELETE FROM time_entries WHERE task_id = ?",
                params![task_id.as_str()],
            )
            .await?)
    }

    async fn delete_by_project(&self, project_id: &ProjectId) -> Result<u64> {
        Ok(self
            .conn
            .execute(
                "DELETE FROM time_entries WHERE project_id = ?",
                params![project_id.as_str()],
            )
            .await?)
    }
}
