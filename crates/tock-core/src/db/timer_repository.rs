//! Active timer repository implementation

use crate::error::Result;
use crate::models::ActiveTimerSession;
use libsql::{params, Connection};

use super::parse_id;

/// Trait for the singleton active timer (async)
#[allow(async_fn_in_trait)]
pub trait TimerRepository {
    /// Load the active session, if any
    async fn get(&self) -> Result<Option<ActiveTimerSession>>;

    /// Store a session, replacing any existing one
    async fn save(&self, session: &ActiveTimerSession) -> Result<()>;

    /// Remove the active session; returns whether one existed
    async fn clear(&self) -> Result<bool>;
}

/// libSQL implementation of `TimerRepository`
pub struct LibSqlTimerRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlTimerRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl TimerRepository for LibSqlTimerRepository<'_> {
    async fn get(&self) -> Result<Option<ActiveTimerSession>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, project_id, task_id, start_time FROM active_timer WHERE slot = 1",
                (),
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        Ok(Some(ActiveTimerSession {
            id: parse_id(&row.get::<String>(0)?, "timer session")?,
            project_id: parse_id(&row.get::<String>(1)?, "project")?,
            task_id: parse_id(&row.get::<String>(2)?, "task")?,
            start_time: row.get(3)?,
        }))
    }

    async fn save(&self, session: &ActiveTimerSession) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO active_timer (slot, id, project_id, task_id, start_time)
                 VALUES (1, ?1, ?2, ?3, ?4)",
                params![
                    session.id.as_str(),
                    session.project_id.as_str(),
                    session.task_id.as_str(),
                    session.start_time
                ],
            )
            .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<bool> {
        let rows = self.conn.execute("DELETE FROM active_timer", ()).await?;
        Ok(rows > 0)
    }
}
