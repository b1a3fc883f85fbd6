//! Settings repository implementation

use crate::error::Result;
use libsql::Connection;

const LAST_SYNC_AT: &str = "last_sync_at";

/// Trait for local key/value settings (async)
#[allow(async_fn_in_trait)]
pub trait SettingsRepository {
    /// Read a raw setting value
    async fn get_setting(&self, key: &str) -> Result<Option<String>>;

    /// Write a raw setting value
    async fn set_setting(&self, key: &str, value: &str) -> Result<()>;

    /// Timestamp (Unix ms) of the last completed sync attempt
    async fn last_sync_at(&self) -> Result<Option<i64>> {
        Ok(self
            .get_setting(LAST_SYNC_AT)
            .await?
            .and_then(|value| value.trim().parse().ok()))
    }

    /// Record the last completed sync attempt
    async fn set_last_sync_at(&self, timestamp_ms: i64) -> Result<()> {
        self.set_setting(LAST_SYNC_AT, &timestamp_ms.to_string())
            .await
    }
}

/// libSQL implementation of `SettingsRepository`
pub struct LibSqlSettingsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSettingsRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SettingsRepository for LibSqlSettingsRepository<'_> {
    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM settings WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_last_sync_defaults_to_none() {
        let db = setup().await;
        let repo = LibSqlSettingsRepository::new(db.connection());

        assert_eq!(repo.last_sync_at().await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_save_and_load_last_sync() {
        let db = setup().await;
        let repo = LibSqlSettingsRepository::new(db.connection());

        repo.set_last_sync_at(1_700_000_000_000).await.unwrap();
        repo.set_last_sync_at(1_700_000_000_500).await.unwrap();

        assert_eq!(repo.last_sync_at().await.unwrap(), Some(1_700_000_000_500));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unparseable_marker_reads_as_none() {
        let db = setup().await;
        let repo = LibSqlSettingsRepository::new(db.connection());

        repo.set_setting("last_sync_at", "yesterday").await.unwrap();
        assert_eq!(repo.last_sync_at().await.unwrap(), None);
    }
}
