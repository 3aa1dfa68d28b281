//! Database connection management with pragma configuration.
//!
//! Opening the store applies the pragmas needed for concurrent readers and
//! writers (WAL mode, enforced foreign keys for namespace cascades) and runs
//! any pending migrations.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Cache database handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread. Cloning shares the same connection.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
}

impl CacheDb {
    /// Open the store at the specified path, creating it if needed.
    ///
    /// Any failure here is reported as [`Error::StoreUnavailable`].
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let display = path.as_ref().display().to_string();
        let conn = Connection::open(path)
            .await
            .map_err(|e| Error::StoreUnavailable(format!("{display}: {e}")))?;
        Self::init(conn).await
    }

    /// Open an in-memory store for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| conn.execute_batch(PRAGMAS))
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fk: i64 = db
            .conn
            .call(|conn| conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[tokio::test]
    async fn test_open_unreachable_path() {
        let result = CacheDb::open("/nonexistent-dir/precache/cache.sqlite").await;
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
    }
}
