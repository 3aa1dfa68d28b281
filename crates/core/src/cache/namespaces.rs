//! Namespace operations.
//!
//! A namespace is the isolated region of the store belonging to one deployed
//! version. Deleting a namespace cascades to all of its entries.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;

/// Handle to an open namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHandle {
    namespace: String,
    created: bool,
}

impl CacheHandle {
    pub(crate) fn new(namespace: String, created: bool) -> Self {
        Self { namespace, created }
    }

    /// Handle to a namespace without opening it.
    ///
    /// Reads through it see nothing if the namespace doesn't exist, and writes
    /// fail instead of recreating it.
    pub fn named(namespace: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), created: false }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether opening this handle created the namespace.
    pub fn created(&self) -> bool {
        self.created
    }
}

impl CacheDb {
    /// Open a namespace, creating it if it doesn't exist.
    pub async fn open_namespace(&self, namespace: &str) -> Result<CacheHandle, Error> {
        if namespace.trim().is_empty() {
            return Err(Error::InvalidInput("namespace cannot be empty".into()));
        }

        let name = namespace.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let created = self
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO namespaces (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(inserted == 1)
            })
            .await
            .map_err(|e| match Error::from(e) {
                Error::Database(db) => Error::StoreUnavailable(db.to_string()),
                other => other,
            })?;

        if created {
            tracing::debug!(namespace, "created cache namespace");
        }

        Ok(CacheHandle::new(namespace.to_string(), created))
    }

    /// Check whether a namespace exists.
    pub async fn has_namespace(&self, namespace: &str) -> Result<bool, Error> {
        let name = namespace.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists =
                    conn.query_row("SELECT EXISTS(SELECT 1 FROM namespaces WHERE name = ?1)", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List namespace names in creation order.
    pub async fn list_namespaces(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM namespaces ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a namespace and all of its entries.
    ///
    /// Returns false if the namespace did not exist.
    pub async fn delete_namespace(&self, namespace: &str) -> Result<bool, Error> {
        let name = namespace.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM namespaces WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
