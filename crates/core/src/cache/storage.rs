//! The cache storage seam used by the worker.

use async_trait::async_trait;

use super::connection::CacheDb;
use super::key::RequestKey;
use super::namespaces::CacheHandle;
use crate::Error;
use crate::http::CachedResponse;

/// Namespaced request→response storage.
///
/// There is no per-entry expiry or size-based eviction; staleness is handled
/// by deleting whole namespaces.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a namespace, creating it if it doesn't exist.
    async fn open(&self, namespace: &str) -> Result<CacheHandle, Error>;

    async fn get(&self, handle: &CacheHandle, key: &RequestKey) -> Result<Option<CachedResponse>, Error>;

    async fn put(&self, handle: &CacheHandle, key: &RequestKey, response: &CachedResponse) -> Result<(), Error>;

    /// Write all entries atomically.
    async fn put_all(&self, handle: &CacheHandle, entries: &[(RequestKey, CachedResponse)]) -> Result<usize, Error>;

    async fn has(&self, namespace: &str) -> Result<bool, Error>;

    /// List namespace names, oldest first.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a namespace; returns false if it did not exist.
    async fn delete(&self, namespace: &str) -> Result<bool, Error>;
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, namespace: &str) -> Result<CacheHandle, Error> {
        self.open_namespace(namespace).await
    }

    async fn get(&self, handle: &CacheHandle, key: &RequestKey) -> Result<Option<CachedResponse>, Error> {
        self.get_entry(handle, key).await
    }

    async fn put(&self, handle: &CacheHandle, key: &RequestKey, response: &CachedResponse) -> Result<(), Error> {
        self.put_entry(handle, key, response).await
    }

    async fn put_all(&self, handle: &CacheHandle, entries: &[(RequestKey, CachedResponse)]) -> Result<usize, Error> {
        self.put_entries(handle, entries).await
    }

    async fn has(&self, namespace: &str) -> Result<bool, Error> {
        self.has_namespace(namespace).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.list_namespaces().await
    }

    async fn delete(&self, namespace: &str) -> Result<bool, Error> {
        self.delete_namespace(namespace).await
    }
}
