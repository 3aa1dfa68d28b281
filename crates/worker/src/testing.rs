//! Test doubles shared by the worker's unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use precache_client::Fetcher;
use precache_core::{CacheDb, CacheHandle, CacheStorage, CachedResponse, Error, Request, RequestKey};
use tokio_util::task::TaskTracker;
use url::Url;

pub const ORIGIN: &str = "https://app.example.com";

pub fn origin_url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

/// Wait for every tracked background task, then reopen the tracker.
pub async fn drain(tracker: &TaskTracker) {
    tracker.close();
    tracker.wait().await;
    tracker.reopen();
}

/// Put a 200 page straight into a namespace.
pub async fn store_with(db: &CacheDb, namespace: &str, path: &str, body: &str) {
    let handle = db.open_namespace(namespace).await.unwrap();
    let url = origin_url(path);
    let response = CachedResponse::basic(url.clone(), 200, body.to_string()).with_header("content-type", "text/html");
    db.put_entry(&handle, &RequestKey::get(&url), &response).await.unwrap();
}

/// Scripted network. Unknown URLs answer 404.
#[derive(Default)]
pub struct FakeFetcher {
    routes: Mutex<HashMap<String, CachedResponse>>,
    failing: Mutex<HashSet<String>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a same-origin 200 page at `path`.
    pub fn page(&self, path: &str, body: &str) {
        let url = origin_url(path);
        self.respond(CachedResponse::basic(url, 200, body.to_string()).with_header("content-type", "text/html"));
    }

    /// Serve `response` for requests to its URL.
    pub fn respond(&self, response: CachedResponse) {
        self.routes.lock().insert(response.url.to_string(), response);
    }

    /// Make requests to `path` fail at the network layer.
    pub fn fail(&self, path: &str) {
        self.failing.lock().insert(origin_url(path).to_string());
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, request: &Request) -> Result<CachedResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let url = request.url.to_string();

        if self.offline.load(Ordering::SeqCst) || self.failing.lock().contains(&url) {
            return Err(Error::Network(format!("{} {url}: connection refused", request.method)));
        }

        Ok(self
            .routes
            .lock()
            .get(&url)
            .cloned()
            .unwrap_or_else(|| CachedResponse::basic(request.url.clone(), 404, "not found")))
    }
}

/// Store wrapper that counts operations and fails on demand.
pub struct FlakyStore {
    inner: Arc<CacheDb>,
    operations: AtomicUsize,
    fail_open: AtomicBool,
    fail_get: AtomicBool,
    fail_put: AtomicBool,
    fail_delete: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: Arc<CacheDb>) -> Self {
        Self {
            inner,
            operations: AtomicUsize::new(0),
            fail_open: AtomicBool::new(false),
            fail_get: AtomicBool::new(false),
            fail_put: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }

    pub fn operations(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    pub fn fail_opens(&self) {
        self.fail_open.store(true, Ordering::SeqCst);
    }

    pub fn fail_gets(&self) {
        self.fail_get.store(true, Ordering::SeqCst);
    }

    pub fn fail_puts(&self) {
        self.fail_put.store(true, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self) {
        self.fail_delete.store(true, Ordering::SeqCst);
    }

    fn check(&self, flag: &AtomicBool, op: &str) -> Result<(), Error> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        if flag.load(Ordering::SeqCst) {
            return Err(Error::StoreUnavailable(format!("{op} failed")));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStorage for FlakyStore {
    async fn open(&self, namespace: &str) -> Result<CacheHandle, Error> {
        self.check(&self.fail_open, "open")?;
        self.inner.open(namespace).await
    }

    async fn get(&self, handle: &CacheHandle, key: &RequestKey) -> Result<Option<CachedResponse>, Error> {
        self.check(&self.fail_get, "get")?;
        self.inner.get(handle, key).await
    }

    async fn put(&self, handle: &CacheHandle, key: &RequestKey, response: &CachedResponse) -> Result<(), Error> {
        self.check(&self.fail_put, "put")?;
        self.inner.put(handle, key, response).await
    }

    async fn put_all(&self, handle: &CacheHandle, entries: &[(RequestKey, CachedResponse)]) -> Result<usize, Error> {
        self.check(&self.fail_put, "put_all")?;
        self.inner.put_all(handle, entries).await
    }

    async fn has(&self, namespace: &str) -> Result<bool, Error> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        self.inner.has(namespace).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        self.inner.keys().await
    }

    async fn delete(&self, namespace: &str) -> Result<bool, Error> {
        self.check(&self.fail_delete, "delete")?;
        self.inner.delete(namespace).await
    }
}
