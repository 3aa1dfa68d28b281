//! Per-request decision: cache first, then network, then the offline document.
//!
//! Every call is independent. Concurrent calls for different requests need no
//! coordination, and concurrent writes for the same request resolve
//! last-write-wins in the store.

use std::sync::Arc;

use precache_client::Fetcher;
use precache_core::{CacheHandle, CacheStorage, CachedResponse, Error, Request, RequestKey, ResponseType};
use tokio_util::task::TaskTracker;
use url::Url;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
    OfflineFallback,
}

impl ResponseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseSource::Cache => "cache",
            ResponseSource::Network => "network",
            ResponseSource::OfflineFallback => "offline-fallback",
        }
    }
}

/// Outcome of intercepting one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchDecision {
    /// Not handled; the host performs the request itself with no caching.
    Passthrough,
    /// Respond with this response.
    Respond { response: CachedResponse, source: ResponseSource },
}

impl FetchDecision {
    pub fn response(&self) -> Option<&CachedResponse> {
        match self {
            FetchDecision::Passthrough => None,
            FetchDecision::Respond { response, .. } => Some(response),
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            FetchDecision::Passthrough => None,
            FetchDecision::Respond { source, .. } => Some(*source),
        }
    }
}

/// Whether a network response may be written into the cache.
///
/// Only complete (200), same-origin responses qualify.
pub fn is_cacheable(response: &CachedResponse) -> bool {
    response.status == 200 && response.kind == ResponseType::Basic
}

/// Cache-first request interceptor bound to one namespace.
pub struct RequestInterceptor {
    store: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    cache: CacheHandle,
    offline_key: RequestKey,
    tracker: TaskTracker,
}

impl RequestInterceptor {
    /// Create an interceptor serving from `namespace`.
    ///
    /// Opportunistic cache writes are spawned on `tracker`; the host must wait
    /// on it before tearing the worker down.
    pub fn new(
        store: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>, namespace: &str, offline_document: &Url,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            store,
            fetcher,
            cache: CacheHandle::named(namespace),
            offline_key: RequestKey::get(offline_document),
            tracker,
        }
    }

    /// Decide how to answer a request.
    ///
    /// # Errors
    ///
    /// Returns the network error when the request failed, nothing was cached
    /// for it, and no offline document applies.
    pub async fn handle(&self, request: &Request) -> Result<FetchDecision, Error> {
        self.handle_in(&self.cache, request).await
    }

    /// Like [`handle`](Self::handle), but reading and writing `cache` instead
    /// of the namespace this interceptor was built for.
    pub async fn handle_in(&self, cache: &CacheHandle, request: &Request) -> Result<FetchDecision, Error> {
        if !request.method.is_retrieval() {
            return Ok(FetchDecision::Passthrough);
        }

        let key = RequestKey::from_request(request);

        match self.store.get(cache, &key).await {
            Ok(Some(response)) => {
                tracing::debug!(%key, namespace = %cache.namespace(), "cache hit");
                return Ok(FetchDecision::Respond { response, source: ResponseSource::Cache });
            }
            Ok(None) => tracing::debug!(%key, "cache miss"),
            Err(e) => tracing::warn!(%key, error = %e, "cache lookup failed; going to network"),
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if is_cacheable(&response) {
                    self.store_in_background(cache, key, response.clone());
                } else {
                    tracing::debug!(%key, status = response.status, kind = ?response.kind, "not caching response");
                }
                Ok(FetchDecision::Respond { response, source: ResponseSource::Network })
            }
            Err(err) => self.offline_fallback(cache, request, &key, err).await,
        }
    }

    async fn offline_fallback(
        &self, cache: &CacheHandle, request: &Request, key: &RequestKey, err: Error,
    ) -> Result<FetchDecision, Error> {
        if !request.destination.is_navigation() {
            tracing::debug!(%key, error = %err, "network failed for non-navigation request");
            return Err(err);
        }

        match self.store.get(cache, &self.offline_key).await {
            Ok(Some(response)) => {
                tracing::info!(%key, "network failed; serving offline document");
                Ok(FetchDecision::Respond { response, source: ResponseSource::OfflineFallback })
            }
            Ok(None) => {
                tracing::warn!(%key, offline = %self.offline_key, "offline document missing from cache");
                Err(err)
            }
            Err(lookup) => {
                tracing::warn!(%key, error = %lookup, "offline document lookup failed");
                Err(err)
            }
        }
    }

    fn store_in_background(&self, cache: &CacheHandle, key: RequestKey, response: CachedResponse) {
        let store = Arc::clone(&self.store);
        let cache = cache.clone();
        self.tracker.spawn(async move {
            if let Err(e) = store.put(&cache, &key, &response).await {
                tracing::warn!(%key, error = %e, "failed to store response");
            }
        });
    }
}
