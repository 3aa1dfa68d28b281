use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use precache_client::Fetcher;
use precache_core::{AppConfig, CacheHandle, CacheStorage, Error, Request};
use tokio_util::task::TaskTracker;

use crate::intercept::{FetchDecision, RequestInterceptor};
use crate::lifecycle::{Activation, InstallOutcome, LifecycleController, LifecycleState};
use crate::message::ClientMessage;
use crate::notify::{ClientId, Notifier};

/// Events a host delivers to a worker.
#[async_trait]
pub trait WorkerEvents: Send + Sync {
    /// Precache this version.
    async fn install(&self) -> Result<InstallOutcome, Error>;

    /// Take over from older versions.
    async fn activate(&self) -> Result<Activation, Error>;

    /// Answer a request from a consuming context.
    async fn fetch(&self, request: Request) -> Result<FetchDecision, Error>;

    /// Handle a command posted by a client connection.
    async fn message(&self, from: ClientId, message: ClientMessage) -> Result<Activation, Error>;
}

/// Snapshot of a worker for status reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerStatus {
    pub version: String,
    pub namespace: String,
    pub state: LifecycleState,
    /// Namespace answering requests right now, if any.
    pub serving: Option<String>,
    /// Open client connections.
    pub clients: usize,
}

/// One deployed version: lifecycle plus request interception over a shared store.
///
/// Until this version is active, requests are answered from the namespace an
/// earlier version left behind, if one survives. A version whose install
/// failed keeps doing that for the rest of its life.
pub struct ServiceWorker {
    version: String,
    app_prefix: String,
    lifecycle: LifecycleController,
    interceptor: RequestInterceptor,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn CacheStorage>,
    fallback: Mutex<Option<CacheHandle>>,
}

impl ServiceWorker {
    /// Build the worker for the version described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the configuration does not validate.
    pub fn new(
        config: &AppConfig, store: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>, notifier: Arc<dyn Notifier>,
        tracker: TaskTracker,
    ) -> Result<Self, Error> {
        let invalid = |e: precache_core::ConfigError| Error::InvalidInput(e.to_string());
        config.validate().map_err(invalid)?;

        let namespace = config.namespace();
        let manifest = config.manifest_urls().map_err(invalid)?;
        let offline = config.offline_url().map_err(invalid)?;

        let interceptor = RequestInterceptor::new(Arc::clone(&store), Arc::clone(&fetcher), &namespace, &offline, tracker);
        let lifecycle = LifecycleController::new(
            Arc::clone(&store),
            fetcher,
            Arc::clone(&notifier),
            namespace,
            manifest,
            config.skip_waiting,
        );

        Ok(Self {
            version: config.version.clone(),
            app_prefix: config.app_prefix.clone(),
            lifecycle,
            interceptor,
            notifier,
            store,
            fallback: Mutex::new(None),
        })
    }

    pub fn namespace(&self) -> &str {
        self.lifecycle.namespace()
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn status(&self) -> WorkerStatus {
        let state = self.state();
        let serving = if state == LifecycleState::Active {
            Some(self.namespace().to_string())
        } else {
            self.fallback.lock().as_ref().map(|cache| cache.namespace().to_string())
        };
        WorkerStatus {
            version: self.version.clone(),
            namespace: self.namespace().to_string(),
            state,
            serving,
            clients: self.notifier.connections().len(),
        }
    }

    /// Newest namespace of this app other than our own.
    async fn previous_namespace(&self) -> Option<String> {
        let prefix = format!("{}-", self.app_prefix);
        match self.store.keys().await {
            Ok(names) => names.into_iter().rev().find(|name| name.starts_with(&prefix) && name != self.namespace()),
            Err(e) => {
                tracing::warn!(error = %e, "could not list namespaces");
                None
            }
        }
    }

    /// Namespace to serve from after a failed install: our own if it is
    /// still there, otherwise the newest one an earlier version left.
    async fn surviving_namespace(&self) -> Option<String> {
        match self.store.has(self.namespace()).await {
            Ok(true) => return Some(self.namespace().to_string()),
            Ok(false) => {}
            Err(e) => tracing::warn!(namespace = %self.namespace(), error = %e, "could not check namespace"),
        }
        self.previous_namespace().await
    }
}

#[async_trait]
impl WorkerEvents for ServiceWorker {
    async fn install(&self) -> Result<InstallOutcome, Error> {
        let result = self.lifecycle.install().await;
        let fallback = match &result {
            Ok(outcome) if outcome.resumed => Some(outcome.namespace.clone()),
            Ok(_) => self.previous_namespace().await,
            Err(_) => self.surviving_namespace().await,
        };
        if let Some(namespace) = &fallback {
            tracing::info!(%namespace, state = %self.state(), "serving from surviving namespace until active");
        }
        *self.fallback.lock() = fallback.map(CacheHandle::named);
        result
    }

    async fn activate(&self) -> Result<Activation, Error> {
        self.lifecycle.activate().await
    }

    /// An active worker intercepts from its own namespace. Before that it
    /// answers from the fallback namespace chosen at install, and with no
    /// fallback requests go straight to the network, like a page not yet
    /// controlled by any version.
    async fn fetch(&self, request: Request) -> Result<FetchDecision, Error> {
        if self.state() == LifecycleState::Active {
            return self.interceptor.handle(&request).await;
        }
        let fallback = self.fallback.lock().clone();
        match fallback {
            Some(cache) => self.interceptor.handle_in(&cache, &request).await,
            None => {
                tracing::debug!(url = %request.url, state = %self.state(), "not active; passing through");
                Ok(FetchDecision::Passthrough)
            }
        }
    }

    async fn message(&self, from: ClientId, message: ClientMessage) -> Result<Activation, Error> {
        tracing::info!(client = %from, ?message, "client message");
        match message {
            ClientMessage::ForceActivate => self.lifecycle.force_activate().await,
        }
    }
}
