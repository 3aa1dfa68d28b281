//! Install and activation of one cache version.
//!
//! ```text
//! Installing --install ok--> Waiting --activate--> Activating --> Active
//!     |                         ^                      |
//!     +--install failed--> Redundant                   +--cleanup failed--+
//! ```
//!
//! Transitions are serialized by a mutex. The current state is published on a
//! watch channel so readers (the fetch path, status queries) never wait on a
//! running transition.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::join_all;
use precache_client::Fetcher;
use precache_core::{CacheHandle, CacheStorage, CachedResponse, Error, Request, RequestKey};
use tokio::sync::{Mutex, MutexGuard, watch};
use url::Url;

use crate::message::WorkerMessage;
use crate::notify::Notifier;

/// Lifecycle state of a worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Not installed yet, or installing.
    Installing,
    /// Installed; waiting to be activated.
    Waiting,
    /// Deleting stale namespaces and claiming clients.
    Activating,
    /// Serving requests.
    Active,
    /// Install failed. This version will never activate.
    Redundant,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Installing => write!(f, "installing"),
            LifecycleState::Waiting => write!(f, "waiting"),
            LifecycleState::Activating => write!(f, "activating"),
            LifecycleState::Active => write!(f, "active"),
            LifecycleState::Redundant => write!(f, "redundant"),
        }
    }
}

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub namespace: String,
    /// Number of manifest entries written.
    pub entries: usize,
    /// Whether the host should activate right away instead of waiting.
    pub skip_waiting: bool,
    /// The manifest could not be fetched, but an earlier run had already
    /// installed it completely into this namespace, so that copy is kept.
    pub resumed: bool,
}

/// What an activation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    /// Stale namespaces that were deleted.
    pub deleted: Vec<String>,
    /// Client connections claimed.
    pub claimed: usize,
    /// Client connections that accepted the new-version notification.
    pub notified: usize,
}

/// Result of an activation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    Completed(ActivationReport),
    /// Already activating or active; nothing to do.
    AlreadyActive,
    /// Install is still running; activation follows it.
    Deferred,
}

/// Drives install and activation for one version's namespace.
pub struct LifecycleController {
    store: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    notifier: Arc<dyn Notifier>,
    namespace: String,
    manifest: Vec<Url>,
    skip_waiting: AtomicBool,
    transition: Mutex<()>,
    state: watch::Sender<LifecycleState>,
}

impl LifecycleController {
    pub fn new(
        store: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>, notifier: Arc<dyn Notifier>, namespace: String,
        manifest: Vec<Url>, skip_waiting: bool,
    ) -> Self {
        let (state, _) = watch::channel(LifecycleState::Installing);
        Self {
            store,
            fetcher,
            notifier,
            namespace,
            manifest,
            skip_waiting: AtomicBool::new(skip_waiting),
            transition: Mutex::new(()),
            state,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: LifecycleState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::info!(namespace = %self.namespace, from = %previous, to = %state, "lifecycle transition");
        }
    }

    /// Precache the manifest into this version's namespace.
    ///
    /// All-or-nothing: if the store cannot be opened, or any manifest entry
    /// fails to fetch, answers with a non-success status, or fails to store,
    /// nothing is written, a namespace created by this call is removed again,
    /// and the controller becomes [`LifecycleState::Redundant`]. Other
    /// namespaces are never touched.
    ///
    /// A fetch failure is not fatal when this version's namespace already
    /// existed and still holds every manifest entry: install then succeeds
    /// with `resumed` set and the stored copy is served as-is.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if install already ran.
    pub async fn install(&self) -> Result<InstallOutcome, Error> {
        let _guard = self.transition.lock().await;
        if self.state() != LifecycleState::Installing {
            return Err(Error::InvalidState(format!("cannot install while {}", self.state())));
        }

        tracing::info!(namespace = %self.namespace, entries = self.manifest.len(), "installing");

        match self.populate().await {
            Ok((entries, resumed)) => {
                self.set_state(LifecycleState::Waiting);
                let skip_waiting = self.skip_waiting.load(Ordering::SeqCst);
                Ok(InstallOutcome { namespace: self.namespace.clone(), entries, skip_waiting, resumed })
            }
            Err(e) => {
                tracing::warn!(namespace = %self.namespace, error = %e, "install failed");
                self.set_state(LifecycleState::Redundant);
                Err(e)
            }
        }
    }

    /// Returns the number of entries in place and whether an earlier install was resumed.
    async fn populate(&self) -> Result<(usize, bool), Error> {
        let handle = self.store.open(&self.namespace).await.map_err(|e| match e {
            Error::StoreUnavailable(_) => e,
            other => Error::StoreUnavailable(other.to_string()),
        })?;

        let entries = match self.fetch_manifest().await {
            Ok(entries) => entries,
            Err(e) => {
                if !handle.created() && self.is_complete(&handle).await {
                    tracing::warn!(namespace = %self.namespace, error = %e, "manifest unreachable; keeping installed copy");
                    return Ok((self.manifest.len(), true));
                }
                self.discard(&handle).await;
                return Err(e);
            }
        };

        match self.store.put_all(&handle, &entries).await {
            Ok(written) => Ok((written, false)),
            Err(e) => {
                self.discard(&handle).await;
                Err(Error::PrecacheWriteFailed { namespace: self.namespace.clone(), reason: e.to_string() })
            }
        }
    }

    /// Whether every manifest entry is already stored under `handle`.
    async fn is_complete(&self, handle: &CacheHandle) -> bool {
        for url in &self.manifest {
            match self.store.get(handle, &RequestKey::get(url)).await {
                Ok(Some(_)) => {}
                Ok(None) => return false,
                Err(e) => {
                    tracing::warn!(namespace = %handle.namespace(), %url, error = %e, "could not check installed entry");
                    return false;
                }
            }
        }
        true
    }

    async fn fetch_manifest(&self) -> Result<Vec<(RequestKey, CachedResponse)>, Error> {
        let fetches = self.manifest.iter().map(|url| async move {
            let request = Request::get(url.clone());
            let response = self
                .fetcher
                .fetch(&request)
                .await
                .map_err(|e| Error::PrecacheFailed { url: url.to_string(), reason: e.to_string() })?;

            if !response.is_ok() {
                return Err(Error::PrecacheFailed { url: url.to_string(), reason: format!("status {}", response.status) });
            }

            Ok((RequestKey::from_request(&request), response))
        });

        join_all(fetches).await.into_iter().collect()
    }

    async fn discard(&self, handle: &CacheHandle) {
        if !handle.created() {
            return;
        }
        if let Err(e) = self.store.delete(handle.namespace()).await {
            tracing::warn!(namespace = %handle.namespace(), error = %e, "failed to remove partial namespace");
        }
    }

    /// Activate this version.
    ///
    /// Deletes every namespace except this version's, claims all open client
    /// connections, then broadcasts [`WorkerMessage::NewVersionAvailable`].
    /// Notification is best-effort and never fails activation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] before a successful install, or the
    /// store error if stale namespaces could not be listed or deleted, in
    /// which case the controller is back in [`LifecycleState::Waiting`].
    pub async fn activate(&self) -> Result<Activation, Error> {
        let guard = self.transition.lock().await;
        self.activate_locked(guard).await
    }

    /// Handle an inbound force-activate command.
    ///
    /// Activates immediately when waiting, is a no-op when already activating
    /// or active, and makes a running install report `skip_waiting`.
    pub async fn force_activate(&self) -> Result<Activation, Error> {
        self.skip_waiting.store(true, Ordering::SeqCst);

        let guard = match self.transition.try_lock() {
            Ok(guard) => guard,
            Err(_) if self.state() == LifecycleState::Installing => return Ok(Activation::Deferred),
            Err(_) => self.transition.lock().await,
        };

        if self.state() == LifecycleState::Installing {
            return Ok(Activation::Deferred);
        }
        self.activate_locked(guard).await
    }

    async fn activate_locked(&self, _guard: MutexGuard<'_, ()>) -> Result<Activation, Error> {
        match self.state() {
            LifecycleState::Waiting => {}
            LifecycleState::Activating | LifecycleState::Active => return Ok(Activation::AlreadyActive),
            LifecycleState::Installing => {
                return Err(Error::InvalidState("cannot activate before install completes".into()));
            }
            LifecycleState::Redundant => {
                return Err(Error::InvalidState("install failed; this version cannot activate".into()));
            }
        }

        self.set_state(LifecycleState::Activating);

        let deleted = match self.delete_stale().await {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::warn!(namespace = %self.namespace, error = %e, "activation failed");
                self.set_state(LifecycleState::Waiting);
                return Err(e);
            }
        };

        let claimed = self.notifier.claim(&self.namespace);
        self.set_state(LifecycleState::Active);

        let notified = self.notifier.broadcast(WorkerMessage::NewVersionAvailable);
        tracing::info!(namespace = %self.namespace, deleted = deleted.len(), claimed, notified, "activated");

        Ok(Activation::Completed(ActivationReport { deleted, claimed, notified }))
    }

    async fn delete_stale(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.store.keys().await? {
            if name == self.namespace {
                continue;
            }
            tracing::info!(namespace = %name, "deleting stale namespace");
            if self.store.delete(&name).await? {
                deleted.push(name);
            }
        }
        Ok(deleted)
    }
}
