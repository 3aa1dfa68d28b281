//! Drives a worker the way a runtime would: startup, per-request dispatch,
//! client messages, and a shutdown that waits for outstanding cache writes.

use std::sync::Arc;

use precache_core::{Error, Request};
use tokio_util::task::TaskTracker;

use crate::intercept::FetchDecision;
use crate::lifecycle::{Activation, InstallOutcome};
use crate::message::ClientMessage;
use crate::notify::ClientId;
use crate::worker::WorkerEvents;

/// What happened during [`Host::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Startup {
    pub install: InstallOutcome,
    /// Set when install asked to skip waiting.
    pub activation: Option<Activation>,
}

pub struct Host {
    worker: Arc<dyn WorkerEvents>,
    tracker: TaskTracker,
}

impl Host {
    /// `tracker` must be the one the worker spawns its background work on.
    pub fn new(worker: Arc<dyn WorkerEvents>, tracker: TaskTracker) -> Self {
        Self { worker, tracker }
    }

    /// Install, then activate right away if install asked to skip waiting.
    pub async fn start(&self) -> Result<Startup, Error> {
        let install = self.worker.install().await?;
        let activation = if install.skip_waiting { Some(self.worker.activate().await?) } else { None };
        Ok(Startup { install, activation })
    }

    /// Dispatch a request on its own task.
    pub async fn fetch(&self, request: Request) -> Result<FetchDecision, Error> {
        let worker = Arc::clone(&self.worker);
        tokio::spawn(async move { worker.fetch(request).await })
            .await
            .map_err(|e| Error::Internal(format!("fetch task failed: {e}")))?
    }

    pub async fn post_message(&self, from: ClientId, message: ClientMessage) -> Result<Activation, Error> {
        self.worker.message(from, message).await
    }

    /// Stop accepting background work and wait for what is in flight.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        tracing::debug!("worker background tasks drained");
    }
}
