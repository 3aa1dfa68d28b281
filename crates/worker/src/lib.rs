//! The offline cache worker.
//!
//! A worker instance belongs to exactly one deployed version. It:
//! - installs that version by precaching the manifest into a fresh namespace
//! - activates by deleting every other namespace and claiming open clients
//! - intercepts GET requests: cache first, then network, then the offline document
//! - tells open clients when a new version has taken over
//!
//! Hosts drive it through [`WorkerEvents`], usually via [`Host`], and must
//! await [`Host::shutdown`] before dropping it so background cache writes finish.

pub mod host;
pub mod intercept;
pub mod lifecycle;
pub mod message;
pub mod notify;
pub mod worker;

#[cfg(test)]
mod testing;

pub use host::{Host, Startup};
pub use intercept::{FetchDecision, RequestInterceptor, ResponseSource};
pub use lifecycle::{Activation, ActivationReport, InstallOutcome, LifecycleController, LifecycleState};
pub use message::{ClientMessage, WorkerMessage};
pub use notify::{ClientConnection, ClientId, ClientRegistry, Notifier};
pub use worker::{ServiceWorker, WorkerEvents, WorkerStatus};
