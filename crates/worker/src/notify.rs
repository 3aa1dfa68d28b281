//! Cross-context notification.
//!
//! Delivery is best-effort: a connection that misses a message is still served
//! by the active version on its next request, so nothing here can fail an
//! operation. Connections whose receiving side is gone are pruned on the next
//! broadcast.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::message::WorkerMessage;

/// Identifier of an open client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Broadcast capability handed to the lifecycle controller.
pub trait Notifier: Send + Sync {
    /// Send a message to every open connection. Returns how many accepted it.
    fn broadcast(&self, message: WorkerMessage) -> usize;

    /// Currently open connections.
    fn connections(&self) -> Vec<ClientId>;

    /// Make `controller` the controlling version of every open connection,
    /// and of connections opened later. Returns how many were claimed.
    fn claim(&self, controller: &str) -> usize;
}

struct Slot {
    sender: mpsc::UnboundedSender<WorkerMessage>,
    controller: Option<String>,
}

#[derive(Default)]
struct Registry {
    slots: HashMap<ClientId, Slot>,
    controller: Option<String>,
}

/// In-process registry of client connections.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    inner: Arc<Mutex<Registry>>,
    next_id: Arc<AtomicU64>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a connection for a consuming context.
    ///
    /// New connections are controlled by the most recently claiming version.
    pub fn connect(&self) -> ClientConnection {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (sender, receiver) = mpsc::unbounded_channel();

        let mut registry = self.inner.lock();
        let controller = registry.controller.clone();
        registry.slots.insert(id, Slot { sender, controller });
        tracing::debug!(client = %id, "client connected");

        ClientConnection { id, registry: self.clone(), receiver }
    }

    /// Controlling version of a connection, if any.
    pub fn controller_of(&self, id: ClientId) -> Option<String> {
        self.inner.lock().slots.get(&id).and_then(|slot| slot.controller.clone())
    }

    fn disconnect(&self, id: ClientId) {
        if self.inner.lock().slots.remove(&id).is_some() {
            tracing::debug!(client = %id, "client disconnected");
        }
    }
}

impl Notifier for ClientRegistry {
    fn broadcast(&self, message: WorkerMessage) -> usize {
        let mut registry = self.inner.lock();
        let mut closed = Vec::new();
        let mut delivered = 0;

        for (id, slot) in &registry.slots {
            if slot.sender.send(message).is_ok() {
                delivered += 1;
            } else {
                closed.push(*id);
            }
        }

        for id in closed {
            tracing::debug!(client = %id, ?message, "dropping closed client");
            registry.slots.remove(&id);
        }

        delivered
    }

    fn connections(&self) -> Vec<ClientId> {
        let mut ids: Vec<ClientId> = self.inner.lock().slots.keys().copied().collect();
        ids.sort();
        ids
    }

    fn claim(&self, controller: &str) -> usize {
        let mut registry = self.inner.lock();
        registry.controller = Some(controller.to_string());
        for slot in registry.slots.values_mut() {
            slot.controller = Some(controller.to_string());
        }
        registry.slots.len()
    }
}

/// A consuming context's end of the notification channel.
///
/// Dropping it removes the connection from the registry.
pub struct ClientConnection {
    id: ClientId,
    registry: ClientRegistry,
    receiver: mpsc::UnboundedReceiver<WorkerMessage>,
}

impl ClientConnection {
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Version currently controlling this connection.
    pub fn controller(&self) -> Option<String> {
        self.registry.controller_of(self.id)
    }

    /// Wait for the next message.
    pub async fn recv(&mut self) -> Option<WorkerMessage> {
        self.receiver.recv().await
    }

    /// Take every message delivered so far without waiting.
    pub fn drain(&mut self) -> Vec<WorkerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.receiver.try_recv() {
            messages.push(message);
        }
        messages
    }
}

impl Drop for ClientConnection {
    fn drop(&mut self) {
        self.registry.disconnect(self.id);
    }
}

impl fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConnection").field("id", &self.id).finish()
    }
}
