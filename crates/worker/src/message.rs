//! Messages exchanged between the worker and client connections.

use precache_core::Error;
use serde::{Deserialize, Serialize};

/// Inbound command from a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Stop waiting and activate the installed version now.
    #[serde(alias = "SKIP_WAITING")]
    ForceActivate,
}

impl ClientMessage {
    /// Parse a JSON message such as `{"type":"force-activate"}`.
    pub fn parse(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::InvalidInput(format!("unrecognized client message: {e}")))
    }
}

/// Outbound notification to client connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkerMessage {
    /// A new version finished activating; reload to pick it up.
    NewVersionAvailable,
}
