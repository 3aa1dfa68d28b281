//! client_messages tool implementation.
//!
//! Drains the notifications delivered to this server's client connection.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::tools::json_result;

/// Output from the client_messages tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientMessagesOutput {
    pub client: String,
    /// Namespace of the version controlling this connection, if any.
    pub controller: Option<String>,
    /// Messages received since the last call, oldest first, as JSON.
    pub messages: Vec<String>,
}

pub async fn client_messages_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let mut client = state.client.lock().await;
    let messages = client
        .drain()
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| precache_core::Error::Internal(format!("Failed to serialize message: {e}")))?;

    json_result(&ClientMessagesOutput { client: client.id().to_string(), controller: client.controller(), messages })
}
