//! worker_message tool implementation.
//!
//! Posts a command to the worker from this server's client connection.

use precache_worker::{Activation, ClientMessage};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::tools::json_result;

/// Parameters for the worker_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerMessageParams {
    /// Message type. `force-activate` (or `SKIP_WAITING`) activates a waiting version.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Output from the worker_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerMessageOutput {
    /// completed, already-active, or deferred.
    pub outcome: String,
    /// Stale namespaces deleted by the activation.
    pub deleted: Vec<String>,
    pub claimed: usize,
    pub notified: usize,
    /// Lifecycle state after handling the message.
    pub state: String,
}

pub async fn message_impl(state: &AppState, params: WorkerMessageParams) -> Result<CallToolResult, McpError> {
    let message = ClientMessage::parse(&serde_json::json!({ "type": params.kind }).to_string())?;
    let from = state.client.lock().await.id();

    let mut output = WorkerMessageOutput {
        outcome: String::new(),
        deleted: Vec::new(),
        claimed: 0,
        notified: 0,
        state: String::new(),
    };

    match state.host.post_message(from, message).await? {
        Activation::Completed(report) => {
            output.outcome = "completed".into();
            output.deleted = report.deleted;
            output.claimed = report.claimed;
            output.notified = report.notified;
        }
        Activation::AlreadyActive => output.outcome = "already-active".into(),
        Activation::Deferred => output.outcome = "deferred".into(),
    }
    output.state = state.worker.state().to_string();

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::fixtures;
    use crate::tools::parse_output;

    fn params(kind: &str) -> WorkerMessageParams {
        WorkerMessageParams { kind: kind.to_string() }
    }

    #[tokio::test]
    async fn test_force_activate_waiting_worker() {
        let (_fetcher, state) = fixtures::state(false).await;
        state.host.start().await.unwrap();
        state.db.open_namespace("precache-v0").await.unwrap();

        let output: WorkerMessageOutput = parse_output(&message_impl(&state, params("force-activate")).await.unwrap());

        assert_eq!(output.outcome, "completed");
        assert_eq!(output.deleted, vec!["precache-v0".to_string()]);
        assert_eq!(output.claimed, 1);
        assert_eq!(output.notified, 1);
        assert_eq!(output.state, "active");
    }

    #[tokio::test]
    async fn test_skip_waiting_alias_on_active_worker() {
        let (_fetcher, state) = fixtures::started().await;

        let output: WorkerMessageOutput = parse_output(&message_impl(&state, params("SKIP_WAITING")).await.unwrap());
        assert_eq!(output.outcome, "already-active");
    }

    #[tokio::test]
    async fn test_before_install_is_deferred() {
        let (_fetcher, state) = fixtures::state(false).await;

        let output: WorkerMessageOutput = parse_output(&message_impl(&state, params("force-activate")).await.unwrap());
        assert_eq!(output.outcome, "deferred");
        assert_eq!(output.state, "installing");

        let startup = state.host.start().await.unwrap();
        assert!(startup.activation.is_some());
    }

    #[tokio::test]
    async fn test_unknown_message_rejected() {
        let (_fetcher, state) = fixtures::started().await;
        let err = message_impl(&state, params("reload")).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
