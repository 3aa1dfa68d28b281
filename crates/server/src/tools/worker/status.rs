//! worker_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::tools::json_result;

/// Output from the worker_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatusOutput {
    pub version: String,
    pub namespace: String,
    /// installing, waiting, activating, active, or redundant.
    pub state: String,
    /// Namespace answering requests, if any.
    pub serving: Option<String>,
    /// Open client connections, including this server's own.
    pub clients: usize,
}

pub async fn status_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let status = state.worker.status();
    json_result(&WorkerStatusOutput {
        version: status.version,
        namespace: status.namespace,
        state: status.state.to_string(),
        serving: status.serving,
        clients: status.clients,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::fixtures;
    use crate::tools::parse_output;

    #[tokio::test]
    async fn test_status_before_start() {
        let (_fetcher, state) = fixtures::state(true).await;

        let output: WorkerStatusOutput = parse_output(&status_impl(&state).await.unwrap());

        assert_eq!(output.version, "v1");
        assert_eq!(output.namespace, "precache-v1");
        assert_eq!(output.state, "installing");
        assert_eq!(output.serving, None);
        assert_eq!(output.clients, 1);
    }

    #[tokio::test]
    async fn test_status_after_start() {
        let (_fetcher, state) = fixtures::started().await;

        let output: WorkerStatusOutput = parse_output(&status_impl(&state).await.unwrap());
        assert_eq!(output.state, "active");
        assert_eq!(output.serving.as_deref(), Some("precache-v1"));
    }

    #[tokio::test]
    async fn test_status_after_failed_upgrade() {
        let (_fetcher, first) = fixtures::started().await;
        let offline = fixtures::stub(&[]);
        offline.go_offline();
        let state = fixtures::restart(&first.db, "v2", offline);
        assert!(state.host.start().await.is_err());

        let output: WorkerStatusOutput = parse_output(&status_impl(&state).await.unwrap());

        assert_eq!(output.state, "redundant");
        assert_eq!(output.serving.as_deref(), Some("precache-v1"));
    }
}
