//! MCP server handler implementation.
//!
//! Routes tool calls to the implementations in [`crate::tools`].
use std::sync::Arc;

use crate::state::AppState;
use crate::tools::cache::{CacheGetParams, get::get_impl, namespaces::namespaces_impl};
use crate::tools::offline_fetch::{OfflineFetchParams, fetch_impl};
use crate::tools::worker::{
    WorkerMessageParams, client_messages::client_messages_impl, message::message_impl, status::status_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

#[derive(Clone)]
pub struct PrecacheServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl PrecacheServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Fetch a URL through the offline cache worker. GET requests are answered from the cache first, then the network; page navigations fall back to the offline document when the network is down."
    )]
    async fn offline_fetch(&self, params: Parameters<OfflineFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.state, params.0).await
    }

    #[tool(description = "Read a cached GET response without touching the network.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.state, params.0).await
    }

    #[tool(description = "List cache namespaces with their entry counts.")]
    async fn cache_namespaces(&self) -> Result<CallToolResult, McpError> {
        namespaces_impl(&self.state).await
    }

    #[tool(description = "Report the worker's version, namespace, lifecycle state and open clients.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.state).await
    }

    #[tool(description = "Post a message to the worker. Send type \"force-activate\" to activate a waiting version.")]
    async fn worker_message(&self, params: Parameters<WorkerMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.state, params.0).await
    }

    #[tool(description = "Drain notifications the worker sent to this client, such as new-version-available.")]
    async fn client_messages(&self) -> Result<CallToolResult, McpError> {
        client_messages_impl(&self.state).await
    }
}

impl ServerHandler for PrecacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "precache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
