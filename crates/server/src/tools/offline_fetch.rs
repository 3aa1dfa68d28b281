//! offline_fetch tool implementation.
//!
//! Sends a request through the worker the way a page under its control would.

use chrono::Utc;
use precache_client::canonicalize;
use precache_core::{Destination, Error, Method, Request};
use precache_worker::FetchDecision;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::state::AppState;

/// Parameters for the offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// Request method (default: GET). Only GET is served from the cache.
    #[serde(default)]
    pub method: Option<Method>,

    /// What the response is for. `document` marks a page navigation, which
    /// falls back to the offline document when the network is down.
    #[serde(default)]
    pub destination: Option<Destination>,
}

/// Output from the offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchOutput {
    pub url: String,
    /// URL of the response actually served.
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    /// One of `cache`, `network`, `offline-fallback`, or `passthrough`.
    pub source: String,
    pub body: String,
    /// ISO8601 timestamp of when the response was served.
    pub fetched_at: String,
}

/// Implementation of the offline_fetch tool.
pub async fn fetch_impl(state: &AppState, params: OfflineFetchParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url, &state.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = Request::new(
        params.method.unwrap_or(Method::Get),
        url,
        params.destination.unwrap_or_default(),
    );

    let (response, source) = match state.host.fetch(request.clone()).await? {
        FetchDecision::Respond { response, source } => (response, source.as_str()),
        FetchDecision::Passthrough => {
            tracing::debug!(url = %request.url, method = %request.method, "worker passed request through");
            (state.fetcher.fetch(&request).await?, "passthrough")
        }
    };

    let output = OfflineFetchOutput {
        url: request.url.to_string(),
        final_url: response.url.to_string(),
        status: response.status,
        content_type: response.content_type().map(str::to_string),
        source: source.to_string(),
        body: String::from_utf8_lossy(&response.body).into_owned(),
        fetched_at: Utc::now().to_rfc3339(),
    };

    json_result(&output)
}
