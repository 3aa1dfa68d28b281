//! cache_get tool implementation.
//!
//! Looks up a GET entry in the active version's namespace without touching
//! the network.

use std::collections::BTreeMap;

use precache_client::canonicalize;
use precache_core::{CacheHandle, Error, RequestKey, ResponseType};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// Namespace to read from. Defaults to the configured version's.
    #[serde(default)]
    pub namespace: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub namespace: String,
    /// Hash of the request key.
    pub key: String,
    pub url: String,
    pub status: u16,
    pub response_type: ResponseType,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(state: &AppState, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url, &state.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let namespace = params.namespace.unwrap_or_else(|| state.worker.namespace().to_string());
    let key = RequestKey::get(&url);

    let response = state
        .db
        .get_entry(&CacheHandle::named(namespace.as_str()), &key)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{key} in {namespace}")))?;

    let output = CacheGetOutput {
        namespace,
        key: key.hash(),
        url: response.url.to_string(),
        status: response.status,
        response_type: response.kind,
        headers: response.headers.iter().cloned().collect(),
        body: String::from_utf8_lossy(&response.body).into_owned(),
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::fixtures;
    use crate::tools::parse_output;

    #[tokio::test]
    async fn test_get_missing() {
        let (_fetcher, state) = fixtures::started().await;
        let params = CacheGetParams { url: "/nonexistent".to_string(), namespace: None };

        let err = get_impl(&state, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_precached() {
        let (_fetcher, state) = fixtures::started().await;
        let params = CacheGetParams { url: "https://app.example.com/offline.html".to_string(), namespace: None };

        let output: CacheGetOutput = parse_output(&get_impl(&state, params).await.unwrap());

        assert_eq!(output.namespace, "precache-v1");
        assert_eq!(output.status, 200);
        assert_eq!(output.response_type, ResponseType::Basic);
        assert_eq!(output.body, "offline");
        assert_eq!(output.headers.get("content-type").map(String::as_str), Some("text/html"));
        assert_eq!(output.key.len(), 64);
    }

    #[tokio::test]
    async fn test_get_other_namespace() {
        let (_fetcher, state) = fixtures::started().await;
        let params = CacheGetParams { url: "/".to_string(), namespace: Some("precache-v0".to_string()) };

        assert!(get_impl(&state, params).await.is_err());
    }
}
