//! cache_namespaces tool implementation.

use precache_core::CacheHandle;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NamespaceInfo {
    pub name: String,
    pub entries: u64,
    /// Whether this is the configured version's namespace.
    pub current: bool,
}

/// Output from the cache_namespaces tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheNamespacesOutput {
    pub namespaces: Vec<NamespaceInfo>,
}

/// List every namespace in the store, oldest first.
pub async fn namespaces_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let current = state.worker.namespace();
    let mut namespaces = Vec::new();

    for name in state.db.list_namespaces().await? {
        let entries = state.db.count_entries(&CacheHandle::named(name.as_str())).await?;
        let is_current = name == current;
        namespaces.push(NamespaceInfo { name, entries, current: is_current });
    }

    json_result(&CacheNamespacesOutput { namespaces })
}
