//! precache server entry point.
//!
//! Boots the offline cache worker for the configured version, then serves it
//! as MCP tools on stdio. Logging goes to stderr to keep stdout for JSON-RPC.

use std::sync::Arc;

use anyhow::Result;
use precache_core::AppConfig;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod state;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        version = %config.version,
        origin = %config.origin,
        db = %config.db_path.display(),
        "Starting precache server on stdio transport"
    );

    let state = Arc::new(state::AppState::open(&config).await?);

    // A failed install leaves the worker redundant. It still answers from
    // whatever namespace an earlier run left in the store.
    match state.host.start().await {
        Ok(startup) => {
            tracing::info!(
                entries = startup.install.entries,
                resumed = startup.install.resumed,
                activated = startup.activation.is_some(),
                "worker started"
            )
        }
        Err(e) => tracing::error!(error = %e, "worker failed to start"),
    }

    let handler = handler::PrecacheServer::new(Arc::clone(&state));
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    state.host.shutdown().await;

    Ok(())
}
