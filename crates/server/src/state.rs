//! Everything the tool handlers share: the store, the worker for the
//! configured version, and the server's own client connection.

use std::sync::Arc;

use precache_client::{FetchConfig, Fetcher, HttpFetcher};
use precache_core::{AppConfig, CacheDb, Error};
use precache_worker::{ClientConnection, ClientRegistry, Host, ServiceWorker};
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;
use url::Url;

pub struct AppState {
    pub origin: Url,
    pub db: Arc<CacheDb>,
    pub worker: Arc<ServiceWorker>,
    pub host: Host,
    /// Used directly for requests the worker passes through.
    pub fetcher: Arc<dyn Fetcher>,
    /// The server acts as one consuming context.
    pub client: Mutex<ClientConnection>,
}

impl AppState {
    /// Open the cache database and build the HTTP fetcher from `config`.
    pub async fn open(config: &AppConfig) -> Result<Self, Error> {
        let db = Arc::new(CacheDb::open(&config.db_path).await?);
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;

        let mut fetch_config = FetchConfig::new(origin);
        fetch_config.user_agent = config.user_agent.clone();
        fetch_config.timeout = config.timeout();
        let fetcher = Arc::new(HttpFetcher::new(fetch_config)?);

        Self::with_parts(config, db, fetcher)
    }

    pub fn with_parts(config: &AppConfig, db: Arc<CacheDb>, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;

        let registry = ClientRegistry::new();
        let client = registry.connect();
        let tracker = TaskTracker::new();

        let worker = Arc::new(ServiceWorker::new(
            config,
            db.clone(),
            Arc::clone(&fetcher),
            Arc::new(registry),
            tracker.clone(),
        )?);
        let host = Host::new(worker.clone(), tracker);

        Ok(Self { origin, db, worker, host, fetcher, client: Mutex::new(client) })
    }
}
