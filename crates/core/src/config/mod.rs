//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (PRECACHE_*)
//! 2. TOML config file (if PRECACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The version and manifest are deploy-time inputs: they are read once when
//! the worker is constructed and never change for its lifetime.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application prefix used to build namespace names.
    ///
    /// Set via PRECACHE_APP_PREFIX environment variable.
    #[serde(default = "default_app_prefix")]
    pub app_prefix: String,

    /// Deployed cache version. Bump on every release.
    ///
    /// Set via PRECACHE_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Origin of the application. Only same-origin responses are cached,
    /// and manifest paths are resolved against it.
    ///
    /// Set via PRECACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Ordered list of paths that must be available offline.
    ///
    /// Set via PRECACHE_MANIFEST environment variable (e.g. `["/", "/offline.html"]`).
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Document served for failed navigations. Must appear in `manifest`.
    ///
    /// Set via PRECACHE_OFFLINE_DOCUMENT environment variable.
    #[serde(default = "default_offline_document")]
    pub offline_document: String,

    /// Path to SQLite cache database.
    ///
    /// Set via PRECACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    ///
    /// Set via PRECACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network request timeout in milliseconds.
    ///
    /// Set via PRECACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Activate right after a successful install instead of waiting.
    ///
    /// Set via PRECACHE_SKIP_WAITING environment variable.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,
}

fn default_app_prefix() -> String {
    "precache".into()
}

fn default_version() -> String {
    "v1".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_manifest() -> Vec<String> {
    [
        "/",
        "/courses",
        "/about",
        "/contact",
        "/offline.html",
        "/manifest.json",
        "/icons/icon-192x192.png",
        "/icons/icon-512x512.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_offline_document() -> String {
    "/offline.html".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./precache.sqlite")
}

fn default_user_agent() -> String {
    "precache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_prefix: default_app_prefix(),
            version: default_version(),
            origin: default_origin(),
            manifest: default_manifest(),
            offline_document: default_offline_document(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            skip_waiting: true,
        }
    }
}

impl AppConfig {
    /// Namespace of the configured version: `<app_prefix>-<version>`.
    pub fn namespace(&self) -> String {
        format!("{}-{}", self.app_prefix, self.version)
    }

    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed application origin.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin).map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Resolve a manifest path (or absolute URL) against the origin.
    pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
        self.origin_url()?
            .join(path)
            .map_err(|e| ConfigError::Invalid { field: "manifest".into(), reason: format!("{path}: {e}") })
    }

    /// Manifest entries resolved to absolute URLs, in order.
    pub fn manifest_urls(&self) -> Result<Vec<Url>, ConfigError> {
        self.manifest.iter().map(|path| self.resolve(path)).collect()
    }

    /// Absolute URL of the offline-fallback document.
    pub fn offline_url(&self) -> Result<Url, ConfigError> {
        self.resolve(&self.offline_document)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `PRECACHE_`
    /// 2. TOML file from `PRECACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("PRECACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("PRECACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
