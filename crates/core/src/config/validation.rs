//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `app_prefix` or `version` is empty
    /// - `origin` is not an http(s) URL
    /// - `manifest` is empty, has duplicates, or cannot be resolved
    /// - `offline_document` is not listed in `manifest`
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_prefix.trim().is_empty() {
            return Err(invalid("app_prefix", "must not be empty"));
        }
        if self.version.trim().is_empty() {
            return Err(invalid("version", "must not be empty"));
        }

        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme())));
        }

        if self.manifest.is_empty() {
            return Err(invalid("manifest", "must list at least the offline document"));
        }

        let mut seen = HashSet::new();
        for mut url in self.manifest_urls()? {
            url.set_fragment(None);
            if !seen.insert(url.to_string()) {
                return Err(invalid("manifest", format!("duplicate entry: {url}")));
            }
            if url.origin() != origin.origin() {
                return Err(invalid("manifest", format!("cross-origin entry: {url}")));
            }
        }

        let mut offline = self.offline_url()?;
        offline.set_fragment(None);
        if !seen.contains(offline.as_str()) {
            return Err(invalid("offline_document", format!("{} is not in the manifest", self.offline_document)));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if !self.skip_waiting {
            tracing::debug!("skip_waiting disabled; new versions wait for a force-activate message");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: Result<(), ConfigError>) -> Option<String> {
        match result {
            Err(ConfigError::Invalid { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_version() {
        let config = AppConfig { version: " ".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("version"));
    }

    #[test]
    fn test_validate_empty_prefix() {
        let config = AppConfig { app_prefix: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("app_prefix"));
    }

    #[test]
    fn test_validate_bad_origin() {
        let config = AppConfig { origin: "not a url".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("origin"));

        let config = AppConfig { origin: "ftp://example.com".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("origin"));
    }

    #[test]
    fn test_validate_offline_document_not_in_manifest() {
        let config = AppConfig { manifest: vec!["/".into(), "/about".into()], ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("offline_document"));
    }

    #[test]
    fn test_validate_duplicate_manifest_entry() {
        let config = AppConfig {
            manifest: vec!["/offline.html".into(), "/about".into(), "/about#team".into()],
            ..Default::default()
        };
        assert_eq!(field_of(config.validate()).as_deref(), Some("manifest"));
    }

    #[test]
    fn test_validate_cross_origin_manifest_entry() {
        let config = AppConfig {
            manifest: vec!["/offline.html".into(), "https://cdn.example.net/app.js".into()],
            ..Default::default()
        };
        assert_eq!(field_of(config.validate()).as_deref(), Some("manifest"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("timeout_ms"));

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("timeout_ms"));

        let config = AppConfig { timeout_ms: 100, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("user_agent"));
    }
}
