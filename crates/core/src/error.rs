//! Unified error types for precache.
//!
//! The Display prefix of every variant is a stable error code that hosts
//! can match on.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the precache worker and its hosts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., unknown method or destination).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL, or a URL outside the application origin.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// No cache entry found for the given request.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored entry could not be decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// The cache store (or a namespace in it) could not be opened.
    #[error("STORE_UNAVAILABLE: {0}")]
    StoreUnavailable(String),

    /// A manifest entry could not be fetched during install.
    #[error("PRECACHE_FAILED: {url}: {reason}")]
    PrecacheFailed { url: String, reason: String },

    /// The fetched manifest could not be written into the install namespace.
    #[error("PRECACHE_FAILED: namespace {namespace}: {reason}")]
    PrecacheWriteFailed { namespace: String, reason: String },

    /// The network request failed outright (no response).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// A lifecycle operation was requested in a state that does not allow it.
    #[error("INVALID_STATE: {0}")]
    InvalidState(String),

    /// A worker task panicked or was cancelled.
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::CorruptEntry(msg) => (-32002, msg.clone()),
            Error::StoreUnavailable(msg) => (-32004, msg.clone()),
            Error::PrecacheFailed { .. } | Error::PrecacheWriteFailed { .. } => (-32005, err.to_string()),
            Error::Network(msg) => (-32006, msg.clone()),
            Error::InvalidState(msg) => (-32007, msg.clone()),
            Error::Internal(msg) => (-32603, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CacheMiss("GET https://example.com/".to_string());
        assert!(err.to_string().contains("CACHE_MISS"));
        assert!(err.to_string().contains("https://example.com/"));
    }

    #[test]
    fn test_precache_failed_display() {
        let err = Error::PrecacheFailed { url: "/offline.html".into(), reason: "status 404".into() };
        assert_eq!(err.to_string(), "PRECACHE_FAILED: /offline.html: status 404");

        let err = Error::PrecacheWriteFailed { namespace: "precache-v2".into(), reason: "disk full".into() };
        assert_eq!(err.to_string(), "PRECACHE_FAILED: namespace precache-v2: disk full");
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32005);
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::CacheMiss("abc123".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32001);

        let mcp_err: McpError = Error::Network("offline".into()).into();
        assert_eq!(mcp_err.code.0, -32006);
    }
}
