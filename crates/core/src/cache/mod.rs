//! SQLite-backed versioned cache store.
//!
//! This module provides a persistent request→response cache using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Namespaces, one per deployed version, deleted wholesale
//! - Entries keyed by request identity (SHA-256 of method and URL)
//! - Atomic batch writes for manifest population
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod key;
pub mod migrations;
pub mod namespaces;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::STORED_HEADERS;
pub use key::RequestKey;
pub use namespaces::CacheHandle;
pub use storage::CacheStorage;
