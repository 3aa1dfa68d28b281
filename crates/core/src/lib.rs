//! Core types and shared functionality for precache.
//!
//! This crate provides:
//! - Versioned cache store with SQLite backend
//! - Request/response model shared by the fetcher and the store
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, CacheHandle, CacheStorage, RequestKey};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{CachedResponse, Destination, Method, Request, ResponseType};
