//! Read-only views of the cache store.

pub mod get;
pub mod namespaces;

pub use get::CacheGetParams;
