//! Network side of precache.
//!
//! This crate provides the `Fetcher` seam the worker uses to reach the
//! network, a reqwest-backed implementation, and URL canonicalization for
//! requests issued by consuming contexts.

pub mod fetch;

pub use fetch::{FetchConfig, Fetcher, HttpFetcher, UrlError, canonicalize};
