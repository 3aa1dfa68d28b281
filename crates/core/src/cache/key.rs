//! Request-identity cache keys.
//!
//! Entries are addressed by who asked for them (method + canonical URL), not
//! by what they contain, so a later write for the same request replaces the
//! earlier one.

use sha2::{Digest, Sha256};
use url::Url;

use crate::http::{Method, Request};

/// Normalized identity of a cacheable request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    method: Method,
    url: Url,
}

impl RequestKey {
    /// Build a key, dropping the URL fragment.
    pub fn new(method: Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self { method, url }
    }

    pub fn get(url: &Url) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn from_request(request: &Request) -> Self {
        Self::new(request.method, &request.url)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Stable hex digest used as the primary key inside a namespace.
    pub fn hash(&self) -> String {
        compute_cache_key(self.method.as_str(), self.url.as_str())
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Compute the cache key digest for a method and URL.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_hash_stability() {
        let a = RequestKey::get(&url("https://example.com/courses"));
        let b = RequestKey::get(&url("https://example.com/courses"));
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_fragment_ignored() {
        let a = RequestKey::get(&url("https://example.com/about#team"));
        let b = RequestKey::get(&url("https://example.com/about"));
        assert_eq!(a, b);
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_query_significant() {
        let a = RequestKey::get(&url("https://example.com/notes?page=1"));
        let b = RequestKey::get(&url("https://example.com/notes?page=2"));
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_method_significant() {
        let a = RequestKey::new(Method::Get, &url("https://example.com/"));
        let b = RequestKey::new(Method::Head, &url("https://example.com/"));
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_cache_key("GET", "https://example.com/");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_display() {
        let key = RequestKey::get(&url("https://example.com/offline.html"));
        assert_eq!(key.to_string(), "GET https://example.com/offline.html");
    }
}
