//! HTTP fetch pipeline for cache misses and manifest population.
//!
//! ### Fetcher seam
//! - The worker only sees the [`Fetcher`] trait, so hosts and tests can plug
//!   in their own network layer.
//!
//! ### Response classification
//! - A response whose request and final URL both share the application origin
//!   is `basic`; anything that left the origin (directly or via redirect) is
//!   `cors` and will never be cached.
//! - Non-success statuses are returned as responses, not errors. Only a
//!   failure to obtain a response at all is an error.

pub mod url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Url};

pub use self::url::{UrlError, canonicalize};

use precache_core::{CachedResponse, Error, Method, Request, ResponseType};

/// Network access used by the worker.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue the request against the network.
    ///
    /// Returns `Err` only when no response could be obtained.
    async fn fetch(&self, request: &Request) -> Result<CachedResponse, Error>;
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Application origin used to classify responses.
    pub origin: Url,

    /// User agent string (default: "precache/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl FetchConfig {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            user_agent: "precache/0.1".to_string(),
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

/// reqwest-backed [`Fetcher`].
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Classify a response by where the request went and where it ended up.
    pub fn classify(&self, requested: &Url, final_url: &Url) -> ResponseType {
        let origin = self.config.origin.origin();
        if requested.origin() == origin && final_url.origin() == origin {
            ResponseType::Basic
        } else {
            ResponseType::Cors
        }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<CachedResponse, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(to_reqwest_method(request.method), request.url.as_str())
            .send()
            .await
            .map_err(|e| Error::Network(format!("{} {}: {e}", request.method, request.url)))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {e}")))?;

        let kind = self.classify(&request.url, &final_url);
        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} {} in {}ms ({} bytes, {:?})",
            request.method,
            request.url,
            status,
            final_url,
            fetch_ms,
            body.len(),
            kind
        );

        Ok(CachedResponse { url: final_url, status, headers, body, kind })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(FetchConfig::new(Url::parse("https://app.example.com").unwrap())).unwrap()
    }

    #[test]
    fn test_fetch_config_defaults() {
        let config = FetchConfig::new(Url::parse("https://app.example.com").unwrap());
        assert_eq!(config.user_agent, "precache/0.1");
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_classify_same_origin() {
        let f = fetcher();
        let url = Url::parse("https://app.example.com/courses").unwrap();
        assert_eq!(f.classify(&url, &url), ResponseType::Basic);
    }

    #[test]
    fn test_classify_cross_origin() {
        let f = fetcher();
        let url = Url::parse("https://cdn.example.net/app.js").unwrap();
        assert_eq!(f.classify(&url, &url), ResponseType::Cors);
    }

    #[test]
    fn test_classify_redirected_off_origin() {
        let f = fetcher();
        let requested = Url::parse("https://app.example.com/login").unwrap();
        let landed = Url::parse("https://sso.example.org/login").unwrap();
        assert_eq!(f.classify(&requested, &landed), ResponseType::Cors);
    }

    #[test]
    fn test_method_mapping() {
        assert_eq!(to_reqwest_method(Method::Get), reqwest::Method::GET);
        assert_eq!(to_reqwest_method(Method::Post), reqwest::Method::POST);
    }

    #[tokio::test]
    async fn test_fetch_unreachable_is_network_error() {
        let f = HttpFetcher::new(FetchConfig {
            timeout: Duration::from_millis(500),
            ..FetchConfig::new(Url::parse("http://127.0.0.1:9").unwrap())
        })
        .unwrap();
        let request = Request::get(Url::parse("http://127.0.0.1:9/").unwrap());

        let result = f.fetch(&request).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }
}
