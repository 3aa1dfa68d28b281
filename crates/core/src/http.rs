//! Request and response model shared by the fetcher, the store and the worker.
//!
//! These types carry exactly what the interceptor needs to make a caching
//! decision: method, URL and destination hint on the way in; status, headers,
//! body and response type on the way out.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    /// Only GET requests are retrieval requests eligible for caching.
    pub fn is_retrieval(self) -> bool {
        matches!(self, Method::Get)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "OPTIONS" => Ok(Method::Options),
            other => Err(Error::InvalidInput(format!("unsupported method: {other}"))),
        }
    }
}

/// What the requesting context intends to do with the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// A top-level navigable document.
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
    Audio,
    Video,
    /// No destination hint (e.g. a programmatic fetch).
    #[default]
    Empty,
}

impl Destination {
    pub fn is_navigation(self) -> bool {
        matches!(self, Destination::Document)
    }
}

impl FromStr for Destination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "document" => Ok(Destination::Document),
            "image" => Ok(Destination::Image),
            "script" => Ok(Destination::Script),
            "style" => Ok(Destination::Style),
            "font" => Ok(Destination::Font),
            "manifest" => Ok(Destination::Manifest),
            "audio" => Ok(Destination::Audio),
            "video" => Ok(Destination::Video),
            "" => Ok(Destination::Empty),
            other => Err(Error::InvalidInput(format!("unsupported destination: {other}"))),
        }
    }
}

/// An outgoing request issued by a consuming context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub destination: Destination,
}

impl Request {
    pub fn new(method: Method, url: Url, destination: Destination) -> Self {
        Self { method, url, destination }
    }

    /// A plain GET with no destination hint.
    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url, Destination::Empty)
    }

    /// A top-level navigation.
    pub fn navigate(url: Url) -> Self {
        Self::new(Method::Get, url, Destination::Document)
    }
}

/// Response type, following the fetch standard's classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response whose content can be inspected.
    Basic,
    /// Cross-origin response.
    Cors,
    /// Cross-origin response whose content cannot be inspected.
    Opaque,
}

/// A response as returned by the network or stored in the cache.
///
/// The body is an immutable [`Bytes`] buffer, so cloning a response yields an
/// independent copy that can be stored while the original is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    /// Final URL after redirects.
    pub url: Url,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub kind: ResponseType,
}

impl CachedResponse {
    /// A same-origin response with no headers.
    pub fn basic(url: Url, status: u16, body: impl Into<Bytes>) -> Self {
        Self { url, status, headers: Vec::new(), body: body.into(), kind: ResponseType::Basic }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!(" POST ".parse::<Method>().unwrap(), Method::Post);
        assert!("BREW".parse::<Method>().is_err());
    }

    #[test]
    fn test_only_get_is_retrieval() {
        assert!(Method::Get.is_retrieval());
        assert!(!Method::Head.is_retrieval());
        assert!(!Method::Post.is_retrieval());
    }

    #[test]
    fn test_destination_parse() {
        assert_eq!("document".parse::<Destination>().unwrap(), Destination::Document);
        assert_eq!("".parse::<Destination>().unwrap(), Destination::Empty);
        assert!("worker".parse::<Destination>().is_err());
        assert!(Destination::Document.is_navigation());
        assert!(!Destination::Image.is_navigation());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let url = Url::parse("https://example.com/").unwrap();
        let response = CachedResponse::basic(url, 200, "hi").with_header("Content-Type", "text/plain");
        assert_eq!(response.content_type(), Some("text/plain"));
        assert_eq!(response.header("CONTENT-TYPE"), Some("text/plain"));
        assert!(response.is_ok());
    }

    #[test]
    fn test_clone_is_independent_copy() {
        let url = Url::parse("https://example.com/").unwrap();
        let original = CachedResponse::basic(url, 200, "body");
        let copy = original.clone();
        drop(original);
        assert_eq!(&copy.body[..], b"body");
    }
}
