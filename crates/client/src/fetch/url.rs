//! URL canonicalization for request identity.

use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a request URL so equal requests map to equal cache keys.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve relative references (e.g. `/courses`) against `base`
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str, base: &Url) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = base.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://app.example.com/").unwrap()
    }

    #[test]
    fn test_canonicalize_relative_path() {
        let url = canonicalize("/courses", &base()).unwrap();
        assert_eq!(url.as_str(), "https://app.example.com/courses");
    }

    #[test]
    fn test_canonicalize_absolute_keeps_host() {
        let url = canonicalize("https://cdn.example.net/app.js", &base()).unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.net"));
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("https://APP.Example.COM/About", &base()).unwrap();
        assert_eq!(url.host_str(), Some("app.example.com"));
        assert_eq!(url.path(), "/About");
    }

    #[test]
    fn test_canonicalize_remove_fragment() {
        let url = canonicalize("/about#team", &base()).unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/about");
    }

    #[test]
    fn test_canonicalize_preserve_query() {
        let url = canonicalize("/notes?b=2&a=1", &base()).unwrap();
        assert_eq!(url.query(), Some("b=2&a=1"));
    }

    #[test]
    fn test_canonicalize_trim_whitespace() {
        let url = canonicalize("  /contact  ", &base()).unwrap();
        assert_eq!(url.as_str(), "https://app.example.com/contact");
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize("file:///etc/passwd", &base());
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize("", &base()), Err(UrlError::Empty)));
        assert!(matches!(canonicalize("   ", &base()), Err(UrlError::Empty)));
    }
}
