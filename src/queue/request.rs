//! Crawl request records and URL validation

use crate::{QueueError, QueueResult};
use serde::{Deserialize, Serialize};
use url::Url;

/// A single unit of crawl work
///
/// The `url` is the identity key: two requests with the same url are the same
/// request regardless of label or referer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlRequest {
    /// Target URL, exactly as supplied
    pub url: String,

    /// Optional classification tag handed to the page handler
    #[serde(default)]
    pub label: Option<String>,

    /// Number of failed attempts so far
    #[serde(default)]
    pub retries: u32,

    /// Referer sent with the navigation
    #[serde(default)]
    pub referer: Option<String>,
}

impl CrawlRequest {
    /// Creates a fresh request with no label, referer, or retries
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: None,
            retries: 0,
            referer: None,
        }
    }

    /// Sets the label
    pub fn with_label(mut self, label: Option<impl Into<String>>) -> Self {
        self.label = label.map(Into::into);
        self
    }

    /// Sets the referer
    pub fn with_referer(mut self, referer: Option<impl Into<String>>) -> Self {
        self.referer = referer.map(Into::into);
        self
    }
}

/// Validates that `url` is an absolute http(s) URL with a host
///
/// # Examples
///
/// ```
/// use ripple_frontier::queue::validate_url;
///
/// assert!(validate_url("https://example.com/page").is_ok());
/// assert!(validate_url("not-a-url").is_err());
/// assert!(validate_url("ftp://example.com/file").is_err());
/// ```
pub fn validate_url(url: &str) -> QueueResult<()> {
    let invalid = |reason: String| QueueError::InvalidUrl {
        url: url.to_string(),
        reason,
    };

    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(invalid(format!(
            "only http and https are supported, got {}",
            parsed.scheme()
        )));
    }

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(invalid("missing host".to_string())),
    }
}
