//! Robots.txt handling module
//!
//! This module decides whether a URL may be crawled. Two checkers exist:
//! - `AllowAll`: permits everything without any I/O
//! - `RobotsCache`: fetches, caches and evaluates robots.txt per origin

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache, ROBOTS_STORE};
pub use parser::{product_token, ParsedRobots};

use async_trait::async_trait;
use url::Url;

/// Decides whether a URL may be fetched by a user agent
#[async_trait]
pub trait PolitenessChecker: Send + Sync {
    /// Returns true if `user_agent` may fetch `url`
    async fn can_fetch(&self, url: &str, user_agent: &str) -> bool;
}

/// Politeness checker that permits every URL
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl PolitenessChecker for AllowAll {
    async fn can_fetch(&self, _url: &str, _user_agent: &str) -> bool {
        true
    }
}

/// Returns the origin (`scheme://host[:port]`) robots.txt rules are scoped to
///
/// Default ports are omitted. Returns None for URLs without a host.
///
/// # Examples
///
/// ```
/// use ripple_frontier::robots::origin_of;
///
/// assert_eq!(
///     origin_of("https://Example.com:443/a/b?c=d").as_deref(),
///     Some("https://example.com")
/// );
/// assert_eq!(
///     origin_of("http://localhost:8080/").as_deref(),
///     Some("http://localhost:8080")
/// );
/// assert_eq!(origin_of("not a url"), None);
/// ```
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str()?;
    let origin = parsed.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Returns the robots.txt URL governing `url`
///
/// # Examples
///
/// ```
/// use ripple_frontier::robots::robots_txt_url;
///
/// assert_eq!(
///     robots_txt_url("http://books.toscrape.com/catalogue/page-1.html").as_deref(),
///     Some("http://books.toscrape.com/robots.txt")
/// );
/// ```
pub fn robots_txt_url(url: &str) -> Option<String> {
    origin_of(url).map(|origin| format!("{}/robots.txt", origin))
}
