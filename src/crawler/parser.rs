//! HTML link extraction and the link-following page handler

use crate::crawler::renderer::{PageContext, PageHandler, Renderer};
use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

/// Parses HTML content and returns the links worth following
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - Fragment-only links
/// - Anything that does not resolve to http(s)
///
/// Fragments are stripped from resolved links, and each link appears once in
/// document order.
///
/// # Example
///
/// ```
/// use ripple_frontier::crawler::parse_links;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// assert_eq!(
///     parse_links(html, &base_url),
///     vec!["https://example.com/page".to_string()]
/// );
/// ```
pub fn parse_links(html: &str, base_url: &Url) -> Vec<String> {
    extract_links(&Html::parse_document(html), base_url)
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();
    let mut push = |href: &str| {
        if let Some(absolute_url) = resolve_link(href, base_url) {
            if !links.contains(&absolute_url) {
                links.push(absolute_url);
            }
        }
    };

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    links
}

/// Resolves an href against `base_url`, or None if it should not be followed
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }
    absolute_url.set_fragment(None);

    Some(absolute_url.to_string())
}

/// Page handler that enqueues the links of every page
///
/// New requests inherit the parent's label and carry the page URL as referer.
/// By default only links on the page's own origin are followed.
#[derive(Debug, Clone, Copy)]
pub struct LinkFollower {
    same_origin_only: bool,
}

impl LinkFollower {
    pub fn new() -> Self {
        Self {
            same_origin_only: true,
        }
    }

    /// Follows links to any host
    pub fn any_origin() -> Self {
        Self {
            same_origin_only: false,
        }
    }

    /// Links on `html` that this follower would enqueue
    pub fn links_to_follow(&self, html: &str, page_url: &str) -> Vec<String> {
        let Ok(base_url) = Url::parse(page_url) else {
            return Vec::new();
        };

        let links = parse_links(html, &base_url);
        if !self.same_origin_only {
            return links;
        }

        let origin = base_url.origin();
        links
            .into_iter()
            .filter(|link| {
                Url::parse(link)
                    .map(|url| url.origin() == origin)
                    .unwrap_or(false)
            })
            .collect()
    }
}

impl Default for LinkFollower {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageHandler for LinkFollower {
    async fn handle(
        &self,
        _page: &mut dyn Renderer,
        context: &PageContext<'_>,
    ) -> anyhow::Result<()> {
        let label = context.request.label.as_deref();
        let mut added = 0;

        for link in self.links_to_follow(context.html, context.url) {
            match context.enqueue(&link, label) {
                Ok(true) => added += 1,
                Ok(false) => {}
                Err(crate::QueueError::InvalidUrl { url, reason }) => {
                    tracing::debug!("Ignoring link {}: {}", url, reason);
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::debug!(
            "Worker {} enqueued {} links from {}",
            context.worker_id,
            added,
            context.url
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    #[test]
    fn test_extract_relative_links() {
        let html = r#"<html><body><a href="/other">A</a><a href="sibling">B</a></body></html>"#;
        assert_eq!(
            parse_links(html, &base_url()),
            vec![
                "https://example.com/other".to_string(),
                "https://example.com/sibling".to_string()
            ]
        );
    }

    #[test]
    fn test_skip_special_schemes() {
        let html = r#"
            <html><body>
                <a href="javascript:void(0)">JS</a>
                <a href="JavaScript:alert(1)">JS</a>
                <a href="mailto:test@example.com">Email</a>
                <a href="tel:+1234567890">Call</a>
                <a href="data:text/html,<h1>Test</h1>">Data</a>
                <a href="ftp://example.com/file">FTP</a>
            </body></html>
        "#;
        assert!(parse_links(html, &base_url()).is_empty());
    }

    #[test]
    fn test_skip_download_and_fragment_links() {
        let html = r##"<html><body>
            <a href="/file.pdf" download>D</a>
            <a href="#top">Top</a>
        </body></html>"##;
        assert!(parse_links(html, &base_url()).is_empty());
    }

    #[test]
    fn test_fragments_stripped_and_duplicates_dropped() {
        let html = r#"
            <html><body>
                <a href="/a#one">1</a>
                <a href="/a#two">2</a>
                <a href="/a">3</a>
            </body></html>
        "#;
        assert_eq!(
            parse_links(html, &base_url()),
            vec!["https://example.com/a".to_string()]
        );
    }

    #[test]
    fn test_extract_canonical_link() {
        let html = r#"<html><head>
            <link rel="canonical" href="https://example.com/canonical" />
        </head><body></body></html>"#;
        let links = parse_links(html, &base_url());
        assert!(links.contains(&"https://example.com/canonical".to_string()));
    }

    #[test]
    fn test_follower_keeps_same_origin() {
        let html = r#"
            <html><body>
                <a href="/local">Local</a>
                <a href="https://other.com/away">Away</a>
                <a href="http://example.com/insecure">Other scheme</a>
            </body></html>
        "#;
        let links = LinkFollower::new().links_to_follow(html, "https://example.com/page");
        assert_eq!(links, vec!["https://example.com/local".to_string()]);

        let links = LinkFollower::any_origin()
            .links_to_follow(html, "https://example.com/page");
        assert_eq!(links.len(), 3);
    }

    #[test]
    fn test_follower_with_unparseable_page_url() {
        let html = r#"<a href="/x">x</a>"#;
        assert!(LinkFollower::new().links_to_follow(html, "nope").is_empty());
    }
}
