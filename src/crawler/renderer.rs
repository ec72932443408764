//! Collaborator traits the worker pool drives
//!
//! A `Browser` hands out one `Renderer` page per worker. After a successful
//! render the worker passes the page and a `PageContext` to the `PageHandler`.

use crate::queue::{CrawlRequest, RequestQueue};
use crate::{QueueResult, RenderError};
use async_trait::async_trait;

/// A single page that can be pointed at URLs
#[async_trait]
pub trait Renderer: Send {
    /// Starts loading `url`, sending `referer` when given
    async fn navigate(&mut self, url: &str, referer: Option<&str>) -> Result<(), RenderError>;

    /// Waits until the navigated page has finished loading
    async fn wait_for_load(&mut self) -> Result<(), RenderError>;

    /// Returns the HTML of the loaded page
    async fn content(&mut self) -> Result<String, RenderError>;

    /// URL of the loaded page after redirects, if any page is loaded
    fn current_url(&self) -> Option<&str>;
}

/// Factory for renderer pages
#[async_trait]
pub trait Browser: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn Renderer>, RenderError>;
}

/// What a page handler gets to see about a rendered request
pub struct PageContext<'a> {
    /// The request that was rendered
    pub request: &'a CrawlRequest,
    /// Page HTML
    pub html: &'a str,
    /// Final URL of the page
    pub url: &'a str,
    /// Queue the request came from
    pub queue: &'a RequestQueue,
    /// Id of the worker that rendered the page
    pub worker_id: usize,
}

impl<'a> PageContext<'a> {
    /// Enqueues `url` with this page as its referer
    ///
    /// Returns false if the URL was already known.
    pub fn enqueue(&self, url: &str, label: Option<&str>) -> QueueResult<bool> {
        let request = CrawlRequest::new(url)
            .with_label(label)
            .with_referer(Some(self.url));
        self.queue.add(request)
    }
}

impl std::fmt::Debug for PageContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageContext")
            .field("request", self.request)
            .field("url", &self.url)
            .field("html_len", &self.html.len())
            .field("worker_id", &self.worker_id)
            .finish()
    }
}

/// Hook invoked for every successfully rendered page
#[async_trait]
pub trait PageHandler: Send + Sync {
    async fn handle(
        &self,
        page: &mut dyn Renderer,
        context: &PageContext<'_>,
    ) -> anyhow::Result<()>;
}

/// Page handler that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

#[async_trait]
impl PageHandler for NoopHandler {
    async fn handle(
        &self,
        _page: &mut dyn Renderer,
        _context: &PageContext<'_>,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_sets_referer() {
        let dir = tempfile::tempdir().unwrap();
        let queue = RequestQueue::open(dir.path()).unwrap();
        let request = CrawlRequest::new("https://example.com/");
        let context = PageContext {
            request: &request,
            html: "<html></html>",
            url: "https://example.com/index.html",
            queue: &queue,
            worker_id: 0,
        };

        assert!(context.enqueue("https://example.com/next", Some("detail")).unwrap());
        assert!(!context.enqueue("https://example.com/next", None).unwrap());

        let queued = queue.pop().unwrap();
        assert_eq!(queued.label.as_deref(), Some("detail"));
        assert_eq!(queued.referer.as_deref(), Some("https://example.com/index.html"));
    }
}
