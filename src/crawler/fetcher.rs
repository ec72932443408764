//! HTTP renderer implementation
//!
//! `HttpBrowser` renders pages with plain GET requests. It executes no
//! scripts, which is enough for server-rendered sites.

use crate::crawler::renderer::{Browser, Renderer};
use crate::RenderError;
use async_trait::async_trait;
use reqwest::header::REFERER;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

/// Builds the HTTP client shared by page fetches and robots.txt fetches
///
/// # Arguments
///
/// * `user_agent` - The User-Agent header sent with every request
/// * `timeout` - Total time allowed for one request
///
/// # Example
///
/// ```no_run
/// use ripple_frontier::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client("RippleBot/0.1", Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Browser that hands out reqwest-backed pages
#[derive(Debug, Clone)]
pub struct HttpBrowser {
    client: Client,
}

impl HttpBrowser {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn new_page(&self) -> Result<Box<dyn Renderer>, RenderError> {
        Ok(Box::new(HttpPage::new(self.client.clone())))
    }
}

/// One page of an `HttpBrowser`
///
/// # Error Mapping
///
/// | Condition | Error |
/// |-----------|-------|
/// | Request timeout | `Timeout` |
/// | Connect or other transport failure | `Navigation` |
/// | HTTP 5xx or 429 | `Status` |
///
/// Other statuses (including 404) load normally; the handler sees the body.
#[derive(Debug)]
pub struct HttpPage {
    client: Client,
    response: Option<Response>,
    url: Option<String>,
    body: Option<String>,
}

impl HttpPage {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            response: None,
            url: None,
            body: None,
        }
    }
}

fn classify(url: &str, error: reqwest::Error) -> RenderError {
    if error.is_timeout() {
        RenderError::Timeout {
            url: url.to_string(),
        }
    } else {
        RenderError::Navigation {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

fn is_failure_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

#[async_trait]
impl Renderer for HttpPage {
    async fn navigate(&mut self, url: &str, referer: Option<&str>) -> Result<(), RenderError> {
        self.response = None;
        self.url = None;
        self.body = None;

        let mut request = self.client.get(url);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }

        let response = request.send().await.map_err(|e| classify(url, e))?;

        let status = response.status();
        if is_failure_status(status) {
            return Err(RenderError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        self.url = Some(response.url().to_string());
        self.response = Some(response);
        Ok(())
    }

    async fn wait_for_load(&mut self) -> Result<(), RenderError> {
        if self.body.is_some() {
            return Ok(());
        }

        let response = self.response.take().ok_or(RenderError::NotLoaded)?;
        let url = self.url.clone().unwrap_or_default();
        let body = response.text().await.map_err(|e| classify(&url, e))?;
        self.body = Some(body);
        Ok(())
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        self.body.clone().ok_or(RenderError::NotLoaded)
    }

    fn current_url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}
