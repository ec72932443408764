//! Crawler module for draining the request queue
//!
//! This module contains the worker pool and its collaborators:
//! - Shared rate limiting and bounded retries
//! - Renderer, browser and page handler traits
//! - An HTTP renderer and a link-following page handler

mod fetcher;
mod limiter;
mod parser;
mod pool;
mod renderer;
mod retry;
mod worker;

pub use fetcher::{build_http_client, HttpBrowser, HttpPage};
pub use limiter::RateLimiter;
pub use parser::{parse_links, LinkFollower};
pub use pool::{CrawlReport, Crawler, RunState};
pub use renderer::{Browser, NoopHandler, PageContext, PageHandler, Renderer};
pub use retry::{RetryDecision, RetryPolicy};
pub use worker::WorkerReport;

use crate::config::Config;
use crate::Result;
use std::sync::Arc;

/// Builds a crawler that renders over HTTP and follows same-origin links
pub fn http_crawler(config: Config) -> Result<Crawler> {
    let client = build_http_client(
        &config.crawler.user_agent,
        config.crawler.navigation_timeout(),
    )?;
    Crawler::new(
        config,
        Arc::new(HttpBrowser::new(client)),
        Arc::new(LinkFollower::new()),
    )
}

/// Runs a complete crawl over HTTP
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the queue in the configured data directory
/// 2. Clear all partitions if `fresh` is set
/// 3. Enqueue the configured seeds (known URLs are skipped)
/// 4. Run the worker pool until the queue is drained
pub async fn crawl(config: Config, fresh: bool) -> Result<CrawlReport> {
    let seeds = config.seeds.clone();
    let mut crawler = http_crawler(config)?;

    if fresh {
        tracing::info!("Clearing queue in {}", crawler.queue().directory().display());
        crawler.queue().clear()?;
    }

    let added = crawler.add_seeds(&seeds)?;
    tracing::info!("Enqueued {} of {} seed URLs", added, seeds.len());

    crawler.run().await
}
