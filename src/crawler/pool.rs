//! Crawler - worker pool orchestration
//!
//! The crawler owns the queue, the shared rate limiter and the politeness
//! checker, and runs a fixed pool of workers over them exactly once.

use crate::config::{Config, SeedEntry};
use crate::crawler::fetcher::build_http_client;
use crate::crawler::limiter::RateLimiter;
use crate::crawler::renderer::{Browser, PageHandler};
use crate::crawler::retry::RetryPolicy;
use crate::crawler::worker::{Shared, Worker, WorkerReport};
use crate::queue::{CrawlRequest, RequestQueue};
use crate::robots::{AllowAll, PolitenessChecker, RobotsCache};
use crate::{CrawlError, Result};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Lifecycle of a crawler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Finished,
}

/// Summary of a finished run
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Wall-clock duration of the run
    pub elapsed: Duration,
    /// Per-worker counters, ordered by worker id
    pub workers: Vec<WorkerReport>,
    /// Counters summed over all workers (the `id` field is unused)
    pub totals: WorkerReport,
    /// Requests still pending after the run
    pub pending_left: u64,
}

impl CrawlReport {
    fn new(elapsed: Duration, mut workers: Vec<WorkerReport>, pending_left: u64) -> Self {
        workers.sort_by_key(|worker| worker.id);

        let totals = workers
            .iter()
            .fold(WorkerReport::default(), |mut totals, worker| {
                totals.total += worker.total;
                totals.succeeded += worker.succeeded;
                totals.failed += worker.failed;
                totals.skipped += worker.skipped;
                totals.gave_up += worker.gave_up;
                totals
            });

        Self {
            elapsed,
            workers,
            totals,
            pending_left,
        }
    }
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Elapsed:        {:.2}s", self.elapsed.as_secs_f64())?;
        writeln!(f, "Workers:        {}", self.workers.len())?;
        writeln!(f, "Rendered:       {}", self.totals.total)?;
        writeln!(f, "  succeeded:    {}", self.totals.succeeded)?;
        writeln!(f, "  failed:       {}", self.totals.failed)?;
        writeln!(f, "Skipped:        {}", self.totals.skipped)?;
        writeln!(f, "Gave up:        {}", self.totals.gave_up)?;
        write!(f, "Pending left:   {}", self.pending_left)
    }
}

/// A configured crawl over one data directory
pub struct Crawler {
    config: Config,
    queue: Arc<RequestQueue>,
    limiter: Arc<RateLimiter>,
    politeness: Arc<dyn PolitenessChecker>,
    browser: Arc<dyn Browser>,
    handler: Arc<dyn PageHandler>,
    state: RunState,
}

impl Crawler {
    /// Creates a crawler
    ///
    /// Validates `config`, opens the queue in its data directory and picks the
    /// politeness checker: a robots.txt cache when `obey-politeness` is set,
    /// otherwise `AllowAll`.
    ///
    /// # Errors
    ///
    /// * `CrawlError::Config` - The configuration is invalid
    /// * `CrawlError::Queue` / `CrawlError::Storage` - The data directory cannot be opened
    pub fn new(
        config: Config,
        browser: Arc<dyn Browser>,
        handler: Arc<dyn PageHandler>,
    ) -> Result<Self> {
        config.validate()?;

        let data_dir = &config.storage.data_dir;
        let queue = RequestQueue::open(data_dir)?;

        let politeness: Arc<dyn PolitenessChecker> = if config.crawler.obey_politeness {
            let client = build_http_client(
                &config.crawler.user_agent,
                config.crawler.navigation_timeout(),
            )?;
            Arc::new(RobotsCache::open(data_dir, client)?)
        } else {
            Arc::new(AllowAll)
        };

        tracing::debug!(
            "Crawler ready: data dir {}, {} pending",
            queue.directory().display(),
            queue.len()?
        );

        Ok(Self {
            limiter: Arc::new(RateLimiter::from_limit(&config.request_limit)),
            queue: Arc::new(queue),
            politeness,
            browser,
            handler,
            config,
            state: RunState::NotStarted,
        })
    }

    /// Replaces the politeness checker
    pub fn with_politeness(mut self, politeness: Arc<dyn PolitenessChecker>) -> Self {
        self.politeness = politeness;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// The request queue, for seeding and inspection
    pub fn queue(&self) -> &Arc<RequestQueue> {
        &self.queue
    }

    /// Enqueues one URL
    ///
    /// Returns false if the URL is already known.
    pub fn add_request(
        &self,
        url: &str,
        label: Option<&str>,
        referer: Option<&str>,
    ) -> Result<bool> {
        let request = CrawlRequest::new(url)
            .with_label(label)
            .with_referer(referer);
        Ok(self.queue.add(request)?)
    }

    /// Enqueues URLs sharing a label and referer
    ///
    /// Returns how many were new. Stops at the first invalid URL; earlier ones
    /// stay queued.
    pub fn add_requests<I, S>(
        &self,
        urls: I,
        label: Option<&str>,
        referer: Option<&str>,
    ) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let requests = urls.into_iter().map(|url| {
            CrawlRequest::new(url)
                .with_label(label)
                .with_referer(referer)
        });
        Ok(self.queue.extend(requests)?)
    }

    /// Enqueues seed entries, each with its own label
    pub fn add_seeds(&self, seeds: &[SeedEntry]) -> Result<usize> {
        let requests = seeds
            .iter()
            .map(|seed| CrawlRequest::new(seed.url.as_str()).with_label(seed.label.as_deref()));
        Ok(self.queue.extend(requests)?)
    }

    /// Runs the crawl until the queue is drained
    ///
    /// A worker exits the first time it finds the pending partition empty,
    /// even while a peer is still rendering a page that may enqueue more.
    /// Only the workers still running pick up requests added by page
    /// handlers, so the configured concurrency is reached only when the queue
    /// holds at least that many requests up front.
    ///
    /// # Errors
    ///
    /// * `CrawlError::InvalidState` - The crawler already ran
    /// * `CrawlError::Render` - The browser could not open a page
    /// * `CrawlError::Worker` - A worker task panicked; the run still finishes
    pub async fn run(&mut self) -> Result<CrawlReport> {
        if self.state != RunState::NotStarted {
            return Err(CrawlError::InvalidState(self.state));
        }

        let concurrency = self.config.crawler.concurrency;
        let mut pages = Vec::with_capacity(concurrency);
        for _ in 0..concurrency {
            pages.push(self.browser.new_page().await?);
        }

        let pending = self.queue.len()?;
        self.state = RunState::Running;
        let start = Instant::now();
        tracing::info!(
            "Starting crawl with {} workers, {} requests pending",
            concurrency,
            pending
        );

        let shared = Arc::new(Shared {
            queue: Arc::clone(&self.queue),
            limiter: Arc::clone(&self.limiter),
            politeness: Arc::clone(&self.politeness),
            handler: Arc::clone(&self.handler),
            retry: RetryPolicy::new(self.config.crawler.max_retries),
            user_agent: self.config.crawler.user_agent.clone(),
        });

        let mut workers = JoinSet::new();
        for (id, page) in pages.into_iter().enumerate() {
            workers.spawn(Worker::new(id, page, Arc::clone(&shared)).run());
        }

        let mut reports = Vec::with_capacity(concurrency);
        let mut failures = Vec::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::error!("Worker task failed: {}", e);
                    failures.push(e.to_string());
                }
            }
        }

        let elapsed = start.elapsed();
        self.state = RunState::Finished;
        workers.abort_all();

        if !failures.is_empty() {
            return Err(CrawlError::Worker(failures.join("; ")));
        }

        let pending_left = self.queue.len()?;
        let report = CrawlReport::new(elapsed, reports, pending_left);
        tracing::info!(
            "Crawl finished in {:.2}s: {} rendered, {} failed, {} skipped",
            elapsed.as_secs_f64(),
            report.totals.succeeded,
            report.totals.failed,
            report.totals.skipped
        );

        Ok(report)
    }
}

impl fmt::Debug for Crawler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crawler")
            .field("queue", &self.queue)
            .field("limiter", &self.limiter)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
