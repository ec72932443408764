//! Worker loop
//!
//! Each worker owns one renderer page and drains the shared queue until it
//! observes the pending partition empty.

use crate::crawler::limiter::RateLimiter;
use crate::crawler::renderer::{PageContext, PageHandler, Renderer};
use crate::crawler::retry::{RetryDecision, RetryPolicy};
use crate::queue::{CrawlRequest, RequestQueue};
use crate::robots::PolitenessChecker;
use crate::{QueueError, RenderError};
use std::sync::Arc;

/// State every worker of a run shares
pub(crate) struct Shared {
    pub queue: Arc<RequestQueue>,
    pub limiter: Arc<RateLimiter>,
    pub politeness: Arc<dyn PolitenessChecker>,
    pub handler: Arc<dyn PageHandler>,
    pub retry: RetryPolicy,
    pub user_agent: String,
}

/// Counters a worker returns when its loop exits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    /// Worker id, 0-based
    pub id: usize,
    /// Render attempts made
    pub total: u64,
    /// Renders that loaded
    pub succeeded: u64,
    /// Renders that failed (each retry counts)
    pub failed: u64,
    /// Requests denied by the politeness checker
    pub skipped: u64,
    /// Requests moved to the failed partition
    pub gave_up: u64,
}

impl WorkerReport {
    fn new(id: usize) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

pub(crate) struct Worker {
    page: Box<dyn Renderer>,
    shared: Arc<Shared>,
    report: WorkerReport,
}

impl Worker {
    pub fn new(id: usize, page: Box<dyn Renderer>, shared: Arc<Shared>) -> Self {
        Self {
            page,
            shared,
            report: WorkerReport::new(id),
        }
    }

    pub async fn run(mut self) -> WorkerReport {
        let id = self.report.id;
        tracing::debug!("Worker {} started", id);

        loop {
            let request = match self.shared.queue.pop() {
                Ok(request) => request,
                Err(QueueError::Empty) => break,
                Err(e) => {
                    tracing::error!("Worker {} stopping on queue error: {}", id, e);
                    break;
                }
            };

            self.process(request).await;
        }

        tracing::info!(
            "Worker {} finished: {} processed, {} failed, {} skipped",
            id,
            self.report.total,
            self.report.failed,
            self.report.skipped
        );
        self.report
    }

    async fn process(&mut self, request: CrawlRequest) {
        let shared = Arc::clone(&self.shared);
        let id = self.report.id;

        if !shared.politeness.can_fetch(&request.url, &shared.user_agent).await {
            tracing::debug!("Worker {} skipping {} (disallowed by robots.txt)", id, request.url);
            self.report.skipped += 1;
            if let Err(e) = shared.queue.move_to_skipped(&request) {
                tracing::error!("Failed to record skipped {}: {}", request.url, e);
            }
            return;
        }

        shared.limiter.acquire().await;
        self.report.total += 1;

        tracing::debug!("Worker {} rendering {}", id, request.url);
        let html = match self.render(&request).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Worker {} failed to render {}: {}", id, request.url, e);
                self.report.failed += 1;
                match shared.retry.apply(&shared.queue, request) {
                    Ok(RetryDecision::GiveUp(_)) => self.report.gave_up += 1,
                    Ok(RetryDecision::Retry(_)) => {}
                    Err(e) => tracing::error!("Worker {} failed to reschedule: {}", id, e),
                }
                return;
            }
        };
        self.report.succeeded += 1;

        let final_url = self
            .page
            .current_url()
            .unwrap_or(&request.url)
            .to_string();
        let context = PageContext {
            request: &request,
            html: &html,
            url: &final_url,
            queue: &shared.queue,
            worker_id: id,
        };

        if let Err(e) = shared.handler.handle(self.page.as_mut(), &context).await {
            tracing::warn!("Worker {} page handler failed for {}: {:#}", id, request.url, e);
        }

        if let Err(e) = shared.queue.move_to_complete(&request) {
            tracing::error!("Failed to record completed {}: {}", request.url, e);
        }
    }

    async fn render(&mut self, request: &CrawlRequest) -> Result<String, RenderError> {
        self.page
            .navigate(&request.url, request.referer.as_deref())
            .await?;
        self.page.wait_for_load().await?;
        self.page.content().await
    }
}
