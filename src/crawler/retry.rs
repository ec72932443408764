//! Bounded retry policy
//!
//! A request's `retries` count moves from 0 up to `max_retries`. A failure at
//! `max_retries` is terminal; any earlier failure sends the request to the
//! back of the pending partition with its count bumped.

use crate::queue::{CrawlRequest, RequestQueue};
use crate::QueueResult;

/// What happened to a failed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Requeued with the incremented retry count
    Retry(CrawlRequest),
    /// Out of retries; belongs in the failed partition
    GiveUp(CrawlRequest),
}

/// Per-run retry budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Decides the next state of a request whose render just failed
    ///
    /// A count above `max_retries` (left by an earlier run with a larger
    /// budget) also gives up.
    pub fn decide(&self, mut request: CrawlRequest) -> RetryDecision {
        if request.retries >= self.max_retries {
            RetryDecision::GiveUp(request)
        } else {
            request.retries += 1;
            RetryDecision::Retry(request)
        }
    }

    /// Decides and applies the outcome to `queue`
    pub fn apply(&self, queue: &RequestQueue, request: CrawlRequest) -> QueueResult<RetryDecision> {
        let decision = self.decide(request);

        match &decision {
            RetryDecision::Retry(request) => {
                tracing::debug!(
                    "Requeueing {} (retry {}/{})",
                    request.url,
                    request.retries,
                    self.max_retries
                );
                queue.requeue(request)?;
            }
            RetryDecision::GiveUp(request) => {
                tracing::warn!("Max retries reached for {}", request.url);
                queue.move_to_failed(request)?;
            }
        }

        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_failure_retries() {
        let policy = RetryPolicy::new(2);
        let decision = policy.decide(CrawlRequest::new("https://example.com/"));

        match decision {
            RetryDecision::Retry(request) => assert_eq!(request.retries, 1),
            other => panic!("expected retry, got {:?}", other),
        }
    }

    #[test]
    fn test_gives_up_at_max() {
        let policy = RetryPolicy::new(2);
        let mut request = CrawlRequest::new("https://example.com/");
        request.retries = 2;

        assert_eq!(policy.decide(request.clone()), RetryDecision::GiveUp(request));
    }

    #[test]
    fn test_zero_retries_gives_up_immediately() {
        let policy = RetryPolicy::new(0);
        let request = CrawlRequest::new("https://example.com/");
        assert!(matches!(policy.decide(request), RetryDecision::GiveUp(_)));
    }

    #[test]
    fn test_count_above_budget_gives_up() {
        let policy = RetryPolicy::new(1);
        let mut request = CrawlRequest::new("https://example.com/");
        request.retries = 5;
        assert!(matches!(policy.decide(request), RetryDecision::GiveUp(_)));
    }

    #[test]
    fn test_apply_walks_to_failed_partition() {
        let dir = tempfile::tempdir().unwrap();
        let queue = RequestQueue::open(dir.path()).unwrap();
        let policy = RetryPolicy::new(2);
        queue.add(CrawlRequest::new("https://example.com/")).unwrap();

        let mut attempts = 0;
        loop {
            let request = queue.pop().unwrap();
            attempts += 1;
            if let RetryDecision::GiveUp(_) = policy.apply(&queue, request).unwrap() {
                break;
            }
        }

        assert_eq!(attempts, 3);
        assert!(queue.is_empty().unwrap());
        let failed = queue.failed_requests().unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].retries, 2);
        assert_eq!(queue.complete_len().unwrap(), 0);
    }
}
