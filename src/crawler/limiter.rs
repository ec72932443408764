//! Shared navigation rate limiter
//!
//! Every worker acquires a permit here before navigating, so aggregate
//! throughput never exceeds `max_requests` per `period` no matter how many
//! workers run.

use crate::config::RequestLimit;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Sliding-window rate limiter
///
/// Remembers when each of the last `max_requests` permits was granted. A new
/// permit is granted once the oldest of those is at least `period` old.
/// Waiters queue on a fair mutex, so permits are handed out in arrival order.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    period: Duration,
    granted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter admitting `max_requests` per `period`
    ///
    /// A `max_requests` of zero is treated as one.
    pub fn new(max_requests: u32, period: Duration) -> Self {
        let max_requests = max_requests.max(1) as usize;
        Self {
            max_requests,
            period,
            granted: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    /// Creates a limiter from a validated request limit
    pub fn from_limit(limit: &RequestLimit) -> Self {
        Self::new(limit.max_requests, limit.period())
    }

    /// Waits until a permit is available and takes it
    pub async fn acquire(&self) {
        let mut granted = self.granted.lock().await;

        loop {
            let now = Instant::now();
            self.expire(&mut granted, now);

            if granted.len() < self.max_requests {
                granted.push_back(now);
                return;
            }

            if let Some(&oldest) = granted.front() {
                tokio::time::sleep_until(oldest + self.period).await;
            }
        }
    }

    fn expire(&self, granted: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = granted.front() {
            if now.duration_since(oldest) >= self.period {
                granted.pop_front();
            } else {
                break;
            }
        }
    }
}
