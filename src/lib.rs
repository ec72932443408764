//! Ripple-Frontier: a persistent, polite crawl frontier
//!
//! This crate drains a durable request queue with a fixed pool of workers,
//! gating every navigation through a shared rate limiter and an optional
//! robots.txt checker, and retrying failed renders up to a bounded count.

pub mod config;
pub mod crawler;
pub mod queue;
pub mod robots;
pub mod storage;

use thiserror::Error;

/// Main error type for Ripple-Frontier operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crawler cannot run from state {0:?}")]
    InvalidState(crawler::RunState),

    #[error("Worker task failed: {0}")]
    Worker(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Request queue errors
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("URL '{url}' not valid: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request queue is empty")]
    Empty,

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Failed to (de)serialize request record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Request queue lock poisoned")]
    LockPoisoned,
}

/// Failures reported by a renderer while loading a page
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Timed out loading {url}")]
    Timeout { url: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("No page has been loaded yet")]
    NotLoaded,
}

/// Result type alias for Ripple-Frontier operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for queue operations
pub type QueueResult<T> = std::result::Result<T, QueueError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlReport, Crawler, RunState};
pub use queue::{CrawlRequest, RequestQueue};
pub use robots::{AllowAll, PolitenessChecker, RobotsCache};
