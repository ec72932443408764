//! Configuration module for Ripple-Frontier
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Every option has a default, so an empty file is a valid config.
//!
//! # Example
//!
//! ```no_run
//! use ripple_frontier::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawler will run {} workers", config.crawler.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, RequestLimit, SeedEntry, StorageConfig, DEFAULT_CONCURRENCY,
    DEFAULT_MAX_REQUESTS, DEFAULT_MAX_RETRIES, DEFAULT_NAVIGATION_TIMEOUT_SECS,
    DEFAULT_PERIOD_SECONDS, MAX_PERIOD_SECONDS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
