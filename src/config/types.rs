use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default number of concurrent workers
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Default number of retries after the first failed attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default navigations admitted per period
pub const DEFAULT_MAX_REQUESTS: u32 = 30;

/// Default rate-limit period in seconds
pub const DEFAULT_PERIOD_SECONDS: f64 = 1.0;

/// Longest accepted rate-limit period (one year)
pub const MAX_PERIOD_SECONDS: f64 = 365.0 * 24.0 * 60.0 * 60.0;

/// Default per-navigation timeout for the HTTP renderer
pub const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 30;

/// Main configuration structure for Ripple-Frontier
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(rename = "request-limit", default)]
    pub request_limit: RequestLimit,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(rename = "seed", default)]
    pub seeds: Vec<SeedEntry>,
}

impl Config {
    /// Checks every field, returning the first problem found
    pub fn validate(&self) -> Result<(), crate::ConfigError> {
        super::validation::validate(self)
    }
}

/// Worker pool behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of concurrent workers, each with its own renderer page
    pub concurrency: usize,

    /// Retries granted to a request after its first failed attempt
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Whether to consult robots.txt before each navigation
    #[serde(rename = "obey-politeness")]
    pub obey_politeness: bool,

    /// User agent sent with requests and matched against robots.txt
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Timeout applied by the HTTP renderer to each navigation
    #[serde(rename = "navigation-timeout-secs")]
    pub navigation_timeout_secs: u64,
}

impl CrawlerConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
            obey_politeness: false,
            user_agent: format!("ripple-frontier/{}", env!("CARGO_PKG_VERSION")),
            navigation_timeout_secs: DEFAULT_NAVIGATION_TIMEOUT_SECS,
        }
    }
}

/// Aggregate navigation rate shared by all workers
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RequestLimit {
    /// Navigations admitted per period
    #[serde(rename = "max-requests")]
    pub max_requests: u32,

    /// Length of the rate-limit window in seconds
    #[serde(rename = "period-seconds")]
    pub period_seconds: f64,
}

impl RequestLimit {
    pub fn new(max_requests: u32, period_seconds: f64) -> Self {
        Self {
            max_requests,
            period_seconds,
        }
    }

    /// The window as a Duration
    ///
    /// Periods validation would reject are clamped to `MAX_PERIOD_SECONDS`.
    pub fn period(&self) -> Duration {
        let max = Duration::from_secs_f64(MAX_PERIOD_SECONDS);
        Duration::try_from_secs_f64(self.period_seconds)
            .ok()
            .filter(|period| !period.is_zero() && *period <= max)
            .unwrap_or(max)
    }
}

impl Default for RequestLimit {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_PERIOD_SECONDS)
    }
}

/// Where crawl state is persisted
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one store per queue partition plus the robots cache
    #[serde(rename = "data-dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./crawl-data"),
        }
    }
}

/// A URL to seed the queue with
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntry {
    pub url: String,

    #[serde(default)]
    pub label: Option<String>,
}
