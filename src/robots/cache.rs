//! Robots.txt caching implementation
//!
//! Rules are cached per origin, first in memory and then in a durable store,
//! and are never refreshed once cached.

use crate::robots::{origin_of, robots_txt_url, ParsedRobots, PolitenessChecker};
use crate::storage::{open_store, KeyValueStore, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, RwLock};

/// Name of the store holding cached robots.txt documents
pub const ROBOTS_STORE: &str = "robots";

/// Cached robots.txt data for an origin
///
/// This is the record persisted in the robots store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedRobots {
    /// The raw robots.txt content
    pub content: String,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    /// Creates a new CachedRobots stamped with the current time
    pub fn new(content: String) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
        }
    }

    pub fn parsed(&self) -> ParsedRobots {
        ParsedRobots::from_content(&self.content)
    }
}

/// What a robots.txt fetch produced
#[derive(Debug)]
enum FetchOutcome {
    /// Rules to cache and apply
    Rules(String),
    /// Nothing usable; allow this request and try again next time
    Unavailable,
}

/// Politeness checker backed by a per-origin robots.txt cache
pub struct RobotsCache {
    client: Client,
    store: Mutex<Box<dyn KeyValueStore>>,
    parsed: RwLock<HashMap<String, ParsedRobots>>,
}

impl RobotsCache {
    /// Opens the cache stored in `data_dir`
    pub fn open(data_dir: &Path, client: Client) -> StorageResult<Self> {
        let store = open_store(data_dir, ROBOTS_STORE)?;
        Ok(Self::with_store(Box::new(store), client))
    }

    /// Builds a cache over a caller-supplied store
    pub fn with_store(store: Box<dyn KeyValueStore>, client: Client) -> Self {
        Self {
            client,
            store: Mutex::new(store),
            parsed: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached rules for `origin`, if any
    ///
    /// Rules found only in the durable store are parsed once and memoized.
    pub fn cached(&self, origin: &str) -> Option<ParsedRobots> {
        if let Ok(parsed) = self.parsed.read() {
            if let Some(robots) = parsed.get(origin) {
                return Some(robots.clone());
            }
        }

        let record = {
            let store = self.store.lock().ok()?;
            match store.get(origin) {
                Ok(record) => record?,
                Err(e) => {
                    tracing::warn!("Failed to read robots cache for {}: {}", origin, e);
                    return None;
                }
            }
        };

        let cached: CachedRobots = match serde_json::from_str(&record) {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!("Discarding unreadable robots cache entry for {}: {}", origin, e);
                return None;
            }
        };

        let robots = cached.parsed();
        self.memoize(origin, robots.clone());
        Some(robots)
    }

    fn memoize(&self, origin: &str, robots: ParsedRobots) {
        if let Ok(mut parsed) = self.parsed.write() {
            parsed.insert(origin.to_string(), robots);
        }
    }

    /// Stores `content` as the rules for `origin`
    pub fn insert(&self, origin: &str, content: String) -> ParsedRobots {
        let cached = CachedRobots::new(content);
        let robots = cached.parsed();

        match serde_json::to_string(&cached) {
            Ok(record) => {
                if let Ok(mut store) = self.store.lock() {
                    if let Err(e) = store.set(origin, &record) {
                        tracing::warn!("Failed to persist robots.txt for {}: {}", origin, e);
                    }
                }
            }
            Err(e) => tracing::warn!("Failed to encode robots.txt for {}: {}", origin, e),
        }

        self.memoize(origin, robots.clone());
        robots
    }

    /// Fetches robots.txt from `robots_url`
    ///
    /// | Response | Outcome |
    /// |----------|---------|
    /// | 2xx | body is cached |
    /// | 4xx | empty rules are cached (allow all) |
    /// | 5xx, transport error | nothing cached |
    async fn fetch(&self, robots_url: &str) -> FetchOutcome {
        let response = match self.client.get(robots_url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", robots_url, e);
                return FetchOutcome::Unavailable;
            }
        };

        let status = response.status();
        if status.is_success() {
            match response.text().await {
                Ok(body) => FetchOutcome::Rules(body),
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", robots_url, e);
                    FetchOutcome::Unavailable
                }
            }
        } else if status.is_client_error() {
            tracing::debug!("{} answered {}, treating as allow all", robots_url, status);
            FetchOutcome::Rules(String::new())
        } else {
            tracing::warn!("{} answered {}, not caching", robots_url, status);
            FetchOutcome::Unavailable
        }
    }

    /// Number of origins whose rules are memoized in this process
    pub fn memoized_len(&self) -> usize {
        self.parsed.read().map(|parsed| parsed.len()).unwrap_or(0)
    }
}

#[async_trait]
impl PolitenessChecker for RobotsCache {
    async fn can_fetch(&self, url: &str, user_agent: &str) -> bool {
        let (Some(origin), Some(robots_url)) = (origin_of(url), robots_txt_url(url)) else {
            return true;
        };

        if let Some(robots) = self.cached(&origin) {
            tracing::debug!("Using cached robots.txt for {}", origin);
            return robots.is_allowed(url, user_agent);
        }

        tracing::debug!("Fetching {}", robots_url);
        match self.fetch(&robots_url).await {
            FetchOutcome::Rules(content) => {
                self.insert(&origin, content).is_allowed(url, user_agent)
            }
            FetchOutcome::Unavailable => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;

    fn cache() -> RobotsCache {
        let store = SqliteStore::open_in_memory().unwrap();
        RobotsCache::with_store(Box::new(store), Client::new())
    }

    #[test]
    fn test_empty_cache_misses() {
        let cache = cache();
        assert!(cache.cached("https://example.com").is_none());
        assert_eq!(cache.memoized_len(), 0);
    }

    #[test]
    fn test_insert_then_cached() {
        let cache = cache();
        cache.insert("https://example.com", "User-agent: *\nDisallow: /admin".to_string());

        let robots = cache.cached("https://example.com").unwrap();
        assert!(!robots.is_allowed("https://example.com/admin", "TestBot"));
        assert!(robots.is_allowed("https://example.com/", "TestBot"));
    }

    #[tokio::test]
    async fn test_cached_rules_answer_without_fetching() {
        let cache = cache();
        cache.insert("https://example.com", "User-agent: *\nDisallow: /".to_string());

        // A cache hit never touches the network.
        assert!(!cache.can_fetch("https://example.com/page", "TestBot").await);
    }

    #[tokio::test]
    async fn test_lookup_and_write_share_the_origin_key() {
        let cache = cache();
        cache.insert("https://example.com", "User-agent: *\nDisallow: /private".to_string());

        assert!(!cache.can_fetch("https://example.com/private/a", "TestBot").await);
        assert!(cache.can_fetch("https://example.com/public/b?x=1", "TestBot").await);
        assert_eq!(cache.memoized_len(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_url_is_allowed() {
        let cache = cache();
        assert!(cache.can_fetch("not a url", "TestBot").await);
    }

    #[test]
    fn test_entry_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let cache = RobotsCache::open(dir.path(), Client::new()).unwrap();
            cache.insert("https://example.com", "User-agent: *\nDisallow: /".to_string());
        }

        let cache = RobotsCache::open(dir.path(), Client::new()).unwrap();
        assert_eq!(cache.memoized_len(), 0);
        let robots = cache.cached("https://example.com").unwrap();
        assert!(!robots.is_allowed("https://example.com/x", "TestBot"));
        assert_eq!(cache.memoized_len(), 1);
    }
}
