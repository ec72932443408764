//! Storage module for persisting crawl state
//!
//! This module provides the durable key-value stores that back every queue
//! partition and the robots.txt cache. Each store is a separate SQLite file so
//! partitions survive restarts independently.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{KeyValueStore, StorageError, StorageResult};

use std::path::{Path, PathBuf};

/// File extension used for every store in a data directory
pub const STORE_EXTENSION: &str = "sqlite3";

/// Returns the path of the named store inside `data_dir`
///
/// # Example
///
/// ```
/// use ripple_frontier::storage::store_path;
/// use std::path::Path;
///
/// let path = store_path(Path::new("/var/crawl"), "failed");
/// assert_eq!(path, Path::new("/var/crawl/failed.sqlite3"));
/// ```
pub fn store_path(data_dir: &Path, name: &str) -> PathBuf {
    data_dir.join(format!("{}.{}", name, STORE_EXTENSION))
}

/// Opens the named store inside `data_dir`
pub fn open_store(data_dir: &Path, name: &str) -> StorageResult<SqliteStore> {
    SqliteStore::open(&store_path(data_dir, name))
}
