//! Storage traits and error types
//!
//! This module defines the trait interface for durable key-value backends and
//! associated error types.

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A durable string-keyed mapping that remembers insertion order
///
/// Every partition of the request queue and the robots.txt cache is one of
/// these. Overwriting an existing key keeps its original position; deleting
/// and re-setting a key moves it to the back.
pub trait KeyValueStore: Send {
    /// Gets the value stored under `key`
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Inserts or replaces the value stored under `key`
    fn set(&mut self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key`, returning whether it was present
    fn delete(&mut self, key: &str) -> StorageResult<bool>;

    /// Returns true if `key` is present
    fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Lists every key, oldest insertion first
    fn keys(&self) -> StorageResult<Vec<String>>;

    /// Lists every entry, oldest insertion first
    fn entries(&self) -> StorageResult<Vec<(String, String)>>;

    /// Removes and returns the oldest entry
    fn pop_first(&mut self) -> StorageResult<Option<(String, String)>>;

    /// Number of stored entries
    fn len(&self) -> StorageResult<u64>;

    /// Returns true if nothing is stored
    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Removes every entry
    fn clear(&mut self) -> StorageResult<()>;
}
