//! Persistent request queue
//!
//! The queue keeps four durable partitions:
//! - `requests`: pending work, strict FIFO
//! - `failed`: requests that exhausted their retries
//! - `complete`: requests that rendered and were handled
//! - `skipped`: requests denied by robots.txt
//!
//! A URL lives in at most one partition. An in-memory set of every known URL
//! is rebuilt on open and makes deduplication O(1). All operations run under
//! one mutex so concurrent workers never see a half-applied insert or pop.

mod request;

pub use request::{validate_url, CrawlRequest};

use crate::storage::{open_store, KeyValueStore};
use crate::{QueueError, QueueResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// The durable partitions of a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Pending,
    Failed,
    Complete,
    Skipped,
}

impl Partition {
    /// All partitions, pending first
    pub const ALL: [Partition; 4] = [
        Partition::Pending,
        Partition::Failed,
        Partition::Complete,
        Partition::Skipped,
    ];

    /// Name of the store file backing this partition
    pub fn store_name(&self) -> &'static str {
        match self {
            Self::Pending => "requests",
            Self::Failed => "failed",
            Self::Complete => "complete",
            Self::Skipped => "skipped",
        }
    }

    /// Returns true for partitions a request never leaves
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

struct Partitions {
    pending: Box<dyn KeyValueStore>,
    failed: Box<dyn KeyValueStore>,
    complete: Box<dyn KeyValueStore>,
    skipped: Box<dyn KeyValueStore>,
    urls: HashSet<String>,
}

impl Partitions {
    fn store(&self, partition: Partition) -> &dyn KeyValueStore {
        match partition {
            Partition::Pending => self.pending.as_ref(),
            Partition::Failed => self.failed.as_ref(),
            Partition::Complete => self.complete.as_ref(),
            Partition::Skipped => self.skipped.as_ref(),
        }
    }

    fn store_mut(&mut self, partition: Partition) -> &mut dyn KeyValueStore {
        match partition {
            Partition::Pending => self.pending.as_mut(),
            Partition::Failed => self.failed.as_mut(),
            Partition::Complete => self.complete.as_mut(),
            Partition::Skipped => self.skipped.as_mut(),
        }
    }

    fn add(&mut self, request: &CrawlRequest) -> QueueResult<bool> {
        if self.urls.contains(&request.url) {
            return Ok(false);
        }
        validate_url(&request.url)?;

        let record = serde_json::to_string(request)?;
        self.pending.set(&request.url, &record)?;
        self.urls.insert(request.url.clone());
        Ok(true)
    }

    fn move_to(&mut self, partition: Partition, request: &CrawlRequest) -> QueueResult<()> {
        let record = serde_json::to_string(request)?;
        self.pending.delete(&request.url)?;
        self.store_mut(partition).set(&request.url, &record)?;
        self.urls.insert(request.url.clone());
        Ok(())
    }
}

/// Durable, deduplicated FIFO of crawl requests
///
/// The queue is safe to share between workers behind an `Arc`.
pub struct RequestQueue {
    directory: PathBuf,
    inner: Mutex<Partitions>,
}

impl RequestQueue {
    /// Opens the queue stored in `directory`, creating it if needed
    ///
    /// Whatever was pending when the directory was last used is pending again.
    ///
    /// # Arguments
    ///
    /// * `directory` - Base directory holding one store per partition
    ///
    /// # Returns
    ///
    /// * `Ok(RequestQueue)` - Queue ready for use
    /// * `Err(QueueError)` - A partition could not be opened
    pub fn open(directory: &Path) -> QueueResult<Self> {
        let directory = if directory.is_absolute() {
            directory.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(crate::storage::StorageError::from)?
                .join(directory)
        };

        let pending = open_store(&directory, Partition::Pending.store_name())?;
        let failed = open_store(&directory, Partition::Failed.store_name())?;
        let complete = open_store(&directory, Partition::Complete.store_name())?;
        let skipped = open_store(&directory, Partition::Skipped.store_name())?;

        let queue = Self::with_stores(
            directory,
            Box::new(pending),
            Box::new(failed),
            Box::new(complete),
            Box::new(skipped),
        )?;

        tracing::debug!(
            "Opened request queue at {} with {} pending",
            queue.directory.display(),
            queue.len()?
        );

        Ok(queue)
    }

    /// Builds a queue over caller-supplied stores
    ///
    /// The known-url set is rebuilt from the keys of all four stores.
    pub fn with_stores(
        directory: PathBuf,
        pending: Box<dyn KeyValueStore>,
        failed: Box<dyn KeyValueStore>,
        complete: Box<dyn KeyValueStore>,
        skipped: Box<dyn KeyValueStore>,
    ) -> QueueResult<Self> {
        let mut partitions = Partitions {
            pending,
            failed,
            complete,
            skipped,
            urls: HashSet::new(),
        };

        for partition in Partition::ALL {
            let keys = partitions.store(partition).keys()?;
            partitions.urls.extend(keys);
        }

        Ok(Self {
            directory,
            inner: Mutex::new(partitions),
        })
    }

    /// Base directory of the queue
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn lock(&self) -> QueueResult<MutexGuard<'_, Partitions>> {
        self.inner.lock().map_err(|_| QueueError::LockPoisoned)
    }

    /// Adds a request to the back of the pending partition
    ///
    /// Requests whose URL is already known to any partition are ignored.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The request was inserted
    /// * `Ok(false)` - The URL was already known
    /// * `Err(QueueError::InvalidUrl)` - The URL failed validation; nothing changed
    pub fn add(&self, request: CrawlRequest) -> QueueResult<bool> {
        self.lock()?.add(&request)
    }

    /// Adds every request in order
    ///
    /// The batch is not atomic: on the first invalid URL the error is returned
    /// and requests before it stay inserted.
    ///
    /// # Returns
    ///
    /// The number of requests that were newly inserted
    pub fn extend<I>(&self, requests: I) -> QueueResult<usize>
    where
        I: IntoIterator<Item = CrawlRequest>,
    {
        let mut inner = self.lock()?;
        let mut added = 0;
        for request in requests {
            if inner.add(&request)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Removes and returns the oldest pending request
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlRequest)` - The request now owned by the caller
    /// * `Err(QueueError::Empty)` - Nothing is pending
    pub fn pop(&self) -> QueueResult<CrawlRequest> {
        let mut inner = self.lock()?;
        let (_, record) = inner.pending.pop_first()?.ok_or(QueueError::Empty)?;
        Ok(serde_json::from_str(&record)?)
    }

    /// Puts a known request back at the end of the pending partition
    ///
    /// Unlike `add`, this skips the dedup check; it is how the retry path
    /// returns a request it already popped.
    pub fn requeue(&self, request: &CrawlRequest) -> QueueResult<()> {
        let mut inner = self.lock()?;
        let record = serde_json::to_string(request)?;
        inner.pending.set(&request.url, &record)?;
        inner.urls.insert(request.url.clone());
        Ok(())
    }

    /// Records a request as permanently failed
    pub fn move_to_failed(&self, request: &CrawlRequest) -> QueueResult<()> {
        self.lock()?.move_to(Partition::Failed, request)
    }

    /// Records a request as successfully finished
    pub fn move_to_complete(&self, request: &CrawlRequest) -> QueueResult<()> {
        self.lock()?.move_to(Partition::Complete, request)
    }

    /// Records a request as skipped because robots.txt denied it
    pub fn move_to_skipped(&self, request: &CrawlRequest) -> QueueResult<()> {
        self.lock()?.move_to(Partition::Skipped, request)
    }

    /// Empties every partition and forgets every URL
    pub fn clear(&self) -> QueueResult<()> {
        let mut inner = self.lock()?;
        for partition in Partition::ALL {
            inner.store_mut(partition).clear()?;
        }
        inner.urls.clear();
        Ok(())
    }

    /// Number of pending requests
    pub fn len(&self) -> QueueResult<u64> {
        self.partition_len(Partition::Pending)
    }

    /// Returns true when nothing is pending
    pub fn is_empty(&self) -> QueueResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Number of entries in `partition`
    pub fn partition_len(&self, partition: Partition) -> QueueResult<u64> {
        Ok(self.lock()?.store(partition).len()?)
    }

    pub fn failed_len(&self) -> QueueResult<u64> {
        self.partition_len(Partition::Failed)
    }

    pub fn complete_len(&self) -> QueueResult<u64> {
        self.partition_len(Partition::Complete)
    }

    pub fn skipped_len(&self) -> QueueResult<u64> {
        self.partition_len(Partition::Skipped)
    }

    /// Returns true if `url` is known to any partition
    pub fn contains(&self, url: &str) -> QueueResult<bool> {
        Ok(self.lock()?.urls.contains(url))
    }

    /// Returns true if `url` is stored in `partition`
    pub fn partition_contains(&self, partition: Partition, url: &str) -> QueueResult<bool> {
        Ok(self.lock()?.store(partition).contains(url)?)
    }

    /// Pending URLs in the order they will be popped
    pub fn pending_urls(&self) -> QueueResult<Vec<String>> {
        Ok(self.lock()?.pending.keys()?)
    }

    /// Every request stored in `partition`, oldest first
    pub fn requests_in(&self, partition: Partition) -> QueueResult<Vec<CrawlRequest>> {
        let inner = self.lock()?;
        inner
            .store(partition)
            .entries()?
            .into_iter()
            .map(|(_, record)| serde_json::from_str(&record).map_err(QueueError::from))
            .collect()
    }

    /// Every request that exhausted its retries
    pub fn failed_requests(&self) -> QueueResult<Vec<CrawlRequest>> {
        self.requests_in(Partition::Failed)
    }
}

impl std::fmt::Debug for RequestQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestQueue")
            .field("directory", &self.directory)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, RequestQueue) {
        let dir = tempfile::tempdir().unwrap();
        let queue = RequestQueue::open(dir.path()).unwrap();
        (dir, queue)
    }

    #[test]
    fn test_new_queue_is_empty() {
        let (_dir, queue) = open_temp();
        assert!(queue.is_empty().unwrap());
        assert!(matches!(queue.pop(), Err(QueueError::Empty)));
    }

    #[test]
    fn test_add_is_idempotent() {
        let (_dir, queue) = open_temp();

        assert!(queue
            .add(CrawlRequest::new("https://example.com/").with_label(Some("a")))
            .unwrap());
        assert!(!queue
            .add(CrawlRequest::new("https://example.com/").with_label(Some("b")))
            .unwrap());

        assert_eq!(queue.len().unwrap(), 1);
        assert_eq!(queue.pop().unwrap().label.as_deref(), Some("a"));
    }

    #[test]
    fn test_add_invalid_url_leaves_queue_unchanged() {
        let (_dir, queue) = open_temp();
        queue.add(CrawlRequest::new("https://example.com/")).unwrap();

        let result = queue.add(CrawlRequest::new("not-a-url"));

        assert!(matches!(result, Err(QueueError::InvalidUrl { .. })));
        assert_eq!(queue.len().unwrap(), 1);
        assert!(!queue.contains("not-a-url").unwrap());
    }

    #[test]
    fn test_pop_is_fifo() {
        let (_dir, queue) = open_temp();
        queue.add(CrawlRequest::new("https://example.com/a")).unwrap();
        queue.add(CrawlRequest::new("https://example.com/b")).unwrap();

        assert_eq!(queue.pop().unwrap().url, "https://example.com/a");
        assert_eq!(queue.pop().unwrap().url, "https://example.com/b");
        assert!(matches!(queue.pop(), Err(QueueError::Empty)));
    }

    #[test]
    fn test_popped_url_stays_known() {
        let (_dir, queue) = open_temp();
        queue.add(CrawlRequest::new("https://example.com/a")).unwrap();
        queue.pop().unwrap();

        assert!(!queue.add(CrawlRequest::new("https://example.com/a")).unwrap());
        assert!(queue.is_empty().unwrap());
    }

    #[test]
    fn test_extend_counts_new_requests_and_stops_on_invalid() {
        let (_dir, queue) = open_temp();
        queue.add(CrawlRequest::new("https://example.com/a")).unwrap();

        let added = queue
            .extend(vec![
                CrawlRequest::new("https://example.com/a"),
                CrawlRequest::new("https://example.com/b"),
                CrawlRequest::new("https://example.com/c"),
            ])
            .unwrap();
        assert_eq!(added, 2);

        let result = queue.extend(vec![
            CrawlRequest::new("https://example.com/d"),
            CrawlRequest::new("bogus"),
            CrawlRequest::new("https://example.com/e"),
        ]);
        assert!(result.is_err());
        assert_eq!(
            queue.pending_urls().unwrap(),
            vec![
                "https://example.com/a",
                "https://example.com/b",
                "https://example.com/c",
                "https://example.com/d",
            ]
        );
    }

    #[test]
    fn test_requeue_bypasses_dedup_and_goes_to_back() {
        let (_dir, queue) = open_temp();
        queue.add(CrawlRequest::new("https://example.com/a")).unwrap();
        queue.add(CrawlRequest::new("https://example.com/b")).unwrap();

        let mut first = queue.pop().unwrap();
        first.retries += 1;
        queue.requeue(&first).unwrap();

        assert_eq!(queue.pop().unwrap().url, "https://example.com/b");
        let again = queue.pop().unwrap();
        assert_eq!(again.url, "https://example.com/a");
        assert_eq!(again.retries, 1);
    }

    #[test]
    fn test_move_to_failed_is_terminal() {
        let (_dir, queue) = open_temp();
        queue.add(CrawlRequest::new("https://example.com/a")).unwrap();
        let request = queue.pop().unwrap();

        queue.move_to_failed(&request).unwrap();

        assert_eq!(queue.failed_len().unwrap(), 1);
        assert!(queue.is_empty().unwrap());
        assert!(!queue.add(request.clone()).unwrap());
        assert!(queue.is_empty().unwrap());
    }

    #[test]
    fn test_move_removes_from_pending() {
        let (_dir, queue) = open_temp();
        let request = CrawlRequest::new("https://example.com/a");
        queue.add(request.clone()).unwrap();

        queue.move_to_complete(&request).unwrap();

        assert!(queue.is_empty().unwrap());
        assert!(queue
            .partition_contains(Partition::Complete, &request.url)
            .unwrap());
        assert!(!queue
            .partition_contains(Partition::Pending, &request.url)
            .unwrap());
    }

    #[test]
    fn test_move_to_skipped() {
        let (_dir, queue) = open_temp();
        let request = CrawlRequest::new("https://example.com/private");
        queue.add(request.clone()).unwrap();
        let popped = queue.pop().unwrap();

        queue.move_to_skipped(&popped).unwrap();

        assert_eq!(queue.skipped_len().unwrap(), 1);
        assert_eq!(queue.requests_in(Partition::Skipped).unwrap(), vec![request]);
    }

    #[test]
    fn test_clear_forgets_everything() {
        let (_dir, queue) = open_temp();
        queue.add(CrawlRequest::new("https://example.com/a")).unwrap();
        queue.add(CrawlRequest::new("https://example.com/b")).unwrap();
        let failed = queue.pop().unwrap();
        queue.move_to_failed(&failed).unwrap();

        queue.clear().unwrap();

        for partition in Partition::ALL {
            assert_eq!(queue.partition_len(partition).unwrap(), 0);
        }
        assert!(!queue.contains(&failed.url).unwrap());
        assert!(queue.add(failed).unwrap());
        assert_eq!(queue.len().unwrap(), 1);
    }

    #[test]
    fn test_reopen_resumes_pending_and_dedups_terminal() {
        let dir = tempfile::tempdir().unwrap();

        {
            let queue = RequestQueue::open(dir.path()).unwrap();
            queue.add(CrawlRequest::new("https://example.com/a")).unwrap();
            queue.add(CrawlRequest::new("https://example.com/b")).unwrap();
            queue.add(CrawlRequest::new("https://example.com/c")).unwrap();
            let done = queue.pop().unwrap();
            queue.move_to_complete(&done).unwrap();
        }

        let queue = RequestQueue::open(dir.path()).unwrap();
        assert_eq!(
            queue.pending_urls().unwrap(),
            vec!["https://example.com/b", "https://example.com/c"]
        );
        assert!(!queue.add(CrawlRequest::new("https://example.com/a")).unwrap());
        assert_eq!(queue.len().unwrap(), 2);
    }

    #[test]
    fn test_concurrent_add_and_pop_deliver_each_url_once() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;
        use std::thread;

        let (_dir, queue) = open_temp();
        let queue = Arc::new(queue);
        let adding = Arc::new(AtomicBool::new(true));
        let url = |n: usize| format!("https://example.com/page-{}", n);

        // Every adder offers the same 50 URLs, starting at a different point.
        let adders: Vec<_> = (0..4)
            .map(|offset| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    let mut added = 0;
                    for i in 0..50 {
                        let n = (i + offset * 13) % 50;
                        if queue.add(CrawlRequest::new(url(n))).unwrap() {
                            added += 1;
                        }
                    }
                    added
                })
            })
            .collect();

        let poppers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let adding = Arc::clone(&adding);
                thread::spawn(move || {
                    let mut popped = Vec::new();
                    loop {
                        let finished = !adding.load(Ordering::SeqCst);
                        match queue.pop() {
                            Ok(request) => popped.push(request.url),
                            Err(QueueError::Empty) if finished => break,
                            Err(QueueError::Empty) => thread::yield_now(),
                            Err(e) => panic!("pop failed: {}", e),
                        }
                    }
                    popped
                })
            })
            .collect();

        let added: usize = adders.into_iter().map(|h| h.join().unwrap()).sum();
        adding.store(false, Ordering::SeqCst);
        let popped: Vec<String> = poppers
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();

        assert_eq!(added, 50);
        assert_eq!(popped.len(), 50);
        let unique: HashSet<&String> = popped.iter().collect();
        assert_eq!(unique.len(), 50);
        assert!(queue.is_empty().unwrap());
    }

    #[test]
    fn test_partition_store_names() {
        let names: Vec<_> = Partition::ALL.iter().map(|p| p.store_name()).collect();
        assert_eq!(names, vec!["requests", "failed", "complete", "skipped"]);
        assert!(!Partition::Pending.is_terminal());
        assert!(Partition::Failed.is_terminal());
    }
}
