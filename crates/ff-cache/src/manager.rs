//! The composed cache layer: files, search results, directory children.
//!
//! [`CacheManager`] owns three [`LruCache`]s behind independent mutexes:
//!
//! - **file cache** - `FileId` → `FileRecord`, count-bounded
//! - **result cache** - query fingerprint → cached results, TTL- and
//!   epoch-expired
//! - **children cache** - directory path → child record list
//!
//! A single entry budget is split across the three; the default split is
//! 50/30/20 by entry count. Cached result sets remember the index epoch
//! they were computed at, so any index mutation invalidates them without a
//! broadcast.

use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use ff_core::{FileId, FileRecord, SearchResults};

use crate::lru::{CacheStats, LruCache};

/// Fraction of the entry budget given to the file cache.
const FILE_SHARE: f64 = 0.5;
/// Fraction of the entry budget given to the result cache.
const RESULT_SHARE: f64 = 0.3;
/// Rough bytes per cached entry, for converting a megabyte budget.
const APPROX_ENTRY_BYTES: usize = 512;

/// A result set plus the context needed to judge its freshness.
#[derive(Debug, Clone)]
struct CachedResults {
    results: SearchResults,
    epoch: u64,
    created: Instant,
}

/// Statistics across the three caches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerStats {
    /// File cache counters.
    pub files: CacheStats,
    /// Result cache counters (TTL/epoch expiries count as misses).
    pub results: CacheStats,
    /// Children cache counters.
    pub children: CacheStats,
    /// Entries currently held across all three caches.
    pub entries: usize,
}

/// The composed cache layer.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use ff_cache::CacheManager;
/// use ff_core::SearchResults;
///
/// let cache = CacheManager::new(1000, Duration::from_secs(60));
/// cache.put_results("report|fuzzy|0", SearchResults::new("report"), 7);
///
/// // Same epoch: hit.
/// assert!(cache.get_results("report|fuzzy|0", 7).is_some());
/// // Index mutated since: miss, entry dropped.
/// assert!(cache.get_results("report|fuzzy|0", 8).is_none());
/// ```
#[derive(Debug)]
pub struct CacheManager {
    files: Mutex<LruCache<FileId, FileRecord>>,
    results: Mutex<LruCache<String, CachedResults>>,
    children: Mutex<LruCache<Utf8PathBuf, Vec<FileRecord>>>,
    result_ttl: Duration,
}

impl CacheManager {
    /// Creates a manager with `total_entries` split 50/30/20 across the
    /// file, result, and children caches.
    #[must_use]
    pub fn new(total_entries: usize, result_ttl: Duration) -> Self {
        let total = total_entries.max(3);
        let file_cap = ((total as f64 * FILE_SHARE) as usize).max(1);
        let result_cap = ((total as f64 * RESULT_SHARE) as usize).max(1);
        let children_cap = (total - file_cap - result_cap).max(1);

        Self {
            files: Mutex::new(LruCache::new(file_cap)),
            results: Mutex::new(LruCache::new(result_cap)),
            children: Mutex::new(LruCache::new(children_cap)),
            result_ttl,
        }
    }

    /// Creates a manager from a megabyte budget, using a rough per-entry
    /// size to derive the entry count.
    #[must_use]
    pub fn with_budget_mb(megabytes: usize, result_ttl: Duration) -> Self {
        let entries = megabytes.saturating_mul(1024 * 1024) / APPROX_ENTRY_BYTES;
        Self::new(entries, result_ttl)
    }

    // ----- file cache ------------------------------------------------------

    /// Caches a record under its id.
    pub fn put_file(&self, record: FileRecord) {
        self.files.lock().put(record.id, record);
    }

    /// Looks up a record by id.
    #[must_use]
    pub fn get_file(&self, id: FileId) -> Option<FileRecord> {
        self.files.lock().get(&id)
    }

    /// Drops a record (call on delete/rename events).
    pub fn remove_file(&self, id: FileId) {
        self.files.lock().remove(&id);
    }

    // ----- result cache ----------------------------------------------------

    /// Caches a result set under a query fingerprint, tagged with the index
    /// epoch it was computed at.
    pub fn put_results(&self, fingerprint: impl Into<String>, results: SearchResults, epoch: u64) {
        self.results.lock().put(
            fingerprint.into(),
            CachedResults {
                results,
                epoch,
                created: Instant::now(),
            },
        );
    }

    /// Looks up a cached result set.
    ///
    /// Entries older than the TTL or computed at a different index epoch
    /// count as misses and are removed on the spot.
    #[must_use]
    pub fn get_results(&self, fingerprint: &str, current_epoch: u64) -> Option<SearchResults> {
        let mut cache = self.results.lock();
        let key = fingerprint.to_owned();
        let entry = cache.get(&key)?;
        if entry.epoch != current_epoch || entry.created.elapsed() > self.result_ttl {
            cache.remove(&key);
            return None;
        }
        Some(entry.results)
    }

    /// Drops every cached result set.
    pub fn clear_results(&self) {
        self.results.lock().clear();
    }

    /// Sweeps TTL-expired result entries; returns how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let ttl = self.result_ttl;
        self.results
            .lock()
            .retain(|_, entry| entry.created.elapsed() <= ttl)
    }

    // ----- children cache --------------------------------------------------

    /// Caches a directory's child records.
    pub fn put_children(&self, path: Utf8PathBuf, children: Vec<FileRecord>) {
        self.children.lock().put(path, children);
    }

    /// Looks up a directory's cached children.
    #[must_use]
    pub fn get_children(&self, path: &Utf8Path) -> Option<Vec<FileRecord>> {
        self.children.lock().get(&path.to_owned())
    }

    /// Drops one directory's cached children.
    pub fn remove_children(&self, path: &Utf8Path) {
        self.children.lock().remove(&path.to_owned());
    }

    // ----- management ------------------------------------------------------

    /// Drops everything from all three caches.
    pub fn clear(&self) {
        self.files.lock().clear();
        self.results.lock().clear();
        self.children.lock().clear();
    }

    /// Combined statistics snapshot.
    #[must_use]
    pub fn statistics(&self) -> ManagerStats {
        let files = self.files.lock();
        let results = self.results.lock();
        let children = self.children.lock();
        ManagerStats {
            files: files.stats(),
            results: results.stats(),
            children: children.stats(),
            entries: files.len() + results.len() + children.len(),
        }
    }

    /// Rough bytes held, from entry counts and the per-entry estimate.
    #[must_use]
    pub fn estimated_memory_usage(&self) -> usize {
        self.statistics().entries * APPROX_ENTRY_BYTES
    }

    /// The configured result TTL.
    #[must_use]
    pub const fn result_ttl(&self) -> Duration {
        self.result_ttl
    }
}
