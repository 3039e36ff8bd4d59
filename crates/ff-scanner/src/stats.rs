//! Crawl statistics with atomic counters.
//!
//! All counters use relaxed ordering; they exist for progress reporting
//! and the `stats` command, not for synchronization.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic counters shared by every crawl worker.
///
/// # Examples
///
/// ```
/// use ff_scanner::ScanStats;
///
/// let stats = ScanStats::new();
/// stats.add_file(1024);
/// stats.add_dir();
///
/// let snap = stats.snapshot();
/// assert_eq!(snap.files, 1);
/// assert_eq!(snap.dirs, 1);
/// assert_eq!(snap.bytes, 1024);
/// ```
#[derive(Debug, Default)]
pub struct ScanStats {
    files: AtomicU64,
    dirs: AtomicU64,
    bytes: AtomicU64,
    skipped: AtomicU64,
    errors: AtomicU64,
}

impl ScanStats {
    /// Creates zeroed counters.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one indexed file of `size` bytes.
    #[inline]
    pub fn add_file(&self, size: u64) {
        self.files.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(size, Ordering::Relaxed);
    }

    /// Counts one indexed directory.
    #[inline]
    pub fn add_dir(&self) {
        self.dirs.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one entry dropped by the exclusion rules.
    #[inline]
    pub fn add_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one unreadable entry.
    #[inline]
    pub fn add_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Total entries indexed so far (files + directories).
    #[must_use]
    pub fn indexed(&self) -> u64 {
        self.files.load(Ordering::Relaxed) + self.dirs.load(Ordering::Relaxed)
    }

    /// A point-in-time copy of every counter.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            files: self.files.load(Ordering::Relaxed),
            dirs: self.dirs.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    /// Zeroes every counter (for rescans).
    pub fn reset(&self) {
        self.files.store(0, Ordering::Relaxed);
        self.dirs.store(0, Ordering::Relaxed);
        self.bytes.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time view of [`ScanStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Files indexed.
    pub files: u64,
    /// Directories indexed.
    pub dirs: u64,
    /// Bytes of file content indexed.
    pub bytes: u64,
    /// Entries dropped by exclusion rules.
    pub skipped: u64,
    /// Entries that could not be read.
    pub errors: u64,
}
