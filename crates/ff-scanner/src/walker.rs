//! Per-root directory traversal with exclusion rules.
//!
//! [`RootWalker`] wraps the `ignore` crate's walker for one crawl root.
//! Each crawl worker owns one walker and runs it single-threaded;
//! parallelism in the crawler comes from one worker per root, not from
//! parallel walking within a root.
//!
//! The skip rules, in order:
//!
//! - `.` and `..` never surface (the walker never yields them)
//! - directories whose leaf name is a well-known system root are pruned
//! - hidden/system entries are pruned unless configured in
//! - user-configured exclude prefixes prune whole subtrees
//! - files with excluded extensions are dropped individually
//!
//! Non-UTF-8 paths are counted as errors and skipped; a single unreadable
//! entry never aborts the root.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;
use tracing::{trace, warn};

use ff_core::{FileRecord, FxHashSet, IndexingConfig};

use crate::error::ScanError;
use crate::stats::ScanStats;

/// Directory leaf names never descended into, regardless of configuration.
///
/// These are operating-system roots whose contents are either enormous,
/// immutable, or both.
pub const SYSTEM_ROOT_DIRECTORIES: &[&str] = &[
    "Windows",
    "Program Files",
    "Program Files (x86)",
    "ProgramData",
    "System Volume Information",
    "$Recycle.Bin",
];

/// The per-entry exclusion policy, shared by the crawler and the watcher.
#[derive(Debug, Clone, Default)]
pub struct ScanFilter {
    /// Index entries with the hidden attribute.
    pub index_hidden: bool,
    /// Index entries with the system attribute.
    pub index_system: bool,
    /// Subtree prefixes to prune.
    pub exclude_paths: Vec<Utf8PathBuf>,
    /// Extensions to drop (lowercase, no dot).
    pub exclude_extensions: FxHashSet<String>,
}

impl ScanFilter {
    /// Builds the filter from the indexing configuration.
    #[must_use]
    pub fn from_config(config: &IndexingConfig) -> Self {
        Self {
            index_hidden: config.index_hidden_files,
            index_system: config.index_system_files,
            exclude_paths: config.exclude_paths.clone(),
            exclude_extensions: config
                .exclude_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// Returns `true` when a directory must not be descended into.
    #[must_use]
    pub fn should_skip_directory(&self, path: &Utf8Path, hidden: bool) -> bool {
        let name = path.file_name().unwrap_or_default();
        if SYSTEM_ROOT_DIRECTORIES.contains(&name) {
            return true;
        }
        if hidden && !self.index_hidden {
            return true;
        }
        self.is_path_excluded(path)
    }

    /// Returns `true` when a file must not be indexed.
    #[must_use]
    pub fn should_skip_file(&self, path: &Utf8Path, hidden: bool) -> bool {
        if hidden && !self.index_hidden {
            return true;
        }
        if let Some(ext) = path.extension() {
            if self.exclude_extensions.contains(&ext.to_lowercase()) {
                return true;
            }
        }
        self.is_path_excluded(path)
    }

    /// Returns `true` when `path` falls under an excluded prefix.
    #[must_use]
    pub fn is_path_excluded(&self, path: &Utf8Path) -> bool {
        self.exclude_paths
            .iter()
            .any(|prefix| path.starts_with(prefix))
    }
}

/// A single-root walker producing [`FileRecord`]s.
pub struct RootWalker {
    root: Utf8PathBuf,
    filter: ScanFilter,
}

impl RootWalker {
    /// Creates a walker for `root`.
    ///
    /// # Errors
    ///
    /// [`ScanError::RootNotFound`] when the root is missing or not a
    /// directory.
    pub fn new(root: Utf8PathBuf, filter: ScanFilter) -> Result<Self, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::RootNotFound(root));
        }
        Ok(Self { root, filter })
    }

    /// Walks the root, invoking `emit` for every indexable record.
    ///
    /// Directories are emitted before their contents. The stop flag is
    /// checked between entries; observing it returns
    /// [`ScanError::Cancelled`] with whatever was already emitted still
    /// valid.
    ///
    /// # Errors
    ///
    /// Only [`ScanError::Cancelled`]. Unreadable entries and non-UTF-8
    /// paths are counted into `stats` and skipped.
    pub fn walk<F>(
        &self,
        should_stop: &Arc<AtomicBool>,
        stats: &ScanStats,
        mut emit: F,
    ) -> Result<(), ScanError>
    where
        F: FnMut(FileRecord),
    {
        let filter = self.filter.clone();
        let walker = WalkBuilder::new(&self.root)
            // An index must see everything the policy allows; gitignore
            // semantics do not apply here.
            .standard_filters(false)
            .hidden(false)
            .follow_links(false)
            .threads(1)
            .filter_entry(move |entry| {
                let Some(path) = Utf8Path::from_path(entry.path()) else {
                    return false;
                };
                let hidden = path.file_name().is_some_and(|name| name.starts_with('.'));
                if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                    !filter.should_skip_directory(path, hidden)
                } else {
                    true
                }
            })
            .build();

        for result in walker {
            if should_stop.load(Ordering::Relaxed) {
                return Err(ScanError::Cancelled);
            }

            let entry = match result {
                Ok(entry) => entry,
                Err(error) => {
                    stats.add_error();
                    trace!(%error, "unreadable entry skipped");
                    continue;
                }
            };

            let Some(path) = Utf8Path::from_path(entry.path()) else {
                stats.add_error();
                warn!(path = %entry.path().display(), "skipping non-UTF-8 path");
                continue;
            };

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(error) => {
                    stats.add_error();
                    trace!(%path, %error, "metadata read failed");
                    continue;
                }
            };

            let record = FileRecord::from_metadata(path, &metadata);
            if record.is_directory() {
                stats.add_dir();
            } else {
                if self.filter.should_skip_file(path, record.is_hidden()) {
                    stats.add_skipped();
                    continue;
                }
                stats.add_file(record.size);
            }
            emit(record);
        }
        Ok(())
    }

    /// The root being walked.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn utf8(path: &std::path::Path) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path.to_path_buf()).expect("utf8 path")
    }

    fn collect(root: &Utf8Path, filter: ScanFilter) -> Vec<FileRecord> {
        let walker = RootWalker::new(root.to_owned(), filter).expect("walker");
        let stop = Arc::new(AtomicBool::new(false));
        let stats = ScanStats::new();
        let mut records = Vec::new();
        walker
            .walk(&stop, &stats, |record| records.push(record))
            .expect("walk");
        records
    }

    #[test]
    fn test_walk_emits_dirs_before_children() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("sub")).expect("mkdir");
        fs::write(dir.path().join("sub/file.txt"), b"x").expect("write");

        let records = collect(&utf8(dir.path()), ScanFilter::default());
        let sub_pos = records
            .iter()
            .position(|r| r.file_name == "sub")
            .expect("sub dir");
        let file_pos = records
            .iter()
            .position(|r| r.file_name == "file.txt")
            .expect("file");
        assert!(sub_pos < file_pos);
    }

    #[test]
    fn test_hidden_files_skipped_by_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(".hidden"), b"x").expect("write");
        fs::write(dir.path().join("visible.txt"), b"x").expect("write");

        let records = collect(&utf8(dir.path()), ScanFilter::default());
        assert!(records.iter().any(|r| r.file_name == "visible.txt"));
        assert!(!records.iter().any(|r| r.file_name == ".hidden"));
    }

    #[test]
    fn test_hidden_directory_pruned_with_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join(".git")).expect("mkdir");
        fs::write(dir.path().join(".git/config"), b"x").expect("write");

        let records = collect(&utf8(dir.path()), ScanFilter::default());
        assert!(!records.iter().any(|r| r.file_name == "config"));
    }

    #[test]
    fn test_excluded_extension_dropped() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("movie.ISO"), b"x").expect("write");
        fs::write(dir.path().join("notes.txt"), b"x").expect("write");

        let mut filter = ScanFilter::default();
        filter.exclude_extensions.insert("iso".to_owned());

        let records = collect(&utf8(dir.path()), filter);
        assert!(!records.iter().any(|r| r.file_name == "movie.ISO"));
        assert!(records.iter().any(|r| r.file_name == "notes.txt"));
    }

    #[test]
    fn test_exclude_path_prunes_subtree() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("keep")).expect("mkdir");
        fs::create_dir(dir.path().join("drop")).expect("mkdir");
        fs::write(dir.path().join("keep/a.txt"), b"x").expect("write");
        fs::write(dir.path().join("drop/b.txt"), b"x").expect("write");

        let mut filter = ScanFilter::default();
        filter.exclude_paths.push(utf8(&dir.path().join("drop")));

        let records = collect(&utf8(dir.path()), filter);
        assert!(records.iter().any(|r| r.file_name == "a.txt"));
        assert!(!records.iter().any(|r| r.file_name == "b.txt"));
    }

    #[test]
    fn test_system_root_names_always_pruned() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("$Recycle.Bin")).expect("mkdir");
        fs::write(dir.path().join("$Recycle.Bin/ghost.txt"), b"x").expect("write");

        let records = collect(&utf8(dir.path()), ScanFilter::default());
        assert!(!records.iter().any(|r| r.file_name == "ghost.txt"));
    }

    #[test]
    fn test_cancellation_stops_walk() {
        let dir = tempfile::tempdir().expect("tempdir");
        for i in 0..50 {
            fs::write(dir.path().join(format!("f{i}.txt")), b"x").expect("write");
        }

        let walker =
            RootWalker::new(utf8(dir.path()), ScanFilter::default()).expect("walker");
        let stop = Arc::new(AtomicBool::new(false));
        let stats = ScanStats::new();
        let mut seen = 0u32;
        let stop_inner = Arc::clone(&stop);
        let result = walker.walk(&stop, &stats, |_| {
            seen += 1;
            if seen == 5 {
                stop_inner.store(true, Ordering::Relaxed);
            }
        });
        assert!(matches!(result, Err(ScanError::Cancelled)));
        assert!(seen < 50);
    }

    #[test]
    fn test_missing_root_rejected() {
        let result = RootWalker::new(Utf8PathBuf::from("/no/such/root"), ScanFilter::default());
        assert!(matches!(result, Err(ScanError::RootNotFound(_))));
    }
}
