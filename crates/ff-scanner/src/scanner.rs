//! The two-phase parallel crawler.
//!
//! A crawl builds the initial in-memory index for a set of roots:
//!
//! 1. **Priority phase** - one worker per well-known user directory
//!    (Documents, Desktop, Downloads, Pictures, Videos, Music). These
//!    finish before anything else so interactive search is useful within
//!    seconds of startup.
//! 2. **Bulk phase** - one worker per included root, bounded by the
//!    configured thread count.
//!
//! Workers accumulate records and flush them in batches: one writer-lock
//! acquisition on the memory index, then one enqueue to the persistence
//! writer. Cancellation is cooperative (a shared flag checked per entry);
//! pausing parks workers on a condition variable after flushing their
//! in-flight batch, so nothing is ever lost to a pause.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use ff_core::{DriveId, DriveRecord, IndexingConfig, WorkQueue};
use ff_index::MemoryIndex;
use ff_store::BatchWriter;

use crate::error::ScanError;
use crate::stats::{ScanStats, StatsSnapshot};
use crate::walker::{RootWalker, ScanFilter};

/// How often the monitor thread samples progress.
const MONITOR_INTERVAL: Duration = Duration::from_secs(1);

/// Well-known user directory names for the priority phase.
const PRIORITY_DIR_NAMES: &[&str] = &[
    "Documents",
    "Desktop",
    "Downloads",
    "Pictures",
    "Videos",
    "Music",
];

/// Progress callback: entries indexed so far and the path being walked.
pub type ProgressFn = dyn Fn(u64, &Utf8Path) + Send + Sync;
/// Completion callback: success flag and a human-readable message.
pub type CompletionFn = dyn Fn(bool, &str) + Send + Sync;

/// Pause flag plus the condition variable workers park on.
#[derive(Debug, Default)]
pub struct PauseGate {
    paused: Mutex<bool>,
    resumed: Condvar,
}

impl PauseGate {
    /// Asks workers to park at their next check.
    pub fn pause(&self) {
        *self.paused.lock() = true;
    }

    /// Releases parked workers.
    pub fn resume(&self) {
        *self.paused.lock() = false;
        self.resumed.notify_all();
    }

    /// Returns `true` while paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        *self.paused.lock()
    }

    /// Blocks the caller until resumed (returns immediately if not paused).
    pub fn wait_while_paused(&self) {
        let mut paused = self.paused.lock();
        while *paused {
            self.resumed.wait(&mut paused);
        }
    }
}

/// What a finished (or cancelled) crawl produced.
#[derive(Debug, Clone, Copy)]
pub struct ScanOutcome {
    /// Final counter values.
    pub stats: StatsSnapshot,
    /// Whether the stop flag cut the crawl short.
    pub cancelled: bool,
    /// Wall-clock crawl duration.
    pub elapsed: Duration,
}

/// The parallel crawler.
///
/// One `Scanner` instance is reusable across crawls; `request_stop` and
/// the pause gate affect the crawl in flight.
pub struct Scanner {
    config: IndexingConfig,
    index: Arc<MemoryIndex>,
    writer: Option<Arc<BatchWriter>>,
    stats: Arc<ScanStats>,
    should_stop: Arc<AtomicBool>,
    gate: Arc<PauseGate>,
    current_path: Arc<Mutex<Utf8PathBuf>>,
    progress: Option<Arc<ProgressFn>>,
    completion: Option<Arc<CompletionFn>>,
}

impl Scanner {
    /// Creates a scanner writing into `index`.
    #[must_use]
    pub fn new(config: IndexingConfig, index: Arc<MemoryIndex>) -> Self {
        Self {
            config,
            index,
            writer: None,
            stats: Arc::new(ScanStats::new()),
            should_stop: Arc::new(AtomicBool::new(false)),
            gate: Arc::new(PauseGate::default()),
            current_path: Arc::new(Mutex::new(Utf8PathBuf::new())),
            progress: None,
            completion: None,
        }
    }

    /// Also enqueue flushed batches to this persistence writer.
    #[must_use]
    pub fn with_writer(mut self, writer: Arc<BatchWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Installs the progress callback (invoked every
    /// `progress_interval` files and once per monitor tick).
    pub fn set_progress_callback(&mut self, callback: Arc<ProgressFn>) {
        self.progress = Some(callback);
    }

    /// Installs the completion callback.
    pub fn set_completion_callback(&mut self, callback: Arc<CompletionFn>) {
        self.completion = Some(callback);
    }

    /// The crawl counters (live; shared with workers).
    #[must_use]
    pub fn stats(&self) -> Arc<ScanStats> {
        Arc::clone(&self.stats)
    }

    /// Requests cooperative cancellation of the crawl in flight.
    pub fn request_stop(&self) {
        self.should_stop.store(true, Ordering::Relaxed);
        // Parked workers must observe the stop flag too.
        self.gate.resume();
    }

    /// Pauses the crawl in flight; in-flight batches flush first.
    pub fn pause(&self) {
        self.gate.pause();
    }

    /// Resumes a paused crawl.
    pub fn resume(&self) {
        self.gate.resume();
    }

    /// Returns `true` while the crawl is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.gate.is_paused()
    }

    /// Runs a full crawl: priority phase, then bulk phase.
    ///
    /// Returns a clean partial outcome when cancelled; per-entry read
    /// failures are counted, never fatal.
    ///
    /// # Errors
    ///
    /// Hard I/O failures that prevent the crawl from running at all.
    pub fn scan(&self) -> Result<ScanOutcome, ScanError> {
        let started = Instant::now();
        self.stats.reset();
        self.should_stop.store(false, Ordering::Relaxed);

        let roots = self.roots();
        let drives: Vec<(Utf8PathBuf, DriveId)> = roots
            .iter()
            .map(|root| {
                let id = self
                    .index
                    .add_drive(DriveRecord::new(DriveId::UNASSIGNED, root.clone()));
                (root.clone(), id)
            })
            .collect();
        info!(roots = drives.len(), "starting crawl");

        let monitor_done = Arc::new(AtomicBool::new(false));
        let monitor = self.spawn_monitor(Arc::clone(&monitor_done));

        // Priority phase: every worker must finish before the bulk phase.
        let priority = self.priority_directories(&roots);
        self.run_phase(&priority, &drives, "priority", &[]);

        // Bulk phase: one worker per root, bounded by the thread budget.
        // Priority directories are already indexed and excluded here so
        // the progress counter stays monotonic without double counting.
        let cancelled = self.run_phase(&roots, &drives, "bulk", &priority);

        monitor_done.store(true, Ordering::Relaxed);
        if let Some(handle) = monitor {
            let _ = handle.join();
        }

        // Refresh drive records with the completed scan time.
        for (root, _) in &drives {
            let mut drive = DriveRecord::new(DriveId::UNASSIGNED, root.clone());
            drive.last_scan = ff_core::timestamp_secs(std::time::SystemTime::now());
            self.index.add_drive(drive);
        }
        if !cancelled {
            self.index.note_full_scan();
        }

        let outcome = ScanOutcome {
            stats: self.stats.snapshot(),
            cancelled,
            elapsed: started.elapsed(),
        };
        if let Some(callback) = &self.completion {
            let message = if cancelled {
                format!("crawl cancelled after {} entries", outcome.stats.files + outcome.stats.dirs)
            } else {
                format!(
                    "indexed {} files and {} directories",
                    outcome.stats.files, outcome.stats.dirs
                )
            };
            callback(!cancelled, &message);
        }
        info!(
            files = outcome.stats.files,
            dirs = outcome.stats.dirs,
            errors = outcome.stats.errors,
            cancelled,
            "crawl finished"
        );
        Ok(outcome)
    }

    // ----- internals -------------------------------------------------------

    /// Runs one phase over `targets`, at most `effective_threads` workers at
    /// a time. Returns `true` when the stop flag cut the phase short.
    fn run_phase(
        &self,
        targets: &[Utf8PathBuf],
        drives: &[(Utf8PathBuf, DriveId)],
        phase: &str,
        already_scanned: &[Utf8PathBuf],
    ) -> bool {
        if targets.is_empty() {
            return self.should_stop.load(Ordering::Relaxed);
        }
        let queue: WorkQueue<Utf8PathBuf> = WorkQueue::new(targets.len());
        for target in targets {
            queue.push(target.clone());
        }
        queue.shutdown(); // workers drain and exit

        let worker_count = self.config.effective_threads().min(targets.len());
        debug!(phase, targets = targets.len(), workers = worker_count, "phase start");

        std::thread::scope(|scope| {
            for _ in 0..worker_count {
                scope.spawn(|| {
                    while let Some(target) = queue.pop() {
                        let drive_id = drive_for(drives, &target);
                        if let Err(error) = self.crawl_root(&target, drive_id, already_scanned) {
                            match error {
                                ScanError::Cancelled => break,
                                ScanError::RootNotFound(root) => {
                                    debug!(%root, "phase target missing, skipped");
                                }
                                other => {
                                    self.stats.add_error();
                                    warn!(error = %other, "crawl worker failed");
                                }
                            }
                        }
                    }
                });
            }
        });
        self.should_stop.load(Ordering::Relaxed)
    }

    /// Crawls one root, batching flushes to the index and the store.
    fn crawl_root(
        &self,
        root: &Utf8Path,
        drive_id: DriveId,
        already_scanned: &[Utf8PathBuf],
    ) -> Result<(), ScanError> {
        let mut filter = ScanFilter::from_config(&self.config);
        filter
            .exclude_paths
            .extend(already_scanned.iter().cloned());
        let walker = RootWalker::new(root.to_owned(), filter)?;
        let batch_size = self.config.batch_size;
        let interval = self.config.progress_interval.max(1);

        let mut batch = Vec::with_capacity(batch_size);
        let result = walker.walk(&self.should_stop, &self.stats, |mut record| {
            record.drive_id = drive_id;
            *self.current_path.lock() = record.full_path.clone();
            batch.push(record);

            if batch.len() >= batch_size {
                self.flush(&mut batch);
            }
            if self.gate.is_paused() {
                // Flush before parking so a pause never strands a batch.
                self.flush(&mut batch);
                self.gate.wait_while_paused();
            }
            if self.stats.indexed() % interval == 0 {
                self.emit_progress();
            }
        });

        // Cancelled or not, whatever was collected stays consistent.
        self.flush(&mut batch);
        result
    }

    /// One writer-lock acquisition for the whole batch, then one store
    /// enqueue.
    fn flush(&self, batch: &mut Vec<ff_core::FileRecord>) {
        if batch.is_empty() {
            return;
        }
        let records = std::mem::take(batch);
        let ids = self.index.add_batch(records);
        if let Some(writer) = &self.writer {
            if !ids.is_empty() && !writer.enqueue_upsert(self.index.records_for(&ids)) {
                debug!("store writer is shut down, batch not persisted");
            }
        }
    }

    fn emit_progress(&self) {
        if let Some(callback) = &self.progress {
            let path = self.current_path.lock().clone();
            callback(self.stats.indexed(), &path);
        }
    }

    fn spawn_monitor(
        &self,
        done: Arc<AtomicBool>,
    ) -> Option<std::thread::JoinHandle<()>> {
        let callback = self.progress.clone()?;
        let stats = Arc::clone(&self.stats);
        let current = Arc::clone(&self.current_path);
        std::thread::Builder::new()
            .name("ff-scan-monitor".to_owned())
            .spawn(move || {
                while !done.load(Ordering::Relaxed) {
                    std::thread::sleep(MONITOR_INTERVAL);
                    let path = current.lock().clone();
                    callback(stats.indexed(), &path);
                }
            })
            .ok()
    }

    /// The crawl roots: the configured drives, or the platform default.
    fn roots(&self) -> Vec<Utf8PathBuf> {
        if self.config.include_drives.is_empty() {
            vec![default_root()]
        } else {
            self.config.include_drives.clone()
        }
    }

    /// Existing well-known user directories under the included roots.
    ///
    /// When `include_drives` is configured, user directories outside the
    /// included roots are not indexed (see the config documentation).
    fn priority_directories(&self, roots: &[Utf8PathBuf]) -> Vec<Utf8PathBuf> {
        let Some(home) = home_directory() else {
            return Vec::new();
        };
        PRIORITY_DIR_NAMES
            .iter()
            .map(|name| home.join(name))
            .filter(|dir| dir.is_dir())
            .filter(|dir| roots.iter().any(|root| dir.starts_with(root)))
            .collect()
    }
}

fn drive_for(drives: &[(Utf8PathBuf, DriveId)], target: &Utf8Path) -> DriveId {
    drives
        .iter()
        .filter(|(root, _)| target.starts_with(root))
        .max_by_key(|(root, _)| root.as_str().len())
        .map_or(DriveId::UNASSIGNED, |(_, id)| *id)
}

#[cfg(windows)]
fn default_root() -> Utf8PathBuf {
    Utf8PathBuf::from("C:\\")
}

#[cfg(not(windows))]
fn default_root() -> Utf8PathBuf {
    Utf8PathBuf::from("/")
}

fn home_directory() -> Option<Utf8PathBuf> {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()
        .map(Utf8PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn utf8(path: &std::path::Path) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path.to_path_buf()).expect("utf8 path")
    }

    fn scanner_for(root: &Utf8Path) -> Scanner {
        let config = IndexingConfig {
            include_drives: vec![root.to_owned()],
            batch_size: 4,
            ..IndexingConfig::default()
        };
        Scanner::new(config, Arc::new(MemoryIndex::new(1024)))
    }

    fn populate(dir: &std::path::Path) {
        fs::create_dir(dir.join("docs")).expect("mkdir");
        fs::create_dir(dir.join("src")).expect("mkdir");
        for i in 0..10 {
            fs::write(dir.join(format!("docs/note{i}.md")), b"n").expect("write");
            fs::write(dir.join(format!("src/mod{i}.rs")), b"m").expect("write");
        }
    }

    #[test]
    fn test_scan_indexes_tree() {
        let dir = tempfile::tempdir().expect("tempdir");
        populate(dir.path());

        let scanner = scanner_for(&utf8(dir.path()));
        let index = Arc::clone(&scanner.index);
        let outcome = scanner.scan().expect("scan");

        assert!(!outcome.cancelled);
        assert_eq!(outcome.stats.files, 20);
        assert!(outcome.stats.dirs >= 2);
        assert!(index.validate_integrity().is_empty());

        let hits = index.search_by_prefix("note");
        assert_eq!(hits.len(), 10);
    }

    #[test]
    fn test_children_linked_to_parent() {
        let dir = tempfile::tempdir().expect("tempdir");
        populate(dir.path());

        let scanner = scanner_for(&utf8(dir.path()));
        let index = Arc::clone(&scanner.index);
        scanner.scan().expect("scan");

        let docs = index
            .get_by_path(&utf8(&dir.path().join("docs")))
            .expect("docs dir");
        let children = index.children_of(docs.id);
        assert_eq!(children.len(), 10);
        assert!(children.iter().all(|c| c.parent_id == docs.id));
    }

    #[test]
    fn test_cancelled_scan_leaves_consistent_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        for i in 0..40 {
            let sub = dir.path().join(format!("d{i}"));
            fs::create_dir(&sub).expect("mkdir");
            for j in 0..25 {
                fs::write(sub.join(format!("f{j}.txt")), b"x").expect("write");
            }
        }

        let scanner = Arc::new(scanner_for(&utf8(dir.path())));
        let index = Arc::clone(&scanner.index);

        let stopper = {
            let scanner = Arc::clone(&scanner);
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(2));
                scanner.request_stop();
            })
        };
        let outcome = scanner.scan().expect("scan returns cleanly");
        stopper.join().expect("join stopper");

        // Whether or not the stop arrived before the walk finished, the
        // partial index must satisfy every invariant.
        assert!(index.validate_integrity().is_empty());
        assert_eq!(
            index.statistics().total_files,
            outcome.stats.files,
            "outcome counters agree with the index"
        );
    }

    #[test]
    fn test_pause_gate_blocks_and_releases() {
        let gate = PauseGate::default();
        assert!(!gate.is_paused());
        gate.pause();
        assert!(gate.is_paused());

        let gate = Arc::new(gate);
        let waiter = {
            let gate = Arc::clone(&gate);
            std::thread::spawn(move || {
                gate.wait_while_paused();
                true
            })
        };
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert!(!waiter.is_finished());

        gate.resume();
        assert!(waiter.join().expect("join waiter"));
    }

    #[test]
    fn test_progress_callback_fires() {
        let dir = tempfile::tempdir().expect("tempdir");
        populate(dir.path());

        let calls = Arc::new(AtomicBool::new(false));
        let calls_hook = Arc::clone(&calls);
        let config = IndexingConfig {
            include_drives: vec![utf8(dir.path())],
            batch_size: 4,
            progress_interval: 1,
            ..IndexingConfig::default()
        };
        let mut scanner = Scanner::new(config, Arc::new(MemoryIndex::new(1024)));
        scanner.set_progress_callback(Arc::new(move |_count, _path| {
            calls_hook.store(true, Ordering::Relaxed);
        }));
        scanner.scan().expect("scan");
        assert!(calls.load(Ordering::Relaxed));
    }

    #[test]
    fn test_scan_with_store_writer_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        populate(dir.path());

        let store = Arc::new(ff_store::MemoryStore::new());
        let writer = Arc::new(
            ff_store::BatchWriter::spawn(
                Arc::clone(&store) as Arc<dyn ff_store::StoreGateway>
            )
            .expect("spawn writer"),
        );

        let config = IndexingConfig {
            include_drives: vec![utf8(dir.path())],
            batch_size: 4,
            ..IndexingConfig::default()
        };
        let scanner = Scanner::new(config, Arc::new(MemoryIndex::new(1024)))
            .with_writer(Arc::clone(&writer));
        let outcome = scanner.scan().expect("scan");

        // Drain the writer, then every indexed entry must be persisted.
        drop(scanner);
        Arc::try_unwrap(writer)
            .map(ff_store::BatchWriter::shutdown)
            .ok();
        assert_eq!(
            store.file_count() as u64,
            outcome.stats.files + outcome.stats.dirs
        );
    }
}
