//! The watch service: OS streams in, index mutations out.
//!
//! One `notify` watcher runs per watched root, normalizing platform
//! events into [`ChangeEvent`]s and pushing them onto a shared queue. A
//! single processor thread drains the queue with a short timed wait,
//! coalesces bursts, filters, and applies the survivors to the memory
//! index under its writer lock - so events are applied in queue order and
//! readers never observe a half-applied change.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use ff_core::{FileRecord, WorkQueue};
use ff_index::{IndexError, MemoryIndex};
use ff_store::BatchWriter;

use crate::coalesce::Coalescer;
use crate::error::WatchError;
use crate::events::{ChangeEvent, ChangeKind};
use crate::filter::EventFilter;

/// Queue slots between the OS callbacks and the processor.
const QUEUE_CAPACITY: usize = 1024;
/// Processor wake interval while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Callback invoked for every applied event.
pub type EventCallback = dyn Fn(&ChangeEvent) + Send + Sync;

#[derive(Debug, Default)]
struct Counters {
    processed: AtomicU64,
    filtered: AtomicU64,
    errors: AtomicU64,
}

/// A snapshot of the watcher's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherStats {
    /// Events applied to the index.
    pub events_processed: u64,
    /// Events dropped by the filter rules.
    pub events_filtered: u64,
    /// Metadata or apply failures, counted and skipped.
    pub errors_encountered: u64,
}

/// The running watch service.
///
/// Dropping the service stops the watchers and joins the processor;
/// prefer [`stop`](WatchService::stop) for an explicit shutdown point.
pub struct WatchService {
    queue: Arc<WorkQueue<ChangeEvent>>,
    /// Kept alive for their watch registrations.
    _watchers: Vec<RecommendedWatcher>,
    processor: Option<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl WatchService {
    /// Starts watching `roots` and applying surviving events to `index`.
    ///
    /// Roots that do not exist fail startup; everything after that is
    /// non-fatal and counted.
    ///
    /// # Errors
    ///
    /// [`WatchError::RootNotFound`] for a missing root,
    /// [`WatchError::Notify`] when the OS backend refuses a watch, and
    /// [`WatchError::Io`] when the processor thread cannot start.
    pub fn start(
        roots: &[Utf8PathBuf],
        filter: EventFilter,
        coalesce_window: Duration,
        index: Arc<MemoryIndex>,
        writer: Option<Arc<BatchWriter>>,
        on_event: Option<Arc<EventCallback>>,
    ) -> Result<Self, WatchError> {
        let queue = Arc::new(WorkQueue::new(QUEUE_CAPACITY));
        let counters = Arc::new(Counters::default());

        let mut watchers = Vec::with_capacity(roots.len());
        for root in roots {
            if !root.exists() {
                return Err(WatchError::RootNotFound(root.clone()));
            }
            let queue = Arc::clone(&queue);
            let counters = Arc::clone(&counters);
            let mut watcher = notify::recommended_watcher(
                move |result: Result<notify::Event, notify::Error>| match result {
                    Ok(event) => {
                        for normalized in normalize(event) {
                            queue.push(normalized);
                        }
                    }
                    Err(error) => {
                        counters.errors.fetch_add(1, Ordering::Relaxed);
                        warn!(%error, "notification stream error");
                    }
                },
            )?;
            watcher.watch(root.as_std_path(), RecursiveMode::Recursive)?;
            info!(%root, "watching");
            watchers.push(watcher);
        }

        let processor = {
            let queue = Arc::clone(&queue);
            let counters = Arc::clone(&counters);
            std::thread::Builder::new()
                .name("ff-watch-processor".to_owned())
                .spawn(move || {
                    processor_loop(&queue, &counters, filter, coalesce_window, &index, writer, on_event);
                })?
        };

        Ok(Self {
            queue,
            _watchers: watchers,
            processor: Some(processor),
            counters,
        })
    }

    /// Feeds an event directly into the pipeline, bypassing the OS
    /// stream. Used by tests and by callers that learn about changes out
    /// of band.
    pub fn inject(&self, event: ChangeEvent) -> bool {
        self.queue.push(event)
    }

    /// The service's counters.
    #[must_use]
    pub fn stats(&self) -> WatcherStats {
        WatcherStats {
            events_processed: self.counters.processed.load(Ordering::Relaxed),
            events_filtered: self.counters.filtered.load(Ordering::Relaxed),
            errors_encountered: self.counters.errors.load(Ordering::Relaxed),
        }
    }

    /// Pending (queued, un-coalesced) events.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Stops watching, drains the pipeline, and joins the processor.
    pub fn stop(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        self.queue.shutdown();
        if let Some(handle) = self.processor.take() {
            if handle.join().is_err() {
                warn!("watch processor thread panicked");
            }
        }
    }
}

impl Drop for WatchService {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}

#[allow(clippy::too_many_arguments)]
fn processor_loop(
    queue: &WorkQueue<ChangeEvent>,
    counters: &Counters,
    filter: EventFilter,
    window: Duration,
    index: &MemoryIndex,
    writer: Option<Arc<BatchWriter>>,
    on_event: Option<Arc<EventCallback>>,
) {
    let mut coalescer = Coalescer::new(window);

    loop {
        match queue.pop_timeout(POLL_INTERVAL) {
            Some(event) => coalescer.push(event),
            None if queue.is_shutdown() && queue.is_empty() => break,
            None => {}
        }
        for event in coalescer.drain_ready(Instant::now()) {
            dispatch(&event, counters, &filter, index, writer.as_deref(), on_event.as_deref());
        }
    }

    // Shutdown: apply whatever the window was still holding.
    for event in coalescer.flush() {
        dispatch(&event, counters, &filter, index, writer.as_deref(), on_event.as_deref());
    }
    debug!("watch processor drained and stopped");
}

fn dispatch(
    event: &ChangeEvent,
    counters: &Counters,
    filter: &EventFilter,
    index: &MemoryIndex,
    writer: Option<&BatchWriter>,
    on_event: Option<&EventCallback>,
) {
    if !filter.accepts(event) {
        counters.filtered.fetch_add(1, Ordering::Relaxed);
        trace!(path = %event.path, "event filtered");
        return;
    }
    match apply(event, index, writer) {
        Ok(()) => {
            counters.processed.fetch_add(1, Ordering::Relaxed);
            if let Some(callback) = on_event {
                callback(event);
            }
        }
        Err(error) => {
            counters.errors.fetch_add(1, Ordering::Relaxed);
            debug!(path = %event.path, %error, "event application failed");
        }
    }
}

/// Applies one event to the index (and mirrors it to the store writer).
fn apply(
    event: &ChangeEvent,
    index: &MemoryIndex,
    writer: Option<&BatchWriter>,
) -> Result<(), WatchError> {
    match event.kind {
        ChangeKind::Created => {
            let record = record_from_path(&event.path, index)?;
            upsert(index, writer, record).map_err(apply_error)?;
        }
        ChangeKind::Modified => {
            let record = record_from_path(&event.path, index)?;
            upsert(index, writer, record).map_err(apply_error)?;
        }
        ChangeKind::Deleted => match index.remove_by_path(&event.path) {
            Ok(removed) => {
                if let Some(writer) = writer {
                    writer.enqueue_delete(removed);
                }
            }
            Err(IndexError::UnknownPath(_)) => {
                trace!(path = %event.path, "delete for unindexed path ignored");
            }
            Err(error) => return Err(apply_error(error)),
        },
        ChangeKind::Renamed | ChangeKind::Moved => {
            let Some(old_path) = &event.old_path else {
                // A relocation without a source degenerates to a create.
                let record = record_from_path(&event.path, index)?;
                upsert(index, writer, record).map_err(apply_error)?;
                return Ok(());
            };
            match index.rename(old_path, &event.path) {
                Ok(id) => {
                    if let Some(writer) = writer {
                        writer.enqueue_upsert(index.records_for(&[id]));
                    }
                }
                Err(IndexError::UnknownPath(_)) => {
                    // Source never indexed (e.g. moved in from an
                    // excluded tree); index the destination fresh.
                    let record = record_from_path(&event.path, index)?;
                    upsert(index, writer, record).map_err(apply_error)?;
                }
                Err(error) => return Err(apply_error(error)),
            }
        }
    }
    Ok(())
}

/// Builds a record for `path`, resolving its drive.
fn record_from_path(path: &Utf8Path, index: &MemoryIndex) -> Result<FileRecord, WatchError> {
    let mut record = FileRecord::from_path(path)?;
    if let Some(drive) = index.drive_for_path(path) {
        record.drive_id = drive;
    }
    Ok(record)
}

/// Add-or-update keyed by path, preserving the id and access count of an
/// existing record.
fn upsert(
    index: &MemoryIndex,
    writer: Option<&BatchWriter>,
    mut record: FileRecord,
) -> Result<(), IndexError> {
    let id = match index.get_by_path(&record.full_path) {
        Some(existing) => {
            record.id = existing.id;
            record.access_count = existing.access_count;
            record.parent_id = existing.parent_id;
            index.update(record)?;
            existing.id
        }
        None => index.add(record)?,
    };
    if let Some(writer) = writer {
        writer.enqueue_upsert(index.records_for(&[id]));
    }
    Ok(())
}

fn apply_error(error: IndexError) -> WatchError {
    WatchError::Io(std::io::Error::other(error.to_string()))
}

/// Reduces a raw `notify` event to normalized change events.
fn normalize(event: notify::Event) -> Vec<ChangeEvent> {
    let mut out = Vec::with_capacity(event.paths.len());

    let utf8_paths = || {
        event.paths.iter().filter_map(|path| {
            match Utf8Path::from_path(path) {
                Some(utf8) => Some(utf8.to_owned()),
                None => {
                    warn!(path = %path.display(), "skipping non-UTF-8 path in event");
                    None
                }
            }
        })
    };

    match event.kind {
        EventKind::Create(_) => {
            out.extend(utf8_paths().map(ChangeEvent::created));
        }
        EventKind::Remove(_) => {
            out.extend(utf8_paths().map(ChangeEvent::deleted));
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let paths: Vec<Utf8PathBuf> = utf8_paths().collect();
            if let [old, new] = paths.as_slice() {
                let same_dir = old.parent() == new.parent();
                out.push(if same_dir {
                    ChangeEvent::renamed(old.clone(), new.clone())
                } else {
                    ChangeEvent::moved(old.clone(), new.clone())
                });
            } else {
                out.extend(paths.into_iter().map(ChangeEvent::modified));
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            out.extend(utf8_paths().map(ChangeEvent::deleted));
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            out.extend(utf8_paths().map(ChangeEvent::created));
        }
        EventKind::Modify(_) => {
            out.extend(utf8_paths().map(ChangeEvent::modified));
        }
        // Access notifications carry no index-relevant change.
        EventKind::Access(_) => {}
        EventKind::Any | EventKind::Other => {
            out.extend(utf8_paths().map(ChangeEvent::modified));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn utf8(path: &std::path::Path) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path.to_path_buf()).expect("utf8 path")
    }

    fn service_with_index() -> (WatchService, Arc<MemoryIndex>) {
        let index = Arc::new(MemoryIndex::new(1024));
        let service = WatchService::start(
            &[],
            EventFilter::new(),
            Duration::from_millis(0),
            Arc::clone(&index),
            None,
            None,
        )
        .expect("start service");
        (service, index)
    }

    fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..400 {
            if condition() {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("condition not reached in time");
    }

    #[test]
    fn test_created_event_adds_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("fresh.txt");
        fs::write(&file, b"hello").expect("write");

        let (service, index) = service_with_index();
        service.inject(ChangeEvent::created(utf8(&file)));

        wait_for(|| index.get_by_path(&utf8(&file)).is_some());
        let record = index.get_by_path(&utf8(&file)).expect("record");
        assert_eq!(record.size, 5);
        assert_eq!(service.stats().events_processed, 1);
        service.stop();
    }

    #[test]
    fn test_deleted_event_removes_subtree() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (service, index) = service_with_index();

        let mut parent = FileRecord::new(Utf8PathBuf::from("/watched/data"));
        parent.kind = ff_core::FileKind::Directory;
        let parent_id = index.add(parent).expect("add parent");
        for i in 0..1000 {
            let mut child = FileRecord::new(Utf8PathBuf::from(format!("/watched/data/f{i}")));
            child.parent_id = parent_id;
            index.add(child).expect("add child");
        }
        drop(dir);

        service.inject(ChangeEvent::deleted(Utf8PathBuf::from("/watched/data")));
        wait_for(|| index.is_empty());

        assert_eq!(index.statistics().total_files, 0);
        assert!(index.validate_integrity().is_empty());
        service.stop();
    }

    #[test]
    fn test_rename_preserves_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let old = dir.path().join("old.txt");
        let new = dir.path().join("new.txt");
        fs::write(&new, b"x").expect("write");

        let (service, index) = service_with_index();
        let id = index
            .add(FileRecord::new(utf8(&old)))
            .expect("add original");

        service.inject(ChangeEvent::renamed(utf8(&old), utf8(&new)));
        wait_for(|| index.get_by_path(&utf8(&new)).is_some());

        assert!(index.get_by_path(&utf8(&old)).is_none());
        assert_eq!(index.get_by_path(&utf8(&new)).map(|r| r.id), Some(id));
        service.stop();
    }

    #[test]
    fn test_modify_storm_applies_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("hot.log");
        fs::write(&file, b"x").expect("write");

        let index = Arc::new(MemoryIndex::new(64));
        let service = WatchService::start(
            &[],
            EventFilter::new(),
            Duration::from_millis(30),
            Arc::clone(&index),
            None,
            None,
        )
        .expect("start");

        for _ in 0..50 {
            service.inject(ChangeEvent::modified(utf8(&file)));
        }
        wait_for(|| service.stats().events_processed > 0);
        std::thread::sleep(Duration::from_millis(80));

        assert_eq!(service.stats().events_processed, 1);
        service.stop();
    }

    #[test]
    fn test_filtered_events_are_counted_not_applied() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("junk.tmp");
        fs::write(&file, b"x").expect("write");

        let index = Arc::new(MemoryIndex::new(64));
        let service = WatchService::start(
            &[],
            EventFilter::new().exclude_extension("tmp"),
            Duration::from_millis(0),
            Arc::clone(&index),
            None,
            None,
        )
        .expect("start");

        service.inject(ChangeEvent::created(utf8(&file)));
        wait_for(|| service.stats().events_filtered == 1);
        assert!(index.is_empty());
        service.stop();
    }

    #[test]
    fn test_real_watcher_sees_file_creation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = utf8(dir.path());

        let index = Arc::new(MemoryIndex::new(64));
        let service = WatchService::start(
            &[root.clone()],
            EventFilter::new(),
            Duration::from_millis(10),
            Arc::clone(&index),
            None,
            None,
        )
        .expect("start");

        let file = dir.path().join("observed.txt");
        fs::write(&file, b"content").expect("write");

        // Platform notification latency varies; poll generously.
        for _ in 0..400 {
            if index.get_by_path(&utf8(&file)).is_some() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(
            index.get_by_path(&utf8(&file)).is_some(),
            "creation never observed"
        );
        service.stop();
    }

    #[test]
    fn test_stats_start_at_zero() {
        let (service, _index) = service_with_index();
        assert_eq!(service.stats(), WatcherStats::default());
        service.stop();
    }
}
