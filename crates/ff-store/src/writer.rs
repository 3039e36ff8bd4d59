//! Background batch writer.
//!
//! [`BatchWriter`] owns the single persistence thread of the system: the
//! crawler and the change processor enqueue batches, the writer drains them
//! in order, wraps each batch in a gateway transaction, and retries failed
//! commits with exponential backoff. A batch that still fails after the
//! retry budget is dropped with a warning and counted; the in-memory index
//! remains the session authority, so nothing else stops.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, warn};

use ff_core::{DriveRecord, FileId, FileRecord, WorkQueue};

use crate::error::StoreError;
use crate::gateway::StoreGateway;

/// Commit attempts per batch before giving up.
const MAX_ATTEMPTS: u32 = 3;
/// First retry delay; doubles per attempt.
const BACKOFF_BASE: Duration = Duration::from_millis(50);
/// Queue slots for pending batches.
const QUEUE_CAPACITY: usize = 64;

/// One unit of persistence work.
#[derive(Debug)]
pub enum WriteOp {
    /// Insert-or-replace these file records.
    Upsert(Vec<FileRecord>),
    /// Delete these file records.
    Delete(Vec<FileId>),
    /// Insert-or-replace these drive records.
    UpsertDrives(Vec<DriveRecord>),
}

/// The persistence writer thread and its queue.
///
/// # Shutdown
///
/// [`shutdown`](BatchWriter::shutdown) closes the queue and joins the
/// thread; batches already enqueued are flushed first.
#[derive(Debug)]
pub struct BatchWriter {
    queue: Arc<WorkQueue<WriteOp>>,
    handle: Option<JoinHandle<()>>,
    batches_written: Arc<AtomicU64>,
    batches_failed: Arc<AtomicU64>,
}

impl BatchWriter {
    /// Spawns the writer thread against a gateway.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] when the thread cannot be created; the caller's
    /// shutdown path handles this as fatal.
    pub fn spawn(gateway: Arc<dyn StoreGateway>) -> Result<Self, StoreError> {
        let queue = Arc::new(WorkQueue::new(QUEUE_CAPACITY));
        let batches_written = Arc::new(AtomicU64::new(0));
        let batches_failed = Arc::new(AtomicU64::new(0));

        let handle = {
            let queue = Arc::clone(&queue);
            let written = Arc::clone(&batches_written);
            let failed = Arc::clone(&batches_failed);
            std::thread::Builder::new()
                .name("ff-store-writer".to_owned())
                .spawn(move || {
                    while let Some(op) = queue.pop() {
                        match flush_with_retry(gateway.as_ref(), &op) {
                            Ok(()) => {
                                written.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(error) => {
                                failed.fetch_add(1, Ordering::Relaxed);
                                warn!(%error, "dropping batch after {MAX_ATTEMPTS} failed commits");
                            }
                        }
                    }
                    debug!("persistence writer drained and stopped");
                })?
        };

        Ok(Self {
            queue,
            handle: Some(handle),
            batches_written,
            batches_failed,
        })
    }

    /// Enqueues an upsert batch; returns `false` after shutdown.
    pub fn enqueue_upsert(&self, records: Vec<FileRecord>) -> bool {
        if records.is_empty() {
            return true;
        }
        self.queue.push(WriteOp::Upsert(records))
    }

    /// Enqueues a delete batch; returns `false` after shutdown.
    pub fn enqueue_delete(&self, ids: Vec<FileId>) -> bool {
        if ids.is_empty() {
            return true;
        }
        self.queue.push(WriteOp::Delete(ids))
    }

    /// Enqueues a drive upsert; returns `false` after shutdown.
    pub fn enqueue_drives(&self, drives: Vec<DriveRecord>) -> bool {
        if drives.is_empty() {
            return true;
        }
        self.queue.push(WriteOp::UpsertDrives(drives))
    }

    /// Batches flushed successfully.
    #[must_use]
    pub fn batches_written(&self) -> u64 {
        self.batches_written.load(Ordering::Relaxed)
    }

    /// Batches dropped after exhausting retries.
    #[must_use]
    pub fn batches_failed(&self) -> u64 {
        self.batches_failed.load(Ordering::Relaxed)
    }

    /// Pending batches not yet flushed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Flushes the queue and stops the writer thread.
    pub fn shutdown(mut self) {
        self.queue.shutdown();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("persistence writer thread panicked");
            }
        }
    }
}

impl Drop for BatchWriter {
    fn drop(&mut self) {
        self.queue.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Applies one op inside a transaction, retrying failed commits with
/// exponential backoff.
fn flush_with_retry(gateway: &dyn StoreGateway, op: &WriteOp) -> Result<(), StoreError> {
    gateway.begin_tx()?;
    if let Err(error) = apply(gateway, op) {
        // The op itself failed; nothing to retry at commit level.
        let _ = gateway.rollback();
        return Err(error);
    }

    let mut delay = BACKOFF_BASE;
    let mut attempt = 0;
    loop {
        attempt += 1;
        match gateway.commit() {
            Ok(()) => return Ok(()),
            Err(error) if attempt < MAX_ATTEMPTS => {
                debug!(%error, attempt, "commit failed, backing off");
                std::thread::sleep(delay);
                delay *= 2;
            }
            Err(error) => {
                let _ = gateway.rollback();
                return Err(error);
            }
        }
    }
}

fn apply(gateway: &dyn StoreGateway, op: &WriteOp) -> Result<(), StoreError> {
    match op {
        WriteOp::Upsert(records) => gateway.upsert(records),
        WriteOp::Delete(ids) => gateway.delete(ids),
        WriteOp::UpsertDrives(drives) => gateway.upsert_drives(drives),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use camino::Utf8PathBuf;

    fn record(id: u64, path: &str) -> FileRecord {
        let mut r = FileRecord::new(Utf8PathBuf::from(path));
        r.id = FileId::new(id);
        r
    }

    fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("condition not reached in time");
    }

    #[test]
    fn test_writer_flushes_batches() {
        let store = Arc::new(MemoryStore::new());
        let writer = BatchWriter::spawn(Arc::clone(&store) as Arc<dyn StoreGateway>).expect("spawn");

        assert!(writer.enqueue_upsert(vec![record(1, "/a"), record(2, "/b")]));
        wait_for(|| store.file_count() == 2);
        assert_eq!(writer.batches_written(), 1);

        writer.shutdown();
    }

    #[test]
    fn test_shutdown_drains_pending() {
        let store = Arc::new(MemoryStore::new());
        let writer = BatchWriter::spawn(Arc::clone(&store) as Arc<dyn StoreGateway>).expect("spawn");

        for i in 0..10 {
            assert!(writer.enqueue_upsert(vec![record(i + 1, "/x")]));
        }
        writer.shutdown();
        assert_eq!(store.file_count(), 10);
    }

    #[test]
    fn test_retry_recovers_from_transient_failure() {
        let store = Arc::new(MemoryStore::new());
        store.inject_commit_failures(2);
        let writer = BatchWriter::spawn(Arc::clone(&store) as Arc<dyn StoreGateway>).expect("spawn");

        assert!(writer.enqueue_upsert(vec![record(1, "/a")]));
        wait_for(|| store.file_count() == 1);
        assert_eq!(writer.batches_failed(), 0);

        writer.shutdown();
    }

    #[test]
    fn test_exhausted_retries_drop_batch() {
        let store = Arc::new(MemoryStore::new());
        store.inject_commit_failures(10);
        let writer = BatchWriter::spawn(Arc::clone(&store) as Arc<dyn StoreGateway>).expect("spawn");

        assert!(writer.enqueue_upsert(vec![record(1, "/a")]));
        wait_for(|| writer.batches_failed() == 1);
        assert_eq!(writer.batches_written(), 0);

        writer.shutdown();
    }

    #[test]
    fn test_enqueue_after_shutdown_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let writer = BatchWriter::spawn(store as Arc<dyn StoreGateway>).expect("spawn");
        writer.queue.shutdown();
        assert!(!writer.enqueue_upsert(vec![record(1, "/a")]));
    }
}
