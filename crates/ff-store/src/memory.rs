//! In-process gateway implementation.
//!
//! [`MemoryStore`] implements the full [`StoreGateway`] contract against
//! plain maps. It backs tests and sessions that run without a durable
//! store; the in-memory index is the session authority either way, so the
//! only capability lost is restart hydration.

use parking_lot::Mutex;

use ff_core::{DriveRecord, FileId, FileRecord, FxHashMap};

use crate::error::StoreError;
use crate::gateway::{StoreGateway, SCHEMA_VERSION};

#[derive(Debug, Default, Clone)]
struct Tables {
    files: FxHashMap<FileId, FileRecord>,
    drives: FxHashMap<u64, DriveRecord>,
}

#[derive(Debug, Default)]
struct State {
    tables: Tables,
    /// Snapshot taken at `begin_tx`, restored by `rollback`.
    checkpoint: Option<Tables>,
    schema_version: u32,
    /// Remaining commits to fail, for exercising the writer's retry path.
    commit_failures: u32,
}

/// A map-backed [`StoreGateway`].
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use ff_core::FileRecord;
/// use ff_store::{MemoryStore, StoreGateway};
///
/// let store = MemoryStore::new();
/// let mut record = FileRecord::new(Utf8PathBuf::from("/a.txt"));
/// record.id = ff_core::FileId::new(1);
///
/// store.upsert(&[record]).unwrap();
/// assert_eq!(store.load_all_records().unwrap().count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Creates an empty store at the current schema version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                schema_version: SCHEMA_VERSION,
                ..State::default()
            }),
        }
    }

    /// Number of persisted file records.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.state.lock().tables.files.len()
    }

    /// Makes the next `count` commits fail, for testing retry behavior.
    pub fn inject_commit_failures(&self, count: u32) {
        self.state.lock().commit_failures = count;
    }
}

impl StoreGateway for MemoryStore {
    fn upsert(&self, records: &[FileRecord]) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        for record in records {
            if record.id.is_unassigned() {
                return Err(StoreError::backend("refusing to persist unassigned id"));
            }
            state.tables.files.insert(record.id, record.clone());
        }
        Ok(())
    }

    fn delete(&self, ids: &[FileId]) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        for id in ids {
            state.tables.files.remove(id);
        }
        Ok(())
    }

    fn upsert_drives(&self, drives: &[DriveRecord]) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        for drive in drives {
            state.tables.drives.insert(drive.id.as_u64(), drive.clone());
        }
        Ok(())
    }

    fn begin_tx(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if state.checkpoint.is_some() {
            return Err(StoreError::Transaction(
                "transaction already open".to_owned(),
            ));
        }
        state.checkpoint = Some(state.tables.clone());
        Ok(())
    }

    fn commit(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if state.checkpoint.is_none() {
            return Err(StoreError::Transaction("no open transaction".to_owned()));
        }
        if state.commit_failures > 0 {
            state.commit_failures -= 1;
            // The transaction stays open so the caller can retry the commit.
            return Err(StoreError::backend("injected commit failure"));
        }
        state.checkpoint = None;
        Ok(())
    }

    fn rollback(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        match state.checkpoint.take() {
            Some(tables) => {
                state.tables = tables;
                Ok(())
            }
            None => Err(StoreError::Transaction("no open transaction".to_owned())),
        }
    }

    fn load_all_records(&self) -> Result<Box<dyn Iterator<Item = FileRecord> + Send>, StoreError> {
        let records: Vec<FileRecord> = self.state.lock().tables.files.values().cloned().collect();
        Ok(Box::new(records.into_iter()))
    }

    fn load_all_drives(&self) -> Result<Vec<DriveRecord>, StoreError> {
        Ok(self.state.lock().tables.drives.values().cloned().collect())
    }

    fn schema_version(&self) -> Result<u32, StoreError> {
        Ok(self.state.lock().schema_version)
    }

    fn upgrade(&self, from: u32, to: u32) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        if state.schema_version != from && state.schema_version != to {
            return Err(StoreError::SchemaVersion {
                found: state.schema_version,
                supported: to,
            });
        }
        state.schema_version = to;
        Ok(true)
    }
}
