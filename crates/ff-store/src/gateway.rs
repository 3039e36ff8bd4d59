//! The persistence gateway contract.
//!
//! The core persists through this narrow interface only; which engine sits
//! behind it (SQLite, sled, a server) is an application concern. The
//! contract is batched upserts/deletes plus a transactional bracket and a
//! full-snapshot load for startup hydration.
//!
//! Implementations serialize their own writes; callers batch records (the
//! crawler default is 1,000 per batch) before committing.

use ff_core::{DriveRecord, FileId, FileRecord};

use crate::error::StoreError;

/// The schema version this build reads and writes.
pub const SCHEMA_VERSION: u32 = 1;

/// A narrow key/value-record persistence backend.
///
/// # Transaction discipline
///
/// Writes between `begin_tx` and `commit` become durable together;
/// `rollback` discards them. Calling `upsert`/`delete` outside a
/// transaction is allowed and commits immediately.
///
/// # Concurrency
///
/// Implementations must be `Send + Sync`; the batch writer drives a
/// gateway from a single thread, but loads may happen from others.
pub trait StoreGateway: Send + Sync {
    /// Inserts or replaces file records by id.
    fn upsert(&self, records: &[FileRecord]) -> Result<(), StoreError>;

    /// Deletes file records by id; unknown ids are ignored.
    fn delete(&self, ids: &[FileId]) -> Result<(), StoreError>;

    /// Inserts or replaces drive records by id.
    fn upsert_drives(&self, drives: &[DriveRecord]) -> Result<(), StoreError>;

    /// Opens a transaction.
    fn begin_tx(&self) -> Result<(), StoreError>;

    /// Makes the open transaction durable.
    fn commit(&self) -> Result<(), StoreError>;

    /// Discards the open transaction.
    fn rollback(&self) -> Result<(), StoreError>;

    /// Streams every persisted file record, for startup hydration.
    ///
    /// Record ids are preserved exactly as stored.
    fn load_all_records(&self) -> Result<Box<dyn Iterator<Item = FileRecord> + Send>, StoreError>;

    /// Returns every persisted drive record.
    fn load_all_drives(&self) -> Result<Vec<DriveRecord>, StoreError>;

    /// The schema version of the stored data.
    fn schema_version(&self) -> Result<u32, StoreError>;

    /// Migrates stored data between schema versions.
    ///
    /// Returns `true` when the upgrade was performed (or was a no-op
    /// because the store is already at `to`).
    fn upgrade(&self, from: u32, to: u32) -> Result<bool, StoreError>;
}
