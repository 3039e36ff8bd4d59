//! Error types for the ff-index crate.

use camino::Utf8PathBuf;
use ff_core::FileId;

/// Errors from memory-index mutations and integrity checks.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// An `add` collided with a live record at the same path.
    #[error("path already indexed: {0}")]
    DuplicatePath(Utf8PathBuf),

    /// A restored record collided with a live record id.
    #[error("id already indexed: {0:?}")]
    DuplicateId(FileId),

    /// The id does not reference a live record.
    #[error("no record with id {0:?}")]
    UnknownId(FileId),

    /// The path does not reference a live record.
    #[error("no record at path {0}")]
    UnknownPath(Utf8PathBuf),

    /// Integrity validation found inconsistencies.
    #[error("index integrity violated: {}", .0.join("; "))]
    Integrity(Vec<String>),
}
