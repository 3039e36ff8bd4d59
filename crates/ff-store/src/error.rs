//! Error types for the ff-store crate.

/// Errors surfaced by a persistence gateway.
///
/// All store failures are recoverable from the core's point of view: the
/// in-memory index stays authoritative for the session, and the batch
/// writer retries before giving up on a batch.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store rejected or failed an operation.
    #[error("store backend failure: {0}")]
    Backend(String),

    /// A transactional call arrived in the wrong state (e.g. `commit`
    /// without `begin_tx`).
    #[error("invalid transaction state: {0}")]
    Transaction(String),

    /// The on-disk schema is newer than this build understands.
    #[error("unsupported schema version {found}, expected at most {supported}")]
    SchemaVersion {
        /// Version found in the store.
        found: u32,
        /// Newest version this build can read.
        supported: u32,
    },

    /// An I/O error from the backing medium.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Shorthand for a [`StoreError::Backend`].
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_version_display() {
        let error = StoreError::SchemaVersion {
            found: 9,
            supported: 1,
        };
        let msg = error.to_string();
        assert!(msg.contains('9'));
        assert!(msg.contains('1'));
    }
}
