//! Error types for the ff-watcher crate.

use camino::Utf8PathBuf;

/// Errors from starting or running the change watcher.
///
/// Per-event metadata failures are not represented here; the processor
/// counts and skips them.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// A watch root does not exist.
    #[error("watch root not found: {0}")]
    RootNotFound(Utf8PathBuf),

    /// The OS notification backend failed.
    #[error("notification backend error: {0}")]
    Notify(#[from] notify::Error),

    /// An I/O failure while setting up the watcher.
    #[error("watcher I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_not_found_display() {
        let error = WatchError::RootNotFound(Utf8PathBuf::from("/gone"));
        assert!(error.to_string().contains("/gone"));
    }
}
