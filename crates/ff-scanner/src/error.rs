//! Error types for the ff-scanner crate.

use camino::Utf8PathBuf;

/// Errors from crawling and progressive loading.
///
/// Per-entry read failures during a crawl are *not* errors at this level;
/// workers count and skip them. These variants cover failures that stop a
/// whole root or request.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The requested root does not exist or is not a directory.
    #[error("scan root is not a directory: {0}")]
    RootNotFound(Utf8PathBuf),

    /// A path could not be represented as UTF-8.
    #[error("non-UTF-8 path encountered: {0}")]
    NonUtf8Path(std::path::PathBuf),

    /// The crawl observed the stop flag and returned early.
    ///
    /// Partial state is consistent; the caller decides whether to report
    /// or resume.
    #[error("scan cancelled")]
    Cancelled,

    /// An I/O failure severe enough to abandon a request (not a single
    /// entry).
    #[error("scan I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_not_found_display() {
        let error = ScanError::RootNotFound(Utf8PathBuf::from("/missing"));
        assert!(error.to_string().contains("/missing"));
    }
}
