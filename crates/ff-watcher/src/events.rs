//! Normalized change events.
//!
//! Whatever the OS notification source reports is reduced to one uniform
//! event type before it enters the processing queue, so the coalescer and
//! the index application code never see platform details.

use std::time::Instant;

use camino::Utf8PathBuf;

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// A new entry appeared.
    Created,
    /// An existing entry's content or metadata changed.
    Modified,
    /// An entry disappeared.
    Deleted,
    /// An entry changed name within its directory.
    Renamed,
    /// An entry changed directory.
    Moved,
}

/// One normalized filesystem change.
///
/// `old_path` is set for renames and moves; `path` is always the current
/// (post-event) path except for deletions, where it is the removed path.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use ff_watcher::{ChangeEvent, ChangeKind};
///
/// let event = ChangeEvent::renamed(
///     Utf8PathBuf::from("/x/old.txt"),
///     Utf8PathBuf::from("/x/new.txt"),
/// );
/// assert_eq!(event.kind, ChangeKind::Renamed);
/// assert_eq!(event.old_path.as_deref().map(|p| p.as_str()), Some("/x/old.txt"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// What happened.
    pub kind: ChangeKind,
    /// The affected path (new path for renames/moves).
    pub path: Utf8PathBuf,
    /// The prior path, for renames and moves.
    pub old_path: Option<Utf8PathBuf>,
    /// Monotonic arrival time, used by the coalescing window.
    pub timestamp: Instant,
}

impl ChangeEvent {
    /// A creation event.
    #[must_use]
    pub fn created(path: Utf8PathBuf) -> Self {
        Self::new(ChangeKind::Created, path, None)
    }

    /// A modification event.
    #[must_use]
    pub fn modified(path: Utf8PathBuf) -> Self {
        Self::new(ChangeKind::Modified, path, None)
    }

    /// A deletion event.
    #[must_use]
    pub fn deleted(path: Utf8PathBuf) -> Self {
        Self::new(ChangeKind::Deleted, path, None)
    }

    /// A rename within one directory.
    #[must_use]
    pub fn renamed(old_path: Utf8PathBuf, new_path: Utf8PathBuf) -> Self {
        Self::new(ChangeKind::Renamed, new_path, Some(old_path))
    }

    /// A move across directories.
    #[must_use]
    pub fn moved(old_path: Utf8PathBuf, new_path: Utf8PathBuf) -> Self {
        Self::new(ChangeKind::Moved, new_path, Some(old_path))
    }

    fn new(kind: ChangeKind, path: Utf8PathBuf, old_path: Option<Utf8PathBuf>) -> Self {
        Self {
            kind,
            path,
            old_path,
            timestamp: Instant::now(),
        }
    }

    /// The affected file's extension, if any.
    #[inline]
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.path.extension()
    }

    /// The affected file's name.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name()
    }

    /// Returns `true` when this event carries an old path (rename/move).
    #[inline]
    #[must_use]
    pub fn is_relocation(&self) -> bool {
        matches!(self.kind, ChangeKind::Renamed | ChangeKind::Moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_fields() {
        let created = ChangeEvent::created(Utf8PathBuf::from("/a.txt"));
        assert_eq!(created.kind, ChangeKind::Created);
        assert!(created.old_path.is_none());

        let moved = ChangeEvent::moved(
            Utf8PathBuf::from("/a/x.txt"),
            Utf8PathBuf::from("/b/x.txt"),
        );
        assert!(moved.is_relocation());
        assert_eq!(moved.path.as_str(), "/b/x.txt");
    }

    #[test]
    fn test_extension_helper() {
        let event = ChangeEvent::modified(Utf8PathBuf::from("/notes.MD"));
        assert_eq!(event.extension(), Some("MD"));
        assert_eq!(event.file_name(), Some("notes.MD"));
    }
}
