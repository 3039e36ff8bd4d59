//! File record types: the unit of indexing.

use std::fs::Metadata;
use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

use bitflags::bitflags;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::normalize::{normalize_name, tokenize};

use super::drive::DriveId;

/// Seconds since the Unix epoch.
///
/// Signed so that pre-1970 filesystem timestamps (they exist) do not wrap.
pub type Timestamp = i64;

/// An opaque identifier for an indexed file or directory.
///
/// Ids are assigned monotonically on first insertion into the memory index
/// and are never reused, so they stay valid across renames and survive
/// process restarts through the persistence gateway. The newtype prevents
/// mixing raw integers with record ids.
///
/// # Examples
///
/// ```
/// use ff_core::FileId;
///
/// let a = FileId::new(1);
/// let b = FileId::new(1);
/// assert_eq!(a, b);
/// assert_eq!(a.as_u64(), 1);
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct FileId(pub u64);

impl FileId {
    /// The sentinel id meaning "not yet assigned".
    ///
    /// Records built from the filesystem carry this until the memory index
    /// allocates a real id.
    pub const UNASSIGNED: Self = Self(0);

    /// Creates a file id from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns `true` if this id has not been assigned yet.
    #[inline]
    #[must_use]
    pub const fn is_unassigned(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for FileId {
    #[inline]
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<FileId> for u64 {
    #[inline]
    fn from(id: FileId) -> Self {
        id.0
    }
}

/// The kind of filesystem object a record describes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// Could not be determined (metadata read failed mid-crawl).
    #[default]
    Unknown,
    /// A regular file.
    File,
    /// A directory.
    Directory,
    /// A symbolic link (not followed).
    Symlink,
    /// A file with more than one hard link.
    Hardlink,
}

impl FileKind {
    /// Returns `true` for [`FileKind::Directory`].
    #[inline]
    #[must_use]
    pub const fn is_directory(self) -> bool {
        matches!(self, Self::Directory)
    }
}

bitflags! {
    /// Platform file attributes relevant to indexing policy.
    ///
    /// Only the bits the indexer makes decisions on are named; the rest of
    /// the 32-bit word is preserved opaquely from the platform.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FileAttributes: u32 {
        /// Hidden (leading-dot name on Unix, FILE_ATTRIBUTE_HIDDEN on Windows).
        const HIDDEN = 0b0000_0001;
        /// Operating-system file.
        const SYSTEM = 0b0000_0010;
        /// Not writable by the owning user.
        const READ_ONLY = 0b0000_0100;
    }
}

/// One indexed file or directory.
///
/// Records are owned exclusively by the memory index; every other component
/// refers to them by [`FileId`] and works on clones. The derived fields
/// (`normalized_name`, `extension`, `tokens`) are computed once at
/// construction so the hot search path never re-normalizes.
///
/// # Examples
///
/// ```
/// use ff_core::FileRecord;
/// use camino::Utf8PathBuf;
///
/// let record = FileRecord::new(Utf8PathBuf::from("/home/anna/Annual_Report.PDF"));
/// assert_eq!(record.file_name, "Annual_Report.PDF");
/// assert_eq!(record.extension, "pdf");
/// assert_eq!(record.normalized_name, "annual report pdf");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Stable identifier; [`FileId::UNASSIGNED`] until the index allocates one.
    pub id: FileId,

    /// Absolute path of the entry.
    pub full_path: Utf8PathBuf,

    /// The final path component, as stored on disk.
    pub file_name: String,

    /// Lowercase extension without the leading dot; empty for none.
    pub extension: String,

    /// Canonical lowercase form of `file_name`, see [`normalize_name`].
    pub normalized_name: String,

    /// Search tokens: words of the normalized name plus the extension.
    pub tokens: SmallVec<[String; 8]>,

    /// Size in bytes; 0 for directories.
    pub size: u64,

    /// Last modification time, seconds since the Unix epoch.
    pub last_modified: Timestamp,

    /// Last access time, seconds since the Unix epoch.
    pub last_accessed: Timestamp,

    /// What kind of filesystem object this is.
    pub kind: FileKind,

    /// Platform attribute bits, see [`FileAttributes`].
    pub attributes: FileAttributes,

    /// Id of the containing directory; [`FileId::UNASSIGNED`] for roots.
    pub parent_id: FileId,

    /// Id of the drive (volume) this entry lives on.
    pub drive_id: DriveId,

    /// Times this record was opened through search results.
    pub access_count: u32,
}

impl FileRecord {
    /// Builds a record from a path alone, deriving the name-based fields.
    ///
    /// Size, timestamps, kind, and attributes stay at their defaults; use
    /// [`FileRecord::from_path`] to fill them from the filesystem.
    #[must_use]
    pub fn new(full_path: Utf8PathBuf) -> Self {
        let file_name = full_path.file_name().unwrap_or_default().to_owned();
        let extension = full_path
            .extension()
            .map(str::to_lowercase)
            .unwrap_or_default();
        let normalized_name = normalize_name(&file_name);
        let tokens = tokenize(&file_name, &extension);

        Self {
            id: FileId::UNASSIGNED,
            full_path,
            file_name,
            extension,
            normalized_name,
            tokens,
            ..Self::default()
        }
    }

    /// Builds a record by reading metadata from the filesystem.
    ///
    /// Symlinks are detected (not followed) via `symlink_metadata`. Hidden
    /// status uses the leading-dot convention; read-only comes from the
    /// permission bits.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when metadata cannot be read. The
    /// crawler counts such failures and moves on.
    pub fn from_path(path: &Utf8Path) -> io::Result<Self> {
        let metadata = std::fs::symlink_metadata(path)?;
        Ok(Self::from_metadata(path, &metadata))
    }

    /// Builds a record from already-fetched metadata.
    ///
    /// Split out from [`FileRecord::from_path`] so directory enumeration can
    /// reuse the metadata the walker already has in hand.
    #[must_use]
    pub fn from_metadata(path: &Utf8Path, metadata: &Metadata) -> Self {
        let mut record = Self::new(path.to_owned());

        record.kind = if metadata.file_type().is_symlink() {
            FileKind::Symlink
        } else if metadata.is_dir() {
            FileKind::Directory
        } else {
            FileKind::File
        };
        record.size = if metadata.is_dir() { 0 } else { metadata.len() };
        record.last_modified = metadata.modified().map_or(0, timestamp_secs);
        record.last_accessed = metadata.accessed().map_or(0, timestamp_secs);

        if record.file_name.starts_with('.') {
            record.attributes |= FileAttributes::HIDDEN;
        }
        if metadata.permissions().readonly() {
            record.attributes |= FileAttributes::READ_ONLY;
        }

        record
    }

    /// Refreshes the derived name fields after `full_path` changed.
    ///
    /// Called on rename/move events so the tokens and normalized name track
    /// the new name.
    pub fn refresh_name_fields(&mut self) {
        self.file_name = self.full_path.file_name().unwrap_or_default().to_owned();
        self.extension = self
            .full_path
            .extension()
            .map(str::to_lowercase)
            .unwrap_or_default();
        self.normalized_name = normalize_name(&self.file_name);
        self.tokens = tokenize(&self.file_name, &self.extension);
    }

    /// Returns `true` if this record describes a directory.
    #[inline]
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        self.kind.is_directory()
    }

    /// Returns `true` if the hidden attribute is set.
    #[inline]
    #[must_use]
    pub const fn is_hidden(&self) -> bool {
        self.attributes.contains(FileAttributes::HIDDEN)
    }

    /// Returns `true` if the system attribute is set.
    #[inline]
    #[must_use]
    pub const fn is_system(&self) -> bool {
        self.attributes.contains(FileAttributes::SYSTEM)
    }
}

/// Converts a [`SystemTime`] into seconds since the Unix epoch.
///
/// Times before the epoch map to negative values rather than an error.
#[must_use]
pub fn timestamp_secs(time: SystemTime) -> Timestamp {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as Timestamp,
        Err(e) => -(e.duration().as_secs() as Timestamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_id_sentinel() {
        assert!(FileId::UNASSIGNED.is_unassigned());
        assert!(!FileId::new(1).is_unassigned());
    }

    #[test]
    fn test_record_derives_name_fields() {
        let record = FileRecord::new(Utf8PathBuf::from("/data/My_Notes-v2.TXT"));
        assert_eq!(record.file_name, "My_Notes-v2.TXT");
        assert_eq!(record.extension, "txt");
        assert_eq!(record.normalized_name, "my notes v2 txt");
        assert!(record.tokens.iter().any(|t| t == "notes"));
        assert!(record.tokens.iter().any(|t| t == "txt"));
    }

    #[test]
    fn test_record_without_extension() {
        let record = FileRecord::new(Utf8PathBuf::from("/data/Makefile"));
        assert_eq!(record.extension, "");
        assert_eq!(record.tokens.as_slice(), ["makefile"]);
    }

    #[test]
    fn test_refresh_name_fields_after_rename() {
        let mut record = FileRecord::new(Utf8PathBuf::from("/x/old.txt"));
        record.full_path = Utf8PathBuf::from("/x/new.md");
        record.refresh_name_fields();
        assert_eq!(record.file_name, "new.md");
        assert_eq!(record.extension, "md");
        assert_eq!(record.normalized_name, "new md");
    }

    #[test]
    fn test_from_metadata_on_real_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sample.rs");
        std::fs::write(&path, b"fn main() {}").expect("write");

        let utf8 = camino::Utf8Path::from_path(&path).expect("utf8 path");
        let record = FileRecord::from_path(utf8).expect("metadata");
        assert_eq!(record.kind, FileKind::File);
        assert_eq!(record.size, 12);
        assert!(record.last_modified > 0);
        assert!(!record.is_hidden());
    }

    #[test]
    fn test_from_metadata_marks_dotfiles_hidden() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(".config");
        std::fs::write(&path, b"x").expect("write");

        let utf8 = camino::Utf8Path::from_path(&path).expect("utf8 path");
        let record = FileRecord::from_path(utf8).expect("metadata");
        assert!(record.is_hidden());
    }

    #[test]
    fn test_record_serialization_round_trip() {
        let mut record = FileRecord::new(Utf8PathBuf::from("/a/b.txt"));
        record.id = FileId::new(42);
        record.size = 100;

        let json = serde_json::to_string(&record).expect("serialize");
        let parsed: FileRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(record, parsed);
    }
}
