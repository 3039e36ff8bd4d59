//! Drive (volume) record types.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use super::file::Timestamp;

/// An opaque identifier for an indexed drive.
///
/// Like file ids, drive ids are assigned monotonically and never reused.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DriveId(pub u64);

impl DriveId {
    /// The sentinel id meaning "not yet assigned".
    pub const UNASSIGNED: Self = Self(0);

    /// Creates a drive id from a raw value.
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
}

/// One indexed drive or mount point.
///
/// On Windows `mount` is a letter-rooted path (`C:\`); on Unix it is a
/// mount-point path (`/`, `/mnt/data`). The record carries enough volume
/// metadata for the stats view and for include/exclude decisions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveRecord {
    /// Stable identifier.
    pub id: DriveId,

    /// Root path of the volume.
    pub mount: Utf8PathBuf,

    /// Volume label, empty when none is set.
    pub label: String,

    /// Filesystem tag (`ntfs`, `ext4`, ...), empty when unknown.
    pub filesystem: String,

    /// Total capacity in bytes.
    pub total_bytes: u64,

    /// Free capacity in bytes.
    pub free_bytes: u64,

    /// When this drive was last fully crawled; 0 for never.
    pub last_scan: Timestamp,

    /// Whether the volume is currently mounted and reachable.
    pub available: bool,
}

impl DriveRecord {
    /// Creates a drive record for a mount path with everything else unset.
    #[must_use]
    pub fn new(id: DriveId, mount: Utf8PathBuf) -> Self {
        Self {
            id,
            mount,
            available: true,
            ..Self::default()
        }
    }

    /// Fraction of the volume in use, in `[0, 1]`; 0 when capacity is unknown.
    #[must_use]
    pub fn usage_ratio(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        let used = self.total_bytes.saturating_sub(self.free_bytes);
        used as f64 / self.total_bytes as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_ratio() {
        let mut drive = DriveRecord::new(DriveId::new(1), Utf8PathBuf::from("/"));
        assert_eq!(drive.usage_ratio(), 0.0);

        drive.total_bytes = 1000;
        drive.free_bytes = 250;
        assert!((drive.usage_ratio() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_serialization_round_trip() {
        let drive = DriveRecord::new(DriveId::new(3), Utf8PathBuf::from("/mnt/data"));
        let json = serde_json::to_string(&drive).expect("serialize");
        let parsed: DriveRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(drive, parsed);
    }
}
