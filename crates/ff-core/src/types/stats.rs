//! Index-wide statistics snapshot.

use serde::{Deserialize, Serialize};

use super::file::Timestamp;

/// A point-in-time view of the whole index.
///
/// Produced by the memory index and the service facade for the `stats`
/// command and progress displays. Values come from relaxed atomic counters,
/// so a snapshot taken mid-crawl is approximate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStatistics {
    /// Live file records.
    pub total_files: u64,
    /// Live directory records.
    pub total_dirs: u64,
    /// Sum of file sizes in bytes.
    pub total_size: u64,
    /// Drives with at least one indexed record.
    pub indexed_drives: u32,
    /// When the last full crawl completed; 0 for never.
    pub last_full_scan: Timestamp,
    /// When the index last changed; 0 for never.
    pub last_update: Timestamp,
    /// Crawl progress in `[0, 1]` while indexing.
    pub progress: f64,
    /// Whether a crawl is currently running.
    pub is_indexing: bool,
}

impl IndexStatistics {
    /// Total live records of any kind.
    #[inline]
    #[must_use]
    pub const fn total_entries(&self) -> u64 {
        self.total_files + self.total_dirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_entries() {
        let stats = IndexStatistics {
            total_files: 10,
            total_dirs: 4,
            ..IndexStatistics::default()
        };
        assert_eq!(stats.total_entries(), 14);
    }
}
