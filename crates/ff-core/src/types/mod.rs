//! Domain types for the fastfind search system.
//!
//! The submodules cover the four corners of the data model:
//!
//! - [`file`] - indexed records ([`FileRecord`], [`FileId`], attributes)
//! - [`drive`] - indexed volumes ([`DriveRecord`])
//! - [`query`] - search requests ([`SearchQuery`] and its filters)
//! - [`result`] - search responses ([`SearchResult`], [`SearchResults`])
//! - [`stats`] - index-wide statistics snapshots

pub mod drive;
pub mod file;
pub mod query;
pub mod result;
pub mod stats;

pub use drive::{DriveId, DriveRecord};
pub use file::{timestamp_secs, FileAttributes, FileId, FileKind, FileRecord, Timestamp};
pub use query::{DateRange, SearchMode, SearchQuery, SizeRange, SortOrder};
pub use result::{RankingWeights, SearchResult, SearchResults};
pub use stats::IndexStatistics;
