//! Core types, errors, and utilities for the fastfind search system.
//!
//! This crate provides the foundations shared by every other crate in the
//! workspace:
//!
//! - Domain types (`FileRecord`, `DriveRecord`, `SearchQuery`, `SearchResult`)
//! - Filename normalization and tokenization
//! - Configuration structures with serde defaults
//! - The bounded [`WorkQueue`] used by the crawler and watcher pipelines
//! - Type aliases for `FxHashMap`/`FxHashSet` (faster than std)

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod normalize;
pub mod queue;
pub mod types;

pub use config::{
    CacheConfig, Config, IndexingConfig, SearchConfig, StoreConfig, WatchConfig,
};
pub use error::ConfigError;
pub use hash::{
    fx_hash_map, fx_hash_map_with_capacity, fx_hash_set, FxHashMap, FxHashSet,
};
pub use normalize::{normalize_name, tokenize};
pub use queue::WorkQueue;
pub use types::{
    timestamp_secs, DateRange, DriveId, DriveRecord, FileAttributes, FileId, FileKind,
    FileRecord, IndexStatistics, RankingWeights, SearchMode, SearchQuery, SearchResult,
    SearchResults, SizeRange, SortOrder, Timestamp,
};
