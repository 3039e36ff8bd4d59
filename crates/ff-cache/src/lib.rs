//! LRU caching layer for the fastfind search system.
//!
//! Two levels:
//!
//! - [`LruCache`] - a generic fixed-capacity LRU map with hit/miss/eviction
//!   statistics
//! - [`CacheManager`] - the composed layer the engine talks to: a file
//!   cache, a TTL- and epoch-expired search-result cache, and a
//!   directory-children cache sharing one entry budget

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod lru;
pub mod manager;

pub use lru::{CacheStats, LruCache};
pub use manager::{CacheManager, ManagerStats};
