//! In-memory multi-index for the fastfind search system.
//!
//! This crate provides [`MemoryIndex`], the single large shared structure of
//! the system: every indexed [`FileRecord`](ff_core::FileRecord) lives here,
//! reachable through a trie, a bloom filter, an inverted token index,
//! extension/size/date maps, the directory hierarchy, and drive membership,
//! all kept consistent under one reader-writer lock.
//!
//! The sub-structures are public for their own tests and for callers with
//! narrower needs:
//!
//! - [`NameTrie`] - exact and prefix name lookups
//! - [`BloomFilter`] - fast negative name answers
//! - [`InvertedIndex`] - token posting lists

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod bloom;
pub mod error;
pub mod index;
pub mod inverted;
pub mod trie;

pub use bloom::BloomFilter;
pub use error::IndexError;
pub use index::MemoryIndex;
pub use inverted::{InvertedIndex, TokenCombine};
pub use trie::NameTrie;
