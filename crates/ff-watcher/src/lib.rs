//! Filesystem change watching for the fastfind search system.
//!
//! The pipeline: per-root OS notification streams ([`WatchService`])
//! normalize platform events into [`ChangeEvent`]s, a [`Coalescer`]
//! absorbs bursts within a quiet window, an [`EventFilter`] applies the
//! exclusion rules, and surviving events mutate the memory index
//! atomically - creations add, modifications update, deletions take their
//! descendants, and renames preserve record ids.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod coalesce;
pub mod error;
pub mod events;
pub mod filter;
pub mod watcher;

pub use coalesce::{Coalescer, DEFAULT_WINDOW};
pub use error::WatchError;
pub use events::{ChangeEvent, ChangeKind};
pub use filter::EventFilter;
pub use watcher::{EventCallback, WatchService, WatcherStats};
