//! Parallel filesystem crawler for the fastfind search system.
//!
//! Two ways to populate the index live here:
//!
//! - [`Scanner`] - the full two-phase crawl (priority user directories,
//!   then one worker per root), with batching, pause/resume, cooperative
//!   cancellation, and progress reporting
//! - [`ProgressiveLoader`] - lazy per-directory loading for interactive
//!   browsing, with LRU-bounded nodes and background prefetch strategies
//!
//! Shared pieces: [`RootWalker`] (one root's traversal with the exclusion
//! rules) and [`ScanStats`] (atomic crawl counters).

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod progressive;
pub mod scanner;
pub mod stats;
pub mod walker;

pub use error::ScanError;
pub use progressive::{DirectoryNode, LoadState, PreloadStrategy, ProgressiveLoader};
pub use scanner::{CompletionFn, PauseGate, ProgressFn, ScanOutcome, Scanner};
pub use stats::{ScanStats, StatsSnapshot};
pub use walker::{RootWalker, ScanFilter, SYSTEM_ROOT_DIRECTORIES};
