//! Event-storm coalescing.
//!
//! Editors and build tools emit bursts: a save can be a dozen modifies, a
//! compile touches hundreds of paths, a rename often arrives as several
//! partial notifications. The [`Coalescer`] holds each path's latest event
//! until it has been quiet for one window (default 100ms), merging along
//! the way:
//!
//! - repeated events on a path collapse into the last one
//! - a create followed by a delete inside the window cancels out
//! - rename chains (`a→b`, `b→c`) collapse into one rename (`a→c`)
//! - a create followed by a rename becomes a create at the final path

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;

use ff_core::FxHashMap;

use crate::events::{ChangeEvent, ChangeKind};

/// Default quiet window before an event is released.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(100);

/// The coalescing buffer between the OS queue and the index.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use ff_watcher::{ChangeEvent, Coalescer};
/// use std::time::Duration;
///
/// let mut coalescer = Coalescer::new(Duration::from_millis(0));
/// for _ in 0..10 {
///     coalescer.push(ChangeEvent::modified(Utf8PathBuf::from("/a.txt")));
/// }
/// // Ten rapid modifies leave exactly one pending event.
/// assert_eq!(coalescer.flush().len(), 1);
/// ```
#[derive(Debug)]
pub struct Coalescer {
    window: Duration,
    pending: FxHashMap<Utf8PathBuf, ChangeEvent>,
    /// Arrival order of pending paths; drained front-first.
    order: VecDeque<Utf8PathBuf>,
}

impl Coalescer {
    /// Creates a coalescer with the given quiet window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: FxHashMap::default(),
            order: VecDeque::new(),
        }
    }

    /// Merges one event into the pending set.
    pub fn push(&mut self, event: ChangeEvent) {
        // Rename chains: if the rename's source is itself pending, merge.
        if event.is_relocation() {
            if let Some(old_path) = event.old_path.clone() {
                if let Some(prior) = self.take(&old_path) {
                    match prior.kind {
                        // created a, renamed a->b  =>  created b
                        ChangeKind::Created => {
                            self.insert(ChangeEvent::created(event.path.clone()));
                            return;
                        }
                        // renamed o->a, renamed a->b  =>  renamed o->b
                        ChangeKind::Renamed | ChangeKind::Moved => {
                            let origin = prior.old_path.unwrap_or(old_path);
                            let mut merged = event;
                            merged.old_path = Some(origin);
                            self.insert(merged);
                            return;
                        }
                        // Any other pending event on the source is
                        // superseded by the relocation.
                        _ => {}
                    }
                }
            }
        }

        if let Some(prior) = self.take(&event.path) {
            // create + delete inside the window cancel out entirely.
            if prior.kind == ChangeKind::Created && event.kind == ChangeKind::Deleted {
                return;
            }
            // A modified create is still a create.
            if prior.kind == ChangeKind::Created && event.kind == ChangeKind::Modified {
                self.insert(ChangeEvent::created(event.path));
                return;
            }
        }
        self.insert(event);
    }

    /// Releases events that have been quiet for a full window.
    ///
    /// Returned events are in arrival order of their path's first pending
    /// event.
    pub fn drain_ready(&mut self, now: Instant) -> Vec<ChangeEvent> {
        let mut ready = Vec::new();
        loop {
            // Cancelled or re-slotted events leave stale order entries;
            // skip them before gating on the front.
            while let Some(path) = self.order.front() {
                if self.pending.contains_key(path) {
                    break;
                }
                self.order.pop_front();
            }
            let Some(front) = self.order.front() else {
                break;
            };
            let release = self
                .pending
                .get(front)
                .is_some_and(|event| now.duration_since(event.timestamp) >= self.window);
            if !release {
                // The front gate keeps released output in arrival order.
                break;
            }
            if let Some(path) = self.order.pop_front() {
                if let Some(event) = self.pending.remove(&path) {
                    ready.push(event);
                }
            }
        }
        ready
    }

    /// Releases everything regardless of age (shutdown path).
    pub fn flush(&mut self) -> Vec<ChangeEvent> {
        let mut out = Vec::with_capacity(self.pending.len());
        while let Some(path) = self.order.pop_front() {
            if let Some(event) = self.pending.remove(&path) {
                out.push(event);
            }
        }
        self.pending.clear();
        out
    }

    /// Number of paths with a pending event.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn take(&mut self, path: &Utf8PathBuf) -> Option<ChangeEvent> {
        self.pending.remove(path)
    }

    fn insert(&mut self, event: ChangeEvent) {
        if !self.pending.contains_key(&event.path) {
            self.order.push_back(event.path.clone());
        }
        self.pending.insert(event.path.clone(), event);
    }
}

impl Default for Coalescer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> Utf8PathBuf {
        Utf8PathBuf::from(s)
    }

    fn immediate() -> Coalescer {
        Coalescer::new(Duration::from_millis(0))
    }

    #[test]
    fn test_storm_collapses_to_last_event() {
        let mut coalescer = immediate();
        for _ in 0..100 {
            coalescer.push(ChangeEvent::modified(path("/a.txt")));
        }
        let out = coalescer.flush();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, ChangeKind::Modified);
    }

    #[test]
    fn test_create_then_delete_cancels() {
        let mut coalescer = immediate();
        coalescer.push(ChangeEvent::created(path("/tmp.swp")));
        coalescer.push(ChangeEvent::deleted(path("/tmp.swp")));
        assert!(coalescer.flush().is_empty());
    }

    #[test]
    fn test_delete_then_create_keeps_create() {
        let mut coalescer = immediate();
        coalescer.push(ChangeEvent::deleted(path("/a.txt")));
        coalescer.push(ChangeEvent::created(path("/a.txt")));
        let out = coalescer.flush();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, ChangeKind::Created);
    }

    #[test]
    fn test_create_then_modify_stays_create() {
        let mut coalescer = immediate();
        coalescer.push(ChangeEvent::created(path("/a.txt")));
        coalescer.push(ChangeEvent::modified(path("/a.txt")));
        let out = coalescer.flush();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, ChangeKind::Created);
    }

    #[test]
    fn test_rename_chain_collapses() {
        let mut coalescer = immediate();
        coalescer.push(ChangeEvent::renamed(path("/a"), path("/b")));
        coalescer.push(ChangeEvent::renamed(path("/b"), path("/c")));

        let out = coalescer.flush();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, ChangeKind::Renamed);
        assert_eq!(out[0].old_path.as_deref().map(|p| p.as_str()), Some("/a"));
        assert_eq!(out[0].path.as_str(), "/c");
    }

    #[test]
    fn test_create_then_rename_becomes_create_at_target() {
        let mut coalescer = immediate();
        coalescer.push(ChangeEvent::created(path("/a.tmp")));
        coalescer.push(ChangeEvent::renamed(path("/a.tmp"), path("/a.txt")));

        let out = coalescer.flush();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, ChangeKind::Created);
        assert_eq!(out[0].path.as_str(), "/a.txt");
    }

    #[test]
    fn test_distinct_paths_kept_in_arrival_order() {
        let mut coalescer = immediate();
        coalescer.push(ChangeEvent::modified(path("/a")));
        coalescer.push(ChangeEvent::modified(path("/b")));
        coalescer.push(ChangeEvent::modified(path("/c")));

        let out = coalescer.flush();
        let paths: Vec<&str> = out.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["/a", "/b", "/c"]);
    }

    #[test]
    fn test_drain_ready_respects_window() {
        let mut coalescer = Coalescer::new(Duration::from_millis(50));
        coalescer.push(ChangeEvent::modified(path("/a")));

        // Too fresh to release.
        assert!(coalescer.drain_ready(Instant::now()).is_empty());
        assert_eq!(coalescer.pending_len(), 1);

        // Old enough.
        let later = Instant::now() + Duration::from_millis(60);
        let out = coalescer.drain_ready(later);
        assert_eq!(out.len(), 1);
        assert!(coalescer.is_empty());
    }
}
