//! Progressive (lazy) directory loading for interactive browsing.
//!
//! Instead of crawling everything up front, the progressive loader
//! materializes one directory at a time: `request` marks a node as loading
//! and hands it to a small worker pool; the workers enumerate the directory
//! and publish a [`DirectoryNode`] snapshot. A bounded LRU of nodes keeps
//! memory flat - evicted directories simply revert to "not loaded".
//!
//! Three background strategies decide what to prefetch after a load
//! completes: breadth-first (siblings), depth-first (first child), or a
//! frequency-weighted strategy fed by recorded navigation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Instant, SystemTime};

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use tracing::{debug, trace};

use ff_cache::LruCache;
use ff_core::{timestamp_secs, FileRecord, FxHashMap, Timestamp, WorkQueue};

/// Worker threads enumerating directories.
const DEFAULT_WORKERS: usize = 2;
/// Directory nodes kept before LRU eviction.
const DEFAULT_NODE_CACHE: usize = 1024;
/// Pending load requests before `request` starts dropping.
const QUEUE_CAPACITY: usize = 256;

/// Where a directory is in its load lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
    /// Never loaded, or evicted since.
    #[default]
    NotLoaded,
    /// Queued or being enumerated right now.
    Loading,
    /// Contents are available.
    Loaded,
    /// The last enumeration failed.
    Error,
}

/// A loaded directory snapshot.
#[derive(Debug, Clone, Default)]
pub struct DirectoryNode {
    /// Absolute path of the directory.
    pub path: Utf8PathBuf,
    /// Leaf name.
    pub name: String,
    /// Load lifecycle state.
    pub state: LoadState,
    /// Immediate subdirectory paths.
    pub subdirs: Vec<Utf8PathBuf>,
    /// Immediate file records.
    pub files: Vec<FileRecord>,
    /// Sum of the immediate files' sizes.
    pub total_size: u64,
    /// When the enumeration ran.
    pub last_scanned: Timestamp,
}

impl DirectoryNode {
    fn pending(path: Utf8PathBuf) -> Self {
        let name = path.file_name().unwrap_or_default().to_owned();
        Self {
            path,
            name,
            state: LoadState::Loading,
            ..Self::default()
        }
    }
}

/// Which neighbours to prefetch after a directory loads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PreloadStrategy {
    /// Load the directory's siblings next.
    #[default]
    BreadthFirst,
    /// Load the directory's first child next.
    DepthFirst,
    /// Load the highest-scoring recorded neighbours next.
    Frequency,
}

/// Per-path navigation history for the frequency strategy.
#[derive(Debug, Default)]
struct AccessHistory {
    counts: FxHashMap<Utf8PathBuf, (u32, Instant)>,
}

impl AccessHistory {
    fn record(&mut self, path: &Utf8Path) {
        let entry = self
            .counts
            .entry(path.to_owned())
            .or_insert((0, Instant::now()));
        entry.0 += 1;
        entry.1 = Instant::now();
    }

    /// Count weighted down by staleness: one point lost per idle minute.
    fn score(&self, path: &Utf8Path) -> f64 {
        self.counts.get(path).map_or(0.0, |(count, last)| {
            let idle_minutes = last.elapsed().as_secs_f64() / 60.0;
            f64::from(*count) - idle_minutes
        })
    }
}

#[derive(Debug)]
struct LoaderShared {
    nodes: Mutex<LruCache<Utf8PathBuf, DirectoryNode>>,
    queue: WorkQueue<Utf8PathBuf>,
    history: Mutex<AccessHistory>,
    background: AtomicBool,
    strategy: Mutex<PreloadStrategy>,
}

/// The progressive directory loader.
///
/// # Examples
///
/// ```no_run
/// use camino::{Utf8Path, Utf8PathBuf};
/// use ff_scanner::{LoadState, ProgressiveLoader};
///
/// let loader = ProgressiveLoader::new(2);
/// loader.request(Utf8PathBuf::from("/home/anna"));
///
/// // Some time later the node is available:
/// while loader.state(Utf8Path::new("/home/anna")) == LoadState::Loading {
///     std::thread::sleep(std::time::Duration::from_millis(10));
/// }
/// let node = loader.node(Utf8Path::new("/home/anna")).unwrap();
/// println!("{} files", node.files.len());
/// ```
#[derive(Debug)]
pub struct ProgressiveLoader {
    shared: Arc<LoaderShared>,
    workers: Vec<JoinHandle<()>>,
}

impl Default for ProgressiveLoader {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

impl ProgressiveLoader {
    /// Starts a loader with `workers` enumeration threads (minimum 1).
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self::with_cache_size(workers, DEFAULT_NODE_CACHE)
    }

    /// Starts a loader with an explicit node-cache bound.
    #[must_use]
    pub fn with_cache_size(workers: usize, cache_size: usize) -> Self {
        let shared = Arc::new(LoaderShared {
            nodes: Mutex::new(LruCache::new(cache_size)),
            queue: WorkQueue::new(QUEUE_CAPACITY),
            history: Mutex::new(AccessHistory::default()),
            background: AtomicBool::new(true),
            strategy: Mutex::new(PreloadStrategy::default()),
        });

        let workers = (0..workers.max(1))
            .filter_map(|i| {
                let shared = Arc::clone(&shared);
                std::thread::Builder::new()
                    .name(format!("ff-progressive-{i}"))
                    .spawn(move || worker_loop(&shared))
                    .ok()
            })
            .collect();

        Self { shared, workers }
    }

    /// Queues a directory for loading.
    ///
    /// Returns `false` when the node is already loading/loaded or the
    /// queue is saturated.
    pub fn request(&self, path: Utf8PathBuf) -> bool {
        let mut nodes = self.shared.nodes.lock();
        match nodes.peek(&path).map(|node| node.state) {
            Some(LoadState::Loading | LoadState::Loaded) => return false,
            _ => {}
        }
        nodes.put(path.clone(), DirectoryNode::pending(path.clone()));
        drop(nodes);
        self.shared.queue.push(path)
    }

    /// The load state of a path; evicted or never-seen paths are
    /// [`LoadState::NotLoaded`].
    #[must_use]
    pub fn state(&self, path: &Utf8Path) -> LoadState {
        self.shared
            .nodes
            .lock()
            .peek(&path.to_owned())
            .map_or(LoadState::NotLoaded, |node| node.state)
    }

    /// Returns the node snapshot for a path, promoting it in the cache.
    #[must_use]
    pub fn node(&self, path: &Utf8Path) -> Option<DirectoryNode> {
        self.shared.nodes.lock().get(&path.to_owned())
    }

    /// Records a user navigation for the frequency strategy.
    pub fn record_access(&self, path: &Utf8Path) {
        self.shared.history.lock().record(path);
    }

    /// Switches the background preload strategy.
    pub fn set_strategy(&self, strategy: PreloadStrategy) {
        *self.shared.strategy.lock() = strategy;
    }

    /// Enables or disables background preloading.
    pub fn set_background_loading(&self, enabled: bool) {
        self.shared.background.store(enabled, Ordering::Relaxed);
    }

    /// Number of cached directory nodes.
    #[must_use]
    pub fn cached_nodes(&self) -> usize {
        self.shared.nodes.lock().len()
    }

    /// Drops every cached node (states revert to not-loaded).
    pub fn clear(&self) {
        self.shared.nodes.lock().clear();
    }

    /// Stops the workers and joins them; queued requests are abandoned.
    pub fn shutdown(mut self) {
        self.shared.queue.shutdown();
        self.shared.queue.clear();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for ProgressiveLoader {
    fn drop(&mut self) {
        self.shared.queue.shutdown();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(shared: &LoaderShared) {
    while let Some(path) = shared.queue.pop() {
        let loaded = enumerate(&path);
        let state = loaded.state;

        let preload = if state == LoadState::Loaded
            && shared.background.load(Ordering::Relaxed)
        {
            preload_targets(shared, &loaded)
        } else {
            Vec::new()
        };

        shared.nodes.lock().put(path.clone(), loaded);
        trace!(%path, ?state, "directory load finished");

        for target in preload {
            // Workers are also the queue's consumers; never block on a
            // full queue for an optional prefetch.
            if shared.queue.len() * 2 >= QUEUE_CAPACITY {
                break;
            }
            let mut nodes = shared.nodes.lock();
            let already = matches!(
                nodes.peek(&target).map(|n| n.state),
                Some(LoadState::Loading | LoadState::Loaded)
            );
            if !already {
                nodes.put(target.clone(), DirectoryNode::pending(target.clone()));
                drop(nodes);
                if !shared.queue.push(target) {
                    break;
                }
            }
        }
    }
    debug!("progressive worker stopped");
}

/// Enumerates one directory into a node snapshot.
fn enumerate(path: &Utf8Path) -> DirectoryNode {
    let mut node = DirectoryNode::pending(path.to_owned());
    let entries = match path.read_dir_utf8() {
        Ok(entries) => entries,
        Err(error) => {
            debug!(%path, %error, "directory enumeration failed");
            node.state = LoadState::Error;
            return node;
        }
    };

    for entry in entries {
        let Ok(entry) = entry else {
            continue;
        };
        let entry_path = entry.path();
        match entry.file_type() {
            Ok(file_type) if file_type.is_dir() => {
                node.subdirs.push(entry_path.to_owned());
            }
            Ok(_) => {
                if let Ok(record) = FileRecord::from_path(entry_path) {
                    node.total_size += record.size;
                    node.files.push(record);
                }
            }
            Err(_) => continue,
        }
    }

    node.subdirs.sort();
    node.files
        .sort_by(|a, b| a.normalized_name.cmp(&b.normalized_name));
    node.state = LoadState::Loaded;
    node.last_scanned = timestamp_secs(SystemTime::now());
    node
}

/// Picks the next paths to prefetch for a freshly loaded node.
fn preload_targets(shared: &LoaderShared, node: &DirectoryNode) -> Vec<Utf8PathBuf> {
    let strategy = *shared.strategy.lock();
    match strategy {
        PreloadStrategy::DepthFirst => node.subdirs.first().cloned().into_iter().collect(),
        PreloadStrategy::BreadthFirst => {
            let Some(parent) = node.path.parent() else {
                return Vec::new();
            };
            let nodes = shared.nodes.lock();
            nodes
                .peek(&parent.to_owned())
                .map(|parent_node| {
                    parent_node
                        .subdirs
                        .iter()
                        .filter(|sibling| sibling.as_path() != node.path.as_path())
                        .take(4)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        }
        PreloadStrategy::Frequency => {
            let history = shared.history.lock();
            let mut scored: Vec<(f64, Utf8PathBuf)> = node
                .subdirs
                .iter()
                .map(|child| (history.score(child), child.clone()))
                .collect();
            scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
            scored
                .into_iter()
                .take(2)
                .filter(|(score, _)| *score > 0.0)
                .map(|(_, path)| path)
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    fn utf8(path: &std::path::Path) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path.to_path_buf()).expect("utf8 path")
    }

    fn wait_until_loaded(loader: &ProgressiveLoader, path: &Utf8Path) -> DirectoryNode {
        for _ in 0..200 {
            match loader.state(path) {
                LoadState::Loaded | LoadState::Error => break,
                _ => std::thread::sleep(Duration::from_millis(5)),
            }
        }
        loader.node(path).expect("node present")
    }

    #[test]
    fn test_request_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("child")).expect("mkdir");
        fs::write(dir.path().join("a.txt"), b"abc").expect("write");

        let loader = ProgressiveLoader::new(1);
        let path = utf8(dir.path());
        assert!(loader.request(path.clone()));

        let node = wait_until_loaded(&loader, &path);
        assert_eq!(node.state, LoadState::Loaded);
        assert_eq!(node.files.len(), 1);
        assert_eq!(node.subdirs.len(), 1);
        assert_eq!(node.total_size, 3);

        loader.shutdown();
    }

    #[test]
    fn test_duplicate_request_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loader = ProgressiveLoader::new(1);
        let path = utf8(dir.path());

        assert!(loader.request(path.clone()));
        wait_until_loaded(&loader, &path);
        assert!(!loader.request(path.clone()));

        loader.shutdown();
    }

    #[test]
    fn test_missing_directory_marks_error() {
        let loader = ProgressiveLoader::new(1);
        let path = Utf8PathBuf::from("/definitely/not/here");
        loader.request(path.clone());

        let node = wait_until_loaded(&loader, &path);
        assert_eq!(node.state, LoadState::Error);

        loader.shutdown();
    }

    #[test]
    fn test_eviction_reverts_to_not_loaded() {
        let parent = tempfile::tempdir().expect("tempdir");
        let a = parent.path().join("a");
        let b = parent.path().join("b");
        fs::create_dir(&a).expect("mkdir");
        fs::create_dir(&b).expect("mkdir");

        let loader = ProgressiveLoader::with_cache_size(1, 1);
        loader.set_background_loading(false);

        loader.request(utf8(&a));
        wait_until_loaded(&loader, &utf8(&a));
        loader.request(utf8(&b));
        wait_until_loaded(&loader, &utf8(&b));

        // The single-slot cache evicted `a`.
        assert_eq!(loader.state(&utf8(&a)), LoadState::NotLoaded);
        assert_eq!(loader.state(&utf8(&b)), LoadState::Loaded);

        loader.shutdown();
    }

    #[test]
    fn test_depth_first_preloads_first_child() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("aaa")).expect("mkdir");
        fs::create_dir(dir.path().join("bbb")).expect("mkdir");

        let loader = ProgressiveLoader::new(1);
        loader.set_strategy(PreloadStrategy::DepthFirst);

        let path = utf8(dir.path());
        loader.request(path.clone());
        wait_until_loaded(&loader, &path);

        let first_child = utf8(&dir.path().join("aaa"));
        wait_until_loaded(&loader, &first_child);
        assert_eq!(loader.state(&first_child), LoadState::Loaded);

        loader.shutdown();
    }

    #[test]
    fn test_frequency_strategy_uses_history() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("hot")).expect("mkdir");
        fs::create_dir(dir.path().join("cold")).expect("mkdir");

        let loader = ProgressiveLoader::new(1);
        loader.set_strategy(PreloadStrategy::Frequency);

        let hot = utf8(&dir.path().join("hot"));
        for _ in 0..5 {
            loader.record_access(&hot);
        }

        let path = utf8(dir.path());
        loader.request(path.clone());
        wait_until_loaded(&loader, &path);

        wait_until_loaded(&loader, &hot);
        assert_eq!(loader.state(&hot), LoadState::Loaded);
        assert_eq!(loader.state(&utf8(&dir.path().join("cold"))), LoadState::NotLoaded);

        loader.shutdown();
    }
}
