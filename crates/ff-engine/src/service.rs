//! The service facade tying the core together.
//!
//! [`IndexService`] owns one of everything: the memory index, the cache
//! layer, the persistence writer, the crawler, the (optional) watch
//! service, and the search engine. Front-ends - the CLI here, a GUI
//! elsewhere - drive this type and nothing below it.
//!
//! Lifecycle: construct (hydrates from the store), `build_index`, then
//! serve `search` calls while the watcher keeps the index live;
//! `shutdown` stops watching, cancels any crawl, and drains the
//! persistence queue.

use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use tracing::{info, warn};

use ff_cache::{CacheManager, ManagerStats};
use ff_core::{
    Config, FileId, FileRecord, IndexStatistics, SearchQuery, SearchResults,
};
use ff_index::{IndexError, MemoryIndex};
use ff_scanner::{CompletionFn, ProgressFn, ScanError, ScanOutcome, Scanner, StatsSnapshot};
use ff_store::{BatchWriter, MemoryStore, StoreError, StoreGateway, SCHEMA_VERSION};
use ff_watcher::{EventCallback, EventFilter, WatchError, WatchService, WatcherStats};

use crate::engine::{EngineStats, SearchEngine};
use crate::error::QueryError;

/// Records loaded from the store per index batch during hydration.
const HYDRATION_BATCH: usize = 1000;

/// Errors surfaced by the service facade.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A query was rejected.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The crawler failed outright (not per-entry).
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The watcher could not start.
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// The persistence gateway failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The index reported an integrity violation.
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// A combined statistics snapshot across every component.
#[derive(Debug, Clone, Default)]
pub struct ServiceStats {
    /// Memory-index totals.
    pub index: IndexStatistics,
    /// Crawl counters.
    pub scan: StatsSnapshot,
    /// Watcher counters, when watching.
    pub watcher: Option<WatcherStats>,
    /// Cache-layer counters.
    pub cache: ManagerStats,
    /// Engine counters.
    pub engine: EngineStats,
    /// Store batches flushed successfully.
    pub store_batches_written: u64,
    /// Store batches dropped after retries.
    pub store_batches_failed: u64,
    /// Estimated index memory in bytes.
    pub index_memory_bytes: usize,
}

/// The assembled core.
///
/// # Examples
///
/// ```no_run
/// use ff_core::{Config, SearchQuery};
/// use ff_engine::IndexService;
///
/// let service = IndexService::new(Config::default()).unwrap();
/// service.build_index().unwrap();
///
/// let results = service.search(&SearchQuery::new("invoice")).unwrap();
/// for hit in &results.results {
///     println!("{}  {:.2}", hit.record.full_path, hit.score);
/// }
/// service.shutdown();
/// ```
pub struct IndexService {
    config: Config,
    index: Arc<MemoryIndex>,
    cache: Arc<CacheManager>,
    writer: Arc<BatchWriter>,
    engine: SearchEngine,
    scanner: Scanner,
    watch: Mutex<Option<WatchService>>,
    on_change: Option<Arc<EventCallback>>,
}

impl IndexService {
    /// Builds a service over an in-process store.
    ///
    /// # Errors
    ///
    /// See [`IndexService::with_store`].
    pub fn new(config: Config) -> Result<Self, ServiceError> {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    /// Builds a service over the given persistence gateway, hydrating the
    /// memory index from it.
    ///
    /// Stored record ids are preserved exactly, so ids remain stable
    /// across restarts.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Store`] when the store is unreadable, reports a
    /// newer schema than this build supports, or the writer thread cannot
    /// start.
    pub fn with_store(
        config: Config,
        store: Arc<dyn StoreGateway>,
    ) -> Result<Self, ServiceError> {
        let version = store.schema_version()?;
        if version < SCHEMA_VERSION {
            info!(from = version, to = SCHEMA_VERSION, "upgrading store schema");
            store.upgrade(version, SCHEMA_VERSION)?;
        } else if version > SCHEMA_VERSION {
            return Err(ServiceError::Store(StoreError::SchemaVersion {
                found: version,
                supported: SCHEMA_VERSION,
            }));
        }

        let index = Arc::new(MemoryIndex::default());
        for drive in store.load_all_drives()? {
            index.add_drive(drive);
        }
        let mut hydrated = 0usize;
        let mut batch = Vec::with_capacity(HYDRATION_BATCH);
        for record in store.load_all_records()? {
            batch.push(record);
            if batch.len() >= HYDRATION_BATCH {
                hydrated += index.add_batch(std::mem::take(&mut batch)).len();
            }
        }
        hydrated += index.add_batch(batch).len();
        if hydrated > 0 {
            info!(records = hydrated, "hydrated index from store");
        }

        let cache = Arc::new(CacheManager::with_budget_mb(
            config.cache.max_memory_mb,
            Duration::from_secs(config.cache.result_ttl_secs),
        ));
        let writer = Arc::new(BatchWriter::spawn(store)?);

        let mut engine = SearchEngine::new(config.search.clone(), Arc::clone(&index));
        if config.cache.enable_cache {
            engine = engine.with_cache(Arc::clone(&cache));
        }
        let scanner = Scanner::new(config.indexing.clone(), Arc::clone(&index))
            .with_writer(Arc::clone(&writer));

        Ok(Self {
            config,
            index,
            cache,
            writer,
            engine,
            scanner,
            watch: Mutex::new(None),
            on_change: None,
        })
    }

    /// Installs the crawl progress callback.
    pub fn set_progress_callback(&mut self, callback: Arc<ProgressFn>) {
        self.scanner.set_progress_callback(callback);
    }

    /// Installs the crawl completion callback.
    pub fn set_completion_callback(&mut self, callback: Arc<CompletionFn>) {
        self.scanner.set_completion_callback(callback);
    }

    /// Installs the change-event callback (effective at the next
    /// [`start_watching`](Self::start_watching)).
    pub fn set_change_callback(&mut self, callback: Arc<EventCallback>) {
        self.on_change = Some(callback);
    }

    /// Runs the full two-phase crawl and persists the drive table.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Scan`] on hard crawl failure; cancellation is a
    /// clean outcome, not an error.
    pub fn build_index(&self) -> Result<ScanOutcome, ServiceError> {
        let outcome = self.scanner.scan()?;
        self.writer.enqueue_drives(self.index.drives());
        Ok(outcome)
    }

    /// Clears everything and crawls from scratch.
    ///
    /// # Errors
    ///
    /// As [`build_index`](Self::build_index).
    pub fn rebuild_index(&self) -> Result<ScanOutcome, ServiceError> {
        self.index.clear();
        self.cache.clear();
        self.build_index()
    }

    /// Starts the change watcher over the configured roots.
    ///
    /// A second call while watching is a no-op.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Watch`] when a root is missing or the OS backend
    /// refuses.
    pub fn start_watching(&self) -> Result<(), ServiceError> {
        let mut watch = self.watch.lock();
        if watch.is_some() {
            return Ok(());
        }
        let roots = self.watch_roots();
        let service = WatchService::start(
            &roots,
            EventFilter::from_config(&self.config.indexing),
            Duration::from_millis(self.config.watch.coalesce_ms),
            Arc::clone(&self.index),
            Some(Arc::clone(&self.writer)),
            self.on_change.clone(),
        )?;
        *watch = Some(service);
        Ok(())
    }

    /// Stops the change watcher, draining its queue.
    pub fn stop_watching(&self) {
        if let Some(service) = self.watch.lock().take() {
            service.stop();
        }
    }

    /// Returns `true` while the watcher is running.
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.watch.lock().is_some()
    }

    /// Executes a query.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Query`] for invalid queries.
    pub fn search(&self, query: &SearchQuery) -> Result<SearchResults, ServiceError> {
        Ok(self.engine.search(query)?)
    }

    /// Whole-name lookup via the bloom/trie fast path.
    #[must_use]
    pub fn lookup_name(&self, name: &str) -> Vec<FileRecord> {
        self.engine.lookup_name(name)
    }

    /// The record at `path`, if indexed.
    #[must_use]
    pub fn get_by_path(&self, path: &Utf8Path) -> Option<FileRecord> {
        self.index.get_by_path(path)
    }

    /// Marks a search result as opened by the user.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Index`] when the record no longer exists.
    pub fn record_opened(&self, id: FileId) -> Result<u32, ServiceError> {
        Ok(self.engine.record_opened(id)?)
    }

    /// Pauses the crawl in flight.
    pub fn pause_indexing(&self) {
        self.scanner.pause();
    }

    /// Resumes a paused crawl.
    pub fn resume_indexing(&self) {
        self.scanner.resume();
    }

    /// Requests cooperative cancellation of the crawl in flight.
    pub fn stop_indexing(&self) {
        self.scanner.request_stop();
    }

    /// A statistics snapshot across every component.
    #[must_use]
    pub fn statistics(&self) -> ServiceStats {
        ServiceStats {
            index: self.index.statistics(),
            scan: self.scanner.stats().snapshot(),
            watcher: self.watch.lock().as_ref().map(WatchService::stats),
            cache: self.cache.statistics(),
            engine: self.engine.stats(),
            store_batches_written: self.writer.batches_written(),
            store_batches_failed: self.writer.batches_failed(),
            index_memory_bytes: self.index.estimated_memory_usage(),
        }
    }

    /// Walks every index invariant.
    ///
    /// # Errors
    ///
    /// [`IndexError::Integrity`] carrying the violation list.
    pub fn validate(&self) -> Result<(), ServiceError> {
        let violations = self.index.validate_integrity();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Index(IndexError::Integrity(violations)))
        }
    }

    /// The shared memory index (read paths for front-ends).
    #[must_use]
    pub fn index(&self) -> &Arc<MemoryIndex> {
        &self.index
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Stops watching, cancels crawling, and drains the persistence
    /// queue.
    pub fn shutdown(self) {
        self.stop_watching();
        self.scanner.request_stop();
        drop(self.scanner);
        drop(self.engine);
        match Arc::try_unwrap(self.writer) {
            Ok(writer) => writer.shutdown(),
            Err(_) => warn!("store writer still shared at shutdown; draining via drop"),
        }
        info!("service shut down");
    }

    fn watch_roots(&self) -> Vec<Utf8PathBuf> {
        if self.config.indexing.include_drives.is_empty() {
            vec![default_watch_root()]
        } else {
            self.config.indexing.include_drives.clone()
        }
    }
}

#[cfg(windows)]
fn default_watch_root() -> Utf8PathBuf {
    Utf8PathBuf::from("C:\\")
}

#[cfg(not(windows))]
fn default_watch_root() -> Utf8PathBuf {
    Utf8PathBuf::from("/")
}
