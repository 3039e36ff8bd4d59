//! Configuration structures for the fastfind system.
//!
//! Each component reads its own section:
//!
//! - [`IndexingConfig`] - crawler roots, exclusions, parallelism
//! - [`SearchConfig`] - default mode, result caps, ranking weights
//! - [`CacheConfig`] - cache toggle, memory budget, result TTL
//! - [`WatchConfig`] - change watching toggle and coalescing window
//! - [`StoreConfig`] - persistence gateway hints
//!
//! All types implement [`Default`] with working values and deserialize with
//! `#[serde(default)]`, so a partial config file only overrides what it
//! names.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{RankingWeights, SearchMode};

/// Configuration for the crawler.
///
/// # Examples
///
/// ```
/// use ff_core::IndexingConfig;
///
/// let config = IndexingConfig::default();
/// assert_eq!(config.batch_size, 1000);
/// assert!(config.indexing_threads >= 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    /// Drive mounts to crawl. Empty means every available non-removable
    /// drive.
    ///
    /// When non-empty this also restricts the priority phase: well-known
    /// user directories outside the included mounts are not indexed.
    pub include_drives: Vec<Utf8PathBuf>,

    /// Subtrees pruned from the crawl. A directory is skipped (with its
    /// descendants) when its path starts with any of these.
    pub exclude_paths: Vec<Utf8PathBuf>,

    /// Extensions never indexed (lowercase, no leading dot).
    pub exclude_extensions: Vec<String>,

    /// Whether entries with the hidden attribute are indexed.
    pub index_hidden_files: bool,

    /// Whether entries with the system attribute are indexed.
    pub index_system_files: bool,

    /// Crawl worker count. 0 means `max(2, available_parallelism)`,
    /// capped at 32.
    pub indexing_threads: usize,

    /// Records accumulated per worker before a flush to the index and the
    /// persistence gateway.
    pub batch_size: usize,

    /// Files between progress callback invocations.
    pub progress_interval: u64,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            include_drives: Vec::new(),
            exclude_paths: Vec::new(),
            exclude_extensions: Vec::new(),
            index_hidden_files: false,
            index_system_files: false,
            indexing_threads: 0,
            batch_size: 1000,
            progress_interval: 2000,
        }
    }
}

impl IndexingConfig {
    /// Resolves the worker count, applying the default rule for 0.
    #[must_use]
    pub fn effective_threads(&self) -> usize {
        let count = if self.indexing_threads == 0 {
            std::thread::available_parallelism().map_or(2, std::num::NonZeroUsize::get)
        } else {
            self.indexing_threads
        };
        count.clamp(2, 32)
    }
}

/// Configuration for the search engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Mode used when a query does not specify one.
    pub default_mode: SearchMode,

    /// Cap on returned results.
    pub max_results: usize,

    /// Whether fuzzy mode is available at all.
    pub enable_fuzzy_search: bool,

    /// Default similarity cutoff for fuzzy mode, in `[0, 1]`.
    pub fuzzy_threshold: f64,

    /// Whether candidate matching is partitioned across a worker pool.
    pub enable_parallel_search: bool,

    /// Search pool size. 0 means `available_parallelism`.
    pub search_threads: usize,

    /// Relevance mix, normalized before use.
    pub ranking: RankingWeights,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_mode: SearchMode::Fuzzy,
            max_results: 1000,
            enable_fuzzy_search: true,
            fuzzy_threshold: 0.6,
            enable_parallel_search: false,
            search_threads: 0,
            ranking: RankingWeights::default(),
        }
    }
}

/// Configuration for the cache layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master toggle; with this off the result cache is bypassed entirely.
    pub enable_cache: bool,

    /// Soft memory budget in megabytes, split across the file, result, and
    /// children caches.
    pub max_memory_mb: usize,

    /// Seconds a cached result set stays valid without an index change.
    pub result_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_cache: true,
            max_memory_mb: 100,
            result_ttl_secs: 60,
        }
    }
}

/// Configuration for the change watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Whether filesystem watching starts with the index.
    pub enabled: bool,

    /// Coalescing window in milliseconds: events for the same path inside
    /// the window collapse into one.
    pub coalesce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            coalesce_ms: 100,
        }
    }
}

/// Pass-through hints for the persistence gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Where the gateway keeps its data.
    pub database_path: Utf8PathBuf,

    /// Gateway hint: use write-ahead logging.
    pub enable_wal: bool,

    /// Gateway hint: page-cache size.
    pub cache_pages: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: Utf8PathBuf::from("fastfind.db"),
            enable_wal: true,
            cache_pages: 2000,
        }
    }
}

/// Root configuration combining every section.
///
/// # Examples
///
/// ```
/// use ff_core::Config;
///
/// let config = Config::default();
/// assert!(config.validate().is_ok());
///
/// let json = serde_json::to_string_pretty(&config).unwrap();
/// let parsed: Config = serde_json::from_str(&json).unwrap();
/// assert_eq!(config, parsed);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Crawler settings.
    pub indexing: IndexingConfig,
    /// Search engine settings.
    pub search: SearchConfig,
    /// Cache layer settings.
    pub cache: CacheConfig,
    /// Change watcher settings.
    pub watch: WatchConfig,
    /// Persistence gateway hints.
    pub store: StoreConfig,
}

impl Config {
    /// Loads a configuration file, validating the result.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingFile`] when the path does not exist, the parse
    /// and I/O variants on malformed files, and whatever
    /// [`validate`](Config::validate) rejects.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.to_owned()));
        }
        let text = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&text)?;
        config.sanitize();
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// I/O errors from the write.
    pub fn save(&self, path: &Utf8Path) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Lowercases extension filters so comparisons stay case-insensitive.
    pub fn sanitize(&mut self) {
        for ext in &mut self.indexing.exclude_extensions {
            *ext = ext.trim_start_matches('.').to_lowercase();
        }
    }

    /// Checks cross-field consistency.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidOption`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.indexing.batch_size == 0 {
            return Err(ConfigError::invalid_option(
                "indexing.batch_size",
                "must be at least 1",
            ));
        }
        if self.indexing.indexing_threads > 32 {
            return Err(ConfigError::invalid_option(
                "indexing.indexing_threads",
                "must be at most 32",
            ));
        }
        if !(0.0..=1.0).contains(&self.search.fuzzy_threshold) {
            return Err(ConfigError::invalid_option(
                "search.fuzzy_threshold",
                "must be within [0, 1]",
            ));
        }
        if self.search.max_results == 0 {
            return Err(ConfigError::invalid_option(
                "search.max_results",
                "must be at least 1",
            ));
        }
        if !self.search.ranking.is_valid() {
            return Err(ConfigError::invalid_option(
                "search.ranking",
                "weights must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_effective_threads_clamps() {
        let mut config = IndexingConfig::default();
        assert!(config.effective_threads() >= 2);
        assert!(config.effective_threads() <= 32);

        config.indexing_threads = 1;
        assert_eq!(config.effective_threads(), 2);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let json = r#"{"indexing": {"batch_size": 500}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.indexing.batch_size, 500);
        assert_eq!(config.indexing.progress_interval, 2000);
        assert_eq!(config.watch.coalesce_ms, 100);
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut config = Config::default();
        config.search.fuzzy_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sanitize_lowercases_extensions() {
        let mut config = Config::default();
        config.indexing.exclude_extensions = vec![".TMP".to_owned(), "Log".to_owned()];
        config.sanitize();
        assert_eq!(config.indexing.exclude_extensions, ["tmp", "log"]);
    }

    #[test]
    fn test_load_save_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        let utf8 = camino::Utf8Path::from_path(&path).expect("utf8");

        let mut config = Config::default();
        config.indexing.exclude_extensions = vec!["iso".to_owned()];
        config.save(utf8).expect("save");

        let loaded = Config::load(utf8).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Utf8Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(ConfigError::MissingFile(_))));
    }
}
