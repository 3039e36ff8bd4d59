//! The search engine: narrowing, matching, ranking, caching.
//!
//! A query runs as a pipeline:
//!
//! 1. **validate** - empty text and disabled modes are rejected before any
//!    work happens
//! 2. **result cache** - a fingerprint of (normalized query, mode, filter
//!    set) is checked against the cache; entries are only served at the
//!    index epoch they were computed at
//! 3. **narrow** - the declarative filters (size, dates, extensions,
//!    drives, excluded paths) intersect against the sorted indexes
//! 4. **match** - the mode's matcher scores the surviving candidates,
//!    optionally partitioned across the rayon pool (the parallel path
//!    produces identical output - same order, same scores)
//! 5. **rank, sort, truncate, highlight** - the relevance mix orders
//!    results with deterministic tie-breaking, then highlight spans are
//!    computed for the survivors only
//!
//! Whole-name lookups take a separate fast path through the bloom filter
//! and the trie ([`lookup_name`](SearchEngine::lookup_name)): a negative
//! bloom answer is conclusive there, because the filter holds exactly the
//! full normalized names. The substring and similarity matchers cannot
//! use that veto - absence of the full query says nothing about interior
//! or approximate matches - so `search` never skips the scan on bloom
//! evidence alone.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use rayon::prelude::*;
use tracing::debug;

use ff_cache::CacheManager;
use ff_core::{
    timestamp_secs, FileId, FileRecord, SearchConfig, SearchMode, SearchQuery, SearchResult,
    SearchResults,
};
use ff_index::{IndexError, MemoryIndex};

use crate::error::QueryError;
use crate::fuzzy::SimilarityCache;
use crate::highlight::highlights_for;
use crate::matcher::{Matcher, RegexCache};
use crate::ranking::{sort_results, Ranker};

/// Engine effectiveness counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Queries executed (cache hits included).
    pub searches: u64,
    /// Queries served from the result cache.
    pub cache_hits: u64,
}

/// The query engine over one memory index.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use ff_core::{SearchConfig, SearchQuery};
/// use ff_engine::SearchEngine;
/// use ff_index::MemoryIndex;
///
/// let index = Arc::new(MemoryIndex::default());
/// let engine = SearchEngine::new(SearchConfig::default(), index);
///
/// let results = engine.search(&SearchQuery::new("report")).unwrap();
/// println!("{} hits in {:?}", results.len(), results.elapsed);
/// ```
pub struct SearchEngine {
    index: Arc<MemoryIndex>,
    cache: Option<Arc<CacheManager>>,
    config: SearchConfig,
    regex_cache: RegexCache,
    similarity_cache: Arc<SimilarityCache>,
    searches: AtomicU64,
    cache_hits: AtomicU64,
}

impl SearchEngine {
    /// Creates an engine without a result cache.
    #[must_use]
    pub fn new(config: SearchConfig, index: Arc<MemoryIndex>) -> Self {
        Self {
            index,
            cache: None,
            config,
            regex_cache: RegexCache::new(),
            similarity_cache: Arc::new(SimilarityCache::new()),
            searches: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
        }
    }

    /// Attaches the cache layer; search results are served and stored
    /// through it.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<CacheManager>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Executes a query.
    ///
    /// # Errors
    ///
    /// [`QueryError::EmptyQuery`], [`QueryError::InvalidRegex`], or
    /// [`QueryError::ModeDisabled`]; none of these touch the index.
    pub fn search(&self, query: &SearchQuery) -> Result<SearchResults, QueryError> {
        let started = Instant::now();
        if query.mode == SearchMode::Fuzzy && !self.config.enable_fuzzy_search {
            return Err(QueryError::ModeDisabled("fuzzy"));
        }

        // Matcher construction validates the query text and pattern.
        let matcher = Matcher::build(query, &self.regex_cache, &self.similarity_cache)?;
        self.searches.fetch_add(1, Ordering::Relaxed);

        let epoch = self.index.epoch();
        let fingerprint = fingerprint(query);
        if let Some(cache) = &self.cache {
            if let Some(mut hit) = cache.get_results(&fingerprint, epoch) {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                hit.elapsed = started.elapsed();
                return Ok(hit);
            }
        }

        // Narrow by the declarative filters, then let the matcher decide.
        let candidate_ids = self.index.filter_ids(query);
        let candidates = self.index.records_for(&candidate_ids);
        let scored = self.run_matcher(&matcher, candidates);

        // Rank.
        let now = timestamp_secs(SystemTime::now());
        let ranker = Ranker::new(
            self.config.ranking,
            &query.text,
            self.index.max_access_count(),
            now,
        );
        let mut results = SearchResults::new(query.text.clone());
        for (record, name_score) in scored {
            let relevance = ranker.relevance(&record, name_score);
            results.push(SearchResult::new(record, relevance));
        }

        sort_results(&mut results, query.sort_order);
        results.truncate(query.max_results.min(self.config.max_results));

        // Highlights only for what survives truncation.
        for result in &mut results.results {
            result.highlights = highlights_for(&result.record.file_name, &matcher);
        }
        results.elapsed = started.elapsed();

        if let Some(cache) = &self.cache {
            cache.put_results(fingerprint, results.clone(), epoch);
        }
        debug!(
            query = %query.text,
            mode = ?query.mode,
            hits = results.len(),
            elapsed_ms = results.elapsed.as_millis() as u64,
            "search complete"
        );
        Ok(results)
    }

    /// Whole-name lookup: records whose normalized name equals `name`.
    ///
    /// The bloom filter answers first; a negative is conclusive for full
    /// names and skips the trie probe entirely.
    #[must_use]
    pub fn lookup_name(&self, name: &str) -> Vec<FileRecord> {
        let normalized = ff_core::normalize_name(name);
        if normalized.is_empty() || !self.index.might_contain_name(&normalized) {
            return Vec::new();
        }
        let ids = self.index.search_by_name(&normalized, true);
        self.index.records_for(&ids)
    }

    /// Marks a result as opened by the user: bumps the record's access
    /// count (which feeds ranking) and drops its stale cache entry.
    ///
    /// # Errors
    ///
    /// [`IndexError::UnknownId`] when the record is gone.
    pub fn record_opened(&self, id: FileId) -> Result<u32, IndexError> {
        let count = self.index.record_opened(id)?;
        if let Some(cache) = &self.cache {
            cache.remove_file(id);
        }
        Ok(count)
    }

    /// Engine counters.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            searches: self.searches.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }

    /// The engine's configuration.
    #[must_use]
    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Scores candidates serially or across the rayon pool.
    ///
    /// Both paths preserve candidate order, so downstream sorting sees
    /// identical input either way.
    fn run_matcher(
        &self,
        matcher: &Matcher,
        candidates: Vec<FileRecord>,
    ) -> Vec<(FileRecord, f64)> {
        if self.config.enable_parallel_search && candidates.len() > 1024 {
            candidates
                .into_par_iter()
                .filter_map(|record| matcher.score(&record).map(|score| (record, score)))
                .collect()
        } else {
            candidates
                .into_iter()
                .filter_map(|record| matcher.score(&record).map(|score| (record, score)))
                .collect()
        }
    }
}

/// The cache key: normalized query, mode, and every filter that affects
/// the result set.
fn fingerprint(query: &SearchQuery) -> String {
    let mut hasher = rustc_hash::FxHasher::default();
    query.include_drives.hash(&mut hasher);
    query.exclude_paths.hash(&mut hasher);
    query.file_types.hash(&mut hasher);
    query.size_range.hash(&mut hasher);
    query.date_range.hash(&mut hasher);
    query.max_results.hash(&mut hasher);
    query.sort_order.hash(&mut hasher);
    query.case_sensitive.hash(&mut hasher);
    query.fuzzy_threshold.to_bits().hash(&mut hasher);
    format!(
        "{}|{:?}|{:016x}",
        ff_core::normalize_name(&query.text),
        query.mode,
        hasher.finish()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use ff_core::SortOrder;
    use std::time::Duration;

    fn engine_with(paths: &[&str]) -> SearchEngine {
        let index = Arc::new(MemoryIndex::new(1024));
        for path in paths {
            index
                .add(FileRecord::new(Utf8PathBuf::from(*path)))
                .expect("add record");
        }
        SearchEngine::new(SearchConfig::default(), index)
    }

    fn names(results: &SearchResults) -> Vec<&str> {
        results
            .results
            .iter()
            .map(|r| r.record.file_name.as_str())
            .collect()
    }

    #[test]
    fn test_empty_query_is_invalid() {
        let engine = engine_with(&["/a.txt"]);
        let result = engine.search(&SearchQuery::new(""));
        assert!(matches!(result, Err(QueryError::EmptyQuery)));
    }

    #[test]
    fn test_exact_search_finds_substrings() {
        let engine = engine_with(&["/report.txt", "/subreport.md", "/other.txt"]);
        let results = engine
            .search(&SearchQuery::new("report").with_mode(SearchMode::Exact))
            .expect("search");
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_wildcard_scenario_name_sorted() {
        let engine = engine_with(&["/root/a.txt", "/root/ab.txt", "/root/ba.txt"]);
        let results = engine
            .search(
                &SearchQuery::new("*a*.txt")
                    .with_mode(SearchMode::Wildcard)
                    .with_sort_order(SortOrder::Name),
            )
            .expect("search");
        assert_eq!(names(&results), ["a.txt", "ab.txt", "ba.txt"]);
    }

    #[test]
    fn test_fuzzy_scenario_threshold() {
        let engine = engine_with(&[
            "/d/document.pdf",
            "/d/documents.zip",
            "/d/docker.md",
            "/d/dog.png",
        ]);
        let results = engine
            .search(
                &SearchQuery::new("docment")
                    .with_mode(SearchMode::Fuzzy)
                    .with_fuzzy_threshold(0.6),
            )
            .expect("search");

        let mut found = names(&results);
        found.sort_unstable();
        assert_eq!(found, ["document.pdf", "documents.zip"]);
    }

    #[test]
    fn test_regex_scenario_case_insensitive() {
        let engine = engine_with(&["/p/photo.jpg", "/p/icon.PNG", "/p/note.txt"]);
        let results = engine
            .search(&SearchQuery::new(r"\.(jpg|png)$").with_mode(SearchMode::Regex))
            .expect("search");

        let mut found = names(&results);
        found.sort_unstable();
        assert_eq!(found, ["icon.PNG", "photo.jpg"]);
    }

    #[test]
    fn test_disabled_fuzzy_mode() {
        let index = Arc::new(MemoryIndex::new(64));
        let config = SearchConfig {
            enable_fuzzy_search: false,
            ..SearchConfig::default()
        };
        let engine = SearchEngine::new(config, index);
        let result = engine.search(&SearchQuery::new("abc").with_mode(SearchMode::Fuzzy));
        assert!(matches!(result, Err(QueryError::ModeDisabled("fuzzy"))));
    }

    #[test]
    fn test_max_results_truncates_but_counts() {
        let paths: Vec<String> = (0..20).map(|i| format!("/f/match{i}.txt")).collect();
        let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
        let engine = engine_with(&refs);

        let results = engine
            .search(
                &SearchQuery::new("match")
                    .with_mode(SearchMode::Exact)
                    .with_max_results(5),
            )
            .expect("search");
        assert_eq!(results.len(), 5);
        assert_eq!(results.total_matches, 20);
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let engine = engine_with(&["/x/same.txt", "/y/same.txt", "/z/same.txt"]);
        let query = SearchQuery::new("same").with_mode(SearchMode::Exact);

        let first = engine.search(&query).expect("search");
        let second = engine.search(&query).expect("search");
        let ids = |r: &SearchResults| {
            r.results.iter().map(|x| x.record.id).collect::<Vec<_>>()
        };
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn test_parallel_matches_serial() {
        let paths: Vec<String> = (0..3000).map(|i| format!("/bulk/file{i}.dat")).collect();
        let refs: Vec<&str> = paths.iter().map(String::as_str).collect();

        let index = Arc::new(MemoryIndex::new(4096));
        for path in &refs {
            index
                .add(FileRecord::new(Utf8PathBuf::from(*path)))
                .expect("add");
        }
        let serial = SearchEngine::new(SearchConfig::default(), Arc::clone(&index));
        let parallel = SearchEngine::new(
            SearchConfig {
                enable_parallel_search: true,
                ..SearchConfig::default()
            },
            index,
        );

        let query = SearchQuery::new("file1").with_mode(SearchMode::Exact);
        let a = serial.search(&query).expect("serial");
        let b = parallel.search(&query).expect("parallel");

        assert_eq!(a.results.len(), b.results.len());
        for (x, y) in a.results.iter().zip(&b.results) {
            assert_eq!(x.record.id, y.record.id);
            assert!((x.score - y.score).abs() < 1e-12);
        }
    }

    #[test]
    fn test_result_cache_round_trip_and_epoch_invalidation() {
        let index = Arc::new(MemoryIndex::new(64));
        index
            .add(FileRecord::new(Utf8PathBuf::from("/a/report.txt")))
            .expect("add");
        let cache = Arc::new(CacheManager::new(100, Duration::from_secs(60)));
        let engine =
            SearchEngine::new(SearchConfig::default(), Arc::clone(&index)).with_cache(cache);

        let query = SearchQuery::new("report").with_mode(SearchMode::Exact);
        let first = engine.search(&query).expect("first");
        let second = engine.search(&query).expect("second");
        assert_eq!(engine.stats().cache_hits, 1);
        assert_eq!(names(&first), names(&second));

        // Any index mutation bumps the epoch and invalidates the entry.
        index
            .add(FileRecord::new(Utf8PathBuf::from("/b/report2.txt")))
            .expect("add");
        let third = engine.search(&query).expect("third");
        assert_eq!(engine.stats().cache_hits, 1);
        assert_eq!(third.len(), 2);
    }

    #[test]
    fn test_declarative_filters_narrow() {
        let index = Arc::new(MemoryIndex::new(64));
        let mut small = FileRecord::new(Utf8PathBuf::from("/a/data.txt"));
        small.size = 10;
        let mut large = FileRecord::new(Utf8PathBuf::from("/a/data_big.txt"));
        large.size = 10_000_000;
        index.add(small).expect("add");
        index.add(large).expect("add");

        let engine = SearchEngine::new(SearchConfig::default(), index);
        let mut query = SearchQuery::new("data").with_mode(SearchMode::Exact);
        query.size_range = ff_core::SizeRange::new(0, 1000);

        let results = engine.search(&query).expect("search");
        assert_eq!(names(&results), ["data.txt"]);
    }

    #[test]
    fn test_lookup_name_uses_bloom_and_trie() {
        let engine = engine_with(&["/a/exact_hit.txt"]);
        assert_eq!(engine.lookup_name("exact_hit.txt").len(), 1);
        assert!(engine.lookup_name("definitely absent name").is_empty());
    }

    #[test]
    fn test_record_opened_feeds_ranking() {
        let engine = engine_with(&["/a/hot.txt", "/b/cold_hot.txt"]);
        let query = SearchQuery::new("hot").with_mode(SearchMode::Exact);

        let before = engine.search(&query).expect("search");
        let hot_id = before
            .results
            .iter()
            .find(|r| r.record.file_name == "cold_hot.txt")
            .map(|r| r.record.id)
            .expect("present");
        for _ in 0..10 {
            engine.record_opened(hot_id).expect("open");
        }

        let after = engine.search(&query).expect("search");
        assert_eq!(after.results[0].record.id, hot_id);
    }

    #[test]
    fn test_highlights_present_on_results() {
        let engine = engine_with(&["/a/report.txt"]);
        let results = engine
            .search(&SearchQuery::new("report").with_mode(SearchMode::Exact))
            .expect("search");
        let spans = &results.results[0].highlights;
        assert_eq!(spans.as_slice(), [(0, 6)]);
    }
}
