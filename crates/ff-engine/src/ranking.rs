//! Relevance scoring.
//!
//! The final score for a result is a weighted sum of five components:
//!
//! ```text
//! relevance = w_name   * matcher score
//!           + w_path   * query coverage of the full path
//!           + w_access * log-scaled historical access count
//!           + w_recent * modification recency (30-day ramp)
//!           + w_size   * typical-size boost
//! ```
//!
//! Weights are normalized to sum to 1 before use, so configurations only
//! express proportions.

use ff_core::{normalize_name, FileRecord, RankingWeights, SearchResults, SortOrder, Timestamp};

/// The recency ramp: scores decay to zero over thirty days.
const RECENCY_WINDOW_SECS: f64 = 30.0 * 86_400.0;
/// Typical-size plateau bounds, as log10 of bytes (1 KB to 10 MB).
const SIZE_PLATEAU_LO: f64 = 3.0;
const SIZE_PLATEAU_HI: f64 = 7.0;
/// How many decades outside the plateau the boost takes to reach zero.
const SIZE_FALLOFF_DECADES: f64 = 3.0;

/// A per-query scorer with the context the components need.
#[derive(Debug, Clone)]
pub struct Ranker {
    weights: RankingWeights,
    normalized_query: String,
    max_access_count: u32,
    now: Timestamp,
}

impl Ranker {
    /// Creates a ranker for one query execution.
    #[must_use]
    pub fn new(
        mut weights: RankingWeights,
        query_text: &str,
        max_access_count: u32,
        now: Timestamp,
    ) -> Self {
        weights.normalize();
        Self {
            weights,
            normalized_query: normalize_name(query_text),
            max_access_count,
            now,
        }
    }

    /// The combined relevance for a record with a given matcher score.
    #[must_use]
    pub fn relevance(&self, record: &FileRecord, name_score: f64) -> f64 {
        let score = self.weights.name * name_score
            + self.weights.path * self.path_score(record)
            + self.weights.access * self.access_score(record)
            + self.weights.recency * self.recency_score(record)
            + self.weights.size * size_score(record.size);
        score.clamp(0.0, 1.0)
    }

    /// Query coverage of the full path: occurrence count times query
    /// length over path length, capped at 1.
    fn path_score(&self, record: &FileRecord) -> f64 {
        if self.normalized_query.is_empty() {
            return 0.0;
        }
        let path = record.full_path.as_str().to_lowercase();
        if path.is_empty() {
            return 0.0;
        }
        let occurrences = path.matches(&self.normalized_query).count();
        let covered = occurrences * self.normalized_query.len();
        (covered as f64 / path.len() as f64).min(1.0)
    }

    /// `log(1 + count) / log(1 + max_count)` over the current index.
    fn access_score(&self, record: &FileRecord) -> f64 {
        if self.max_access_count == 0 {
            return 0.0;
        }
        f64::from(record.access_count).ln_1p() / f64::from(self.max_access_count).ln_1p()
    }

    /// `1 − min(1, age / 30 days)`.
    fn recency_score(&self, record: &FileRecord) -> f64 {
        let age = (self.now - record.last_modified).max(0) as f64;
        1.0 - (age / RECENCY_WINDOW_SECS).min(1.0)
    }
}

/// Typical-size boost: full marks from 1 KB to 10 MB, ramping to zero for
/// empty files and multi-gigabyte blobs.
#[must_use]
pub fn size_score(size: u64) -> f64 {
    if size == 0 {
        return 0.0;
    }
    let decades = (size as f64).log10();
    let distance = if decades < SIZE_PLATEAU_LO {
        SIZE_PLATEAU_LO - decades
    } else if decades > SIZE_PLATEAU_HI {
        decades - SIZE_PLATEAU_HI
    } else {
        0.0
    };
    (1.0 - distance / SIZE_FALLOFF_DECADES).max(0.0)
}

/// Orders a result set per the requested sort order.
///
/// Every order uses the same deterministic tie-breakers (normalized name,
/// then id), so repeated sorts of equal inputs are bit-identical.
pub fn sort_results(results: &mut SearchResults, order: SortOrder) {
    match order {
        SortOrder::Relevance => results.sort_by_score(),
        SortOrder::Name => results.sort_by_name(),
        SortOrder::Size => results.sort_by_size(),
        SortOrder::Modified => results.sort_by_modified(),
        SortOrder::Accessed => results.sort_by_accessed(),
    }
}
