//! Search result types and ranking weights.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::file::FileRecord;

/// One matched record with its score and highlight spans.
///
/// Highlights are `(offset, length)` byte spans over the original
/// `file_name`, suitable for direct slicing by a front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The matched record (a clone; the index keeps the original).
    pub record: FileRecord,

    /// Final relevance score in `[0, 1]`.
    pub score: f64,

    /// Byte spans of the match within `record.file_name`.
    pub highlights: SmallVec<[(usize, usize); 4]>,
}

impl SearchResult {
    /// Creates a result with no highlight spans.
    #[must_use]
    pub fn new(record: FileRecord, score: f64) -> Self {
        Self {
            record,
            score,
            highlights: SmallVec::new(),
        }
    }
}

/// An ordered set of results plus query metadata.
///
/// The sort methods implement the [`SortOrder`](super::query::SortOrder)
/// variants; ties always break on ascending normalized name and then id so
/// repeated searches return bit-identical orderings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// The results, in the requested order.
    pub results: Vec<SearchResult>,

    /// The query text that produced these results.
    pub query: String,

    /// How long the search took.
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,

    /// Matches found before `max_results` truncation.
    pub total_matches: usize,
}

impl SearchResults {
    /// Creates an empty result set for a query.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Appends a result.
    pub fn push(&mut self, result: SearchResult) {
        self.results.push(result);
    }

    /// Number of results held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` when no results are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Sorts by descending score, ties by name then id.
    pub fn sort_by_score(&mut self) {
        self.results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.record.normalized_name.cmp(&b.record.normalized_name))
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
    }

    /// Sorts by ascending normalized name, ties by id.
    pub fn sort_by_name(&mut self) {
        self.results.sort_by(|a, b| {
            a.record
                .normalized_name
                .cmp(&b.record.normalized_name)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
    }

    /// Sorts by descending size, ties by name then id.
    pub fn sort_by_size(&mut self) {
        self.results.sort_by(|a, b| {
            b.record
                .size
                .cmp(&a.record.size)
                .then_with(|| a.record.normalized_name.cmp(&b.record.normalized_name))
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
    }

    /// Sorts by most recently modified, ties by name then id.
    pub fn sort_by_modified(&mut self) {
        self.results.sort_by(|a, b| {
            b.record
                .last_modified
                .cmp(&a.record.last_modified)
                .then_with(|| a.record.normalized_name.cmp(&b.record.normalized_name))
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
    }

    /// Sorts by most recently accessed, ties by name then id.
    pub fn sort_by_accessed(&mut self) {
        self.results.sort_by(|a, b| {
            b.record
                .last_accessed
                .cmp(&a.record.last_accessed)
                .then_with(|| a.record.normalized_name.cmp(&b.record.normalized_name))
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
    }

    /// Truncates to at most `max` results, recording the pre-truncation count.
    pub fn truncate(&mut self, max: usize) {
        self.total_matches = self.results.len();
        self.results.truncate(max);
    }
}

/// Serializes a [`Duration`] as integer milliseconds.
mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Weights for the relevance mix.
///
/// The five components are combined as a weighted sum; [`normalize`]
/// rescales the weights so they total 1 regardless of what was configured.
///
/// [`normalize`]: RankingWeights::normalize
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingWeights {
    /// Weight of the matcher score.
    pub name: f64,
    /// Weight of the full-path match quality.
    pub path: f64,
    /// Weight of the historical access count.
    pub access: f64,
    /// Weight of modification recency.
    pub recency: f64,
    /// Weight of the typical-size boost.
    pub size: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            name: 0.4,
            path: 0.2,
            access: 0.2,
            recency: 0.1,
            size: 0.1,
        }
    }
}

impl RankingWeights {
    /// Rescales the weights to sum to 1.
    ///
    /// A zero-sum configuration falls back to the defaults rather than
    /// dividing by zero.
    pub fn normalize(&mut self) {
        let sum = self.name + self.path + self.access + self.recency + self.size;
        if sum <= f64::EPSILON {
            *self = Self::default();
            return;
        }
        self.name /= sum;
        self.path /= sum;
        self.access /= sum;
        self.recency /= sum;
        self.size /= sum;
    }

    /// Returns `true` when every weight is finite and non-negative.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [self.name, self.path, self.access, self.recency, self.size]
            .iter()
            .all(|w| w.is_finite() && *w >= 0.0)
    }
}
