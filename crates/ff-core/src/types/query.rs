//! Search query types and declarative filters.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use super::file::Timestamp;

/// How the query text is interpreted by the matcher.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Substring match over the normalized name.
    Exact,
    /// Similarity scoring (Jaro-Winkler + Levenshtein + LCS mix).
    #[default]
    Fuzzy,
    /// Glob-style `*` and `?` over the whole name.
    Wildcard,
    /// Regular-expression match.
    Regex,
}

/// The order results are returned in.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Ascending normalized name.
    Name,
    /// Descending size.
    Size,
    /// Most recently modified first.
    Modified,
    /// Most recently accessed first.
    Accessed,
    /// Descending relevance score (the default).
    #[default]
    Relevance,
}

/// An inclusive size filter in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeRange {
    /// Smallest size admitted.
    pub min: u64,
    /// Largest size admitted.
    pub max: u64,
}

impl Default for SizeRange {
    fn default() -> Self {
        Self {
            min: 0,
            max: u64::MAX,
        }
    }
}

impl SizeRange {
    /// Creates a range admitting sizes in `[min, max]`.
    #[must_use]
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// Returns `true` when `size` falls inside the range.
    #[inline]
    #[must_use]
    pub const fn contains(&self, size: u64) -> bool {
        size >= self.min && size <= self.max
    }

    /// Returns `true` when the range admits every size.
    #[inline]
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.min == 0 && self.max == u64::MAX
    }
}

/// An inclusive timestamp filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
    /// Earliest timestamp admitted.
    pub start: Timestamp,
    /// Latest timestamp admitted.
    pub end: Timestamp,
}

impl Default for DateRange {
    fn default() -> Self {
        Self {
            start: Timestamp::MIN,
            end: Timestamp::MAX,
        }
    }
}

impl DateRange {
    /// Creates a range admitting timestamps in `[start, end]`.
    #[must_use]
    pub const fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// Returns `true` when `date` falls inside the range.
    #[inline]
    #[must_use]
    pub const fn contains(&self, date: Timestamp) -> bool {
        date >= self.start && date <= self.end
    }

    /// Returns `true` when the range admits every timestamp.
    #[inline]
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.start == Timestamp::MIN && self.end == Timestamp::MAX
    }
}

/// A complete search request.
///
/// Everything beyond `text` and `mode` is a declarative filter intersected
/// against the sorted indexes before the matcher runs.
///
/// # Examples
///
/// ```
/// use ff_core::{SearchMode, SearchQuery};
///
/// let query = SearchQuery::new("report").with_mode(SearchMode::Exact);
/// assert!(query.max_results >= 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    /// The query text.
    pub text: String,

    /// How the text is interpreted.
    pub mode: SearchMode,

    /// Restrict results to these drive mounts; empty means all.
    pub include_drives: Vec<Utf8PathBuf>,

    /// Drop results under any of these path prefixes.
    pub exclude_paths: Vec<Utf8PathBuf>,

    /// Restrict results to these extensions (lowercase, no dot); empty
    /// means all.
    pub file_types: Vec<String>,

    /// Size filter.
    pub size_range: SizeRange,

    /// Modification-date filter.
    pub date_range: DateRange,

    /// Upper bound on returned results; always at least 1.
    pub max_results: usize,

    /// Requested result ordering.
    pub sort_order: SortOrder,

    /// When set, exact matching compares the raw (un-normalized) name.
    pub case_sensitive: bool,

    /// Minimum combined similarity for fuzzy mode, in `[0, 1]`.
    pub fuzzy_threshold: f64,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            text: String::new(),
            mode: SearchMode::default(),
            include_drives: Vec::new(),
            exclude_paths: Vec::new(),
            file_types: Vec::new(),
            size_range: SizeRange::default(),
            date_range: DateRange::default(),
            max_results: 1000,
            sort_order: SortOrder::default(),
            case_sensitive: false,
            fuzzy_threshold: 0.6,
        }
    }
}

impl SearchQuery {
    /// Creates a query with the given text and default settings.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Sets the search mode.
    #[must_use]
    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the result cap, clamping to at least 1.
    #[must_use]
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max.max(1);
        self
    }

    /// Sets the sort order.
    #[must_use]
    pub fn with_sort_order(mut self, order: SortOrder) -> Self {
        self.sort_order = order;
        self
    }

    /// Sets the fuzzy threshold, clamped into `[0, 1]`.
    #[must_use]
    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Returns `true` when no declarative filter is active.
    #[must_use]
    pub fn is_unfiltered(&self) -> bool {
        self.include_drives.is_empty()
            && self.exclude_paths.is_empty()
            && self.file_types.is_empty()
            && self.size_range.is_unbounded()
            && self.date_range.is_unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_range_contains() {
        let range = SizeRange::new(10, 100);
        assert!(!range.contains(9));
        assert!(range.contains(10));
        assert!(range.contains(100));
        assert!(!range.contains(101));
    }

    #[test]
    fn test_date_range_default_is_unbounded() {
        let range = DateRange::default();
        assert!(range.is_unbounded());
        assert!(range.contains(0));
        assert!(range.contains(-1));
    }

    #[test]
    fn test_query_builders_clamp() {
        let query = SearchQuery::new("q")
            .with_max_results(0)
            .with_fuzzy_threshold(2.0);
        assert_eq!(query.max_results, 1);
        assert_eq!(query.fuzzy_threshold, 1.0);
    }

    #[test]
    fn test_query_is_unfiltered() {
        let mut query = SearchQuery::new("q");
        assert!(query.is_unfiltered());
        query.file_types.push("pdf".to_owned());
        assert!(!query.is_unfiltered());
    }

    #[test]
    fn test_mode_serialization() {
        assert_eq!(
            serde_json::to_string(&SearchMode::Wildcard).unwrap(),
            r#""wildcard""#
        );
        let parsed: SearchMode = serde_json::from_str(r#""regex""#).unwrap();
        assert_eq!(parsed, SearchMode::Regex);
    }
}
