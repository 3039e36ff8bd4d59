//! The four query matchers behind one tagged type.
//!
//! A [`Matcher`] is built once per query and then asked to score
//! candidates. Scores are mode-specific (see each variant) and feed the
//! `name` component of the final relevance mix.

use std::sync::Arc;

use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};

use ff_cache::LruCache;
use ff_core::{normalize_name, FileId, FileRecord, SearchMode, SearchQuery};

use crate::error::QueryError;
use crate::fuzzy::SimilarityCache;
use crate::wildcard::wildcard_match;

/// Compiled patterns kept per engine.
const REGEX_CACHE_SIZE: usize = 64;

/// An LRU of compiled regexes keyed by `(pattern, case flag)`.
///
/// Compilation dominates regex-mode latency for short candidate lists;
/// interactive use re-submits the same pattern on every keystroke.
#[derive(Debug)]
pub struct RegexCache {
    compiled: Mutex<LruCache<(String, bool), Regex>>,
}

impl Default for RegexCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RegexCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            compiled: Mutex::new(LruCache::new(REGEX_CACHE_SIZE)),
        }
    }

    /// Returns the compiled pattern, compiling and caching on miss.
    ///
    /// # Errors
    ///
    /// [`QueryError::InvalidRegex`] with the compiler's message.
    pub fn compile(&self, pattern: &str, case_sensitive: bool) -> Result<Regex, QueryError> {
        let key = (pattern.to_owned(), case_sensitive);
        if let Some(regex) = self.compiled.lock().get(&key) {
            return Ok(regex);
        }
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|error| QueryError::InvalidRegex {
                pattern: pattern.to_owned(),
                message: error.to_string(),
            })?;
        self.compiled.lock().put(key, regex.clone());
        Ok(regex)
    }
}

/// A query matcher, specialized per [`SearchMode`].
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Substring match over the normalized (or raw) name.
    ///
    /// Scores: 1.0 prefix, 0.9 whole word, 0.8 other substring.
    Exact {
        /// Normalized query text.
        query: String,
        /// Raw query text, for case-sensitive comparison.
        raw_query: String,
        /// Compare raw names instead of normalized ones.
        case_sensitive: bool,
    },
    /// Combined-similarity match with a threshold gate.
    ///
    /// Score: the combined similarity itself.
    Fuzzy {
        /// Normalized query text.
        query: String,
        /// Minimum similarity to match.
        threshold: f64,
        /// Shared score cache.
        cache: Arc<SimilarityCache>,
    },
    /// Glob match over the file name.
    ///
    /// Scores: 1.0 whole-name match, 0.6 segment match.
    Wildcard {
        /// The pattern, lowercased unless case-sensitive.
        pattern: String,
        /// Compare without lowercasing.
        case_sensitive: bool,
    },
    /// Regular-expression match over the file name.
    ///
    /// Scores: 1.0 whole-name match, 0.5 partial match.
    Regex {
        /// The compiled pattern.
        regex: Regex,
    },
}

impl Matcher {
    /// Builds the matcher for a query.
    ///
    /// # Errors
    ///
    /// [`QueryError::EmptyQuery`] for empty text and
    /// [`QueryError::InvalidRegex`] for a bad regex-mode pattern.
    pub fn build(
        query: &SearchQuery,
        regex_cache: &RegexCache,
        similarity_cache: &Arc<SimilarityCache>,
    ) -> Result<Self, QueryError> {
        if query.text.trim().is_empty() {
            return Err(QueryError::EmptyQuery);
        }
        Ok(match query.mode {
            SearchMode::Exact => Self::Exact {
                query: normalize_name(&query.text),
                raw_query: query.text.clone(),
                case_sensitive: query.case_sensitive,
            },
            SearchMode::Fuzzy => Self::Fuzzy {
                query: normalize_name(&query.text),
                threshold: query.fuzzy_threshold.clamp(0.0, 1.0),
                cache: Arc::clone(similarity_cache),
            },
            SearchMode::Wildcard => Self::Wildcard {
                pattern: if query.case_sensitive {
                    query.text.clone()
                } else {
                    query.text.to_lowercase()
                },
                case_sensitive: query.case_sensitive,
            },
            SearchMode::Regex => Self::Regex {
                regex: regex_cache.compile(&query.text, query.case_sensitive)?,
            },
        })
    }

    /// Scores one candidate; `None` means no match.
    #[must_use]
    pub fn score(&self, record: &FileRecord) -> Option<f64> {
        match self {
            Self::Exact {
                query,
                raw_query,
                case_sensitive,
            } => {
                if *case_sensitive {
                    score_substring(&record.file_name, raw_query)
                } else {
                    score_substring(&record.normalized_name, query)
                }
            }
            Self::Fuzzy {
                query,
                threshold,
                cache,
            } => {
                let similarity = cache.similarity(query, &record.normalized_name);
                (similarity >= *threshold).then_some(similarity)
            }
            Self::Wildcard {
                pattern,
                case_sensitive,
            } => {
                let name = if *case_sensitive {
                    record.file_name.clone()
                } else {
                    record.file_name.to_lowercase()
                };
                if wildcard_match(pattern, &name) {
                    Some(1.0)
                } else if wildcard_match(&format!("*{pattern}*"), &name) {
                    Some(0.6)
                } else {
                    None
                }
            }
            Self::Regex { regex } => {
                let hit = regex.find(&record.file_name)?;
                if hit.start() == 0 && hit.end() == record.file_name.len() {
                    Some(1.0)
                } else {
                    Some(0.5)
                }
            }
        }
    }

    /// Scores a candidate slice, keeping matches only.
    #[must_use]
    pub fn match_candidates(&self, candidates: &[FileRecord]) -> Vec<(FileId, f64)> {
        candidates
            .iter()
            .filter_map(|record| self.score(record).map(|score| (record.id, score)))
            .collect()
    }
}

/// Substring scoring shared by both exact variants.
fn score_substring(name: &str, query: &str) -> Option<f64> {
    let position = name.find(query)?;
    if position == 0 {
        return Some(1.0);
    }
    let before_ok = name[..position]
        .chars()
        .next_back()
        .is_none_or(|c| !c.is_alphanumeric());
    let after_ok = name[position + query.len()..]
        .chars()
        .next()
        .is_none_or(|c| !c.is_alphanumeric());
    if before_ok && after_ok {
        Some(0.9)
    } else {
        Some(0.8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn record(path: &str) -> FileRecord {
        FileRecord::new(Utf8PathBuf::from(path))
    }

    fn build(query: SearchQuery) -> Matcher {
        Matcher::build(&query, &RegexCache::new(), &Arc::new(SimilarityCache::new()))
            .expect("build matcher")
    }

    #[test]
    fn test_empty_query_rejected() {
        let result = Matcher::build(
            &SearchQuery::new("   "),
            &RegexCache::new(),
            &Arc::new(SimilarityCache::new()),
        );
        assert!(matches!(result, Err(QueryError::EmptyQuery)));
    }

    #[test]
    fn test_exact_scores_by_position() {
        let matcher = build(SearchQuery::new("report").with_mode(SearchMode::Exact));

        // Prefix.
        assert_eq!(matcher.score(&record("/a/report_2024.pdf")), Some(1.0));
        // Whole word inside.
        assert_eq!(matcher.score(&record("/a/annual report.pdf")), Some(0.9));
        // Plain substring.
        assert_eq!(matcher.score(&record("/a/subreports.txt")), Some(0.8));
        // No match.
        assert_eq!(matcher.score(&record("/a/summary.txt")), None);
    }

    #[test]
    fn test_exact_case_sensitivity() {
        let mut query = SearchQuery::new("Report").with_mode(SearchMode::Exact);
        query.case_sensitive = true;
        let matcher = build(query);

        assert!(matcher.score(&record("/a/Report.txt")).is_some());
        assert!(matcher.score(&record("/a/report.txt")).is_none());
    }

    #[test]
    fn test_wildcard_whole_vs_segment() {
        let matcher = build(SearchQuery::new("*.txt").with_mode(SearchMode::Wildcard));
        assert_eq!(matcher.score(&record("/a/notes.txt")), Some(1.0));
        assert_eq!(matcher.score(&record("/a/notes.md")), None);

        let segment = build(SearchQuery::new("not").with_mode(SearchMode::Wildcard));
        assert_eq!(segment.score(&record("/a/notes.txt")), Some(0.6));
    }

    #[test]
    fn test_wildcard_is_case_insensitive_by_default() {
        let matcher = build(SearchQuery::new("*.TXT").with_mode(SearchMode::Wildcard));
        assert_eq!(matcher.score(&record("/a/notes.txt")), Some(1.0));
    }

    #[test]
    fn test_regex_full_and_partial() {
        let matcher =
            build(SearchQuery::new(r"^photo_\d+\.jpg$").with_mode(SearchMode::Regex));
        assert_eq!(matcher.score(&record("/p/photo_01.jpg")), Some(1.0));

        let partial = build(SearchQuery::new(r"\d+").with_mode(SearchMode::Regex));
        assert_eq!(partial.score(&record("/p/photo_01.jpg")), Some(0.5));
        assert_eq!(partial.score(&record("/p/photo.jpg")), None);
    }

    #[test]
    fn test_regex_case_insensitive_by_default() {
        let matcher =
            build(SearchQuery::new(r"\.(jpg|png)$").with_mode(SearchMode::Regex));
        assert!(matcher.score(&record("/p/icon.PNG")).is_some());
        assert!(matcher.score(&record("/p/note.txt")).is_none());
    }

    #[test]
    fn test_invalid_regex_surfaces() {
        let result = Matcher::build(
            &SearchQuery::new("[unclosed").with_mode(SearchMode::Regex),
            &RegexCache::new(),
            &Arc::new(SimilarityCache::new()),
        );
        assert!(matches!(result, Err(QueryError::InvalidRegex { .. })));
    }

    #[test]
    fn test_fuzzy_threshold_gates() {
        let query = SearchQuery::new("docment")
            .with_mode(SearchMode::Fuzzy)
            .with_fuzzy_threshold(0.6);
        let matcher = build(query);

        assert!(matcher.score(&record("/d/document.pdf")).is_some());
        assert!(matcher.score(&record("/d/dog.png")).is_none());
    }

    #[test]
    fn test_match_candidates_filters() {
        let matcher = build(SearchQuery::new("*.txt").with_mode(SearchMode::Wildcard));
        let candidates = vec![record("/a.txt"), record("/b.md"), record("/c.txt")];
        let hits = matcher.match_candidates(&candidates);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_regex_cache_reuses_compilations() {
        let cache = RegexCache::new();
        let first = cache.compile(r"\d+", false).expect("compile");
        let second = cache.compile(r"\d+", false).expect("compile");
        assert_eq!(first.as_str(), second.as_str());
    }

    mod properties {
        use super::*;
        use crate::fuzzy::combined_similarity;
        use crate::wildcard::wildcard_match;
        use ff_core::normalize_name;
        use proptest::prelude::*;

        proptest! {
            /// Exact mode matches a record iff the substring relation holds
            /// on the normalized name.
            #[test]
            fn prop_exact_matches_iff_substring(
                name in "[a-z0-9_. -]{1,24}",
                needle in "[a-z0-9]{1,8}",
            ) {
                let matcher = build(SearchQuery::new(needle.clone()).with_mode(SearchMode::Exact));
                let record = record(&format!("/p/{name}"));
                let expected = record.normalized_name.contains(&normalize_name(&needle));
                prop_assert_eq!(matcher.score(&record).is_some(), expected);
            }

            /// Wildcard mode scores 1.0 iff the whole-name match holds.
            #[test]
            fn prop_wildcard_full_match_is_exactly_one(
                name in "[a-z0-9.]{1,16}",
                pattern in "[a-z0-9.*?]{1,8}",
            ) {
                let matcher = build(
                    SearchQuery::new(pattern.clone()).with_mode(SearchMode::Wildcard),
                );
                let record = record(&format!("/p/{name}"));
                let whole = wildcard_match(&pattern, &record.file_name.to_lowercase());
                prop_assert_eq!(matcher.score(&record) == Some(1.0), whole);
            }

            /// Every fuzzy match clears the threshold, and everything that
            /// clears the threshold matches.
            #[test]
            fn prop_fuzzy_threshold_is_tight(
                query in "[a-z]{2,10}",
                name in "[a-z]{2,10}",
                threshold in 0.0f64..1.0,
            ) {
                let matcher = build(
                    SearchQuery::new(query.clone())
                        .with_mode(SearchMode::Fuzzy)
                        .with_fuzzy_threshold(threshold),
                );
                let record = record(&format!("/p/{name}"));
                let similarity = combined_similarity(
                    &normalize_name(&query),
                    &record.normalized_name,
                );
                match matcher.score(&record) {
                    Some(score) => {
                        prop_assert!(score >= threshold);
                        prop_assert!((score - similarity).abs() < 1e-12);
                    }
                    None => prop_assert!(similarity < threshold),
                }
            }
        }
    }
}
