//! Fuzzy similarity metrics.
//!
//! The fuzzy matcher scores `(query, name)` pairs with a weighted mix of
//! three classics:
//!
//! - **Jaro-Winkler** (weight 0.4) - strong on transpositions and shared
//!   prefixes, which dominate filename typos
//! - **normalized Levenshtein** (weight 0.3) - `1 - distance / max_len`
//! - **longest-common-subsequence ratio** (weight 0.3)
//!
//! All three operate on `char` vectors, so multi-byte names score the same
//! as ASCII. A small LRU keyed by `(query, name)` caches combined scores;
//! interactive searches re-score the same names on every keystroke.

use parking_lot::Mutex;

use ff_cache::LruCache;

/// Weight of the Jaro-Winkler component.
const JARO_WINKLER_WEIGHT: f64 = 0.4;
/// Weight of the normalized-Levenshtein component.
const LEVENSHTEIN_WEIGHT: f64 = 0.3;
/// Weight of the LCS-ratio component.
const LCS_WEIGHT: f64 = 0.3;

/// Winkler prefix scaling factor.
const WINKLER_SCALE: f64 = 0.1;
/// Winkler common-prefix cap.
const WINKLER_MAX_PREFIX: usize = 4;

/// Entries kept in the score cache.
const SCORE_CACHE_SIZE: usize = 4096;

/// Levenshtein edit distance (insert, delete, substitute).
///
/// Runs in O(|a|·|b|) time and O(min) space via the two-row table.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// The positions in `b` matched by the Jaro algorithm, in match order.
///
/// Exposed for highlight computation: the matched characters of the
/// candidate name are exactly what a fuzzy highlight should mark.
#[must_use]
pub fn jaro_matching_positions(a: &str, b: &str) -> Vec<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }

    let window = (a.len().max(b.len()) / 2).saturating_sub(1);
    let mut b_taken = vec![false; b.len()];
    let mut positions = Vec::new();

    for (i, ca) in a.iter().enumerate() {
        let lo = i.saturating_sub(window);
        let hi = (i + window + 1).min(b.len());
        for j in lo..hi {
            if !b_taken[j] && b[j] == *ca {
                b_taken[j] = true;
                positions.push(j);
                break;
            }
        }
    }
    positions
}

/// Jaro similarity in `[0, 1]`.
#[must_use]
pub fn jaro_similarity(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() && b_chars.is_empty() {
        return 1.0;
    }
    if a_chars.is_empty() || b_chars.is_empty() {
        return 0.0;
    }

    let window = (a_chars.len().max(b_chars.len()) / 2).saturating_sub(1);
    let mut a_matches = Vec::new();
    let mut b_taken = vec![false; b_chars.len()];

    for (i, ca) in a_chars.iter().enumerate() {
        let lo = i.saturating_sub(window);
        let hi = (i + window + 1).min(b_chars.len());
        for j in lo..hi {
            if !b_taken[j] && b_chars[j] == *ca {
                b_taken[j] = true;
                a_matches.push((i, j));
                break;
            }
        }
    }

    let matches = a_matches.len();
    if matches == 0 {
        return 0.0;
    }

    // Transpositions: matched pairs out of relative order, counted in
    // halves per the classic definition.
    let b_order: Vec<usize> = a_matches.iter().map(|&(_, j)| j).collect();
    let transpositions = b_order.windows(2).filter(|pair| pair[0] > pair[1]).count();
    let t = transpositions as f64 / 2.0;

    let m = matches as f64;
    (m / a_chars.len() as f64 + m / b_chars.len() as f64 + (m - t) / m) / 3.0
}

/// Jaro-Winkler similarity: Jaro boosted by the common prefix.
#[must_use]
pub fn jaro_winkler_similarity(a: &str, b: &str) -> f64 {
    let jaro = jaro_similarity(a, b);
    let prefix = a
        .chars()
        .zip(b.chars())
        .take(WINKLER_MAX_PREFIX)
        .take_while(|(x, y)| x == y)
        .count();
    jaro + prefix as f64 * WINKLER_SCALE * (1.0 - jaro)
}

/// Length of the longest common subsequence.
#[must_use]
pub fn lcs_length(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];

    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb {
                previous[j] + 1
            } else {
                previous[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// The combined similarity in `[0, 1]`:
/// `0.4·JW + 0.3·(1 − lev/max_len) + 0.3·(lcs/max_len)`.
#[must_use]
pub fn combined_similarity(query: &str, name: &str) -> f64 {
    let max_len = query.chars().count().max(name.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    let jw = jaro_winkler_similarity(query, name);
    let lev = 1.0 - levenshtein_distance(query, name) as f64 / max_len as f64;
    let lcs = lcs_length(query, name) as f64 / max_len as f64;

    (JARO_WINKLER_WEIGHT * jw + LEVENSHTEIN_WEIGHT * lev + LCS_WEIGHT * lcs).clamp(0.0, 1.0)
}

/// An LRU of combined scores keyed by `(query, name)`.
#[derive(Debug)]
pub struct SimilarityCache {
    scores: Mutex<LruCache<(String, String), f64>>,
}

impl Default for SimilarityCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SimilarityCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scores: Mutex::new(LruCache::new(SCORE_CACHE_SIZE)),
        }
    }

    /// Returns the cached or freshly computed combined similarity.
    #[must_use]
    pub fn similarity(&self, query: &str, name: &str) -> f64 {
        let key = (query.to_owned(), name.to_owned());
        if let Some(score) = self.scores.lock().get(&key) {
            return score;
        }
        let score = combined_similarity(query, name);
        self.scores.lock().put(key, score);
        score
    }

    /// Drops every cached score.
    pub fn clear(&self) {
        self.scores.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_classics() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("abc", "abc"), 0);
    }

    #[test]
    fn test_jaro_bounds() {
        assert_eq!(jaro_similarity("abc", "abc"), 1.0);
        assert_eq!(jaro_similarity("abc", "xyz"), 0.0);
        let mid = jaro_similarity("martha", "marhta");
        assert!(mid > 0.9 && mid < 1.0);
    }

    #[test]
    fn test_winkler_prefers_shared_prefix() {
        let with_prefix = jaro_winkler_similarity("document", "documant");
        let without = jaro_winkler_similarity("document", "tnemucod");
        assert!(with_prefix > without);
    }

    #[test]
    fn test_lcs() {
        assert_eq!(lcs_length("abcde", "ace"), 3);
        assert_eq!(lcs_length("abc", ""), 0);
        assert_eq!(lcs_length("abc", "abc"), 3);
    }

    #[test]
    fn test_combined_identity_is_one() {
        assert!((combined_similarity("report", "report") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_combined_typo_tolerance() {
        // The seed scenario: "docment" against candidate names.
        let doc_pdf = combined_similarity("docment", "document pdf");
        let docker = combined_similarity("docment", "docker md");
        let dog = combined_similarity("docment", "dog png");

        assert!(doc_pdf > docker);
        assert!(docker > dog);
        assert!(doc_pdf >= 0.6, "document.pdf should clear a 0.6 threshold, got {doc_pdf}");
        assert!(dog < 0.6, "dog.png should fall below 0.6, got {dog}");
    }

    #[test]
    fn test_cache_returns_same_scores() {
        let cache = SimilarityCache::new();
        let direct = combined_similarity("abc", "abd");
        assert_eq!(cache.similarity("abc", "abd"), direct);
        // Second call is served from cache; value identical.
        assert_eq!(cache.similarity("abc", "abd"), direct);
    }

    #[test]
    fn test_matching_positions_cover_common_chars() {
        let positions = jaro_matching_positions("abc", "abc");
        assert_eq!(positions, vec![0, 1, 2]);

        let positions = jaro_matching_positions("ac", "abc");
        assert_eq!(positions, vec![0, 2]);
    }
}
