//! Highlight span computation.
//!
//! Spans are `(byte_offset, byte_length)` pairs over the *original*
//! `file_name`, so front-ends can slice without re-deriving anything.
//! Each mode highlights what its matcher actually matched: exact and
//! wildcard mark their literal segments, fuzzy marks the Jaro-Winkler
//! matching characters, regex marks the overall match extent.

use smallvec::SmallVec;

use ff_core::normalize_name;
use regex::Regex;

use crate::fuzzy::jaro_matching_positions;
use crate::matcher::Matcher;

/// Spans over a file name; inline storage for the common few-span case.
pub type Highlights = SmallVec<[(usize, usize); 4]>;

/// Computes the highlight spans for one matched name.
#[must_use]
pub fn highlights_for(name: &str, matcher: &Matcher) -> Highlights {
    match matcher {
        Matcher::Exact {
            raw_query,
            query,
            case_sensitive,
        } => {
            if *case_sensitive {
                find_occurrences(name, raw_query, true)
            } else {
                // The normalized query may not appear verbatim in the raw
                // name (separators collapse); fall back to the raw text.
                let mut spans = find_occurrences(name, raw_query, false);
                if spans.is_empty() {
                    spans = find_occurrences(name, query, false);
                }
                spans
            }
        }
        Matcher::Wildcard { pattern, .. } => wildcard_segments(name, pattern),
        Matcher::Regex { regex } => regex_extent(name, regex),
        Matcher::Fuzzy { query, .. } => fuzzy_positions(name, query),
    }
}

/// Every occurrence of `needle` in `haystack`, case-folded per char when
/// `exact_case` is false. Offsets are bytes into `haystack`.
fn find_occurrences(haystack: &str, needle: &str, exact_case: bool) -> Highlights {
    let mut spans = Highlights::new();
    if needle.is_empty() {
        return spans;
    }
    let needle_chars: Vec<char> = if exact_case {
        needle.chars().collect()
    } else {
        needle.chars().flat_map(char::to_lowercase).collect()
    };

    let indices: Vec<(usize, char)> = haystack.char_indices().collect();
    let mut i = 0;
    while i < indices.len() {
        if window_matches(&indices[i..], &needle_chars, exact_case) {
            let start = indices[i].0;
            let end_index = i + needle_chars.len();
            let end = if end_index < indices.len() {
                indices[end_index].0
            } else {
                haystack.len()
            };
            spans.push((start, end - start));
            i = end_index;
        } else {
            i += 1;
        }
    }
    spans
}

fn window_matches(window: &[(usize, char)], needle: &[char], exact_case: bool) -> bool {
    if window.len() < needle.len() {
        return false;
    }
    window
        .iter()
        .zip(needle)
        .all(|(&(_, have), want)| {
            if exact_case {
                have == *want
            } else {
                have.to_lowercase().next() == Some(*want)
            }
        })
}

/// Highlights each literal run of a wildcard pattern, left to right.
fn wildcard_segments(name: &str, pattern: &str) -> Highlights {
    let mut spans = Highlights::new();
    let mut search_from = 0;

    for segment in pattern.split(['*', '?']) {
        if segment.is_empty() {
            continue;
        }
        let rest = &name[search_from..];
        let found = rest
            .to_lowercase()
            .find(&segment.to_lowercase())
            .filter(|offset| rest.is_char_boundary(*offset));
        if let Some(offset) = found {
            let start = search_from + offset;
            let end = start + segment.len();
            // Case folding can shift byte lengths for non-ASCII names;
            // only emit spans that slice cleanly.
            if end <= name.len() && name.is_char_boundary(start) && name.is_char_boundary(end) {
                spans.push((start, segment.len()));
                search_from = end;
            }
        }
    }
    spans
}

/// The overall match extent (capture group zero).
fn regex_extent(name: &str, regex: &Regex) -> Highlights {
    let mut spans = Highlights::new();
    if let Some(hit) = regex.find(name) {
        spans.push((hit.start(), hit.end() - hit.start()));
    }
    spans
}

/// Marks the Jaro-matched characters, merging consecutive runs.
fn fuzzy_positions(name: &str, query: &str) -> Highlights {
    let normalized_target = normalize_name(name);
    let mut positions = jaro_matching_positions(query, &normalized_target);
    positions.sort_unstable();

    // Positions index the *normalized* name; map its non-space characters
    // back onto the raw name in order. This is an approximation, but the
    // normalized form only drops separators, so runs line up in practice.
    let raw_indices: Vec<(usize, char)> = name.char_indices().collect();
    let normalized_chars: Vec<char> = normalized_target.chars().collect();

    let mut mapping: Vec<usize> = Vec::with_capacity(normalized_chars.len());
    let mut raw_cursor = 0;
    for nc in &normalized_chars {
        while raw_cursor < raw_indices.len() {
            let (_, rc) = raw_indices[raw_cursor];
            if rc.to_lowercase().next() == Some(*nc) {
                mapping.push(raw_cursor);
                raw_cursor += 1;
                break;
            }
            raw_cursor += 1;
        }
    }

    let mut spans = Highlights::new();
    let mut run: Option<(usize, usize)> = None; // (first_char_idx, last_char_idx)
    for &pos in &positions {
        let Some(&char_idx) = mapping.get(pos) else {
            continue;
        };
        run = match run {
            Some((start, last)) if char_idx == last + 1 => Some((start, char_idx)),
            Some((start, last)) => {
                push_char_span(&mut spans, &raw_indices, name.len(), start, last);
                Some((char_idx, char_idx))
            }
            None => Some((char_idx, char_idx)),
        };
    }
    if let Some((start, last)) = run {
        push_char_span(&mut spans, &raw_indices, name.len(), start, last);
    }
    spans
}

fn push_char_span(
    spans: &mut Highlights,
    indices: &[(usize, char)],
    total_len: usize,
    first_char: usize,
    last_char: usize,
) {
    let start = indices[first_char].0;
    let end = indices
        .get(last_char + 1)
        .map_or(total_len, |&(offset, _)| offset);
    spans.push((start, end - start));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuzzy::SimilarityCache;
    use crate::matcher::RegexCache;
    use ff_core::{SearchMode, SearchQuery};
    use std::sync::Arc;

    fn matcher_for(text: &str, mode: SearchMode) -> Matcher {
        Matcher::build(
            &SearchQuery::new(text).with_mode(mode),
            &RegexCache::new(),
            &Arc::new(SimilarityCache::new()),
        )
        .expect("build matcher")
    }

    fn slice(name: &str, span: (usize, usize)) -> &str {
        &name[span.0..span.0 + span.1]
    }

    #[test]
    fn test_exact_highlights_every_occurrence() {
        let matcher = matcher_for("an", SearchMode::Exact);
        let spans = highlights_for("banana.txt", &matcher);
        assert_eq!(spans.len(), 2);
        assert_eq!(slice("banana.txt", spans[0]), "an");
        assert_eq!(slice("banana.txt", spans[1]), "an");
    }

    #[test]
    fn test_exact_highlight_is_case_insensitive() {
        let matcher = matcher_for("report", SearchMode::Exact);
        let spans = highlights_for("REPORT.pdf", &matcher);
        assert_eq!(spans.len(), 1);
        assert_eq!(slice("REPORT.pdf", spans[0]), "REPORT");
    }

    #[test]
    fn test_wildcard_highlights_literal_segments() {
        let matcher = matcher_for("*a*.txt", SearchMode::Wildcard);
        let spans = highlights_for("ba.txt", &matcher);
        let texts: Vec<&str> = spans.iter().map(|&s| slice("ba.txt", s)).collect();
        assert_eq!(texts, ["a", ".txt"]);
    }

    #[test]
    fn test_regex_highlights_match_extent() {
        let matcher = matcher_for(r"\d+", SearchMode::Regex);
        let spans = highlights_for("photo_0042.jpg", &matcher);
        assert_eq!(spans.len(), 1);
        assert_eq!(slice("photo_0042.jpg", spans[0]), "0042");
    }

    #[test]
    fn test_fuzzy_highlights_cover_matched_chars() {
        let matcher = matcher_for("document", SearchMode::Fuzzy);
        let spans = highlights_for("document.pdf", &matcher);
        assert!(!spans.is_empty());
        // The contiguous "document" run must be covered by the first span.
        assert_eq!(slice("document.pdf", spans[0]), "document");
    }

    #[test]
    fn test_spans_are_valid_byte_ranges() {
        let name = "Übersicht-2024.pdf";
        for mode in [SearchMode::Exact, SearchMode::Fuzzy] {
            let matcher = matcher_for("bersicht", mode);
            for span in highlights_for(name, &matcher) {
                assert!(span.0 + span.1 <= name.len());
                assert!(name.is_char_boundary(span.0));
                assert!(name.is_char_boundary(span.0 + span.1));
            }
        }
    }
}
