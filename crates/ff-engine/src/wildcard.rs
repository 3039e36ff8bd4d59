//! Glob-style wildcard matching.
//!
//! `*` matches any run of characters (including none); `?` matches exactly
//! one. Matching is anchored: the pattern must cover the whole text.

/// Returns `true` when `pattern` matches all of `text`.
///
/// # Examples
///
/// ```
/// use ff_engine::wildcard_match;
///
/// assert!(wildcard_match("*.txt", "notes.txt"));
/// assert!(wildcard_match("photo_??.jpg", "photo_01.jpg"));
/// assert!(!wildcard_match("*.txt", "notes.md"));
/// ```
#[must_use]
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    match_recursive(&pattern, &text)
}

/// Pattern/text advance with `*` backtracking.
fn match_recursive(pattern: &[char], text: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some(('*', rest)) => {
            // A run of stars is one star.
            let rest = {
                let mut r = rest;
                while let Some(('*', tail)) = r.split_first() {
                    r = tail;
                }
                r
            };
            // Try consuming zero or more text characters.
            (0..=text.len()).any(|skip| match_recursive(rest, &text[skip..]))
        }
        Some(('?', rest)) => match text.split_first() {
            Some((_, text_rest)) => match_recursive(rest, text_rest),
            None => false,
        },
        Some((ch, rest)) => match text.split_first() {
            Some((tc, text_rest)) if tc == ch => match_recursive(rest, text_rest),
            _ => false,
        },
    }
}

/// Returns `true` when the pattern contains wildcard metacharacters.
#[must_use]
pub fn has_wildcards(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}
