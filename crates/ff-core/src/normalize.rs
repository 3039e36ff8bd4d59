//! Filename normalization and tokenization.
//!
//! Every indexed name is reduced to a canonical lowercase form before it
//! enters the trie, the bloom filter, or the inverted index, and every query
//! goes through the same function so lookups agree with what was stored.
//!
//! The rules:
//!
//! - ASCII letters are lowercased; other alphabetic characters are kept via
//!   `char::to_lowercase`
//! - `.`, `_`, `-`, and whitespace all act as separators and collapse into a
//!   single space
//! - any other non-alphanumeric character is dropped
//! - leading and trailing separators produce no empty tokens
//!
//! # Examples
//!
//! ```
//! use ff_core::{normalize_name, tokenize};
//!
//! assert_eq!(normalize_name("My_Report-2024.Final.PDF"), "my report 2024 final pdf");
//!
//! let tokens = tokenize("My_Report.pdf", "pdf");
//! assert!(tokens.iter().any(|t| t == "report"));
//! assert!(tokens.iter().any(|t| t == "pdf"));
//! ```

use smallvec::SmallVec;

/// Normalizes a filename for indexing and matching.
///
/// Lowercases the input, keeps alphanumerics, and collapses the separator
/// characters (`.`, `_`, `-`, whitespace) into single spaces. The result
/// never starts or ends with a space.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_space = false;

    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
        } else if matches!(ch, '.' | '_' | '-') || ch.is_whitespace() {
            pending_space = true;
        }
        // Any other punctuation is dropped without acting as a separator.
    }

    out
}

/// Splits a normalized name into search tokens.
///
/// Tokens are the space-separated words of [`normalize_name`] plus the
/// (already lowercase) extension when non-empty. Duplicates are removed so
/// the inverted index holds each (token, id) pair once.
#[must_use]
pub fn tokenize(name: &str, extension: &str) -> SmallVec<[String; 8]> {
    let normalized = normalize_name(name);
    let mut tokens: SmallVec<[String; 8]> = SmallVec::new();

    for word in normalized.split(' ') {
        if !word.is_empty() && !tokens.iter().any(|t| t == word) {
            tokens.push(word.to_owned());
        }
    }

    if !extension.is_empty() && !tokens.iter().any(|t| t == extension) {
        tokens.push(extension.to_owned());
    }

    tokens
}
