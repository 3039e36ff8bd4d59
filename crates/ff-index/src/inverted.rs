//! Inverted token index: token -> posting list of record ids.
//!
//! Both directions are kept (token→ids and id→tokens) so that updating or
//! removing a document never needs the original token list from the caller.
//! Synchronization belongs to the owning [`MemoryIndex`](crate::MemoryIndex);
//! this structure is plain data behind its writer lock.

use ff_core::{FileId, FxHashMap, FxHashSet};

/// How multi-token searches combine per-token postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCombine {
    /// Intersect: a record must carry every token.
    And,
    /// Union: a record must carry at least one token.
    Or,
}

/// The two-way token index.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    token_to_ids: FxHashMap<String, FxHashSet<FileId>>,
    id_to_tokens: FxHashMap<FileId, FxHashSet<String>>,
}

impl InvertedIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document with its tokens.
    ///
    /// Adding an id that is already present unions the new tokens in; use
    /// [`update_document`](Self::update_document) for replace semantics.
    pub fn add_document<S: AsRef<str>>(&mut self, id: FileId, tokens: &[S]) {
        let entry = self.id_to_tokens.entry(id).or_default();
        for token in tokens {
            let token = token.as_ref();
            if entry.insert(token.to_owned()) {
                self.token_to_ids
                    .entry(token.to_owned())
                    .or_default()
                    .insert(id);
            }
        }
    }

    /// Removes a document and every posting that references it.
    pub fn remove_document(&mut self, id: FileId) {
        let Some(tokens) = self.id_to_tokens.remove(&id) else {
            return;
        };
        for token in tokens {
            if let Some(ids) = self.token_to_ids.get_mut(&token) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.token_to_ids.remove(&token);
                }
            }
        }
    }

    /// Replaces a document's tokens: all prior postings are removed, then
    /// the new ones added.
    pub fn update_document<S: AsRef<str>>(&mut self, id: FileId, tokens: &[S]) {
        self.remove_document(id);
        self.add_document(id, tokens);
    }

    /// Returns the posting list for one token.
    #[must_use]
    pub fn search(&self, token: &str) -> FxHashSet<FileId> {
        self.token_to_ids.get(token).cloned().unwrap_or_default()
    }

    /// Intersects or unions the postings of several tokens.
    ///
    /// With [`TokenCombine::And`], an empty token list or any token with no
    /// postings yields an empty result. Result ordering is unspecified.
    #[must_use]
    pub fn search_multiple<S: AsRef<str>>(
        &self,
        tokens: &[S],
        combine: TokenCombine,
    ) -> FxHashSet<FileId> {
        match combine {
            TokenCombine::Or => {
                let mut out = FxHashSet::default();
                for token in tokens {
                    if let Some(ids) = self.token_to_ids.get(token.as_ref()) {
                        out.extend(ids.iter().copied());
                    }
                }
                out
            }
            TokenCombine::And => {
                let mut postings: Vec<&FxHashSet<FileId>> = Vec::with_capacity(tokens.len());
                for token in tokens {
                    match self.token_to_ids.get(token.as_ref()) {
                        Some(ids) => postings.push(ids),
                        None => return FxHashSet::default(),
                    }
                }
                if postings.is_empty() {
                    return FxHashSet::default();
                }
                // Iterate the smallest posting list, probe the rest.
                postings.sort_by_key(|ids| ids.len());
                let smallest = postings[0];
                let rest = &postings[1..];
                smallest
                    .iter()
                    .copied()
                    .filter(|id| rest.iter().all(|ids| ids.contains(id)))
                    .collect()
            }
        }
    }

    /// The tokens recorded for one document.
    #[must_use]
    pub fn tokens_for(&self, id: FileId) -> Option<&FxHashSet<String>> {
        self.id_to_tokens.get(&id)
    }

    /// Number of distinct tokens.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.token_to_ids.len()
    }

    /// Number of documents.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.id_to_tokens.len()
    }

    /// Total (token, id) pairs (for memory estimation).
    #[must_use]
    pub fn posting_count(&self) -> usize {
        self.token_to_ids.values().map(FxHashSet::len).sum()
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        self.token_to_ids.clear();
        self.id_to_tokens.clear();
    }

    /// Walks every (token, id) pair checking both directions agree;
    /// returns descriptions of any disagreements.
    #[must_use]
    pub fn consistency_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (token, ids) in &self.token_to_ids {
            for id in ids {
                if !self
                    .id_to_tokens
                    .get(id)
                    .is_some_and(|tokens| tokens.contains(token))
                {
                    errors.push(format!(
                        "posting ({token}, {id:?}) has no reverse entry"
                    ));
                }
            }
        }
        for (id, tokens) in &self.id_to_tokens {
            for token in tokens {
                if !self
                    .token_to_ids
                    .get(token)
                    .is_some_and(|ids| ids.contains(id))
                {
                    errors.push(format!(
                        "document entry ({id:?}, {token}) has no posting"
                    ));
                }
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(n: u64) -> FileId {
        FileId::new(n)
    }

    #[test]
    fn test_add_and_search() {
        let mut index = InvertedIndex::new();
        index.add_document(id(1), &["annual", "report", "pdf"]);
        index.add_document(id(2), &["report", "txt"]);

        assert_eq!(index.search("report").len(), 2);
        assert_eq!(index.search("pdf").len(), 1);
        assert!(index.search("missing").is_empty());
    }

    #[test]
    fn test_and_intersects() {
        let mut index = InvertedIndex::new();
        index.add_document(id(1), &["annual", "report"]);
        index.add_document(id(2), &["report", "txt"]);

        let hits = index.search_multiple(&["annual", "report"], TokenCombine::And);
        assert_eq!(hits.len(), 1);
        assert!(hits.contains(&id(1)));
    }

    #[test]
    fn test_and_with_unknown_token_is_empty() {
        let mut index = InvertedIndex::new();
        index.add_document(id(1), &["report"]);
        let hits = index.search_multiple(&["report", "nope"], TokenCombine::And);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_or_unions() {
        let mut index = InvertedIndex::new();
        index.add_document(id(1), &["annual"]);
        index.add_document(id(2), &["txt"]);

        let hits = index.search_multiple(&["annual", "txt"], TokenCombine::Or);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_update_replaces_tokens() {
        let mut index = InvertedIndex::new();
        index.add_document(id(1), &["old", "name"]);
        index.update_document(id(1), &["new", "name"]);

        assert!(index.search("old").is_empty());
        assert_eq!(index.search("new").len(), 1);
        assert_eq!(index.search("name").len(), 1);
        assert!(index.consistency_errors().is_empty());
    }

    #[test]
    fn test_remove_drops_empty_postings() {
        let mut index = InvertedIndex::new();
        index.add_document(id(1), &["solo"]);
        index.remove_document(id(1));

        assert_eq!(index.token_count(), 0);
        assert_eq!(index.document_count(), 0);
    }

    proptest! {
        /// Random add/update/remove sequences keep both directions in sync.
        #[test]
        fn prop_directions_stay_consistent(
            ops in proptest::collection::vec(
                (0u8..3, 1u64..20, proptest::collection::vec("[a-z]{1,6}", 0..5)),
                1..60,
            )
        ) {
            let mut index = InvertedIndex::new();
            for (op, raw_id, tokens) in ops {
                match op {
                    0 => index.add_document(id(raw_id), &tokens),
                    1 => index.update_document(id(raw_id), &tokens),
                    _ => index.remove_document(id(raw_id)),
                }
            }
            prop_assert!(index.consistency_errors().is_empty());
        }
    }
}
