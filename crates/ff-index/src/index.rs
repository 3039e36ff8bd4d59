//! The in-memory multi-index.
//!
//! [`MemoryIndex`] owns every [`FileRecord`] and keeps eight coupled views
//! of them consistent under a single reader-writer lock:
//!
//! 1. `files` / `path_to_id` - the record arena and the path bijection
//! 2. a name [`NameTrie`] for exact and prefix lookups
//! 3. a name [`BloomFilter`] for fast negative answers
//! 4. an [`InvertedIndex`] over the name tokens
//! 5. an extension index
//! 6. ordered size and date (modified, accessed) indexes
//! 7. the parent/child hierarchy maps
//! 8. the drive membership map
//!
//! Writers (`add`, `update`, `remove`, the batch variants) take the write
//! lock, validate first, and only then mutate, so a failed operation leaves
//! every view untouched. Readers clone what they return; nothing hands out
//! references into the locked state.
//!
//! Every committed mutation bumps an epoch counter that result caches
//! compare against.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::RwLock;
use tracing::debug;

use ff_core::{
    normalize_name, DateRange, DriveId, DriveRecord, FileId, FileRecord, FxHashMap,
    FxHashSet, IndexStatistics, SearchQuery, SizeRange, Timestamp,
};

use crate::bloom::{BloomFilter, DEFAULT_FALSE_POSITIVE_RATE};
use crate::error::IndexError;
use crate::inverted::{InvertedIndex, TokenCombine};
use crate::trie::NameTrie;

/// Default expected element count for the bloom filter.
const DEFAULT_EXPECTED_ELEMENTS: usize = 1 << 20;

/// Rough per-entry memory weights, used by
/// [`estimated_memory_usage`](MemoryIndex::estimated_memory_usage).
const RECORD_WEIGHT: usize = 256;
const MAP_ENTRY_WEIGHT: usize = 48;
const TRIE_NODE_WEIGHT: usize = 56;
const POSTING_WEIGHT: usize = 40;

#[derive(Debug, Default)]
struct IndexInner {
    files: FxHashMap<FileId, FileRecord>,
    path_to_id: FxHashMap<Utf8PathBuf, FileId>,

    name_trie: NameTrie,
    name_bloom: Option<BloomFilter>,
    inverted: InvertedIndex,

    extension_index: FxHashMap<String, FxHashSet<FileId>>,
    size_index: BTreeMap<u64, FxHashSet<FileId>>,
    modified_index: BTreeMap<Timestamp, FxHashSet<FileId>>,
    accessed_index: BTreeMap<Timestamp, FxHashSet<FileId>>,

    parent_to_children: FxHashMap<FileId, FxHashSet<FileId>>,
    child_to_parent: FxHashMap<FileId, FileId>,

    drive_to_files: FxHashMap<DriveId, FxHashSet<FileId>>,
    drives: FxHashMap<DriveId, DriveRecord>,
}

/// The shared in-memory index.
///
/// Cheap to share as `Arc<MemoryIndex>`; all methods take `&self`.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use ff_core::FileRecord;
/// use ff_index::MemoryIndex;
///
/// let index = MemoryIndex::new(1024);
/// let id = index.add(FileRecord::new(Utf8PathBuf::from("/tmp/a.txt"))).unwrap();
///
/// assert_eq!(index.get(id).unwrap().file_name, "a.txt");
/// assert!(index.get_by_path(camino::Utf8Path::new("/tmp/a.txt")).is_some());
/// ```
#[derive(Debug)]
pub struct MemoryIndex {
    inner: RwLock<IndexInner>,

    next_file_id: AtomicU64,
    next_drive_id: AtomicU64,
    epoch: AtomicU64,

    total_files: AtomicU64,
    total_dirs: AtomicU64,
    total_size: AtomicU64,
    max_access_count: AtomicU32,
    last_update: AtomicU64,
    last_full_scan: AtomicU64,
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new(DEFAULT_EXPECTED_ELEMENTS)
    }
}

impl MemoryIndex {
    /// Creates an index with a bloom filter sized for `expected_elements`.
    #[must_use]
    pub fn new(expected_elements: usize) -> Self {
        let inner = IndexInner {
            name_bloom: Some(BloomFilter::new(
                expected_elements,
                DEFAULT_FALSE_POSITIVE_RATE,
            )),
            ..IndexInner::default()
        };
        Self {
            inner: RwLock::new(inner),
            next_file_id: AtomicU64::new(1),
            next_drive_id: AtomicU64::new(1),
            epoch: AtomicU64::new(0),
            total_files: AtomicU64::new(0),
            total_dirs: AtomicU64::new(0),
            total_size: AtomicU64::new(0),
            max_access_count: AtomicU32::new(0),
            last_update: AtomicU64::new(0),
            last_full_scan: AtomicU64::new(0),
        }
    }

    // ----- mutations -------------------------------------------------------

    /// Adds a record, allocating an id when the record carries
    /// [`FileId::UNASSIGNED`].
    ///
    /// # Errors
    ///
    /// [`IndexError::DuplicatePath`] when the path is already live,
    /// [`IndexError::DuplicateId`] when a pre-assigned id is already live.
    pub fn add(&self, mut record: FileRecord) -> Result<FileId, IndexError> {
        let mut inner = self.inner.write();
        if inner.path_to_id.contains_key(&record.full_path) {
            return Err(IndexError::DuplicatePath(record.full_path));
        }
        if record.id.is_unassigned() {
            record.id = FileId::new(self.next_file_id.fetch_add(1, Ordering::Relaxed));
        } else {
            if inner.files.contains_key(&record.id) {
                return Err(IndexError::DuplicateId(record.id));
            }
            self.next_file_id
                .fetch_max(record.id.as_u64() + 1, Ordering::Relaxed);
        }

        Self::resolve_parent(&inner, &mut record);
        let id = record.id;
        Self::insert_views(&mut inner, &record);
        self.stat_delta(&record, true);
        self.note_access_count(record.access_count);
        inner.files.insert(id, record);
        drop(inner);
        self.commit();
        Ok(id)
    }

    /// Adds many records under one lock acquisition.
    ///
    /// Records whose path is already live are skipped (and logged) rather
    /// than failing the batch. Returns the ids actually added.
    pub fn add_batch(&self, records: Vec<FileRecord>) -> Vec<FileId> {
        let mut added = Vec::with_capacity(records.len());
        let mut inner = self.inner.write();
        for mut record in records {
            if inner.path_to_id.contains_key(&record.full_path) {
                debug!(path = %record.full_path, "skipping already-indexed path in batch");
                continue;
            }
            if record.id.is_unassigned() {
                record.id = FileId::new(self.next_file_id.fetch_add(1, Ordering::Relaxed));
            } else {
                if inner.files.contains_key(&record.id) {
                    debug!(id = record.id.as_u64(), "skipping duplicate id in batch");
                    continue;
                }
                self.next_file_id
                    .fetch_max(record.id.as_u64() + 1, Ordering::Relaxed);
            }
            Self::resolve_parent(&inner, &mut record);
            let id = record.id;
            Self::insert_views(&mut inner, &record);
            self.stat_delta(&record, true);
            self.note_access_count(record.access_count);
            inner.files.insert(id, record);
            added.push(id);
        }
        drop(inner);
        if !added.is_empty() {
            self.commit();
        }
        added
    }

    /// Replaces a live record, rebuilding every derived entry.
    ///
    /// The token, extension, size, and date views are updated atomically:
    /// old entries are removed and new ones added under the same write-lock
    /// hold.
    ///
    /// # Errors
    ///
    /// [`IndexError::UnknownId`] when the record's id is not live;
    /// [`IndexError::DuplicatePath`] when the new path belongs to a
    /// different live record.
    pub fn update(&self, record: FileRecord) -> Result<(), IndexError> {
        let mut inner = self.inner.write();
        let id = record.id;
        let Some(old) = inner.files.get(&id).cloned() else {
            return Err(IndexError::UnknownId(id));
        };
        if let Some(&other) = inner.path_to_id.get(&record.full_path) {
            if other != id {
                return Err(IndexError::DuplicatePath(record.full_path));
            }
        }

        Self::remove_views(&mut inner, &old);
        self.stat_delta(&old, false);
        Self::insert_views(&mut inner, &record);
        self.stat_delta(&record, true);
        self.note_access_count(record.access_count);
        inner.files.insert(id, record);
        drop(inner);
        self.commit();
        Ok(())
    }

    /// Removes a record by id.
    ///
    /// # Errors
    ///
    /// [`IndexError::UnknownId`] when nothing is live under `id`.
    pub fn remove(&self, id: FileId) -> Result<FileRecord, IndexError> {
        let mut inner = self.inner.write();
        let Some(record) = inner.files.remove(&id) else {
            return Err(IndexError::UnknownId(id));
        };
        Self::remove_views(&mut inner, &record);
        self.stat_delta(&record, false);
        drop(inner);
        self.commit();
        Ok(record)
    }

    /// Removes many records under one lock acquisition; unknown ids are
    /// skipped. Returns how many were removed.
    pub fn remove_batch(&self, ids: &[FileId]) -> usize {
        let mut removed = 0;
        let mut inner = self.inner.write();
        for id in ids {
            if let Some(record) = inner.files.remove(id) {
                Self::remove_views(&mut inner, &record);
                self.stat_delta(&record, false);
                removed += 1;
            }
        }
        drop(inner);
        if removed > 0 {
            self.commit();
        }
        removed
    }

    /// Removes the record at `path` and every live descendant, in one
    /// atomic operation. Returns the removed ids (the root first).
    ///
    /// This is the delete-event semantic: when a directory disappears its
    /// children are gone from the OS too.
    ///
    /// # Errors
    ///
    /// [`IndexError::UnknownPath`] when nothing is live at `path`.
    pub fn remove_by_path(&self, path: &Utf8Path) -> Result<Vec<FileId>, IndexError> {
        let mut inner = self.inner.write();
        let Some(&root) = inner.path_to_id.get(path) else {
            return Err(IndexError::UnknownPath(path.to_owned()));
        };

        let mut doomed = vec![root];
        let mut cursor = 0;
        while cursor < doomed.len() {
            if let Some(children) = inner.parent_to_children.get(&doomed[cursor]) {
                doomed.extend(children.iter().copied());
            }
            cursor += 1;
        }

        for id in &doomed {
            if let Some(record) = inner.files.remove(id) {
                Self::remove_views(&mut inner, &record);
                self.stat_delta(&record, false);
            }
        }
        drop(inner);
        self.commit();
        Ok(doomed)
    }

    /// Moves a record to a new path, preserving its id.
    ///
    /// The record's name-derived fields, hierarchy entry, and every token
    /// view are rebuilt for the new path under one write-lock hold.
    ///
    /// # Errors
    ///
    /// [`IndexError::UnknownPath`] when nothing is live at `old_path`;
    /// [`IndexError::DuplicatePath`] when `new_path` is already live.
    pub fn rename(
        &self,
        old_path: &Utf8Path,
        new_path: &Utf8Path,
    ) -> Result<FileId, IndexError> {
        let mut inner = self.inner.write();
        let Some(&id) = inner.path_to_id.get(old_path) else {
            return Err(IndexError::UnknownPath(old_path.to_owned()));
        };
        if inner.path_to_id.contains_key(new_path) {
            return Err(IndexError::DuplicatePath(new_path.to_owned()));
        }
        let Some(mut record) = inner.files.get(&id).cloned() else {
            return Err(IndexError::UnknownId(id));
        };

        Self::remove_views(&mut inner, &record);
        record.full_path = new_path.to_owned();
        record.refresh_name_fields();
        // A move may land under a different indexed directory.
        if let Some(parent) = new_path.parent() {
            if let Some(&parent_id) = inner.path_to_id.get(parent) {
                record.parent_id = parent_id;
            }
        }
        Self::insert_views(&mut inner, &record);
        inner.files.insert(id, record);
        drop(inner);
        self.commit();
        Ok(id)
    }

    /// Bumps a record's access counter, returning the new value.
    ///
    /// # Errors
    ///
    /// [`IndexError::UnknownId`] when nothing is live under `id`.
    pub fn record_opened(&self, id: FileId) -> Result<u32, IndexError> {
        let mut inner = self.inner.write();
        let Some(record) = inner.files.get_mut(&id) else {
            return Err(IndexError::UnknownId(id));
        };
        record.access_count = record.access_count.saturating_add(1);
        let count = record.access_count;
        drop(inner);
        self.note_access_count(count);
        self.commit();
        Ok(count)
    }

    /// Drops every record, drive, and derived view.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        let expected = inner
            .name_bloom
            .as_ref()
            .map_or(DEFAULT_EXPECTED_ELEMENTS, BloomFilter::expected_elements);
        *inner = IndexInner {
            name_bloom: Some(BloomFilter::new(expected, DEFAULT_FALSE_POSITIVE_RATE)),
            ..IndexInner::default()
        };
        drop(inner);
        self.total_files.store(0, Ordering::Relaxed);
        self.total_dirs.store(0, Ordering::Relaxed);
        self.total_size.store(0, Ordering::Relaxed);
        self.max_access_count.store(0, Ordering::Relaxed);
        self.commit();
    }

    /// Rebuilds the bloom filter from the live records.
    ///
    /// Useful after heavy deletion churn: the filter is additive, so its
    /// false-positive rate only ever grows until rebuilt.
    pub fn rebuild_bloom(&self) {
        let mut inner = self.inner.write();
        let mut bloom = BloomFilter::new(
            inner.files.len().max(DEFAULT_EXPECTED_ELEMENTS / 16),
            DEFAULT_FALSE_POSITIVE_RATE,
        );
        for record in inner.files.values() {
            bloom.add(&record.normalized_name);
        }
        inner.name_bloom = Some(bloom);
        drop(inner);
        self.commit();
    }

    // ----- drives ----------------------------------------------------------

    /// Registers (or refreshes) a drive, returning its id.
    ///
    /// A drive with the same mount keeps its existing id.
    pub fn add_drive(&self, mut drive: DriveRecord) -> DriveId {
        let mut inner = self.inner.write();
        if let Some(existing) = inner
            .drives
            .values()
            .find(|d| d.mount == drive.mount)
            .map(|d| d.id)
        {
            drive.id = existing;
            inner.drives.insert(existing, drive);
            return existing;
        }
        if drive.id == DriveId::UNASSIGNED {
            drive.id = DriveId::new(self.next_drive_id.fetch_add(1, Ordering::Relaxed));
        } else {
            self.next_drive_id
                .fetch_max(drive.id.as_u64() + 1, Ordering::Relaxed);
        }
        let id = drive.id;
        inner.drives.insert(id, drive);
        id
    }

    /// All registered drives.
    #[must_use]
    pub fn drives(&self) -> Vec<DriveRecord> {
        self.inner.read().drives.values().cloned().collect()
    }

    /// Looks up the drive whose mount contains `path` (longest match wins).
    #[must_use]
    pub fn drive_for_path(&self, path: &Utf8Path) -> Option<DriveId> {
        let inner = self.inner.read();
        inner
            .drives
            .values()
            .filter(|d| path.starts_with(&d.mount))
            .max_by_key(|d| d.mount.as_str().len())
            .map(|d| d.id)
    }

    // ----- retrieval -------------------------------------------------------

    /// Returns a clone of the record under `id`.
    #[must_use]
    pub fn get(&self, id: FileId) -> Option<FileRecord> {
        self.inner.read().files.get(&id).cloned()
    }

    /// Returns a clone of the record at `path`.
    #[must_use]
    pub fn get_by_path(&self, path: &Utf8Path) -> Option<FileRecord> {
        let inner = self.inner.read();
        let id = inner.path_to_id.get(path)?;
        inner.files.get(id).cloned()
    }

    /// Returns clones of a directory's direct children.
    #[must_use]
    pub fn children_of(&self, parent: FileId) -> Vec<FileRecord> {
        let inner = self.inner.read();
        inner
            .parent_to_children
            .get(&parent)
            .map(|children| {
                children
                    .iter()
                    .filter_map(|id| inner.files.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns clones of the records for the given ids, skipping dead ones.
    #[must_use]
    pub fn records_for(&self, ids: &[FileId]) -> Vec<FileRecord> {
        let inner = self.inner.read();
        ids.iter()
            .filter_map(|id| inner.files.get(id).cloned())
            .collect()
    }

    /// Returns a clone of every live record.
    ///
    /// Intended for store synchronization and integrity tooling, not the
    /// search path.
    #[must_use]
    pub fn all_records(&self) -> Vec<FileRecord> {
        self.inner.read().files.values().cloned().collect()
    }

    /// Number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().files.len()
    }

    /// Returns `true` when no records are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().files.is_empty()
    }

    // ----- search ----------------------------------------------------------

    /// Bloom pre-check: `false` means no record has this normalized name.
    #[must_use]
    pub fn might_contain_name(&self, normalized: &str) -> bool {
        self.inner
            .read()
            .name_bloom
            .as_ref()
            .is_none_or(|bloom| bloom.might_contain(normalized))
    }

    /// Ids whose normalized name matches `name` (exactly, or by prefix).
    #[must_use]
    pub fn search_by_name(&self, name: &str, exact: bool) -> Vec<FileId> {
        let normalized = normalize_name(name);
        let inner = self.inner.read();
        let set = if exact {
            inner.name_trie.ids_for_name(&normalized)
        } else {
            inner.name_trie.ids_with_prefix(&normalized)
        };
        set.into_iter().collect()
    }

    /// Ids whose normalized name starts with `prefix`.
    #[must_use]
    pub fn search_by_prefix(&self, prefix: &str) -> Vec<FileId> {
        self.search_by_name(prefix, false)
    }

    /// Ids with the given extension (compared lowercase).
    #[must_use]
    pub fn search_by_extension(&self, extension: &str) -> Vec<FileId> {
        let ext = extension.trim_start_matches('.').to_lowercase();
        let inner = self.inner.read();
        inner
            .extension_index
            .get(&ext)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Ids whose size falls inside `range`.
    #[must_use]
    pub fn search_by_size(&self, range: SizeRange) -> Vec<FileId> {
        let inner = self.inner.read();
        inner
            .size_index
            .range(range.min..=range.max)
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }

    /// Ids whose modification time falls inside `range`.
    #[must_use]
    pub fn search_by_modified(&self, range: DateRange) -> Vec<FileId> {
        let inner = self.inner.read();
        inner
            .modified_index
            .range(range.start..=range.end)
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }

    /// Ids whose access time falls inside `range`.
    #[must_use]
    pub fn search_by_accessed(&self, range: DateRange) -> Vec<FileId> {
        let inner = self.inner.read();
        inner
            .accessed_index
            .range(range.start..=range.end)
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }

    /// Ids carrying the given tokens, intersected or unioned.
    #[must_use]
    pub fn search_by_tokens<S: AsRef<str>>(
        &self,
        tokens: &[S],
        combine: TokenCombine,
    ) -> Vec<FileId> {
        self.inner
            .read()
            .inverted
            .search_multiple(tokens, combine)
            .into_iter()
            .collect()
    }

    /// Applies a query's declarative filters against the sorted indexes,
    /// returning the surviving candidate ids.
    ///
    /// With no active filters this is every live id. The matcher still runs
    /// afterwards; this only narrows.
    #[must_use]
    pub fn filter_ids(&self, query: &SearchQuery) -> Vec<FileId> {
        let inner = self.inner.read();
        let mut candidates: Option<FxHashSet<FileId>> = None;

        let intersect = |current: Option<FxHashSet<FileId>>, next: FxHashSet<FileId>| {
            Some(match current {
                None => next,
                Some(set) => set.intersection(&next).copied().collect(),
            })
        };

        if !query.file_types.is_empty() {
            let mut by_ext = FxHashSet::default();
            for ext in &query.file_types {
                let ext = ext.trim_start_matches('.').to_lowercase();
                if let Some(ids) = inner.extension_index.get(&ext) {
                    by_ext.extend(ids.iter().copied());
                }
            }
            candidates = intersect(candidates, by_ext);
        }

        if !query.size_range.is_unbounded() {
            let in_range = inner
                .size_index
                .range(query.size_range.min..=query.size_range.max)
                .flat_map(|(_, ids)| ids.iter().copied())
                .collect();
            candidates = intersect(candidates, in_range);
        }

        if !query.date_range.is_unbounded() {
            let in_range = inner
                .modified_index
                .range(query.date_range.start..=query.date_range.end)
                .flat_map(|(_, ids)| ids.iter().copied())
                .collect();
            candidates = intersect(candidates, in_range);
        }

        if !query.include_drives.is_empty() {
            let mut on_drives = FxHashSet::default();
            for mount in &query.include_drives {
                let drive = inner
                    .drives
                    .values()
                    .find(|d| &d.mount == mount)
                    .map(|d| d.id);
                if let Some(id) = drive {
                    if let Some(ids) = inner.drive_to_files.get(&id) {
                        on_drives.extend(ids.iter().copied());
                    }
                }
            }
            candidates = intersect(candidates, on_drives);
        }

        let base: Vec<FileId> = match candidates {
            Some(set) => set.into_iter().collect(),
            None => inner.files.keys().copied().collect(),
        };

        if query.exclude_paths.is_empty() {
            return base;
        }
        base.into_iter()
            .filter(|id| {
                inner.files.get(id).is_some_and(|record| {
                    !query
                        .exclude_paths
                        .iter()
                        .any(|prefix| record.full_path.starts_with(prefix))
                })
            })
            .collect()
    }

    /// The largest access count over live records (ranking normalizer).
    #[must_use]
    pub fn max_access_count(&self) -> u32 {
        self.max_access_count.load(Ordering::Relaxed)
    }

    // ----- maintenance -----------------------------------------------------

    /// Walks every §invariant and reports violations without mutating.
    ///
    /// An empty vector means the index is consistent.
    #[must_use]
    pub fn validate_integrity(&self) -> Vec<String> {
        let inner = self.inner.read();
        let mut errors = Vec::new();

        // Path bijection.
        if inner.path_to_id.len() != inner.files.len() {
            errors.push(format!(
                "path map holds {} entries for {} records",
                inner.path_to_id.len(),
                inner.files.len()
            ));
        }
        for (path, id) in &inner.path_to_id {
            match inner.files.get(id) {
                None => errors.push(format!("path {path} maps to dead id {id:?}")),
                Some(record) if &record.full_path != path => errors.push(format!(
                    "path {path} maps to record at {}",
                    record.full_path
                )),
                Some(_) => {}
            }
        }

        let mut files_total = 0u64;
        let mut dirs_total = 0u64;
        let mut size_total = 0u64;

        for (id, record) in &inner.files {
            if record.is_directory() {
                dirs_total += 1;
            } else {
                files_total += 1;
            }
            size_total += record.size;

            // Hierarchy symmetry.
            if inner.child_to_parent.get(id) != Some(&record.parent_id) {
                errors.push(format!("record {id:?} missing from child-parent map"));
            }
            if !inner
                .parent_to_children
                .get(&record.parent_id)
                .is_some_and(|children| children.contains(id))
            {
                errors.push(format!(
                    "record {id:?} missing from children of {:?}",
                    record.parent_id
                ));
            }

            // Drive membership.
            if !inner
                .drive_to_files
                .get(&record.drive_id)
                .is_some_and(|ids| ids.contains(id))
            {
                errors.push(format!(
                    "record {id:?} missing from drive bucket {:?}",
                    record.drive_id
                ));
            }

            // Inverted postings.
            for token in &record.tokens {
                if !inner.inverted.search(token).contains(id) {
                    errors.push(format!("record {id:?} missing posting for '{token}'"));
                }
            }

            // Bloom one-sidedness.
            if let Some(bloom) = &inner.name_bloom {
                if !bloom.might_contain(&record.normalized_name) {
                    errors.push(format!(
                        "bloom filter reports '{}' absent",
                        record.normalized_name
                    ));
                }
            }

            // Extension bucket.
            let in_ext_bucket = inner
                .extension_index
                .get(&record.extension)
                .is_some_and(|ids| ids.contains(id));
            if record.extension.is_empty() {
                if in_ext_bucket {
                    errors.push(format!("record {id:?} indexed under empty extension"));
                }
            } else if !in_ext_bucket {
                errors.push(format!(
                    "record {id:?} missing from extension bucket '{}'",
                    record.extension
                ));
            }

            // Range buckets.
            if !inner
                .size_index
                .get(&record.size)
                .is_some_and(|ids| ids.contains(id))
            {
                errors.push(format!("record {id:?} missing from size bucket"));
            }
            if !inner
                .modified_index
                .get(&record.last_modified)
                .is_some_and(|ids| ids.contains(id))
            {
                errors.push(format!("record {id:?} missing from modified bucket"));
            }
            if !inner
                .accessed_index
                .get(&record.last_accessed)
                .is_some_and(|ids| ids.contains(id))
            {
                errors.push(format!("record {id:?} missing from accessed bucket"));
            }
        }

        errors.extend(inner.inverted.consistency_errors());

        // Empty buckets must have been pruned.
        if inner.size_index.values().any(FxHashSet::is_empty) {
            errors.push("size index holds an empty bucket".to_owned());
        }
        if inner.modified_index.values().any(FxHashSet::is_empty) {
            errors.push("modified index holds an empty bucket".to_owned());
        }
        if inner.accessed_index.values().any(FxHashSet::is_empty) {
            errors.push("accessed index holds an empty bucket".to_owned());
        }

        // Totals.
        if self.total_files.load(Ordering::Relaxed) != files_total {
            errors.push(format!(
                "file counter {} disagrees with {} live files",
                self.total_files.load(Ordering::Relaxed),
                files_total
            ));
        }
        if self.total_dirs.load(Ordering::Relaxed) != dirs_total {
            errors.push(format!(
                "dir counter {} disagrees with {} live dirs",
                self.total_dirs.load(Ordering::Relaxed),
                dirs_total
            ));
        }
        if self.total_size.load(Ordering::Relaxed) != size_total {
            errors.push(format!(
                "size counter {} disagrees with {} summed bytes",
                self.total_size.load(Ordering::Relaxed),
                size_total
            ));
        }

        errors
    }

    /// Rough bytes held by the index, from entry counts and per-entry
    /// weights.
    #[must_use]
    pub fn estimated_memory_usage(&self) -> usize {
        let inner = self.inner.read();
        let mut bytes = inner.files.len() * (RECORD_WEIGHT + MAP_ENTRY_WEIGHT);
        bytes += inner.path_to_id.len() * MAP_ENTRY_WEIGHT;
        bytes += inner.name_trie.node_count() * TRIE_NODE_WEIGHT;
        bytes += inner
            .name_bloom
            .as_ref()
            .map_or(0, BloomFilter::bit_array_bytes);
        bytes += inner.inverted.posting_count() * POSTING_WEIGHT;
        bytes += inner.extension_index.len() * MAP_ENTRY_WEIGHT;
        bytes += (inner.size_index.len()
            + inner.modified_index.len()
            + inner.accessed_index.len())
            * MAP_ENTRY_WEIGHT;
        bytes += (inner.parent_to_children.len() + inner.child_to_parent.len())
            * MAP_ENTRY_WEIGHT;
        bytes += inner.drive_to_files.len() * MAP_ENTRY_WEIGHT;
        bytes
    }

    /// A statistics snapshot from the relaxed counters.
    #[must_use]
    pub fn statistics(&self) -> IndexStatistics {
        IndexStatistics {
            total_files: self.total_files.load(Ordering::Relaxed),
            total_dirs: self.total_dirs.load(Ordering::Relaxed),
            total_size: self.total_size.load(Ordering::Relaxed),
            indexed_drives: self.inner.read().drives.len() as u32,
            last_full_scan: self.last_full_scan.load(Ordering::Relaxed) as Timestamp,
            last_update: self.last_update.load(Ordering::Relaxed) as Timestamp,
            progress: 0.0,
            is_indexing: false,
        }
    }

    /// Records that a full crawl just finished.
    pub fn note_full_scan(&self) {
        self.last_full_scan.store(now_secs(), Ordering::Relaxed);
    }

    /// The mutation epoch; bumps on every committed write.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    // ----- internals -------------------------------------------------------

    fn commit(&self) {
        self.epoch.fetch_add(1, Ordering::Release);
        self.last_update.store(now_secs(), Ordering::Relaxed);
    }

    fn note_access_count(&self, count: u32) {
        self.max_access_count.fetch_max(count, Ordering::Relaxed);
    }

    fn stat_delta(&self, record: &FileRecord, add: bool) {
        let (files, dirs) = if record.is_directory() { (0, 1) } else { (1, 0) };
        if add {
            self.total_files.fetch_add(files, Ordering::Relaxed);
            self.total_dirs.fetch_add(dirs, Ordering::Relaxed);
            self.total_size.fetch_add(record.size, Ordering::Relaxed);
        } else {
            self.total_files.fetch_sub(files, Ordering::Relaxed);
            self.total_dirs.fetch_sub(dirs, Ordering::Relaxed);
            self.total_size.fetch_sub(record.size, Ordering::Relaxed);
        }
    }

    /// Fills in an unassigned `parent_id` from the live path map.
    ///
    /// Crawl batches arrive parents-first, so by the time a child is
    /// inserted its directory is already resolvable.
    fn resolve_parent(inner: &IndexInner, record: &mut FileRecord) {
        if !record.parent_id.is_unassigned() {
            return;
        }
        if let Some(parent) = record.full_path.parent() {
            if let Some(&parent_id) = inner.path_to_id.get(parent) {
                record.parent_id = parent_id;
            }
        }
    }

    /// Inserts a record into every derived view. The caller owns the write
    /// lock and inserts into `files` itself.
    fn insert_views(inner: &mut IndexInner, record: &FileRecord) {
        let id = record.id;
        inner.path_to_id.insert(record.full_path.clone(), id);
        inner.name_trie.insert(&record.normalized_name, id);
        if let Some(bloom) = &mut inner.name_bloom {
            bloom.add(&record.normalized_name);
        }
        inner.inverted.update_document(id, &record.tokens);
        if !record.extension.is_empty() {
            inner
                .extension_index
                .entry(record.extension.clone())
                .or_default()
                .insert(id);
        }
        inner.size_index.entry(record.size).or_default().insert(id);
        inner
            .modified_index
            .entry(record.last_modified)
            .or_default()
            .insert(id);
        inner
            .accessed_index
            .entry(record.last_accessed)
            .or_default()
            .insert(id);
        inner
            .parent_to_children
            .entry(record.parent_id)
            .or_default()
            .insert(id);
        inner.child_to_parent.insert(id, record.parent_id);
        inner
            .drive_to_files
            .entry(record.drive_id)
            .or_default()
            .insert(id);
    }

    /// Removes a record from every derived view except the bloom filter
    /// (which is additive). The caller owns the write lock and removes from
    /// `files` itself.
    fn remove_views(inner: &mut IndexInner, record: &FileRecord) {
        let id = record.id;
        inner.path_to_id.remove(&record.full_path);
        inner.name_trie.remove(&record.normalized_name, id);
        inner.inverted.remove_document(id);

        if !record.extension.is_empty() {
            if let Some(ids) = inner.extension_index.get_mut(&record.extension) {
                ids.remove(&id);
                if ids.is_empty() {
                    inner.extension_index.remove(&record.extension);
                }
            }
        }
        if let Some(ids) = inner.size_index.get_mut(&record.size) {
            ids.remove(&id);
            if ids.is_empty() {
                inner.size_index.remove(&record.size);
            }
        }
        if let Some(ids) = inner.modified_index.get_mut(&record.last_modified) {
            ids.remove(&id);
            if ids.is_empty() {
                inner.modified_index.remove(&record.last_modified);
            }
        }
        if let Some(ids) = inner.accessed_index.get_mut(&record.last_accessed) {
            ids.remove(&id);
            if ids.is_empty() {
                inner.accessed_index.remove(&record.last_accessed);
            }
        }
        if let Some(children) = inner.parent_to_children.get_mut(&record.parent_id) {
            children.remove(&id);
            if children.is_empty() {
                inner.parent_to_children.remove(&record.parent_id);
            }
        }
        inner.child_to_parent.remove(&id);
        if let Some(ids) = inner.drive_to_files.get_mut(&record.drive_id) {
            ids.remove(&id);
            if ids.is_empty() {
                inner.drive_to_files.remove(&record.drive_id);
            }
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}
