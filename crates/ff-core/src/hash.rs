//! Fast hash map and hash set type aliases.
//!
//! Every internal map in the index keys on strings or numeric ids, neither of
//! which needs a DoS-resistant hasher, so the workspace uses the Fx hash
//! algorithm from `rustc-hash` throughout. For the string-heavy workloads
//! here (paths, tokens, extensions) it is roughly twice as fast as the
//! standard library default.

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// Creates a new empty [`FxHashMap`].
#[inline]
#[must_use]
pub fn fx_hash_map<K, V>() -> FxHashMap<K, V> {
    FxHashMap::default()
}

/// Creates a new empty [`FxHashSet`].
#[inline]
#[must_use]
pub fn fx_hash_set<V>() -> FxHashSet<V> {
    FxHashSet::default()
}

/// Creates a new [`FxHashMap`] that can hold at least `capacity` entries
/// without reallocating.
///
/// # Examples
///
/// ```
/// let map: ff_core::FxHashMap<String, u64> = ff_core::fx_hash_map_with_capacity(1024);
/// assert!(map.capacity() >= 1024);
/// ```
#[inline]
#[must_use]
pub fn fx_hash_map_with_capacity<K, V>(capacity: usize) -> FxHashMap<K, V> {
    FxHashMap::with_capacity_and_hasher(capacity, rustc_hash::FxBuildHasher)
}
