//! Least-recently-used cache with statistics.
//!
//! [`LruCache`] is a plain (non-thread-safe) map plus recency list; the
//! [`CacheManager`](crate::CacheManager) wraps each instance in its own
//! mutex. The recency list is a doubly-linked list threaded through a slab
//! of slots, so promotion to most-recently-used is O(1) with no unsafe
//! code.

use std::hash::Hash;
use std::time::Instant;

use ff_core::FxHashMap;
use serde::{Deserialize, Serialize};

/// Sentinel slab index meaning "no slot".
const NIL: usize = usize::MAX;

/// Counters describing cache effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups that found a live entry.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Entries pushed out by capacity pressure.
    pub evictions: u64,
}

impl CacheStats {
    /// `hits / (hits + misses)`, or 0 before any lookup.
    #[must_use]
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

#[derive(Debug)]
struct Slot<K, V> {
    key: K,
    value: V,
    last_access: Instant,
    prev: usize,
    next: usize,
}

/// A fixed-capacity LRU map.
///
/// - `put` inserts at the front, replacing and promoting an existing key
/// - `get` promotes on hit and returns a clone
/// - at capacity, the least-recently-used entry is evicted
///
/// # Examples
///
/// ```
/// use ff_cache::LruCache;
///
/// let mut cache = LruCache::new(2);
/// cache.put("a", 1);
/// cache.put("b", 2);
/// assert_eq!(cache.get(&"a"), Some(1)); // promotes "a"
///
/// cache.put("c", 3); // evicts "b", the coldest entry
/// assert_eq!(cache.get(&"b"), None);
/// assert_eq!(cache.stats().evictions, 1);
/// ```
#[derive(Debug)]
pub struct LruCache<K, V> {
    map: FxHashMap<K, usize>,
    slots: Vec<Slot<K, V>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    capacity: usize,
    stats: CacheStats,
}

impl<K: Eq + Hash + Clone, V: Clone> LruCache<K, V> {
    /// Creates a cache holding at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            map: FxHashMap::default(),
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            capacity: capacity.max(1),
            stats: CacheStats::default(),
        }
    }

    /// Inserts or replaces a value, making it the most recent entry.
    ///
    /// Returns the entry evicted to make room, if any.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&slot) = self.map.get(&key) {
            self.slots[slot].value = value;
            self.slots[slot].last_access = Instant::now();
            self.promote(slot);
            return None;
        }

        let evicted = if self.map.len() >= self.capacity {
            self.evict_lru()
        } else {
            None
        };

        let slot = self.allocate(key.clone(), value);
        self.map.insert(key, slot);
        self.link_front(slot);
        evicted
    }

    /// Looks up a key, promoting it on hit.
    pub fn get(&mut self, key: &K) -> Option<V> {
        match self.map.get(key) {
            Some(&slot) => {
                self.slots[slot].last_access = Instant::now();
                self.promote(slot);
                self.stats.hits += 1;
                Some(self.slots[slot].value.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Looks up a key without promoting it or touching the statistics.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.map.get(key).map(|&slot| &self.slots[slot].value)
    }

    /// Returns `true` when the key is cached, without promotion.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Removes a key, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let slot = self.map.remove(key)?;
        self.unlink(slot);
        let value = self.slots[slot].value.clone();
        self.free.push(slot);
        Some(value)
    }

    /// Drops every entry; statistics are kept.
    pub fn clear(&mut self) {
        self.map.clear();
        self.slots.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    /// Changes the capacity, evicting cold entries until the cache fits.
    pub fn resize(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.map.len() > self.capacity {
            self.evict_lru();
        }
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Maximum entry count.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Effectiveness counters.
    #[must_use]
    pub const fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Zeroes the effectiveness counters.
    pub fn reset_stats(&mut self) {
        self.stats = CacheStats::default();
    }

    /// Removes every entry failing `keep`, returning how many were dropped.
    ///
    /// Used by the manager's TTL sweep.
    pub fn retain<F: FnMut(&K, &V) -> bool>(&mut self, mut keep: F) -> usize {
        let slots = &self.slots;
        let doomed: Vec<K> = self
            .map
            .iter()
            .filter_map(|(key, &slot)| {
                if keep(key, &slots[slot].value) {
                    None
                } else {
                    Some(key.clone())
                }
            })
            .collect();
        for key in &doomed {
            self.remove(key);
        }
        doomed.len()
    }

    // ----- list plumbing ---------------------------------------------------

    fn allocate(&mut self, key: K, value: V) -> usize {
        let slot = Slot {
            key,
            value,
            last_access: Instant::now(),
            prev: NIL,
            next: NIL,
        };
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = slot;
                index
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        }
    }

    fn link_front(&mut self, slot: usize) {
        self.slots[slot].prev = NIL;
        self.slots[slot].next = self.head;
        if self.head != NIL {
            self.slots[self.head].prev = slot;
        }
        self.head = slot;
        if self.tail == NIL {
            self.tail = slot;
        }
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.slots[slot].prev, self.slots[slot].next);
        if prev != NIL {
            self.slots[prev].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.slots[next].prev = prev;
        } else {
            self.tail = prev;
        }
    }

    fn promote(&mut self, slot: usize) {
        if self.head == slot {
            return;
        }
        self.unlink(slot);
        self.link_front(slot);
    }

    fn evict_lru(&mut self) -> Option<(K, V)> {
        if self.tail == NIL {
            return None;
        }
        let slot = self.tail;
        self.unlink(slot);
        let key = self.slots[slot].key.clone();
        let value = self.slots[slot].value.clone();
        self.map.remove(&key);
        self.free.push(slot);
        self.stats.evictions += 1;
        Some((key, value))
    }
}
