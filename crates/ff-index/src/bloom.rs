//! Bloom filter over normalized file names.
//!
//! The filter lets the search engine reject "no file is named anything like
//! this" queries without touching the trie or a candidate scan. False
//! positives fall through to the matcher harmlessly; false negatives cannot
//! happen for inserted names.
//!
//! Sizing follows the standard formulas for a target false-positive rate
//! `p` at an expected element count `n`:
//!
//! ```text
//! m = ceil(-n * ln(p) / ln(2)^2)      bits
//! k = ceil(m / n * ln(2))             hash functions
//! ```
//!
//! The `k` probe positions come from double hashing: two base hashes
//! combined as `h1 + i * h2`.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

/// Default design false-positive rate.
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.01;

/// An additive bloom filter.
///
/// Deletions are not supported; when removals pile up the owning index
/// rebuilds the filter from the live records (see
/// [`MemoryIndex::rebuild_bloom`](crate::MemoryIndex::rebuild_bloom)).
///
/// # Examples
///
/// ```
/// use ff_index::BloomFilter;
///
/// let mut bloom = BloomFilter::new(10_000, 0.01);
/// bloom.add("annual report pdf");
///
/// assert!(bloom.might_contain("annual report pdf"));
/// // Absence reports are definitive.
/// ```
#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: Vec<u64>,
    num_bits: usize,
    num_hashes: u32,
    expected_elements: usize,
    element_count: usize,
}

impl BloomFilter {
    /// Creates a filter sized for `expected_elements` at the given
    /// false-positive rate.
    ///
    /// The rate is clamped into `(0, 0.5]` and the element count to at
    /// least 1, so degenerate inputs still produce a working filter.
    #[must_use]
    pub fn new(expected_elements: usize, false_positive_rate: f64) -> Self {
        let n = expected_elements.max(1) as f64;
        let p = false_positive_rate.clamp(1e-9, 0.5);

        let ln2 = std::f64::consts::LN_2;
        let num_bits = ((-n * p.ln()) / (ln2 * ln2)).ceil() as usize;
        let num_bits = num_bits.max(64);
        let num_hashes = ((num_bits as f64 / n) * ln2).ceil() as u32;
        let num_hashes = num_hashes.clamp(1, 16);

        Self {
            bits: vec![0; num_bits.div_ceil(64)],
            num_bits,
            num_hashes,
            expected_elements: expected_elements.max(1),
            element_count: 0,
        }
    }

    /// Adds an element.
    pub fn add(&mut self, element: &str) {
        let (h1, h2) = Self::hash_pair(element);
        for i in 0..self.num_hashes {
            let bit = self.position(h1, h2, i);
            self.bits[bit / 64] |= 1 << (bit % 64);
        }
        self.element_count += 1;
    }

    /// Returns `false` if the element was definitely never added; `true`
    /// means it is possibly present.
    #[must_use]
    pub fn might_contain(&self, element: &str) -> bool {
        let (h1, h2) = Self::hash_pair(element);
        (0..self.num_hashes).all(|i| {
            let bit = self.position(h1, h2, i);
            self.bits[bit / 64] & (1 << (bit % 64)) != 0
        })
    }

    /// Resets every bit and the element count.
    pub fn clear(&mut self) {
        self.bits.fill(0);
        self.element_count = 0;
    }

    /// Elements added since construction or the last clear.
    #[must_use]
    pub const fn element_count(&self) -> usize {
        self.element_count
    }

    /// The element count the filter was sized for.
    #[must_use]
    pub const fn expected_elements(&self) -> usize {
        self.expected_elements
    }

    /// Returns `true` once more elements were added than the filter was
    /// sized for, the signal the owning index uses to schedule a rebuild.
    #[must_use]
    pub const fn is_saturated(&self) -> bool {
        self.element_count > self.expected_elements
    }

    /// The expected false-positive rate at the current fill level:
    /// `(1 - e^(-k*n/m))^k`.
    #[must_use]
    pub fn estimated_false_positive_rate(&self) -> f64 {
        let k = f64::from(self.num_hashes);
        let n = self.element_count as f64;
        let m = self.num_bits as f64;
        (1.0 - (-k * n / m).exp()).powf(k)
    }

    /// Size of the bit array in bytes (for memory estimation).
    #[must_use]
    pub fn bit_array_bytes(&self) -> usize {
        self.bits.len() * 8
    }

    #[inline]
    fn position(&self, h1: u64, h2: u64, i: u32) -> usize {
        let combined = h1.wrapping_add(u64::from(i).wrapping_mul(h2));
        (combined % self.num_bits as u64) as usize
    }

    /// Two base hashes for double hashing. The second is forced odd so the
    /// probe stride never degenerates to zero.
    fn hash_pair(element: &str) -> (u64, u64) {
        let mut first = FxHasher::default();
        element.hash(&mut first);
        let h1 = first.finish();

        let mut second = FxHasher::default();
        h1.hash(&mut second);
        element.hash(&mut second);
        let h2 = second.finish() | 1;

        (h1, h2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_added_elements_are_found() {
        let mut bloom = BloomFilter::new(1000, 0.01);
        for i in 0..1000 {
            bloom.add(&format!("file {i} txt"));
        }
        for i in 0..1000 {
            assert!(bloom.might_contain(&format!("file {i} txt")));
        }
        assert_eq!(bloom.element_count(), 1000);
    }

    #[test]
    fn test_clear_resets() {
        let mut bloom = BloomFilter::new(100, 0.01);
        bloom.add("something");
        bloom.clear();
        assert!(!bloom.might_contain("something"));
        assert_eq!(bloom.element_count(), 0);
    }

    #[test]
    fn test_saturation_flag() {
        let mut bloom = BloomFilter::new(4, 0.01);
        for i in 0..5 {
            bloom.add(&format!("{i}"));
        }
        assert!(bloom.is_saturated());
    }

    #[test]
    fn test_false_positive_rate_within_design_bound() {
        // Fill to capacity, then probe with 10x capacity of absent names;
        // the observed rate should stay within 2x the design p.
        let capacity = 2000;
        let design_p = 0.01;
        let mut bloom = BloomFilter::new(capacity, design_p);
        for i in 0..capacity {
            bloom.add(&format!("present {i}"));
        }

        let probes = capacity * 10;
        let false_positives = (0..probes)
            .filter(|i| bloom.might_contain(&format!("absent {i}")))
            .count();
        let observed = false_positives as f64 / probes as f64;
        assert!(
            observed <= design_p * 2.0,
            "observed fpr {observed} exceeds 2x design {design_p}"
        );
    }

    #[test]
    fn test_degenerate_parameters_still_work() {
        let mut bloom = BloomFilter::new(0, 5.0);
        bloom.add("x");
        assert!(bloom.might_contain("x"));
    }

    proptest! {
        /// No false negatives, ever.
        #[test]
        fn prop_one_sided(names in proptest::collection::vec("[a-z0-9 ]{1,32}", 1..200)) {
            let mut bloom = BloomFilter::new(names.len(), 0.01);
            for name in &names {
                bloom.add(name);
            }
            for name in &names {
                prop_assert!(bloom.might_contain(name));
            }
        }
    }
}
