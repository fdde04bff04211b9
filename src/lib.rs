//! Compact [Bloom filter](https://en.wikipedia.org/wiki/Bloom_filter) with
//! approximate cardinality estimation and set union.
//!
//! A membership test returns either "likely member" or "definitely not a member".
//! Only false positives can occur: an element that has been added to the filter
//! will always be identified as a likely member. Elements can be added, but not removed.
//!
//! ### Example
//!
//! ```rust
//! // Room for 10000 elements at a false-positives rate less than 1/200.
//! let mut blacklist = mbloom::Filter::new(10000, 200);
//! let url = "https://rascal.com";
//! assert!(!blacklist.add_str(url));
//! assert!(blacklist.test_str(url));
//! assert_eq!(blacklist.count(), 1);
//! ```
//!
//! Two filters with the same parameters can be combined, the count of the
//! result is estimated from the number of bits set.
//!
//! ```rust
//! let (n, p) = (1000, 100);
//! let mut f1 = mbloom::Filter::new(n, p);
//! let mut f2 = mbloom::Filter::new(n, p);
//! for i in (0..n / 2).step_by(2) {
//!     f1.add_str(&i.to_string());
//! }
//! for i in (1..n / 2).step_by(2) {
//!     f2.add_str(&i.to_string());
//! }
//! assert_eq!(f1.union(&f2).unwrap().count(), 505);
//! ```
//!
//! ### Hasher
//!
//! Every operation makes a single call to [MurmurHash3 x64-128](murmur3_x64_128).
//! The probed bit positions are derived from the two 64 bit halves by double hashing,
//! which [Kirsch and Mitzenmacher](https://doi.org/10.1002/rsa.20208) have shown to be as
//! good as independent hash functions.
//!
//! ### Filter size
//!
//! A full filter with a false-positives rate of 1/p uses roughly 0.26ln(p) bytes
//! per element and performs ⌊1.4ln(p)⌋ + 1 bit array lookups per test.
//!
//! | p | Bytes per item | Lookups |
//! |---:|---:|---:|
//! | 4 | 0.4 | 2 |
//! | 8 | 0.5 | 3 |
//! | 16 | 0.7 | 4 |
//! | 32 | 0.9 | 5 |
//! | 64 | 1.1 | 6 |
//! | 128 | 1.3 | 7 |
//! | 256 | 1.5 | 8 |
//! | 512 | 1.6 | 9 |
//! | 1024 | 1.8 | 10 |
//!
//! The bit array always holds a power of two number of 64 bit words.
//!
//! ### Limitations
//!
//! The hash is not intended for cryptographic use and gives no protection against
//! adversarial input.
//!
//! The [binary representation](Filter::to_bytes) uses the host byte order, so filters
//! cannot be moved between little-endian and big-endian machines.
//!
//! ### Concurrency
//!
//! Insertion takes `&mut self`, so concurrent insertions into the same filter require
//! external synchronization (e.g. a `Mutex`). Tests, counts and unions only read.
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

use std::{hash::Hash, num::NonZeroU8};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use murmur3::{murmur3_x64_128, murmur3_x64_128_str, Murmur3Hasher};

mod codec;
mod murmur3;

/// Upper bound for the table size, keeps the total number of bits below 2^63.
const MAX_WORDS: u64 = 1 << 57;

/// Bloom filter backed by a power of two number of 64 bit words.
///
/// Filters created with the same parameters can be combined with [`Filter::union`]
/// or [`Filter::merge`].
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "codec::FilterRecord", into = "codec::FilterRecord")
)]
pub struct Filter {
    words: Box<[u64]>,
    probes: NonZeroU8,
    count: i64,
}

#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// The filters differ in table size or number of probes
    IncompatibleFilters,
    /// The input cannot be decoded into a valid filter
    InvalidData(String),
    /// The encoded filter uses an unknown format version
    UnsupportedVersion(u32),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for Error {}

trait BitExt {
    fn is_bit_set(&self, i: usize) -> bool;
    fn set_bit(&mut self, i: usize);
    /// Number of set bits (1s)
    fn popcnt(&self) -> u64;
}

impl BitExt for u64 {
    #[inline]
    fn is_bit_set(&self, i: usize) -> bool {
        (*self & (1 << i)) != 0
    }

    #[inline]
    fn set_bit(&mut self, i: usize) {
        *self |= 1 << i
    }

    #[inline]
    fn popcnt(&self) -> u64 {
        self.count_ones() as u64
    }
}

/// Iterator over the `(word, bit)` positions probed for a single element.
struct Probes {
    h1: u64,
    h2: u64,
    mask: u64,
    remaining: u8,
}

impl Iterator for Probes {
    type Item = (usize, usize);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.remaining = self.remaining.checked_sub(1)?;
        self.h1 = self.h1.wrapping_add(self.h2);
        let bit = self.h1 & self.mask;
        Some(((bit >> 6) as usize, (bit & 63) as usize))
    }
}

impl Filter {
    /// Creates an empty filter with room for `expected_elements` at a
    /// false-positives rate less than `1 / inverse_fp_rate`.
    ///
    /// `inverse_fp_rate` is clamped to at least 1, which results in a single probe.
    ///
    /// # Panics
    ///
    /// Panics if the table would need more than 2^57 words. Smaller tables that
    /// can't be allocated abort the process, as with any `Vec` allocation failure.
    pub fn new(expected_elements: u64, inverse_fp_rate: u64) -> Self {
        let ln_p = (inverse_fp_rate.max(1) as f64).ln();
        let min_words = (0.0325 * ln_p * expected_elements as f64) as u64;
        assert!(
            min_words <= MAX_WORDS,
            "filter would need {min_words} words"
        );
        let probes = NonZeroU8::new((1.4 * ln_p) as u8 + 1).unwrap_or(NonZeroU8::MIN);
        Self::with_words(min_words.next_power_of_two(), probes)
    }

    fn with_words(num_words: u64, probes: NonZeroU8) -> Self {
        debug_assert!(num_words.is_power_of_two());
        let words = vec![0u64; num_words.try_into().unwrap()].into_boxed_slice();
        Self {
            words,
            probes,
            count: 0,
        }
    }

    /// Rebuilds a filter from the raw word array, number of probes and element count,
    /// as returned by [`Filter::into_parts`].
    ///
    /// Errors if the number of words isn't a power of two, if `probes` is zero or
    /// if `count` is negative.
    pub fn from_parts(words: Vec<u64>, probes: u8, count: i64) -> Result<Self, Error> {
        if !words.len().is_power_of_two() || words.len() as u64 > MAX_WORDS {
            return Err(Error::InvalidData(format!(
                "invalid table size of {} words",
                words.len()
            )));
        }
        let probes =
            NonZeroU8::new(probes).ok_or_else(|| Error::InvalidData("zero probes".into()))?;
        if count < 0 {
            return Err(Error::InvalidData(format!("negative count {count}")));
        }
        Ok(Self {
            words: words.into_boxed_slice(),
            probes,
            count,
        })
    }

    /// Splits the filter into its word array, number of probes and element count.
    pub fn into_parts(self) -> (Vec<u64>, u8, i64) {
        (self.words.into_vec(), self.probes.get(), self.count)
    }

    /// The raw bit array.
    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    #[inline]
    pub fn num_words(&self) -> usize {
        self.words.len()
    }

    /// Size of the bit array in bits.
    #[inline]
    pub fn num_bits(&self) -> u64 {
        (self.words.len() as u64) << 6
    }

    /// Number of bits probed per operation.
    #[inline]
    pub fn num_probes(&self) -> u8 {
        self.probes.get()
    }

    /// Estimated number of distinct elements in the filter.
    ///
    /// This is exact for a filter only modified by insertions, up to false positives
    /// during insertion. After a union it is an estimate derived from the bits set.
    #[inline]
    pub fn count(&self) -> i64 {
        self.count
    }

    /// Whether no bit is set, i.e. every test returns false.
    ///
    /// This doesn't rely on [`Filter::count`], which is only an estimate after a union.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Number of bits set in the bit array.
    pub fn bits_set(&self) -> u64 {
        self.words.iter().map(BitExt::popcnt).sum()
    }

    /// Fraction of the bit array that is set.
    pub fn load_factor(&self) -> f64 {
        self.bits_set() as f64 / self.num_bits() as f64
    }

    /// Probability that a test for an element that was never added returns true,
    /// at the current load.
    pub fn current_error_ratio(&self) -> f64 {
        self.load_factor().powi(self.probes.get() as i32)
    }

    /// Whether `other` can be combined with this filter.
    #[inline]
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.words.len() == other.words.len() && self.probes == other.probes
    }

    /// Adds `item` to the filter and tells if it was already a likely member.
    ///
    /// The count is only incremented if at least one probed bit was newly set.
    pub fn add(&mut self, item: &[u8]) -> bool {
        let (h1, h2) = murmur3_x64_128(item);
        self.add_hashes(h1, h2)
    }

    /// Same as [`Filter::add`] for text.
    pub fn add_str(&mut self, item: &str) -> bool {
        let (h1, h2) = murmur3_x64_128_str(item);
        self.add_hashes(h1, h2)
    }

    /// Tells if `item` is a likely member of the filter.
    /// If true, `item` is probably a member; if false, it's definitely not a member.
    pub fn test(&self, item: &[u8]) -> bool {
        let (h1, h2) = murmur3_x64_128(item);
        self.test_hashes(h1, h2)
    }

    /// Same as [`Filter::test`] for text.
    pub fn test_str(&self, item: &str) -> bool {
        let (h1, h2) = murmur3_x64_128_str(item);
        self.test_hashes(h1, h2)
    }

    /// Adds any hashable `item`, hashed with [`Murmur3Hasher`], and tells if it was
    /// already a likely member.
    ///
    /// Note that `Hash` implementations frame their data (e.g. `str` appends a `0xff`
    /// byte), so `insert("a")` and `add_str("a")` probe different bits.
    pub fn insert<T: Hash + ?Sized>(&mut self, item: &T) -> bool {
        let (h1, h2) = Self::hash(item);
        self.add_hashes(h1, h2)
    }

    /// Tells if the hashable `item` is a likely member, see [`Filter::insert`].
    pub fn contains<T: Hash + ?Sized>(&self, item: &T) -> bool {
        let (h1, h2) = Self::hash(item);
        self.test_hashes(h1, h2)
    }

    /// Returns a new filter holding all elements of both `self` and `other`.
    ///
    /// The count of the result is estimated from the number of bits set,
    /// it approximates the size of the union rather than the sum of both counts.
    ///
    /// Errors with [`Error::IncompatibleFilters`] unless both filters have the same
    /// table size and number of probes.
    pub fn union(&self, other: &Self) -> Result<Self, Error> {
        if !self.is_compatible(other) {
            return Err(Error::IncompatibleFilters);
        }
        let words = self
            .words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| a | b)
            .collect();
        let mut result = Self {
            words,
            probes: self.probes,
            count: 0,
        };
        result.count = result.estimate_count();
        Ok(result)
    }

    /// Merges `other` filter into `self`.
    ///
    /// The count becomes the estimate from the merged bits, but never decreases.
    ///
    /// Errors with [`Error::IncompatibleFilters`] unless both filters have the same
    /// table size and number of probes, in which case `self` is left untouched.
    pub fn merge(&mut self, other: &Self) -> Result<(), Error> {
        if !self.is_compatible(other) {
            return Err(Error::IncompatibleFilters);
        }
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            *a |= b;
        }
        self.count = self.count.max(self.estimate_count());
        Ok(())
    }

    fn add_hashes(&mut self, h1: u64, h2: u64) -> bool {
        let mut member = true;
        for (word_idx, bit) in self.probe_positions(h1, h2) {
            let word = &mut self.words[word_idx];
            if !word.is_bit_set(bit) {
                member = false;
                word.set_bit(bit);
            }
        }
        if !member {
            self.count = self.count.saturating_add(1);
        }
        member
    }

    fn test_hashes(&self, h1: u64, h2: u64) -> bool {
        self.probe_positions(h1, h2)
            .all(|(word_idx, bit)| self.words[word_idx].is_bit_set(bit))
    }

    #[inline]
    fn probe_positions(&self, h1: u64, h2: u64) -> Probes {
        Probes {
            h1,
            h2,
            mask: self.num_bits() - 1,
            remaining: self.probes.get(),
        }
    }

    /// Maximum likelihood estimate of the number of elements: (m / k) ln(m / (m - X)).
    /// Saturates to `i64::MAX` when every bit is set.
    fn estimate_count(&self) -> i64 {
        let m = self.num_bits() as f64;
        let x = self.bits_set() as f64;
        (m / self.probes.get() as f64 * (m / (m - x)).ln()) as i64
    }

    #[inline]
    fn hash<T: Hash + ?Sized>(item: &T) -> (u64, u64) {
        let mut hasher = Murmur3Hasher::new();
        item.hash(&mut hasher);
        hasher.finish128()
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter")
            .field("words", &"[..]")
            .field("num_words", &self.words.len())
            .field("probes", &self.probes)
            .field("count", &self.count)
            .finish()
    }
}
