//! MurmurHash3 x64-128 with a zero seed.
//!
//! Words are loaded as little-endian, which is also what the reference
//! implementation does on the x86 hosts it was published for.
//!
//! The streaming hasher's buffering and the tail/finalization steps are adapted from
//! Apache DataSketches (datasketches-rust `hash/murmurhash.rs`), released under Apache-2.0.

use std::hash::Hasher;

use byteorder::{ByteOrder, LE};

const C1: u64 = 0x87c37b91114253d5;
const C2: u64 = 0x4cf5ad432745937f;
const BLOCK_SIZE: usize = 16;

/// Hashes `bytes` into a pair of 64 bit values `(h1, h2)`.
///
/// ```rust
/// let (h1, h2) = mbloom::murmur3_x64_128(b"hello");
/// assert_eq!((h1, h2), (0xcbd8a7b341bd9b02, 0x5b1e906a48ae1d19));
/// ```
pub fn murmur3_x64_128(bytes: &[u8]) -> (u64, u64) {
    let (mut h1, mut h2) = (0u64, 0u64);
    let mut blocks = bytes.chunks_exact(BLOCK_SIZE);
    for block in &mut blocks {
        mix_block(&mut h1, &mut h2, LE::read_u64(&block[..8]), LE::read_u64(&block[8..]));
    }
    mix_tail(&mut h1, &mut h2, blocks.remainder());
    finalize(h1, h2, bytes.len() as u64)
}

/// Same as [`murmur3_x64_128`] but for text, hashing the UTF-8 bytes in place.
#[inline]
pub fn murmur3_x64_128_str(s: &str) -> (u64, u64) {
    murmur3_x64_128(s.as_bytes())
}

/// Streaming version of [`murmur3_x64_128`].
///
/// Input may arrive in arbitrary pieces, the result only depends on the
/// concatenation of everything written. [`Hasher::finish`] returns `h1`.
#[derive(Debug, Clone, Default)]
pub struct Murmur3Hasher {
    h1: u64,
    h2: u64,
    total: u64,
    buf: [u8; BLOCK_SIZE],
    buf_len: usize,
}

impl Murmur3Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns both 64 bit halves of the hash of everything written so far.
    pub fn finish128(&self) -> (u64, u64) {
        let (mut h1, mut h2) = (self.h1, self.h2);
        mix_tail(&mut h1, &mut h2, &self.buf[..self.buf_len]);
        finalize(h1, h2, self.total + self.buf_len as u64)
    }

    #[inline]
    fn update(&mut self, block: &[u8]) {
        mix_block(
            &mut self.h1,
            &mut self.h2,
            LE::read_u64(&block[..8]),
            LE::read_u64(&block[8..BLOCK_SIZE]),
        );
        self.total += BLOCK_SIZE as u64;
    }
}

impl Hasher for Murmur3Hasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.finish128().0
    }

    fn write(&mut self, mut bytes: &[u8]) {
        if self.buf_len + bytes.len() < BLOCK_SIZE {
            self.buf[self.buf_len..self.buf_len + bytes.len()].copy_from_slice(bytes);
            self.buf_len += bytes.len();
            return;
        }

        if self.buf_len != 0 {
            let wanted = BLOCK_SIZE - self.buf_len;
            self.buf[self.buf_len..].copy_from_slice(&bytes[..wanted]);
            let block = self.buf;
            self.update(&block);
            bytes = &bytes[wanted..];
            self.buf_len = 0;
        }

        let mut blocks = bytes.chunks_exact(BLOCK_SIZE);
        for block in &mut blocks {
            self.update(block);
        }
        let rest = blocks.remainder();
        self.buf[..rest.len()].copy_from_slice(rest);
        self.buf_len = rest.len();
    }
}

#[inline]
fn mix_k1(k1: u64) -> u64 {
    k1.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2)
}

#[inline]
fn mix_k2(k2: u64) -> u64 {
    k2.wrapping_mul(C2).rotate_left(33).wrapping_mul(C1)
}

#[inline]
fn mix_block(h1: &mut u64, h2: &mut u64, k1: u64, k2: u64) {
    *h1 ^= mix_k1(k1);
    *h1 = h1
        .rotate_left(27)
        .wrapping_add(*h2)
        .wrapping_mul(5)
        .wrapping_add(0x52dce729);

    *h2 ^= mix_k2(k2);
    *h2 = h2
        .rotate_left(31)
        .wrapping_add(*h1)
        .wrapping_mul(5)
        .wrapping_add(0x38495ab5);
}

/// Mixes the last 0..16 bytes, which only get the key scrambling step.
#[inline]
fn mix_tail(h1: &mut u64, h2: &mut u64, tail: &[u8]) {
    debug_assert!(tail.len() < BLOCK_SIZE);
    if tail.len() > 8 {
        *h2 ^= mix_k2(read_u64_le_padded(&tail[8..]));
    }
    if !tail.is_empty() {
        *h1 ^= mix_k1(read_u64_le_padded(&tail[..tail.len().min(8)]));
    }
}

#[inline]
fn finalize(mut h1: u64, mut h2: u64, len: u64) -> (u64, u64) {
    h1 ^= len;
    h2 ^= len;
    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);
    h1 = fmix64(h1);
    h2 = fmix64(h2);
    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);
    (h1, h2)
}

/// Finalization mix: force all bits of a hash block to avalanche.
#[inline]
fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51afd7ed558ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ceb9fe1a85ec53);
    k ^ (k >> 33)
}

#[inline]
fn read_u64_le_padded(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const KNOWN: [(u64, u64, &str); 5] = [
        (0x0000000000000000, 0x0000000000000000, ""),
        (0xcbd8a7b341bd9b02, 0x5b1e906a48ae1d19, "hello"),
        (0x342fac623a5ebc8e, 0x4cdcbc079642414d, "hello, world"),
        (
            0xb89e5988b737affc,
            0x664fc2950231b2cb,
            "19 Jan 2038 at 3:14:07 AM",
        ),
        (
            0xcd99481f9ee902c9,
            0x695da1a38987b6e7,
            "The quick brown fox jumps over the lazy dog.",
        ),
    ];

    fn streamed(chunks: &[&[u8]]) -> (u64, u64) {
        let mut hasher = Murmur3Hasher::new();
        for chunk in chunks {
            hasher.write(chunk);
        }
        hasher.finish128()
    }

    #[test]
    fn test_known_answers() {
        for (h1, h2, s) in KNOWN {
            assert_eq!(murmur3_x64_128(s.as_bytes()), (h1, h2), "{s:?}");
            assert_eq!(murmur3_x64_128_str(s), (h1, h2), "{s:?}");
            assert_eq!(streamed(&[s.as_bytes()]), (h1, h2), "{s:?}");
        }
    }

    #[test]
    fn test_remainders() {
        // remainder > 8
        let key = "The quick brown fox jumps over the lazy dog";
        assert_eq!(
            murmur3_x64_128_str(key),
            (0xe34bbc7bbc071b6c, 0x7a433ca9c49a9347)
        );
        // remainder < 8
        let key = "The quick brown fox jumps over the lazy dogdogdog";
        assert_eq!(
            murmur3_x64_128_str(key),
            (0x9c8205300e612fc4, 0xcbc0af6136aa3df9)
        );
        // remainder = 8
        let key = "The quick brown fox jumps over the lazy1";
        assert_eq!(
            murmur3_x64_128_str(key),
            (0xe3301a827e5cdfe3, 0xbdbf05f8da0f0392)
        );
        // remainder = 0
        let key = "The quick brown fox jumps over t";
        assert_eq!(
            murmur3_x64_128_str(key),
            (0xdf6af91bb29bdacf, 0x91a341c58df1f3a6)
        );
    }

    #[test]
    fn test_one_bit_change() {
        let a = murmur3_x64_128(b"The quick brown fox jumps over the lazy dog");
        let b = murmur3_x64_128(b"The quick brown fox jumps over the lazy eog");
        assert_ne!(a.0, b.0);
        assert_ne!(a.1, b.1);
        assert_eq!(b, (0x362108102c62d1c9, 0x3285cd100292b305));
    }

    #[test]
    fn test_streaming_byte_at_a_time() {
        let key = KNOWN[4].2.as_bytes();
        let mut hasher = Murmur3Hasher::new();
        for b in key {
            hasher.write(std::slice::from_ref(b));
        }
        assert_eq!(hasher.finish128(), (KNOWN[4].0, KNOWN[4].1));
        assert_eq!(hasher.finish(), KNOWN[4].0);
    }

    #[test]
    fn test_finish_is_repeatable() {
        let mut hasher = Murmur3Hasher::new();
        hasher.write(b"hello, ");
        assert_eq!(hasher.finish128(), hasher.finish128());
        hasher.write(b"world");
        assert_eq!(hasher.finish128(), (KNOWN[2].0, KNOWN[2].1));
    }

    proptest! {
        #[test]
        fn streaming_matches_one_shot(
            data in proptest::collection::vec(any::<u8>(), 0..200),
            cuts in proptest::collection::vec(any::<usize>(), 0..6),
        ) {
            let mut cuts = cuts.into_iter().map(|c| c % (data.len() + 1)).collect::<Vec<_>>();
            cuts.sort_unstable();
            let mut chunks = Vec::new();
            let mut start = 0;
            for c in cuts {
                chunks.push(&data[start..c]);
                start = c;
            }
            chunks.push(&data[start..]);
            prop_assert_eq!(streamed(&chunks), murmur3_x64_128(&data));
        }

        #[test]
        fn str_matches_bytes(s in ".*") {
            prop_assert_eq!(murmur3_x64_128_str(&s), murmur3_x64_128(s.as_bytes()));
        }
    }
}
