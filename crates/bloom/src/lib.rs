//! # Bloom Filter
//!
//! A space-efficient probabilistic data structure for set membership testing.
//!
//! A bloom filter can tell you with certainty that a key is **not** in the set
//! (no false negatives), but may occasionally report that a key **is** in the
//! set when it isn't (false positives).
//!
//! ## Usage in this engine
//!
//! Each segment owns a bloom filter built from the keys it holds. During
//! point lookups the engine checks the filter first — if it says "not
//! present", the segment is skipped entirely, avoiding a sparse-index lookup
//! and a block read. The filter itself is never persisted to disk: it is
//! cheap enough to rebuild from a segment's blocks during recovery, so the
//! on-disk format carries no filter section.
//!
//! ## Hashing
//!
//! Rather than a general-purpose hash family, positions are derived directly
//! from `CRC32`, which the rest of the storage stack already links in for
//! block checksums: position `j` for key `k` is `CRC32(k || j) mod M`, where
//! `M` is the filter's configured bit width. This is `K` independent
//! single-byte-salted CRCs rather than double hashing, and keeps the filter
//! free of any extra dependency.
//!
//! ## Example
//!
//! ```rust
//! use bloom::Filter;
//!
//! let mut f = Filter::new();
//! f.add(b"hello");
//! assert!(f.contains(b"hello"));
//! ```

/// Default number of bits in the filter's bit array.
///
/// 9679 is prime, which spreads the `mod M` hash positions evenly regardless
/// of input distribution.
pub const NUM_BITS: u64 = 9679;

/// Default number of independent hash positions computed per key.
pub const NUM_HASHES: u32 = 3;

/// An approximate-membership filter, sized by bit width and hash count.
///
/// `add` and `contains` short-circuit once every bit has actually been set by
/// a hash position ("saturated"): at that point every key would test
/// positive anyway, so there is no need to keep hashing. Saturation is
/// tracked against the live bit count rather than the backing byte array,
/// since the last byte may carry unused padding bits above `num_bits` that
/// `position` never addresses and so can never be set.
pub struct Filter {
    bits: Vec<u8>,
    num_bits: u64,
    num_hashes: u32,
    bits_set: u64,
    saturated: bool,
}

impl Filter {
    /// Creates an empty filter with the default bit width and hash count.
    pub fn new() -> Self {
        Self::with_params(NUM_BITS, NUM_HASHES)
    }

    /// Creates an empty filter with `num_bits` bits and `num_hashes` hash
    /// positions per key.
    pub fn with_params(num_bits: u64, num_hashes: u32) -> Self {
        let byte_len = ((num_bits + 7) / 8) as usize;
        Filter {
            bits: vec![0u8; byte_len],
            num_bits,
            num_hashes,
            bits_set: 0,
            saturated: false,
        }
    }

    /// Records `key` as present.
    pub fn add(&mut self, key: &[u8]) {
        if self.saturated {
            return;
        }
        for j in 0..self.num_hashes {
            let idx = position(key, j, self.num_bits);
            self.set_bit(idx);
        }
        if self.bits_set >= self.num_bits {
            self.saturated = true;
        }
    }

    /// Returns `true` if `key` **might** be present, `false` if it is
    /// **definitely absent**.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        if self.saturated {
            return true;
        }
        for j in 0..self.num_hashes {
            let idx = position(key, j, self.num_bits);
            if !self.get_bit(idx) {
                return false;
            }
        }
        true
    }

    /// Returns `true` once every one of the filter's `num_bits` real
    /// positions has been set.
    #[must_use]
    pub fn is_saturated(&self) -> bool {
        self.saturated
    }

    fn set_bit(&mut self, idx: u64) {
        let byte_idx = (idx / 8) as usize;
        let bit_offset = (idx % 8) as u8;
        let mask = 1 << bit_offset;
        if self.bits[byte_idx] & mask == 0 {
            self.bits[byte_idx] |= mask;
            self.bits_set += 1;
        }
    }

    fn get_bit(&self, idx: u64) -> bool {
        let byte_idx = (idx / 8) as usize;
        let bit_offset = (idx % 8) as u8;
        (self.bits[byte_idx] >> bit_offset) & 1 == 1
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter")
            .field("num_bits", &self.num_bits)
            .field("num_hashes", &self.num_hashes)
            .field("saturated", &self.saturated)
            .finish()
    }
}

/// Computes `CRC32(key || hash_index) mod num_bits`.
fn position(key: &[u8], hash_index: u32, num_bits: u64) -> u64 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(key);
    hasher.update(&[hash_index as u8]);
    (hasher.finalize() as u64) % num_bits
}
