//! # Config — engine tuning knobs
//!
//! A plain struct carrying every constant the storage engine's components
//! read at construction time, with the defaults named in the engine's
//! external interface. Overriding one field is a normal struct-update-syntax
//! call; nothing here reaches into the environment on its own (the `cli`
//! crate's binary does that, the same way the rest of the pack keeps
//! environment parsing at the edge rather than inside library crates).

use std::time::Duration;

/// Tuning knobs for an [`engine::Engine`](../engine/struct.Engine.html).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// In-memory flush threshold, in bytes. Once a `put`/`delete` would push
    /// the memtable's approximate size past this, the memtable is flushed
    /// to a new segment before the write is applied.
    pub rbtree_flush_size: usize,

    /// Soft cap on a block's uncompressed payload size, in bytes. A single
    /// oversize record may still produce a larger block.
    pub block_size: u64,

    /// Whether blocks are zlib-compressed (at the fastest level) before
    /// being written to disk.
    pub block_compression: bool,

    /// Number of bits in each segment's approximate-membership filter.
    pub bloom_filter_bits: u64,

    /// Number of hash positions computed per key in each segment's filter.
    pub bloom_filter_hashes: u32,

    /// Spacing between background compactor ticks.
    pub compaction_interval: Duration,
}

impl EngineConfig {
    /// `RBTREE_FLUSH_SIZE` default: 3 MiB.
    pub const DEFAULT_RBTREE_FLUSH_SIZE: usize = 1024 * 1024 * 3;
    /// `BLOCK_SIZE` default: 10 KiB.
    pub const DEFAULT_BLOCK_SIZE: u64 = 1024 * 10;
    /// `BLOOM_FILTER_SIZE` default: 9679 bits (matches [`bloom::NUM_BITS`]).
    pub const DEFAULT_BLOOM_FILTER_BITS: u64 = bloom::NUM_BITS;
    /// `BLOOM_FILTER_HASHES` default: 3 (matches [`bloom::NUM_HASHES`]).
    pub const DEFAULT_BLOOM_FILTER_HASHES: u32 = bloom::NUM_HASHES;
    /// `COMPACTION_INTERVAL` default: 1 second.
    pub const DEFAULT_COMPACTION_INTERVAL: Duration = Duration::from_secs(1);
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            rbtree_flush_size: Self::DEFAULT_RBTREE_FLUSH_SIZE,
            block_size: Self::DEFAULT_BLOCK_SIZE,
            block_compression: true,
            bloom_filter_bits: Self::DEFAULT_BLOOM_FILTER_BITS,
            bloom_filter_hashes: Self::DEFAULT_BLOOM_FILTER_HASHES,
            compaction_interval: Self::DEFAULT_COMPACTION_INTERVAL,
        }
    }
}
