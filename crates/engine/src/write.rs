//! Write path: `put`, `delete`, and the internal `flush`.
//!
//! Every mutation is appended to the WAL before it is applied to the
//! memtable, so a crash between the two leaves the write recoverable by
//! replay. When the memtable's approximate size would exceed the
//! configured flush threshold, it is flushed to a new segment first.
use block::BlockBuilder;
use bloom::Filter;
use segment::{Segment, SparseIndex};
use std::sync::Arc;

use crate::chain::ChainEntry;
use crate::{Engine, EngineError};

impl Engine {
    /// Inserts or replaces the value at `key`.
    ///
    /// A zero-length `value` is indistinguishable from [`Engine::delete`] —
    /// the on-disk tombstone convention is simply "value is empty".
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), EngineError> {
        if key.len() > block::MAX_KEY_LEN {
            return Err(EngineError::InvalidArgument(format!(
                "key length {} exceeds {}",
                key.len(),
                block::MAX_KEY_LEN
            )));
        }
        if value.len() > block::MAX_VAL_LEN {
            return Err(EngineError::InvalidArgument(format!(
                "value length {} exceeds {}",
                value.len(),
                block::MAX_VAL_LEN
            )));
        }

        let delta = key.len() + value.len();
        if self.mem.approx_size() + delta > self.config.rbtree_flush_size {
            self.flush()?;
        }

        self.wal.append(key, value)?;
        self.mem.put(key.to_vec(), value.to_vec());
        Ok(())
    }

    /// Deletes `key` by writing a tombstone. Equivalent to
    /// `put(key, &[])`.
    pub fn delete(&mut self, key: &[u8]) -> Result<(), EngineError> {
        self.put(key, &[])
    }

    /// Forces a flush of the current memtable to a new segment, even if it
    /// is below the configured threshold. A no-op if the memtable is empty.
    pub fn force_flush(&mut self) -> Result<(), EngineError> {
        if self.mem.is_empty() {
            return Ok(());
        }
        self.flush()
    }

    /// Flushes the memtable to a new segment, installs it at the head of
    /// the index chain, truncates the WAL, and resets the memtable.
    ///
    /// Holds the chain mutex for the whole operation: block writes, index
    /// install, and WAL truncation all happen while it is held, so a
    /// concurrent `get` either observes the flush completely or not at all.
    pub(crate) fn flush(&mut self) -> Result<(), EngineError> {
        let mut guard = self.chain.lock().expect("chain mutex poisoned");

        let id = self.next_segment_id;
        self.next_segment_id += 1;

        let seg = Segment::open(&self.dir, id)?;
        let mut index = SparseIndex::new();
        let mut filter =
            Filter::with_params(self.config.bloom_filter_bits, self.config.bloom_filter_hashes);

        let mut builder = BlockBuilder::new();
        for (key, value) in self.mem.iter() {
            builder.add(key, value)?;
            filter.add(key);
            if builder.uncompressed_size() > self.config.block_size {
                write_block(&seg, &mut index, &builder, self.config.block_compression)?;
                builder = BlockBuilder::new();
            }
        }
        if !builder.is_empty() {
            write_block(&seg, &mut index, &builder, self.config.block_compression)?;
        }

        guard.insert(ChainEntry {
            id,
            segment: Arc::new(seg),
            index,
            filter,
        });

        self.wal.truncate()?;
        self.mem.clear();

        log::debug!("flushed memtable to segment {}", id);
        Ok(())
    }
}

/// Dumps `builder`'s buffered records as a framed block, appends it to
/// `segment`, and records its byte range in `index` under its first key.
fn write_block(
    segment: &Segment,
    index: &mut SparseIndex,
    builder: &BlockBuilder,
    compress: bool,
) -> Result<(), EngineError> {
    let first_key = builder
        .first_key()
        .expect("write_block called with no records")
        .to_vec();
    let framed = builder.dump(compress)?;
    let (start, end) = segment.append(&framed)?;
    index.push(first_key, (start, end));
    Ok(())
}
