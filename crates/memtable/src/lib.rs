//! # Memtable
//!
//! An in-memory, sorted write buffer for the storage engine, backed by
//! [`llrb::Tree`]. It buffers recent `put`/`delete` operations in ascending
//! key order until the engine decides to flush them to a new segment.
//!
//! ## Key properties
//!
//! - **Sorted order**: entries are always in ascending key order (required
//!   for flush, which streams them straight into blocks).
//! - **Tombstones as empty values**: a delete is recorded as a zero-length
//!   value, the same convention used by the on-disk block format, so the
//!   flush path doesn't need a separate tagged variant.
//! - **Approximate size tracking**: a monotonic counter incremented by
//!   `key.len() + value.len()` on every `put`, not a current-footprint
//!   gauge — repeated writes to the same key keep adding to it even though
//!   the tree itself doesn't grow. This over-counts on overwrite-heavy
//!   workloads, which only makes the engine flush sooner than a precise
//!   footprint would require.
//!
//! ## Example
//! ```rust
//! use memtable::Memtable;
//!
//! let mut m = Memtable::new();
//! m.put(b"hello".to_vec(), b"world".to_vec());
//! assert_eq!(m.get(b"hello"), Some(b"world".as_slice()));
//!
//! m.delete(b"hello".to_vec());
//! assert_eq!(m.get(b"hello"), None);
//! ```

use llrb::Tree;

/// An ordered, in-memory write buffer.
pub struct Memtable {
    tree: Tree<Vec<u8>>,
    approx_size: usize,
}

impl Memtable {
    /// Creates a new, empty memtable.
    pub fn new() -> Self {
        Memtable {
            tree: Tree::new(),
            approx_size: 0,
        }
    }

    /// Inserts or replaces `key`'s value.
    ///
    /// `approx_size` is incremented by this write's `key.len() + value.len()`
    /// regardless of whether `key` already had an entry — it tracks
    /// cumulative bytes written, not the tree's current footprint.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.approx_size = self.approx_size.saturating_add(key.len() + value.len());
        self.tree.put(key, value);
    }

    /// Records a tombstone for `key` (an empty-value entry).
    pub fn delete(&mut self, key: Vec<u8>) {
        self.put(key, Vec::new());
    }

    /// Returns the live value for `key`, or `None` if the key is absent or
    /// has been deleted (its entry is a tombstone).
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        match self.tree.get(key) {
            Some(v) if !v.is_empty() => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Returns the raw entry for `key`, if present, distinguishing "absent"
    /// (`None`) from "present but a tombstone" (`Some(&[])`).
    pub fn get_raw(&self, key: &[u8]) -> Option<&[u8]> {
        self.tree.get(key).map(|v| v.as_slice())
    }

    /// Returns `true` if `key` has any entry at all, live or tombstone.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.tree.contains_key(key)
    }

    /// Returns all entries in ascending key order, tombstones included.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.tree.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Returns the number of distinct keys (including tombstones).
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns `true` if the memtable holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the approximate byte size of all keys and values stored. Used
    /// by the engine to decide when to flush.
    #[must_use]
    pub fn approx_size(&self) -> usize {
        self.approx_size
    }

    /// Removes every entry and resets the size counter to zero.
    pub fn clear(&mut self) {
        self.tree.clear();
        self.approx_size = 0;
    }
}

impl Default for Memtable {
    fn default() -> Self {
        Self::new()
    }
}
