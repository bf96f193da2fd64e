/// A per-segment directory mapping each block's first key to its on-disk
/// byte range `(start, end)`.
///
/// Entries are kept sorted ascending by first key. [`SparseIndex::find`]
/// binary-searches for the block that could contain a given key: the one
/// whose first key is the greatest that is `<=` the lookup key.
///
/// The low boundary is guarded rather than falling back to `entries[0]`: a
/// key smaller than every first key cannot be in this segment, and returning
/// `None` lets the caller treat it the same as "no block found" instead of
/// handing back a range that starts past the key.
#[derive(Debug, Default, Clone)]
pub struct SparseIndex {
    entries: Vec<(Vec<u8>, (u64, u64))>,
}

impl SparseIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        SparseIndex::default()
    }

    /// Appends an entry. Entries may be added out of order; call [`sort`]
    /// once construction is complete.
    ///
    /// [`sort`]: SparseIndex::sort
    pub fn push(&mut self, first_key: Vec<u8>, range: (u64, u64)) {
        self.entries.push((first_key, range));
    }

    /// Sorts entries by first key. Idempotent; a no-op if already sorted.
    /// Construction from a memtable flush or a compaction merge already
    /// produces entries in order, so this is a defensive pass rather than
    /// load-bearing.
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
    }

    /// Returns the byte range of the block that could contain `key`, or
    /// `None` if `key` is smaller than every block's first key.
    pub fn find(&self, key: &[u8]) -> Option<(u64, u64)> {
        match self.entries.binary_search_by(|(k, _)| k.as_slice().cmp(key)) {
            Ok(i) => Some(self.entries[i].1),
            Err(0) => None,
            Err(i) => Some(self.entries[i - 1].1),
        }
    }

    /// Returns the number of blocks indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the index has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
