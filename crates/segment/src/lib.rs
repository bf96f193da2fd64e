//! # Segment — immutable on-disk block sequences
//!
//! A segment is an append-only file holding a sequence of [`block`]s in
//! ascending key order. Segments are written once (by a memtable flush or by
//! the compactor) and are immutable from the moment they are closed until
//! the compactor deletes them.
//!
//! This crate also owns the **sparse index**: a per-segment, in-memory
//! directory mapping each block's first key to its on-disk byte range, used
//! to avoid scanning an entire segment on every lookup.
//!
//! Segment files are named `segment.<id>`; a compaction pass stages its
//! output under `_compact_segment.<id>` and only renames it into place once
//! the merge has been fully written.

mod file;
mod index;

pub use file::{
    compact_segment_path, list_segment_ids, list_stray_compact_segments, segment_path,
    BlockEntry, Segment, SegmentError, COMPACT_PREFIX, SEGMENT_PREFIX,
};
pub use index::SparseIndex;

#[cfg(test)]
mod tests;
