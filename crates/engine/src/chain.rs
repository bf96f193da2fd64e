use std::sync::Arc;

use bloom::Filter;
use config::EngineConfig;
use segment::{BlockEntry, Segment, SparseIndex};

use crate::EngineError;

/// One link in the index chain: an immutable segment together with the
/// sparse index and filter built from its blocks.
///
/// Neither the index nor the filter is persisted — both are rebuilt from the
/// segment's blocks, either at flush time (as the blocks are written) or at
/// recovery time (by scanning the file).
pub struct ChainEntry {
    pub id: u64,
    pub segment: Arc<Segment>,
    pub index: SparseIndex,
    pub filter: Filter,
}

/// The mutable state the chain mutex guards: the ordered list of live
/// segments, newest first.
#[derive(Default)]
pub struct ChainState {
    pub entries: Vec<ChainEntry>,
}

impl ChainState {
    pub fn new() -> Self {
        ChainState::default()
    }

    /// Inserts `entry` and re-sorts so entries stay ordered newest (highest
    /// id) first. The chain is always small enough that a full sort per
    /// mutation is simpler than maintaining an insertion point by hand.
    pub fn insert(&mut self, entry: ChainEntry) {
        self.entries.push(entry);
        self.entries.sort_by(|a, b| b.id.cmp(&a.id));
    }

    /// Removes the entries with the given ids.
    pub fn remove(&mut self, ids: &[u64]) {
        self.entries.retain(|e| !ids.contains(&e.id));
    }

    /// Segment ids currently in the chain, ascending.
    pub fn ids_ascending(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.entries.iter().map(|e| e.id).collect();
        ids.sort_unstable();
        ids
    }
}

/// Decodes every block in `blocks` (strict CRC checking) and builds the
/// sparse index + filter for the segment they came from.
pub fn index_and_filter_from_blocks(
    blocks: &[BlockEntry],
    config: &EngineConfig,
) -> Result<(SparseIndex, Filter), EngineError> {
    let mut index = SparseIndex::new();
    let mut filter = Filter::with_params(config.bloom_filter_bits, config.bloom_filter_hashes);

    for entry in blocks {
        let records = block::decode(&entry.bytes, true)?;
        if let Some((first_key, _)) = records.first() {
            let range = (entry.offset, entry.offset + entry.bytes.len() as u64);
            index.push(first_key.clone(), range);
        }
        for (key, _) in &records {
            filter.add(key);
        }
    }
    index.sort();
    Ok((index, filter))
}

/// Reads and decodes every record stored in `segment`, in file order
/// (ascending key order, by the segment's own invariant).
pub fn read_all_records(segment: &Segment) -> Result<Vec<(Vec<u8>, Vec<u8>)>, EngineError> {
    let (blocks, trailing) = segment.iterate_blocks()?;
    if trailing > 0 {
        return Err(EngineError::Corruption(format!(
            "segment {:?} has {} trailing bytes that do not form a complete block",
            segment.path(),
            trailing
        )));
    }
    let mut records = Vec::new();
    for entry in &blocks {
        records.extend(block::decode(&entry.bytes, true)?);
    }
    Ok(records)
}
