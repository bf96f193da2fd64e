//! Cold-start recovery: clean up interrupted compactions, rebuild the index
//! chain by scanning existing segment files, and replay the WAL.
use std::path::Path;

use config::EngineConfig;
use memtable::Memtable;
use segment::Segment;

use crate::chain::{index_and_filter_from_blocks, ChainEntry, ChainState};
use crate::EngineError;

/// Removes any leftover `_compact_segment.*` files from a compaction tick
/// that crashed between writing its output and swapping it into place.
pub fn cleanup_stray_compact_segments(dir: &Path) -> Result<(), EngineError> {
    for path in segment::list_stray_compact_segments(dir)? {
        log::warn!("removing stray compaction output {:?}", path);
        std::fs::remove_file(path)?;
    }
    Ok(())
}

/// Scans `segment.*` files under `dir` and rebuilds the index chain.
///
/// The newest segment (the one with the highest id) is treated as the tail:
/// corruption there is a partial write from a crash mid-flush, so the
/// segment is dropped and the caller relies on WAL replay to recover its
/// contents instead. Corruption in any other segment is unrecoverable.
pub fn rebuild_chain(dir: &Path, config: &EngineConfig) -> Result<ChainState, EngineError> {
    let ids = segment::list_segment_ids(dir)?;
    let mut chain = ChainState::new();

    for (i, id) in ids.iter().enumerate() {
        let is_tail = i == ids.len() - 1;
        let seg = Segment::open(dir, *id)?;
        let (blocks, trailing) = seg.iterate_blocks()?;

        if trailing > 0 {
            if is_tail {
                log::warn!(
                    "segment {} has a truncated tail block, dropping it and relying on WAL replay",
                    id
                );
                drop(seg);
                std::fs::remove_file(segment::segment_path(dir, *id))?;
                continue;
            }
            return Err(EngineError::Unrecoverable(format!(
                "segment {} has a truncated tail block but is not the newest segment",
                id
            )));
        }

        match index_and_filter_from_blocks(&blocks, config) {
            Ok((index, filter)) => {
                chain.insert(ChainEntry {
                    id: *id,
                    segment: std::sync::Arc::new(seg),
                    index,
                    filter,
                });
            }
            Err(e) if is_tail => {
                log::warn!(
                    "segment {} failed to decode ({}), dropping it and relying on WAL replay",
                    id,
                    e
                );
                drop(seg);
                std::fs::remove_file(segment::segment_path(dir, *id))?;
            }
            Err(e) => {
                return Err(EngineError::Unrecoverable(format!(
                    "segment {} is corrupt and is not the newest segment: {}",
                    id, e
                )));
            }
        }
    }

    Ok(chain)
}

/// Replays `wal_path` into a fresh memtable. Returns an empty memtable if
/// the WAL does not exist yet (fresh database).
pub fn replay_wal(wal_path: &Path) -> Result<Memtable, EngineError> {
    let mut mem = Memtable::new();
    match wal::WalReader::open(wal_path) {
        Ok(mut reader) => {
            reader.replay(|key, value| mem.put(key, value))?;
            Ok(mem)
        }
        Err(wal::WalError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(mem),
        Err(e) => Err(e.into()),
    }
}
