//! Background compaction.
//!
//! Runs on its own thread, cooperatively cancelled by a stop flag. Each tick
//! merges the two globally oldest segments into one, at the newer of their
//! two ids, and swaps the result into the index chain under the chain
//! mutex. Merge and write work happens with the mutex released — the
//! compactor reads only already-sealed, immutable files, so concurrent
//! `put`/`get` calls are unaffected until the brief swap at the end.
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use block::BlockBuilder;
use bloom::Filter;
use segment::{Segment, SparseIndex};

use crate::chain::{read_all_records, ChainEntry, ChainState};
use config::EngineConfig;

/// Handle to the running compactor thread.
pub struct CompactorHandle {
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl CompactorHandle {
    /// Spawns the compactor thread.
    pub fn spawn(dir: PathBuf, config: EngineConfig, chain: Arc<Mutex<ChainState>>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = Arc::clone(&stop);
        let join = std::thread::spawn(move || run(dir, config, chain, stop_for_thread));
        CompactorHandle {
            stop,
            join: Some(join),
        }
    }

    /// Signals the compactor to stop and waits for it to exit.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for CompactorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(dir: PathBuf, config: EngineConfig, chain: Arc<Mutex<ChainState>>, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::SeqCst) {
        std::thread::sleep(config.compaction_interval);
        if stop.load(Ordering::SeqCst) {
            break;
        }
        match tick(&dir, &config, &chain) {
            Ok(Some((a, b))) => log::debug!("compacted segments {} and {} into {}", a, b, b),
            Ok(None) => {}
            Err(e) => log::warn!("compaction tick failed, skipping: {}", e),
        }
    }
}

/// Runs one compaction tick. Returns `Ok(Some((a, b)))` if a merge happened,
/// `Ok(None)` if there were fewer than two segments to merge.
fn tick(
    dir: &Path,
    config: &EngineConfig,
    chain: &Arc<Mutex<ChainState>>,
) -> anyhow::Result<Option<(u64, u64)>> {
    let ids = {
        let guard = chain.lock().expect("chain mutex poisoned");
        guard.ids_ascending()
    };
    if ids.len() < 2 {
        return Ok(None);
    }
    let a = ids[0];
    let b = ids[1];

    // `a` and `b` are, by construction, the two smallest ids in the chain —
    // there is never an older segment beneath them that could still hold a
    // live value a tombstone here would need to shadow. Dropping tombstones
    // unconditionally is therefore always safe for this merge.
    let older = Segment::open(dir, a)?;
    let newer = Segment::open(dir, b)?;
    let merged = merge_records(&read_all_records(&older)?, &read_all_records(&newer)?);

    let compact_path = segment::compact_segment_path(dir, b);
    let staging = Segment::open_at(compact_path.clone(), b)?;
    let (index, filter) = write_merged(&staging, &merged, config)?;
    drop(staging);

    {
        let mut guard = chain.lock().expect("chain mutex poisoned");
        guard.remove(&[a, b]);
        std::fs::remove_file(segment::segment_path(dir, a))?;
        std::fs::remove_file(segment::segment_path(dir, b))?;
        std::fs::rename(&compact_path, segment::segment_path(dir, b))?;
        let reopened = Segment::open(dir, b)?;
        guard.insert(ChainEntry {
            id: b,
            segment: Arc::new(reopened),
            index,
            filter,
        });
    }

    Ok(Some((a, b)))
}

/// Two-way merge of two ascending, deduplicated (within each input) record
/// streams. On equal keys the record from `newer` wins. Tombstones (empty
/// values) are dropped from the output.
fn merge_records(
    older: &[(Vec<u8>, Vec<u8>)],
    newer: &[(Vec<u8>, Vec<u8>)],
) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut out = Vec::with_capacity(older.len() + newer.len());
    let mut i = 0;
    let mut j = 0;
    while i < older.len() && j < newer.len() {
        match older[i].0.cmp(&newer[j].0) {
            std::cmp::Ordering::Less => {
                out.push(older[i].clone());
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(newer[j].clone());
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push(newer[j].clone());
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&older[i..]);
    out.extend_from_slice(&newer[j..]);
    out.retain(|(_, v)| !v.is_empty());
    out
}

fn write_merged(
    segment: &Segment,
    records: &[(Vec<u8>, Vec<u8>)],
    config: &EngineConfig,
) -> anyhow::Result<(SparseIndex, Filter)> {
    let mut index = SparseIndex::new();
    let mut filter = Filter::with_params(config.bloom_filter_bits, config.bloom_filter_hashes);
    let mut builder = BlockBuilder::new();

    for (key, value) in records {
        builder.add(key, value)?;
        filter.add(key);
        if builder.uncompressed_size() > config.block_size {
            flush_block(segment, &mut index, &builder, config.block_compression)?;
            builder = BlockBuilder::new();
        }
    }
    if !builder.is_empty() {
        flush_block(segment, &mut index, &builder, config.block_compression)?;
    }
    Ok((index, filter))
}

fn flush_block(
    segment: &Segment,
    index: &mut SparseIndex,
    builder: &BlockBuilder,
    compress: bool,
) -> anyhow::Result<()> {
    let first_key = builder
        .first_key()
        .expect("flush_block called with no records")
        .to_vec();
    let framed = builder.dump(compress)?;
    let (start, end) = segment.append(&framed)?;
    index.push(first_key, (start, end));
    Ok(())
}
