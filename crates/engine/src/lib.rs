//! # Engine — storage engine orchestrator
//!
//! Ties together the [`memtable`], [`wal`], and [`segment`] crates into a
//! complete LSM-tree key-value store.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                   ENGINE                      │
//! │                                                │
//! │ write.rs → WAL append → Memtable insert        │
//! │              |                                 │
//! │              |  (approx_size over threshold?)  │
//! │              v                                 │
//! │           flush() → new segment, chain head    │
//! │                                                │
//! │ read.rs → Memtable → chain, newest to oldest    │
//! │            (first match wins)                  │
//! │                                                │
//! │ compactor.rs (background thread) → merges the  │
//! │   two oldest segments, swaps the chain tail     │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module responsibilities
//!
//! | Module        | Purpose                                                |
//! |---------------|---------------------------------------------------------|
//! | [`lib.rs`]    | `Engine` struct, `open`/`close`, `Drop`                 |
//! | [`recovery`]  | stray-file cleanup, chain rebuild, WAL replay           |
//! | [`write`]     | `put()`, `delete()`, `force_flush()`, internal `flush()`|
//! | [`read`]      | `get()`                                                 |
//! | [`compactor`] | background merge of the two oldest segments             |
//! | [`chain`]     | the index chain's shared state and entry type           |
//! | [`error`]     | the engine's error taxonomy                             |
//!
//! ## Crash safety
//!
//! Every write is appended to the WAL **before** the memtable is updated. The
//! WAL is truncated only after a flush has fully written and installed its
//! segment. Compaction output is staged under `_compact_segment.<id>` and
//! renamed into place only once fully written; recovery removes any stray
//! staging file left behind by a crash mid-compaction.
mod chain;
mod compactor;
mod error;
mod read;
mod recovery;
mod write;

pub use error::EngineError;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use config::EngineConfig;
use memtable::Memtable;
use wal::WalWriter;

use chain::ChainState;
use compactor::CompactorHandle;

/// The central storage engine.
///
/// # Write path
///
/// 1. Validate key/value size.
/// 2. If the memtable's approximate size would exceed
///    [`EngineConfig::rbtree_flush_size`], flush it to a new segment first.
/// 3. Append the record to the WAL.
/// 4. Apply the mutation to the memtable.
///
/// # Read path
///
/// 1. Check the memtable (freshest data, tombstones included).
/// 2. Check segments in the index chain, newest to oldest.
/// 3. First match wins; a tombstone shadows any older value.
///
/// # Recovery
///
/// On [`Engine::open`]: stray compaction staging files are removed, the index
/// chain is rebuilt by scanning existing segment files, and the WAL is
/// replayed into a fresh memtable.
pub struct Engine {
    pub(crate) dir: PathBuf,
    pub(crate) config: EngineConfig,
    pub(crate) mem: Memtable,
    pub(crate) wal: WalWriter,
    pub(crate) next_segment_id: u64,
    pub(crate) chain: Arc<Mutex<ChainState>>,
    compactor: Option<CompactorHandle>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let segment_count = self
            .chain
            .lock()
            .map(|g| g.entries.len())
            .unwrap_or_default();
        f.debug_struct("Engine")
            .field("dir", &self.dir)
            .field("memtable_size", &self.mem.approx_size())
            .field("memtable_entries", &self.mem.len())
            .field("segment_count", &segment_count)
            .field("next_segment_id", &self.next_segment_id)
            .finish()
    }
}

impl Engine {
    /// Opens (or creates) a storage engine rooted at `dir`, performing full
    /// crash recovery and starting the background compactor.
    pub fn open(dir: impl Into<PathBuf>, config: EngineConfig) -> Result<Self, EngineError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        recovery::cleanup_stray_compact_segments(&dir)?;
        let chain_state = recovery::rebuild_chain(&dir, &config)?;
        let next_segment_id = chain_state.ids_ascending().last().map_or(0, |id| id + 1);

        let wal_path = dir.join("wal.log");
        let mem = recovery::replay_wal(&wal_path)?;
        let wal = WalWriter::create(&wal_path)?;

        let chain = Arc::new(Mutex::new(chain_state));
        let compactor = CompactorHandle::spawn(dir.clone(), config, Arc::clone(&chain));

        log::debug!("engine opened at {:?}, next segment id {}", dir, next_segment_id);

        Ok(Engine {
            dir,
            config,
            mem,
            wal,
            next_segment_id,
            chain,
            compactor: Some(compactor),
        })
    }

    /// Stops the background compactor and flushes any remaining memtable
    /// contents to disk. After `close`, the engine may still be used —
    /// further writes simply run without a compactor until the process
    /// restarts or a new `Engine` is opened.
    pub fn close(&mut self) -> Result<(), EngineError> {
        if let Some(mut c) = self.compactor.take() {
            c.stop();
        }
        self.force_flush()
    }

    /// The engine's root directory.
    #[must_use]
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    /// The engine's active configuration.
    #[must_use]
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Number of segments currently in the index chain.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.chain.lock().expect("chain mutex poisoned").entries.len()
    }
}

/// Best-effort flush on drop: the compactor thread is stopped and any data
/// left in the memtable is flushed to a segment. Errors are silently
/// swallowed since `Drop` cannot propagate them — the data is still safe in
/// the WAL and will be recovered on the next [`Engine::open`].
impl Drop for Engine {
    fn drop(&mut self) {
        if let Some(mut c) = self.compactor.take() {
            c.stop();
        }
        if !self.mem.is_empty() {
            let _ = self.flush();
        }
    }
}

#[cfg(test)]
mod tests;
