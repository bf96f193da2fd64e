//! # WAL — Write-Ahead Log
//!
//! Durability for not-yet-flushed memtable mutations. Every `put`/`delete`
//! is appended to the WAL **before** the in-memory map is updated; on
//! restart the WAL is replayed in file order to reconstruct the memtable.
//!
//! The WAL reuses the same block framing as segment files: each record is
//! wrapped in a single-record, uncompressed [`block`]. There is no separate
//! WAL-specific wire format and no sequence numbers — ordering is simply
//! file order, which is also memtable-apply order.
//!
//! A zero-length value denotes a tombstone, exactly as in a segment block.
//!
//! ## Example
//!
//! ```rust,no_run
//! use wal::{WalWriter, WalReader};
//!
//! let mut w = WalWriter::create("wal.log").unwrap();
//! w.append(b"hello", b"world").unwrap();
//! drop(w);
//!
//! let mut r = WalReader::open("wal.log").unwrap();
//! r.replay(|key, value| println!("{:?} -> {:?}", key, value)).unwrap();
//! ```

use block::{BlockBuilder, BlockError};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use thiserror::Error;

/// Errors raised during WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A record's framing was malformed in a way too severe to treat as a
    /// truncated tail (rather than simply stopping replay).
    #[error("corrupt wal record: {0}")]
    Corrupt(String),
}

impl From<BlockError> for WalError {
    fn from(e: BlockError) -> Self {
        match e {
            BlockError::Io(io) => WalError::Io(io),
            other => WalError::Corrupt(other.to_string()),
        }
    }
}

/// Append-only WAL writer.
///
/// Every `append` is immediately flushed and fsynced: a `put` is durable the
/// moment `append` returns, which is what makes WAL replay a correct
/// recovery mechanism after a crash between the WAL write and the next
/// flush.
pub struct WalWriter {
    file: File,
}

impl WalWriter {
    /// Opens (creating if absent) a WAL file in read/write mode, positioned
    /// to append.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, WalError> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        Ok(WalWriter { file })
    }

    /// Appends one record. `value` empty means a tombstone (delete).
    pub fn append(&mut self, key: &[u8], value: &[u8]) -> Result<(), WalError> {
        let mut b = BlockBuilder::new();
        b.add(key, value)?;
        let framed = b.dump(false)?;
        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(&framed)?;
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Truncates the WAL to zero length. Called once the corresponding
    /// memtable has been durably flushed to a new segment.
    pub fn truncate(&mut self) -> Result<(), WalError> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        Ok(())
    }
}

/// Sequential WAL reader used for crash recovery.
pub struct WalReader {
    file: File,
}

impl WalReader {
    /// Opens an existing WAL file for replay.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, WalError> {
        let file = File::open(path)?;
        Ok(WalReader { file })
    }

    /// Replays every complete record in file order, calling `apply(key,
    /// value)` for each one.
    ///
    /// A trailing partial record — fewer bytes remain than a complete framed
    /// block, or the block's CRC fails to verify — is treated as a partial
    /// write from a crash mid-append: replay stops there without error,
    /// keeping every record read so far.
    pub fn replay<F>(&mut self, mut apply: F) -> Result<(), WalError>
    where
        F: FnMut(Vec<u8>, Vec<u8>),
    {
        let mut all = Vec::new();
        self.file.read_to_end(&mut all)?;

        let mut offset = 0usize;
        while offset < all.len() {
            if all.len() - offset < block::HEADER_SIZE {
                return Ok(());
            }
            let size =
                u64::from_le_bytes(all[offset + 5..offset + 13].try_into().unwrap()) as usize;
            let total = block::HEADER_SIZE + size;
            if all.len() - offset < total {
                return Ok(());
            }

            let framed = &all[offset..offset + total];
            let records = match block::decode(framed, true) {
                Ok(r) => r,
                Err(_) => return Ok(()), // corrupt tail record, stop cleanly
            };
            for (key, value) in records {
                apply(key, value);
            }
            offset += total;
        }
        Ok(())
    }
}
