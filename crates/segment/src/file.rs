use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

/// Filename prefix for immutable segment files: `segment.<id>`.
pub const SEGMENT_PREFIX: &str = "segment.";
/// Filename prefix for a compaction pass's staging output: `_compact_segment.<id>`.
///
/// Staged under a different prefix so a crash mid-compaction leaves no file
/// that could be mistaken for a real segment on the next startup; recovery
/// removes any file with this prefix before rebuilding the index chain.
pub const COMPACT_PREFIX: &str = "_compact_segment.";

/// Errors raised by segment file I/O.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// An underlying filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Returns the path for `segment.<id>` under `dir`.
pub fn segment_path(dir: &Path, id: u64) -> PathBuf {
    dir.join(format!("{SEGMENT_PREFIX}{id}"))
}

/// Returns the path for `_compact_segment.<id>` under `dir`.
pub fn compact_segment_path(dir: &Path, id: u64) -> PathBuf {
    dir.join(format!("{COMPACT_PREFIX}{id}"))
}

/// Lists the ids of all `segment.*` files under `dir`, ascending.
pub fn list_segment_ids(dir: &Path) -> io::Result<Vec<u64>> {
    let mut ids = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            if let Some(suffix) = name.strip_prefix(SEGMENT_PREFIX) {
                if let Ok(id) = suffix.parse::<u64>() {
                    ids.push(id);
                }
            }
        }
    }
    ids.sort_unstable();
    Ok(ids)
}

/// Lists the paths of all stray `_compact_segment.*` files under `dir`.
///
/// These are leftovers from a compaction tick that crashed between writing
/// its merged output and swapping it into place; startup recovery deletes
/// them unconditionally.
pub fn list_stray_compact_segments(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            if name.starts_with(COMPACT_PREFIX) {
                paths.push(entry.path());
            }
        }
    }
    Ok(paths)
}

/// One block read back from a segment by [`Segment::iterate_blocks`].
pub struct BlockEntry {
    /// Byte offset of this block's header within the segment file.
    pub offset: u64,
    /// The fully framed block (header + payload), ready for [`block::decode`].
    pub bytes: Vec<u8>,
}

/// An open, append-only segment file.
///
/// Reads and writes go through an internal mutex so `Segment` can be shared
/// behind a `&self` reference (the same pattern the rest of the pack's LSM
/// readers use for concurrent point lookups), even though this engine's
/// concurrency model only ever has one foreground thread touching a given
/// segment's bytes at a time.
pub struct Segment {
    id: u64,
    path: PathBuf,
    file: Mutex<File>,
}

impl Segment {
    /// Opens `segment.<id>` under `dir`, creating it if absent.
    pub fn open(dir: &Path, id: u64) -> Result<Self, SegmentError> {
        let path = segment_path(dir, id);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;
        Ok(Segment {
            id,
            path,
            file: Mutex::new(file),
        })
    }

    /// Opens an arbitrary path as a segment with the given id (used by the
    /// compactor to open its `_compact_segment.<id>` staging file).
    pub fn open_at(path: PathBuf, id: u64) -> Result<Self, SegmentError> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;
        Ok(Segment {
            id,
            path,
            file: Mutex::new(file),
        })
    }

    /// The segment's id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The segment's file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `bytes` to the end of the file, flushing and fsyncing before
    /// returning, and reports the byte range the write landed at.
    pub fn append(&self, bytes: &[u8]) -> Result<(u64, u64), SegmentError> {
        let mut file = self.file.lock().expect("segment file mutex poisoned");
        let start = file.seek(SeekFrom::End(0))?;
        file.write_all(bytes)?;
        file.flush()?;
        file.sync_all()?;
        Ok((start, start + bytes.len() as u64))
    }

    /// Reads `end - start` bytes starting at `start`. `end = -1` means read
    /// to the current end of file.
    pub fn read_range(&self, start: u64, end: i64) -> Result<Vec<u8>, SegmentError> {
        let mut file = self.file.lock().expect("segment file mutex poisoned");
        file.seek(SeekFrom::Start(start))?;
        let mut buf = Vec::new();
        if end < 0 {
            file.read_to_end(&mut buf)?;
        } else {
            let len = (end as u64).saturating_sub(start) as usize;
            buf.resize(len, 0);
            file.read_exact(&mut buf)?;
        }
        Ok(buf)
    }

    /// Returns the current size of the file in bytes.
    pub fn tell_eof(&self) -> Result<u64, SegmentError> {
        let mut file = self.file.lock().expect("segment file mutex poisoned");
        Ok(file.seek(SeekFrom::End(0))?)
    }

    /// Walks the file from offset 0, yielding each complete framed block.
    ///
    /// If the file ends with bytes that do not form a complete block (fewer
    /// than [`block::HEADER_SIZE`] bytes remain, or the header declares a
    /// payload longer than what's left in the file), those trailing bytes
    /// are reported via the returned `trailing_bytes` count instead of being
    /// included as a block. The caller (engine recovery) uses this to tell a
    /// genuinely truncated tail write from full corruption.
    pub fn iterate_blocks(&self) -> Result<(Vec<BlockEntry>, usize), SegmentError> {
        let mut file = self.file.lock().expect("segment file mutex poisoned");
        file.seek(SeekFrom::Start(0))?;
        let mut all = Vec::new();
        file.read_to_end(&mut all)?;
        drop(file);

        let mut blocks = Vec::new();
        let mut offset = 0usize;
        while offset < all.len() {
            if all.len() - offset < block::HEADER_SIZE {
                return Ok((blocks, all.len() - offset));
            }
            let size =
                u64::from_le_bytes(all[offset + 5..offset + 13].try_into().unwrap()) as usize;
            let total = block::HEADER_SIZE + size;
            if all.len() - offset < total {
                return Ok((blocks, all.len() - offset));
            }
            blocks.push(BlockEntry {
                offset: offset as u64,
                bytes: all[offset..offset + total].to_vec(),
            });
            offset += total;
        }
        Ok((blocks, 0))
    }
}
