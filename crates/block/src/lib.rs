//! # Block — the on-disk record batch
//!
//! A block is the unit of I/O within a segment: a contiguous, optionally
//! compressed batch of key-value records, framed with a fixed header so the
//! reader can validate and size it before touching the payload.
//!
//! ## Binary layout
//!
//! ```text
//! offset 0:  u8  flags   (bit 7 = compressed, other bits reserved 0)
//! offset 1:  u32 crc32   (checksum of the payload as stored, i.e. post-compression)
//! offset 5:  u64 size    (payload size in bytes, little-endian)
//! offset 13: payload     (`size` bytes; optionally zlib-compressed)
//! ```
//!
//! Decoded payload is a sequence of records:
//!
//! ```text
//! repeated:
//!   u16 key_len
//!   key_len bytes key
//!   u32 val_len
//!   val_len bytes value
//! ```
//!
//! A zero-length value marks a tombstone.
//!
//! CRC is computed over the payload **as stored** — after compression, if
//! compression is enabled — and is verified before decompression is
//! attempted, so a corrupt block is rejected without ever running the
//! decompressor on untrusted input.
//!
//! ## Example
//!
//! ```rust
//! use block::BlockBuilder;
//!
//! let mut b = BlockBuilder::new();
//! b.add(b"a", b"1").unwrap();
//! b.add(b"b", b"2").unwrap();
//! let framed = b.dump(true).unwrap();
//! let records = block::decode(&framed, true).unwrap();
//! assert_eq!(records, vec![(b"a".to_vec(), b"1".to_vec()), (b"b".to_vec(), b"2".to_vec())]);
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{self, Read, Write};
use thiserror::Error;

/// Fixed header size in bytes: `flags(1) + crc32(4) + size(8)`.
pub const HEADER_SIZE: usize = 13;

const COMPRESSED_FLAG: u8 = 0b1000_0000;

/// Maximum key length: keys are length-prefixed with a `u16`.
pub const MAX_KEY_LEN: usize = u16::MAX as usize;
/// Maximum value length: values are length-prefixed with a `u32`.
pub const MAX_VAL_LEN: usize = u32::MAX as usize;

/// Errors raised while building or decoding a block.
#[derive(Debug, Error)]
pub enum BlockError {
    /// An underlying I/O error (only possible on in-memory buffers via
    /// `flate2`, which still reports through `io::Error`).
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The block's CRC did not match its stored payload, or the payload was
    /// structurally malformed (truncated record, length running past the
    /// payload end).
    #[error("corrupt block: {0}")]
    Corrupt(String),

    /// A key or value exceeded its length-prefix's addressable range, or the
    /// block's cumulative payload size would overflow.
    #[error("size overflow: {0}")]
    SizeOverflow(String),
}

/// Accumulates records for a single block before framing.
///
/// Records must be added in ascending key order; the builder does not sort
/// or deduplicate — that discipline belongs to the caller (the memtable
/// flush path and the compactor merge both produce already-sorted input).
#[derive(Default)]
pub struct BlockBuilder {
    records: Vec<(Vec<u8>, Vec<u8>)>,
    uncompressed_size: u64,
    first_key: Option<Vec<u8>>,
}

impl BlockBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        BlockBuilder::default()
    }

    /// Appends a record. Fails with [`BlockError::SizeOverflow`] if `key` or
    /// `value` exceeds its length-prefix range, or if the block's cumulative
    /// uncompressed payload size would overflow a `u64`.
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<(), BlockError> {
        if key.len() > MAX_KEY_LEN {
            return Err(BlockError::SizeOverflow(format!(
                "key length {} exceeds {}",
                key.len(),
                MAX_KEY_LEN
            )));
        }
        if value.len() > MAX_VAL_LEN {
            return Err(BlockError::SizeOverflow(format!(
                "value length {} exceeds {}",
                value.len(),
                MAX_VAL_LEN
            )));
        }
        let record_size = 2 + key.len() as u64 + 4 + value.len() as u64;
        self.uncompressed_size = self
            .uncompressed_size
            .checked_add(record_size)
            .ok_or_else(|| BlockError::SizeOverflow("block payload exceeds u64::MAX".into()))?;

        if self.first_key.is_none() {
            self.first_key = Some(key.to_vec());
        }
        self.records.push((key.to_vec(), value.to_vec()));
        Ok(())
    }

    /// Returns the block's uncompressed payload size in bytes, used by the
    /// caller to decide when to close the block (the target block size is a
    /// soft cap: a single oversize record may push a block past it).
    #[must_use]
    pub fn uncompressed_size(&self) -> u64 {
        self.uncompressed_size
    }

    /// Returns `true` if no records have been added yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the number of records buffered so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns the first key added to this block, the anchor reported to the
    /// sparse index.
    #[must_use]
    pub fn first_key(&self) -> Option<&[u8]> {
        self.first_key.as_deref()
    }

    /// Serializes the buffered records into a fully framed block: header
    /// followed by payload, optionally zlib-compressed at the fastest level.
    ///
    /// CRC32 is computed over the payload exactly as stored (i.e. over the
    /// compressed bytes when `compress` is `true`).
    pub fn dump(&self, compress: bool) -> Result<Vec<u8>, BlockError> {
        let mut raw = Vec::new();
        for (k, v) in &self.records {
            raw.write_u16::<LittleEndian>(k.len() as u16)?;
            raw.extend_from_slice(k);
            raw.write_u32::<LittleEndian>(v.len() as u32)?;
            raw.extend_from_slice(v);
        }

        let (flags, payload) = if compress {
            let mut enc = ZlibEncoder::new(Vec::new(), Compression::fast());
            enc.write_all(&raw)?;
            (COMPRESSED_FLAG, enc.finish()?)
        } else {
            (0u8, raw)
        };

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&payload);
        let crc = hasher.finalize();

        let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
        out.write_u8(flags)?;
        out.write_u32::<LittleEndian>(crc)?;
        out.write_u64::<LittleEndian>(payload.len() as u64)?;
        out.extend_from_slice(&payload);
        Ok(out)
    }
}

/// Decodes a fully framed block (header + payload) into its records, in
/// stored order.
///
/// When `strict` is `true`, a CRC mismatch fails with
/// [`BlockError::Corrupt`]. Non-strict decoding is used only by the
/// compactor's tail-corruption-tolerant scan; callers of the public engine
/// API always decode strictly.
pub fn decode(bytes: &[u8], strict: bool) -> Result<Vec<(Vec<u8>, Vec<u8>)>, BlockError> {
    if bytes.len() < HEADER_SIZE {
        return Err(BlockError::Corrupt("block shorter than header".into()));
    }
    let mut header = &bytes[..HEADER_SIZE];
    let flags = header.read_u8()?;
    let crc = header.read_u32::<LittleEndian>()?;
    let size = header.read_u64::<LittleEndian>()?;

    let payload = &bytes[HEADER_SIZE..];
    if (payload.len() as u64) != size {
        return Err(BlockError::Corrupt(format!(
            "declared payload size {} does not match actual {}",
            size,
            payload.len()
        )));
    }

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(payload);
    if hasher.finalize() != crc {
        if strict {
            return Err(BlockError::Corrupt("crc32 mismatch".into()));
        }
    }

    let raw: Vec<u8> = if flags & COMPRESSED_FLAG != 0 {
        let mut dec = ZlibDecoder::new(payload);
        let mut out = Vec::new();
        dec.read_to_end(&mut out)
            .map_err(|e| BlockError::Corrupt(format!("zlib decompression failed: {e}")))?;
        out
    } else {
        payload.to_vec()
    };

    parse_records(&raw)
}

fn parse_records(raw: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, BlockError> {
    let mut records = Vec::new();
    let mut cursor = &raw[..];
    while !cursor.is_empty() {
        if cursor.len() < 2 {
            return Err(BlockError::Corrupt("truncated key length".into()));
        }
        let key_len = cursor.read_u16::<LittleEndian>()? as usize;
        if cursor.len() < key_len {
            return Err(BlockError::Corrupt("truncated key".into()));
        }
        let key = cursor[..key_len].to_vec();
        cursor = &cursor[key_len..];

        if cursor.len() < 4 {
            return Err(BlockError::Corrupt("truncated value length".into()));
        }
        let val_len = cursor.read_u32::<LittleEndian>()? as usize;
        if cursor.len() < val_len {
            return Err(BlockError::Corrupt("truncated value".into()));
        }
        let value = cursor[..val_len].to_vec();
        cursor = &cursor[val_len..];

        records.push((key, value));
    }
    Ok(records)
}
