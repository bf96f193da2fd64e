use std::io;
use thiserror::Error;

/// The engine's public error taxonomy.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The key is absent, or its newest entry is a tombstone.
    #[error("key not found")]
    NotFound,

    /// A key or value violated a size bound (key > 65535 bytes, value >
    /// 2^32-1 bytes).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A checksum or framing invariant was violated while reading a block.
    #[error("corruption: {0}")]
    Corruption(String),

    /// A block or record construction would exceed a hard size bound.
    #[error("size overflow: {0}")]
    SizeOverflow(String),

    /// An underlying filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Corruption was found in a non-tail segment during recovery, or the
    /// on-disk chain could not be consistently reconstructed.
    #[error("unrecoverable: {0}")]
    Unrecoverable(String),
}

impl From<block::BlockError> for EngineError {
    fn from(e: block::BlockError) -> Self {
        match e {
            block::BlockError::Io(io) => EngineError::Io(io),
            block::BlockError::Corrupt(msg) => EngineError::Corruption(msg),
            block::BlockError::SizeOverflow(msg) => EngineError::SizeOverflow(msg),
        }
    }
}

impl From<segment::SegmentError> for EngineError {
    fn from(e: segment::SegmentError) -> Self {
        match e {
            segment::SegmentError::Io(io) => EngineError::Io(io),
        }
    }
}

impl From<wal::WalError> for EngineError {
    fn from(e: wal::WalError) -> Self {
        match e {
            wal::WalError::Io(io) => EngineError::Io(io),
            wal::WalError::Corrupt(msg) => EngineError::Corruption(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_displays_a_non_empty_message() {
        let variants: Vec<EngineError> = vec![
            EngineError::NotFound,
            EngineError::InvalidArgument("bad key".into()),
            EngineError::Corruption("bad crc".into()),
            EngineError::SizeOverflow("block too big".into()),
            EngineError::Io(io::Error::new(io::ErrorKind::Other, "disk full")),
            EngineError::Unrecoverable("chain inconsistent".into()),
        ];
        for e in variants {
            assert!(!e.to_string().is_empty());
        }
    }

    #[test]
    fn block_error_conversion_preserves_message() {
        let e: EngineError = block::BlockError::Corrupt("crc mismatch".into()).into();
        assert!(matches!(e, EngineError::Corruption(msg) if msg == "crc mismatch"));
    }

    #[test]
    fn wal_error_conversion_preserves_message() {
        let e: EngineError = wal::WalError::Corrupt("bad frame".into()).into();
        assert!(matches!(e, EngineError::Corruption(msg) if msg == "bad frame"));
    }
}
