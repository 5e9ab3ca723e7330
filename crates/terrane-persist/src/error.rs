use terrane_core::{ChunkCoord, CoreError};

/// Problems found while decoding index or data bytes.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("truncated block: expected at least {expected} bytes, got {actual}")]
    TruncatedBlock { expected: usize, actual: usize },

    #[error("invalid voxel data: {0}")]
    InvalidVoxel(#[from] CoreError),

    #[error("unsupported index version {0}")]
    UnsupportedVersion(i32),

    #[error("index file too small ({0} bytes, minimum {1})")]
    IndexTooSmall(usize, usize),

    #[error("index size mismatch: header says {expected} bytes, file has {actual}")]
    IndexSizeMismatch { expected: usize, actual: usize },

    #[error("negative record count {0}")]
    NegativeCount(i32),

    #[error("record for chunk {coord} ends at {end}, past data file length {data_len}")]
    RecordOutOfBounds {
        coord: ChunkCoord,
        end: u64,
        data_len: u64,
    },
}

/// Errors returned by [`crate::ChunkStore`].
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt data for chunk {coord}: {source}")]
    Corrupt {
        coord: ChunkCoord,
        source: FormatError,
    },

    #[error("data file exhausted: writing {len} bytes at offset {offset} exceeds the 32-bit offset range")]
    DataFileExhausted { offset: u64, len: usize },

    #[error("chunk store lock poisoned")]
    Poisoned,
}
