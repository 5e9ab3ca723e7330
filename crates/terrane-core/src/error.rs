use thiserror::Error;

/// Errors raised when raw bytes are turned into voxels or chunk buffers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid block type byte {0:#04x}")]
    InvalidBlockType(u8),

    #[error("voxel count mismatch: expected {expected}, got {actual}")]
    VoxelCountMismatch { expected: usize, actual: usize },
}
