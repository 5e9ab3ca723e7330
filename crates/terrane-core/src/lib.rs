//! Shared sizes, coordinates, voxel encoding and the chunk buffer.
#![forbid(unsafe_code)]

pub mod block;
pub mod chunk;
pub mod constants;
pub mod decoration;
pub mod error;
pub mod math;
pub mod types;

pub use block::BlockType;
pub use chunk::ChunkBuffer;
pub use decoration::{Decoration, DecorationKind, DecorationList};
pub use error::CoreError;
pub use types::{ChunkCoord, ChunkFlags, LocalVoxelCoord, Voxel, VoxelCoord};
