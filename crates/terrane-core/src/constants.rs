//! Single source of truth for shared sizes.
//! Both the generator and the on-disk format depend on these values; changing
//! any of them invalidates existing world files.

/// Horizontal side length of a chunk in voxels (x and z).
pub const CHUNK_SIZE_XZ: u32 = 32;

/// Vertical side length of a chunk in voxels.
pub const CHUNK_SIZE_Y: u32 = 32;

/// Voxels in one horizontal layer of a chunk.
pub const CHUNK_LAYER_VOXELS: u32 = CHUNK_SIZE_XZ * CHUNK_SIZE_XZ;

/// Total voxels per chunk (32 * 32 * 32).
pub const CHUNK_VOXELS: u32 = CHUNK_LAYER_VOXELS * CHUNK_SIZE_Y;

/// Bytes per voxel on disk and in memory.
pub const VOXEL_BYTES: u32 = 1;

/// Mask selecting the block type bits of a voxel byte.
pub const BLOCK_TYPE_MASK: u8 = 0x1F;

/// Render hint: draw this voxel as an unmodified cube.
pub const FULL_VOXEL_BIT: u8 = 0x80;

/// Maximum number of decorations recorded per chunk.
pub const MAX_DECORATIONS: usize = 16;
