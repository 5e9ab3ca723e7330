use crate::constants::{CHUNK_LAYER_VOXELS, CHUNK_SIZE_XZ, CHUNK_SIZE_Y, CHUNK_VOXELS};
use crate::types::{ChunkCoord, LocalVoxelCoord, VoxelCoord};
use glam::{IVec3, UVec3};

/// Chunk index along one axis: `floor(w / size)`.
pub fn world_to_chunk_axis(w: i32, size: u32) -> i32 {
    debug_assert!(size > 0, "chunk size must be positive");
    w.div_euclid(size as i32)
}

/// Offset along one axis inside the containing chunk, always in `[0, size)`.
pub fn world_to_local_axis(w: i32, size: u32) -> u32 {
    debug_assert!(size > 0, "chunk size must be positive");
    w.rem_euclid(size as i32) as u32
}

/// World coordinate of the first voxel of chunk `c` along one axis.
pub fn chunk_to_world_axis(c: i32, size: u32) -> i32 {
    c * size as i32
}

/// Convert a world-space voxel coordinate to its containing chunk coordinate.
pub fn world_to_chunk(world: VoxelCoord) -> ChunkCoord {
    IVec3::new(
        world_to_chunk_axis(world.x, CHUNK_SIZE_XZ),
        world_to_chunk_axis(world.y, CHUNK_SIZE_Y),
        world_to_chunk_axis(world.z, CHUNK_SIZE_XZ),
    )
}

/// Convert a world-space voxel coordinate to its local offset within a chunk.
pub fn world_to_local(world: VoxelCoord) -> LocalVoxelCoord {
    UVec3::new(
        world_to_local_axis(world.x, CHUNK_SIZE_XZ),
        world_to_local_axis(world.y, CHUNK_SIZE_Y),
        world_to_local_axis(world.z, CHUNK_SIZE_XZ),
    )
}

/// World-space coordinate of a chunk's (0, 0, 0) voxel.
pub fn chunk_origin(chunk: ChunkCoord) -> VoxelCoord {
    IVec3::new(
        chunk_to_world_axis(chunk.x, CHUNK_SIZE_XZ),
        chunk_to_world_axis(chunk.y, CHUNK_SIZE_Y),
        chunk_to_world_axis(chunk.z, CHUNK_SIZE_XZ),
    )
}

/// Convert a chunk coordinate and local offset back to world-space.
pub fn chunk_local_to_world(chunk: ChunkCoord, local: LocalVoxelCoord) -> VoxelCoord {
    chunk_origin(chunk) + local.as_ivec3()
}

/// Flat index of a local voxel: `x + z * XZ + y * XZ * XZ`.
///
/// Components are only checked in debug builds.
#[inline]
pub fn voxel_index(x: u32, y: u32, z: u32) -> usize {
    debug_assert!(x < CHUNK_SIZE_XZ, "x out of range: {x}");
    debug_assert!(y < CHUNK_SIZE_Y, "y out of range: {y}");
    debug_assert!(z < CHUNK_SIZE_XZ, "z out of range: {z}");
    (x + z * CHUNK_SIZE_XZ + y * CHUNK_LAYER_VOXELS) as usize
}

/// Inverse of [`voxel_index`].
#[inline]
pub fn index_to_local(index: usize) -> LocalVoxelCoord {
    debug_assert!(index < CHUNK_VOXELS as usize, "index out of range: {index}");
    let i = index as u32;
    UVec3::new(
        i % CHUNK_SIZE_XZ,
        i / CHUNK_LAYER_VOXELS,
        (i / CHUNK_SIZE_XZ) % CHUNK_SIZE_XZ,
    )
}
