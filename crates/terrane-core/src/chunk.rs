use crate::block::BlockType;
use crate::constants::{CHUNK_LAYER_VOXELS, CHUNK_SIZE_XZ, CHUNK_SIZE_Y, CHUNK_VOXELS};
use crate::decoration::DecorationList;
use crate::error::CoreError;
use crate::math::{chunk_origin, voxel_index, world_to_chunk, world_to_local};
use crate::types::{ChunkCoord, ChunkFlags, LocalVoxelCoord, Voxel, VoxelCoord};
use glam::IVec3;

/// Flat voxel storage for one chunk plus its flags and decorations.
///
/// Owned by whoever fills it. The generator and the store's read path both
/// overwrite every field, so a buffer can be reused across chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkBuffer {
    coord: ChunkCoord,
    voxels: Box<[Voxel]>,
    flags: ChunkFlags,
    decorations: DecorationList,
}

impl Default for ChunkBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkBuffer {
    /// All-air buffer at the origin chunk.
    pub fn new() -> Self {
        Self {
            coord: IVec3::ZERO,
            voxels: vec![Voxel::AIR; CHUNK_VOXELS as usize].into_boxed_slice(),
            flags: ChunkFlags::AIR,
            decorations: DecorationList::new(),
        }
    }

    /// Clear to all air and retarget at `coord`.
    pub fn reset(&mut self, coord: ChunkCoord) {
        self.coord = coord;
        self.voxels.fill(Voxel::AIR);
        self.flags = ChunkFlags::AIR;
        self.decorations.clear();
    }

    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    pub fn set_coord(&mut self, coord: ChunkCoord) {
        self.coord = coord;
    }

    /// World-space coordinate of local voxel (0, 0, 0).
    pub fn origin(&self) -> VoxelCoord {
        chunk_origin(self.coord)
    }

    pub fn flags(&self) -> ChunkFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: ChunkFlags) {
        self.flags = flags;
    }

    pub fn decorations(&self) -> &DecorationList {
        &self.decorations
    }

    pub fn decorations_mut(&mut self) -> &mut DecorationList {
        &mut self.decorations
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32, z: u32) -> Voxel {
        self.voxels[voxel_index(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, z: u32, voxel: Voxel) {
        self.voxels[voxel_index(x, y, z)] = voxel;
    }

    pub fn get_local(&self, local: LocalVoxelCoord) -> Voxel {
        self.get(local.x, local.y, local.z)
    }

    /// Voxel at a world coordinate, or `None` if it lies in another chunk.
    pub fn get_world(&self, world: VoxelCoord) -> Option<Voxel> {
        if world_to_chunk(world) != self.coord {
            return None;
        }
        Some(self.get_local(world_to_local(world)))
    }

    /// Write a voxel at a world coordinate. Returns false if it lies in another chunk.
    pub fn set_world(&mut self, world: VoxelCoord, voxel: Voxel) -> bool {
        if world_to_chunk(world) != self.coord {
            return false;
        }
        let local = world_to_local(world);
        self.set(local.x, local.y, local.z, voxel);
        true
    }

    pub fn voxels(&self) -> &[Voxel] {
        &self.voxels
    }

    pub fn voxels_mut(&mut self) -> &mut [Voxel] {
        &mut self.voxels
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.voxels)
    }

    /// Replace all voxels from validated raw bytes.
    pub fn copy_from_bytes(&mut self, bytes: &[u8]) -> Result<(), CoreError> {
        if bytes.len() != self.voxels.len() {
            return Err(CoreError::VoxelCountMismatch {
                expected: self.voxels.len(),
                actual: bytes.len(),
            });
        }
        for (dst, &raw) in self.voxels.iter_mut().zip(bytes) {
            *dst = Voxel::from_raw(raw)?;
        }
        Ok(())
    }

    /// Recompute `SOLID`, `AIR`, `LIQUID` and `DECORATIONS` from the contents.
    /// `SOLID_SLAB` is recomputed only when `check_solid_slab` is set and
    /// cleared otherwise. `EDITED` is preserved.
    pub fn recompute_flags(&mut self, check_solid_slab: bool) -> ChunkFlags {
        let mut flags = ChunkFlags::EMPTY;
        for v in self.voxels.iter() {
            let block = v.block();
            if block == BlockType::Air {
                flags.insert(ChunkFlags::AIR);
            } else if block.is_liquid() {
                flags.insert(ChunkFlags::LIQUID);
            } else if block.is_solid() {
                flags.insert(ChunkFlags::SOLID);
            }
        }
        flags.set(ChunkFlags::DECORATIONS, !self.decorations.is_empty());
        if check_solid_slab && self.has_solid_slab() {
            flags.insert(ChunkFlags::SOLID_SLAB);
        }
        if self.flags.contains(ChunkFlags::EDITED) {
            flags.insert(ChunkFlags::EDITED);
        }
        self.flags = flags;
        flags
    }

    /// True when at least one horizontal layer is entirely solid.
    pub fn has_solid_slab(&self) -> bool {
        self.voxels
            .chunks_exact(CHUNK_LAYER_VOXELS as usize)
            .any(|layer| layer.iter().all(|v| v.block().is_solid()))
    }

    /// Iterate `(y, voxel)` from the top of column `(x, z)` downward.
    pub fn column_top_down(&self, x: u32, z: u32) -> impl Iterator<Item = (u32, Voxel)> + '_ {
        debug_assert!(x < CHUNK_SIZE_XZ && z < CHUNK_SIZE_XZ);
        (0..CHUNK_SIZE_Y).rev().map(move |y| (y, self.get(x, y, z)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_all_air() {
        let buf = ChunkBuffer::new();
        assert_eq!(buf.voxels().len(), CHUNK_VOXELS as usize);
        assert!(buf.voxels().iter().all(|v| v.is_air()));
        assert_eq!(buf.flags(), ChunkFlags::AIR);
    }

    #[test]
    fn test_set_get_and_world_access() {
        let mut buf = ChunkBuffer::new();
        buf.reset(IVec3::new(-1, 0, 2));
        buf.set(3, 4, 5, Voxel::from(BlockType::Sand));
        assert_eq!(buf.get(3, 4, 5).block(), BlockType::Sand);

        let world = buf.origin() + IVec3::new(3, 4, 5);
        assert_eq!(world, IVec3::new(-29, 4, 69));
        assert_eq!(buf.get_world(world).map(Voxel::block), Some(BlockType::Sand));
        assert_eq!(buf.get_world(IVec3::new(3, 4, 5)), None);
        assert!(!buf.set_world(IVec3::ZERO, Voxel::AIR));
    }

    #[test]
    fn test_recompute_flags() {
        let mut buf = ChunkBuffer::new();
        buf.set(0, 0, 0, Voxel::from(BlockType::Rock));
        buf.set(1, 0, 0, Voxel::from(BlockType::Water));
        let flags = buf.recompute_flags(true);
        assert!(flags.contains(ChunkFlags::SOLID | ChunkFlags::AIR | ChunkFlags::LIQUID));
        assert!(!flags.contains(ChunkFlags::SOLID_SLAB));
        assert!(!flags.contains(ChunkFlags::DECORATIONS));
    }

    #[test]
    fn test_solid_slab_detection() {
        let mut buf = ChunkBuffer::new();
        for z in 0..CHUNK_SIZE_XZ {
            for x in 0..CHUNK_SIZE_XZ {
                buf.set(x, 7, z, Voxel::from(BlockType::Dirt));
            }
        }
        assert!(buf.has_solid_slab());
        assert!(buf.recompute_flags(true).contains(ChunkFlags::SOLID_SLAB));
        assert!(!buf.recompute_flags(false).contains(ChunkFlags::SOLID_SLAB));

        buf.set(31, 7, 31, Voxel::from(BlockType::Water));
        assert!(!buf.has_solid_slab());
    }

    #[test]
    fn test_edited_flag_survives_recompute() {
        let mut buf = ChunkBuffer::new();
        buf.set_flags(ChunkFlags::AIR | ChunkFlags::EDITED);
        assert!(buf.recompute_flags(false).contains(ChunkFlags::EDITED));
        buf.reset(IVec3::ZERO);
        assert!(!buf.flags().contains(ChunkFlags::EDITED));
    }

    #[test]
    fn test_copy_from_bytes_validates() {
        let mut buf = ChunkBuffer::new();
        let err = buf.copy_from_bytes(&[0u8; 10]).unwrap_err();
        assert_eq!(
            err,
            CoreError::VoxelCountMismatch {
                expected: CHUNK_VOXELS as usize,
                actual: 10
            }
        );

        let mut bytes = vec![BlockType::Dirt as u8; CHUNK_VOXELS as usize];
        bytes[0] = 0x1E;
        assert_eq!(
            buf.copy_from_bytes(&bytes),
            Err(CoreError::InvalidBlockType(0x1E))
        );

        bytes[0] = 0;
        buf.copy_from_bytes(&bytes).expect("valid bytes");
        assert_eq!(buf.as_bytes(), bytes.as_slice());
    }

    #[test]
    fn test_column_top_down_order() {
        let mut buf = ChunkBuffer::new();
        buf.set(2, 0, 2, Voxel::from(BlockType::Rock));
        let column: Vec<_> = buf.column_top_down(2, 2).collect();
        assert_eq!(column.first().map(|c| c.0), Some(CHUNK_SIZE_Y - 1));
        assert_eq!(column.last(), Some(&(0, Voxel::from(BlockType::Rock))));
    }
}
