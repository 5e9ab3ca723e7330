use crate::block::BlockType;
use crate::constants::{BLOCK_TYPE_MASK, FULL_VOXEL_BIT};
use crate::error::CoreError;
use glam::{IVec3, UVec3};
use serde::{Deserialize, Serialize};

/// Chunk coordinate in chunk-space (each unit = one chunk side length).
pub type ChunkCoord = IVec3;

/// World coordinate in voxel-space.
pub type VoxelCoord = IVec3;

/// Voxel offset inside a chunk. x and z in `[0, CHUNK_SIZE_XZ)`, y in `[0, CHUNK_SIZE_Y)`.
pub type LocalVoxelCoord = UVec3;

/// One voxel byte.
///
/// Bit layout:
///   [0:4]  block type (0 = air)
///   [5:6]  reserved, always zero
///   [7]    full-voxel render hint
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, bytemuck::Pod, bytemuck::Zeroable,
)]
#[repr(transparent)]
pub struct Voxel(u8);

impl Voxel {
    pub const AIR: Voxel = Voxel(0);

    pub const fn new(block: BlockType, full: bool) -> Voxel {
        let bits = block as u8 & BLOCK_TYPE_MASK;
        if full {
            Voxel(bits | FULL_VOXEL_BIT)
        } else {
            Voxel(bits)
        }
    }

    /// Validate a raw byte read from storage.
    pub fn from_raw(raw: u8) -> Result<Voxel, CoreError> {
        if raw & !(BLOCK_TYPE_MASK | FULL_VOXEL_BIT) != 0 {
            return Err(CoreError::InvalidBlockType(raw));
        }
        BlockType::try_from(raw & BLOCK_TYPE_MASK).map_err(|_| CoreError::InvalidBlockType(raw))?;
        Ok(Voxel(raw))
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Block type of this voxel. Bytes that bypassed [`Voxel::from_raw`] and
    /// carry an unknown type read as air.
    pub fn block(self) -> BlockType {
        BlockType::from_u8(self.0 & BLOCK_TYPE_MASK).unwrap_or(BlockType::Air)
    }

    pub const fn is_full(self) -> bool {
        self.0 & FULL_VOXEL_BIT != 0
    }

    pub const fn with_full(self, full: bool) -> Voxel {
        if full {
            Voxel(self.0 | FULL_VOXEL_BIT)
        } else {
            Voxel(self.0 & !FULL_VOXEL_BIT)
        }
    }

    pub fn is_air(self) -> bool {
        self.block() == BlockType::Air
    }
}

impl From<BlockType> for Voxel {
    fn from(block: BlockType) -> Self {
        Voxel::new(block, false)
    }
}

/// Aggregate chunk flags, persisted as a u32 in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkFlags(u32);

impl ChunkFlags {
    pub const EMPTY: ChunkFlags = ChunkFlags(0);
    /// Any solid voxel.
    pub const SOLID: ChunkFlags = ChunkFlags(1 << 0);
    /// Any air voxel.
    pub const AIR: ChunkFlags = ChunkFlags(1 << 1);
    /// Any water voxel.
    pub const LIQUID: ChunkFlags = ChunkFlags(1 << 2);
    /// The decoration list is non-empty. Cleared when a chunk is loaded from
    /// disk, since decorations are not persisted.
    pub const DECORATIONS: ChunkFlags = ChunkFlags(1 << 3);
    /// Some horizontal layer is entirely solid. Only computed on request.
    pub const SOLID_SLAB: ChunkFlags = ChunkFlags(1 << 4);
    /// Modified after generation. Never set by the generator.
    pub const EDITED: ChunkFlags = ChunkFlags(1 << 5);

    pub const fn from_bits(bits: u32) -> ChunkFlags {
        ChunkFlags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: ChunkFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: ChunkFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: ChunkFlags) {
        self.0 &= !other.0;
    }

    pub fn set(&mut self, other: ChunkFlags, on: bool) {
        if on {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }

    pub const fn union(self, other: ChunkFlags) -> ChunkFlags {
        ChunkFlags(self.0 | other.0)
    }

    /// True when the chunk holds anything other than air.
    pub const fn has_content(self) -> bool {
        self.0 & (Self::SOLID.0 | Self::LIQUID.0) != 0
    }
}

impl std::ops::BitOr for ChunkFlags {
    type Output = ChunkFlags;

    fn bitor(self, rhs: ChunkFlags) -> ChunkFlags {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for ChunkFlags {
    fn bitor_assign(&mut self, rhs: ChunkFlags) {
        self.insert(rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voxel_size() {
        assert_eq!(std::mem::size_of::<Voxel>(), 1);
    }

    #[test]
    fn test_voxel_bits() {
        let v = Voxel::new(BlockType::Rock, true);
        assert_eq!(v.raw(), 0x81);
        assert_eq!(v.block(), BlockType::Rock);
        assert!(v.is_full());
        assert!(!v.with_full(false).is_full());
        assert_eq!(v.with_full(false).block(), BlockType::Rock);
        assert!(Voxel::AIR.is_air());
    }

    #[test]
    fn test_voxel_from_raw_rejects_bad_bytes() {
        assert_eq!(Voxel::from_raw(0x87), Ok(Voxel::new(BlockType::Water, true)));
        assert_eq!(Voxel::from_raw(0x1F), Err(CoreError::InvalidBlockType(0x1F)));
        assert_eq!(Voxel::from_raw(0x21), Err(CoreError::InvalidBlockType(0x21)));
    }

    #[test]
    fn test_voxel_slice_casts_to_bytes() {
        let voxels = [Voxel::AIR, Voxel::from(BlockType::Dirt)];
        let bytes: &[u8] = bytemuck::cast_slice(&voxels);
        assert_eq!(bytes, &[0, 2]);
    }

    #[test]
    fn test_flags_ops() {
        let mut f = ChunkFlags::SOLID | ChunkFlags::AIR;
        assert!(f.contains(ChunkFlags::SOLID));
        assert!(!f.contains(ChunkFlags::LIQUID));
        f.set(ChunkFlags::EDITED, true);
        f.remove(ChunkFlags::SOLID);
        assert_eq!(f.bits(), ChunkFlags::AIR.bits() | ChunkFlags::EDITED.bits());
        assert!(!f.has_content());
        assert!(ChunkFlags::LIQUID.has_content());
        assert_eq!(ChunkFlags::from_bits(f.bits()), f);
    }
}
