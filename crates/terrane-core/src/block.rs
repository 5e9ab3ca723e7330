use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Block type stored in the low five bits of a voxel. 0 = air.
///
/// Discriminants are persisted; never reorder existing variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlockType {
    #[default]
    Air = 0,
    Rock = 1,
    Dirt = 2,
    Grass = 3,
    Sand = 4,
    Snow = 5,
    Ice = 6,
    Water = 7,
    Wood = 8,
    Leaves = 9,
    Needles = 10,
    FlowerRed = 11,
    FlowerYellow = 12,
    FlowerBlue = 13,
    FlowerWhite = 14,
    Brick = 15,
    Plank = 16,
    Thatch = 17,
}

/// Number of defined block types.
pub const BLOCK_TYPE_COUNT: usize = 18;

/// Static per-type properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockProps {
    pub solid: bool,
    pub liquid: bool,
    pub foliage: bool,
    pub transparent: bool,
}

const fn props(solid: bool, liquid: bool, foliage: bool, transparent: bool) -> BlockProps {
    BlockProps {
        solid,
        liquid,
        foliage,
        transparent,
    }
}

// Indexed by discriminant.
static BLOCK_PROPS: [BlockProps; BLOCK_TYPE_COUNT] = [
    props(false, false, false, true), // Air
    props(true, false, false, false), // Rock
    props(true, false, false, false), // Dirt
    props(true, false, false, false), // Grass
    props(true, false, false, false), // Sand
    props(true, false, false, false), // Snow
    props(true, false, false, true),  // Ice
    props(false, true, false, true),  // Water
    props(true, false, false, false), // Wood
    props(true, false, true, true),   // Leaves
    props(true, false, true, true),   // Needles
    props(false, false, true, true),  // FlowerRed
    props(false, false, true, true),  // FlowerYellow
    props(false, false, true, true),  // FlowerBlue
    props(false, false, true, true),  // FlowerWhite
    props(true, false, false, false), // Brick
    props(true, false, false, false), // Plank
    props(true, false, false, false), // Thatch
];

impl BlockType {
    pub const ALL: [BlockType; BLOCK_TYPE_COUNT] = [
        BlockType::Air,
        BlockType::Rock,
        BlockType::Dirt,
        BlockType::Grass,
        BlockType::Sand,
        BlockType::Snow,
        BlockType::Ice,
        BlockType::Water,
        BlockType::Wood,
        BlockType::Leaves,
        BlockType::Needles,
        BlockType::FlowerRed,
        BlockType::FlowerYellow,
        BlockType::FlowerBlue,
        BlockType::FlowerWhite,
        BlockType::Brick,
        BlockType::Plank,
        BlockType::Thatch,
    ];

    /// Flower variants in the order the decoration pass selects them.
    pub const FLOWERS: [BlockType; 4] = [
        BlockType::FlowerRed,
        BlockType::FlowerYellow,
        BlockType::FlowerBlue,
        BlockType::FlowerWhite,
    ];

    pub fn from_u8(value: u8) -> Option<BlockType> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn props(self) -> BlockProps {
        BLOCK_PROPS[self as usize]
    }

    pub fn is_solid(self) -> bool {
        self.props().solid
    }

    pub fn is_liquid(self) -> bool {
        self.props().liquid
    }

    pub fn is_foliage(self) -> bool {
        self.props().foliage
    }

    pub fn is_transparent(self) -> bool {
        self.props().transparent
    }
}

impl TryFrom<u8> for BlockType {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        BlockType::from_u8(value).ok_or(CoreError::InvalidBlockType(value))
    }
}
