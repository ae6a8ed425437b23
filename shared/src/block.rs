use serde::{Deserialize, Serialize};

/// Voxel material. The discriminant is the id used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum BlockType {
    Stone = 1,
    Wood = 2,
    Leaves = 3,
    Dirt = 4,
    Sand = 5,
    Water = 6,
    Road = 7,
    Glass = 8,
    Roof = 9,
}

impl BlockType {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<BlockType> {
        match id {
            1 => Some(BlockType::Stone),
            2 => Some(BlockType::Wood),
            3 => Some(BlockType::Leaves),
            4 => Some(BlockType::Dirt),
            5 => Some(BlockType::Sand),
            6 => Some(BlockType::Water),
            7 => Some(BlockType::Road),
            8 => Some(BlockType::Glass),
            9 => Some(BlockType::Roof),
            _ => None,
        }
    }

    /// Water is the only stored block that neither collides nor blocks sight.
    pub fn is_solid(self) -> bool {
        self != BlockType::Water
    }
}

impl From<BlockType> for u8 {
    fn from(block: BlockType) -> u8 {
        block.id()
    }
}

impl TryFrom<u8> for BlockType {
    type Error = String;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        BlockType::from_id(id).ok_or_else(|| format!("unknown block id {}", id))
    }
}
