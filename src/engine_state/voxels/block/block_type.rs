//! # Block Type Module
//!
//! Named voxel materials and conversions from the raw byte stored in chunks.

use num_derive::FromPrimitive;

use super::BlockTypeSize;

/// Enumerates the named block types the terrain generator produces.
///
/// Chunks store raw bytes, so any id in `1..=127` is a valid solid voxel even when it has
/// no named variant here.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum BlockType {
    /// Empty space. Non-solid and transparent.
    AIR = 0,
    /// Plain dirt.
    DIRT = 1,
    /// Grass-topped dirt.
    GRASS = 2,
    /// Stone, the bulk of underground terrain.
    STONE = 3,
    /// Tree trunks.
    WOOD = 4,
    /// Sand near sea level.
    SAND = 5,
    /// Snow on high ground.
    SNOW = 6,
    /// A plain white block, mostly used in tests.
    WHITE = 7,
}

impl BlockType {
    /// Converts a `BlockTypeSize` to a `BlockType`, returning `None` for unnamed ids.
    pub fn from_int(btype: BlockTypeSize) -> Option<Self> {
        num::FromPrimitive::from_u8(btype)
    }

    /// All named solid block types.
    pub fn solid_types() -> [BlockType; 7] {
        [
            BlockType::DIRT,
            BlockType::GRASS,
            BlockType::STONE,
            BlockType::WOOD,
            BlockType::SAND,
            BlockType::SNOW,
            BlockType::WHITE,
        ]
    }

    /// Generates a random block type (excluding AIR).
    pub fn get_random_type() -> Self {
        let types = Self::solid_types();
        types[fastrand::usize(..types.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_from_raw_ids() {
        assert_eq!(BlockType::from_int(0), Some(BlockType::AIR));
        assert_eq!(BlockType::from_int(3), Some(BlockType::STONE));
        assert_eq!(BlockType::from_int(42), None);
    }

    #[test]
    fn random_type_is_never_air() {
        fastrand::seed(7);
        for _ in 0..64 {
            assert_ne!(BlockType::get_random_type(), BlockType::AIR);
        }
    }
}
