//! # Block Module
//!
//! This module provides the voxel material definitions used by chunk storage and meshing.
//! A voxel is stored as a single byte: `0` is air, every other value is a solid material id.
//!
//! Material ids must fit in 7 bits (`1..=127`). The greedy mesher encodes face direction
//! in the sign of an `i8` mask cell, so larger ids could not be told apart from the sign.

use block_type::BlockType;

pub mod block_side;
pub mod block_type;

/// The underlying integer type used to represent block types in memory.
pub type BlockTypeSize = u8;

/// The voxel value reserved for empty space.
pub const AIR: BlockTypeSize = BlockType::AIR as BlockTypeSize;

/// Largest material id that can be stored in a chunk.
pub const MAX_BLOCK_ID: BlockTypeSize = 127;

/// Colour used for material ids that have no entry in [`BLOCK_COLORS`].
pub const FALLBACK_BLOCK_COLOR: [f32; 3] = [1.0, 0.0, 1.0];

/// Vertex colour per material id.
///
/// Shading is out of scope for this crate, so a flat RGB colour per material is all the
/// vertex format carries.
pub static BLOCK_COLORS: phf::Map<u8, [f32; 3]> = phf::phf_map! {
    1u8 => [0.45, 0.31, 0.18], // DIRT
    2u8 => [0.30, 0.62, 0.22], // GRASS
    3u8 => [0.50, 0.50, 0.52], // STONE
    4u8 => [0.55, 0.40, 0.22], // WOOD
    5u8 => [0.86, 0.80, 0.55], // SAND
    6u8 => [0.95, 0.96, 0.98], // SNOW
    7u8 => [1.00, 1.00, 1.00], // WHITE
};

/// Returns `true` when the voxel value represents solid material.
#[inline]
pub fn is_solid(block: BlockTypeSize) -> bool {
    block != AIR
}

/// Returns `true` when `block` is a storable voxel value (air or a 7-bit material id).
#[inline]
pub fn is_valid_block(block: BlockTypeSize) -> bool {
    block <= MAX_BLOCK_ID
}

/// Looks up the vertex colour for a material id.
pub fn block_color(block: BlockTypeSize) -> [f32; 3] {
    BLOCK_COLORS
        .get(&block)
        .copied()
        .unwrap_or(FALLBACK_BLOCK_COLOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_named_solid_type_has_a_color() {
        for block in BlockType::solid_types() {
            assert_ne!(block_color(block as u8), FALLBACK_BLOCK_COLOR, "{:?}", block);
        }
    }

    #[test]
    fn unknown_ids_use_fallback_color() {
        assert_eq!(block_color(99), FALLBACK_BLOCK_COLOR);
    }

    #[test]
    fn validity_matches_seven_bit_range() {
        assert!(is_valid_block(0));
        assert!(is_valid_block(127));
        assert!(!is_valid_block(128));
        assert!(!is_solid(AIR));
        assert!(is_solid(1));
    }
}
