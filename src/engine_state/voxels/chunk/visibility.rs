//! # Chunk Visibility Module
//!
//! Computes which pairs of chunk faces are connected by a path of non-solid voxels
//! inside the chunk. The result is a 15-bit mask, one bit per unordered pair of the six
//! faces, consumed by the octree and by the neighbour-chain occlusion walk.
//!
//! ## Algorithm
//!
//! A multi-source flood fill (6-connected BFS) runs over every unvisited air voxel. Each
//! connected component records the set of chunk faces it touches; every pair of touched
//! faces sets its bit. A component touching a single face contributes nothing.

use std::collections::VecDeque;

use bitvec::prelude::BitVec;
use log::{debug, error};
use web_time::Instant;

use crate::engine_state::voxels::block::block_side::BlockSide;

use super::{voxel_index, Chunk, CHUNK_DIMENSION, CHUNK_VOLUME};

/// Visibility bit mask type. Only the low 15 bits are used.
pub type VisibilityBits = u16;

/// Mask with every face pair connected, the value for an all-air chunk.
pub const ALL_VISIBILITY_BITS: VisibilityBits = 0x7FFF;

/// BFS queue length at which a component is considered runaway.
const MAX_QUEUE_LENGTH: usize = CHUNK_VOLUME * 2;

/// Maps an unordered pair of distinct face indices (0..6) to a bit index (0..15).
///
/// The pair is canonicalized so `i < j`, then enumerated triangularly:
/// `sum_{k<i}(5 - k) + (j - i - 1)`.
pub fn pair_index(i: usize, j: usize) -> Option<u32> {
    if i == j || i >= 6 || j >= 6 {
        return None;
    }
    let (i, j) = if i < j { (i, j) } else { (j, i) };
    let preceding: usize = (0..i).map(|k| 5 - k).sum();
    Some((preceding + (j - i - 1)) as u32)
}

/// The single-bit mask for a pair of faces, `0` when both faces are the same.
pub fn pair_bit(a: BlockSide, b: BlockSide) -> VisibilityBits {
    pair_index(a as usize, b as usize).map_or(0, |bit| 1 << bit)
}

/// Checks whether `bits` records an air path between faces `a` and `b`.
pub fn faces_connected(bits: VisibilityBits, a: BlockSide, b: BlockSide) -> bool {
    let bit = pair_bit(a, b);
    bit != 0 && bits & bit != 0
}

fn touched_faces(x: i32, y: i32, z: i32) -> u8 {
    let last = CHUNK_DIMENSION - 1;
    let mut faces = 0u8;
    for (axis, coordinate) in [x, y, z].into_iter().enumerate() {
        if coordinate == last {
            faces |= 1 << BlockSide::from_axis(axis, true) as u8;
        }
        if coordinate == 0 {
            faces |= 1 << BlockSide::from_axis(axis, false) as u8;
        }
    }
    faces
}

fn bits_for_faces(faces: u8) -> VisibilityBits {
    let mut bits = 0;
    for i in 0..6 {
        if faces & (1 << i) == 0 {
            continue;
        }
        for j in (i + 1)..6 {
            if faces & (1 << j) != 0 {
                if let Some(bit) = pair_index(i, j) {
                    bits |= 1 << bit;
                }
            }
        }
    }
    bits
}

fn coordinates(index: usize) -> (i32, i32, i32) {
    let index = index as i32;
    (
        index % CHUNK_DIMENSION,
        (index / CHUNK_DIMENSION) % CHUNK_DIMENSION,
        index / (CHUNK_DIMENSION * CHUNK_DIMENSION),
    )
}

/// Computes the 15-bit face-pair connectivity mask of a chunk.
pub fn compute_visibility_bits(chunk: &Chunk) -> VisibilityBits {
    if chunk.is_empty_chunk() {
        return ALL_VISIBILITY_BITS;
    }
    if chunk.is_full_chunk() {
        return 0;
    }

    let start = Instant::now();
    let mut visited: BitVec = BitVec::repeat(false, CHUNK_VOLUME);
    let mut queue = VecDeque::new();
    let mut bits: VisibilityBits = 0;

    for seed in 0..CHUNK_VOLUME {
        if visited[seed] || chunk.is_solid_index(seed) {
            continue;
        }

        visited.set(seed, true);
        queue.clear();
        queue.push_back(seed);
        let mut faces = 0u8;

        while let Some(index) = queue.pop_front() {
            let (x, y, z) = coordinates(index);
            faces |= touched_faces(x, y, z);

            for side in BlockSide::all() {
                let step = side.offset();
                let Some(neighbor) = voxel_index(x + step.x, y + step.y, z + step.z) else {
                    continue;
                };
                if visited[neighbor] || chunk.is_solid_index(neighbor) {
                    continue;
                }
                visited.set(neighbor, true);
                queue.push_back(neighbor);
            }

            if queue.len() > MAX_QUEUE_LENGTH {
                error!(
                    "Flood fill for chunk {:?} exceeded {} queued voxels, returning partial visibility",
                    chunk.position, MAX_QUEUE_LENGTH
                );
                return bits | bits_for_faces(faces);
            }
        }

        bits |= bits_for_faces(faces);
        if bits == ALL_VISIBILITY_BITS {
            break;
        }
    }

    debug!(
        "Visibility for chunk {:?}: {:015b} in {:?}",
        chunk.position,
        bits,
        start.elapsed()
    );

    bits
}

#[cfg(test)]
mod tests {
    use cgmath::Point3;

    use super::*;

    #[test]
    fn pair_index_is_symmetric_and_dense() {
        let mut seen = [false; 15];
        for i in 0..6 {
            assert_eq!(pair_index(i, i), None);
            for j in 0..6 {
                if i == j {
                    continue;
                }
                assert_eq!(pair_index(i, j), pair_index(j, i));
                let bit = pair_index(i, j).unwrap() as usize;
                assert!(bit < 15);
                seen[bit] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
        assert_eq!(pair_index(0, 1), Some(0));
        assert_eq!(pair_index(0, 5), Some(4));
        assert_eq!(pair_index(1, 2), Some(5));
        assert_eq!(pair_index(4, 5), Some(14));
    }

    #[test]
    fn all_air_connects_everything() {
        let chunk = Chunk::empty(Point3::new(0, 0, 0));
        assert_eq!(compute_visibility_bits(&chunk), ALL_VISIBILITY_BITS);
    }

    #[test]
    fn all_solid_connects_nothing() {
        let chunk = Chunk::solid(Point3::new(0, 0, 0));
        assert_eq!(compute_visibility_bits(&chunk), 0);
    }

    #[test]
    fn wall_splits_the_chunk() {
        // A solid wall at x = 8 separates the -X half from the +X half.
        let mut chunk = Chunk::empty(Point3::new(0, 0, 0));
        for z in 0..CHUNK_DIMENSION {
            for y in 0..CHUNK_DIMENSION {
                chunk.set_voxel(8, y, z, 3).unwrap();
            }
        }
        let bits = compute_visibility_bits(&chunk);

        assert!(!faces_connected(bits, BlockSide::LEFT, BlockSide::RIGHT));
        assert!(faces_connected(bits, BlockSide::LEFT, BlockSide::TOP));
        assert!(faces_connected(bits, BlockSide::RIGHT, BlockSide::TOP));
        assert!(faces_connected(bits, BlockSide::TOP, BlockSide::BOTTOM));
        assert!(faces_connected(bits, BlockSide::FRONT, BlockSide::BACK));
    }

    #[test]
    fn vertical_tunnel_connects_top_and_bottom_only() {
        let mut chunk = Chunk::solid(Point3::new(0, 0, 0));
        for y in 0..CHUNK_DIMENSION {
            chunk.set_voxel(7, y, 7, 0).unwrap();
        }
        let bits = compute_visibility_bits(&chunk);
        assert_eq!(bits, pair_bit(BlockSide::TOP, BlockSide::BOTTOM));
    }

    #[test]
    fn single_face_pocket_sets_no_bits() {
        let mut chunk = Chunk::solid(Point3::new(0, 0, 0));
        chunk.set_voxel(5, 0, 5, 0).unwrap();
        chunk.set_voxel(5, 1, 5, 0).unwrap();
        assert_eq!(compute_visibility_bits(&chunk), 0);
    }

    #[test]
    fn corner_voxel_touches_three_faces() {
        let mut chunk = Chunk::solid(Point3::new(0, 0, 0));
        chunk.set_voxel(0, 0, 0, 0).unwrap();
        let expected = pair_bit(BlockSide::LEFT, BlockSide::BOTTOM)
            | pair_bit(BlockSide::LEFT, BlockSide::BACK)
            | pair_bit(BlockSide::BOTTOM, BlockSide::BACK);
        assert_eq!(compute_visibility_bits(&chunk), expected);
    }
}
