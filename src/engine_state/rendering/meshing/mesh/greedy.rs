//! Greedy meshing implementation for voxel rendering.
//!
//! This module implements the greedy meshing algorithm which combines adjacent coplanar
//! faces of the same material into larger quads, significantly reducing the number of
//! vertices and indices needed to render a chunk.
//!
//! # Algorithm
//! For each axis `d` the chunk is swept one boundary plane at a time. Every plane gets a
//! 2D mask over the other two axes `(u, v)`: `+block` where the voxel behind the plane is
//! solid and the one in front is not, `-block` for the opposite case, `0` where both or
//! neither are solid. Maximal rectangles of equal mask values are then grown (first along
//! `u`, then along `v` while the full width still matches), emitted, and zeroed out.

use log::trace;
use web_time::Instant;

use crate::engine_state::voxels::{
    block::{block_side::BlockSide, is_solid, BlockTypeSize, AIR},
    chunk::{voxel_index, Chunk, CHUNK_DIMENSION},
};

use super::{face::Face, mesh::Mesh};

const N: i32 = CHUNK_DIMENSION;

fn voxel_at(chunk: &Chunk, position: [i32; 3]) -> BlockTypeSize {
    voxel_index(position[0], position[1], position[2]).map_or(AIR, |index| chunk.voxels()[index])
}

fn mask_value(behind: BlockTypeSize, in_front: BlockTypeSize) -> i8 {
    match (is_solid(behind), is_solid(in_front)) {
        (true, false) => behind as i8,
        (false, true) => -(in_front as i8),
        _ => 0,
    }
}

/// Sweeps the chunk and returns the merged rectangles.
pub fn greedy_faces(chunk: &Chunk) -> Vec<Face> {
    let mut faces = Vec::new();
    let mut mask = vec![0i8; (N * N) as usize];

    for d in 0..3 {
        let u = (d + 1) % 3;
        let v = (d + 2) % 3;
        let mut x = [0i32; 3];
        let mut q = [0i32; 3];
        q[d] = 1;

        x[d] = -1;
        while x[d] < N {
            let mut n = 0;
            for xv in 0..N {
                x[v] = xv;
                for xu in 0..N {
                    x[u] = xu;
                    let behind = voxel_at(chunk, x);
                    let in_front = voxel_at(chunk, [x[0] + q[0], x[1] + q[1], x[2] + q[2]]);
                    mask[n] = mask_value(behind, in_front);
                    n += 1;
                }
            }

            x[d] += 1;

            let mut n = 0usize;
            for j in 0..N {
                let mut i = 0;
                while i < N {
                    let value = mask[n];
                    if value == 0 {
                        i += 1;
                        n += 1;
                        continue;
                    }

                    let mut width = 1;
                    while i + width < N && mask[n + width as usize] == value {
                        width += 1;
                    }

                    let mut height = 1;
                    'grow: while j + height < N {
                        for k in 0..width {
                            if mask[n + (k + height * N) as usize] != value {
                                break 'grow;
                            }
                        }
                        height += 1;
                    }

                    let mut origin = x;
                    origin[u] = i;
                    origin[v] = j;
                    faces.push(Face {
                        origin: origin.into(),
                        width,
                        height,
                        block: value.unsigned_abs(),
                        block_side: BlockSide::from_axis(d, value > 0),
                    });

                    for l in 0..height {
                        for k in 0..width {
                            mask[n + (k + l * N) as usize] = 0;
                        }
                    }

                    i += width;
                    n += width as usize;
                }
            }
        }
    }

    faces
}

/// Builds a greedy mesh with four shared vertices and six indices per rectangle.
///
/// # Performance
/// Each of the three sweeps visits every boundary plane once, so the mask work is linear
/// in the number of voxels; rectangle growth only revisits cells it then zeroes.
pub fn greedy(chunk: &Chunk) -> Mesh {
    let start = Instant::now();
    let origin = chunk.world_origin();
    let mut mesh = Mesh::new();
    for face in greedy_faces(chunk) {
        mesh.push_indexed_face(&face, origin);
    }
    trace!(
        "Greedy meshed chunk {:?} into {} faces in {:?}",
        chunk.position,
        mesh.face_count,
        start.elapsed()
    );
    mesh
}
