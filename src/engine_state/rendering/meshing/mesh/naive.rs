//! Reference mesher: one quad per exposed voxel face, no vertex sharing.

use crate::engine_state::voxels::{
    block::block_side::BlockSide,
    chunk::{Chunk, CHUNK_DIMENSION},
};

use super::{face::Face, mesh::Mesh};

/// Collects every voxel face whose neighbour is not solid.
///
/// Neighbours outside the chunk count as air, so the chunk border is always meshed.
pub fn naive_faces(chunk: &Chunk) -> Vec<Face> {
    let mut faces = Vec::new();
    for z in 0..CHUNK_DIMENSION {
        for y in 0..CHUNK_DIMENSION {
            for x in 0..CHUNK_DIMENSION {
                if !chunk.is_solid(x, y, z) {
                    continue;
                }
                let block = chunk.get_voxel(x, y, z);
                for side in BlockSide::all() {
                    let step = side.offset();
                    if !chunk.is_solid(x + step.x, y + step.y, z + step.z) {
                        faces.push(Face::voxel(x, y, z, block, side));
                    }
                }
            }
        }
    }
    faces
}

/// Builds a mesh with six unshared vertices per exposed face.
pub fn naive(chunk: &Chunk) -> Mesh {
    let origin = chunk.world_origin();
    let mut mesh = Mesh::new();
    for face in naive_faces(chunk) {
        mesh.push_unindexed_face(&face, origin);
    }
    mesh
}
