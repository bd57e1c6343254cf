//! Mesh data structures and operations for voxel rendering.
//!
//! A [`Mesh`] is the CPU-side output of a mesher: a flat vertex list in the shared
//! [`Vertex`] format plus 32-bit triangle-list indices.

use cgmath::Point3;

use crate::engine_state::{
    rendering::Vertex,
    voxels::{block::block_color, chunk::Chunk},
};

use super::{face::Face, greedy, naive};

/// Which meshing algorithm to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MesherKind {
    /// One unshared quad per exposed voxel face.
    Naive,
    /// Coplanar faces merged into maximal rectangles.
    #[default]
    Greedy,
}

/// Triangle geometry for one chunk.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Mesh {
    /// Interleaved vertex records
    pub vertices: Vec<Vertex>,
    /// Triangle-list indices into `vertices`
    pub indices: Vec<u32>,
    /// Number of faces emitted
    pub face_count: usize,
}

impl Mesh {
    /// Creates an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Meshes `chunk` with the requested algorithm.
    pub fn generate(chunk: &Chunk, kind: MesherKind) -> Self {
        match kind {
            MesherKind::Naive => naive::naive(chunk),
            MesherKind::Greedy => greedy::greedy(chunk),
        }
    }

    /// `true` when the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    fn face_vertices(face: &Face, world_origin: Point3<i32>) -> [Vertex; 4] {
        let color = block_color(face.block);
        let normal = face.block_side.normal();
        face.corners().map(|corner| {
            let world = Point3::new(
                (world_origin.x + corner.x) as f32,
                (world_origin.y + corner.y) as f32,
                (world_origin.z + corner.z) as f32,
            );
            Vertex::new(world, color, normal)
        })
    }

    /// Appends a face as four shared vertices and six indices.
    pub fn push_indexed_face(&mut self, face: &Face, world_origin: Point3<i32>) {
        let base = self.vertices.len() as u32;
        self.vertices.extend(Self::face_vertices(face, world_origin));
        self.indices
            .extend(face.triangle_corners().iter().map(|&corner| base + corner as u32));
        self.face_count += 1;
    }

    /// Appends a face as six unshared vertices with sequential indices.
    pub fn push_unindexed_face(&mut self, face: &Face, world_origin: Point3<i32>) {
        let corners = Self::face_vertices(face, world_origin);
        for corner in face.triangle_corners() {
            self.indices.push(self.vertices.len() as u32);
            self.vertices.push(corners[corner]);
        }
        self.face_count += 1;
    }

    /// Vertex data as raw bytes for upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index data as raw bytes for upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{InnerSpace, Vector3};

    use super::*;
    use crate::engine_state::voxels::block::block_side::BlockSide;

    fn triangle_normal(mesh: &Mesh, triangle: &[u32]) -> Vector3<f32> {
        let a = mesh.vertices[triangle[0] as usize].point();
        let b = mesh.vertices[triangle[1] as usize].point();
        let c = mesh.vertices[triangle[2] as usize].point();
        (b - a).cross(c - a)
    }

    #[test]
    fn triangles_face_along_the_vertex_normal() {
        for side in BlockSide::all() {
            for push in [Mesh::push_indexed_face, Mesh::push_unindexed_face] {
                let mut mesh = Mesh::new();
                push(&mut mesh, &Face::voxel(1, 1, 1, 1, side), Point3::new(16, 0, -16));

                for triangle in mesh.indices.chunks(3) {
                    let geometric = triangle_normal(&mesh, triangle);
                    let declared = Vector3::from(mesh.vertices[triangle[0] as usize].normal);
                    assert!(geometric.dot(declared) > 0.0, "{:?} is wound inwards", side);
                }
            }
        }
    }

    #[test]
    fn indexed_and_unindexed_vertex_counts() {
        let face = Face::voxel(0, 0, 0, 1, BlockSide::TOP);
        let mut indexed = Mesh::new();
        indexed.push_indexed_face(&face, Point3::new(0, 0, 0));
        indexed.push_indexed_face(&face, Point3::new(0, 0, 0));
        assert_eq!(indexed.vertices.len(), 8);
        assert_eq!(indexed.indices, vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);

        let mut unindexed = Mesh::new();
        unindexed.push_unindexed_face(&face, Point3::new(0, 0, 0));
        assert_eq!(unindexed.vertices.len(), 6);
        assert_eq!(unindexed.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(unindexed.vertex_bytes().len(), 6 * 36);
        assert_eq!(unindexed.index_bytes().len(), 6 * 4);
    }

    #[test]
    fn positions_are_offset_to_world_space() {
        let mut mesh = Mesh::new();
        mesh.push_indexed_face(&Face::voxel(0, 0, 0, 1, BlockSide::RIGHT), Point3::new(-16, 32, 0));
        assert_eq!(mesh.vertices[0].position, [-15.0, 32.0, 0.0]);
    }
}
