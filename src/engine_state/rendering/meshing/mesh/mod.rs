//! Mesh generation for voxel rendering.
//!
//! This module converts chunk voxel data into GPU-friendly triangle lists. Two meshers
//! share one output format:
//!
//! # Architecture
//! - [`Mesh`]: vertices and indices for one chunk
//! - [`Face`]: a rectangle of merged voxel faces, the unit both meshers emit
//! - [`naive`]: one unshared quad per exposed face, the reference output
//! - [`greedy`]: coplanar faces of one material merged into maximal rectangles
//!
//! # Usage
//! ```ignore
//! use voxel_world::engine_state::{
//!     rendering::meshing::mesh::{Mesh, MesherKind},
//!     voxels::chunk::Chunk,
//! };
//! use cgmath::Point3;
//!
//! let chunk = Chunk::solid(Point3::new(0, 0, 0));
//! let mesh = Mesh::generate(&chunk, MesherKind::Greedy);
//! assert_eq!(mesh.face_count, 6);
//! ```

mod face;
mod greedy;
mod mesh;
mod naive;

pub use face::Face;
pub use greedy::{greedy, greedy_faces};
pub use mesh::*;
pub use naive::{naive, naive_faces};
