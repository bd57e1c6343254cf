//! Mesh generation and management for voxel rendering.
//!
//! This module handles the conversion of voxel data into GPU-friendly meshes and the
//! placement of those meshes in shared GPU buffers. The key goals are:
//! 1. Few vertices per chunk, via greedy meshing
//! 2. One vertex and one index buffer for every loaded chunk
//! 3. Draw parameters that map directly onto indexed draws
//!
//! # Architecture
//! - `mesh/`: the naive and greedy meshers and the [`Mesh`] they produce
//! - [`FreeList`]: offset-ordered allocations within one buffer
//! - [`GeometryArena`]: places, uploads and tracks each chunk's geometry
//! - `renderer`: turns geometry records into draw calls

mod free_list;
mod geometry_arena;
pub mod mesh;
mod renderer;

pub use free_list::{FreeList, FreeListEntry};
pub use geometry_arena::{
    ArenaError, GeometryArena, GeometryRecord, INDEX_BUFFER_NAME, VERTEX_BUFFER_NAME,
};
pub use mesh::{Face, Mesh, MesherKind};
pub use renderer::*;
