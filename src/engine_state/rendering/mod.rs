//! Rendering-side data for the voxel engine.
//!
//! This module contains everything between a chunk's voxels and a draw call: the shared
//! vertex format, the meshers, and the arena that packs chunk geometry into shared GPU
//! buffers. Pipelines and shaders are owned by the embedding application.

pub mod meshing;
pub mod vertex;

// Re-export commonly used types
pub use vertex::{Vertex, INDEX_STRIDE, VERTEX_STRIDE};
