//! # Voxel Data
//!
//! This module contains everything that describes the voxel world itself, independent of
//! how it is drawn.
//!
//! ## Architecture
//!
//! * **Block**: voxel material ids, colors and the six block sides
//! * **Chunk**: fixed-size 3D arrays of blocks, their keys and their face-pair connectivity
//! * **World**: the loaded chunks, addressable by world block position
//! * **Terrain**: generators that fill chunks that were never stored
//! * **Storage**: persistence of chunk voxel bytes
//! * **Tasks**: background generation and meshing
//!
//! ## Data Flow
//!
//! 1. A chunk comes into range and is loaded from storage or generated by a task
//! 2. Its voxels are meshed on a worker and its visibility bits computed
//! 3. The main thread keeps the voxels in the `World` and hands the mesh to the renderer
//! 4. Block edits mutate the `World` and queue a re-mesh of the touched chunk

pub mod block;
pub mod chunk;
pub mod storage;
pub mod tasks;
pub mod terrain;
pub mod world;
