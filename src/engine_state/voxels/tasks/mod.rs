//! # Voxel Task System
//!
//! Background work for chunk streaming. Each task owns everything it needs (a copy of the
//! voxels or a shared terrain generator) and reports back through
//! [`WorkerMessage`](crate::engine_state::task_management::WorkerMessage)s, so the main
//! thread's world, arena and octree are never touched off-thread.
//!
//! - [`ChunkBuildTask`]: generate terrain, then mesh it
//! - [`ChunkMeshTask`]: mesh voxels that already exist (loaded from storage or edited)

mod chunk_build_task;
mod chunk_mesh_task;

pub use chunk_build_task::ChunkBuildTask;
pub use chunk_mesh_task::{mesh_chunk, ChunkMeshTask};
