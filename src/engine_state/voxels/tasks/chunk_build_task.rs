//! # Chunk Build Task
//!
//! Generates a chunk that has no stored data, then meshes it. Both results are sent
//! back: the voxels so the main thread can keep and persist them, and the mesh for the
//! arena.

use std::sync::Arc;

use crate::engine_state::{
    rendering::meshing::MesherKind,
    task_management::{Task, WorkerMessage},
    voxels::{chunk::ChunkKey, terrain::TerrainGenerator},
};

use super::chunk_mesh_task::mesh_chunk;

/// Generates and meshes the chunk at one position.
pub struct ChunkBuildTask {
    position: ChunkKey,
    ticket: u64,
    generator: Arc<dyn TerrainGenerator>,
    mesher: MesherKind,
}

impl ChunkBuildTask {
    /// Creates a build task for `position`, answering request `ticket`.
    pub fn new(
        position: ChunkKey,
        ticket: u64,
        generator: Arc<dyn TerrainGenerator>,
        mesher: MesherKind,
    ) -> Self {
        Self {
            position,
            ticket,
            generator,
            mesher,
        }
    }
}

impl Task for ChunkBuildTask {
    fn process(&self) -> Vec<WorkerMessage> {
        let chunk = self.generator.generate(self.position);
        let mesh = mesh_chunk(&chunk, self.ticket, self.mesher);
        vec![
            WorkerMessage::ChunkDataAvailable {
                position: self.position,
                ticket: self.ticket,
                voxels: chunk.to_bytes(),
            },
            mesh,
        ]
    }
}
