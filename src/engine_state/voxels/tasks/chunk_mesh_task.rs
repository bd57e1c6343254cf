//! # Chunk Mesh Task
//!
//! Meshes an existing chunk and computes its visibility bits.

use log::trace;
use web_time::Instant;

use crate::engine_state::{
    rendering::meshing::{Mesh, MesherKind},
    task_management::{Task, WorkerMessage},
    voxels::chunk::{visibility::compute_visibility_bits, Chunk},
};

/// Builds the `ChunkMeshUpdated` message for `chunk`, answering request `ticket`.
pub fn mesh_chunk(chunk: &Chunk, ticket: u64, mesher: MesherKind) -> WorkerMessage {
    let start = Instant::now();
    let mesh = Mesh::generate(chunk, mesher);
    let visibility_bits = compute_visibility_bits(chunk);
    trace!(
        "Meshed chunk {} ({} faces, bits {:#06x}) in {:?}",
        chunk.key(),
        mesh.face_count,
        visibility_bits,
        start.elapsed()
    );
    WorkerMessage::ChunkMeshUpdated {
        position: chunk.key(),
        ticket,
        mesh,
        visibility_bits,
    }
}

/// Re-meshes a chunk whose voxels the main thread already has.
pub struct ChunkMeshTask {
    chunk: Chunk,
    ticket: u64,
    mesher: MesherKind,
}

impl ChunkMeshTask {
    /// Creates a task meshing a copy of `chunk` for request `ticket`.
    pub fn new(chunk: Chunk, ticket: u64, mesher: MesherKind) -> Self {
        Self { chunk, ticket, mesher }
    }
}

impl Task for ChunkMeshTask {
    fn process(&self) -> Vec<WorkerMessage> {
        vec![mesh_chunk(&self.chunk, self.ticket, self.mesher)]
    }
}
