//! # Task System Core Types
//!
//! This module defines the unit of background work and the messages workers send back.
//!
//! ## Task Lifecycle
//! 1. A `Task` is created and scheduled via `TaskManager::publish_task()`
//! 2. The task's `process()` method is called on a worker thread
//! 3. The task returns zero or more [`WorkerMessage`]s
//! 4. The main thread drains the messages with `TaskManager::drain_completed()` and
//!    applies them in arrival order
//!
//! ## Thread Safety
//! - `Task` must be `Send` to be transferred between threads
//! - Messages own all their data, so nothing is shared with the main thread

use crate::engine_state::{
    rendering::meshing::Mesh,
    voxels::chunk::{visibility::VisibilityBits, ChunkKey},
};

/// A unit of work that runs on a worker thread.
pub trait Task: Send {
    /// Runs the task and returns the messages it produced.
    fn process(&self) -> Vec<WorkerMessage>;
}

/// A result sent from a worker to the main thread.
///
/// Messages for the same chunk may arrive out of order relative to other chunks, and a
/// message may arrive for a chunk that has since been unloaded. Chunk results carry the
/// ticket of the request that produced them so the main thread can drop superseded ones.
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    /// Voxel data for a chunk is ready.
    ChunkDataAvailable {
        /// The chunk.
        position: ChunkKey,
        /// Ticket of the request this answers.
        ticket: u64,
        /// Raw voxel bytes, `CHUNK_VOLUME` long.
        voxels: Vec<u8>,
    },
    /// A chunk has new geometry.
    ChunkMeshUpdated {
        /// The chunk.
        position: ChunkKey,
        /// Ticket of the request this answers.
        ticket: u64,
        /// The generated mesh, in world space.
        mesh: Mesh,
        /// Face-pair connectivity of the chunk.
        visibility_bits: VisibilityBits,
    },
    /// These chunks should be unloaded.
    ChunksToUnload {
        /// The chunks.
        keys: Vec<ChunkKey>,
    },
}

impl WorkerMessage {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerMessage::ChunkDataAvailable { .. } => "chunk_data_available",
            WorkerMessage::ChunkMeshUpdated { .. } => "chunk_mesh_updated",
            WorkerMessage::ChunksToUnload { .. } => "chunks_to_unload",
        }
    }
}
