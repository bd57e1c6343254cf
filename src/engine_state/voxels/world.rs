//! # World Module
//!
//! This module provides the `World` struct which holds every loaded chunk's voxel data.
//!
//! ## Architecture
//!
//! The world uses a sparse storage approach where only chunks near the camera are kept in
//! memory. It is owned and mutated by the main thread only; workers receive copies of the
//! voxel bytes they need and send new data back as messages.
//!
//! Block coordinates are split into a chunk key and a local coordinate with Euclidean
//! division, so block `-1` lives in chunk `-1` at local `15`.

use std::collections::HashMap;

use cgmath::Point3;

use super::{
    block::{BlockTypeSize, AIR},
    chunk::{Chunk, ChunkKey, VoxelError, CHUNK_DIMENSION},
};

/// Errors raised by block edits.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WorldError {
    /// The block's chunk is not loaded.
    #[error("chunk {0} is not loaded")]
    ChunkNotLoaded(ChunkKey),
    /// The chunk refused the write.
    #[error(transparent)]
    Voxel(#[from] VoxelError),
}

/// Splits a world block position into its chunk and the local coordinate inside it.
pub fn split_block_position(position: Point3<i32>) -> (ChunkKey, Point3<i32>) {
    let key = ChunkKey::new(
        position.x.div_euclid(CHUNK_DIMENSION),
        position.y.div_euclid(CHUNK_DIMENSION),
        position.z.div_euclid(CHUNK_DIMENSION),
    );
    let local = Point3::new(
        position.x.rem_euclid(CHUNK_DIMENSION),
        position.y.rem_euclid(CHUNK_DIMENSION),
        position.z.rem_euclid(CHUNK_DIMENSION),
    );
    (key, local)
}

/// The loaded voxel world.
#[derive(Debug, Default)]
pub struct World {
    chunks: HashMap<ChunkKey, Chunk>,
}

impl World {
    /// Creates a new, empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a chunk under its own key, returning the chunk it replaced.
    pub fn insert_chunk(&mut self, chunk: Chunk) -> Option<Chunk> {
        self.chunks.insert(chunk.key(), chunk)
    }

    /// Drops a chunk from memory.
    pub fn remove_chunk(&mut self, key: &ChunkKey) -> Option<Chunk> {
        self.chunks.remove(key)
    }

    /// Retrieves the chunk at `key`.
    pub fn get_chunk(&self, key: &ChunkKey) -> Option<&Chunk> {
        self.chunks.get(key)
    }

    /// `true` when the chunk is loaded.
    pub fn contains(&self, key: &ChunkKey) -> bool {
        self.chunks.contains_key(key)
    }

    /// Keys of every loaded chunk.
    pub fn keys(&self) -> impl Iterator<Item = &ChunkKey> {
        self.chunks.keys()
    }

    /// Number of loaded chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// `true` when no chunk is loaded.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The block at a world block position. Unloaded chunks read as air.
    pub fn get_block(&self, position: Point3<i32>) -> BlockTypeSize {
        let (key, local) = split_block_position(position);
        self.chunks
            .get(&key)
            .map_or(AIR, |chunk| chunk.get_voxel(local.x, local.y, local.z))
    }

    /// Writes a block and returns the chunk that changed.
    pub fn set_block(&mut self, position: Point3<i32>, block: BlockTypeSize) -> Result<ChunkKey, WorldError> {
        let (key, local) = split_block_position(position);
        let chunk = self.chunks.get_mut(&key).ok_or(WorldError::ChunkNotLoaded(key))?;
        chunk.set_voxel(local.x, local.y, local.z, block)?;
        Ok(key)
    }
}
