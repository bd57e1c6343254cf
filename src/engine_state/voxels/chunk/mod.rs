//! # Chunk Module
//!
//! This module provides the `Chunk` struct, a fixed 16x16x16 grid of voxel bytes, along
//! with the chunk key type and the intra-chunk visibility computation.
//!
//! ## Storage
//!
//! Voxels are stored as one byte each in x-fastest order: `x + y * 16 + z * 16 * 16`.
//! A parallel `solid` bit vector mirrors `voxel != AIR` so solidity checks in the meshers
//! and the flood fill stay a single bit lookup.
//!
//! ## Boundary Policy
//!
//! Reads outside `[0, CHUNK_DIMENSION)` on any axis return air instead of failing. Meshers
//! therefore always emit faces at chunk edges; neighbouring chunks are not consulted.

use bitvec::prelude::BitVec;
use cgmath::Point3;

use crate::engine_state::culling::aabb::Aabb;

use super::block::{block_type::BlockType, is_solid, is_valid_block, BlockTypeSize, AIR};

pub mod chunk_key;
pub mod visibility;

pub use chunk_key::{ChunkKey, ChunkKeyError};

/// The dimension (width, height, depth) of a chunk in blocks.
pub const CHUNK_DIMENSION: i32 = 16;
/// The number of blocks in a single 2D plane of a chunk (CHUNK_DIMENSION²).
pub const CHUNK_PLANE_SIZE: i32 = CHUNK_DIMENSION * CHUNK_DIMENSION;
/// The total number of blocks in a chunk (CHUNK_DIMENSION³).
pub const CHUNK_SIZE: i32 = CHUNK_PLANE_SIZE * CHUNK_DIMENSION;
/// [`CHUNK_SIZE`] as a `usize`, the length of a chunk's voxel byte array.
pub const CHUNK_VOLUME: usize = CHUNK_SIZE as usize;

/// Errors raised by voxel writes and chunk deserialization.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VoxelError {
    /// The voxel coordinate lies outside the chunk.
    #[error("voxel ({x}, {y}, {z}) is outside the chunk")]
    OutOfBounds {
        /// Local X coordinate.
        x: i32,
        /// Local Y coordinate.
        y: i32,
        /// Local Z coordinate.
        z: i32,
    },
    /// The material id does not fit in 7 bits.
    #[error("block id {0} exceeds the 7-bit material range")]
    InvalidBlock(BlockTypeSize),
    /// A serialized chunk had the wrong length.
    #[error("chunk payload has {0} bytes, expected {CHUNK_VOLUME}")]
    InvalidLength(usize),
}

/// A 16x16x16 block of voxels at a fixed chunk position.
#[derive(Clone, Debug)]
pub struct Chunk {
    /// The position of this chunk in chunk coordinates (not block coordinates).
    pub position: Point3<i32>,
    voxels: Vec<BlockTypeSize>,
    solid: BitVec,
}

/// Flat array index of a local voxel coordinate, `None` when outside the chunk.
#[inline]
pub fn voxel_index(x: i32, y: i32, z: i32) -> Option<usize> {
    let range = 0..CHUNK_DIMENSION;
    if range.contains(&x) && range.contains(&y) && range.contains(&z) {
        Some((x + y * CHUNK_DIMENSION + z * CHUNK_PLANE_SIZE) as usize)
    } else {
        None
    }
}

impl Chunk {
    /// Creates a new, completely empty chunk (all blocks are air).
    pub fn empty(position: Point3<i32>) -> Self {
        Self::filled(position, AIR)
    }

    /// Creates a new chunk filled with solid blocks.
    pub fn solid(position: Point3<i32>) -> Self {
        Self::filled(position, BlockType::DIRT as BlockTypeSize)
    }

    fn filled(position: Point3<i32>, block: BlockTypeSize) -> Self {
        Self {
            position,
            voxels: vec![block; CHUNK_VOLUME],
            solid: BitVec::repeat(is_solid(block), CHUNK_VOLUME),
        }
    }

    /// Creates a new chunk with random blocks.
    ///
    /// `density` is the probability of a voxel being solid.
    pub fn random(position: Point3<i32>, density: f64) -> Self {
        let mut chunk = Self::empty(position);
        for index in 0..CHUNK_VOLUME {
            if fastrand::f64() < density {
                chunk.write_index(index, BlockType::get_random_type() as BlockTypeSize);
            }
        }
        chunk
    }

    /// Creates a new chunk with a 3D checkerboard pattern.
    pub fn checkerboard(position: Point3<i32>) -> Self {
        let mut chunk = Self::empty(position);
        for z in 0..CHUNK_DIMENSION {
            for y in 0..CHUNK_DIMENSION {
                for x in 0..CHUNK_DIMENSION {
                    if (x + y + z) % 2 == 0 {
                        chunk.fill(x, y, z, BlockType::DIRT as BlockTypeSize);
                    }
                }
            }
        }
        chunk
    }

    /// Builds a chunk from a raw voxel byte array (the storage format).
    pub fn from_voxels(position: Point3<i32>, voxels: Vec<BlockTypeSize>) -> Result<Self, VoxelError> {
        if voxels.len() != CHUNK_VOLUME {
            return Err(VoxelError::InvalidLength(voxels.len()));
        }
        if let Some(&invalid) = voxels.iter().find(|&&block| !is_valid_block(block)) {
            return Err(VoxelError::InvalidBlock(invalid));
        }

        let solid = voxels.iter().map(|&block| is_solid(block)).collect();
        Ok(Self {
            position,
            voxels,
            solid,
        })
    }

    /// The key of this chunk.
    pub fn key(&self) -> ChunkKey {
        ChunkKey::from(self.position)
    }

    /// Raw voxel bytes in storage order.
    pub fn voxels(&self) -> &[BlockTypeSize] {
        &self.voxels
    }

    /// Copies the voxel bytes out for persistence or transfer.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.voxels.clone()
    }

    /// World-space position of the chunk's minimum corner.
    pub fn world_origin(&self) -> Point3<i32> {
        Point3::new(
            self.position.x * CHUNK_DIMENSION,
            self.position.y * CHUNK_DIMENSION,
            self.position.z * CHUNK_DIMENSION,
        )
    }

    /// World-space bounds of the chunk.
    pub fn aabb(&self) -> Aabb {
        Aabb::from_chunk(self.key())
    }

    /// Gets the voxel at local coordinates, treating anything outside the chunk as air.
    pub fn get_voxel(&self, x: i32, y: i32, z: i32) -> BlockTypeSize {
        match voxel_index(x, y, z) {
            Some(index) => self.voxels[index],
            None => {
                log::warn!(
                    "Voxel read ({}, {}, {}) outside chunk {:?}, treating as air",
                    x,
                    y,
                    z,
                    self.position
                );
                AIR
            }
        }
    }

    /// Checks if the block at local coordinates is solid. Out of bounds is never solid.
    #[inline]
    pub fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
        voxel_index(x, y, z).is_some_and(|index| self.solid[index])
    }

    /// Checks solidity by flat index.
    #[inline]
    pub fn is_solid_index(&self, index: usize) -> bool {
        self.solid[index]
    }

    /// Writes a voxel at local coordinates.
    pub fn set_voxel(&mut self, x: i32, y: i32, z: i32, block: BlockTypeSize) -> Result<(), VoxelError> {
        if !is_valid_block(block) {
            return Err(VoxelError::InvalidBlock(block));
        }
        let index = voxel_index(x, y, z).ok_or(VoxelError::OutOfBounds { x, y, z })?;
        self.write_index(index, block);
        Ok(())
    }

    fn fill(&mut self, x: i32, y: i32, z: i32, block: BlockTypeSize) {
        if let Some(index) = voxel_index(x, y, z) {
            self.write_index(index, block);
        }
    }

    fn write_index(&mut self, index: usize, block: BlockTypeSize) {
        self.voxels[index] = block;
        self.solid.set(index, is_solid(block));
    }

    /// Number of solid voxels.
    pub fn solid_count(&self) -> usize {
        self.solid.count_ones()
    }

    /// `true` when every voxel is air.
    pub fn is_empty_chunk(&self) -> bool {
        self.solid.not_any()
    }

    /// `true` when every voxel is solid.
    pub fn is_full_chunk(&self) -> bool {
        self.solid.all()
    }
}
