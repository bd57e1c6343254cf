//! # Chunk Key Module
//!
//! Chunks are addressed by their integer position in chunk space. The key renders as
//! `"x,y,z"` for storage and log output and parses back to the same position.

use std::{fmt, str::FromStr};

use cgmath::{Point3, Vector3};

use crate::engine_state::voxels::block::block_side::BlockSide;

use super::CHUNK_DIMENSION;

/// Errors produced when parsing a chunk key string.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChunkKeyError {
    /// The key did not contain exactly three comma separated components.
    #[error("chunk key '{0}' must have exactly three components")]
    ComponentCount(String),
    /// One of the components was not an integer.
    #[error("chunk key component '{0}' is not an integer")]
    InvalidComponent(String),
}

/// Unique identifier of a chunk: its position in chunk coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    /// Chunk-space X coordinate.
    pub x: i32,
    /// Chunk-space Y coordinate.
    pub y: i32,
    /// Chunk-space Z coordinate.
    pub z: i32,
}

impl ChunkKey {
    /// Creates a key from chunk coordinates.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The chunk position as a point.
    pub fn position(&self) -> Point3<i32> {
        Point3::new(self.x, self.y, self.z)
    }

    /// Key of the chunk containing a world-space position.
    pub fn from_world_position(position: Point3<f32>) -> Self {
        let dimension = CHUNK_DIMENSION as f32;
        Self::new(
            (position.x / dimension).floor() as i32,
            (position.y / dimension).floor() as i32,
            (position.z / dimension).floor() as i32,
        )
    }

    /// Key of the chunk adjacent through `side`.
    pub fn neighbor(&self, side: BlockSide) -> Self {
        *self + side.offset()
    }

    /// Chebyshev distance in chunks.
    pub fn chebyshev_distance(&self, other: &ChunkKey) -> i32 {
        (self.x - other.x)
            .abs()
            .max((self.y - other.y).abs())
            .max((self.z - other.z).abs())
    }
}

impl From<Point3<i32>> for ChunkKey {
    fn from(position: Point3<i32>) -> Self {
        Self::new(position.x, position.y, position.z)
    }
}

impl std::ops::Add<Vector3<i32>> for ChunkKey {
    type Output = ChunkKey;

    fn add(self, offset: Vector3<i32>) -> Self::Output {
        ChunkKey::new(self.x + offset.x, self.y + offset.y, self.z + offset.z)
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

impl FromStr for ChunkKey {
    type Err = ChunkKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let components: Vec<&str> = s.split(',').collect();
        if components.len() != 3 {
            return Err(ChunkKeyError::ComponentCount(s.to_string()));
        }

        let mut coordinates = [0i32; 3];
        for (coordinate, component) in coordinates.iter_mut().zip(components) {
            *coordinate = component
                .trim()
                .parse()
                .map_err(|_| ChunkKeyError::InvalidComponent(component.to_string()))?;
        }

        Ok(Self::new(coordinates[0], coordinates[1], coordinates[2]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_string_round_trips() {
        let key = ChunkKey::new(-3, 0, 12);
        assert_eq!(key.to_string(), "-3,0,12");
        assert_eq!("-3,0,12".parse::<ChunkKey>(), Ok(key));
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert_eq!(
            "1,2".parse::<ChunkKey>(),
            Err(ChunkKeyError::ComponentCount("1,2".to_string()))
        );
        assert_eq!(
            "1,b,3".parse::<ChunkKey>(),
            Err(ChunkKeyError::InvalidComponent("b".to_string()))
        );
    }

    #[test]
    fn world_positions_floor_into_chunks() {
        assert_eq!(
            ChunkKey::from_world_position(Point3::new(-0.5, 15.9, 16.0)),
            ChunkKey::new(-1, 0, 1)
        );
    }

    #[test]
    fn neighbors_step_one_chunk() {
        let key = ChunkKey::new(0, 0, 0);
        assert_eq!(key.neighbor(BlockSide::LEFT), ChunkKey::new(-1, 0, 0));
        assert_eq!(key.neighbor(BlockSide::FRONT), ChunkKey::new(0, 0, 1));
        assert_eq!(key.chebyshev_distance(&ChunkKey::new(2, -5, 1)), 5);
    }
}
