//! # Terrain Generation
//!
//! Produces chunk voxel data for chunks that have never been stored. Generators are
//! shared across worker threads, so they must be `Send + Sync` and deterministic for a
//! given seed.
//!
//! ## Strategies
//!
//! - [`PerlinTerrain`]: a 2D fractal heightmap with grass, dirt, stone and snow layers,
//!   carved by 3D Perlin caves
//! - [`FlatTerrain`]: everything below a fixed height is one material
//! - [`PatternTerrain`]: the fixed test patterns (checkerboard, solid, empty)

use std::sync::Arc;

use cgmath::Point3;
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use super::{
    block::{block_type::BlockType, BlockTypeSize},
    chunk::{Chunk, ChunkKey, CHUNK_DIMENSION, CHUNK_VOLUME},
};

/// Above this cave sample the voxel is carved out.
pub const CAVE_THRESHOLD: f64 = 0.45;
/// Frequency of the cave noise.
pub const CAVE_SCALE_FACTOR: f64 = 0.06;
/// Frequency of the first heightmap octave.
pub const HEIGHT_SCALE_FACTOR: f64 = 0.01;
/// Terrain height at noise value zero, in blocks.
pub const BASE_HEIGHT: f64 = 24.0;
/// Largest deviation from [`BASE_HEIGHT`], in blocks.
pub const HEIGHT_AMPLITUDE: f64 = 20.0;
/// Surface blocks above this height are snow.
pub const SNOW_LINE: i32 = 38;
/// Surface blocks at or below this height are sand.
pub const SAND_LINE: i32 = 10;
/// Thickness of the dirt layer below the surface block.
pub const DIRT_DEPTH: i32 = 3;

const HEIGHT_OCTAVES: u32 = 4;

/// Something that can fill a chunk with voxels.
pub trait TerrainGenerator: Send + Sync {
    /// Generates the chunk at `key`.
    fn generate(&self, key: ChunkKey) -> Chunk;
}

/// Which generator to build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainKind {
    /// Heightmap terrain with caves.
    #[default]
    Perlin,
    /// A flat ground plane at y = 0.
    Flat,
    /// 3D checkerboard in every chunk.
    Checkerboard,
    /// Every chunk completely solid.
    Solid,
    /// Every chunk completely air.
    Empty,
}

/// Terrain settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Noise seed.
    pub seed: u32,
    /// Generator to use.
    pub kind: TerrainKind,
}

impl TerrainConfig {
    /// Builds the configured generator.
    pub fn build(&self) -> Arc<dyn TerrainGenerator> {
        match self.kind {
            TerrainKind::Perlin => Arc::new(PerlinTerrain::new(self.seed)),
            TerrainKind::Flat => Arc::new(FlatTerrain::new(0, BlockType::GRASS)),
            TerrainKind::Checkerboard => Arc::new(PatternTerrain::Checkerboard),
            TerrainKind::Solid => Arc::new(PatternTerrain::Solid),
            TerrainKind::Empty => Arc::new(PatternTerrain::Empty),
        }
    }
}

fn block_position(key: ChunkKey, x: i32, y: i32, z: i32) -> Point3<i32> {
    Point3::new(
        key.x * CHUNK_DIMENSION + x,
        key.y * CHUNK_DIMENSION + y,
        key.z * CHUNK_DIMENSION + z,
    )
}

/// Builds a chunk by asking `block_at` for every world block position.
fn fill_chunk(key: ChunkKey, mut block_at: impl FnMut(Point3<i32>) -> BlockType) -> Chunk {
    let mut voxels = Vec::with_capacity(CHUNK_VOLUME);
    for z in 0..CHUNK_DIMENSION {
        for y in 0..CHUNK_DIMENSION {
            for x in 0..CHUNK_DIMENSION {
                voxels.push(block_at(block_position(key, x, y, z)) as BlockTypeSize);
            }
        }
    }
    // Every BlockType id is valid and the length is exact.
    Chunk::from_voxels(key.position(), voxels).unwrap_or_else(|_| Chunk::empty(key.position()))
}

/// Heightmap terrain with caves.
pub struct PerlinTerrain {
    height_noise: Perlin,
    cave_noise: Perlin,
}

impl PerlinTerrain {
    /// Creates a generator for `seed`.
    pub fn new(seed: u32) -> Self {
        Self {
            height_noise: Perlin::new(seed),
            cave_noise: Perlin::new(seed.wrapping_add(1)),
        }
    }

    /// Surface height of the column at world `(x, z)`.
    pub fn surface_height(&self, x: i32, z: i32) -> i32 {
        let mut total = 0.0;
        let mut frequency = HEIGHT_SCALE_FACTOR;
        let mut amplitude = 1.0;
        let mut normalization = 0.0;
        for _ in 0..HEIGHT_OCTAVES {
            total += self.height_noise.get([x as f64 * frequency, z as f64 * frequency]) * amplitude;
            normalization += amplitude;
            frequency *= 2.0;
            amplitude *= 0.5;
        }
        (BASE_HEIGHT + HEIGHT_AMPLITUDE * total / normalization).floor() as i32
    }

    fn is_cave(&self, position: Point3<i32>) -> bool {
        let sample = self.cave_noise.get([
            position.x as f64 * CAVE_SCALE_FACTOR,
            position.y as f64 * CAVE_SCALE_FACTOR,
            position.z as f64 * CAVE_SCALE_FACTOR,
        ]);
        sample > CAVE_THRESHOLD
    }

    fn block_at(&self, position: Point3<i32>, surface: i32) -> BlockType {
        if position.y > surface || self.is_cave(position) {
            return BlockType::AIR;
        }
        let depth = surface - position.y;
        match depth {
            0 if surface > SNOW_LINE => BlockType::SNOW,
            0 if surface <= SAND_LINE => BlockType::SAND,
            0 => BlockType::GRASS,
            d if d <= DIRT_DEPTH => BlockType::DIRT,
            _ => BlockType::STONE,
        }
    }
}

impl TerrainGenerator for PerlinTerrain {
    fn generate(&self, key: ChunkKey) -> Chunk {
        let mut heights = [[0i32; CHUNK_DIMENSION as usize]; CHUNK_DIMENSION as usize];
        for (z, row) in heights.iter_mut().enumerate() {
            for (x, height) in row.iter_mut().enumerate() {
                let world = block_position(key, x as i32, 0, z as i32);
                *height = self.surface_height(world.x, world.z);
            }
        }

        let origin = block_position(key, 0, 0, 0);
        fill_chunk(key, |position| {
            let x = (position.x - origin.x) as usize;
            let z = (position.z - origin.z) as usize;
            self.block_at(position, heights[z][x])
        })
    }
}

/// Ground of a single material below a fixed height.
pub struct FlatTerrain {
    height: i32,
    block: BlockType,
}

impl FlatTerrain {
    /// Blocks with `y < height` are `block`, everything above is air.
    pub fn new(height: i32, block: BlockType) -> Self {
        Self { height, block }
    }
}

impl TerrainGenerator for FlatTerrain {
    fn generate(&self, key: ChunkKey) -> Chunk {
        fill_chunk(key, |position| {
            if position.y < self.height {
                self.block
            } else {
                BlockType::AIR
            }
        })
    }
}

/// Fixed per-chunk patterns for testing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatternTerrain {
    /// 3D checkerboard.
    Checkerboard,
    /// All solid.
    Solid,
    /// All air.
    Empty,
}

impl TerrainGenerator for PatternTerrain {
    fn generate(&self, key: ChunkKey) -> Chunk {
        match self {
            PatternTerrain::Checkerboard => Chunk::checkerboard(key.position()),
            PatternTerrain::Solid => Chunk::solid(key.position()),
            PatternTerrain::Empty => Chunk::empty(key.position()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perlin_terrain_is_deterministic() {
        let a = PerlinTerrain::new(5).generate(ChunkKey::new(1, 1, -2));
        let b = PerlinTerrain::new(5).generate(ChunkKey::new(1, 1, -2));
        assert_eq!(a.voxels(), b.voxels());
    }

    #[test]
    fn perlin_terrain_is_air_high_up_and_solid_deep_down() {
        let terrain = PerlinTerrain::new(1);
        assert!(terrain.generate(ChunkKey::new(0, 10, 0)).is_empty_chunk());
        let deep = terrain.generate(ChunkKey::new(0, -10, 0));
        assert!(deep.solid_count() > CHUNK_VOLUME / 2);
    }

    #[test]
    fn surface_stays_within_amplitude() {
        let terrain = PerlinTerrain::new(9);
        for x in (-200..200).step_by(17) {
            for z in (-200..200).step_by(23) {
                let height = terrain.surface_height(x, z) as f64;
                assert!(height >= BASE_HEIGHT - HEIGHT_AMPLITUDE - 1.0);
                assert!(height <= BASE_HEIGHT + HEIGHT_AMPLITUDE);
            }
        }
    }

    #[test]
    fn flat_terrain_splits_at_height() {
        let terrain = FlatTerrain::new(4, BlockType::STONE);
        let chunk = terrain.generate(ChunkKey::new(0, 0, 0));
        assert!(chunk.is_solid(0, 3, 0));
        assert!(!chunk.is_solid(0, 4, 0));
        assert_eq!(chunk.solid_count(), 4 * 16 * 16);
        assert!(terrain.generate(ChunkKey::new(0, -1, 0)).is_full_chunk());
    }

    #[test]
    fn config_builds_the_requested_generator() {
        let config = TerrainConfig {
            seed: 0,
            kind: TerrainKind::Solid,
        };
        assert!(config.build().generate(ChunkKey::new(3, 3, 3)).is_full_chunk());
    }
}
