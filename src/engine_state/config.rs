//! # Engine Configuration
//!
//! Tunables for chunk streaming, geometry arenas, culling and terrain. Every field has a
//! default, so a JSON file only needs the values it changes:
//!
//! ```json
//! { "render_distance": 6, "culling": "visibility_walk", "terrain": { "seed": 42 } }
//! ```

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::engine_state::{
    culling::{
        frustum::DEFAULT_FRUSTUM_EPSILON,
        octree::{DEFAULT_OCTREE_LEVELS, MAX_OCTREE_LEVELS},
        FrustumTestMode,
    },
    rendering::{meshing::MesherKind, INDEX_STRIDE, VERTEX_STRIDE},
    voxels::terrain::TerrainConfig,
};

/// Errors raised while loading or validating a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid configuration JSON.
    #[error("could not parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// An arena would have no room.
    #[error("{0} arena size must be greater than zero")]
    EmptyArena(&'static str),
    /// An arena size is not a whole number of elements.
    #[error("{name} arena size {size} is not a multiple of {stride}")]
    UnalignedArena {
        /// `"vertex"` or `"index"`.
        name: &'static str,
        /// Configured size in bytes.
        size: u64,
        /// Element size in bytes.
        stride: u64,
    },
    /// Too many octree levels.
    #[error("octree_levels {0} exceeds the maximum of {MAX_OCTREE_LEVELS}")]
    OctreeLevels(u32),
    /// Negative render distance.
    #[error("render_distance {0} must not be negative")]
    RenderDistance(i32),
}

/// Which visible-set algorithm runs each frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CullingMode {
    /// Frustum test against the octree.
    #[default]
    Octree,
    /// Neighbour flood through connected chunk faces, frustum tested.
    VisibilityWalk,
}

/// Engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Chebyshev radius, in chunks, of the loaded cube around the camera
    pub render_distance: i32,
    /// Level of the octree roots
    pub octree_levels: u32,
    /// Size of the shared vertex buffer in bytes
    pub vertex_arena_bytes: u64,
    /// Size of the shared index buffer in bytes
    pub index_arena_bytes: u64,
    /// Background workers; zero runs chunk tasks inline
    pub num_workers: usize,
    /// Visible-set algorithm
    pub culling: CullingMode,
    /// Where the visibility walk applies its frustum test
    pub walk_frustum_test: FrustumTestMode,
    /// Tolerance of the frustum plane test
    pub frustum_epsilon: f32,
    /// Terrain generator settings
    pub terrain: TerrainConfig,
    /// Meshing algorithm
    pub mesher: MesherKind,
    /// Chunks kept by the in-memory store
    pub store_capacity: usize,
    /// Directory for on-disk chunk storage; in-memory when unset
    pub store_directory: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            render_distance: 4,
            octree_levels: DEFAULT_OCTREE_LEVELS,
            vertex_arena_bytes: 4 * 1024 * 1024 * VERTEX_STRIDE,
            index_arena_bytes: 6 * 1024 * 1024 * INDEX_STRIDE,
            num_workers: default_num_workers(),
            culling: CullingMode::default(),
            walk_frustum_test: FrustumTestMode::default(),
            frustum_epsilon: DEFAULT_FRUSTUM_EPSILON,
            terrain: TerrainConfig::default(),
            mesher: MesherKind::default(),
            store_capacity: 4096,
            store_directory: None,
        }
    }
}

/// One worker per core, leaving one for the main thread.
fn default_num_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1).max(1))
        .unwrap_or(1)
}

impl EngineConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Checks that the values can run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.render_distance < 0 {
            return Err(ConfigError::RenderDistance(self.render_distance));
        }
        if self.octree_levels > MAX_OCTREE_LEVELS {
            return Err(ConfigError::OctreeLevels(self.octree_levels));
        }
        for (name, size, stride) in [
            ("vertex", self.vertex_arena_bytes, VERTEX_STRIDE),
            ("index", self.index_arena_bytes, INDEX_STRIDE),
        ] {
            if size == 0 {
                return Err(ConfigError::EmptyArena(name));
            }
            if size % stride != 0 || size % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
                return Err(ConfigError::UnalignedArena { name, size, stride });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::terrain::TerrainKind;

    #[test]
    fn defaults_are_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{ "render_distance": 6, "culling": "visibility_walk", "terrain": { "kind": "flat" } }"#,
        )
        .unwrap();
        assert_eq!(config.render_distance, 6);
        assert_eq!(config.culling, CullingMode::VisibilityWalk);
        assert_eq!(config.terrain.kind, TerrainKind::Flat);
        assert_eq!(config.terrain.seed, 0);
        assert_eq!(config.octree_levels, DEFAULT_OCTREE_LEVELS);
        assert_eq!(config.walk_frustum_test, FrustumTestMode::BeforeEnqueue);
        assert_eq!(config.frustum_epsilon, DEFAULT_FRUSTUM_EPSILON);
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "octree_levels": 21 }"#),
            Err(ConfigError::OctreeLevels(21))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "vertex_arena_bytes": 0 }"#),
            Err(ConfigError::EmptyArena("vertex"))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "vertex_arena_bytes": 40 }"#),
            Err(ConfigError::UnalignedArena { name: "vertex", .. })
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "render_distance": -1 }"#),
            Err(ConfigError::RenderDistance(-1))
        ));
        assert!(matches!(EngineConfig::from_json_str("{"), Err(ConfigError::Parse(_))));
    }
}
