//! # Engine State Module
//!
//! The core engine module that ties chunk streaming, meshing, geometry placement and
//! culling together into a per-frame update.
//!
//! ## Key Components
//!
//! * `EngineState` - The main state container for the engine
//! * `buffer_state` - The GPU backend seam and its host and wgpu implementations
//! * `camera_state` - Camera position, projection and uniform upload
//! * `chunk_manager` - Keeps world, geometry arena and octree consistent
//! * `config` - Engine settings loaded from JSON
//! * `culling` - Bounding boxes, frustum planes, the octree and the visibility walk
//! * `rendering` - Vertex format, meshers, the geometry arena and draw submission
//! * `task_management` - Worker threads for chunk generation and meshing
//! * `voxels` - Voxel data, chunks, terrain, storage and the world
//!
//! ## Frame
//!
//! Each call to [`EngineState::tick`]:
//! 1. Uploads the camera and, when the camera changed chunk, restreams the region around it
//! 2. Hands new chunk tasks to the workers
//! 3. Applies every finished worker message
//! 4. Culls and writes the indirect draw list for the visible chunks

use log::{debug, info, warn};
use wgpu::{util::DrawIndexedIndirectArgs, BufferUsages};

use camera_state::{Camera, CameraState, Projection};
use chunk_manager::{ApplyOutcome, ChunkManager};
use config::EngineConfig;
use rendering::meshing::indirect_bytes;
use task_management::{TaskManager, WorkerMessage};
use voxels::{
    chunk::ChunkKey,
    storage::{ChunkPersistence, MemoryChunkStore},
};

use self::buffer_state::GpuBackend;

pub mod buffer_state;
pub mod camera_state;
pub mod chunk_manager;
pub mod config;
pub mod culling;
pub mod rendering;
pub mod task_management;
pub mod voxels;

/// Name of the buffer holding the per-frame indirect draw arguments.
pub const INDIRECT_BUFFER_NAME: &str = "Chunk Draw Indirect";

/// Size of one indexed indirect draw in bytes.
const INDIRECT_ARGS_SIZE: u64 = std::mem::size_of::<DrawIndexedIndirectArgs>() as u64;

/// What happened during one frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    /// Worker messages applied
    pub messages_applied: usize,
    /// Worker messages dropped because their chunk was no longer wanted
    pub messages_discarded: usize,
    /// Chunks whose geometry the arena refused
    pub chunks_rejected: usize,
    /// Chunks unloaded
    pub chunks_unloaded: usize,
    /// Chunks with voxel data in memory
    pub chunks_loaded: usize,
    /// Chunks with geometry in the arena
    pub chunks_meshed: usize,
    /// Chunks waiting on a worker
    pub chunks_in_flight: usize,
    /// Chunks returned by culling
    pub chunks_visible: usize,
    /// Indexed draws in the draw list
    pub draws: usize,
    /// Indices across all draws
    pub indices: u64,
}

/// Builds the chunk persistence described by `config`.
///
/// An unusable store directory falls back to in-memory storage.
pub fn persistence_from_config(config: &EngineConfig) -> ChunkPersistence {
    #[cfg(not(target_family = "wasm"))]
    if let Some(directory) = &config.store_directory {
        match voxels::storage::FileChunkStore::new(directory) {
            Ok(store) => {
                info!("Persisting chunks to {}", directory);
                return ChunkPersistence::new(Box::new(store));
            }
            Err(err) => warn!("Chunk directory {} unusable ({}), keeping chunks in memory", directory, err),
        }
    }
    ChunkPersistence::new(Box::new(MemoryChunkStore::new(config.store_capacity)))
}

/// The main state container for the voxel engine.
///
/// # Examples
///
/// ```ignore
/// let mut engine_state = EngineState::new(config, BufferState::new(), camera, projection);
///
/// // Main loop
/// loop {
///     engine_state.camera_state.camera.translate(movement);
///     let stats = engine_state.tick();
///     draw_indirect(engine_state.draw_list());
/// }
/// ```
pub struct EngineState<B: GpuBackend> {
    /// Active configuration
    pub config: EngineConfig,
    /// Camera position, projection and uniform
    pub camera_state: CameraState,
    /// Worker pool for chunk tasks
    pub task_manager: TaskManager,
    /// World, geometry and spatial index
    pub chunk_manager: ChunkManager,
    /// Where buffers live
    pub backend: B,
    draw_list: Vec<DrawIndexedIndirectArgs>,
    streamed_once: bool,
}

impl<B: GpuBackend> EngineState<B> {
    /// Creates every subsystem and the shared buffers on `backend`.
    pub fn new(config: EngineConfig, mut backend: B, camera: Camera, projection: Projection) -> Self {
        let chunk_manager = ChunkManager::new(&config, persistence_from_config(&config));
        chunk_manager.create_buffers(&mut backend);

        let side = (2 * config.render_distance + 1) as u64;
        backend.create_buffer(
            INDIRECT_BUFFER_NAME,
            side * side * side * INDIRECT_ARGS_SIZE,
            BufferUsages::INDIRECT | BufferUsages::COPY_DST,
        );

        let camera_state = CameraState::new(&mut backend, camera, projection);
        info!(
            "Engine ready: render distance {}, {} workers, {:?} culling",
            config.render_distance, config.num_workers, config.culling
        );

        Self {
            task_manager: TaskManager::new(config.num_workers),
            config,
            camera_state,
            chunk_manager,
            backend,
            draw_list: Vec::new(),
            streamed_once: false,
        }
    }

    /// The draw list produced by the last tick, in near-to-far or walk order.
    pub fn draw_list(&self) -> &[DrawIndexedIndirectArgs] {
        &self.draw_list
    }

    /// Runs one frame.
    pub fn tick(&mut self) -> FrameStats {
        let mut stats = FrameStats::default();

        let moved_to = match self.camera_state.sync(&mut self.backend) {
            Ok(moved_to) => moved_to,
            Err(err) => {
                warn!("Camera upload failed: {}", err);
                None
            }
        };
        let center = match moved_to {
            Some(center) => Some(center),
            None if !self.streamed_once => Some(self.camera_state.camera.chunk_key()),
            None => None,
        };
        if let Some(center) = center {
            self.streamed_once = true;
            let keys = self.chunk_manager.stream_around(center);
            if !keys.is_empty() {
                self.apply(WorkerMessage::ChunksToUnload { keys }, &mut stats);
            }
        }

        for task in self.chunk_manager.take_tasks() {
            self.task_manager.publish_task(task);
        }
        self.task_manager.process_queued_tasks();
        for message in self.task_manager.drain_completed() {
            self.apply(message, &mut stats);
        }
        for task in self.chunk_manager.take_tasks() {
            self.task_manager.publish_task(task);
        }

        self.cull(&mut stats);

        stats.chunks_loaded = self.chunk_manager.world().len();
        stats.chunks_meshed = self.chunk_manager.arena().len();
        stats.chunks_in_flight = self.chunk_manager.in_flight_len();
        stats
    }

    fn apply(&mut self, message: WorkerMessage, stats: &mut FrameStats) {
        match self.chunk_manager.apply_message(&mut self.backend, message) {
            ApplyOutcome::Discarded(_) => stats.messages_discarded += 1,
            ApplyOutcome::Rejected(_) => {
                stats.messages_applied += 1;
                stats.chunks_rejected += 1;
            }
            ApplyOutcome::Unloaded(count) => {
                stats.messages_applied += 1;
                stats.chunks_unloaded += count;
            }
            ApplyOutcome::Loaded(_) | ApplyOutcome::Meshed(_) => stats.messages_applied += 1,
        }
    }

    fn cull(&mut self, stats: &mut FrameStats) {
        let frustum = self.camera_state.frustum(self.config.frustum_epsilon);
        let visible = self
            .chunk_manager
            .visible_chunks(&frustum, self.camera_state.camera.position);
        self.draw_list = self.chunk_manager.draw_list(&visible);

        let bytes = indirect_bytes(&self.draw_list);
        if !bytes.is_empty() {
            if let Err(err) = self.backend.write_buffer(INDIRECT_BUFFER_NAME, 0, &bytes) {
                warn!("Indirect draw upload failed: {}", err);
            }
        }

        stats.chunks_visible = visible.len();
        stats.draws = self.draw_list.len();
        stats.indices = self.draw_list.iter().map(|args| args.index_count as u64).sum();
        debug!(
            "Visible {} chunks, {} draws, {} indices",
            stats.chunks_visible, stats.draws, stats.indices
        );
    }

    /// Edits a block at a world block position and queues the re-mesh.
    pub fn set_voxel(
        &mut self,
        position: cgmath::Point3<i32>,
        block: voxels::block::BlockTypeSize,
    ) -> Result<ChunkKey, voxels::world::WorldError> {
        self.chunk_manager.set_voxel(position, block)
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, Point3, Vector3};

    use super::*;
    use crate::engine_state::{buffer_state::BufferState, voxels::terrain::TerrainKind};

    fn engine(terrain: TerrainKind) -> EngineState<BufferState> {
        let mut config = EngineConfig {
            render_distance: 1,
            num_workers: 0,
            vertex_arena_bytes: 1 << 22,
            index_arena_bytes: 1 << 21,
            ..EngineConfig::default()
        };
        config.terrain.kind = terrain;
        let camera = Camera::new(Point3::new(8.0, 8.0, 8.0), Deg(0.0), Deg(0.0));
        let projection = Projection::new(800, 600, Deg(70.0), 0.1, 200.0);
        EngineState::new(config, BufferState::new(), camera, projection)
    }

    #[test]
    fn first_tick_streams_meshes_and_draws() {
        let mut engine = engine(TerrainKind::Solid);
        let stats = engine.tick();

        assert_eq!(stats.chunks_loaded, 27);
        assert_eq!(stats.chunks_meshed, 27);
        assert_eq!(stats.chunks_in_flight, 0);
        assert_eq!(stats.messages_applied, 54);
        assert!(stats.chunks_visible > 0 && stats.chunks_visible < 27);
        assert_eq!(stats.draws, stats.chunks_visible);

        let written = engine.backend.analytics(INDIRECT_BUFFER_NAME).unwrap();
        assert_eq!(written.used_memory, stats.draws as u64 * INDIRECT_ARGS_SIZE);
    }

    #[test]
    fn moving_a_chunk_unloads_a_slice() {
        let mut engine = engine(TerrainKind::Solid);
        engine.tick();
        engine.camera_state.camera.translate(Vector3::new(16.0, 0.0, 0.0));
        let stats = engine.tick();

        assert_eq!(stats.chunks_unloaded, 9);
        assert_eq!(stats.chunks_loaded, 27);
        assert!(!engine.chunk_manager.world().contains(&ChunkKey::new(-1, 0, 0)));
        assert!(engine.chunk_manager.world().contains(&ChunkKey::new(2, 0, 0)));
    }

    #[test]
    fn culling_uses_the_default_frustum_tolerance() {
        let engine = engine(TerrainKind::Empty);
        let frustum = engine.camera_state.frustum(engine.config.frustum_epsilon);
        assert_eq!(
            frustum.epsilon(),
            crate::engine_state::culling::frustum::DEFAULT_FRUSTUM_EPSILON
        );
    }

    #[test]
    fn idle_ticks_do_no_work() {
        let mut engine = engine(TerrainKind::Flat);
        engine.tick();
        let stats = engine.tick();
        assert_eq!(stats.messages_applied, 0);
        assert_eq!(stats.chunks_unloaded, 0);
    }

    #[test]
    fn edits_show_up_after_the_next_tick() {
        let mut engine = engine(TerrainKind::Solid);
        engine.tick();
        let key = engine.set_voxel(Point3::new(20, 8, 8), 0).unwrap();
        let before = engine.chunk_manager.arena().get_chunk_geometry_info(&key).unwrap().index_count;
        let stats = engine.tick();
        assert_eq!(stats.messages_applied, 1);
        let after = engine.chunk_manager.arena().get_chunk_geometry_info(&key).unwrap().index_count;
        assert_eq!(before, 36);
        assert_eq!(after, 36 + 36);
    }
}
