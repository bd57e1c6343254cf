//! # Chunk Manager
//!
//! Owns every main-thread structure a loaded chunk lives in (voxels in the [`World`],
//! geometry in the [`GeometryArena`], bounds and visibility bits in the [`Octree`]) and
//! keeps them consistent while worker results arrive asynchronously and out of order.
//!
//! ## Ordering
//! - A mesh is uploaded to the arena before its chunk enters the octree
//! - On unload or re-mesh the chunk leaves the octree before its geometry is freed
//! - A mesh for a chunk that already has geometry replaces it
//! - Results for chunks that are no longer wanted are dropped when applied
//!
//! ## Task ownership
//! Every build or mesh request gets a fresh ticket, and only the chunk's current ticket
//! is honoured. Results of superseded requests (a build from before an unload, a mesh
//! replaced by a newer request) are dropped. An edit to a chunk whose task is still
//! running is remembered and re-meshed once that result lands, so an older mesh can never
//! overwrite a newer one. Voxel data never replaces a chunk that is already loaded.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use cgmath::Point3;
use log::{debug, error, info, warn};
use wgpu::util::DrawIndexedIndirectArgs;

use crate::engine_state::{
    buffer_state::GpuBackend,
    config::{CullingMode, EngineConfig},
    culling::{
        octree::SpatialEntry,
        visibility_walk::{self, FrustumTestMode, WalkOptions},
        Aabb, Frustum, Octree,
    },
    rendering::meshing::{indirect_args, ArenaError, GeometryArena, GeometryRecord, Mesh, MesherKind},
    task_management::{Task, WorkerMessage},
    voxels::{
        block::BlockTypeSize,
        chunk::{visibility::VisibilityBits, Chunk, ChunkKey},
        storage::ChunkPersistence,
        tasks::{ChunkBuildTask, ChunkMeshTask},
        terrain::TerrainGenerator,
        world::{World, WorldError},
    },
};

/// What applying a worker message did.
#[derive(Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Voxel data was stored in the world.
    Loaded(ChunkKey),
    /// Geometry was uploaded and indexed.
    Meshed(ChunkKey),
    /// This many chunks were unloaded.
    Unloaded(usize),
    /// The chunk is no longer wanted; the result was dropped.
    Discarded(ChunkKey),
    /// The arena refused the geometry; the chunk is not drawn.
    Rejected(ArenaError),
}

/// Loaded-chunk bookkeeping for the main thread.
pub struct ChunkManager {
    world: World,
    arena: GeometryArena,
    octree: Octree,
    persistence: ChunkPersistence,
    generator: Arc<dyn TerrainGenerator>,
    mesher: MesherKind,
    render_distance: i32,
    culling: CullingMode,
    walk_frustum_test: FrustumTestMode,
    wanted: HashSet<ChunkKey>,
    in_flight: HashMap<ChunkKey, u64>,
    next_ticket: u64,
    remesh_after_flight: HashSet<ChunkKey>,
    dirty: HashSet<ChunkKey>,
    outgoing: Vec<Box<dyn Task>>,
}

impl ChunkManager {
    /// Creates a manager for `config`.
    pub fn new(config: &EngineConfig, persistence: ChunkPersistence) -> Self {
        Self {
            world: World::new(),
            arena: GeometryArena::new(config.vertex_arena_bytes, config.index_arena_bytes),
            octree: Octree::new(config.octree_levels),
            persistence,
            generator: config.terrain.build(),
            mesher: config.mesher,
            render_distance: config.render_distance,
            culling: config.culling,
            walk_frustum_test: config.walk_frustum_test,
            wanted: HashSet::new(),
            in_flight: HashMap::new(),
            next_ticket: 0,
            remesh_after_flight: HashSet::new(),
            dirty: HashSet::new(),
            outgoing: Vec::new(),
        }
    }

    /// Replaces the terrain generator used for chunks that are not in storage.
    pub fn with_generator(mut self, generator: Arc<dyn TerrainGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// Creates the shared geometry buffers on `backend`.
    pub fn create_buffers(&self, backend: &mut impl GpuBackend) {
        self.arena.create_buffers(backend);
    }

    /// Loaded voxel data.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Geometry of every meshed chunk.
    pub fn arena(&self) -> &GeometryArena {
        &self.arena
    }

    /// Spatial index of every meshed chunk.
    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    /// `true` while the chunk is inside the streamed region.
    pub fn is_wanted(&self, key: &ChunkKey) -> bool {
        self.wanted.contains(key)
    }

    /// Chunks with an outstanding build or mesh task.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Hands over tasks queued since the last call.
    pub fn take_tasks(&mut self) -> Vec<Box<dyn Task>> {
        std::mem::take(&mut self.outgoing)
    }

    /// Makes the cube of chunks within `render_distance` of `center` the wanted set.
    ///
    /// Newly wanted chunks are loaded from storage and queued for meshing, or queued for
    /// generation when storage has nothing. Nearer chunks are queued first. Returns the
    /// chunks that fell out of range; they stay loaded until passed to
    /// [`unload_chunks`](Self::unload_chunks).
    pub fn stream_around(&mut self, center: ChunkKey) -> Vec<ChunkKey> {
        let radius = self.render_distance;
        let mut wanted = HashSet::new();
        for x in -radius..=radius {
            for y in -radius..=radius {
                for z in -radius..=radius {
                    wanted.insert(ChunkKey::new(center.x + x, center.y + y, center.z + z));
                }
            }
        }

        let mut unloads: Vec<ChunkKey> = self
            .wanted
            .iter()
            .chain(self.world.keys())
            .filter(|key| !wanted.contains(*key))
            .copied()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        unloads.sort();

        let mut new_keys: Vec<ChunkKey> = wanted
            .iter()
            .filter(|key| !self.world.contains(key) && !self.in_flight.contains_key(*key))
            .copied()
            .collect();
        new_keys.sort_by_key(|key| (key.chebyshev_distance(&center), *key));

        self.wanted = wanted;
        for key in &new_keys {
            self.request_chunk(*key);
        }

        if !new_keys.is_empty() || !unloads.is_empty() {
            info!(
                "Streaming around {}: {} requested, {} out of range",
                center,
                new_keys.len(),
                unloads.len()
            );
        }
        unloads
    }

    /// Makes a new ticket the only one honoured for `key`.
    fn issue_ticket(&mut self, key: ChunkKey) -> u64 {
        self.next_ticket += 1;
        self.in_flight.insert(key, self.next_ticket);
        self.next_ticket
    }

    /// `true` when `ticket` is the outstanding request for `key`.
    fn is_current(&self, key: &ChunkKey, ticket: u64) -> bool {
        self.in_flight.get(key) == Some(&ticket)
    }

    fn request_chunk(&mut self, key: ChunkKey) {
        let ticket = self.issue_ticket(key);
        let task: Box<dyn Task> = match self.persistence.load(&key) {
            Some(voxels) => match Chunk::from_voxels(key.position(), voxels) {
                Ok(chunk) => {
                    self.world.insert_chunk(chunk.clone());
                    Box::new(ChunkMeshTask::new(chunk, ticket, self.mesher))
                }
                Err(err) => {
                    warn!("Stored chunk {} is invalid ({}), regenerating", key, err);
                    Box::new(ChunkBuildTask::new(key, ticket, self.generator.clone(), self.mesher))
                }
            },
            None => Box::new(ChunkBuildTask::new(key, ticket, self.generator.clone(), self.mesher)),
        };
        self.outgoing.push(task);
    }

    /// Applies one worker message.
    pub fn apply_message(&mut self, backend: &mut impl GpuBackend, message: WorkerMessage) -> ApplyOutcome {
        match message {
            WorkerMessage::ChunkDataAvailable {
                position,
                ticket,
                voxels,
            } => self.apply_chunk_data(position, ticket, voxels),
            WorkerMessage::ChunkMeshUpdated {
                position,
                ticket,
                mesh,
                visibility_bits,
            } => self.apply_mesh(backend, position, ticket, &mesh, visibility_bits),
            WorkerMessage::ChunksToUnload { keys } => ApplyOutcome::Unloaded(self.unload_chunks(&keys)),
        }
    }

    fn apply_chunk_data(&mut self, position: ChunkKey, ticket: u64, voxels: Vec<u8>) -> ApplyOutcome {
        if !self.is_current(&position, ticket) || !self.wanted.contains(&position) {
            debug!("Dropping superseded voxel data for {} (ticket {})", position, ticket);
            return ApplyOutcome::Discarded(position);
        }
        if self.world.contains(&position) {
            // The loaded voxels win; the mesh built from the generated ones must not land
            warn!("Refusing voxel data for already loaded chunk {}", position);
            self.request_remesh(position);
            return ApplyOutcome::Discarded(position);
        }
        match Chunk::from_voxels(position.position(), voxels) {
            Ok(chunk) => {
                self.persistence.save(&position, chunk.voxels());
                self.world.insert_chunk(chunk);
                ApplyOutcome::Loaded(position)
            }
            Err(err) => {
                error!("Worker sent invalid voxels for {}: {}", position, err);
                ApplyOutcome::Discarded(position)
            }
        }
    }

    fn apply_mesh(
        &mut self,
        backend: &mut impl GpuBackend,
        position: ChunkKey,
        ticket: u64,
        mesh: &Mesh,
        visibility_bits: VisibilityBits,
    ) -> ApplyOutcome {
        if !self.is_current(&position, ticket) {
            debug!("Dropping superseded mesh for {} (ticket {})", position, ticket);
            return ApplyOutcome::Discarded(position);
        }
        self.in_flight.remove(&position);
        if !self.wanted.contains(&position) || !self.world.contains(&position) {
            debug!("Dropping late mesh for {}", position);
            self.remesh_after_flight.remove(&position);
            return ApplyOutcome::Discarded(position);
        }

        // Out of the index before the old geometry goes away
        self.octree.remove_chunk(&position);
        let aabb = Aabb::from_chunk(position);
        let outcome = match self.arena.update_chunk(backend, position, mesh, aabb, visibility_bits) {
            Ok(_) => {
                self.octree.add_chunk(SpatialEntry {
                    key: position,
                    aabb,
                    visibility_bits,
                });
                ApplyOutcome::Meshed(position)
            }
            Err(err) => {
                error!("Chunk {} will not be drawn: {}", position, err);
                ApplyOutcome::Rejected(err)
            }
        };

        if self.remesh_after_flight.remove(&position) {
            self.request_remesh(position);
        }
        outcome
    }

    /// Unloads chunks, saving edited ones. Unknown keys are ignored.
    ///
    /// Returns the number of chunks that were loaded or in flight.
    pub fn unload_chunks(&mut self, keys: &[ChunkKey]) -> usize {
        let mut unloaded = 0;
        for key in keys {
            self.wanted.remove(key);
            self.remesh_after_flight.remove(key);
            let was_in_flight = self.in_flight.remove(key).is_some();

            self.octree.remove_chunk(key);
            self.arena.remove_chunk(key);
            let chunk = self.world.remove_chunk(key);
            if let Some(chunk) = &chunk {
                if self.dirty.remove(key) {
                    self.persistence.save(key, chunk.voxels());
                }
            }
            if chunk.is_some() || was_in_flight {
                unloaded += 1;
            }
        }
        if unloaded > 0 {
            debug!("Unloaded {} chunks", unloaded);
        }
        unloaded
    }

    /// Edits a block and queues a re-mesh of its chunk.
    pub fn set_voxel(&mut self, position: Point3<i32>, block: BlockTypeSize) -> Result<ChunkKey, WorldError> {
        let key = self.world.set_block(position, block)?;
        self.dirty.insert(key);
        if self.in_flight.contains_key(&key) {
            self.remesh_after_flight.insert(key);
        } else {
            self.request_remesh(key);
        }
        Ok(key)
    }

    fn request_remesh(&mut self, key: ChunkKey) {
        let Some(chunk) = self.world.get_chunk(&key).cloned() else {
            return;
        };
        let ticket = self.issue_ticket(key);
        self.outgoing.push(Box::new(ChunkMeshTask::new(chunk, ticket, self.mesher)));
    }

    /// The chunks to draw this frame, using the configured culling mode.
    pub fn visible_chunks(&self, frustum: &Frustum, camera_position: Point3<f32>) -> Vec<ChunkKey> {
        match self.culling {
            CullingMode::Octree => self.octree.cull(frustum, camera_position),
            CullingMode::VisibilityWalk => {
                let options = WalkOptions {
                    frustum: Some(frustum),
                    mode: self.walk_frustum_test,
                    max_radius: self.render_distance,
                };
                visibility_walk::visible_chunks(
                    &self.octree,
                    ChunkKey::from_world_position(camera_position),
                    &options,
                )
            }
        }
    }

    /// Geometry records of `keys`, skipping chunks without geometry.
    pub fn records<'a>(&'a self, keys: &'a [ChunkKey]) -> impl Iterator<Item = &'a GeometryRecord> + 'a {
        keys.iter()
            .filter_map(|key| self.arena.get_chunk_geometry_info(key))
    }

    /// Indexed draw parameters for `keys`, in order, skipping chunks with nothing to draw.
    pub fn draw_list(&self, keys: &[ChunkKey]) -> Vec<DrawIndexedIndirectArgs> {
        indirect_args(self.records(keys))
    }

    /// Per-chunk visibility bits of every meshed chunk.
    pub fn visibility_map(&self) -> HashMap<ChunkKey, VisibilityBits> {
        self.arena
            .records()
            .map(|record| (record.key, record.visibility_bits))
            .collect()
    }
}
