//! Shared-buffer allocator for chunk geometry.
//!
//! Every loaded chunk's vertices and indices live in one vertex buffer and one index
//! buffer. The arena places each chunk's byte ranges with a [`FreeList`] per buffer,
//! uploads the bytes through a [`GpuBackend`] and keeps a [`GeometryRecord`] with the draw
//! parameters derived from the offsets.
//!
//! # Layout
//! All vertex ranges are multiples of [`VERTEX_STRIDE`] and all index ranges multiples of
//! [`INDEX_STRIDE`], so every offset is a whole number of elements and maps 1:1 onto
//! `base_vertex` / `first_index` of an indexed draw. An offset that is not is a layout bug
//! and the chunk is refused.

use std::collections::HashMap;

use log::{debug, error};
use wgpu::{util::DrawIndexedIndirectArgs, BufferUsages};

use crate::engine_state::{
    buffer_state::GpuBackend,
    culling::aabb::Aabb,
    rendering::vertex::{INDEX_STRIDE, VERTEX_STRIDE},
    voxels::chunk::{visibility::VisibilityBits, ChunkKey},
};

use super::{free_list::FreeList, mesh::Mesh};

/// Name of the shared vertex buffer.
pub const VERTEX_BUFFER_NAME: &str = "Chunk Vertex Arena";
/// Name of the shared index buffer.
pub const INDEX_BUFFER_NAME: &str = "Chunk Index Arena";

/// Errors that refuse a chunk.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ArenaError {
    /// The payload is not a whole number of elements.
    #[error("{kind} payload of {len} bytes is not a multiple of the {stride}-byte stride")]
    UnalignedPayload {
        /// `"vertex"` or `"index"`.
        kind: &'static str,
        /// Payload length in bytes.
        len: u64,
        /// Element size in bytes.
        stride: u64,
    },
    /// An allocated offset is not a whole number of elements.
    #[error("{kind} offset {offset} for chunk {key} is not a multiple of the {stride}-byte stride")]
    MisalignedOffset {
        /// The chunk being added.
        key: ChunkKey,
        /// `"vertex"` or `"index"`.
        kind: &'static str,
        /// The offending offset.
        offset: u64,
        /// Element size in bytes.
        stride: u64,
    },
}

/// Geometry of one chunk inside the shared buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryRecord {
    /// The chunk this geometry belongs to.
    pub key: ChunkKey,
    /// Number of indices to draw.
    pub index_count: u32,
    /// Byte offset in the vertex buffer.
    pub vertex_offset: u64,
    /// Byte length in the vertex buffer.
    pub vertex_size: u64,
    /// Byte offset in the index buffer.
    pub index_offset: u64,
    /// Byte length in the index buffer.
    pub index_size: u64,
    /// `index_offset / INDEX_STRIDE`.
    pub first_index: u32,
    /// `vertex_offset / VERTEX_STRIDE`.
    pub base_vertex: i32,
    /// Vertex bytes as uploaded.
    pub vertex_data: Vec<u8>,
    /// Index bytes as uploaded.
    pub index_data: Vec<u8>,
    /// World-space bounds.
    pub aabb: Aabb,
    /// Face-pair connectivity of the chunk.
    pub visibility_bits: VisibilityBits,
    /// `false` when a copy was skipped and the GPU holds partial geometry.
    pub upload_complete: bool,
}

impl GeometryRecord {
    /// Byte range in the vertex buffer.
    pub fn vertex_range(&self) -> std::ops::Range<u64> {
        self.vertex_offset..self.vertex_offset + self.vertex_size
    }

    /// Byte range in the index buffer.
    pub fn index_range(&self) -> std::ops::Range<u64> {
        self.index_offset..self.index_offset + self.index_size
    }

    /// Indexed draw parameters for one instance of this chunk.
    pub fn draw_args(&self) -> DrawIndexedIndirectArgs {
        DrawIndexedIndirectArgs {
            index_count: self.index_count,
            instance_count: 1,
            first_index: self.first_index,
            base_vertex: self.base_vertex,
            first_instance: 0,
        }
    }
}

/// Allocator and registry of chunk geometry in the shared buffers.
#[derive(Debug)]
pub struct GeometryArena {
    vertex_capacity: u64,
    index_capacity: u64,
    records: HashMap<ChunkKey, GeometryRecord>,
    vertex_free_list: FreeList,
    index_free_list: FreeList,
}

impl GeometryArena {
    /// Creates an arena for buffers of the given byte sizes.
    pub fn new(vertex_capacity: u64, index_capacity: u64) -> Self {
        Self {
            vertex_capacity,
            index_capacity,
            records: HashMap::new(),
            vertex_free_list: FreeList::new(),
            index_free_list: FreeList::new(),
        }
    }

    /// Creates the two shared buffers on `backend`.
    pub fn create_buffers(&self, backend: &mut impl GpuBackend) {
        backend.create_buffer(
            VERTEX_BUFFER_NAME,
            self.vertex_capacity,
            BufferUsages::VERTEX | BufferUsages::COPY_DST,
        );
        backend.create_buffer(
            INDEX_BUFFER_NAME,
            self.index_capacity,
            BufferUsages::INDEX | BufferUsages::COPY_DST,
        );
    }

    /// Places and uploads a chunk mesh.
    pub fn add_chunk(
        &mut self,
        backend: &mut impl GpuBackend,
        key: ChunkKey,
        mesh: &Mesh,
        aabb: Aabb,
        visibility_bits: VisibilityBits,
    ) -> Result<&GeometryRecord, ArenaError> {
        self.add_chunk_bytes(
            backend,
            key,
            mesh.vertex_bytes(),
            mesh.index_bytes(),
            aabb,
            visibility_bits,
        )
    }

    /// Places and uploads raw vertex and index bytes.
    ///
    /// A chunk that already has geometry is replaced. Empty payloads skip their copy.
    /// A copy that would overflow its buffer is skipped and logged; the record is still
    /// stored with `upload_complete == false`.
    pub fn add_chunk_bytes(
        &mut self,
        backend: &mut impl GpuBackend,
        key: ChunkKey,
        vertex_bytes: &[u8],
        index_bytes: &[u8],
        aabb: Aabb,
        visibility_bits: VisibilityBits,
    ) -> Result<&GeometryRecord, ArenaError> {
        let vertex_size = vertex_bytes.len() as u64;
        let index_size = index_bytes.len() as u64;
        check_payload("vertex", vertex_size, VERTEX_STRIDE)?;
        check_payload("index", index_size, INDEX_STRIDE)?;

        if self.records.contains_key(&key) {
            self.remove_chunk(&key);
        }

        let vertex_offset = self.vertex_free_list.allocate(vertex_size, key);
        let index_offset = self.index_free_list.allocate(index_size, key);

        if let Err(err) = check_offset(key, "vertex", vertex_offset, VERTEX_STRIDE)
            .and_then(|_| check_offset(key, "index", index_offset, INDEX_STRIDE))
        {
            error!("Refusing geometry for chunk {}: {}", key, err);
            self.vertex_free_list.release(&key);
            self.index_free_list.release(&key);
            return Err(err);
        }

        let mut upload_complete = true;
        for (buffer_name, offset, bytes) in [
            (VERTEX_BUFFER_NAME, vertex_offset, vertex_bytes),
            (INDEX_BUFFER_NAME, index_offset, index_bytes),
        ] {
            if bytes.is_empty() {
                continue;
            }
            if let Err(err) = backend.write_buffer(buffer_name, offset, bytes) {
                error!("Skipping geometry upload for chunk {}: {}", key, err);
                upload_complete = false;
            }
        }

        let record = GeometryRecord {
            key,
            index_count: (index_size / INDEX_STRIDE) as u32,
            vertex_offset,
            vertex_size,
            index_offset,
            index_size,
            first_index: (index_offset / INDEX_STRIDE) as u32,
            base_vertex: (vertex_offset / VERTEX_STRIDE) as i32,
            vertex_data: vertex_bytes.to_vec(),
            index_data: index_bytes.to_vec(),
            aabb,
            visibility_bits,
            upload_complete,
        };

        debug!(
            "Placed chunk {}: vertices {:?}, indices {:?}",
            key,
            record.vertex_range(),
            record.index_range()
        );

        self.records.insert(key, record);
        Ok(&self.records[&key])
    }

    /// Frees a chunk's geometry. Returns the record, `None` if the chunk had none.
    pub fn remove_chunk(&mut self, key: &ChunkKey) -> Option<GeometryRecord> {
        let record = self.records.remove(key);
        self.vertex_free_list.release(key);
        self.index_free_list.release(key);
        if record.is_some() {
            debug!("Freed geometry of chunk {}", key);
        }
        record
    }

    /// Replaces a chunk's geometry.
    pub fn update_chunk(
        &mut self,
        backend: &mut impl GpuBackend,
        key: ChunkKey,
        mesh: &Mesh,
        aabb: Aabb,
        visibility_bits: VisibilityBits,
    ) -> Result<&GeometryRecord, ArenaError> {
        self.remove_chunk(&key);
        self.add_chunk(backend, key, mesh, aabb, visibility_bits)
    }

    /// Looks up a chunk's geometry.
    pub fn get_chunk_geometry_info(&self, key: &ChunkKey) -> Option<&GeometryRecord> {
        self.records.get(key)
    }

    /// All live records, in no particular order.
    pub fn records(&self) -> impl Iterator<Item = &GeometryRecord> {
        self.records.values()
    }

    /// Number of chunks with geometry.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` when no chunk has geometry.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Allocations in the vertex buffer.
    pub fn vertex_free_list(&self) -> &FreeList {
        &self.vertex_free_list
    }

    /// Allocations in the index buffer.
    pub fn index_free_list(&self) -> &FreeList {
        &self.index_free_list
    }

    /// Size of the vertex buffer in bytes.
    pub fn vertex_capacity(&self) -> u64 {
        self.vertex_capacity
    }

    /// Size of the index buffer in bytes.
    pub fn index_capacity(&self) -> u64 {
        self.index_capacity
    }
}

fn check_payload(kind: &'static str, len: u64, stride: u64) -> Result<(), ArenaError> {
    if len % stride == 0 {
        Ok(())
    } else {
        Err(ArenaError::UnalignedPayload { kind, len, stride })
    }
}

fn check_offset(key: ChunkKey, kind: &'static str, offset: u64, stride: u64) -> Result<(), ArenaError> {
    if offset % stride == 0 {
        Ok(())
    } else {
        Err(ArenaError::MisalignedOffset {
            key,
            kind,
            offset,
            stride,
        })
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Point3;

    use super::*;
    use crate::engine_state::{
        buffer_state::BufferState,
        rendering::meshing::mesh::{Mesh, MesherKind},
        voxels::chunk::Chunk,
    };

    fn arena_with_backend(vertex_capacity: u64, index_capacity: u64) -> (GeometryArena, BufferState) {
        let arena = GeometryArena::new(vertex_capacity, index_capacity);
        let mut backend = BufferState::new();
        arena.create_buffers(&mut backend);
        (arena, backend)
    }

    fn bytes(vertices: u64, indices: u64, fill: u8) -> (Vec<u8>, Vec<u8>) {
        (
            vec![fill; (vertices * VERTEX_STRIDE) as usize],
            vec![fill; (indices * INDEX_STRIDE) as usize],
        )
    }

    #[test]
    fn records_derive_draw_parameters_from_offsets() {
        let (mut arena, mut backend) = arena_with_backend(1 << 16, 1 << 16);
        let key_a = ChunkKey::new(0, 0, 0);
        let key_b = ChunkKey::new(1, 0, 0);
        let (va, ia) = bytes(4, 6, 1);
        let (vb, ib) = bytes(8, 12, 2);

        arena
            .add_chunk_bytes(&mut backend, key_a, &va, &ia, Aabb::from_chunk(key_a), 0)
            .unwrap();
        let record = arena
            .add_chunk_bytes(&mut backend, key_b, &vb, &ib, Aabb::from_chunk(key_b), 7)
            .unwrap();

        assert_eq!(record.vertex_offset, 4 * VERTEX_STRIDE);
        assert_eq!(record.base_vertex, 4);
        assert_eq!(record.first_index, 6);
        assert_eq!(record.index_count, 12);
        assert_eq!(record.visibility_bits, 7);
        assert!(record.upload_complete);

        let draw = record.draw_args();
        assert_eq!((draw.first_index, draw.base_vertex, draw.index_count), (6, 4, 12));

        let vertex_buffer = backend.read_buffer(VERTEX_BUFFER_NAME).unwrap();
        assert!(vertex_buffer[..(4 * VERTEX_STRIDE) as usize].iter().all(|&b| b == 1));
        assert!(vertex_buffer[(4 * VERTEX_STRIDE) as usize..(12 * VERTEX_STRIDE) as usize]
            .iter()
            .all(|&b| b == 2));
    }

    #[test]
    fn unaligned_payload_is_refused() {
        let (mut arena, mut backend) = arena_with_backend(1024, 1024);
        let key = ChunkKey::new(0, 0, 0);
        let result = arena.add_chunk_bytes(&mut backend, key, &[0; 35], &[], Aabb::from_chunk(key), 0);
        assert_eq!(
            result.unwrap_err(),
            ArenaError::UnalignedPayload {
                kind: "vertex",
                len: 35,
                stride: VERTEX_STRIDE
            }
        );
        assert!(arena.is_empty());
        assert!(arena.vertex_free_list().is_empty());
    }

    #[test]
    fn overflow_skips_the_copy_but_keeps_the_record() {
        let (mut arena, mut backend) = arena_with_backend(2 * VERTEX_STRIDE, 1024);
        let key = ChunkKey::new(0, 0, 0);
        let (vertices, indices) = bytes(3, 3, 5);

        let record = arena
            .add_chunk_bytes(&mut backend, key, &vertices, &indices, Aabb::from_chunk(key), 0)
            .unwrap();
        assert!(!record.upload_complete);

        assert!(backend.read_buffer(VERTEX_BUFFER_NAME).unwrap().iter().all(|&b| b == 0));
        assert_eq!(backend.read_buffer(INDEX_BUFFER_NAME).unwrap()[0], 5);
        assert!(arena.get_chunk_geometry_info(&key).is_some());
    }

    #[test]
    fn empty_index_payload_still_uploads_vertices() {
        let (mut arena, mut backend) = arena_with_backend(1024, 1024);
        let key = ChunkKey::new(0, 0, 0);
        let (vertices, _) = bytes(1, 0, 9);
        let record = arena
            .add_chunk_bytes(&mut backend, key, &vertices, &[], Aabb::from_chunk(key), 0)
            .unwrap();
        assert!(record.upload_complete);
        assert_eq!(record.index_count, 0);
        assert_eq!(backend.analytics(INDEX_BUFFER_NAME).unwrap().times_written, 0);
        assert_eq!(backend.analytics(VERTEX_BUFFER_NAME).unwrap().times_written, 1);
    }

    #[test]
    fn re_adding_a_key_replaces_instead_of_leaking() {
        let (mut arena, mut backend) = arena_with_backend(1 << 16, 1 << 16);
        let key = ChunkKey::new(0, 0, 0);
        let (vertices, indices) = bytes(4, 6, 1);
        for _ in 0..5 {
            arena
                .add_chunk_bytes(&mut backend, key, &vertices, &indices, Aabb::from_chunk(key), 0)
                .unwrap();
        }
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.vertex_free_list().len(), 1);
        assert_eq!(arena.vertex_free_list().end(), 4 * VERTEX_STRIDE);
    }

    #[test]
    fn remove_is_idempotent() {
        let (mut arena, mut backend) = arena_with_backend(1024, 1024);
        let key = ChunkKey::new(0, 0, 0);
        let (vertices, indices) = bytes(1, 3, 1);
        arena
            .add_chunk_bytes(&mut backend, key, &vertices, &indices, Aabb::from_chunk(key), 0)
            .unwrap();
        assert!(arena.remove_chunk(&key).is_some());
        assert!(arena.remove_chunk(&key).is_none());
        assert!(arena.index_free_list().is_empty());
    }

    #[test]
    fn meshes_upload_through_update() {
        let (mut arena, mut backend) = arena_with_backend(1 << 20, 1 << 20);
        let chunk = Chunk::solid(Point3::new(0, 0, 0));
        let mesh = Mesh::generate(&chunk, MesherKind::Greedy);

        let first = arena
            .add_chunk(&mut backend, chunk.key(), &mesh, chunk.aabb(), 0)
            .unwrap()
            .clone();
        assert_eq!(first.index_count, 36);
        assert_eq!(first.vertex_size, 24 * VERTEX_STRIDE);

        let naive = Mesh::generate(&chunk, MesherKind::Naive);
        let updated = arena
            .update_chunk(&mut backend, chunk.key(), &naive, chunk.aabb(), 0)
            .unwrap();
        assert_eq!(updated.vertex_offset, 0);
        assert_eq!(updated.index_count as usize, naive.indices.len());
    }
}
