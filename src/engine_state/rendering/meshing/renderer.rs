//! Draw submission for arena-resident chunk geometry.
//!
//! All chunks share the arena's vertex and index buffers, so drawing a visible set is one
//! buffer bind followed by one indexed draw per chunk, or a single multi-draw over an
//! indirect buffer built from the same records.

use wgpu::{util::DrawIndexedIndirectArgs, Buffer, RenderPass};

use super::geometry_arena::GeometryRecord;

/// Issues one indexed draw per record.
///
/// # Arguments
/// * `render_pass` - A render pass with the chunk pipeline and bind groups already set
/// * `vertex_buffer` - The arena's vertex buffer
/// * `index_buffer` - The arena's index buffer
/// * `records` - The chunks to draw, usually the output of culling
///
/// # Returns
/// The number of draws issued
pub fn draw_chunks<'a>(
    render_pass: &mut RenderPass<'_>,
    vertex_buffer: &Buffer,
    index_buffer: &Buffer,
    records: impl IntoIterator<Item = &'a GeometryRecord>,
) -> u32 {
    render_pass.set_vertex_buffer(0, vertex_buffer.slice(..));
    render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);

    let mut draws = 0;
    for record in records {
        if record.index_count == 0 || !record.upload_complete {
            continue;
        }
        render_pass.draw_indexed(
            record.first_index..record.first_index + record.index_count,
            record.base_vertex,
            0..1,
        );
        draws += 1;
    }
    draws
}

/// Packs draw parameters for `multi_draw_indexed_indirect`.
///
/// Records with nothing to draw are left out.
pub fn indirect_args<'a>(records: impl IntoIterator<Item = &'a GeometryRecord>) -> Vec<DrawIndexedIndirectArgs> {
    records
        .into_iter()
        .filter(|record| record.index_count > 0 && record.upload_complete)
        .map(GeometryRecord::draw_args)
        .collect()
}

/// Serializes indirect arguments into the byte layout of an indirect buffer.
pub fn indirect_bytes(args: &[DrawIndexedIndirectArgs]) -> Vec<u8> {
    args.iter().flat_map(|arg| arg.as_bytes().iter().copied()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::{
        buffer_state::BufferState,
        culling::aabb::Aabb,
        rendering::meshing::geometry_arena::GeometryArena,
        rendering::vertex::{INDEX_STRIDE, VERTEX_STRIDE},
        voxels::chunk::ChunkKey,
    };

    #[test]
    fn indirect_args_follow_the_records() {
        let mut arena = GeometryArena::new(1 << 12, 1 << 12);
        let mut backend = BufferState::new();
        arena.create_buffers(&mut backend);

        let a = ChunkKey::new(0, 0, 0);
        let b = ChunkKey::new(0, 1, 0);
        let empty = ChunkKey::new(0, 2, 0);
        arena
            .add_chunk_bytes(&mut backend, a, &[0; 4 * VERTEX_STRIDE as usize], &[0; 6 * INDEX_STRIDE as usize], Aabb::from_chunk(a), 0)
            .unwrap();
        arena
            .add_chunk_bytes(&mut backend, b, &[0; 4 * VERTEX_STRIDE as usize], &[0; 6 * INDEX_STRIDE as usize], Aabb::from_chunk(b), 0)
            .unwrap();
        arena
            .add_chunk_bytes(&mut backend, empty, &[], &[], Aabb::from_chunk(empty), 0)
            .unwrap();

        let records = [a, b, empty].map(|key| arena.get_chunk_geometry_info(&key).unwrap());
        let args = indirect_args(records);
        assert_eq!(args.len(), 2);
        assert_eq!((args[1].first_index, args[1].base_vertex), (6, 4));
        assert_eq!(indirect_bytes(&args).len(), 2 * std::mem::size_of::<DrawIndexedIndirectArgs>());
    }
}
