use std::collections::HashMap;

use cgmath::{Deg, Point3};
use voxel_world::{
    engine_state::{
        buffer_state::BufferState,
        camera_state::{Camera, CameraState, Projection},
        config::{CullingMode, EngineConfig},
        culling::{visible_chunks, Aabb, Frustum, FrustumTestMode, Octree, SpatialEntry, WalkOptions},
        rendering::{
            meshing::{GeometryArena, GeometryRecord, INDEX_BUFFER_NAME, VERTEX_BUFFER_NAME},
            INDEX_STRIDE, VERTEX_STRIDE,
        },
        voxels::{
            chunk::{
                visibility::{compute_visibility_bits, VisibilityBits, ALL_VISIBILITY_BITS},
                Chunk, ChunkKey,
            },
            terrain::TerrainKind,
        },
    },
    run_session,
};

fn arena() -> (GeometryArena, BufferState) {
    let mut backend = BufferState::new();
    let arena = GeometryArena::new(64 * 1024 * VERTEX_STRIDE, 64 * 1024 * INDEX_STRIDE);
    arena.create_buffers(&mut backend);
    (arena, backend)
}

fn payload(vertices: u64, indices: u64, fill: u8) -> (Vec<u8>, Vec<u8>) {
    (
        vec![fill; (vertices * VERTEX_STRIDE) as usize],
        vec![fill; (indices * INDEX_STRIDE) as usize],
    )
}

fn add(
    arena: &mut GeometryArena,
    backend: &mut BufferState,
    key: ChunkKey,
    (vertices, indices): &(Vec<u8>, Vec<u8>),
) -> GeometryRecord {
    arena
        .add_chunk_bytes(backend, key, vertices, indices, Aabb::from_chunk(key), ALL_VISIBILITY_BITS)
        .unwrap()
        .clone()
}

fn overlaps(a: &std::ops::Range<u64>, b: &std::ops::Range<u64>) -> bool {
    a.start < b.end && b.start < a.end
}

fn assert_arena_consistent(arena: &GeometryArena) {
    let records: Vec<&GeometryRecord> = arena.records().collect();
    for (i, a) in records.iter().enumerate() {
        assert_eq!(a.base_vertex as u64 * VERTEX_STRIDE, a.vertex_offset);
        assert_eq!(a.first_index as u64 * INDEX_STRIDE, a.index_offset);
        for b in &records[i + 1..] {
            if a.vertex_size > 0 && b.vertex_size > 0 {
                assert!(!overlaps(&a.vertex_range(), &b.vertex_range()), "{} / {}", a.key, b.key);
            }
            if a.index_size > 0 && b.index_size > 0 {
                assert!(!overlaps(&a.index_range(), &b.index_range()), "{} / {}", a.key, b.key);
            }
        }
    }
}

#[test]
fn freed_gap_is_reused_first_fit() {
    let (mut arena, mut backend) = arena();
    let first_key = ChunkKey::new(0, 0, 0);
    let second_key = ChunkKey::new(1, 0, 0);

    let first = add(&mut arena, &mut backend, first_key, &payload(8, 12, 1));
    let second = add(&mut arena, &mut backend, second_key, &payload(4, 6, 2));

    assert!(!overlaps(&first.vertex_range(), &second.vertex_range()));
    assert!(!overlaps(&first.index_range(), &second.index_range()));
    assert_eq!(arena.get_chunk_geometry_info(&first_key), Some(&first));
    assert_eq!(arena.get_chunk_geometry_info(&second_key), Some(&second));

    let vertices = backend.read_buffer(VERTEX_BUFFER_NAME).unwrap();
    assert!(vertices[first.vertex_range().start as usize..first.vertex_range().end as usize]
        .iter()
        .all(|&b| b == 1));
    assert!(vertices[second.vertex_range().start as usize..second.vertex_range().end as usize]
        .iter()
        .all(|&b| b == 2));

    arena.remove_chunk(&first_key);
    assert!(arena.get_chunk_geometry_info(&first_key).is_none());

    let third_key = ChunkKey::new(0, 1, 0);
    let third = add(&mut arena, &mut backend, third_key, &payload(8, 12, 3));
    assert_eq!(third.vertex_offset, first.vertex_offset);
    assert_eq!(third.index_offset, first.index_offset);

    let fourth = add(&mut arena, &mut backend, ChunkKey::new(2, 0, 0), &payload(1, 3, 4));
    assert_eq!(fourth.vertex_offset, second.vertex_range().end);
    assert_eq!(fourth.index_offset, second.index_range().end);
    assert_arena_consistent(&arena);

    let indices = backend.read_buffer(INDEX_BUFFER_NAME).unwrap();
    assert!(indices[third.index_range().start as usize..third.index_range().end as usize]
        .iter()
        .all(|&b| b == 3));
}

#[test]
fn random_add_remove_update_never_overlaps() {
    fastrand::seed(0x5eed);
    let (mut arena, mut backend) = arena();
    let keys: Vec<ChunkKey> = (0..24).map(|i| ChunkKey::new(i % 4, i / 4, 0)).collect();

    for _ in 0..500 {
        let key = keys[fastrand::usize(..keys.len())];
        match fastrand::u8(..3) {
            0 => {
                arena.remove_chunk(&key);
            }
            _ => {
                let quads = fastrand::u64(0..40);
                add(&mut arena, &mut backend, key, &payload(quads * 4, quads * 6, 0));
            }
        }
        assert_arena_consistent(&arena);
    }

    let live: u64 = arena.records().map(|record| record.vertex_size).sum();
    assert_eq!(live, arena.vertex_free_list().used());
}

#[test]
fn solid_middle_chunk_blocks_the_walk() {
    let solid = Chunk::solid(Point3::new(1, 0, 0));
    let air = Chunk::empty(Point3::new(0, 0, 0));
    assert_eq!(compute_visibility_bits(&solid), 0);

    let lookup: HashMap<ChunkKey, VisibilityBits> = HashMap::from([
        (ChunkKey::new(0, 0, 0), compute_visibility_bits(&air)),
        (ChunkKey::new(1, 0, 0), compute_visibility_bits(&solid)),
        (ChunkKey::new(2, 0, 0), ALL_VISIBILITY_BITS),
    ]);

    let reached = visible_chunks(&lookup, ChunkKey::new(0, 0, 0), &WalkOptions::default());
    assert_eq!(reached, vec![ChunkKey::new(0, 0, 0), ChunkKey::new(1, 0, 0)]);
    assert!(!reached.contains(&ChunkKey::new(2, 0, 0)));

    // Starting inside the solid chunk still reaches both ends
    let reached = visible_chunks(&lookup, ChunkKey::new(1, 0, 0), &WalkOptions::default());
    assert_eq!(reached.len(), 3);
}

#[test]
fn octree_and_walk_agree_on_an_open_world() {
    let mut backend = BufferState::new();
    let camera = Camera::new(Point3::new(8.0, 8.0, 8.0), Deg(0.0), Deg(0.0));
    let projection = Projection::new(800, 600, Deg(70.0), 0.1, 500.0);
    let camera_state = CameraState::new(&mut backend, camera, projection);
    let frustum: Frustum = camera_state.frustum(0.0);

    let mut octree = Octree::new(3);
    for x in -2..=2 {
        for y in -2..=2 {
            for z in -2..=2 {
                let key = ChunkKey::new(x, y, z);
                octree.add_chunk(SpatialEntry {
                    key,
                    aabb: Aabb::from_chunk(key),
                    visibility_bits: ALL_VISIBILITY_BITS,
                });
            }
        }
    }

    let mut culled = octree.cull(&frustum, camera.position);
    let options = WalkOptions {
        frustum: Some(&frustum),
        mode: FrustumTestMode::PostFilter,
        max_radius: 2,
    };
    let mut walked = visible_chunks(&octree, camera.chunk_key(), &options);

    assert!(!culled.is_empty());
    culled.sort();
    walked.sort();
    assert_eq!(culled, walked);
}

#[test]
fn headless_session_streams_and_draws() {
    for culling in [CullingMode::Octree, CullingMode::VisibilityWalk] {
        let mut config = EngineConfig {
            render_distance: 1,
            num_workers: 0,
            culling,
            vertex_arena_bytes: VERTEX_STRIDE << 19,
            index_arena_bytes: INDEX_STRIDE << 21,
            ..EngineConfig::default()
        };
        config.terrain.kind = TerrainKind::Perlin;
        config.terrain.seed = 7;

        let stats = run_session(config, 40);
        assert_eq!(stats.chunks_loaded, 27);
        assert_eq!(stats.chunks_in_flight, 0);
        assert_eq!(stats.chunks_rejected, 0);
        assert!(stats.chunks_meshed <= stats.chunks_loaded);
    }
}
