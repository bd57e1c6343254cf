//! Neighbour-chain occlusion walk.
//!
//! Starting at the chunk containing the camera, a BFS crosses from chunk to chunk only
//! when the current chunk has an internal air path from the face it was entered through
//! to the face being exited. Chunks whose interior blocks that path end the chain there.
//! Unloaded chunks stop the walk as well and are never reported.

use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;

use crate::engine_state::voxels::{
    block::block_side::BlockSide,
    chunk::{
        visibility::{faces_connected, VisibilityBits},
        ChunkKey,
    },
};

use super::{aabb::Aabb, frustum::Frustum, octree::Octree};

/// Where the frustum test is applied during the walk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrustumTestMode {
    /// Chunks outside the frustum are neither reported nor expanded.
    #[default]
    BeforeEnqueue,
    /// The walk ignores the frustum; the visible set is filtered afterwards.
    PostFilter,
}

/// Source of per-chunk visibility bits for loaded chunks.
pub trait VisibilityLookup {
    /// Bits of a loaded chunk, `None` when the chunk is not loaded.
    fn visibility_bits(&self, key: &ChunkKey) -> Option<VisibilityBits>;
}

impl VisibilityLookup for Octree {
    fn visibility_bits(&self, key: &ChunkKey) -> Option<VisibilityBits> {
        self.entry(key).map(|entry| entry.visibility_bits)
    }
}

impl VisibilityLookup for HashMap<ChunkKey, VisibilityBits> {
    fn visibility_bits(&self, key: &ChunkKey) -> Option<VisibilityBits> {
        self.get(key).copied()
    }
}

/// Parameters of a walk.
#[derive(Clone, Copy, Debug)]
pub struct WalkOptions<'a> {
    /// Frustum to test against, `None` to skip frustum testing entirely.
    pub frustum: Option<&'a Frustum>,
    /// When the frustum test runs.
    pub mode: FrustumTestMode,
    /// Chebyshev distance from the start chunk beyond which the walk stops.
    pub max_radius: i32,
}

impl Default for WalkOptions<'_> {
    fn default() -> Self {
        Self {
            frustum: None,
            mode: FrustumTestMode::default(),
            max_radius: i32::MAX,
        }
    }
}

/// Runs the walk from `start`, returning the reached chunks in BFS order.
///
/// An unloaded start chunk yields an empty result.
pub fn visible_chunks<L: VisibilityLookup>(
    lookup: &L,
    start: ChunkKey,
    options: &WalkOptions,
) -> Vec<ChunkKey> {
    let in_frustum = |key: &ChunkKey| {
        options
            .frustum
            .map_or(true, |frustum| frustum.intersects_aabb(&Aabb::from_chunk(*key)))
    };

    let mut visible = Vec::new();
    if lookup.visibility_bits(&start).is_none() {
        return visible;
    }

    let mut visited: HashSet<ChunkKey> = HashSet::new();
    let mut queue: VecDeque<(ChunkKey, Option<BlockSide>)> = VecDeque::new();
    visited.insert(start);
    queue.push_back((start, None));

    let mut missing = 0usize;
    while let Some((key, entry)) = queue.pop_front() {
        let Some(bits) = lookup.visibility_bits(&key) else {
            continue;
        };
        visible.push(key);

        for exit in BlockSide::all() {
            if let Some(entry) = entry {
                if exit == entry || !faces_connected(bits, entry, exit) {
                    continue;
                }
            }

            let neighbor = key.neighbor(exit);
            if neighbor.chebyshev_distance(&start) > options.max_radius {
                continue;
            }
            if !visited.insert(neighbor) {
                continue;
            }
            if lookup.visibility_bits(&neighbor).is_none() {
                missing += 1;
                continue;
            }
            if options.mode == FrustumTestMode::BeforeEnqueue && !in_frustum(&neighbor) {
                continue;
            }

            queue.push_back((neighbor, Some(exit.opposite())));
        }
    }

    if options.mode == FrustumTestMode::PostFilter {
        visible.retain(|key| in_frustum(key));
    }

    debug!(
        "Visibility walk from {} reached {} chunks ({} unloaded neighbours skipped)",
        start,
        visible.len(),
        missing
    );

    visible
}

#[cfg(test)]
mod tests {
    use cgmath::{perspective, Deg, Matrix4, Point3, Vector3};

    use crate::engine_state::voxels::chunk::visibility::{pair_bit, ALL_VISIBILITY_BITS};

    use super::*;

    fn row(middle_bits: VisibilityBits) -> HashMap<ChunkKey, VisibilityBits> {
        HashMap::from([
            (ChunkKey::new(0, 0, 0), ALL_VISIBILITY_BITS),
            (ChunkKey::new(1, 0, 0), middle_bits),
            (ChunkKey::new(2, 0, 0), ALL_VISIBILITY_BITS),
        ])
    }

    #[test]
    fn solid_middle_chunk_blocks_the_row() {
        let loaded = row(0);
        let visible = visible_chunks(&loaded, ChunkKey::new(0, 0, 0), &WalkOptions::default());
        assert_eq!(visible, vec![ChunkKey::new(0, 0, 0), ChunkKey::new(1, 0, 0)]);
    }

    #[test]
    fn tunnel_through_middle_chunk_reaches_the_far_end() {
        let loaded = row(pair_bit(BlockSide::LEFT, BlockSide::RIGHT));
        let visible = visible_chunks(&loaded, ChunkKey::new(0, 0, 0), &WalkOptions::default());
        assert_eq!(visible.len(), 3);
        assert_eq!(visible[2], ChunkKey::new(2, 0, 0));
    }

    #[test]
    fn path_must_connect_entry_and_exit_faces() {
        // Air only connects top and bottom, so entering from -X goes nowhere.
        let loaded = row(pair_bit(BlockSide::TOP, BlockSide::BOTTOM));
        let visible = visible_chunks(&loaded, ChunkKey::new(0, 0, 0), &WalkOptions::default());
        assert!(!visible.contains(&ChunkKey::new(2, 0, 0)));
    }

    #[test]
    fn unloaded_start_gives_nothing() {
        let loaded = row(0);
        let visible = visible_chunks(&loaded, ChunkKey::new(9, 9, 9), &WalkOptions::default());
        assert!(visible.is_empty());
    }

    #[test]
    fn radius_bounds_the_walk() {
        let loaded: HashMap<_, _> = (0..10)
            .map(|x| (ChunkKey::new(x, 0, 0), ALL_VISIBILITY_BITS))
            .collect();
        let options = WalkOptions {
            max_radius: 3,
            ..WalkOptions::default()
        };
        let visible = visible_chunks(&loaded, ChunkKey::new(0, 0, 0), &options);
        assert_eq!(visible.len(), 4);
    }

    #[test]
    fn frustum_modes_agree_on_a_straight_corridor() {
        let loaded: HashMap<_, _> = (-3..=3)
            .map(|z| (ChunkKey::new(0, 0, z), ALL_VISIBILITY_BITS))
            .collect();
        let eye = Point3::new(8.0, 8.0, 8.0);
        let view = Matrix4::look_to_rh(eye, Vector3::new(0.0, 0.0, -1.0), Vector3::unit_y());
        let frustum = Frustum::from_view_projection(&(perspective(Deg(60.0), 1.0, 0.1, 500.0) * view));

        let before = visible_chunks(
            &loaded,
            ChunkKey::new(0, 0, 0),
            &WalkOptions {
                frustum: Some(&frustum),
                mode: FrustumTestMode::BeforeEnqueue,
                max_radius: i32::MAX,
            },
        );
        let after = visible_chunks(
            &loaded,
            ChunkKey::new(0, 0, 0),
            &WalkOptions {
                frustum: Some(&frustum),
                mode: FrustumTestMode::PostFilter,
                max_radius: i32::MAX,
            },
        );

        assert!(before.contains(&ChunkKey::new(0, 0, -3)));
        assert!(!before.contains(&ChunkKey::new(0, 0, 2)));
        let mut before_sorted = before.clone();
        before_sorted.sort();
        let mut after_sorted = after;
        after_sorted.sort();
        assert_eq!(before_sorted, after_sorted);
    }
}
