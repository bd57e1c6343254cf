//! Hierarchical spatial index over loaded chunks.
//!
//! Level 0 nodes correspond one-to-one with chunks; a level `L` node covers a cube of
//! `2^L` chunks per side and sits at `floor(chunk_position / 2^L)` in level-local
//! coordinates. Nodes live in a slab and refer to each other by [`NodeHandle`], so the
//! parent links used for bottom-up aggregation never form ownership cycles.
//!
//! Every node carries the OR of its non-empty children's visibility bits and an
//! `is_empty` flag, recomputed along the leaf-to-root path on every insert and removal.
//! Subtrees that become empty are pruned.

use std::collections::HashMap;

use cgmath::Point3;
use log::{debug, trace};

use crate::engine_state::voxels::chunk::{visibility::VisibilityBits, ChunkKey};

use super::{aabb::Aabb, frustum::Frustum};

/// Default number of levels above the chunk leaves.
pub const DEFAULT_OCTREE_LEVELS: u32 = 5;

/// Highest supported level; keeps the shifts inside `i32`.
pub const MAX_OCTREE_LEVELS: u32 = 20;

/// What the index stores about a chunk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpatialEntry {
    /// The chunk this entry describes.
    pub key: ChunkKey,
    /// World-space bounds of the chunk's geometry.
    pub aabb: Aabb,
    /// Face-pair connectivity of the chunk.
    pub visibility_bits: VisibilityBits,
}

/// Index of a node inside the octree slab.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeHandle(usize);

/// A single octree node.
#[derive(Debug)]
pub struct OctreeNode {
    /// 0 for a single chunk, `L` for a cube of `2^L` chunks per side.
    pub level: u32,
    /// Position in level-local coordinates.
    pub position: Point3<i32>,
    /// World-space bounds of the whole cell.
    pub aabb: Aabb,
    /// OR of the visibility bits of every non-empty child (or of the chunk at level 0).
    pub visibility_bits: VisibilityBits,
    /// `true` when no descendant leaf holds a chunk.
    pub is_empty: bool,
    children: [Option<NodeHandle>; 8],
    parent: Option<NodeHandle>,
    chunks: HashMap<ChunkKey, SpatialEntry>,
}

impl OctreeNode {
    fn new(level: u32, position: Point3<i32>, parent: Option<NodeHandle>) -> Self {
        let min_chunk = ChunkKey::new(
            position.x << level,
            position.y << level,
            position.z << level,
        );
        Self {
            level,
            position,
            aabb: Aabb::from_chunk_span(min_chunk, 1 << level),
            visibility_bits: 0,
            is_empty: true,
            children: [None; 8],
            parent,
            chunks: HashMap::new(),
        }
    }

    /// Handles of the existing children.
    pub fn children(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        self.children.iter().flatten().copied()
    }

    /// Chunks stored at this node. Only level 0 nodes hold chunks.
    pub fn chunks(&self) -> impl Iterator<Item = &SpatialEntry> {
        self.chunks.values()
    }

    /// Parent handle, `None` for roots.
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }
}

fn level_position(key: ChunkKey, level: u32) -> Point3<i32> {
    Point3::new(key.x >> level, key.y >> level, key.z >> level)
}

fn child_slot(child_position: Point3<i32>) -> usize {
    ((child_position.x & 1) | ((child_position.y & 1) << 1) | ((child_position.z & 1) << 2))
        as usize
}

/// The chunk octree.
pub struct Octree {
    max_level: u32,
    nodes: Vec<Option<OctreeNode>>,
    free_slots: Vec<usize>,
    roots: HashMap<Point3<i32>, NodeHandle>,
    leaf_of: HashMap<ChunkKey, NodeHandle>,
}

impl Octree {
    /// Creates an empty octree whose roots sit at `max_level`.
    pub fn new(max_level: u32) -> Self {
        Self {
            max_level: max_level.min(MAX_OCTREE_LEVELS),
            nodes: Vec::new(),
            free_slots: Vec::new(),
            roots: HashMap::new(),
            leaf_of: HashMap::new(),
        }
    }

    /// Level of the root nodes.
    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    /// Number of chunks indexed.
    pub fn len(&self) -> usize {
        self.leaf_of.len()
    }

    /// `true` when no chunk is indexed.
    pub fn is_empty(&self) -> bool {
        self.leaf_of.is_empty()
    }

    /// Whether `key` is indexed.
    pub fn contains(&self, key: &ChunkKey) -> bool {
        self.leaf_of.contains_key(key)
    }

    /// Looks up a node.
    pub fn node(&self, handle: NodeHandle) -> Option<&OctreeNode> {
        self.nodes.get(handle.0).and_then(Option::as_ref)
    }

    /// Handles of all root nodes.
    pub fn roots(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        self.roots.values().copied()
    }

    /// The leaf node holding `key`.
    pub fn leaf_for(&self, key: &ChunkKey) -> Option<NodeHandle> {
        self.leaf_of.get(key).copied()
    }

    /// The stored entry for `key`.
    pub fn entry(&self, key: &ChunkKey) -> Option<&SpatialEntry> {
        let leaf = self.leaf_of.get(key)?;
        self.node(*leaf)?.chunks.get(key)
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free_slots.len()
    }

    fn node_mut(&mut self, handle: NodeHandle) -> &mut OctreeNode {
        self.nodes[handle.0]
            .as_mut()
            .expect("octree handle refers to a freed node")
    }

    fn get(&self, handle: NodeHandle) -> &OctreeNode {
        self.nodes[handle.0]
            .as_ref()
            .expect("octree handle refers to a freed node")
    }

    fn allocate(&mut self, node: OctreeNode) -> NodeHandle {
        match self.free_slots.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                NodeHandle(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeHandle(self.nodes.len() - 1)
            }
        }
    }

    fn release(&mut self, handle: NodeHandle) {
        self.nodes[handle.0] = None;
        self.free_slots.push(handle.0);
    }

    /// Inserts (or replaces) a chunk.
    pub fn add_chunk(&mut self, entry: SpatialEntry) {
        if self.leaf_of.contains_key(&entry.key) {
            self.remove_chunk(&entry.key);
        }

        let root_position = level_position(entry.key, self.max_level);
        let max_level = self.max_level;
        let mut current = match self.roots.get(&root_position) {
            Some(&root) => root,
            None => {
                let root = self.allocate(OctreeNode::new(max_level, root_position, None));
                self.roots.insert(root_position, root);
                root
            }
        };

        for level in (0..max_level).rev() {
            let child_position = level_position(entry.key, level);
            let slot = child_slot(child_position);
            current = match self.get(current).children[slot] {
                Some(child) => child,
                None => {
                    let child = self.allocate(OctreeNode::new(level, child_position, Some(current)));
                    self.node_mut(current).children[slot] = Some(child);
                    child
                }
            };
        }

        let leaf = self.node_mut(current);
        leaf.chunks.insert(entry.key, entry);
        self.leaf_of.insert(entry.key, current);
        trace!("Indexed chunk {} with bits {:015b}", entry.key, entry.visibility_bits);

        self.refresh_to_root(current);
    }

    /// Removes a chunk. Returns the removed entry, `None` if it was not indexed.
    pub fn remove_chunk(&mut self, key: &ChunkKey) -> Option<SpatialEntry> {
        let leaf = self.leaf_of.remove(key)?;
        let entry = self.node_mut(leaf).chunks.remove(key);

        self.refresh_to_root(leaf);
        self.prune_from(leaf);

        entry
    }

    fn refresh(&mut self, handle: NodeHandle) {
        let node = self.get(handle);
        let (bits, is_empty) = if node.level == 0 {
            (
                node.chunks
                    .values()
                    .fold(0, |bits, entry| bits | entry.visibility_bits),
                node.chunks.is_empty(),
            )
        } else {
            node.children().fold((0, true), |(bits, is_empty), child| {
                let child = self.get(child);
                if child.is_empty {
                    (bits, is_empty)
                } else {
                    (bits | child.visibility_bits, false)
                }
            })
        };

        let node = self.node_mut(handle);
        node.visibility_bits = bits;
        node.is_empty = is_empty;
    }

    fn refresh_to_root(&mut self, start: NodeHandle) {
        let mut current = Some(start);
        while let Some(handle) = current {
            self.refresh(handle);
            current = self.get(handle).parent;
        }
    }

    fn prune_from(&mut self, start: NodeHandle) {
        let mut current = start;
        loop {
            let node = self.get(current);
            if !node.is_empty {
                return;
            }
            let parent = node.parent;
            let slot = child_slot(node.position);
            let position = node.position;

            self.release(current);
            match parent {
                Some(parent) => {
                    self.node_mut(parent).children[slot] = None;
                    current = parent;
                }
                None => {
                    self.roots.remove(&position);
                    debug!("Pruned empty octree root at {:?}", position);
                    return;
                }
            }
        }
    }

    /// Collects the chunks whose cells intersect the frustum, nearest first.
    pub fn cull(&self, frustum: &Frustum, camera_position: Point3<f32>) -> Vec<ChunkKey> {
        self.cull_counting(frustum, camera_position).0
    }

    /// Like [`Octree::cull`], also returning how many node AABB tests were performed.
    pub fn cull_counting(&self, frustum: &Frustum, camera_position: Point3<f32>) -> (Vec<ChunkKey>, usize) {
        let mut visible: Vec<(f32, ChunkKey)> = Vec::new();
        let mut stack: Vec<NodeHandle> = self.roots().collect();
        let mut tests = 0;

        while let Some(handle) = stack.pop() {
            let node = self.get(handle);
            if node.is_empty {
                continue;
            }

            tests += 1;
            if !frustum.intersects_aabb(&node.aabb) {
                continue;
            }

            if node.level == 0 {
                visible.extend(
                    node.chunks
                        .values()
                        .map(|entry| (entry.aabb.distance_squared(camera_position), entry.key)),
                );
            } else {
                stack.extend(node.children().filter(|&child| !self.get(child).is_empty));
            }
        }

        visible.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        (visible.into_iter().map(|(_, key)| key).collect(), tests)
    }
}

impl Default for Octree {
    fn default() -> Self {
        Self::new(DEFAULT_OCTREE_LEVELS)
    }
}
