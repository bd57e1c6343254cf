//! Spatial culling: bounding boxes, frustum planes, the chunk octree and the
//! neighbour-chain occlusion walk.

pub mod aabb;
pub mod frustum;
pub mod octree;
pub mod visibility_walk;

pub use aabb::Aabb;
pub use frustum::Frustum;
pub use octree::{Octree, SpatialEntry};
pub use visibility_walk::{visible_chunks, FrustumTestMode, WalkOptions};
