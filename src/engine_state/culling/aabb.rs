//! Axis-aligned bounding boxes shared by chunk geometry, the octree and frustum tests.
//!
//! Overlap uses half-open semantics: boxes that only touch along a face do not overlap.

use cgmath::{Point3, Vector3};

use crate::engine_state::voxels::chunk::{ChunkKey, CHUNK_DIMENSION};

/// An axis-aligned bounding box in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3<f32>,
    /// Maximum corner.
    pub max: Point3<f32>,
}

impl Aabb {
    /// Creates a box from its corners.
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// A box that contains nothing and grows to fit the first point it is expanded with.
    pub fn inverted() -> Self {
        Self {
            min: Point3::new(f32::MAX, f32::MAX, f32::MAX),
            max: Point3::new(f32::MIN, f32::MIN, f32::MIN),
        }
    }

    /// World-space bounds of a chunk.
    pub fn from_chunk(key: ChunkKey) -> Self {
        Self::from_chunk_span(key, 1)
    }

    /// World-space bounds of a cube of `span` chunks per side starting at `min_chunk`.
    pub fn from_chunk_span(min_chunk: ChunkKey, span: i32) -> Self {
        let dimension = CHUNK_DIMENSION as f32;
        let min = Point3::new(
            min_chunk.x as f32 * dimension,
            min_chunk.y as f32 * dimension,
            min_chunk.z as f32 * dimension,
        );
        let size = span as f32 * dimension;
        Self::new(min, min + Vector3::new(size, size, size))
    }

    /// Center point.
    pub fn center(&self) -> Point3<f32> {
        Point3::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }

    /// Half-size along each axis.
    pub fn extents(&self) -> Vector3<f32> {
        (self.max - self.min) * 0.5
    }

    /// Half-open overlap test: `a.min < b.max && a.max > b.min` on every axis.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    /// Whether the point lies inside the box (min inclusive, max exclusive).
    pub fn contains_point(&self, point: Point3<f32>) -> bool {
        point.x >= self.min.x
            && point.x < self.max.x
            && point.y >= self.min.y
            && point.y < self.max.y
            && point.z >= self.min.z
            && point.z < self.max.z
    }

    /// Grows the box to include `point`.
    pub fn expand_to_include(&mut self, point: Point3<f32>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &Aabb) -> Aabb {
        let mut result = *self;
        result.expand_to_include(other.min);
        result.expand_to_include(other.max);
        result
    }

    /// The box grown by `margin` on every side.
    pub fn expanded_by(&self, margin: f32) -> Aabb {
        let margin = Vector3::new(margin, margin, margin);
        Aabb::new(self.min - margin, self.max + margin)
    }

    /// The box moved by `offset`.
    pub fn translated(&self, offset: Vector3<f32>) -> Aabb {
        Aabb::new(self.min + offset, self.max + offset)
    }

    /// Squared distance from `point` to the closest point of the box.
    pub fn distance_squared(&self, point: Point3<f32>) -> f32 {
        let dx = (self.min.x - point.x).max(0.0).max(point.x - self.max.x);
        let dy = (self.min.y - point.y).max(0.0).max(point.y - self.max.y);
        let dz = (self.min.z - point.z).max(0.0).max(point.z - self.max.z);
        dx * dx + dy * dy + dz * dz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(x: f32, y: f32, z: f32) -> Aabb {
        Aabb::new(Point3::new(x, y, z), Point3::new(x + 1.0, y + 1.0, z + 1.0))
    }

    #[test]
    fn touching_boxes_do_not_overlap() {
        assert!(!unit_box(0.0, 0.0, 0.0).overlaps(&unit_box(1.0, 0.0, 0.0)));
        assert!(unit_box(0.0, 0.0, 0.0).overlaps(&unit_box(0.5, 0.5, 0.5)));
    }

    #[test]
    fn chunk_bounds_cover_sixteen_units() {
        let aabb = Aabb::from_chunk(ChunkKey::new(-1, 0, 2));
        assert_eq!(aabb.min, Point3::new(-16.0, 0.0, 32.0));
        assert_eq!(aabb.max, Point3::new(0.0, 16.0, 48.0));
        assert_eq!(aabb.center(), Point3::new(-8.0, 8.0, 40.0));
    }

    #[test]
    fn expansion_and_union() {
        let mut aabb = Aabb::inverted();
        aabb.expand_to_include(Point3::new(1.0, 2.0, 3.0));
        aabb.expand_to_include(Point3::new(-1.0, 0.0, 5.0));
        assert_eq!(aabb.min, Point3::new(-1.0, 0.0, 3.0));
        assert_eq!(aabb.max, Point3::new(1.0, 2.0, 5.0));

        let joined = unit_box(0.0, 0.0, 0.0).union(&unit_box(3.0, 0.0, 0.0));
        assert_eq!(joined.max.x, 4.0);
        assert_eq!(unit_box(0.0, 0.0, 0.0).expanded_by(1.0).min.x, -1.0);
    }

    #[test]
    fn point_containment_and_distance() {
        let aabb = unit_box(0.0, 0.0, 0.0);
        assert!(aabb.contains_point(Point3::new(0.0, 0.5, 0.5)));
        assert!(!aabb.contains_point(Point3::new(1.0, 0.5, 0.5)));
        assert_eq!(aabb.distance_squared(Point3::new(0.5, 0.5, 0.5)), 0.0);
        assert_eq!(aabb.distance_squared(Point3::new(3.0, 0.5, 0.5)), 4.0);
    }
}
