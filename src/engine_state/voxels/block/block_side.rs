//! # Block Side Module
//!
//! The six axis-aligned face directions shared by voxel faces and chunk faces.
//! Chunk visibility bits and the neighbour walk index faces by the discriminants here,
//! so the order is fixed: +X, -X, +Y, -Y, +Z, -Z.

use cgmath::{Vector3, Zero};

/// Represents the six possible faces of a voxel block or chunk.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The face pointing towards positive X.
    RIGHT = 0,
    /// The face pointing towards negative X.
    LEFT = 1,
    /// The face pointing towards positive Y.
    TOP = 2,
    /// The face pointing towards negative Y.
    BOTTOM = 3,
    /// The face pointing towards positive Z.
    FRONT = 4,
    /// The face pointing towards negative Z.
    BACK = 5,
}

impl BlockSide {
    /// Returns an array containing all six faces in discriminant order.
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::RIGHT,
            BlockSide::LEFT,
            BlockSide::TOP,
            BlockSide::BOTTOM,
            BlockSide::FRONT,
            BlockSide::BACK,
        ]
    }

    /// Builds a side from its axis (0 = X, 1 = Y, 2 = Z) and direction.
    pub fn from_axis(axis: usize, positive: bool) -> Self {
        match (axis, positive) {
            (0, true) => BlockSide::RIGHT,
            (0, false) => BlockSide::LEFT,
            (1, true) => BlockSide::TOP,
            (1, false) => BlockSide::BOTTOM,
            (2, true) => BlockSide::FRONT,
            (2, false) => BlockSide::BACK,
            _ => panic!("axis {} out of range", axis),
        }
    }

    /// The axis this face is perpendicular to (0 = X, 1 = Y, 2 = Z).
    pub fn axis(self) -> usize {
        self as usize / 2
    }

    /// Whether the face points along the positive direction of its axis.
    pub fn is_positive(self) -> bool {
        self as usize % 2 == 0
    }

    /// The face on the other side of the same axis.
    pub fn opposite(self) -> Self {
        Self::from_axis(self.axis(), !self.is_positive())
    }

    /// Integer step to the neighbouring cell through this face.
    pub fn offset(self) -> Vector3<i32> {
        let mut offset = Vector3::zero();
        offset[self.axis()] = if self.is_positive() { 1 } else { -1 };
        offset
    }

    /// Outward unit normal of this face.
    pub fn normal(self) -> [f32; 3] {
        let offset = self.offset();
        [offset.x as f32, offset.y as f32, offset.z as f32]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_and_direction_round_trip() {
        for side in BlockSide::all() {
            assert_eq!(BlockSide::from_axis(side.axis(), side.is_positive()), side);
            assert_eq!(side.opposite().opposite(), side);
            assert_ne!(side.opposite(), side);
        }
    }

    #[test]
    fn offsets_point_outwards() {
        assert_eq!(BlockSide::RIGHT.offset(), Vector3::new(1, 0, 0));
        assert_eq!(BlockSide::BOTTOM.offset(), Vector3::new(0, -1, 0));
        assert_eq!(BlockSide::BACK.normal(), [0.0, 0.0, -1.0]);
    }
}
