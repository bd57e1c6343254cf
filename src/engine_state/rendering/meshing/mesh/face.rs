use cgmath::{Point3, Vector3};

use crate::engine_state::voxels::block::{block_side::BlockSide, BlockTypeSize};

/// A rectangle of coplanar voxel faces sharing one material and one facing direction.
///
/// The rectangle lies in the plane `origin[axis]` of the block side's axis and spans
/// `width` cells along the first in-plane axis `u = (axis + 1) % 3` and `height` cells
/// along the second `v = (axis + 2) % 3`. A single voxel face is a 1x1 `Face`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    /// Minimum corner in chunk-local coordinates, on the boundary plane
    pub origin: Point3<i32>,
    /// Extent along the `u` axis
    pub width: i32,
    /// Extent along the `v` axis
    pub height: i32,
    /// The material of every voxel face covered
    pub block: BlockTypeSize,
    /// Which direction the face looks
    pub block_side: BlockSide,
}

fn unit(axis: usize) -> Vector3<i32> {
    let mut vector = Vector3::new(0, 0, 0);
    vector[axis] = 1;
    vector
}

impl Face {
    /// Creates the 1x1 face of the voxel at `(x, y, z)` looking towards `block_side`.
    pub fn voxel(x: i32, y: i32, z: i32, block: BlockTypeSize, block_side: BlockSide) -> Self {
        let mut origin = Point3::new(x, y, z);
        if block_side.is_positive() {
            origin[block_side.axis()] += 1;
        }
        Face {
            origin,
            width: 1,
            height: 1,
            block,
            block_side,
        }
    }

    /// The in-plane axes `(u, v)`.
    pub fn plane_axes(&self) -> (usize, usize) {
        let axis = self.block_side.axis();
        ((axis + 1) % 3, (axis + 2) % 3)
    }

    /// The four corners in `origin, origin+u, origin+u+v, origin+v` order.
    ///
    /// Seen from the positive end of the face axis this order is counter-clockwise.
    pub fn corners(&self) -> [Point3<i32>; 4] {
        let (u, v) = self.plane_axes();
        let du = unit(u) * self.width;
        let dv = unit(v) * self.height;
        [
            self.origin,
            self.origin + du,
            self.origin + du + dv,
            self.origin + dv,
        ]
    }

    /// Corner order for the two triangles, wound so the front face looks along the normal.
    pub fn triangle_corners(&self) -> [usize; 6] {
        if self.block_side.is_positive() {
            [0, 1, 2, 0, 2, 3]
        } else {
            [0, 2, 1, 0, 3, 2]
        }
    }

    /// Number of voxel faces this rectangle covers.
    pub fn area(&self) -> i32 {
        self.width * self.height
    }

    /// Splits the rectangle back into the voxel faces it covers.
    ///
    /// Each item is the local coordinate of the solid voxel owning the face.
    pub fn unit_faces(&self) -> impl Iterator<Item = (Point3<i32>, BlockSide)> + '_ {
        let (u, v) = self.plane_axes();
        let axis = self.block_side.axis();
        let layer_offset = if self.block_side.is_positive() { -1 } else { 0 };
        (0..self.height).flat_map(move |b| {
            (0..self.width).map(move |a| {
                let mut voxel = self.origin;
                voxel[u] += a;
                voxel[v] += b;
                voxel[axis] += layer_offset;
                (voxel, self.block_side)
            })
        })
    }
}
