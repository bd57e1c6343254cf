//! View-frustum plane extraction and AABB rejection.
//!
//! Planes are pulled from the combined view-projection matrix with the Gribb–Hartmann
//! method and normalized so signed distances are in world units. The positive side of
//! every plane is inside the frustum.

use cgmath::{InnerSpace, Matrix, Matrix4, Point3, Vector3, Vector4};

use super::aabb::Aabb;

const LEFT: usize = 0;
const RIGHT: usize = 1;
const BOTTOM: usize = 2;
const TOP: usize = 3;
const NEAR: usize = 4;
const FAR: usize = 5;

/// Default tolerance for the AABB test, in world units.
pub const DEFAULT_FRUSTUM_EPSILON: f32 = 1e-4;

/// A plane `normal · p + d = 0` with a unit-length normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    /// Unit normal, pointing into the frustum.
    pub normal: Vector3<f32>,
    /// Distance term.
    pub d: f32,
}

impl Plane {
    /// Builds a plane from raw `(A, B, C, D)` coefficients and normalizes it.
    ///
    /// Degenerate planes (zero-length normal) are returned unnormalized.
    pub fn from_coefficients(coefficients: Vector4<f32>) -> Self {
        let normal = coefficients.truncate();
        let length = normal.magnitude();
        if length > 0.0 {
            Self {
                normal: normal / length,
                d: coefficients.w / length,
            }
        } else {
            Self {
                normal,
                d: coefficients.w,
            }
        }
    }

    /// Signed distance from `point` to the plane; positive is inside.
    pub fn signed_distance(&self, point: Point3<f32>) -> f32 {
        self.normal.x * point.x + self.normal.y * point.y + self.normal.z * point.z + self.d
    }

    /// The corner of `aabb` furthest along the plane normal.
    pub fn positive_vertex(&self, aabb: &Aabb) -> Point3<f32> {
        Point3::new(
            if self.normal.x > 0.0 { aabb.max.x } else { aabb.min.x },
            if self.normal.y > 0.0 { aabb.max.y } else { aabb.min.y },
            if self.normal.z > 0.0 { aabb.max.z } else { aabb.min.z },
        )
    }
}

/// Tests an AABB against six frustum planes.
///
/// For each plane the positive vertex is checked; if it lies more than `epsilon` behind
/// the plane the box is fully outside. The test is conservative: a box that survives all
/// six planes is reported visible even in the rare corner cases where it is not.
pub fn intersect_frustum_aabb(planes: &[Plane; 6], aabb: &Aabb, epsilon: f32) -> bool {
    planes
        .iter()
        .all(|plane| plane.signed_distance(plane.positive_vertex(aabb)) >= -epsilon)
}

/// The six planes of a camera frustum.
#[derive(Clone, Debug)]
pub struct Frustum {
    planes: [Plane; 6],
    epsilon: f32,
}

impl Frustum {
    /// Extracts the frustum from a view-projection matrix.
    pub fn from_view_projection(view_projection: &Matrix4<f32>) -> Self {
        let rows = [
            view_projection.row(0),
            view_projection.row(1),
            view_projection.row(2),
            view_projection.row(3),
        ];

        let mut coefficients = [Vector4::new(0.0, 0.0, 0.0, 0.0); 6];
        coefficients[LEFT] = rows[3] + rows[0];
        coefficients[RIGHT] = rows[3] - rows[0];
        coefficients[BOTTOM] = rows[3] + rows[1];
        coefficients[TOP] = rows[3] - rows[1];
        coefficients[NEAR] = rows[3] + rows[2];
        coefficients[FAR] = rows[3] - rows[2];

        Self {
            planes: coefficients.map(Plane::from_coefficients),
            epsilon: DEFAULT_FRUSTUM_EPSILON,
        }
    }

    /// Replaces the rejection tolerance.
    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// The rejection tolerance in world units.
    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// The planes in left, right, bottom, top, near, far order.
    pub fn planes(&self) -> &[Plane; 6] {
        &self.planes
    }

    /// Returns `true` if the AABB is at least partially inside the frustum.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        intersect_frustum_aabb(&self.planes, aabb, self.epsilon)
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{perspective, Deg, EuclideanSpace};

    use super::*;

    fn looking_down_negative_z() -> Frustum {
        let view = Matrix4::look_to_rh(
            Point3::origin(),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::unit_y(),
        );
        let projection = perspective(Deg(90.0), 1.0, 0.1, 100.0);
        Frustum::from_view_projection(&(projection * view))
    }

    fn cube(center: Point3<f32>, half: f32) -> Aabb {
        let half = Vector3::new(half, half, half);
        Aabb::new(center - half, center + half)
    }

    #[test]
    fn planes_are_normalized() {
        for plane in looking_down_negative_z().planes() {
            assert!((plane.normal.magnitude() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn box_in_front_is_accepted() {
        let frustum = looking_down_negative_z();
        assert!(frustum.intersects_aabb(&cube(Point3::new(0.0, 0.0, -10.0), 1.0)));
    }

    #[test]
    fn box_behind_camera_is_rejected() {
        let frustum = looking_down_negative_z();
        assert!(!frustum.intersects_aabb(&cube(Point3::new(0.0, 0.0, 10.0), 1.0)));
    }

    #[test]
    fn box_outside_one_side_plane_is_rejected() {
        let frustum = looking_down_negative_z();
        // 90° fov: at depth 10 the frustum spans x in [-10, 10].
        assert!(!frustum.intersects_aabb(&cube(Point3::new(30.0, 0.0, -10.0), 1.0)));
        assert!(!frustum.intersects_aabb(&cube(Point3::new(0.0, -30.0, -10.0), 1.0)));
    }

    #[test]
    fn box_beyond_far_plane_is_rejected() {
        let frustum = looking_down_negative_z();
        assert!(!frustum.intersects_aabb(&cube(Point3::new(0.0, 0.0, -200.0), 1.0)));
    }

    #[test]
    fn straddling_box_is_accepted() {
        let frustum = looking_down_negative_z();
        assert!(frustum.intersects_aabb(&cube(Point3::new(10.0, 0.0, -10.0), 1.0)));
    }

    #[test]
    fn positive_vertex_follows_normal_signs() {
        let plane = Plane::from_coefficients(Vector4::new(1.0, -1.0, 0.0, 0.0));
        let aabb = cube(Point3::new(0.0, 0.0, 0.0), 1.0);
        assert_eq!(plane.positive_vertex(&aabb), Point3::new(1.0, -1.0, -1.0));
    }
}
