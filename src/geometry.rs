//! Anchor and projection math shared by both anchoring modes.
//!
//! All matrices are `nalgebra::Matrix4<f32>` (column-major storage, indexed
//! `(row, column)`), points are face-local or world-space `Vector3<f32>`.

use log::debug;
use nalgebra::{Matrix4, Point3, Quaternion, Vector2, Vector3, Vector4};

use crate::constants::{EPSILON, HIDE_OFFSET};
use crate::tracking::FacePose;

/// Midpoint of two landmarks in face-local space.
///
/// Falls back to the face origin when either index is outside the landmark
/// array or a landmark is not finite.
#[must_use]
pub fn local_anchor(landmarks: &[Vector3<f32>], index_a: usize, index_b: usize) -> Vector3<f32> {
    match (landmarks.get(index_a), landmarks.get(index_b)) {
        (Some(a), Some(b)) if a.iter().chain(b.iter()).all(|v| v.is_finite()) => (a + b) * 0.5,
        _ => {
            debug!(
                "Anchor landmarks {index_a}/{index_b} unavailable in {} vertices, using face origin",
                landmarks.len()
            );
            Vector3::zeros()
        }
    }
}

/// Apply the face pose to a face-local point
#[must_use]
pub fn to_world(local_point: &Vector3<f32>, face_pose: &FacePose) -> Vector3<f32> {
    face_pose.to_matrix().transform_point(&Point3::from(*local_point)).coords
}

/// Rotation matrix from a quaternion using the closed form.
///
/// No normalisation is performed; pass unit quaternions.
#[must_use]
pub fn quaternion_to_matrix(q: &Quaternion<f32>) -> Matrix4<f32> {
    let (w, x, y, z) = (q.w, q.i, q.j, q.k);

    let xx = x * x;
    let yy = y * y;
    let zz = z * z;
    let xy = x * y;
    let xz = x * z;
    let yz = y * z;
    let wx = w * x;
    let wy = w * y;
    let wz = w * z;

    Matrix4::new(
        1.0 - 2.0 * (yy + zz), 2.0 * (xy - wz),       2.0 * (xz + wy),       0.0,
        2.0 * (xy + wz),       1.0 - 2.0 * (xx + zz), 2.0 * (yz - wx),       0.0,
        2.0 * (xz - wy),       2.0 * (yz + wx),       1.0 - 2.0 * (xx + yy), 0.0,
        0.0,                   0.0,                   0.0,                   1.0,
    )
}

/// Unit-length copy of `q`, or identity when `q` is near zero or not finite
#[must_use]
pub fn normalize_quaternion(q: &Quaternion<f32>) -> Quaternion<f32> {
    let norm = q.norm();
    if !norm.is_finite() || norm < EPSILON {
        return Quaternion::identity();
    }
    q.normalize()
}

/// Reflect a rotation across the YZ plane, matching a horizontally mirrored feed
#[must_use]
pub fn mirror_quaternion(q: &Quaternion<f32>) -> Quaternion<f32> {
    Quaternion::new(q.w, q.i, -q.j, -q.k)
}

/// Project a world point to normalised device coordinates.
///
/// Returns `None` when the point sits on the camera plane (`w ≈ 0`).
#[must_use]
pub fn project_to_ndc(world_point: &Vector3<f32>, view: &Matrix4<f32>, projection: &Matrix4<f32>) -> Option<Vector2<f32>> {
    let clip = projection * view * Vector4::new(world_point.x, world_point.y, world_point.z, 1.0);
    if !clip.w.is_finite() || clip.w.abs() < EPSILON {
        return None;
    }
    Some(Vector2::new(clip.x / clip.w, clip.y / clip.w))
}

/// Absolute Z of a world point after the view transform
#[must_use]
pub fn view_space_depth(world_point: &Vector3<f32>, view: &Matrix4<f32>) -> f32 {
    view.transform_point(&Point3::from(*world_point)).z.abs()
}

/// Head yaw in radians, `atan2(R[2][0], R[0][0])` in column-major terms
#[must_use]
pub fn yaw_from_rotation(rotation: &Matrix4<f32>) -> f32 {
    rotation[(0, 2)].atan2(rotation[(0, 0)])
}

/// Identity rotation and scale, parked far outside the frustum
#[must_use]
pub fn hide_matrix() -> Matrix4<f32> {
    Matrix4::new_translation(&Vector3::new(0.0, 0.0, HIDE_OFFSET))
}

/// Orthographic camera spanning normalised device coordinates
#[must_use]
pub fn ndc_projection() -> Matrix4<f32> {
    Matrix4::new_orthographic(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0)
}
