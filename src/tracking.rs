//! Per-frame inputs supplied by the face-tracking and camera collaborators.

use nalgebra::{Matrix4, Quaternion, Vector3};

use crate::geometry::{normalize_quaternion, quaternion_to_matrix};

/// Whether the provider currently has a face lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Tracking,
    NotTracking,
}

/// Rigid face-local to world transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacePose {
    pub position: Vector3<f32>,
    /// Expected to be unit length; normalised before use
    pub rotation: Quaternion<f32>,
}

impl FacePose {
    #[must_use]
    pub fn new(position: Vector3<f32>, rotation: Quaternion<f32>) -> Self {
        Self { position, rotation }
    }

    #[must_use]
    pub fn identity() -> Self {
        Self::new(Vector3::zeros(), Quaternion::identity())
    }

    /// 4×4 affine matrix `T * R`; a degenerate rotation becomes identity
    #[must_use]
    pub fn to_matrix(&self) -> Matrix4<f32> {
        let mut matrix = quaternion_to_matrix(&normalize_quaternion(&self.rotation));
        matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.position);
        matrix
    }
}

/// Fixed-topology face mesh in face-local space
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceMesh {
    /// Index-addressable landmarks
    pub vertices: Vec<Vector3<f32>>,
    /// Triangle list
    pub indices: Vec<u16>,
}

impl FaceMesh {
    #[must_use]
    pub fn new(vertices: Vec<Vector3<f32>>, indices: Vec<u16>) -> Self {
        Self { vertices, indices }
    }

    /// Smallest face-local Z, i.e. the rearmost vertex
    #[must_use]
    pub fn min_z(&self) -> Option<f32> {
        self.vertices
            .iter()
            .map(|v| v.z)
            .filter(|z| z.is_finite())
            .reduce(f32::min)
    }
}

/// Everything the tracker reports for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FaceSample {
    pub pose: FacePose,
    pub mesh: FaceMesh,
    pub tracking_state: TrackingState,
}

impl FaceSample {
    #[must_use]
    pub fn tracked(pose: FacePose, mesh: FaceMesh) -> Self {
        Self {
            pose,
            mesh,
            tracking_state: TrackingState::Tracking,
        }
    }

    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.tracking_state == TrackingState::Tracking
    }

    /// Landmark positions in face-local space
    #[must_use]
    pub fn landmarks(&self) -> &[Vector3<f32>] {
        &self.mesh.vertices
    }
}

/// Camera matrices for the current frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
}

impl CameraFrame {
    #[must_use]
    pub fn new(view: Matrix4<f32>, projection: Matrix4<f32>) -> Self {
        Self { view, projection }
    }
}
