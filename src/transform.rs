//! Transform synthesis: filtered anchor, scale and rotation into one model matrix.

use log::debug;
use nalgebra::{Matrix4, Quaternion, Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::constants::{EPSILON, SCREEN_SPACE_DEPTH};
use crate::filters::FilterState;
use crate::geometry::{
    local_anchor, mirror_quaternion, normalize_quaternion, project_to_ndc, quaternion_to_matrix, to_world,
    view_space_depth,
};
use crate::tracking::{CameraFrame, FacePose, FaceSample};

/// How the model is anchored to the camera image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnchorMode {
    /// Renderer camera driven by the tracker; model placed in world space
    #[default]
    WorldSpace,
    /// Fixed orthographic camera; model placed in normalised device coordinates
    ScreenSpace,
}

/// Fixed inputs of the pipeline for one session and model
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineParams {
    pub mode: AnchorMode,
    pub landmark_a: usize,
    pub landmark_b: usize,
    /// Metres along the face's forward axis (world-space mode)
    pub forward_offset: f32,
    /// Front-facing camera feed shown mirrored
    pub mirror: bool,
    /// Model units to metres, from the bounding box
    pub base_scale: f32,
    /// Viewport width / height (screen-space mode)
    pub aspect_ratio: f32,
}

/// `Rotation * Scale` with the translation placed in world space.
///
/// The forward offset is applied along the rotated local Z axis.
#[must_use]
pub fn compose_world(
    position: &Vector3<f32>,
    rotation: &Quaternion<f32>,
    scale: f32,
    forward_offset: f32,
    mirror: bool,
) -> Matrix4<f32> {
    let forward = quaternion_to_matrix(rotation).fixed_view::<3, 1>(0, 2) * forward_offset;
    let mut translation = position + forward;

    let rotation = if mirror {
        translation.x = -translation.x;
        mirror_quaternion(rotation)
    } else {
        *rotation
    };

    let mut matrix = quaternion_to_matrix(&rotation) * Matrix4::new_scaling(scale);
    matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
    matrix
}

/// Reflect a face-local to display transform across the YZ plane.
///
/// Returns `S * m * S` with `S = diag(-1, 1, 1, 1)`. Geometry placed with the
/// result must itself be reflected (X negated, winding reversed).
#[must_use]
pub fn mirror_transform(m: &Matrix4<f32>) -> Matrix4<f32> {
    let mut mirrored = *m;
    for i in 1..4 {
        mirrored[(0, i)] = -mirrored[(0, i)];
        mirrored[(i, 0)] = -mirrored[(i, 0)];
    }
    mirrored
}

/// Face-local to display transform for face-anchored geometry in one frame.
///
/// Occluders and debug geometry are placed with this so they land where the
/// glasses are drawn, in the same anchoring mode and mirroring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacePlacement {
    pub matrix: Matrix4<f32>,
    /// Face-local geometry must be reflected before `matrix` is applied
    pub mirrored: bool,
}

impl FacePlacement {
    /// Unmirrored world-space placement straight from the face pose
    #[must_use]
    pub fn from_pose(pose: &FacePose) -> Self {
        Self {
            matrix: pose.to_matrix(),
            mirrored: false,
        }
    }
}

/// `Rotation * Scale` placed at an NDC point, Y row corrected for aspect.
///
/// The aspect correction is applied after rotation so a rolled head does not
/// shear the model.
#[must_use]
pub fn compose_screen(
    ndc: &Vector2<f32>,
    rotation: &Quaternion<f32>,
    scale: f32,
    aspect_ratio: f32,
    mirror: bool,
) -> Matrix4<f32> {
    let rotation = if mirror { mirror_quaternion(rotation) } else { *rotation };
    let mut matrix = quaternion_to_matrix(&rotation) * Matrix4::new_scaling(scale);

    for column in 0..3 {
        matrix[(1, column)] *= aspect_ratio;
    }

    let x = if mirror { -ndc.x } else { ndc.x };
    matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(&Vector3::new(x, ndc.y, SCREEN_SPACE_DEPTH));
    matrix
}

/// Per-frame pose pipeline for one tracked object.
///
/// Anchor extraction, filtering and composition. The pipeline owns its
/// [`FilterState`]; [`PosePipeline::reset`] clears all smoothing history.
#[derive(Debug, Clone)]
pub struct PosePipeline {
    params: PipelineParams,
    filters: FilterState,
}

impl PosePipeline {
    /// # Panics
    ///
    /// Panics if either noise constant is not a positive finite number.
    #[must_use]
    pub fn new(params: PipelineParams, process_noise: f32, measurement_noise: f32) -> Self {
        Self {
            params,
            filters: FilterState::new(process_noise, measurement_noise),
        }
    }

    #[must_use]
    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    #[must_use]
    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn set_base_scale(&mut self, base_scale: f32) {
        self.params.base_scale = base_scale;
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.params.aspect_ratio = aspect_ratio;
    }

    pub fn reset(&mut self) {
        self.filters.reset();
    }

    /// Where face-local geometry goes this frame, without touching the filters.
    ///
    /// World-space mode uses the face pose. Screen-space mode uses the same
    /// projected anchor, `P00 / depth` scale and aspect row as the model, so
    /// a face-local point `p` lands at `ndc + A * R * (p - anchor) * P00 / depth`.
    /// Returns `None` when the frame cannot be placed.
    #[must_use]
    pub fn face_placement(&self, sample: &FaceSample, camera: Option<&CameraFrame>) -> Option<FacePlacement> {
        let matrix = match self.params.mode {
            AnchorMode::WorldSpace => sample.pose.to_matrix(),
            AnchorMode::ScreenSpace => {
                let camera = camera?;
                let local = local_anchor(sample.landmarks(), self.params.landmark_a, self.params.landmark_b);
                let world = to_world(&local, &sample.pose);
                let ndc = project_to_ndc(&world, &camera.view, &camera.projection)?;
                let depth = view_space_depth(&world, &camera.view);
                let focal_length = camera.projection[(0, 0)];
                if depth <= EPSILON || !focal_length.is_finite() {
                    return None;
                }

                let rotation = normalize_quaternion(&sample.pose.rotation);
                let mut matrix = quaternion_to_matrix(&rotation) * Matrix4::new_scaling(focal_length / depth);
                for column in 0..3 {
                    matrix[(1, column)] *= self.params.aspect_ratio;
                }
                Matrix4::new_translation(&Vector3::new(ndc.x, ndc.y, SCREEN_SPACE_DEPTH))
                    * matrix
                    * Matrix4::new_translation(&-local)
            }
        };

        Some(if self.params.mirror {
            FacePlacement {
                matrix: mirror_transform(&matrix),
                mirrored: true,
            }
        } else {
            FacePlacement { matrix, mirrored: false }
        })
    }

    /// Model matrix for this frame.
    ///
    /// Returns `None` when the frame cannot be placed (screen-space mode
    /// without camera matrices, or an anchor on the camera plane); the caller
    /// keeps the previous transform in that case.
    pub fn compute(&mut self, sample: &FaceSample, camera: Option<&CameraFrame>) -> Option<Matrix4<f32>> {
        let local = local_anchor(sample.landmarks(), self.params.landmark_a, self.params.landmark_b);
        let world = to_world(&local, &sample.pose);

        match self.params.mode {
            AnchorMode::WorldSpace => {
                let position = self.filters.position.update(&world);
                let rotation = self.filters.rotation.update(&sample.pose.rotation);
                Some(compose_world(
                    &position,
                    &rotation,
                    self.params.base_scale,
                    self.params.forward_offset,
                    self.params.mirror,
                ))
            }
            AnchorMode::ScreenSpace => {
                let Some(camera) = camera else {
                    debug!("Screen-space frame without camera matrices, holding transform");
                    return None;
                };
                let Some(ndc) = project_to_ndc(&world, &camera.view, &camera.projection) else {
                    debug!("Anchor projects onto the camera plane, holding transform");
                    return None;
                };

                let depth = view_space_depth(&world, &camera.view);
                let focal_length = camera.projection[(0, 0)];
                let scale = if depth > EPSILON && focal_length.is_finite() {
                    self.filters.scale.update_scalar(self.params.base_scale * focal_length / depth)
                } else if self.filters.scale.is_seeded() {
                    self.filters.scale.estimate()[0]
                } else {
                    debug!("Degenerate anchor depth {depth}, holding transform");
                    return None;
                };

                let ndc = self.filters.screen_point.update(&ndc);
                let rotation = self.filters.rotation.update(&sample.pose.rotation);
                Some(compose_screen(
                    &ndc,
                    &rotation,
                    scale,
                    self.params.aspect_ratio,
                    self.params.mirror,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{FaceMesh, FacePose};
    use nalgebra::UnitQuaternion;

    fn params(mode: AnchorMode) -> PipelineParams {
        PipelineParams {
            mode,
            landmark_a: 0,
            landmark_b: 1,
            forward_offset: 0.0,
            mirror: false,
            base_scale: 1.0,
            aspect_ratio: 1.0,
        }
    }

    fn sample(position: Vector3<f32>) -> FaceSample {
        let mesh = FaceMesh::new(vec![Vector3::new(-0.01, 0.02, 0.03), Vector3::new(0.01, 0.02, 0.03)], vec![]);
        FaceSample::tracked(FacePose::new(position, Quaternion::identity()), mesh)
    }

    #[test]
    fn test_compose_world_identity() {
        let m = compose_world(&Vector3::new(0.1, 0.2, 0.3), &Quaternion::identity(), 2.0, 0.0, false);
        assert_eq!(m[(0, 0)], 2.0);
        assert_eq!(m[(1, 1)], 2.0);
        assert_eq!(m[(0, 3)], 0.1);
        assert_eq!(m[(2, 3)], 0.3);
    }

    #[test]
    fn test_compose_world_forward_offset_follows_rotation() {
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f32::consts::FRAC_PI_2);
        let m = compose_world(&Vector3::zeros(), rotation.quaternion(), 1.0, 0.01, false);
        assert!((m[(0, 3)] - 0.01).abs() < 1e-6);
        assert!(m[(2, 3)].abs() < 1e-6);
    }

    #[test]
    fn test_compose_world_mirror() {
        let m = compose_world(&Vector3::new(0.1, 0.0, -0.4), &Quaternion::identity(), 1.0, 0.0, true);
        assert_eq!(m[(0, 3)], -0.1);
        assert_eq!(m[(2, 3)], -0.4);

        // Forward offset of a turned head is reflected along with the position
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f32::consts::FRAC_PI_2);
        let plain = compose_world(&Vector3::zeros(), rotation.quaternion(), 1.0, 0.01, false);
        let mirrored = compose_world(&Vector3::zeros(), rotation.quaternion(), 1.0, 0.01, true);
        assert!((plain[(0, 3)] - 0.01).abs() < 1e-6);
        assert!((mirrored[(0, 3)] + 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_mirror_transform_reflects_placed_points() {
        let rotation = UnitQuaternion::from_euler_angles(0.1, 0.4, -0.2);
        let pose = FacePose::new(Vector3::new(0.1, -0.05, -0.5), rotation.into_inner()).to_matrix();
        let mirrored = mirror_transform(&pose);

        let point = nalgebra::Point3::new(0.03, 0.01, -0.02);
        let reflected = nalgebra::Point3::new(-point.x, point.y, point.z);
        let expected = pose.transform_point(&point);
        let actual = mirrored.transform_point(&reflected);
        assert!((actual.x + expected.x).abs() < 1e-6);
        assert!((actual.y - expected.y).abs() < 1e-6);
        assert!((actual.z - expected.z).abs() < 1e-6);
    }

    #[test]
    fn test_compose_screen_aspect_after_rotation() {
        // 90° roll: without post-rotation correction the X axis would be stretched
        let roll = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f32::consts::FRAC_PI_2);
        let m = compose_screen(&Vector2::new(0.2, -0.1), roll.quaternion(), 1.0, 2.0, false);

        // Rotated model X axis points along screen Y and is scaled by the aspect ratio
        assert!((m[(1, 0)] - 2.0).abs() < 1e-6);
        assert!(m[(0, 0)].abs() < 1e-6);
        // Model Y axis points along screen -X and is left untouched
        assert!((m[(0, 1)] + 1.0).abs() < 1e-6);
        assert_eq!(m[(0, 3)], 0.2);
        assert_eq!(m[(1, 3)], -0.1);
        assert_eq!(m[(2, 3)], SCREEN_SPACE_DEPTH);
    }

    #[test]
    fn test_world_pipeline_first_frame_is_unsmoothed() {
        let mut pipeline = PosePipeline::new(params(AnchorMode::WorldSpace), 0.1, 0.05);
        let m = pipeline.compute(&sample(Vector3::new(0.0, 0.0, -0.5)), None).unwrap();
        assert!((m[(0, 3)]).abs() < 1e-6);
        assert!((m[(1, 3)] - 0.02).abs() < 1e-6);
        assert!((m[(2, 3)] - (-0.47)).abs() < 1e-6);
    }

    #[test]
    fn test_screen_pipeline_needs_camera() {
        let mut pipeline = PosePipeline::new(params(AnchorMode::ScreenSpace), 0.1, 0.05);
        assert!(pipeline.compute(&sample(Vector3::new(0.0, 0.0, -0.5)), None).is_none());
        assert!(!pipeline.filters().has_history());
    }

    #[test]
    fn test_screen_pipeline_scale_from_depth() {
        let mut pipeline = PosePipeline::new(params(AnchorMode::ScreenSpace), 0.1, 0.05);
        let projection = Matrix4::new_perspective(1.0, 1.0, 0.01, 10.0);
        let camera = CameraFrame::new(Matrix4::identity(), projection);

        let m = pipeline.compute(&sample(Vector3::new(0.0, -0.02, -0.53)), Some(&camera)).unwrap();
        // Anchor lands at z = -0.5, so scale = P00 / 0.5
        let expected = projection[(0, 0)] / 0.5;
        assert!((m[(0, 0)] - expected).abs() < 1e-4);
        assert!(m[(0, 3)].abs() < 1e-6);
        assert!(m[(1, 3)].abs() < 1e-6);
    }
}
