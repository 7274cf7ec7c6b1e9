//! Anchor, projection and transform composition


use std::f32::consts::FRAC_PI_2;

use nalgebra::{Matrix4, Quaternion, UnitQuaternion, Vector2, Vector3};
use proptest::prelude::*;
use test_helpers::{assert_matrix_close, translation, yaw_rotation};
use vto_pose::constants::{HIDE_OFFSET, SCREEN_SPACE_DEPTH};
use vto_pose::geometry::{
    hide_matrix, local_anchor, mirror_quaternion, normalize_quaternion, project_to_ndc, quaternion_to_matrix,
    to_world, view_space_depth, yaw_from_rotation,
};
use vto_pose::tracking::FacePose;
use vto_pose::transform::{compose_screen, compose_world};

#[test]
fn test_anchor_with_identity_pose_is_midpoint() {
    let landmarks = vec![Vector3::new(0.01, 0.03, 0.05), Vector3::new(-0.01, 0.01, 0.07)];
    let world = to_world(&local_anchor(&landmarks, 0, 1), &FacePose::identity());
    assert!((world - Vector3::new(0.0, 0.02, 0.06)).norm() < 1e-7);
}

#[test]
fn test_anchor_out_of_bounds_uses_face_origin() {
    let landmarks = vec![Vector3::new(0.01, 0.03, 0.05)];
    assert_eq!(local_anchor(&landmarks, 0, 468), Vector3::zeros());

    let pose = FacePose::new(Vector3::new(0.1, 0.2, -0.5), yaw_rotation(0.7));
    let world = to_world(&local_anchor(&landmarks, 5, 6), &pose);
    assert!((world - pose.position).norm() < 1e-6);
}

#[test]
fn test_to_world_rotates_then_translates() {
    let pose = FacePose::new(Vector3::new(0.0, 0.0, -0.5), yaw_rotation(FRAC_PI_2));
    let world = to_world(&Vector3::new(0.0, 0.0, 0.1), &pose);
    assert!((world - Vector3::new(0.1, 0.0, -0.5)).norm() < 1e-6);
}

#[test]
fn test_quaternion_matrix_matches_nalgebra() {
    let rotation = UnitQuaternion::from_euler_angles(0.2, -0.4, 0.9);
    let expected = rotation.to_homogeneous();
    assert_matrix_close(&quaternion_to_matrix(rotation.quaternion()), &expected, 1e-6);
}

#[test]
fn test_normalize_degenerate_quaternion() {
    assert_eq!(normalize_quaternion(&Quaternion::new(0.0, 0.0, 0.0, 0.0)), Quaternion::identity());
    assert_eq!(normalize_quaternion(&Quaternion::new(f32::NAN, 0.0, 0.0, 0.0)), Quaternion::identity());
    let q = normalize_quaternion(&Quaternion::new(2.0, 0.0, 0.0, 0.0));
    assert_eq!(q, Quaternion::identity());
}

#[test]
fn test_mirror_reverses_yaw() {
    let mirrored = quaternion_to_matrix(&mirror_quaternion(&yaw_rotation(0.3)));
    assert!((yaw_from_rotation(&mirrored) + 0.3).abs() < 1e-5);
}

#[test]
fn test_yaw_extraction() {
    for yaw in [-1.0, -0.12, 0.0, 0.05, 0.8] {
        let matrix = quaternion_to_matrix(&yaw_rotation(yaw));
        assert!((yaw_from_rotation(&matrix) - yaw).abs() < 1e-5);
    }
}

#[test]
fn test_projection_of_axis_point() {
    let projection = Matrix4::new_perspective(1.0, 1.0, 0.01, 10.0);
    let ndc = project_to_ndc(&Vector3::new(0.0, 0.0, -0.5), &Matrix4::identity(), &projection).unwrap();
    assert!(ndc.norm() < 1e-6);

    // A point on the camera plane has no projection
    assert!(project_to_ndc(&Vector3::new(0.1, 0.0, 0.0), &Matrix4::identity(), &projection).is_none());
}

#[test]
fn test_view_space_depth_uses_view() {
    let view = Matrix4::new_translation(&Vector3::new(0.0, 0.0, -1.0));
    assert!((view_space_depth(&Vector3::new(0.3, 0.1, 0.4), &view) - 0.6).abs() < 1e-6);
}

#[test]
fn test_hide_matrix_parks_far_away() {
    let m = hide_matrix();
    assert_eq!(translation(&m), Vector3::new(0.0, 0.0, HIDE_OFFSET));
    assert_eq!(m.fixed_view::<3, 3>(0, 0).into_owned(), nalgebra::Matrix3::identity());
}

#[test]
fn test_compose_world_scale_and_offset() {
    let m = compose_world(&Vector3::new(0.0, 0.02, -0.45), &Quaternion::identity(), 0.001, 0.004, false);
    assert!((m[(0, 0)] - 0.001).abs() < 1e-9);
    assert!((translation(&m) - Vector3::new(0.0, 0.02, -0.446)).norm() < 1e-6);
}

#[test]
fn test_compose_screen_translation() {
    let m = compose_screen(&Vector2::new(0.25, -0.5), &Quaternion::identity(), 0.5, 0.5625, true);
    assert_eq!(translation(&m), Vector3::new(-0.25, -0.5, SCREEN_SPACE_DEPTH));
    assert!((m[(1, 1)] - 0.5 * 0.5625).abs() < 1e-6);
    assert!((m[(0, 0)] - 0.5).abs() < 1e-6);
}

proptest! {
    #[test]
    fn prop_rotation_matrix_is_orthonormal(
        roll in -3.0f32..3.0,
        pitch in -1.5f32..1.5,
        yaw in -3.0f32..3.0,
    ) {
        let q = UnitQuaternion::from_euler_angles(roll, pitch, yaw);
        let m = quaternion_to_matrix(q.quaternion()).fixed_view::<3, 3>(0, 0).into_owned();
        let product = m * m.transpose();
        prop_assert!((product - nalgebra::Matrix3::identity()).norm() < 1e-4);
        prop_assert!((m.determinant() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn prop_identity_pose_anchor_is_midpoint(
        ax in -0.1f32..0.1, ay in -0.1f32..0.1, az in -0.1f32..0.1,
        bx in -0.1f32..0.1, by in -0.1f32..0.1, bz in -0.1f32..0.1,
    ) {
        let landmarks = vec![Vector3::new(ax, ay, az), Vector3::new(bx, by, bz)];
        let world = to_world(&local_anchor(&landmarks, 0, 1), &FacePose::identity());
        let midpoint = (landmarks[0] + landmarks[1]) * 0.5;
        prop_assert!((world - midpoint).norm() < 1e-6);
    }
}
