//! Statistical smoothing for every degree of freedom of the model pose.
//!
//! Tracking data jitters from frame to frame. These filters trade a little
//! lag for stability: a scalar Kalman filter per component, grouped into
//! banks for positions, screen points, scale and rotations.

/// Scalar constant-model Kalman filter
pub mod kalman;

/// Per-component filter banks for vectors and quaternions
pub mod bank;

/// Filter state owned by one tracked object
pub mod state;

pub use bank::{PositionFilter, QuaternionKalmanFilter, ScaleFilter, ScreenPointFilter, VectorKalmanFilter};
pub use kalman::KalmanFilter;
pub use state::FilterState;

/// Common interface of the pose filters
pub trait PoseFilter: Send + Sync {
    /// Value being smoothed
    type Sample;

    /// Apply filter to one measurement
    fn apply(&mut self, sample: Self::Sample) -> Self::Sample;

    /// Reset filter state
    fn reset(&mut self);

    /// Get filter name
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_share_interface() {
        fn settle<F: PoseFilter<Sample = f32>>(filter: &mut F, value: f32) -> f32 {
            let mut out = 0.0;
            for _ in 0..200 {
                out = filter.apply(value);
            }
            out
        }

        let mut kalman = KalmanFilter::default();
        assert!((settle(&mut kalman, 4.0) - 4.0).abs() < 1e-4);
        assert_eq!(kalman.name(), "KalmanFilter");

        let mut position = PositionFilter::new(0.1, 0.05);
        let mut rotation = QuaternionKalmanFilter::new(0.1, 0.05);
        assert_eq!(position.name(), "PositionFilter");
        assert_eq!(rotation.name(), "QuaternionFilter");
        position.apply(nalgebra::Vector3::new(1.0, 1.0, 1.0));
        rotation.apply(nalgebra::Quaternion::identity());
        PoseFilter::reset(&mut position);
        PoseFilter::reset(&mut rotation);
        assert!(!position.is_seeded() && !rotation.is_seeded());
    }
}
