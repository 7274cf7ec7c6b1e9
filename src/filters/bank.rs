//! Banks of independent scalar Kalman filters for vectors and quaternions.
//!
//! Every component gets its own [`KalmanFilter`]; the bank resets them
//! together and seeds them from the first measurement it sees afterwards, so
//! re-acquisition never drags through a stale estimate.

use nalgebra::{Quaternion, SVector, Vector1, Vector2, Vector3};

use super::{kalman::KalmanFilter, PoseFilter};
use crate::geometry::normalize_quaternion;

/// `D` independent scalar filters smoothing one `D`-dimensional measurement
#[derive(Debug, Clone)]
pub struct VectorKalmanFilter<const D: usize> {
    channels: [KalmanFilter; D],
    seeded: bool,
}

/// World-space anchor position
pub type PositionFilter = VectorKalmanFilter<3>;

/// Normalised-device-coordinate anchor point
pub type ScreenPointFilter = VectorKalmanFilter<2>;

/// Derived screen-space scale
pub type ScaleFilter = VectorKalmanFilter<1>;

impl<const D: usize> VectorKalmanFilter<D> {
    /// # Panics
    ///
    /// Panics if either noise constant is not a positive finite number.
    #[must_use]
    pub fn new(process_noise: f32, measurement_noise: f32) -> Self {
        Self {
            channels: std::array::from_fn(|_| KalmanFilter::new(process_noise, measurement_noise, 0.0)),
            seeded: false,
        }
    }

    /// Smooth one measurement, component by component
    pub fn update(&mut self, measurement: &SVector<f32, D>) -> SVector<f32, D> {
        if !self.seeded && measurement.iter().all(|v| v.is_finite()) {
            for (channel, &value) in self.channels.iter_mut().zip(measurement.iter()) {
                channel.reset_to(value);
            }
            self.seeded = true;
        }

        let channels = &mut self.channels;
        SVector::from_fn(|i, _| channels[i].update(measurement[i]))
    }

    #[must_use]
    pub fn estimate(&self) -> SVector<f32, D> {
        SVector::from_fn(|i, _| self.channels[i].estimate())
    }

    /// Whether a measurement has been absorbed since the last reset
    #[must_use]
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.reset_to(0.0);
        }
        self.seeded = false;
    }

    #[must_use]
    pub fn channels(&self) -> &[KalmanFilter; D] {
        &self.channels
    }
}

impl ScaleFilter {
    /// Scalar convenience wrapper
    pub fn update_scalar(&mut self, measurement: f32) -> f32 {
        self.update(&Vector1::new(measurement))[0]
    }
}

impl PoseFilter for VectorKalmanFilter<3> {
    type Sample = Vector3<f32>;

    fn apply(&mut self, sample: Vector3<f32>) -> Vector3<f32> {
        self.update(&sample)
    }

    fn reset(&mut self) {
        VectorKalmanFilter::reset(self);
    }

    fn name(&self) -> &str {
        "PositionFilter"
    }
}

impl PoseFilter for VectorKalmanFilter<2> {
    type Sample = Vector2<f32>;

    fn apply(&mut self, sample: Vector2<f32>) -> Vector2<f32> {
        self.update(&sample)
    }

    fn reset(&mut self) {
        VectorKalmanFilter::reset(self);
    }

    fn name(&self) -> &str {
        "ScreenPointFilter"
    }
}

/// Four scalar filters over the quaternion components, renormalised jointly
#[derive(Debug, Clone)]
pub struct QuaternionKalmanFilter {
    components: VectorKalmanFilter<4>,
}

impl QuaternionKalmanFilter {
    /// # Panics
    ///
    /// Panics if either noise constant is not a positive finite number.
    #[must_use]
    pub fn new(process_noise: f32, measurement_noise: f32) -> Self {
        Self {
            components: VectorKalmanFilter::new(process_noise, measurement_noise),
        }
    }

    /// Smooth a rotation and return a unit quaternion
    pub fn update(&mut self, rotation: &Quaternion<f32>) -> Quaternion<f32> {
        let mut coords = rotation.coords;

        // q and -q are the same rotation; stay on the estimate's hemisphere
        if self.components.is_seeded() && self.components.estimate().dot(&coords) < 0.0 {
            coords = -coords;
        }

        let filtered = self.components.update(&coords);
        normalize_quaternion(&Quaternion::from_vector(filtered))
    }

    #[must_use]
    pub fn estimate(&self) -> Quaternion<f32> {
        normalize_quaternion(&Quaternion::from_vector(self.components.estimate()))
    }

    #[must_use]
    pub fn is_seeded(&self) -> bool {
        self.components.is_seeded()
    }

    pub fn reset(&mut self) {
        self.components.reset();
    }
}

impl PoseFilter for QuaternionKalmanFilter {
    type Sample = Quaternion<f32>;

    fn apply(&mut self, sample: Quaternion<f32>) -> Quaternion<f32> {
        self.update(&sample)
    }

    fn reset(&mut self) {
        QuaternionKalmanFilter::reset(self);
    }

    fn name(&self) -> &str {
        "QuaternionFilter"
    }
}
