use super::PoseFilter;
use crate::constants::{DEFAULT_MEASUREMENT_NOISE, DEFAULT_PROCESS_NOISE, INITIAL_ERROR_COVARIANCE};

/// Constant-model 1-D Kalman filter for a single noisy scalar
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    // Q: how fast the true value is allowed to drift
    process_noise: f32,
    // R: how much the measurements jitter
    measurement_noise: f32,
    initial_estimate: f32,
    estimate: f32,
    error_covariance: f32,
}

impl KalmanFilter {
    /// Create a filter with explicit noise constants
    ///
    /// # Panics
    ///
    /// Panics if either noise constant is not a positive finite number.
    #[must_use]
    pub fn new(process_noise: f32, measurement_noise: f32, initial_estimate: f32) -> Self {
        assert!(
            process_noise.is_finite() && process_noise > 0.0,
            "Process noise must be positive"
        );
        assert!(
            measurement_noise.is_finite() && measurement_noise > 0.0,
            "Measurement noise must be positive"
        );
        Self {
            process_noise,
            measurement_noise,
            initial_estimate,
            estimate: initial_estimate,
            error_covariance: INITIAL_ERROR_COVARIANCE,
        }
    }

    /// Feed one measurement and return the corrected estimate.
    ///
    /// Non-finite measurements are ignored and the current estimate is returned.
    pub fn update(&mut self, measurement: f32) -> f32 {
        if !measurement.is_finite() {
            return self.estimate;
        }

        // Predict
        self.error_covariance += self.process_noise;

        // Correct
        let gain = self.error_covariance / (self.error_covariance + self.measurement_noise);
        self.estimate += gain * (measurement - self.estimate);
        self.error_covariance *= 1.0 - gain;

        self.estimate
    }

    /// Restart from `initial_estimate` with the initial error covariance
    pub fn reset_to(&mut self, initial_estimate: f32) {
        self.estimate = initial_estimate;
        self.error_covariance = INITIAL_ERROR_COVARIANCE;
    }

    /// Current estimate without updating
    #[must_use]
    pub fn estimate(&self) -> f32 {
        self.estimate
    }

    #[must_use]
    pub fn error_covariance(&self) -> f32 {
        self.error_covariance
    }

    #[must_use]
    pub fn process_noise(&self) -> f32 {
        self.process_noise
    }

    #[must_use]
    pub fn measurement_noise(&self) -> f32 {
        self.measurement_noise
    }
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new(DEFAULT_PROCESS_NOISE, DEFAULT_MEASUREMENT_NOISE, 0.0)
    }
}

impl PoseFilter for KalmanFilter {
    type Sample = f32;

    fn apply(&mut self, sample: f32) -> f32 {
        self.update(sample)
    }

    fn reset(&mut self) {
        self.reset_to(self.initial_estimate);
    }

    fn name(&self) -> &str {
        "KalmanFilter"
    }
}
