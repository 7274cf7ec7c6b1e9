use super::bank::{PositionFilter, QuaternionKalmanFilter, ScaleFilter, ScreenPointFilter};

/// Every filter smoothing one tracked object.
///
/// Owned by whoever manages that object's lifetime and reset as a unit when
/// tracking is lost or the model changes.
#[derive(Debug, Clone)]
pub struct FilterState {
    /// World-space anchor (world-space mode)
    pub position: PositionFilter,
    /// NDC anchor (screen-space mode)
    pub screen_point: ScreenPointFilter,
    pub rotation: QuaternionKalmanFilter,
    /// Perspective scale (screen-space mode)
    pub scale: ScaleFilter,
}

impl FilterState {
    /// # Panics
    ///
    /// Panics if either noise constant is not a positive finite number.
    #[must_use]
    pub fn new(process_noise: f32, measurement_noise: f32) -> Self {
        Self {
            position: PositionFilter::new(process_noise, measurement_noise),
            screen_point: ScreenPointFilter::new(process_noise, measurement_noise),
            rotation: QuaternionKalmanFilter::new(process_noise, measurement_noise),
            scale: ScaleFilter::new(process_noise, measurement_noise),
        }
    }

    pub fn reset(&mut self) {
        self.position.reset();
        self.screen_point.reset();
        self.rotation.reset();
        self.scale.reset();
    }

    /// True once any filter has absorbed a measurement since the last reset
    #[must_use]
    pub fn has_history(&self) -> bool {
        self.position.is_seeded()
            || self.screen_point.is_seeded()
            || self.rotation.is_seeded()
            || self.scale.is_seeded()
    }
}
