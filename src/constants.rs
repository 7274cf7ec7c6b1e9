//! Constants used throughout the pipeline

/// Kalman process noise Q tuned for ~60 Hz tracking
pub const DEFAULT_PROCESS_NOISE: f32 = 0.1;

/// Kalman measurement noise R tuned for ~60 Hz tracking
pub const DEFAULT_MEASUREMENT_NOISE: f32 = 0.05;

/// Error covariance a scalar filter starts from after construction or reset
pub const INITIAL_ERROR_COVARIANCE: f32 = 1.0;

/// Numeric precision epsilon for degenerate-input guards
pub const EPSILON: f32 = 1e-6;

/// Landmark pair whose midpoint anchors the glasses (MediaPipe nose bridge)
pub const DEFAULT_ANCHOR_LANDMARK_A: usize = 168;
pub const DEFAULT_ANCHOR_LANDMARK_B: usize = 6;

/// Physical frame width the model is scaled to, in metres
pub const DEFAULT_TARGET_WIDTH: f32 = 0.14;

/// Offset along the face's forward axis, in metres
pub const DEFAULT_FORWARD_OFFSET: f32 = 0.004;

/// Yaw gate half-width in radians (~7°)
pub const DEFAULT_YAW_THRESHOLD: f32 = 0.12;

/// Back-clip plane placement relative to the rearmost mesh vertex, in metres
pub const DEFAULT_BACK_PLANE_OFFSET: f32 = 0.01;

/// Back-clip plane extent (both halves together), in metres
pub const DEFAULT_BACK_PLANE_WIDTH: f32 = 0.2;
pub const DEFAULT_BACK_PLANE_HEIGHT: f32 = 0.25;

/// Mask buffer capacity; covers the 1220-vertex ARKit topology and the
/// 468-vertex MediaPipe topology
pub const MAX_MASK_VERTICES: usize = 1220;
pub const MAX_MASK_INDICES: usize = 2304 * 3;

/// Translation used to park hidden entities outside the frustum
pub const HIDE_OFFSET: f32 = -1000.0;

/// Fixed depth of the model in screen-space mode (inside the NDC camera range)
pub const SCREEN_SPACE_DEPTH: f32 = -0.5;

/// Default viewport used until the host reports its size
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1080;
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 1920;
