//! Configuration management for the try-on pipeline

use crate::constants::{
    DEFAULT_ANCHOR_LANDMARK_A, DEFAULT_ANCHOR_LANDMARK_B, DEFAULT_BACK_PLANE_HEIGHT, DEFAULT_BACK_PLANE_OFFSET,
    DEFAULT_BACK_PLANE_WIDTH, DEFAULT_FORWARD_OFFSET, DEFAULT_MEASUREMENT_NOISE, DEFAULT_PROCESS_NOISE,
    DEFAULT_TARGET_WIDTH, DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH, DEFAULT_YAW_THRESHOLD,
};
use crate::occlusion::{BackPlaneGeometry, OcclusionSettings, YawGate};
use crate::transform::{AnchorMode, PipelineParams};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Start with rendering active
    pub active: bool,

    /// How the model is anchored to the camera image
    pub render_mode: AnchorMode,

    /// Camera feed is shown mirrored (front-facing camera)
    pub mirror: bool,

    /// Model loaded at setup
    pub model_url: Option<String>,

    /// Show the occluder proxies as visible geometry
    pub debug_overlay: bool,

    /// Anchor placement
    pub anchor: AnchorConfig,

    /// Kalman filter constants
    pub filter: FilterConfig,

    /// Occlusion proxies
    pub occlusion: OcclusionConfig,

    /// Render target size
    pub viewport: ViewportConfig,
}

/// Anchor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    /// First landmark of the anchor pair
    pub landmark_a: usize,

    /// Second landmark of the anchor pair
    pub landmark_b: usize,

    /// Offset along the face's forward axis in metres
    pub forward_offset: f32,

    /// Physical width of the glasses in metres
    pub target_width: f32,
}

/// Filter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Process noise Q
    pub process_noise: f32,

    /// Measurement noise R
    pub measurement_noise: f32,
}

/// Occlusion configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcclusionConfig {
    pub face_mesh: bool,
    pub left_back_plane: bool,
    pub right_back_plane: bool,

    /// Yaw gate threshold in radians
    pub yaw_threshold: f32,

    /// Distance in front of the rearmost mesh vertex in metres
    pub back_plane_offset: f32,

    pub back_plane_width: f32,
    pub back_plane_height: f32,
}

/// Viewport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            active: true,
            render_mode: AnchorMode::WorldSpace,
            mirror: false,
            model_url: None,
            debug_overlay: false,
            anchor: AnchorConfig::default(),
            filter: FilterConfig::default(),
            occlusion: OcclusionConfig::default(),
            viewport: ViewportConfig::default(),
        }
    }
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            landmark_a: DEFAULT_ANCHOR_LANDMARK_A,
            landmark_b: DEFAULT_ANCHOR_LANDMARK_B,
            forward_offset: DEFAULT_FORWARD_OFFSET,
            target_width: DEFAULT_TARGET_WIDTH,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            process_noise: DEFAULT_PROCESS_NOISE,
            measurement_noise: DEFAULT_MEASUREMENT_NOISE,
        }
    }
}

impl Default for OcclusionConfig {
    fn default() -> Self {
        Self {
            face_mesh: true,
            left_back_plane: true,
            right_back_plane: true,
            yaw_threshold: DEFAULT_YAW_THRESHOLD,
            back_plane_offset: DEFAULT_BACK_PLANE_OFFSET,
            back_plane_width: DEFAULT_BACK_PLANE_WIDTH,
            back_plane_height: DEFAULT_BACK_PLANE_HEIGHT,
        }
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_VIEWPORT_WIDTH,
            height: DEFAULT_VIEWPORT_HEIGHT,
        }
    }
}

impl ViewportConfig {
    /// Width over height, 1.0 for a zero height
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        aspect_ratio(self.width, self.height)
    }
}

/// Width over height, 1.0 for a zero height
#[must_use]
pub fn aspect_ratio(width: u32, height: u32) -> f32 {
    if height == 0 {
        return 1.0;
    }
    width as f32 / height as f32
}

impl OcclusionConfig {
    #[must_use]
    pub fn settings(&self) -> OcclusionSettings {
        OcclusionSettings {
            face_mesh: self.face_mesh,
            left_back_plane: self.left_back_plane,
            right_back_plane: self.right_back_plane,
        }
    }

    /// # Panics
    ///
    /// Panics on a negative threshold; call [`Config::validate`] first.
    #[must_use]
    pub fn yaw_gate(&self) -> YawGate {
        YawGate::new(self.yaw_threshold)
    }

    #[must_use]
    pub fn back_planes(&self) -> BackPlaneGeometry {
        BackPlaneGeometry {
            offset: self.back_plane_offset,
            width: self.back_plane_width,
            height: self.back_plane_height,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Pipeline parameters for a model with unit base scale
    #[must_use]
    pub fn pipeline_params(&self) -> PipelineParams {
        PipelineParams {
            mode: self.render_mode,
            landmark_a: self.anchor.landmark_a,
            landmark_b: self.anchor.landmark_b,
            forward_offset: self.anchor.forward_offset,
            mirror: self.mirror,
            base_scale: 1.0,
            aspect_ratio: self.viewport.aspect_ratio(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Filter constants
        if !(self.filter.process_noise.is_finite() && self.filter.process_noise > 0.0) {
            return Err(Error::ConfigError("Process noise must be positive".to_string()));
        }
        if !(self.filter.measurement_noise.is_finite() && self.filter.measurement_noise > 0.0) {
            return Err(Error::ConfigError("Measurement noise must be positive".to_string()));
        }

        // Anchor
        if self.anchor.landmark_a == self.anchor.landmark_b {
            return Err(Error::ConfigError(
                "Anchor landmarks must be two different vertices".to_string(),
            ));
        }
        if !(self.anchor.target_width.is_finite() && self.anchor.target_width > 0.0) {
            return Err(Error::ConfigError("Target width must be positive".to_string()));
        }
        if !self.anchor.forward_offset.is_finite() {
            return Err(Error::ConfigError("Forward offset must be finite".to_string()));
        }

        // Occlusion
        if !(self.occlusion.yaw_threshold.is_finite() && self.occlusion.yaw_threshold > 0.0) {
            return Err(Error::ConfigError("Yaw threshold must be positive".to_string()));
        }
        if !self.occlusion.back_plane_offset.is_finite() {
            return Err(Error::ConfigError("Back plane offset must be finite".to_string()));
        }
        if !(self.occlusion.back_plane_width > 0.0 && self.occlusion.back_plane_height > 0.0) {
            return Err(Error::ConfigError(
                "Back plane dimensions must be positive".to_string(),
            ));
        }

        // Viewport
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::ConfigError(
                "Viewport dimensions must be greater than 0".to_string(),
            ));
        }

        if let Some(url) = &self.model_url {
            if url.trim().is_empty() {
                return Err(Error::ConfigError("Model URL must not be empty".to_string()));
            }
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Virtual try-on configuration

active: true
# world_space: renderer camera follows the tracker
# screen_space: fixed orthographic camera, model placed in NDC
render_mode: world_space
mirror: false
model_url: "aviator"
debug_overlay: false

# Anchor between two face mesh landmarks
anchor:
  landmark_a: 168
  landmark_b: 6
  forward_offset: 0.004
  target_width: 0.14

# Kalman filter constants
filter:
  process_noise: 0.1
  measurement_noise: 0.05

# Occlusion proxies
occlusion:
  face_mesh: true
  left_back_plane: true
  right_back_plane: true
  yaw_threshold: 0.12
  back_plane_offset: 0.01
  back_plane_width: 0.2
  back_plane_height: 0.25

# Render target
viewport:
  width: 1080
  height: 1920
"#;
