//! Pose pipeline for virtual glasses try-on.
//!
//! Given a tracked face (pose, landmark mesh, tracking state) per frame, this
//! library computes a smoothed model matrix for a pair of glasses and drives
//! the proxy geometry that hides the temples behind the head:
//! - Kalman filter banks for position, rotation and scale
//! - Anchor, projection and transform math on `nalgebra` types
//! - A yaw-gated occlusion controller for the face mask and back-clip planes
//! - A session coordinator handling tracking loss and model switching
//!
//! Rendering is left to the host through the [`scene::Scene`] trait; models
//! are fetched through [`loader::ModelSource`] on worker threads.
//!
//! # Examples
//!
//! ## Running a session
//!
//! ```no_run
//! use nalgebra::Vector3;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use vto_pose::{
//!     app::TryOnSession,
//!     config::Config,
//!     loader::DescriptorSource,
//!     scene::MemoryScene,
//!     tracking::{FaceMesh, FacePose, FaceSample},
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = Config::from_file("tryon.yaml")?;
//! config.model_url = Some("aviator".to_string());
//!
//! let mut scene = MemoryScene::new();
//! let mut session = TryOnSession::new(config, Arc::new(DescriptorSource::new("models")))?;
//! session.setup(&mut scene)?;
//! session.wait_for_model(Duration::from_secs(5), &mut scene);
//!
//! // One frame from the face tracker
//! let mesh = FaceMesh::new(vec![Vector3::zeros(); 468], Vec::new());
//! let sample = FaceSample::tracked(FacePose::identity(), mesh);
//! let report = session.render_frame(Some(&sample), None, &mut scene);
//! println!("visible: {:?}", report.visibility);
//! # Ok(())
//! # }
//! ```
//!
//! ## Using the filters directly
//!
//! ```no_run
//! use nalgebra::{Quaternion, Vector3};
//! use vto_pose::filters::{FilterState, KalmanFilter};
//!
//! let mut filter = KalmanFilter::new(0.1, 0.05, 0.0);
//! let smoothed = filter.update(1.0);
//! println!("{smoothed}");
//!
//! let mut state = FilterState::new(0.1, 0.05);
//! let position = state.position.update(&Vector3::new(0.0, 0.02, -0.45));
//! let rotation = state.rotation.update(&Quaternion::identity());
//! println!("{position:?} {rotation:?}");
//!
//! // Tracking lost: start over
//! state.reset();
//! ```

/// Kalman filters and the per-object filter state
pub mod filters;

/// Anchor, quaternion and projection math
pub mod geometry;

/// Per-frame tracker inputs
pub mod tracking;

/// Model matrix synthesis and the pose pipeline
pub mod transform;

/// Occluder geometry and yaw-gated visibility
pub mod occlusion;

/// Rendering-engine contract and in-memory scene
pub mod scene;

/// Background model loading
pub mod loader;

/// Glasses model entities and placement
pub mod glasses;

/// Visible overlay of the occluder proxies
pub mod debug;

/// Session coordinator
pub mod app;

/// Error types and result handling
pub mod error;

/// Constants used throughout the library
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
