//! Session coordinator: tracking lifecycle, model switching and the
//! per-frame drive of the glasses, occlusion and debug renderers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use nalgebra::Matrix4;

use crate::config::{aspect_ratio, Config};
use crate::debug::DebugOverlay;
use crate::error::{Error, Result};
use crate::geometry::ndc_projection;
use crate::glasses::GlassesRenderer;
use crate::loader::{AssetLoader, LoadOutcome, LoadState, ModelSource, RequestId};
use crate::occlusion::{OcclusionController, OcclusionSettings, Visibility};
use crate::scene::Scene;
use crate::tracking::{CameraFrame, FaceSample};
use crate::transform::AnchorMode;

/// Completion signal for a model request that was not superseded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
    Loaded { url: String },
    Failed { url: String, reason: String },
}

/// What one call to [`TryOnSession::render_frame`] did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// A face was tracked and the session is active
    pub tracking: bool,
    /// Model transform written this frame, `None` if hidden or held
    pub transform: Option<Matrix4<f32>>,
    pub visibility: Visibility,
}

type LoadCallback = Box<dyn FnMut(&LoadEvent) + Send>;

/// Owns everything one try-on view needs and runs it frame by frame.
///
/// All methods are meant to be called from the render thread. Model loads
/// run on worker threads and are applied at the start of the next frame.
pub struct TryOnSession {
    config: Config,
    loader: AssetLoader,
    glasses: GlassesRenderer,
    occlusion: OcclusionController,
    debug: DebugOverlay,
    active: bool,
    viewport: (u32, u32),
    load_state: LoadState,
    on_load: Option<LoadCallback>,
    was_tracking: bool,
    discarded_loads: usize,
}

impl TryOnSession {
    /// Create a session from a validated configuration
    pub fn new(config: Config, source: Arc<dyn ModelSource>) -> Result<Self> {
        config.validate()?;
        info!(
            "Creating try-on session ({:?}, mirror {})",
            config.render_mode, config.mirror
        );

        let glasses = GlassesRenderer::new(
            config.pipeline_params(),
            config.filter.process_noise,
            config.filter.measurement_noise,
            config.anchor.target_width,
        );
        let occlusion = OcclusionController::new(
            config.occlusion.settings(),
            config.occlusion.yaw_gate(),
            config.occlusion.back_planes(),
        );

        Ok(Self {
            loader: AssetLoader::new(source),
            glasses,
            occlusion,
            debug: DebugOverlay::new(config.debug_overlay),
            active: config.active,
            viewport: (config.viewport.width, config.viewport.height),
            load_state: LoadState::Idle,
            on_load: None,
            was_tracking: false,
            discarded_loads: 0,
            config,
        })
    }

    /// Create the session's entities and request the configured model
    pub fn setup(&mut self, scene: &mut dyn Scene) -> Result<()> {
        self.occlusion.setup(scene);
        self.debug.setup(scene);

        if self.config.render_mode == AnchorMode::ScreenSpace {
            scene.set_camera(&Matrix4::identity(), &ndc_projection());
        }

        if let Some(url) = self.config.model_url.clone() {
            self.switch_model(&url)?;
        }
        Ok(())
    }

    /// Register the model-loaded callback
    pub fn set_on_load<F>(&mut self, callback: F)
    where
        F: FnMut(&LoadEvent) + Send + 'static,
    {
        self.on_load = Some(Box::new(callback));
    }

    /// Process one display frame.
    ///
    /// Finished loads are applied first. Without an active session or a
    /// tracked face every managed entity is hidden and all filters reset.
    pub fn render_frame(
        &mut self,
        sample: Option<&FaceSample>,
        camera: Option<&CameraFrame>,
        scene: &mut dyn Scene,
    ) -> FrameReport {
        self.apply_finished_loads(scene);

        let tracked = sample.filter(|s| s.is_tracking());
        let Some(sample) = tracked.filter(|_| self.active) else {
            if self.was_tracking {
                info!("Tracking lost, hiding glasses");
                self.was_tracking = false;
            }
            self.hide_all(scene);
            return FrameReport {
                tracking: false,
                transform: None,
                visibility: self.occlusion.visibility(),
            };
        };

        if !self.was_tracking {
            info!("Tracking acquired");
            self.was_tracking = true;
        }

        if self.config.render_mode == AnchorMode::WorldSpace {
            if let Some(camera) = camera {
                scene.set_camera(&camera.view, &camera.projection);
            }
        }

        let transform = self.glasses.update(sample, camera, scene);
        let visibility = match self.glasses.pipeline().face_placement(sample, camera) {
            Some(placement) => self.occlusion.update_placed(sample, &placement, scene),
            None => {
                debug!("Face cannot be placed this frame, holding occluders");
                self.occlusion.visibility()
            }
        };
        self.debug.update(&self.occlusion, scene);

        FrameReport {
            tracking: true,
            transform,
            visibility,
        }
    }

    /// Request a different model.
    ///
    /// The displayed model stays until the new one is loaded. A newer request
    /// supersedes an older one still in flight.
    ///
    /// # Errors
    ///
    /// [`Error::LoadInProgress`] if `url` is the request already in flight,
    /// [`Error::LoaderUnavailable`] if no worker could be started.
    pub fn switch_model(&mut self, url: &str) -> Result<RequestId> {
        if url.trim().is_empty() {
            return Err(Error::InvalidInput("Model URL must not be empty".to_string()));
        }
        if let LoadState::Loading { url: loading, .. } = &self.load_state {
            if loading == url {
                return Err(Error::LoadInProgress(url.to_string()));
            }
            info!("Superseding load of {loading} with {url}");
        }

        let request = self.loader.request(url)?;
        info!("Loading model {url} (request {request})");
        self.load_state = LoadState::Loading {
            request,
            url: url.to_string(),
        };
        Ok(request)
    }

    /// Block until the current request completes and apply it.
    ///
    /// Returns `false` if nothing was loading or the timeout expired.
    pub fn wait_for_model(&mut self, timeout: Duration, scene: &mut dyn Scene) -> bool {
        let deadline = Instant::now() + timeout;
        while matches!(self.load_state, LoadState::Loading { .. }) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.loader.wait(remaining) {
                Some(outcome) => self.apply_outcome(outcome, scene),
                None => return false,
            }
        }
        matches!(self.load_state, LoadState::Ready { .. })
    }

    /// Update the render target size; only screen-space mode uses it
    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        if (width, height) != self.viewport {
            debug!("Viewport resized to {width}x{height}");
        }
        self.viewport = (width, height);
        self.glasses.set_aspect_ratio(aspect_ratio(width, height));
    }

    pub fn pause(&mut self, scene: &mut dyn Scene) {
        self.set_active(false, scene);
    }

    pub fn resume(&mut self, scene: &mut dyn Scene) {
        self.set_active(true, scene);
    }

    /// Inactive sessions keep loading models but render nothing
    pub fn set_active(&mut self, active: bool, scene: &mut dyn Scene) {
        if active == self.active {
            return;
        }
        info!("Session {}", if active { "resumed" } else { "paused" });
        self.active = active;
        if !active {
            self.hide_all(scene);
            self.was_tracking = false;
        }
    }

    /// Forget all tracking history; the loaded model is kept
    pub fn reset_session(&mut self, scene: &mut dyn Scene) {
        info!("Resetting session");
        self.hide_all(scene);
        self.was_tracking = false;
    }

    pub fn set_occlusion(&mut self, settings: OcclusionSettings, scene: &mut dyn Scene) {
        self.occlusion.set_settings(settings, scene);
        if !self.debug.is_enabled() {
            return;
        }
        // Keep the overlay in step with regions removed just now
        self.debug.update(&self.occlusion, scene);
    }

    pub fn set_face_mesh_occlusion(&mut self, enabled: bool, scene: &mut dyn Scene) {
        let mut settings = self.occlusion.settings();
        settings.face_mesh = enabled;
        self.set_occlusion(settings, scene);
    }

    /// Drives both back-plane halves
    pub fn set_back_plane_occlusion(&mut self, enabled: bool, scene: &mut dyn Scene) {
        let mut settings = self.occlusion.settings();
        settings.left_back_plane = enabled;
        settings.right_back_plane = enabled;
        self.set_occlusion(settings, scene);
    }

    pub fn set_debug(&mut self, enabled: bool, scene: &mut dyn Scene) {
        self.debug.set_enabled(enabled, scene);
    }

    /// Remove and destroy every entity the session created.
    ///
    /// Loads still in flight are discarded when they finish.
    pub fn destroy(&mut self, scene: &mut dyn Scene) {
        info!("Destroying try-on session");
        self.glasses.destroy(scene);
        self.occlusion.destroy(scene);
        self.debug.destroy(scene);
        self.load_state = LoadState::Idle;
        self.active = false;
        self.was_tracking = false;
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    /// URL of the model currently in the scene
    #[must_use]
    pub fn model_url(&self) -> Option<&str> {
        self.glasses.model().map(|model| model.url())
    }

    #[must_use]
    pub fn glasses(&self) -> &GlassesRenderer {
        &self.glasses
    }

    #[must_use]
    pub fn occlusion(&self) -> &OcclusionController {
        &self.occlusion
    }

    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.occlusion.visibility()
    }

    #[must_use]
    pub fn last_transform(&self) -> Option<Matrix4<f32>> {
        self.glasses.last_transform()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.was_tracking
    }

    #[must_use]
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Completed loads dropped because a newer request replaced them
    #[must_use]
    pub fn discarded_loads(&self) -> usize {
        self.discarded_loads
    }

    fn hide_all(&mut self, scene: &mut dyn Scene) {
        self.glasses.hide(scene);
        self.occlusion.hide(scene);
        self.debug.hide(scene);
    }

    fn apply_finished_loads(&mut self, scene: &mut dyn Scene) {
        for outcome in self.loader.poll() {
            self.apply_outcome(outcome, scene);
        }
    }

    fn apply_outcome(&mut self, outcome: LoadOutcome, scene: &mut dyn Scene) {
        let current = matches!(
            &self.load_state,
            LoadState::Loading { request, .. } if *request == outcome.request
        );
        if !current {
            info!("Discarding superseded load of {} (request {})", outcome.url, outcome.request);
            self.discarded_loads += 1;
            return;
        }

        let event = match outcome.result {
            Ok(data) => {
                self.glasses.attach_model(&data, scene);
                info!("Model {} loaded", outcome.url);
                self.load_state = LoadState::Ready {
                    url: outcome.url.clone(),
                };
                LoadEvent::Loaded { url: outcome.url }
            }
            Err(e) => {
                warn!("Model {} failed to load: {}", outcome.url, e);
                let reason = match e {
                    Error::AssetLoad { reason, .. } => reason,
                    other => other.to_string(),
                };
                self.load_state = LoadState::Failed {
                    url: outcome.url.clone(),
                    reason: reason.clone(),
                };
                LoadEvent::Failed {
                    url: outcome.url,
                    reason,
                }
            }
        };

        if let Some(callback) = self.on_load.as_mut() {
            callback(&event);
        }
    }
}

impl std::fmt::Debug for TryOnSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TryOnSession")
            .field("active", &self.active)
            .field("viewport", &self.viewport)
            .field("load_state", &self.load_state)
            .field("was_tracking", &self.was_tracking)
            .field("discarded_loads", &self.discarded_loads)
            .finish_non_exhaustive()
    }
}
