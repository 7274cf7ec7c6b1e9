//! The glasses model in the scene: its entities, its pose pipeline and the
//! swap from one model to the next.

use log::{info, warn};
use nalgebra::Matrix4;

use crate::constants::EPSILON;
use crate::geometry::hide_matrix;
use crate::loader::ModelData;
use crate::scene::{Entity, EntityKind, Scene};
use crate::tracking::{CameraFrame, FaceSample};
use crate::transform::{PipelineParams, PosePipeline};

/// Model scale that maps the bounding-box width onto `target_width`.
///
/// A degenerate bounding box yields 1.0.
#[must_use]
pub fn base_scale(target_width: f32, bounds_width: f32) -> f32 {
    if !bounds_width.is_finite() || bounds_width.abs() < EPSILON {
        warn!("Degenerate model width {bounds_width}, using unit scale");
        return 1.0;
    }
    target_width / bounds_width.abs()
}

/// Scene entities instantiated from one [`ModelData`]
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModel {
    url: String,
    root: Entity,
    parts: Vec<Entity>,
    base_scale: f32,
}

impl LoadedModel {
    /// Create the entities for `data`; they are not yet part of the active scene
    pub fn instantiate(data: &ModelData, target_width: f32, scene: &mut dyn Scene) -> Self {
        let root = scene.create_entity(&format!("{}#root", data.url), EntityKind::Model);
        let parts = data
            .parts
            .iter()
            .map(|part| scene.create_entity(&format!("{}#{part}", data.url), EntityKind::Model))
            .collect();

        Self {
            url: data.url.clone(),
            root,
            parts,
            base_scale: base_scale(target_width, data.bounds.width()),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Entity carrying the model transform
    #[must_use]
    pub fn root(&self) -> Entity {
        self.root
    }

    #[must_use]
    pub fn base_scale(&self) -> f32 {
        self.base_scale
    }

    /// Root followed by every part
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        std::iter::once(self.root).chain(self.parts.iter().copied())
    }
}

/// Places the current glasses model on the tracked face
#[derive(Debug)]
pub struct GlassesRenderer {
    pipeline: PosePipeline,
    target_width: f32,
    model: Option<LoadedModel>,
    last_transform: Option<Matrix4<f32>>,
}

impl GlassesRenderer {
    /// # Panics
    ///
    /// Panics if either noise constant is not a positive finite number.
    #[must_use]
    pub fn new(params: PipelineParams, process_noise: f32, measurement_noise: f32, target_width: f32) -> Self {
        Self {
            pipeline: PosePipeline::new(params, process_noise, measurement_noise),
            target_width,
            model: None,
            last_transform: None,
        }
    }

    /// Run the pose pipeline and write the model transform.
    ///
    /// Returns the transform written this frame, or `None` if the frame was
    /// skipped and the previous transform is held.
    pub fn update(
        &mut self,
        sample: &FaceSample,
        camera: Option<&CameraFrame>,
        scene: &mut dyn Scene,
    ) -> Option<Matrix4<f32>> {
        let transform = self.pipeline.compute(sample, camera)?;
        if let Some(model) = &self.model {
            scene.set_transform(model.root, &transform);
        }
        self.last_transform = Some(transform);
        Some(transform)
    }

    /// Park the model outside the frustum and forget all smoothing history
    pub fn hide(&mut self, scene: &mut dyn Scene) {
        self.pipeline.reset();
        self.last_transform = None;
        if let Some(model) = &self.model {
            scene.set_transform(model.root, &hide_matrix());
        }
    }

    /// Splice a freshly loaded model into the scene.
    ///
    /// The new entities are added hidden, then the previous model's entities
    /// are removed and destroyed. Filters restart for the new model.
    pub fn attach_model(&mut self, data: &ModelData, scene: &mut dyn Scene) {
        let model = LoadedModel::instantiate(data, self.target_width, scene);
        scene.set_transform(model.root, &hide_matrix());
        for entity in model.entities() {
            scene.add_entity(entity);
        }

        if let Some(previous) = self.model.take() {
            info!("Replacing model {} with {}", previous.url, model.url);
            Self::release(&previous, scene);
        }

        self.pipeline.set_base_scale(model.base_scale);
        self.pipeline.reset();
        self.last_transform = None;
        self.model = Some(model);
    }

    /// Remove and destroy the current model's entities
    pub fn destroy(&mut self, scene: &mut dyn Scene) {
        if let Some(model) = self.model.take() {
            Self::release(&model, scene);
        }
        self.pipeline.reset();
        self.last_transform = None;
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.pipeline.set_aspect_ratio(aspect_ratio);
    }

    #[must_use]
    pub fn model(&self) -> Option<&LoadedModel> {
        self.model.as_ref()
    }

    #[must_use]
    pub fn pipeline(&self) -> &PosePipeline {
        &self.pipeline
    }

    /// Transform written by the last successful update since the last hide
    #[must_use]
    pub fn last_transform(&self) -> Option<Matrix4<f32>> {
        self.last_transform
    }

    fn release(model: &LoadedModel, scene: &mut dyn Scene) {
        for entity in model.entities() {
            scene.remove_entity(entity);
            scene.destroy_entity(entity);
        }
    }
}
