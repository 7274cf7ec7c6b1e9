//! Contract with the rendering engine, plus an in-memory implementation.
//!
//! The pipeline never renders. It creates entities, moves them in and out of
//! the active scene, and writes transforms, mesh geometry and camera matrices.
//! All calls happen on the render thread.

use std::collections::HashMap;

use log::debug;
use nalgebra::{Matrix4, Vector3};

/// Opaque handle to a renderer entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(pub u32);

/// Tells the renderer which material and draw order an entity needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Lit, textured model geometry
    Model,
    /// Depth-only occluder, drawn before models
    DepthMask,
    /// Unlit coloured overlay
    Debug,
}

/// Scene-graph operations the pipeline needs from the rendering engine
pub trait Scene {
    /// Allocate an entity; it is not part of the active scene until added
    fn create_entity(&mut self, name: &str, kind: EntityKind) -> Entity;

    fn add_entity(&mut self, entity: Entity);

    fn remove_entity(&mut self, entity: Entity);

    /// Release the entity and its GPU resources
    fn destroy_entity(&mut self, entity: Entity);

    fn set_transform(&mut self, entity: Entity, transform: &Matrix4<f32>);

    /// Replace the entity's triangle mesh
    fn set_geometry(&mut self, entity: Entity, vertices: &[Vector3<f32>], indices: &[u16]);

    fn set_camera(&mut self, view: &Matrix4<f32>, projection: &Matrix4<f32>);
}

/// What [`MemoryScene`] remembers about one entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub name: String,
    pub kind: EntityKind,
    pub transform: Matrix4<f32>,
    pub in_scene: bool,
    pub vertex_count: usize,
    pub index_count: usize,
}

/// Scene graph kept in memory; used headless and in tests
#[derive(Debug, Default)]
pub struct MemoryScene {
    entities: HashMap<Entity, EntityRecord>,
    next_id: u32,
    camera: Option<(Matrix4<f32>, Matrix4<f32>)>,
    transform_writes: usize,
}

impl MemoryScene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entity(&self, entity: Entity) -> Option<&EntityRecord> {
        self.entities.get(&entity)
    }

    /// True if the entity exists and is part of the active scene
    #[must_use]
    pub fn is_visible(&self, entity: Entity) -> bool {
        self.entities.get(&entity).is_some_and(|record| record.in_scene)
    }

    #[must_use]
    pub fn transform(&self, entity: Entity) -> Option<Matrix4<f32>> {
        self.entities.get(&entity).map(|record| record.transform)
    }

    /// Entities currently in the active scene, in creation order
    #[must_use]
    pub fn active_entities(&self) -> Vec<Entity> {
        let mut active: Vec<Entity> = self
            .entities
            .iter()
            .filter(|(_, record)| record.in_scene)
            .map(|(&entity, _)| entity)
            .collect();
        active.sort();
        active
    }

    /// Names of active entities of one kind, in creation order
    #[must_use]
    pub fn active_names(&self, kind: EntityKind) -> Vec<String> {
        self.active_entities()
            .into_iter()
            .filter_map(|entity| self.entities.get(&entity))
            .filter(|record| record.kind == kind)
            .map(|record| record.name.clone())
            .collect()
    }

    /// Number of entities alive, whether in the active scene or not
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[must_use]
    pub fn camera(&self) -> Option<&(Matrix4<f32>, Matrix4<f32>)> {
        self.camera.as_ref()
    }

    /// Total `set_transform` calls since creation
    #[must_use]
    pub fn transform_writes(&self) -> usize {
        self.transform_writes
    }

    fn record_mut(&mut self, entity: Entity) -> Option<&mut EntityRecord> {
        let record = self.entities.get_mut(&entity);
        if record.is_none() {
            debug!("Ignoring operation on unknown entity {entity:?}");
        }
        record
    }
}

impl Scene for MemoryScene {
    fn create_entity(&mut self, name: &str, kind: EntityKind) -> Entity {
        let entity = Entity(self.next_id);
        self.next_id += 1;
        self.entities.insert(
            entity,
            EntityRecord {
                name: name.to_string(),
                kind,
                transform: Matrix4::identity(),
                in_scene: false,
                vertex_count: 0,
                index_count: 0,
            },
        );
        entity
    }

    fn add_entity(&mut self, entity: Entity) {
        if let Some(record) = self.record_mut(entity) {
            record.in_scene = true;
        }
    }

    fn remove_entity(&mut self, entity: Entity) {
        if let Some(record) = self.record_mut(entity) {
            record.in_scene = false;
        }
    }

    fn destroy_entity(&mut self, entity: Entity) {
        if self.entities.remove(&entity).is_none() {
            debug!("Destroying unknown entity {entity:?}");
        }
    }

    fn set_transform(&mut self, entity: Entity, transform: &Matrix4<f32>) {
        self.transform_writes += 1;
        if let Some(record) = self.record_mut(entity) {
            record.transform = *transform;
        }
    }

    fn set_geometry(&mut self, entity: Entity, vertices: &[Vector3<f32>], indices: &[u16]) {
        if let Some(record) = self.record_mut(entity) {
            record.vertex_count = vertices.len();
            record.index_count = indices.len();
        }
    }

    fn set_camera(&mut self, view: &Matrix4<f32>, projection: &Matrix4<f32>) {
        self.camera = Some((*view, *projection));
    }
}
