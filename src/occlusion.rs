//! Occlusion of the glasses' temples by cheap proxy geometry.
//!
//! Three depth-only regions hide the parts of the model that the head would
//! cover:
//!
//! - the face mask, a copy of the tracker's face mesh placed like the glasses
//! - a left and a right back-clip plane, placed just in front of the rearmost
//!   mesh vertex along the face's forward axis
//!
//! Each region is a two-state machine (`Hidden` / `Visible`). Losing tracking
//! hides everything. On a tracked frame the face mask is shown whenever it is
//! enabled, and each back plane is gated by head yaw: the left plane while
//! `yaw < τ`, the right plane while `yaw > -τ`. Both are shown near a frontal
//! pose, so the gate width doubles as the hysteresis band.

use log::{debug, info};
use nalgebra::{Matrix4, Vector3};

use crate::constants::{
    DEFAULT_BACK_PLANE_HEIGHT, DEFAULT_BACK_PLANE_OFFSET, DEFAULT_BACK_PLANE_WIDTH, DEFAULT_YAW_THRESHOLD,
    MAX_MASK_INDICES, MAX_MASK_VERTICES,
};
use crate::geometry::yaw_from_rotation;
use crate::scene::{Entity, EntityKind, Scene};
use crate::tracking::{FaceMesh, FaceSample};
use crate::transform::FacePlacement;
use crate::{Error, Result};

/// Which occlusion regions may be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OcclusionSettings {
    pub face_mesh: bool,
    pub left_back_plane: bool,
    pub right_back_plane: bool,
}

impl OcclusionSettings {
    /// Settings with one flag driving both back-plane halves
    #[must_use]
    pub fn new(face_mesh: bool, back_plane: bool) -> Self {
        Self {
            face_mesh,
            left_back_plane: back_plane,
            right_back_plane: back_plane,
        }
    }

    #[must_use]
    pub fn enabled(&self, region: MaskRegion) -> bool {
        match region {
            MaskRegion::FaceMask => self.face_mesh,
            MaskRegion::LeftBackPlane => self.left_back_plane,
            MaskRegion::RightBackPlane => self.right_back_plane,
        }
    }
}

impl Default for OcclusionSettings {
    fn default() -> Self {
        Self::new(true, true)
    }
}

/// One independently gated piece of occluder geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskRegion {
    FaceMask,
    LeftBackPlane,
    RightBackPlane,
}

impl MaskRegion {
    pub const ALL: [MaskRegion; 3] = [Self::FaceMask, Self::LeftBackPlane, Self::RightBackPlane];

    pub(crate) fn index(self) -> usize {
        match self {
            Self::FaceMask => 0,
            Self::LeftBackPlane => 1,
            Self::RightBackPlane => 2,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::FaceMask => "occlusion-face-mask",
            Self::LeftBackPlane => "occlusion-back-plane-left",
            Self::RightBackPlane => "occlusion-back-plane-right",
        }
    }
}

/// Per-region visibility state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionState {
    #[default]
    Hidden,
    Visible,
}

impl RegionState {
    #[must_use]
    pub fn is_visible(self) -> bool {
        self == Self::Visible
    }
}

/// Snapshot of the three region states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Visibility {
    pub face_mask: bool,
    pub left_back_plane: bool,
    pub right_back_plane: bool,
}

/// Symmetric yaw threshold deciding which back-plane half is useful
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YawGate {
    threshold: f32,
}

impl YawGate {
    /// # Panics
    ///
    /// Panics unless the threshold is positive and finite; a zero threshold
    /// would hide both planes at a frontal pose.
    #[must_use]
    pub fn new(threshold: f32) -> Self {
        assert!(threshold.is_finite() && threshold > 0.0, "Yaw threshold must be positive");
        Self { threshold }
    }

    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    #[must_use]
    pub fn left_visible(&self, yaw: f32) -> bool {
        yaw < self.threshold
    }

    #[must_use]
    pub fn right_visible(&self, yaw: f32) -> bool {
        yaw > -self.threshold
    }
}

impl Default for YawGate {
    fn default() -> Self {
        Self::new(DEFAULT_YAW_THRESHOLD)
    }
}

/// Placement and size of the back-clip planes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackPlaneGeometry {
    /// Added to the rearmost vertex Z, in face-local metres
    pub offset: f32,
    /// Width of both halves together
    pub width: f32,
    pub height: f32,
}

impl Default for BackPlaneGeometry {
    fn default() -> Self {
        Self {
            offset: DEFAULT_BACK_PLANE_OFFSET,
            width: DEFAULT_BACK_PLANE_WIDTH,
            height: DEFAULT_BACK_PLANE_HEIGHT,
        }
    }
}

impl BackPlaneGeometry {
    /// Face-local transform of one half, a unit quad scaled and shifted sideways
    #[must_use]
    pub fn local_transform(&self, region: MaskRegion, min_z: f32) -> Matrix4<f32> {
        let side = match region {
            MaskRegion::LeftBackPlane => -1.0,
            _ => 1.0,
        };
        let center = Vector3::new(side * self.width * 0.25, 0.0, min_z + self.offset);
        Matrix4::new_translation(&center) * Matrix4::new_nonuniform_scaling(&Vector3::new(self.width * 0.5, self.height, 1.0))
    }
}

/// Unit quad in the XY plane shared by the back planes
pub(crate) fn unit_quad() -> ([Vector3<f32>; 4], [u16; 6]) {
    (
        [
            Vector3::new(-0.5, -0.5, 0.0),
            Vector3::new(0.5, -0.5, 0.0),
            Vector3::new(0.5, 0.5, 0.0),
            Vector3::new(-0.5, 0.5, 0.0),
        ],
        [0, 1, 2, 0, 2, 3],
    )
}

/// Persistent vertex/index storage for the face mask, never reallocated
#[derive(Debug, Clone)]
pub struct MaskBuffer {
    vertices: Vec<Vector3<f32>>,
    indices: Vec<u16>,
    max_vertices: usize,
    max_indices: usize,
}

impl MaskBuffer {
    #[must_use]
    pub fn with_capacity(max_vertices: usize, max_indices: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(max_vertices),
            indices: Vec::with_capacity(max_indices),
            max_vertices,
            max_indices,
        }
    }

    /// Copy a tracked mesh into the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the previous contents in place, if the mesh
    /// exceeds capacity, has a partial triangle, references a missing vertex
    /// or contains non-finite coordinates.
    pub fn fill(&mut self, mesh: &FaceMesh) -> Result<()> {
        self.fill_with(mesh, false)
    }

    /// Copy a tracked mesh reflected across its YZ plane, winding reversed.
    ///
    /// # Errors
    ///
    /// Same as [`MaskBuffer::fill`].
    pub fn fill_mirrored(&mut self, mesh: &FaceMesh) -> Result<()> {
        self.fill_with(mesh, true)
    }

    fn fill_with(&mut self, mesh: &FaceMesh, mirrored: bool) -> Result<()> {
        if mesh.vertices.len() > self.max_vertices || mesh.indices.len() > self.max_indices {
            return Err(Error::MeshCapacity {
                vertices: mesh.vertices.len(),
                indices: mesh.indices.len(),
                max_vertices: self.max_vertices,
                max_indices: self.max_indices,
            });
        }
        if mesh.indices.len() % 3 != 0 {
            return Err(Error::MalformedMesh(format!(
                "{} indices do not form whole triangles",
                mesh.indices.len()
            )));
        }
        if let Some(&index) = mesh.indices.iter().find(|&&i| usize::from(i) >= mesh.vertices.len()) {
            return Err(Error::MalformedMesh(format!(
                "index {index} out of range for {} vertices",
                mesh.vertices.len()
            )));
        }
        if mesh.vertices.iter().any(|v| !v.iter().all(|c| c.is_finite())) {
            return Err(Error::MalformedMesh("non-finite vertex".to_string()));
        }

        self.vertices.clear();
        self.indices.clear();
        if mirrored {
            self.vertices.extend(mesh.vertices.iter().map(|v| Vector3::new(-v.x, v.y, v.z)));
            for triangle in mesh.indices.chunks_exact(3) {
                self.indices.extend_from_slice(&[triangle[0], triangle[2], triangle[1]]);
            }
        } else {
            self.vertices.extend_from_slice(&mesh.vertices);
            self.indices.extend_from_slice(&mesh.indices);
        }
        Ok(())
    }

    #[must_use]
    pub fn vertices(&self) -> &[Vector3<f32>] {
        &self.vertices
    }

    #[must_use]
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    #[must_use]
    pub fn min_z(&self) -> Option<f32> {
        self.vertices.iter().map(|v| v.z).reduce(f32::min)
    }
}

impl Default for MaskBuffer {
    fn default() -> Self {
        Self::with_capacity(MAX_MASK_VERTICES, MAX_MASK_INDICES)
    }
}

/// Scene entities owned by the controller, indexed like [`MaskRegion::ALL`]
#[derive(Debug, Clone, Copy)]
struct OcclusionEntities([Entity; 3]);

/// Drives the occluder geometry and its visibility from tracked frames
#[derive(Debug)]
pub struct OcclusionController {
    settings: OcclusionSettings,
    yaw_gate: YawGate,
    planes: BackPlaneGeometry,
    buffer: MaskBuffer,
    regions: [RegionState; 3],
    transforms: [Matrix4<f32>; 3],
    entities: Option<OcclusionEntities>,
    last_yaw: Option<f32>,
}

impl OcclusionController {
    #[must_use]
    pub fn new(settings: OcclusionSettings, yaw_gate: YawGate, planes: BackPlaneGeometry) -> Self {
        Self {
            settings,
            yaw_gate,
            planes,
            buffer: MaskBuffer::default(),
            regions: [RegionState::Hidden; 3],
            transforms: [Matrix4::identity(); 3],
            entities: None,
            last_yaw: None,
        }
    }

    /// Create the depth-mask entities; they stay out of the scene until shown
    pub fn setup(&mut self, scene: &mut dyn Scene) {
        if self.entities.is_some() {
            return;
        }
        let entities = MaskRegion::ALL.map(|region| scene.create_entity(region.name(), EntityKind::DepthMask));

        let (quad, quad_indices) = unit_quad();
        for region in [MaskRegion::LeftBackPlane, MaskRegion::RightBackPlane] {
            scene.set_geometry(entities[region.index()], &quad, &quad_indices);
        }
        self.entities = Some(OcclusionEntities(entities));
    }

    /// Process one frame with the regions placed by the face pose.
    ///
    /// A frame without tracking hides every region.
    pub fn update(&mut self, sample: &FaceSample, scene: &mut dyn Scene) -> Visibility {
        self.update_placed(sample, &FacePlacement::from_pose(&sample.pose), scene)
    }

    /// Process one frame with the regions placed by `placement`.
    ///
    /// The yaw gate reads the placement's rotation, so a mirrored placement
    /// swaps which half is shown along with where it is drawn.
    pub fn update_placed(
        &mut self,
        sample: &FaceSample,
        placement: &FacePlacement,
        scene: &mut dyn Scene,
    ) -> Visibility {
        if !sample.is_tracking() {
            self.hide(scene);
            return self.visibility();
        }

        let filled = if placement.mirrored {
            self.buffer.fill_mirrored(&sample.mesh)
        } else {
            self.buffer.fill(&sample.mesh)
        };
        if let Err(e) = filled {
            debug!("Skipping occlusion update for this frame: {e}");
            return self.visibility();
        }

        let pose = placement.matrix;
        let yaw = yaw_from_rotation(&pose);
        self.last_yaw = Some(yaw);

        if self.settings.face_mesh {
            self.transforms[MaskRegion::FaceMask.index()] = pose;
            if let Some(OcclusionEntities(entities)) = self.entities {
                let mask = entities[MaskRegion::FaceMask.index()];
                scene.set_geometry(mask, self.buffer.vertices(), self.buffer.indices());
                scene.set_transform(mask, &pose);
            }
        }
        self.set_region(MaskRegion::FaceMask, self.settings.face_mesh, scene);

        let min_z = self.buffer.min_z();
        for region in [MaskRegion::LeftBackPlane, MaskRegion::RightBackPlane] {
            let gate_open = match region {
                MaskRegion::LeftBackPlane => self.yaw_gate.left_visible(yaw),
                _ => self.yaw_gate.right_visible(yaw),
            };
            let show = match min_z {
                Some(min_z) if self.settings.enabled(region) && gate_open => {
                    let transform = pose * self.planes.local_transform(region, min_z);
                    self.transforms[region.index()] = transform;
                    if let Some(OcclusionEntities(entities)) = self.entities {
                        scene.set_transform(entities[region.index()], &transform);
                    }
                    true
                }
                _ => false,
            };
            self.set_region(region, show, scene);
        }

        self.visibility()
    }

    /// Hide every region (tracking lost, session paused)
    pub fn hide(&mut self, scene: &mut dyn Scene) {
        for region in MaskRegion::ALL {
            self.set_region(region, false, scene);
        }
    }

    /// Apply new settings. Disabled regions leave the scene at once; enabled
    /// ones wait for the next tracked frame.
    pub fn set_settings(&mut self, settings: OcclusionSettings, scene: &mut dyn Scene) {
        if settings != self.settings {
            info!(
                "Occlusion settings: face mesh {}, left plane {}, right plane {}",
                settings.face_mesh, settings.left_back_plane, settings.right_back_plane
            );
        }
        self.settings = settings;
        for region in MaskRegion::ALL {
            if !settings.enabled(region) {
                self.set_region(region, false, scene);
            }
        }
    }

    /// Remove and destroy the controller's entities
    pub fn destroy(&mut self, scene: &mut dyn Scene) {
        self.hide(scene);
        if let Some(OcclusionEntities(entities)) = self.entities.take() {
            for entity in entities {
                scene.destroy_entity(entity);
            }
        }
    }

    #[must_use]
    pub fn settings(&self) -> OcclusionSettings {
        self.settings
    }

    #[must_use]
    pub fn region_state(&self, region: MaskRegion) -> RegionState {
        self.regions[region.index()]
    }

    #[must_use]
    pub fn visibility(&self) -> Visibility {
        Visibility {
            face_mask: self.regions[MaskRegion::FaceMask.index()].is_visible(),
            left_back_plane: self.regions[MaskRegion::LeftBackPlane.index()].is_visible(),
            right_back_plane: self.regions[MaskRegion::RightBackPlane.index()].is_visible(),
        }
    }

    /// Yaw of the last processed tracked frame
    #[must_use]
    pub fn last_yaw(&self) -> Option<f32> {
        self.last_yaw
    }

    /// Last display transform written for a region
    #[must_use]
    pub fn transform(&self, region: MaskRegion) -> Matrix4<f32> {
        self.transforms[region.index()]
    }

    #[must_use]
    pub fn mask_buffer(&self) -> &MaskBuffer {
        &self.buffer
    }

    #[must_use]
    pub fn entity(&self, region: MaskRegion) -> Option<Entity> {
        self.entities.map(|OcclusionEntities(entities)| entities[region.index()])
    }

    fn set_region(&mut self, region: MaskRegion, visible: bool, scene: &mut dyn Scene) {
        let next = if visible { RegionState::Visible } else { RegionState::Hidden };
        let state = &mut self.regions[region.index()];
        if *state == next {
            return;
        }
        *state = next;

        if let Some(OcclusionEntities(entities)) = self.entities {
            let entity = entities[region.index()];
            match next {
                RegionState::Visible => scene.add_entity(entity),
                RegionState::Hidden => scene.remove_entity(entity),
            }
        }
    }
}

impl Default for OcclusionController {
    fn default() -> Self {
        Self::new(OcclusionSettings::default(), YawGate::default(), BackPlaneGeometry::default())
    }
}
