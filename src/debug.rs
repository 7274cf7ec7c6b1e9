//! Visible stand-ins for the occluder geometry.
//!
//! Occluders are depth-only and therefore invisible. When enabled, the overlay
//! shows coloured copies of the face mask and back planes wherever the
//! occlusion controller currently has them visible.

use log::info;

use crate::occlusion::{unit_quad, MaskRegion, OcclusionController};
use crate::scene::{Entity, EntityKind, Scene};

#[derive(Debug, Default)]
pub struct DebugOverlay {
    enabled: bool,
    entities: Option<[Entity; 3]>,
    shown: [bool; 3],
}

impl DebugOverlay {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn setup(&mut self, scene: &mut dyn Scene) {
        if self.entities.is_some() {
            return;
        }
        let entities = MaskRegion::ALL.map(|region| {
            let name = match region {
                MaskRegion::FaceMask => "debug-face-mesh",
                MaskRegion::LeftBackPlane => "debug-back-plane-left",
                MaskRegion::RightBackPlane => "debug-back-plane-right",
            };
            scene.create_entity(name, EntityKind::Debug)
        });

        let (quad, quad_indices) = unit_quad();
        for region in [MaskRegion::LeftBackPlane, MaskRegion::RightBackPlane] {
            scene.set_geometry(entities[region.index()], &quad, &quad_indices);
        }
        self.entities = Some(entities);
    }

    /// Mirror the occlusion controller's current regions
    pub fn update(&mut self, occlusion: &OcclusionController, scene: &mut dyn Scene) {
        if !self.enabled {
            return;
        }
        let Some(entities) = self.entities else {
            return;
        };

        for region in MaskRegion::ALL {
            let entity = entities[region.index()];
            let visible = occlusion.region_state(region).is_visible();
            if visible {
                if region == MaskRegion::FaceMask {
                    let buffer = occlusion.mask_buffer();
                    scene.set_geometry(entity, buffer.vertices(), buffer.indices());
                }
                scene.set_transform(entity, &occlusion.transform(region));
            }
            self.show(region, visible, scene);
        }
    }

    pub fn hide(&mut self, scene: &mut dyn Scene) {
        for region in MaskRegion::ALL {
            self.show(region, false, scene);
        }
    }

    /// Disabling removes the overlay at once
    pub fn set_enabled(&mut self, enabled: bool, scene: &mut dyn Scene) {
        if enabled != self.enabled {
            info!("Debug overlay {}", if enabled { "enabled" } else { "disabled" });
        }
        self.enabled = enabled;
        if !enabled {
            self.hide(scene);
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn destroy(&mut self, scene: &mut dyn Scene) {
        self.hide(scene);
        if let Some(entities) = self.entities.take() {
            for entity in entities {
                scene.destroy_entity(entity);
            }
        }
    }

    fn show(&mut self, region: MaskRegion, visible: bool, scene: &mut dyn Scene) {
        let shown = &mut self.shown[region.index()];
        if *shown == visible {
            return;
        }
        *shown = visible;
        if let Some(entities) = self.entities {
            let entity = entities[region.index()];
            if visible {
                scene.add_entity(entity);
            } else {
                scene.remove_entity(entity);
            }
        }
    }
}
