//! The ring of textured planes and its recycle / progression bookkeeping.

use crate::visual::texture::{Texture, TextureFactory, TextureStats};
use fastrand::Rng;
use tracing::{debug, info};

pub const LAYER_COUNT: usize = 8;
pub const LAYER_SPACING: f32 = 15.0;
/// A layer whose z passes this is behind the camera and gets recycled.
pub const NEAR_THRESHOLD: f32 = 10.0;
pub const CAMERA_Z: f32 = 5.0;
pub const DEPTHS_PER_ZONE: u32 = 10;
pub const RECYCLE_REGEN_CHANCE: f32 = 0.3;
pub const MIN_LAYER_SCALE: f32 = 0.1;
/// Number of texture variants a recycled layer may be repainted as.
pub const REGEN_VARIANTS: usize = 6;

/// Where a recycled layer lands: the back of the queue.
pub fn recycle_position() -> f32 {
    -((LAYER_COUNT - 1) as f32) * LAYER_SPACING
}

/// Linear growth as a layer nears the camera, floored at [`MIN_LAYER_SCALE`].
pub fn layer_scale(distance: f32) -> f32 {
    if !distance.is_finite() {
        return MIN_LAYER_SCALE;
    }
    (1.0 + (10.0 - distance.abs()) * 0.1).max(MIN_LAYER_SCALE)
}

/// Linear fade with distance, clamped to [0, 1].
pub fn layer_opacity(distance: f32) -> f32 {
    if !distance.is_finite() {
        return 0.0;
    }
    ((20.0 - distance.abs()) / 20.0).clamp(0.0, 1.0)
}

pub struct Layer {
    pub index: usize,
    pub position_z: f32,
    pub scale: f32,
    pub opacity: f32,
    texture: Texture,
}

impl Layer {
    pub fn texture(&self) -> &Texture {
        &self.texture
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthAdvance {
    pub depth: u32,
    pub zone: u32,
    pub zone_advanced: bool,
}

/// Depth / zone counters. Depth moves once per full cycle of the ring,
/// zone once per [`DEPTHS_PER_ZONE`] depths.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progression {
    depth: u32,
    zone: u32,
    cycle_count: usize,
}

impl Progression {
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn zone(&self) -> u32 {
        self.zone
    }

    /// Layers recycled since the last depth increment.
    pub fn cycle_count(&self) -> usize {
        self.cycle_count
    }

    pub fn on_recycle(&mut self) -> Option<DepthAdvance> {
        self.cycle_count += 1;
        if self.cycle_count < LAYER_COUNT {
            return None;
        }
        self.cycle_count = 0;
        self.depth = self.depth.saturating_add(1);
        let zone_advanced = self.depth % DEPTHS_PER_ZONE == 0;
        if zone_advanced {
            self.zone = self.zone.saturating_add(1);
        }
        Some(DepthAdvance {
            depth: self.depth,
            zone: self.zone,
            zone_advanced,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdvanceSummary {
    pub recycled: usize,
    pub regenerated: usize,
    pub depth_advances: u32,
    pub zone_advances: u32,
}

pub struct ZoomRing {
    layers: Vec<Layer>,
    factory: TextureFactory,
    progression: Progression,
}

impl ZoomRing {
    pub fn new(mut factory: TextureFactory, energy: f32, rng: &mut Rng) -> Self {
        let progression = Progression::default();
        let layers = (0..LAYER_COUNT)
            .map(|i| {
                let z = -(i as f32) * LAYER_SPACING;
                let distance = z - CAMERA_Z;
                Layer {
                    index: i,
                    position_z: z,
                    scale: layer_scale(distance),
                    opacity: layer_opacity(distance),
                    texture: factory.create(i, progression.depth, progression.zone, energy, rng),
                }
            })
            .collect();
        Self {
            layers,
            factory,
            progression,
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn progression(&self) -> Progression {
        self.progression
    }

    pub fn texture_stats(&self) -> TextureStats {
        self.factory.stats()
    }

    /// Move every layer `delta` toward the camera and recycle the ones that pass it.
    pub fn advance(&mut self, delta: f32, energy: f32, rng: &mut Rng) -> AdvanceSummary {
        let mut summary = AdvanceSummary::default();
        for i in 0..self.layers.len() {
            self.layers[i].position_z += delta;
            if self.layers[i].position_z <= NEAR_THRESHOLD {
                continue;
            }

            self.layers[i].position_z = recycle_position();
            summary.recycled += 1;
            debug!(layer = i, "layer recycled");

            if let Some(adv) = self.progression.on_recycle() {
                summary.depth_advances += 1;
                if adv.zone_advanced {
                    summary.zone_advances += 1;
                    info!(depth = adv.depth, zone = adv.zone, "entered new zone");
                } else {
                    info!(depth = adv.depth, "depth advanced");
                }
            }

            if rng.f32() > 1.0 - RECYCLE_REGEN_CHANCE {
                let variant = rng.usize(0..REGEN_VARIANTS);
                self.replace_texture(i, variant, energy, rng);
                summary.regenerated += 1;
            }
        }
        summary
    }

    /// Recompute scale and opacity from each layer's distance to the camera.
    pub fn update_appearance(&mut self, camera_z: f32) {
        for layer in &mut self.layers {
            let distance = layer.position_z - camera_z;
            layer.scale = layer_scale(distance);
            layer.opacity = layer_opacity(distance);
        }
    }

    pub fn pulse_scale(&mut self, factor: f32) {
        for layer in &mut self.layers {
            layer.scale *= factor;
        }
    }

    /// Repaint every layer from its own slot index.
    pub fn regenerate_all(&mut self, energy: f32, rng: &mut Rng) {
        for i in 0..self.layers.len() {
            let slot = self.layers[i].index;
            self.replace_texture(i, slot, energy, rng);
        }
        debug!(depth = self.progression.depth, "regenerated all layer textures");
    }

    fn replace_texture(&mut self, i: usize, variant: usize, energy: f32, rng: &mut Rng) {
        let p = self.progression;
        let fresh = self.factory.create(variant, p.depth, p.zone, energy, rng);
        let old = std::mem::replace(&mut self.layers[i].texture, fresh);
        self.factory.release(old);
    }

    /// Release every texture and report the final tally.
    pub fn release_all(mut self) -> TextureStats {
        for layer in self.layers.drain(..) {
            self.factory.release(layer.texture);
        }
        self.factory.stats()
    }
}
