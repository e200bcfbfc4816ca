use crate::visual::canvas::Canvas;
use crate::visual::patterns::{mystery_particles, Nesting, PatternKind};
use fastrand::Rng;

/// Active pattern pair per zone; `layer_index % 2` picks from the pair.
pub const ZONE_PATTERNS: [[PatternKind; 2]; 3] = [
    [PatternKind::Geometric, PatternKind::Voronoi],
    [PatternKind::Organic, PatternKind::Spiral],
    [PatternKind::Fractal, PatternKind::Tunnel],
];

pub const META_OVERLAY_MIN_DEPTH: u32 = 5;
pub const MYSTERY_MIN_DEPTH: u32 = 10;
pub const META_OVERLAY_CHANCE: f32 = 0.5;
pub const MYSTERY_CHANCE: f32 = 0.05;

pub fn zone_patterns(zone: u32) -> [PatternKind; 2] {
    ZONE_PATTERNS[zone as usize % ZONE_PATTERNS.len()]
}

pub fn layer_hue(layer_index: usize) -> f32 {
    ((layer_index * 60) % 360) as f32
}

/// A generated layer surface. Owned by exactly one layer; hand it back to
/// [`TextureFactory::release`] when it is replaced.
pub struct Texture {
    id: u64,
    size: usize,
    pixels: Vec<u8>,
    pub pattern: PatternKind,
    pub hue: f32,
    pub meta_overlay: bool,
    pub mystery: bool,
}

impl Texture {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Nearest-neighbour sample with repeat wrapping. `u`, `v` are in texture units (0..1 per tile).
    #[inline]
    pub fn sample(&self, u: f32, v: f32) -> [u8; 4] {
        if self.size == 0 {
            return [0, 0, 0, 0];
        }
        let s = self.size as f32;
        let x = ((u.rem_euclid(1.0) * s) as usize).min(self.size - 1);
        let y = ((v.rem_euclid(1.0) * s) as usize).min(self.size - 1);
        let i = (y * self.size + x) * 4;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]]
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureStats {
    pub created: u64,
    pub released: u64,
}

impl TextureStats {
    pub fn live(&self) -> u64 {
        self.created.saturating_sub(self.released)
    }
}

pub struct TextureFactory {
    size: usize,
    next_id: u64,
    stats: TextureStats,
}

impl TextureFactory {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            next_id: 1,
            stats: TextureStats::default(),
        }
    }

    pub fn stats(&self) -> TextureStats {
        self.stats
    }

    pub fn create(&mut self, layer_index: usize, depth: u32, zone: u32, energy: f32, rng: &mut Rng) -> Texture {
        let size = self.size;
        let sf = size as f32;
        let hue = layer_hue(layer_index);
        let pattern = zone_patterns(zone)[layer_index % 2];

        let mut canvas = Canvas::new(size);
        pattern.paint(&mut canvas, sf, hue, depth, energy, rng, Nesting::root());

        let mut meta_overlay = false;
        if depth > META_OVERLAY_MIN_DEPTH && rng.f32() > 1.0 - META_OVERLAY_CHANCE {
            let sub = zone_patterns(zone.wrapping_add(1))[0];
            if let Some(nest) = Nesting::root().deeper(sf / 2.0) {
                canvas.with_viewport(sf / 4.0, sf / 4.0, sf / 2.0, |c| {
                    sub.paint(c, sf / 2.0, hue + 90.0, depth / 2, energy, rng, nest)
                });
                meta_overlay = true;
            }
        }

        let mut mystery = false;
        if depth > MYSTERY_MIN_DEPTH && rng.f32() < MYSTERY_CHANCE {
            mystery_particles(&mut canvas, sf, hue, rng);
            mystery = true;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.stats.created += 1;

        Texture {
            id,
            size,
            pixels: canvas.into_pixels(),
            pattern,
            hue,
            meta_overlay,
            mystery,
        }
    }

    pub fn release(&mut self, texture: Texture) {
        self.stats.released += 1;
        drop(texture);
    }
}
