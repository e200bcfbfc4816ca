pub mod canvas;
pub mod layers;
pub mod patterns;
pub mod texture;

use crate::audio::Spectrum;
use crate::input::{Controls, Pointer};
use fastrand::Rng;
use tracing::info;

pub use layers::{layer_opacity, layer_scale, Layer, Progression, ZoomRing, CAMERA_Z, LAYER_COUNT};
pub use patterns::PatternKind;
pub use texture::{Texture, TextureFactory, TextureStats};

/// Base per-frame travel along z, before the speed multiplier.
pub const ZOOM_STEP: f32 = 0.1;
pub const POINTER_SPEED_GAIN: f32 = 0.5;
pub const POINTER_LOOK_GAIN: f32 = 0.1;
/// Mean of the lowest spectrum bins above which a frame counts as a beat.
pub const BEAT_THRESHOLD: f32 = 100.0;
pub const BEAT_SPEED_BOOST: f32 = 1.2;
pub const BEAT_SCALE_PULSE: f32 = 1.05;
pub const BEAT_REGEN_CHANCE: f32 = 0.2;

pub const FOV_Y_DEG: f32 = 75.0;
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 1000.0;
/// Side length of every layer plane in world units, before scaling.
pub const PLANE_SIZE: f32 = 20.0;

/// Everything one frame update reads, sampled once at frame start.
#[derive(Clone, Copy, Debug)]
pub struct FrameInput {
    pub controls: Controls,
    pub pointer: Pointer,
    pub spectrum: Option<Spectrum>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub skipped: bool,
    pub paused: bool,
    pub effective_speed: f32,
    pub energy: f32,
    pub low_energy: f32,
    pub beat: bool,
    pub beat_regenerated: bool,
    pub recycled: usize,
    pub regenerated: usize,
    pub depth: u32,
    pub zone: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub z: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub aspect: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            z: CAMERA_Z,
            pitch: 0.0,
            yaw: 0.0,
            aspect: 1.0,
        }
    }
}

impl Camera {
    /// World-space view ray through normalized device coords (`nx`, `ny`), y up.
    fn ray(&self, nx: f32, ny: f32, tan_half: f32) -> (f32, f32, f32) {
        let x = nx * tan_half * self.aspect;
        let y = ny * tan_half;
        let z = -1.0f32;

        // Euler XYZ: yaw about y first, then pitch about x.
        let (sy, cy) = self.yaw.sin_cos();
        let x1 = x * cy + z * sy;
        let z1 = -x * sy + z * cy;

        let (sp, cp) = self.pitch.sin_cos();
        let y2 = y * cp - z1 * sp;
        let z2 = y * sp + z1 * cp;
        (x1, y2, z2)
    }
}

pub struct ZoomEngine {
    ring: Option<ZoomRing>,
    rng: Rng,
    camera: Camera,
    pixel_aspect: f32,
    w: usize,
    h: usize,
    frame: Vec<u8>,
    order: Vec<usize>,
}

impl ZoomEngine {
    pub fn new(texture_size: usize, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(s) => Rng::with_seed(s),
            None => Rng::new(),
        };
        let ring = ZoomRing::new(TextureFactory::new(texture_size), 0.0, &mut rng);
        info!(texture_size, layers = LAYER_COUNT, "zoom ring mounted");
        Self {
            ring: Some(ring),
            rng,
            camera: Camera::default(),
            pixel_aspect: 1.0,
            w: 0,
            h: 0,
            frame: Vec::new(),
            order: Vec::with_capacity(LAYER_COUNT),
        }
    }

    /// `pixel_aspect` is the width/height ratio of one frame-buffer pixel on screen.
    pub fn resize(&mut self, w: usize, h: usize, pixel_aspect: f32) {
        self.w = w;
        self.h = h;
        self.pixel_aspect = if pixel_aspect.is_finite() && pixel_aspect > 0.0 { pixel_aspect } else { 1.0 };
        self.camera.aspect = if h == 0 { 1.0 } else { (w as f32 / h as f32) * self.pixel_aspect };
        self.frame.clear();
        self.frame.resize(w.saturating_mul(h).saturating_mul(4), 0);
    }

    pub fn frame_size(&self) -> (usize, usize) {
        (self.w, self.h)
    }

    pub fn is_mounted(&self) -> bool {
        self.ring.is_some()
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn layers(&self) -> &[Layer] {
        self.ring.as_ref().map(|r| r.layers()).unwrap_or(&[])
    }

    pub fn progression(&self) -> Progression {
        self.ring.as_ref().map(|r| r.progression()).unwrap_or_default()
    }

    pub fn texture_stats(&self) -> TextureStats {
        self.ring.as_ref().map(|r| r.texture_stats()).unwrap_or_default()
    }

    pub fn update(&mut self, input: &FrameInput) -> FrameReport {
        let Some(ring) = self.ring.as_mut() else {
            return FrameReport {
                skipped: true,
                ..FrameReport::default()
            };
        };

        let c = input.controls;
        let mut report = FrameReport::default();

        if !c.auto_zoom && !c.mouse_control {
            let p = ring.progression();
            report.paused = true;
            report.depth = p.depth();
            report.zone = p.zone();
            return report;
        }

        let mut speed = c.speed;
        if c.mouse_control {
            speed += input.pointer.magnitude() * POINTER_SPEED_GAIN;
        }

        if c.audio_enabled {
            if let Some(s) = input.spectrum {
                report.energy = s.average_energy();
                report.low_energy = s.low_frequency_energy();
                report.beat = report.low_energy > BEAT_THRESHOLD;
            }
        }
        if report.beat {
            speed *= BEAT_SPEED_BOOST;
        }
        report.effective_speed = speed;

        let summary = ring.advance(ZOOM_STEP * speed, report.energy, &mut self.rng);
        report.recycled = summary.recycled;
        report.regenerated = summary.regenerated;

        ring.update_appearance(self.camera.z);

        if c.mouse_control {
            self.camera.pitch = input.pointer.y * POINTER_LOOK_GAIN;
            self.camera.yaw = input.pointer.x * POINTER_LOOK_GAIN;
        }

        if report.beat {
            ring.pulse_scale(BEAT_SCALE_PULSE);
            if self.rng.f32() > 1.0 - BEAT_REGEN_CHANCE {
                ring.regenerate_all(report.energy, &mut self.rng);
                report.beat_regenerated = true;
            }
        }

        let p = ring.progression();
        report.depth = p.depth();
        report.zone = p.zone();
        report
    }

    /// Composite all layers back to front into the RGBA frame buffer.
    pub fn render(&mut self) -> &[u8] {
        let (w, h) = (self.w, self.h);
        let Some(ring) = self.ring.as_ref() else {
            return &self.frame;
        };
        if w == 0 || h == 0 || self.frame.len() < w * h * 4 {
            return &self.frame;
        }

        let layers = ring.layers();
        self.order.clear();
        self.order.extend(0..layers.len());
        self.order.sort_by(|&a, &b| {
            layers[a]
                .position_z
                .partial_cmp(&layers[b].position_z)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let cam = self.camera;
        let tan_half = (FOV_Y_DEG.to_radians() * 0.5).tan();
        let wf = w as f32;
        let hf = h as f32;

        for y in 0..h {
            let ny = 1.0 - ((y as f32 + 0.5) / hf) * 2.0;
            for x in 0..w {
                let nx = ((x as f32 + 0.5) / wf) * 2.0 - 1.0;
                let (dx, dy, dz) = cam.ray(nx, ny, tan_half);

                let mut acc = [0.0f32; 3];
                for &li in &self.order {
                    let layer = &layers[li];
                    if layer.opacity <= 0.0 || dz.abs() < 1e-6 {
                        continue;
                    }
                    let t = (layer.position_z - cam.z) / dz;
                    if !(NEAR_PLANE..=FAR_PLANE).contains(&t) {
                        continue;
                    }
                    let extent = PLANE_SIZE * layer.scale;
                    let u = (t * dx) / extent + 0.5;
                    let v = 0.5 - (t * dy) / extent;
                    if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
                        continue;
                    }
                    let px = layer.texture().sample(u, v);
                    let a = (px[3] as f32 / 255.0) * layer.opacity;
                    if a <= 0.0 {
                        continue;
                    }
                    for c in 0..3 {
                        acc[c] = px[c] as f32 * a + acc[c] * (1.0 - a);
                    }
                }

                let i = (y * w + x) * 4;
                self.frame[i] = acc[0].clamp(0.0, 255.0) as u8;
                self.frame[i + 1] = acc[1].clamp(0.0, 255.0) as u8;
                self.frame[i + 2] = acc[2].clamp(0.0, 255.0) as u8;
                self.frame[i + 3] = 255;
            }
        }

        &self.frame
    }

    /// Release every layer texture. Later updates and renders are no-ops.
    pub fn shutdown(&mut self) -> Option<TextureStats> {
        let ring = self.ring.take()?;
        let stats = ring.release_all();
        info!(created = stats.created, released = stats.released, "zoom ring released");
        Some(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centre_ray_looks_down_negative_z() {
        let cam = Camera::default();
        let (x, y, z) = cam.ray(0.0, 0.0, 1.0);
        assert!(x.abs() < 1e-6 && y.abs() < 1e-6);
        assert!((z + 1.0).abs() < 1e-6);
    }

    #[test]
    fn negative_yaw_turns_view_toward_positive_x() {
        let cam = Camera {
            yaw: -0.1,
            ..Camera::default()
        };
        let (x, _, _) = cam.ray(0.0, 0.0, 1.0);
        assert!(x > 0.0);
    }

    #[test]
    fn zero_size_render_is_a_no_op() {
        let mut e = ZoomEngine::new(32, Some(1));
        e.resize(0, 0, 1.0);
        assert!(e.render().is_empty());
    }
}
