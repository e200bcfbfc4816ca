//! Procedural pattern generators.
//!
//! Every generator paints a full viewport of side `size` and then opens a portal in
//! its centre. Detail grows with `depth` and audio `energy` (0..=255) and is capped so
//! a single texture stays cheap to build. Stroke and seed positions come from the
//! caller's RNG; the structural counts below are deterministic.

use crate::visual::canvas::{hsl, hsla, Canvas, Rgba, CLEAR};
use fastrand::Rng;
use std::f32::consts::PI;

/// Hard cap on pattern-within-pattern nesting.
pub const MAX_NESTING: u8 = 4;
/// Nested copies smaller than this are not drawn.
pub const MIN_NESTED_SIZE: f32 = 8.0;

pub const MAX_BRANCH_DEPTH: u32 = 18;
pub const MAX_VORONOI_SEEDS: usize = 200;
/// Dots scattered by [`mystery_particles`].
pub const MYSTERY_PARTICLES: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PatternKind {
    Spiral,
    Fractal,
    Geometric,
    Organic,
    Tunnel,
    Voronoi,
}

impl PatternKind {
    pub const fn all() -> [Self; 6] {
        [
            Self::Spiral,
            Self::Fractal,
            Self::Geometric,
            Self::Organic,
            Self::Tunnel,
            Self::Voronoi,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Spiral => "spiral",
            Self::Fractal => "fractal",
            Self::Geometric => "geometric",
            Self::Organic => "organic",
            Self::Tunnel => "tunnel",
            Self::Voronoi => "voronoi",
        }
    }

    pub fn paint(self, canvas: &mut Canvas, size: f32, hue: f32, depth: u32, energy: f32, rng: &mut Rng, nest: Nesting) {
        let energy = clamp_energy(energy);
        match self {
            Self::Spiral => spiral(canvas, size, hue, depth, energy, nest),
            Self::Fractal => fractal(canvas, size, hue, depth, energy, nest),
            Self::Geometric => geometric(canvas, size, hue, depth, energy),
            Self::Organic => organic(canvas, size, hue, depth, energy, rng),
            Self::Tunnel => tunnel(canvas, size, hue, depth, energy, nest),
            Self::Voronoi => voronoi(canvas, size, hue, depth, energy, rng, nest),
        }
    }
}

/// Tracks how deep a nested pattern sits below the top-level texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nesting {
    level: u8,
}

impl Nesting {
    pub const fn root() -> Self {
        Self { level: 0 }
    }

    pub fn level(self) -> u8 {
        self.level
    }

    /// The next level down, or `None` once the cap or the minimum size is reached.
    pub fn deeper(self, child_size: f32) -> Option<Self> {
        if self.level >= MAX_NESTING || !(child_size >= MIN_NESTED_SIZE) {
            return None;
        }
        Some(Self { level: self.level + 1 })
    }
}

fn clamp_energy(e: f32) -> f32 {
    if e.is_finite() { e.clamp(0.0, 255.0) } else { 0.0 }
}

pub fn spiral_sweep(depth: u32, energy: f32) -> f32 {
    PI * (20.0 + (depth.saturating_mul(2)).min(40) as f32 + clamp_energy(energy) / 10.0)
}

pub fn spiral_nests(depth: u32) -> bool {
    depth > 5 && depth % 2 == 0
}

pub fn branch_depth(depth: u32, energy: f32) -> u32 {
    (8 + depth.min(5) + (clamp_energy(energy) / 50.0).floor() as u32).min(MAX_BRANCH_DEPTH)
}

pub fn geometric_ring_count(depth: u32, energy: f32) -> usize {
    12 + depth.saturating_mul(2).min(24) as usize + (clamp_energy(energy) / 20.0).floor() as usize
}

pub fn organic_stroke_count(depth: u32, energy: f32) -> usize {
    20 + depth.saturating_mul(3).min(60) as usize + (clamp_energy(energy) / 10.0).floor() as usize
}

pub fn organic_points_per_stroke(depth: u32, energy: f32) -> usize {
    20 + depth.min(10) as usize + (clamp_energy(energy) / 20.0).floor() as usize
}

pub fn tunnel_ring_count(depth: u32, energy: f32) -> usize {
    15 + depth.min(15) as usize + (clamp_energy(energy) / 30.0).floor() as usize
}

pub fn voronoi_seed_count(depth: u32, energy: f32) -> usize {
    let n = 50.0 + depth.min(1_000) as f32 * 10.0 + clamp_energy(energy) / 5.0;
    (n.ceil() as usize).min(MAX_VORONOI_SEEDS)
}

fn spiral(canvas: &mut Canvas, size: f32, hue: f32, depth: u32, energy: f32, nest: Nesting) {
    let c = size / 2.0;
    let stops = (0..10)
        .map(|i| (i as f32 / 10.0, hsl(hue + i as f32 * 10.0, 70.0, 50.0 + i as f32 * 3.0)))
        .collect::<Vec<_>>();
    canvas.fill_radial_gradient(c, c, 0.0, size / 2.0, &stops);

    let sweep = spiral_sweep(depth, energy);
    let mut points = Vec::with_capacity((sweep / 0.1) as usize + 1);
    let mut angle = 0.0f32;
    while angle < sweep {
        let radius = angle * 2.0;
        points.push((c + angle.cos() * radius, c + angle.sin() * radius));
        angle += 0.1;
    }
    canvas.stroke_polyline(&points, 3.0, hsl(hue + 180.0, 80.0, 80.0));

    if spiral_nests(depth) {
        if let Some(child) = nest.deeper(size / 2.0) {
            canvas.with_viewport(c / 2.0, c / 2.0, size / 2.0, |cv| {
                spiral(cv, size / 2.0, hue + 30.0, depth - 1, energy, child)
            });
        }
    }

    canvas.punch_portal(c, c, 20.0, false);
}

fn fractal(canvas: &mut Canvas, size: f32, hue: f32, depth: u32, energy: f32, nest: Nesting) {
    canvas.fill(hsl(hue, 40.0, 20.0));

    let mut segments = Vec::new();
    collect_branches(size / 2.0, size, size / 4.0, -PI / 2.0, branch_depth(depth, energy), &mut segments);
    for (a, b, bd) in segments {
        let color = hsl(hue + bd as f32 * 20.0, 70.0, 60.0 + bd as f32 * 5.0);
        canvas.stroke_polyline(&[a, b], bd as f32, color);
    }

    if depth > 10 {
        if let Some(child) = nest.deeper(size / 2.0) {
            canvas.with_viewport(0.0, 0.0, size / 2.0, |cv| {
                tunnel(cv, size / 2.0, hue + 60.0, depth / 2, energy, child)
            });
        }
    }

    canvas.punch_portal(size / 2.0, size / 2.0, size / 4.0, true);
}

type Segment = ((f32, f32), (f32, f32), u32);

/// Binary branch tree, depth-first. Recursion is bounded by `MAX_BRANCH_DEPTH`.
fn collect_branches(x: f32, y: f32, length: f32, angle: f32, bd: u32, out: &mut Vec<Segment>) {
    if bd == 0 || length < 2.0 {
        return;
    }
    let ex = x + angle.cos() * length;
    let ey = y + angle.sin() * length;
    out.push(((x, y), (ex, ey), bd));
    collect_branches(ex, ey, length * 0.7, angle - 0.5, bd - 1, out);
    collect_branches(ex, ey, length * 0.7, angle + 0.5, bd - 1, out);
}

fn geometric(canvas: &mut Canvas, size: f32, hue: f32, depth: u32, energy: f32) {
    canvas.fill(hsl(hue, 50.0, 15.0));
    let c = size / 2.0;

    for i in 0..geometric_ring_count(depth, energy) {
        let radius = (i + 1) as f32 * 20.0;
        let sides = 6 + i % 3;
        let points = (0..=sides)
            .map(|j| {
                let a = (j as f32 / sides as f32) * PI * 2.0;
                (c + a.cos() * radius, c + a.sin() * radius)
            })
            .collect::<Vec<_>>();
        let color = hsl(hue + i as f32 * 15.0, 80.0, 40.0 + i as f32 * 3.0);
        canvas.stroke_polyline(&points, 2.0, color);
    }

    canvas.punch_portal(c, c, 15.0, false);
}

fn organic(canvas: &mut Canvas, size: f32, hue: f32, depth: u32, energy: f32, rng: &mut Rng) {
    let c = size / 2.0;
    canvas.fill_radial_gradient(
        c,
        c,
        0.0,
        size / 2.0,
        &[
            (0.0, hsl(hue, 60.0, 40.0)),
            (0.7, hsl(hue + 40.0, 70.0, 25.0)),
            (1.0, hsl(hue + 80.0, 50.0, 10.0)),
        ],
    );

    let per_stroke = organic_points_per_stroke(depth, energy);
    for i in 0..organic_stroke_count(depth, energy) {
        let fi = i as f32;
        let color = hsl(hue + fi * 18.0, 70.0, 50.0 + (i % 4) as f32 * 10.0);
        let width = 3.0 + rng.f32() * 3.0;
        let sx = rng.f32() * size;
        let sy = rng.f32() * size;

        let mut points = Vec::with_capacity(per_stroke + 1);
        points.push((sx, sy));
        for j in 0..per_stroke {
            let fj = j as f32;
            let x = sx + (fj * 0.3 + fi).sin() * 50.0 + rng.f32() * 20.0;
            let y = sy + (fj * 0.2 + fi).cos() * 50.0 + rng.f32() * 20.0;
            points.push((x, y));
        }
        canvas.stroke_polyline(&points, width, color);
    }

    canvas.punch_portal(c, c, 30.0, true);
}

fn tunnel(canvas: &mut Canvas, size: f32, hue: f32, depth: u32, energy: f32, nest: Nesting) {
    canvas.fill(hsl(hue, 30.0, 5.0));
    let c = size / 2.0;

    // Outermost first so each smaller ring stays visible on top of the larger ones.
    let rings = tunnel_ring_count(depth, energy);
    for i in (0..rings).rev() {
        let fi = i as f32;
        let radius = fi * 25.0 + 10.0;
        let stops: [(f32, Rgba); 2] = [(0.0, hsl(hue + fi * 25.0, 60.0, 30.0 + fi * 2.0)), (1.0, CLEAR)];
        canvas.fill_ring_gradient(c, c, radius, radius + 15.0, radius + 15.0, &stops);
    }

    if depth > 8 {
        if let Some(child) = nest.deeper(size / 2.0) {
            canvas.with_viewport(c / 2.0, c / 2.0, size / 2.0, |cv| {
                tunnel(cv, size / 2.0, hue + 45.0, depth - 2, energy, child)
            });
        }
    }

    canvas.punch_portal(c, c, 20.0, false);
}

fn voronoi(canvas: &mut Canvas, size: f32, hue: f32, depth: u32, energy: f32, rng: &mut Rng, nest: Nesting) {
    let seeds = (0..voronoi_seed_count(depth, energy))
        .map(|_| (rng.f32() * size, rng.f32() * size))
        .collect::<Vec<_>>();
    let colors = (0..seeds.len())
        .map(|i| hsl(hue + i as f32 * 10.0, 60.0, 30.0 + (i % 10) as f32 * 5.0))
        .collect::<Vec<_>>();

    canvas.fill(hsl(hue, 30.0, 10.0));

    // Stride-2 grid keeps the nearest-seed scan at a quarter of the pixel count.
    let n = size.max(0.0) as usize;
    for y in (0..n).step_by(2) {
        for x in (0..n).step_by(2) {
            let (px, py) = (x as f32, y as f32);
            let mut best = f32::INFINITY;
            let mut closest = 0usize;
            for (i, &(sx, sy)) in seeds.iter().enumerate() {
                let d = (sx - px) * (sx - px) + (sy - py) * (sy - py);
                if d < best {
                    best = d;
                    closest = i;
                }
            }
            canvas.fill_block(px, py, 2.0, 2.0, colors[closest]);
        }
    }

    if depth > 15 {
        let third = size / 3.0;
        if nest.deeper(third).is_some() {
            canvas.with_viewport(0.0, 0.0, third, |cv| organic(cv, third, hue + 120.0, depth / 3, energy, rng));
        }
    }

    canvas.punch_portal(size / 2.0, size / 2.0, 20.0, false);
}

/// Scatter of bright dots drawn over rare textures past depth 10.
pub fn mystery_particles(canvas: &mut Canvas, size: f32, hue: f32, rng: &mut Rng) {
    let color = hsla(hue + 180.0, 100.0, 80.0, 1.0);
    for _ in 0..MYSTERY_PARTICLES {
        let x = rng.f32() * size;
        let y = rng.f32() * size;
        canvas.fill_circle(x, y, 2.0, color);
    }
}
