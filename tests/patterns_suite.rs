use fastrand::Rng;
use infinite_zoom::visual::canvas::{hsl, hsla, Canvas};
use infinite_zoom::visual::patterns::{
    branch_depth, geometric_ring_count, mystery_particles, organic_points_per_stroke, organic_stroke_count,
    spiral_nests, spiral_sweep, tunnel_ring_count, voronoi_seed_count, Nesting, MAX_BRANCH_DEPTH,
    MAX_VORONOI_SEEDS, MYSTERY_PARTICLES,
};
use infinite_zoom::visual::texture::{zone_patterns, TextureFactory};
use infinite_zoom::visual::PatternKind;
use std::f32::consts::PI;

fn paint(kind: PatternKind, size: usize, depth: u32, energy: f32, seed: u64) -> Canvas {
    let mut canvas = Canvas::new(size);
    let mut rng = Rng::with_seed(seed);
    kind.paint(&mut canvas, size as f32, 120.0, depth, energy, &mut rng, Nesting::root());
    canvas
}

// ── Detail formulas ─────────────────────────────────────────────────────────

#[test]
fn counts_at_rest() {
    assert_eq!(spiral_sweep(0, 0.0), 20.0 * PI);
    assert_eq!(branch_depth(0, 0.0), 8);
    assert_eq!(geometric_ring_count(0, 0.0), 12);
    assert_eq!(organic_stroke_count(0, 0.0), 20);
    assert_eq!(organic_points_per_stroke(0, 0.0), 20);
    assert_eq!(tunnel_ring_count(0, 0.0), 15);
    assert_eq!(voronoi_seed_count(0, 0.0), 50);
}

#[test]
fn counts_saturate_with_depth() {
    assert_eq!(spiral_sweep(100, 0.0), 60.0 * PI);
    assert_eq!(branch_depth(100, 0.0), 13);
    assert_eq!(geometric_ring_count(100, 0.0), 36);
    assert_eq!(organic_stroke_count(100, 0.0), 80);
    assert_eq!(organic_points_per_stroke(100, 0.0), 30);
    assert_eq!(tunnel_ring_count(100, 0.0), 30);
    assert_eq!(voronoi_seed_count(100, 0.0), MAX_VORONOI_SEEDS);
}

#[test]
fn energy_adds_detail_up_to_the_caps() {
    assert_eq!(branch_depth(5, 255.0), 18);
    assert!(branch_depth(u32::MAX, 255.0) <= MAX_BRANCH_DEPTH);
    assert_eq!(geometric_ring_count(0, 255.0), 12 + 12);
    assert_eq!(organic_stroke_count(0, 100.0), 30);
    assert_eq!(tunnel_ring_count(0, 90.0), 18);
    assert_eq!(voronoi_seed_count(1, 3.0), 61);
}

#[test]
fn energy_outside_byte_range_is_clamped() {
    assert_eq!(geometric_ring_count(0, 10_000.0), geometric_ring_count(0, 255.0));
    assert_eq!(geometric_ring_count(0, -50.0), geometric_ring_count(0, 0.0));
    assert_eq!(tunnel_ring_count(3, f32::NAN), tunnel_ring_count(3, 0.0));
}

#[test]
fn spiral_nests_on_even_depths_past_five() {
    assert!(!spiral_nests(4));
    assert!(spiral_nests(6));
    assert!(!spiral_nests(7));
    assert!(spiral_nests(12));
}

// ── Painting ────────────────────────────────────────────────────────────────

#[test]
fn every_generator_paints_and_opens_a_portal() {
    for kind in PatternKind::all() {
        let c = paint(kind, 128, 3, 64.0, 42);
        let mid = c.pixel(64, 64);
        // Feathered portals keep a sliver of alpha right at the centre.
        assert!(mid[3] < 16, "{} portal alpha {}", kind.name(), mid[3]);
        let painted = c.pixels().chunks_exact(4).filter(|p| p[3] > 0).count();
        assert!(painted > 128 * 128 / 4, "{} painted only {painted} px", kind.name());
    }
}

#[test]
fn deep_high_energy_textures_stay_bounded() {
    for kind in PatternKind::all() {
        let c = paint(kind, 64, 60, 255.0, 7);
        assert_eq!(c.pixels().len(), 64 * 64 * 4);
    }
}

#[test]
fn tiny_and_empty_canvases_do_not_panic() {
    for kind in PatternKind::all() {
        for size in [0usize, 1, 3, 9] {
            let _ = paint(kind, size, 20, 200.0, 1);
        }
    }
}

#[test]
fn structural_output_is_seed_deterministic() {
    for kind in PatternKind::all() {
        let a = paint(kind, 48, 12, 90.0, 99);
        let b = paint(kind, 48, 12, 90.0, 99);
        assert_eq!(a.pixels(), b.pixels(), "{}", kind.name());
    }
}

#[test]
fn nested_viewport_painting_stays_inside_its_box() {
    let mut c = Canvas::new(32);
    let mut rng = Rng::with_seed(3);
    let nest = Nesting::root().deeper(16.0).expect("room to nest");
    c.with_viewport(8.0, 8.0, 16.0, |cv| {
        PatternKind::Geometric.paint(cv, 16.0, 0.0, 0, 0.0, &mut rng, nest)
    });
    for y in 0..32 {
        for x in 0..32 {
            let inside = (8..24).contains(&x) && (8..24).contains(&y);
            if !inside {
                assert_eq!(c.pixel(x, y)[3], 0, "leak at {x},{y}");
            }
        }
    }
}

#[test]
fn tunnel_keeps_inner_rings_visible() {
    let c = paint(PatternKind::Tunnel, 256, 0, 0.0, 1);
    // Ring 1 starts at radius 35 and ring 2 at radius 60, both at full colour.
    assert_eq!(c.pixel(158, 128), hsl(120.0 + 25.0, 60.0, 32.0));
    assert_eq!(c.pixel(183, 128), hsl(120.0 + 50.0, 60.0, 34.0));
}

#[test]
fn deep_fractal_nests_a_tunnel_in_the_top_left_quadrant() {
    let c = paint(PatternKind::Fractal, 128, 12, 0.0, 4);
    // The nested tunnel opens its own portal at the centre of its quadrant.
    assert_eq!(c.pixel(32, 32)[3], 0);
    assert_eq!(c.pixel(96, 96)[3], 255);
}

#[test]
fn deep_voronoi_overlays_organic_from_the_origin() {
    let c = paint(PatternKind::Voronoi, 96, 16, 0.0, 6);
    assert!(c.pixel(16, 16)[3] < 16, "alpha {}", c.pixel(16, 16)[3]);
    assert_eq!(c.pixel(80, 80)[3], 255);
}

#[test]
fn mystery_particles_scatter_bright_complementary_dots() {
    let mut c = Canvas::new(64);
    let mut rng = Rng::with_seed(8);
    mystery_particles(&mut c, 64.0, 30.0, &mut rng);
    let dot = hsla(210.0, 100.0, 80.0, 1.0);
    let lit = c.pixels().chunks_exact(4).filter(|p| *p == dot).count();
    assert!(lit >= MYSTERY_PARTICLES, "lit={lit}");
    assert!(c.pixels().chunks_exact(4).all(|p| p[3] == 0 || p == dot));
}

// ── Texture composition ─────────────────────────────────────────────────────

#[test]
fn zones_cycle_through_three_pattern_pairs() {
    assert_eq!(zone_patterns(0), [PatternKind::Geometric, PatternKind::Voronoi]);
    assert_eq!(zone_patterns(1), [PatternKind::Organic, PatternKind::Spiral]);
    assert_eq!(zone_patterns(2), [PatternKind::Fractal, PatternKind::Tunnel]);
    assert_eq!(zone_patterns(3), zone_patterns(0));
}

#[test]
fn deep_textures_sometimes_get_a_meta_overlay() {
    let mut f = TextureFactory::new(64);
    let mut rng = Rng::with_seed(21);
    let overlays = (0..40).filter(|&i| f.create(i, 8, 0, 0.0, &mut rng).meta_overlay).count();
    assert!(overlays > 0 && overlays < 40, "overlays={overlays}");
}

#[test]
fn mystery_dots_appear_only_past_depth_ten() {
    let mut f = TextureFactory::new(32);
    let mut rng = Rng::with_seed(17);
    assert!((0..200).all(|i| !f.create(i, 10, 0, 0.0, &mut rng).mystery));
    let hits = (0..200).filter(|&i| f.create(i, 11, 0, 0.0, &mut rng).mystery).count();
    assert!(hits > 0 && hits < 200, "hits={hits}");
}

#[test]
fn hsl_matches_css_conventions() {
    assert_eq!(hsl(0.0, 100.0, 50.0), [255, 0, 0, 255]);
    assert_eq!(hsl(480.0, 100.0, 50.0), hsl(120.0, 100.0, 50.0));
    assert_eq!(hsl(200.0, 0.0, 100.0), [255, 255, 255, 255]);
}
