use std::time::{Duration, Instant};

use anyhow::Result;
use infinite_zoom::audio::{Spectrum, BIN_COUNT};
use infinite_zoom::input::{Controls, Pointer};
use infinite_zoom::visual::canvas::Canvas;
use infinite_zoom::visual::patterns::Nesting;
use infinite_zoom::visual::{FrameInput, PatternKind, ZoomEngine};

struct Args {
    frames: usize,
    reps: usize,
    w: usize,
    h: usize,
    texture_size: usize,
    ci_smoke: bool,
    quick: bool,
    max_ms: f64,
}

fn parse_args() -> Args {
    let mut args = Args {
        frames: 240,
        reps: 4,
        w: 160,
        h: 88,
        texture_size: 512,
        ci_smoke: false,
        quick: false,
        max_ms: 250.0,
    };

    let argv = std::env::args().skip(1).collect::<Vec<_>>();
    let mut i = 0usize;
    while i < argv.len() {
        let k = argv[i].as_str();
        let v = argv.get(i + 1).map(|s| s.as_str());
        match (k, v) {
            ("--frames", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.frames = n.max(1);
                }
                i += 2;
            }
            ("--reps", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.reps = n.max(1);
                }
                i += 2;
            }
            ("--w", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.w = n.max(1);
                }
                i += 2;
            }
            ("--h", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.h = n.max(1);
                }
                i += 2;
            }
            ("--texture-size", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.texture_size = n.clamp(16, 1024);
                }
                i += 2;
            }
            ("--ci-smoke", Some(x)) if !x.starts_with("--") => {
                args.ci_smoke = parse_bool(x).unwrap_or(true);
                i += 2;
            }
            ("--ci-smoke", _) => {
                args.ci_smoke = true;
                i += 1;
            }
            ("--quick", Some(x)) if !x.starts_with("--") => {
                args.quick = parse_bool(x).unwrap_or(true);
                i += 2;
            }
            ("--quick", _) => {
                args.quick = true;
                i += 1;
            }
            ("--max-ms", Some(x)) => {
                if let Ok(v) = x.parse::<f64>() {
                    args.max_ms = v.max(0.1);
                }
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }
    if args.quick {
        args.frames = args.frames.min(60);
        args.reps = args.reps.min(1);
        args.texture_size = args.texture_size.min(256);
    }
    args
}

fn parse_bool(s: &str) -> Option<bool> {
    let v = s.trim().to_ascii_lowercase();
    match v.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// A kick on every 24th frame over a slowly breathing floor.
fn synth_spectrum(step: usize) -> Spectrum {
    let t = step as f32 / 60.0;
    let floor = ((t * 1.7).sin() * 0.5 + 0.5) * 90.0;
    let kick = if step % 24 == 0 { 170.0 } else { 0.0 };
    let bins: [u8; BIN_COUNT] = std::array::from_fn(|k| {
        let tilt = 1.0 - k as f32 / BIN_COUNT as f32;
        let low = if k < 12 { kick } else { 0.0 };
        (floor * tilt + low).clamp(0.0, 255.0) as u8
    });
    Spectrum::from_bins(bins)
}

fn bench_generators(args: &Args) -> Vec<(String, f64)> {
    let size = args.texture_size;
    let mut rng = fastrand::Rng::with_seed(0x5eed);
    let mut slow = Vec::new();

    println!("Generator benchmark: texture={}x{} reps={}", size, size, args.reps);
    for kind in PatternKind::all() {
        for depth in [0u32, 5, 10, 20] {
            for energy in [0.0f32, 128.0, 255.0] {
                let start = Instant::now();
                let mut covered = 0usize;
                for _ in 0..args.reps {
                    let mut canvas = Canvas::new(size);
                    kind.paint(&mut canvas, size as f32, 200.0, depth, energy, &mut rng, Nesting::root());
                    covered = canvas.pixels().chunks_exact(4).filter(|p| p[3] != 0).count();
                }
                let ms = start.elapsed().as_secs_f64() * 1000.0 / args.reps as f64;
                let pct = covered as f64 * 100.0 / (size * size).max(1) as f64;
                println!(
                    "  {:<10} depth={:>2} energy={:>5.1} {:>8.3} ms/texture  coverage={:>5.1}%",
                    kind.name(),
                    depth,
                    energy,
                    ms,
                    pct
                );
                if ms > args.max_ms {
                    slow.push((format!("{} d={} e={}", kind.name(), depth, energy), ms));
                }
            }
        }
    }
    slow
}

fn bench_engine(args: &Args) -> bool {
    let mut engine = ZoomEngine::new(args.texture_size, Some(7));
    engine.resize(args.w, args.h, 1.0);
    let controls = Controls {
        audio_enabled: true,
        speed: 2.0,
        ..Controls::default()
    };

    println!(
        "Engine benchmark: frames={} size={}x{} texture={}",
        args.frames, args.w, args.h, args.texture_size
    );

    let mut update_time = Duration::ZERO;
    let mut render_time = Duration::ZERO;
    let mut lit = 0usize;
    let mut beats = 0usize;
    let mut regens = 0usize;
    for f in 0..args.frames {
        let a = f as f32 * 0.013;
        let input = FrameInput {
            controls,
            pointer: Pointer::new(a.cos() * 0.4, a.sin() * 0.3),
            spectrum: Some(synth_spectrum(f)),
        };

        let t0 = Instant::now();
        let report = engine.update(&input);
        update_time += t0.elapsed();
        if report.beat {
            beats += 1;
        }
        regens += report.regenerated + if report.beat_regenerated { 8 } else { 0 };

        let t1 = Instant::now();
        let px = engine.render();
        render_time += t1.elapsed();
        if px.chunks_exact(4).any(|p| p[0] != 0 || p[1] != 0 || p[2] != 0) {
            lit += 1;
        }
    }

    let n = args.frames.max(1) as f64;
    let upd_ms = update_time.as_secs_f64() * 1000.0 / n;
    let ren_ms = render_time.as_secs_f64() * 1000.0 / n;
    let total = upd_ms + ren_ms;
    let fps = if total > 0.0 { 1000.0 / total } else { 0.0 };
    let p = engine.progression();
    println!(
        "  update {:>8.3} ms  render {:>8.3} ms  ({:>7.2} FPS)  lit={}/{} beats={} regenerated={} depth={} zone={}",
        upd_ms,
        ren_ms,
        fps,
        lit,
        args.frames,
        beats,
        regens,
        p.depth(),
        p.zone()
    );

    let stats = engine.shutdown().unwrap_or_default();
    println!("  textures created={} released={}", stats.created, stats.released);
    lit > 0 && stats.live() == 0
}

fn main() -> Result<()> {
    let args = parse_args();
    let slow = bench_generators(&args);
    let engine_ok = bench_engine(&args);

    if args.ci_smoke {
        if !slow.is_empty() || !engine_ok {
            eprintln!("CI smoke: FAIL");
            for (name, ms) in slow {
                eprintln!("  slow generator: {} ({:.3} ms > {:.3})", name, ms, args.max_ms);
            }
            if !engine_ok {
                eprintln!("  engine produced no lit frames or leaked textures");
            }
            anyhow::bail!("ci smoke failed");
        }
        println!("CI smoke: PASS (max_ms={:.3})", args.max_ms);
    }
    Ok(())
}
