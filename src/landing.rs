//! Hero screen shown before the zoom starts. Activation plays a short exit fade,
//! after which the app hands over to the experience view.

use fastrand::Rng;
use std::time::{Duration, Instant};
use tracing::info;

pub const EXIT_DURATION: Duration = Duration::from_millis(550);
pub const PARTICLE_COUNT: usize = 24;
const TWINKLE_PERIOD_S: f32 = 6.0;

pub const TITLE: &str = "Think better with Infinite Zoom\n\
Never miss a note, idea or connection. An endless journey through generative dimensions.\n\
\n\
[ Enter ] Start    [ q ] Quit";

const BACKGROUND: [f32; 3] = [6.0, 4.0, 14.0];
const ARC_STOPS: [(f32, [f32; 4]); 4] = [
    (0.0, [155.0, 92.0, 255.0, 1.0]),
    (0.4, [124.0, 58.0, 237.0, 0.95]),
    (0.7, [76.0, 201.0, 240.0, 0.55]),
    (1.0, [0.0, 0.0, 0.0, 0.0]),
];
const GLOW_STOPS: [(f32, [f32; 4]); 3] = [
    (0.0, [124.0, 58.0, 237.0, 0.7]),
    (0.5, [155.0, 92.0, 255.0, 0.95]),
    (1.0, [6.0, 182.0, 212.0, 0.3]),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LandingPhase {
    Idle,
    Exiting { started: Instant },
    Done,
}

#[derive(Clone, Copy, Debug)]
struct Particle {
    /// Percent of width.
    left: f32,
    /// Percent of height.
    top: f32,
    size: f32,
    delay: f32,
}

pub struct Landing {
    phase: LandingPhase,
    particles: Vec<Particle>,
    born: Instant,
}

impl Landing {
    pub fn new(rng: &mut Rng, now: Instant) -> Self {
        let particles = (0..PARTICLE_COUNT)
            .map(|_| Particle {
                left: rng.f32() * 100.0,
                top: 10.0 + rng.f32() * 60.0,
                size: 1.0 + rng.f32() * 3.0,
                delay: rng.f32() * TWINKLE_PERIOD_S,
            })
            .collect();
        Self {
            phase: LandingPhase::Idle,
            particles,
            born: now,
        }
    }

    /// Start the exit transition. Returns false when already exiting or done.
    pub fn activate(&mut self, now: Instant) -> bool {
        if self.phase != LandingPhase::Idle {
            return false;
        }
        self.phase = LandingPhase::Exiting { started: now };
        info!("landing exit started");
        true
    }

    pub fn update(&mut self, now: Instant) -> LandingPhase {
        if let LandingPhase::Exiting { started } = self.phase {
            if now.saturating_duration_since(started) >= EXIT_DURATION {
                self.phase = LandingPhase::Done;
                info!("landing done");
            }
        }
        self.phase
    }

    pub fn exit_progress(&self, now: Instant) -> f32 {
        match self.phase {
            LandingPhase::Idle => 0.0,
            LandingPhase::Exiting { started } => {
                let t = now.saturating_duration_since(started).as_secs_f32();
                (t / EXIT_DURATION.as_secs_f32()).clamp(0.0, 1.0)
            }
            LandingPhase::Done => 1.0,
        }
    }

    /// Title text while the hero is still mostly visible.
    pub fn caption(&self, now: Instant) -> Option<&'static str> {
        (self.exit_progress(now) < 0.5).then_some(TITLE)
    }

    /// Paint the horizon arc and particles into an RGBA buffer of `w`×`h`.
    pub fn render(&self, rgba: &mut [u8], w: usize, h: usize, now: Instant) {
        if w == 0 || h == 0 || rgba.len() < w * h * 4 {
            return;
        }
        let fade = 1.0 - self.exit_progress(now);
        let secs = now.saturating_duration_since(self.born).as_secs_f32();
        let wf = w as f32;
        let hf = h as f32;

        // Horizon occupies the bottom 40% of the view; its 1200x300 box maps onto it.
        let box_top = hf * 0.6;
        let box_h = hf * 0.4;
        let line_y0 = box_top + box_h * (196.0 / 300.0);
        let line_y1 = box_top + box_h * (202.0 / 300.0);

        for y in 0..h {
            let yf = y as f32 + 0.5;
            for x in 0..w {
                let xf = x as f32 + 0.5;
                let u = xf / wf;
                let mut c = BACKGROUND;

                if yf >= box_top {
                    let v = (yf - box_top) / box_h;
                    if v >= arc_top(u) / 300.0 {
                        // Radial gradient centered at (50%, 40%) with r = 50% of the box.
                        let dx = u - 0.5;
                        let dy = (v - 0.4) * (box_h / wf);
                        let t = ((dx * dx + dy * dy).sqrt() / 0.5).clamp(0.0, 1.0);
                        c = over(c, gradient(&ARC_STOPS, t), 0.98);
                    }
                    if yf >= line_y0 && yf < line_y1.max(line_y0 + 1.0) {
                        c = over(c, gradient(&GLOW_STOPS, u), 0.9);
                    }
                }

                let i = (y * w + x) * 4;
                rgba[i] = (c[0] * fade).clamp(0.0, 255.0) as u8;
                rgba[i + 1] = (c[1] * fade).clamp(0.0, 255.0) as u8;
                rgba[i + 2] = (c[2] * fade).clamp(0.0, 255.0) as u8;
                rgba[i + 3] = 255;
            }
        }

        for p in &self.particles {
            let phase = (secs + p.delay) / TWINKLE_PERIOD_S * std::f32::consts::TAU;
            let glow = (0.35 + 0.65 * (0.5 + 0.5 * phase.sin())) * fade;
            let cx = p.left / 100.0 * wf;
            let cy = p.top / 100.0 * hf;
            let r = (p.size * 0.5).max(0.5);
            let x0 = (cx - r).floor().max(0.0) as usize;
            let y0 = (cy - r).floor().max(0.0) as usize;
            let x1 = ((cx + r).ceil() as usize).min(w);
            let y1 = ((cy + r).ceil() as usize).min(h);
            for y in y0..y1 {
                for x in x0..x1 {
                    let i = (y * w + x) * 4;
                    let add = 230.0 * glow;
                    rgba[i] = (rgba[i] as f32 + add).min(255.0) as u8;
                    rgba[i + 1] = (rgba[i + 1] as f32 + add).min(255.0) as u8;
                    rgba[i + 2] = (rgba[i + 2] as f32 + add * 1.1).min(255.0) as u8;
                }
            }
        }
    }
}

/// Top edge of the arc in box units (0..300) at horizontal position `u`.
fn arc_top(u: f32) -> f32 {
    let t = u.clamp(0.0, 1.0);
    let s = 1.0 - t;
    s * s * s * 200.0 + 3.0 * s * s * t * 40.0 + 3.0 * s * t * t * 40.0 + t * t * t * 200.0
}

fn gradient(stops: &[(f32, [f32; 4])], t: f32) -> [f32; 4] {
    let Some(first) = stops.first() else {
        return [0.0; 4];
    };
    if t <= first.0 {
        return first.1;
    }
    for pair in stops.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let k = if t1 > t0 { (t - t0) / (t1 - t0) } else { 1.0 };
            return std::array::from_fn(|i| c0[i] + (c1[i] - c0[i]) * k);
        }
    }
    stops[stops.len() - 1].1
}

fn over(dst: [f32; 3], src: [f32; 4], opacity: f32) -> [f32; 3] {
    let a = (src[3] * opacity).clamp(0.0, 1.0);
    std::array::from_fn(|i| src[i] * a + dst[i] * (1.0 - a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arc_dips_in_the_middle() {
        assert_eq!(arc_top(0.0), 200.0);
        assert_eq!(arc_top(1.0), 200.0);
        assert!((arc_top(0.5) - 80.0).abs() < 1e-3);
    }

    #[test]
    fn activation_runs_once_and_finishes_after_exit_duration() {
        let t0 = Instant::now();
        let mut l = Landing::new(&mut Rng::with_seed(2), t0);
        assert!(l.activate(t0));
        assert!(!l.activate(t0 + Duration::from_millis(10)));
        assert!(matches!(l.update(t0 + Duration::from_millis(300)), LandingPhase::Exiting { .. }));
        assert_eq!(l.update(t0 + EXIT_DURATION), LandingPhase::Done);
        assert_eq!(l.exit_progress(t0), 1.0);
    }

    #[test]
    fn faded_out_frame_is_black() {
        let t0 = Instant::now();
        let mut l = Landing::new(&mut Rng::with_seed(5), t0);
        l.activate(t0);
        let done = t0 + EXIT_DURATION;
        let mut buf = vec![7u8; 16 * 8 * 4];
        l.render(&mut buf, 16, 8, done);
        assert!(buf.chunks_exact(4).all(|p| p[..3] == [0, 0, 0] && p[3] == 255));
    }
}
