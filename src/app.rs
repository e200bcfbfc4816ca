use crate::audio::{AudioStatus, LazyAudio};
use crate::config::Config;
use crate::input::{ControlKey, Controls, InputEffect, InputEvent, InputState, MAX_SPEED, MIN_SPEED};
use crate::landing::{Landing, LandingPhase};
use crate::render::{make_renderer, Frame, Renderer};
use crate::terminal::TerminalGuard;
use crate::visual::{FrameInput, FrameReport, ZoomEngine};
use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, MouseButton, MouseEventKind};
use std::io::{BufWriter, Write};
use std::time::{Duration, Instant};
use tracing::info;

/// Width/height of one terminal cell.
const CELL_ASPECT: f32 = 0.5;
const BEAT_FLASH: Duration = Duration::from_millis(180);

/// Controls at startup, from command-line flags.
pub fn initial_controls(cfg: &Config) -> Controls {
    let speed = if cfg.speed.is_finite() { cfg.speed } else { 1.0 };
    let volume = if cfg.volume.is_finite() { cfg.volume } else { 0.5 };
    Controls {
        speed: speed.clamp(MIN_SPEED, MAX_SPEED),
        mouse_control: !cfg.no_mouse,
        audio_enabled: cfg.audio,
        volume: volume.clamp(0.0, 1.0),
        ..Controls::default()
    }
}

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let size = crossterm::terminal::size().context("get terminal size")?;
    if size.1 < 2 || size.0 < 4 {
        return Err(anyhow::anyhow!(
            "terminal too small (need at least 4x2, got {}x{})",
            size.0,
            size.1
        ));
    }

    let mut engine = ZoomEngine::new(cfg.texture_size(), cfg.seed);
    let mut audio = LazyAudio::new(&cfg.track);
    info!(renderer = ?cfg.renderer, fps = cfg.fps, track = %cfg.track.display(), "starting");

    let result = {
        let _term = TerminalGuard::new(!cfg.no_mouse)?;
        let mut out = BufWriter::new(TerminalGuard::stdout());
        frame_loop(&cfg, size, &mut engine, &mut audio, &mut out)
    };

    audio.shutdown();
    if let Some(stats) = engine.shutdown() {
        info!(live = stats.live(), "shutdown complete");
    }
    result
}

struct Viewport {
    size: (u16, u16),
    hud_rows: u16,
}

impl Viewport {
    fn visual_rows(&self) -> u16 {
        self.size.1.saturating_sub(self.hud_rows).max(1)
    }

    fn pixels(&self, px_w_mul: usize, px_h_mul: usize) -> (usize, usize) {
        (
            (self.size.0 as usize).saturating_mul(px_w_mul),
            (self.visual_rows() as usize).saturating_mul(px_h_mul),
        )
    }
}

fn frame_loop(
    cfg: &Config,
    size: (u16, u16),
    engine: &mut ZoomEngine,
    audio: &mut LazyAudio,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let mut renderer: Box<dyn Renderer> = make_renderer(cfg.renderer);
    let (px_w_mul, px_h_mul) = cfg.renderer.pixels_per_cell();
    let pixel_aspect = CELL_ASPECT * px_h_mul as f32 / px_w_mul as f32;

    let mut input = InputState::new(initial_controls(cfg));
    if input.controls().audio_enabled {
        audio.set_enabled(true, input.controls().volume);
    }

    let mut rng = match cfg.seed {
        Some(s) => fastrand::Rng::with_seed(s ^ 0x6c61_6e64),
        None => fastrand::Rng::new(),
    };
    let mut landing = (!cfg.skip_landing).then(|| Landing::new(&mut rng, Instant::now()));
    let mut landing_px: Vec<u8> = Vec::new();

    let mut view = Viewport {
        size,
        hud_rows: hud_rows_for_size(size, input.snapshot().show_hud),
    };
    let (w, h) = view.pixels(px_w_mul, px_h_mul);
    engine.resize(w, h, pixel_aspect);

    let mut fps = FpsCounter::new();
    let mut last_report = FrameReport::default();
    let mut last_beat: Option<Instant> = None;

    loop {
        let now = Instant::now();

        // Drain input events (non-blocking).
        while event::poll(Duration::from_millis(0))? {
            let ev = event::read()?;
            if let Some(l) = landing.as_mut() {
                match ev {
                    Event::Key(k) if k.kind != KeyEventKind::Release => {
                        if ControlKey::from_key(k.code, k.modifiers) == Some(ControlKey::Quit) {
                            return Ok(());
                        }
                        if matches!(k.code, KeyCode::Enter | KeyCode::Char(' ')) {
                            l.activate(now);
                        }
                    }
                    Event::Mouse(m) if matches!(m.kind, MouseEventKind::Down(MouseButton::Left)) => {
                        l.activate(now);
                    }
                    Event::Resize(c, r) => view.size = (c, r),
                    _ => {}
                }
                continue;
            }

            let event = match ev {
                Event::Key(k) if k.kind != KeyEventKind::Release => {
                    ControlKey::from_key(k.code, k.modifiers).map(InputEvent::Key)
                }
                Event::Mouse(m) => InputEvent::from_mouse(m, view.size.0, view.visual_rows()),
                Event::Resize(c, r) => {
                    view.size = (c, r);
                    None
                }
                _ => None,
            };
            let Some(event) = event else {
                continue;
            };
            match input.apply(event) {
                InputEffect::Quit => return Ok(()),
                InputEffect::AudioToggled(on) => {
                    info!(enabled = on, "audio toggled");
                    audio.set_enabled(on, input.controls().volume);
                }
                InputEffect::VolumeChanged => audio.set_volume(input.controls().volume),
                InputEffect::None => {}
            }
        }

        // Size check once per frame (resize events can be missed in some terminals).
        let sz = crossterm::terminal::size()?;
        if sz != view.size {
            view.size = sz;
        }

        let (term_cols, term_rows) = view.size;

        if let Some(l) = landing.as_mut() {
            if l.update(now) == LandingPhase::Done {
                landing = None;
                info!("entering experience");
            } else {
                let w = (term_cols as usize).saturating_mul(px_w_mul);
                let h = (term_rows as usize).saturating_mul(px_h_mul);
                landing_px.resize(w.saturating_mul(h).saturating_mul(4), 0);
                l.render(&mut landing_px, w, h, now);
                let frame = Frame {
                    term_cols,
                    term_rows,
                    visual_rows: term_rows,
                    pixel_width: w,
                    pixel_height: h,
                    pixels_rgba: &landing_px,
                    hud: "",
                    hud_rows: 0,
                    hud_highlight: None,
                    hud_highlight_phase: false,
                    caption: l.caption(now),
                    overlay: None,
                    sync_updates: cfg.sync_updates,
                };
                renderer.render(&frame, out)?;
                pace(now, cfg.fps);
                continue;
            }
        }

        let snap = input.snapshot();
        let status = audio.status();
        if last_report.beat {
            last_beat = Some(now);
        }
        let beat_lit = last_beat.is_some_and(|t| now.saturating_duration_since(t) < BEAT_FLASH);

        let hud = if snap.show_hud {
            build_hud(term_cols as usize, &snap.controls, &last_report, status, fps.fps(), beat_lit)
        } else {
            String::new()
        };

        view.hud_rows = hud_rows_for_text(term_rows, snap.show_hud, &hud);
        let visual_rows = view.visual_rows();
        let (w, h) = view.pixels(px_w_mul, px_h_mul);
        if engine.frame_size() != (w, h) {
            engine.resize(w, h, pixel_aspect);
        }

        let spectrum = if snap.controls.audio_enabled { audio.spectrum() } else { None };
        last_report = engine.update(&FrameInput {
            controls: snap.controls,
            pointer: snap.pointer,
            spectrum,
        });
        let pixels = engine.render();

        let frame = Frame {
            term_cols,
            term_rows,
            visual_rows,
            pixel_width: w,
            pixel_height: h,
            pixels_rgba: pixels,
            hud: &hud,
            hud_rows: view.hud_rows,
            hud_highlight: beat_lit.then_some("BEAT"),
            hud_highlight_phase: beat_lit,
            caption: None,
            overlay: snap.show_help.then(help_popup_text),
            sync_updates: cfg.sync_updates,
        };
        renderer.render(&frame, out)?;

        fps.tick();
        pace(now, cfg.fps);
    }
}

fn pace(frame_start: Instant, fps: u32) {
    let target = Duration::from_secs_f32(1.0 / fps.max(1) as f32);
    let elapsed = frame_start.elapsed();
    if elapsed < target {
        std::thread::sleep(target - elapsed);
    }
}

fn hud_rows_for_size(size: (u16, u16), show_hud: bool) -> u16 {
    if !show_hud {
        return 0;
    }
    let rows = size.1;
    if rows <= 1 {
        return 0;
    }
    (rows - 1).min(3)
}

fn hud_rows_for_text(term_rows: u16, show_hud: bool, hud: &str) -> u16 {
    if !show_hud {
        return 0;
    }
    let max_rows = term_rows.saturating_sub(1);
    let wanted = hud.lines().count() as u16;
    wanted.min(max_rows)
}

fn on_off(b: bool) -> &'static str {
    if b { "on" } else { "off" }
}

fn audio_label(status: AudioStatus) -> &'static str {
    match status {
        AudioStatus::Idle => "off",
        AudioStatus::Playing => "playing",
        AudioStatus::Paused => "paused",
        AudioStatus::Unavailable => "unavailable",
    }
}

pub fn build_hud(
    cols: usize,
    controls: &Controls,
    report: &FrameReport,
    audio: AudioStatus,
    fps: f32,
    beat_lit: bool,
) -> String {
    let mut lines = vec![format!(
        "Depth: {} | Zone: {} | Speed: {:.1}x | Auto: {} | Mouse: {} | Audio: {} | Vol: {:.0}% | FPS: {:>4.1}",
        report.depth,
        report.zone,
        controls.speed,
        on_off(controls.auto_zoom),
        on_off(controls.mouse_control),
        audio_label(audio),
        controls.volume * 100.0,
        fps,
    )];
    if controls.audio_enabled && audio == AudioStatus::Playing {
        lines.push(format!(
            "Energy: {:>5.1} | Low: {:>5.1}{}",
            report.energy,
            report.low_energy,
            if beat_lit { " | BEAT" } else { "" }
        ));
    } else if report.paused {
        lines.push("Paused: enable auto-zoom (space) or mouse (m)".to_string());
    }
    lines.push("Keys: space auto | m mouse | a audio | up/down speed | +/- volume | i HUD | ? help | q quit".to_string());

    wrap_hud_lines(cols, &lines).join("\n")
}

fn wrap_hud_lines(cols: usize, lines: &[String]) -> Vec<String> {
    let width = cols.max(1);
    let mut out = Vec::new();
    for line in lines {
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            out.push(String::new());
            continue;
        }
        out.extend(chars.chunks(width).map(|c| c.iter().collect::<String>()));
    }
    out
}

fn help_popup_text() -> &'static str {
    "Infinite Zoom Hotkeys\n\
space  toggle auto-zoom\n\
m  toggle mouse control (move to steer, drag to touch)\n\
a  toggle audio (loads the background track on first use)\n\
up/down  zoom speed\n\
+ / -  volume\n\
i  show/hide HUD\n\
? or h or F1  toggle this help\n\
q or esc or ctrl-c  quit"
}

struct FpsCounter {
    last: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            last: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        if dt >= 0.5 {
            self.fps = (self.frames as f32) / dt;
            self.frames = 0;
            self.last = now;
        }
    }

    fn fps(&self) -> f32 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hud_wraps_to_terminal_width() {
        let hud = build_hud(20, &Controls::default(), &FrameReport::default(), AudioStatus::Idle, 60.0, false);
        assert!(hud.lines().all(|l| l.chars().count() <= 20));
        assert!(hud.contains("Depth: 0"));
    }

    #[test]
    fn hud_rows_leave_room_for_visuals() {
        assert_eq!(hud_rows_for_text(3, true, "a\nb\nc\nd"), 2);
        assert_eq!(hud_rows_for_text(30, false, "a\nb"), 0);
        assert_eq!(hud_rows_for_size((80, 1), true), 0);
    }
}
