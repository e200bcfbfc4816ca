use clap::Parser;
use crossterm::event::{KeyCode, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use infinite_zoom::app::initial_controls;
use infinite_zoom::config::Config;
use infinite_zoom::input::{
    ControlKey, Controls, InputEffect, InputEvent, InputState, Pointer, MAX_SPEED, MIN_SPEED,
};

fn key(k: ControlKey) -> InputEvent {
    InputEvent::Key(k)
}

fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
    MouseEvent {
        kind,
        column,
        row,
        modifiers: KeyModifiers::NONE,
    }
}

// ── Speed and volume ────────────────────────────────────────────────────────

#[test]
fn speed_keys_clamp_to_range() {
    let mut s = InputState::default();
    for _ in 0..30 {
        s.apply(key(ControlKey::SpeedUp));
    }
    assert_eq!(s.controls().speed, MAX_SPEED);
    for _ in 0..30 {
        s.apply(key(ControlKey::SpeedDown));
    }
    assert_eq!(s.controls().speed, MIN_SPEED);
}

#[test]
fn speed_steps_by_two_tenths() {
    let mut s = InputState::default();
    s.apply(key(ControlKey::SpeedUp));
    s.apply(key(ControlKey::SpeedUp));
    assert_eq!(s.controls().speed, 1.4);
    s.apply(key(ControlKey::SpeedDown));
    assert_eq!(s.controls().speed, 1.2);
}

#[test]
fn volume_keys_report_a_change() {
    let mut s = InputState::default();
    assert_eq!(s.apply(key(ControlKey::VolumeUp)), InputEffect::VolumeChanged);
    assert_eq!(s.controls().volume, 0.6);
    assert_eq!(s.apply(key(ControlKey::VolumeDown)), InputEffect::VolumeChanged);
    assert_eq!(s.controls().volume, 0.5);
}

#[test]
fn audio_toggle_reports_the_new_state() {
    let mut s = InputState::default();
    assert_eq!(s.apply(key(ControlKey::ToggleAudio)), InputEffect::AudioToggled(true));
    assert!(s.controls().audio_enabled);
    assert_eq!(s.apply(key(ControlKey::ToggleAudio)), InputEffect::AudioToggled(false));
}

#[test]
fn toggles_flip_their_flags() {
    let mut s = InputState::default();
    s.apply(key(ControlKey::ToggleAutoZoom));
    s.apply(key(ControlKey::ToggleMouseControl));
    s.apply(key(ControlKey::ToggleHud));
    s.apply(key(ControlKey::ToggleHelp));
    let snap = s.snapshot();
    assert!(!snap.controls.auto_zoom);
    assert!(!snap.controls.mouse_control);
    assert!(!snap.show_hud);
    assert!(snap.show_help);
    assert_eq!(s.apply(key(ControlKey::Quit)), InputEffect::Quit);
}

// ── Pointer and touch ───────────────────────────────────────────────────────

#[test]
fn pointer_follows_mouse_when_enabled() {
    let mut s = InputState::default();
    s.apply(InputEvent::PointerMove { x: 0.25, y: -0.5 });
    assert_eq!(s.snapshot().pointer, Pointer::new(0.25, -0.5));
}

#[test]
fn pointer_is_ignored_with_mouse_control_off() {
    let mut s = InputState::new(Controls {
        mouse_control: false,
        ..Controls::default()
    });
    s.apply(InputEvent::PointerMove { x: 0.9, y: 0.9 });
    assert_eq!(s.snapshot().pointer, Pointer::CENTER);
}

#[test]
fn active_touch_takes_precedence_over_pointer() {
    let mut s = InputState::default();
    s.apply(InputEvent::TouchMove { x: -0.4, y: 0.2 });
    s.apply(InputEvent::PointerMove { x: 0.8, y: 0.8 });
    let snap = s.snapshot();
    assert!(snap.touch.active);
    assert_eq!(snap.pointer, Pointer::new(-0.4, 0.2));
}

#[test]
fn touch_end_recentres_the_pointer() {
    let mut s = InputState::default();
    s.apply(InputEvent::TouchMove { x: 0.7, y: -0.7 });
    s.apply(InputEvent::TouchEnd);
    let snap = s.snapshot();
    assert!(!snap.touch.active);
    assert_eq!(snap.pointer, Pointer::CENTER);
}

#[test]
fn out_of_range_coordinates_are_clamped() {
    let p = Pointer::new(4.0, f32::NAN);
    assert_eq!(p, Pointer { x: 1.0, y: 0.0 });
    assert_eq!(Pointer::new(-3.0, -3.0).magnitude(), 2.0f32.sqrt());
}

// ── Terminal mapping ────────────────────────────────────────────────────────

#[test]
fn mouse_events_map_to_pointer_and_touch() {
    let moved = InputEvent::from_mouse(mouse(MouseEventKind::Moved, 0, 0), 10, 10);
    assert!(matches!(moved, Some(InputEvent::PointerMove { x, y }) if x < 0.0 && y > 0.0));

    let drag = InputEvent::from_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), 9, 9), 10, 10);
    assert!(matches!(drag, Some(InputEvent::TouchMove { x, y }) if x > 0.0 && y < 0.0));

    let up = InputEvent::from_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 3, 3), 10, 10);
    assert_eq!(up, Some(InputEvent::TouchEnd));

    let right = InputEvent::from_mouse(mouse(MouseEventKind::Down(MouseButton::Right), 3, 3), 10, 10);
    assert_eq!(right, None);
    assert_eq!(InputEvent::from_mouse(mouse(MouseEventKind::Moved, 0, 0), 0, 10), None);
}

#[test]
fn key_bindings() {
    let none = KeyModifiers::NONE;
    assert_eq!(ControlKey::from_key(KeyCode::Char(' '), none), Some(ControlKey::ToggleAutoZoom));
    assert_eq!(ControlKey::from_key(KeyCode::Char('m'), none), Some(ControlKey::ToggleMouseControl));
    assert_eq!(ControlKey::from_key(KeyCode::Char('a'), none), Some(ControlKey::ToggleAudio));
    assert_eq!(ControlKey::from_key(KeyCode::Up, none), Some(ControlKey::SpeedUp));
    assert_eq!(ControlKey::from_key(KeyCode::Down, none), Some(ControlKey::SpeedDown));
    assert_eq!(ControlKey::from_key(KeyCode::Char('='), none), Some(ControlKey::VolumeUp));
    assert_eq!(ControlKey::from_key(KeyCode::Char('-'), none), Some(ControlKey::VolumeDown));
    assert_eq!(ControlKey::from_key(KeyCode::Char('q'), none), Some(ControlKey::Quit));
}

// ── Startup controls ────────────────────────────────────────────────────────

#[test]
fn startup_controls_follow_flags_and_clamp() {
    let cfg = Config::parse_from(["infinite-zoom", "--speed", "9", "--volume=-1", "--audio", "--no-mouse"]);
    let c = initial_controls(&cfg);
    assert_eq!(c.speed, MAX_SPEED);
    assert_eq!(c.volume, 0.0);
    assert!(c.audio_enabled);
    assert!(!c.mouse_control);
    assert!(c.auto_zoom);
}
