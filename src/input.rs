//! Input state for the experience view.
//!
//! Terminal events are translated into [`InputEvent`] messages and applied by a single
//! writer, [`InputState::apply`]. The frame loop reads one [`InputSnapshot`] per frame.

use crossterm::event::{KeyCode, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

pub const MIN_SPEED: f32 = 0.1;
pub const MAX_SPEED: f32 = 3.0;
pub const SPEED_STEP: f32 = 0.2;
pub const VOLUME_STEP: f32 = 0.1;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pointer {
    pub x: f32,
    pub y: f32,
}

impl Pointer {
    pub const CENTER: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Controls {
    pub speed: f32,
    pub auto_zoom: bool,
    pub mouse_control: bool,
    pub audio_enabled: bool,
    pub volume: f32,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            speed: 1.0,
            auto_zoom: true,
            mouse_control: true,
            audio_enabled: false,
            volume: 0.5,
        }
    }
}

impl Controls {
    pub fn step_speed(&mut self, up: bool) {
        let next = if up { self.speed + SPEED_STEP } else { self.speed - SPEED_STEP };
        // Round to one decimal so repeated steps don't accumulate float drift.
        self.speed = ((next * 10.0).round() / 10.0).clamp(MIN_SPEED, MAX_SPEED);
    }

    pub fn step_volume(&mut self, up: bool) {
        let next = if up { self.volume + VOLUME_STEP } else { self.volume - VOLUME_STEP };
        self.volume = ((next * 10.0).round() / 10.0).clamp(0.0, 1.0);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlKey {
    ToggleAutoZoom,
    ToggleMouseControl,
    ToggleAudio,
    SpeedUp,
    SpeedDown,
    VolumeUp,
    VolumeDown,
    ToggleHud,
    ToggleHelp,
    Quit,
}

impl ControlKey {
    pub fn from_key(code: KeyCode, mods: KeyModifiers) -> Option<Self> {
        if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
            return Some(Self::Quit);
        }
        match code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => Some(Self::Quit),
            KeyCode::Char(' ') => Some(Self::ToggleAutoZoom),
            KeyCode::Char('m') | KeyCode::Char('M') => Some(Self::ToggleMouseControl),
            KeyCode::Char('a') | KeyCode::Char('A') => Some(Self::ToggleAudio),
            KeyCode::Up => Some(Self::SpeedUp),
            KeyCode::Down => Some(Self::SpeedDown),
            KeyCode::Char('+') | KeyCode::Char('=') => Some(Self::VolumeUp),
            KeyCode::Char('-') | KeyCode::Char('_') => Some(Self::VolumeDown),
            KeyCode::Char('i') | KeyCode::Char('I') => Some(Self::ToggleHud),
            KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::F(1) => Some(Self::ToggleHelp),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    PointerMove { x: f32, y: f32 },
    TouchMove { x: f32, y: f32 },
    TouchEnd,
    Key(ControlKey),
}

impl InputEvent {
    /// Map a terminal mouse event over a `cols`×`rows` view to a normalized input.
    /// Plain motion is a pointer, a left drag acts as a touch, release ends it.
    pub fn from_mouse(ev: MouseEvent, cols: u16, rows: u16) -> Option<Self> {
        if cols == 0 || rows == 0 {
            return None;
        }
        let (x, y) = normalize_cell(ev.column, ev.row, cols, rows);
        match ev.kind {
            MouseEventKind::Moved => Some(Self::PointerMove { x, y }),
            MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Drag(MouseButton::Left) => {
                Some(Self::TouchMove { x, y })
            }
            MouseEventKind::Up(MouseButton::Left) => Some(Self::TouchEnd),
            _ => None,
        }
    }
}

/// Cell centre to [-1, 1] with y pointing up.
pub fn normalize_cell(col: u16, row: u16, cols: u16, rows: u16) -> (f32, f32) {
    let x = ((col as f32 + 0.5) / cols.max(1) as f32) * 2.0 - 1.0;
    let y = -(((row as f32 + 0.5) / rows.max(1) as f32) * 2.0 - 1.0);
    (clamp_unit(x), clamp_unit(y))
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Touch {
    pub x: f32,
    pub y: f32,
    pub active: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputSnapshot {
    pub controls: Controls,
    pub pointer: Pointer,
    pub touch: Touch,
    pub show_hud: bool,
    pub show_help: bool,
}

/// What the app loop has to do after an event beyond updating state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEffect {
    None,
    AudioToggled(bool),
    VolumeChanged,
    Quit,
}

#[derive(Clone, Debug)]
pub struct InputState {
    controls: Controls,
    pointer: Pointer,
    touch: Touch,
    show_hud: bool,
    show_help: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new(Controls::default())
    }
}

impl InputState {
    pub fn new(controls: Controls) -> Self {
        Self {
            controls,
            pointer: Pointer::CENTER,
            touch: Touch::default(),
            show_hud: true,
            show_help: false,
        }
    }

    pub fn snapshot(&self) -> InputSnapshot {
        InputSnapshot {
            controls: self.controls,
            pointer: self.pointer,
            touch: self.touch,
            show_hud: self.show_hud,
            show_help: self.show_help,
        }
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    pub fn apply(&mut self, event: InputEvent) -> InputEffect {
        match event {
            InputEvent::PointerMove { x, y } => {
                if self.controls.mouse_control && !self.touch.active {
                    self.pointer = Pointer::new(x, y);
                }
                InputEffect::None
            }
            InputEvent::TouchMove { x, y } => {
                let p = Pointer::new(x, y);
                self.touch = Touch {
                    x: p.x,
                    y: p.y,
                    active: true,
                };
                if self.controls.mouse_control {
                    self.pointer = p;
                }
                InputEffect::None
            }
            InputEvent::TouchEnd => {
                self.touch.active = false;
                self.pointer = Pointer::CENTER;
                InputEffect::None
            }
            InputEvent::Key(k) => self.apply_key(k),
        }
    }

    fn apply_key(&mut self, key: ControlKey) -> InputEffect {
        let c = &mut self.controls;
        match key {
            ControlKey::ToggleAutoZoom => c.auto_zoom = !c.auto_zoom,
            ControlKey::ToggleMouseControl => c.mouse_control = !c.mouse_control,
            ControlKey::ToggleAudio => {
                c.audio_enabled = !c.audio_enabled;
                return InputEffect::AudioToggled(c.audio_enabled);
            }
            ControlKey::SpeedUp => c.step_speed(true),
            ControlKey::SpeedDown => c.step_speed(false),
            ControlKey::VolumeUp => {
                c.step_volume(true);
                return InputEffect::VolumeChanged;
            }
            ControlKey::VolumeDown => {
                c.step_volume(false);
                return InputEffect::VolumeChanged;
            }
            ControlKey::ToggleHud => self.show_hud = !self.show_hud,
            ControlKey::ToggleHelp => self.show_help = !self.show_help,
            ControlKey::Quit => return InputEffect::Quit,
        }
        InputEffect::None
    }
}
