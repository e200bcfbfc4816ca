use clap::{Parser, ValueEnum};
use std::path::PathBuf;

pub const DEFAULT_TRACK: &str = "assets/background-music.wav";

#[derive(Parser, Debug, Clone)]
#[command(name = "infinite-zoom", version, about = "Endless procedural zoom through generative dimensions, in your terminal")]
pub struct Config {
    #[arg(long, value_enum, default_value_t = RendererMode::HalfBlock)]
    pub renderer: RendererMode,

    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    #[arg(long, default_value_t = 1.0)]
    pub speed: f32,

    #[arg(long, default_value_t = 0.5)]
    pub volume: f32,

    #[arg(long, default_value_t = false)]
    pub audio: bool,

    #[arg(long, value_name = "WAV", default_value = DEFAULT_TRACK)]
    pub track: PathBuf,

    #[arg(long, default_value_t = 512)]
    pub texture_size: usize,

    #[arg(long, default_value_t = false)]
    pub no_mouse: bool,

    #[arg(long, default_value_t = false)]
    pub skip_landing: bool,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererMode {
    #[value(alias = "ansi", alias = "text")]
    Ascii,
    #[value(name = "half-block", alias = "halfblock", alias = "half_block", alias = "hb")]
    HalfBlock,
}

impl RendererMode {
    /// Frame-buffer pixels per terminal cell (columns, rows).
    pub fn pixels_per_cell(self) -> (usize, usize) {
        match self {
            Self::Ascii => (1, 1),
            Self::HalfBlock => (1, 2),
        }
    }
}

impl Config {
    pub fn texture_size(&self) -> usize {
        self.texture_size.clamp(64, 1024)
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("infinite_zoom.log"))
    }
}
