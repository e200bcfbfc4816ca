use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer as _, Producer as _, Split as _};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::path::{Path, PathBuf};
use std::sync::atomic::{fence, AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const FFT_SIZE: usize = 256;
pub const BIN_COUNT: usize = FFT_SIZE / 2;
pub const SMOOTHING: f32 = 0.8;
pub const MIN_DB: f32 = -100.0;
pub const MAX_DB: f32 = -30.0;
/// Bins averaged for beat detection.
pub const LOW_BINS: usize = 10;

const HOP: usize = FFT_SIZE / 2;
const PACKED_WORDS: usize = BIN_COUNT / 4;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to read audio asset {} (the bundled track is produced by the gen_track binary)", .path.display())]
    AssetRead {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("audio asset {} has no samples", .0.display())]
    EmptyAsset(PathBuf),

    #[error("no default audio output device")]
    NoOutputDevice,

    #[error("failed to query output config")]
    OutputConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("unsupported output sample format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to build output stream")]
    StreamBuild(#[from] cpal::BuildStreamError),

    #[error("failed to start output stream")]
    StreamPlay(#[from] cpal::PlayStreamError),
}

/// Byte-scaled frequency bins, 0 at [`MIN_DB`] and 255 at [`MAX_DB`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Spectrum {
    pub bins: [u8; BIN_COUNT],
}

impl Default for Spectrum {
    fn default() -> Self {
        Self { bins: [0; BIN_COUNT] }
    }
}

impl Spectrum {
    pub fn from_bins(bins: [u8; BIN_COUNT]) -> Self {
        Self { bins }
    }

    /// Every bin at `level`.
    pub fn uniform(level: u8) -> Self {
        Self { bins: [level; BIN_COUNT] }
    }

    pub fn average_energy(&self) -> f32 {
        mean(&self.bins)
    }

    pub fn low_frequency_energy(&self) -> f32 {
        mean(&self.bins[..LOW_BINS])
    }
}

fn mean(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    bins.iter().map(|&b| b as u32).sum::<u32>() as f32 / bins.len() as f32
}

/// Seqlock publication of the latest [`Spectrum`]: one writer (the analyser
/// thread), any number of readers.
pub struct AtomicSpectrum {
    seq: AtomicU64,
    words: [AtomicU32; PACKED_WORDS],
}

impl Default for AtomicSpectrum {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicSpectrum {
    pub fn new() -> Self {
        Self {
            seq: AtomicU64::new(0),
            words: std::array::from_fn(|_| AtomicU32::new(0)),
        }
    }

    pub fn store(&self, s: &Spectrum) {
        self.seq.fetch_add(1, Ordering::Relaxed); // odd => write in progress
        fence(Ordering::Release);
        for (dst, chunk) in self.words.iter().zip(s.bins.chunks_exact(4)) {
            dst.store(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]), Ordering::Relaxed);
        }
        self.seq.fetch_add(1, Ordering::Release); // even => stable
    }

    pub fn load(&self) -> Spectrum {
        loop {
            let v1 = self.seq.load(Ordering::Acquire);
            if v1 & 1 == 1 {
                continue;
            }
            let mut bins = [0u8; BIN_COUNT];
            for (src, chunk) in self.words.iter().zip(bins.chunks_exact_mut(4)) {
                chunk.copy_from_slice(&src.load(Ordering::Relaxed).to_le_bytes());
            }
            fence(Ordering::Acquire);
            let v2 = self.seq.load(Ordering::Relaxed);
            if v1 == v2 {
                return Spectrum { bins };
            }
        }
    }

    /// Number of completed stores.
    pub fn generation(&self) -> u64 {
        self.seq.load(Ordering::Acquire) / 2
    }
}

/// Windowed FFT with per-bin smoothing, producing analyser-style byte data.
pub struct SpectrumAnalyser {
    hann: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    buf: Vec<Complex<f32>>,
    smoothed: [f32; BIN_COUNT],
}

impl Default for SpectrumAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumAnalyser {
    pub fn new() -> Self {
        let n = FFT_SIZE;
        let hann = (0..n)
            .map(|i| 0.5 - 0.5 * ((2.0 * PI * i as f32) / (n as f32)).cos())
            .collect::<Vec<_>>();
        let mut planner = FftPlanner::<f32>::new();
        Self {
            hann,
            fft: planner.plan_fft_forward(n),
            buf: vec![Complex { re: 0.0, im: 0.0 }; n],
            smoothed: [0.0; BIN_COUNT],
        }
    }

    /// Analyse the last [`FFT_SIZE`] samples of a ring window whose oldest sample sits at `start`.
    pub fn process(&mut self, window: &[f32], start: usize) -> Spectrum {
        let n = FFT_SIZE;
        if window.len() < n {
            return Spectrum::default();
        }
        for i in 0..n {
            let s = window[(start + i) % n];
            let s = if s.is_finite() { s } else { 0.0 };
            self.buf[i].re = s * self.hann[i];
            self.buf[i].im = 0.0;
        }
        self.fft.process(&mut self.buf);

        let mut bins = [0u8; BIN_COUNT];
        for (k, c) in self.buf.iter().take(BIN_COUNT).enumerate() {
            let mag = (c.re * c.re + c.im * c.im).sqrt() / n as f32;
            self.smoothed[k] = SMOOTHING * self.smoothed[k] + (1.0 - SMOOTHING) * mag;
            bins[k] = db_to_byte(self.smoothed[k]);
        }
        Spectrum { bins }
    }
}

fn db_to_byte(mag: f32) -> u8 {
    if mag <= 0.0 || !mag.is_finite() {
        return 0;
    }
    let db = 20.0 * mag.log10();
    let scaled = 255.0 * (db - MIN_DB) / (MAX_DB - MIN_DB);
    scaled.clamp(0.0, 255.0) as u8
}

fn analyse_loop(cons: &mut ringbuf::HeapCons<f32>, stop: &AtomicBool, out: &AtomicSpectrum) {
    let n = FFT_SIZE;
    let mut analyser = SpectrumAnalyser::new();
    let mut window = vec![0.0f32; n];
    let mut write_pos = 0usize;
    let mut filled = 0usize;
    let mut since_last = 0usize;

    while !stop.load(Ordering::Relaxed) {
        let mut got_any = false;
        while let Some(s) = cons.try_pop() {
            got_any = true;
            window[write_pos] = s;
            write_pos = (write_pos + 1) % n;
            if filled < n {
                filled += 1;
            }
            since_last += 1;
            if filled == n && since_last >= HOP {
                since_last = 0;
                out.store(&analyser.process(&window, write_pos));
            }
        }

        if !got_any {
            thread::sleep(Duration::from_millis(2));
        }
    }
}

/// A decoded track, mixed down to mono.
#[derive(Clone, Debug)]
pub struct Track {
    pub samples: Arc<[f32]>,
    pub sample_rate_hz: u32,
}

pub fn load_track(path: &Path) -> Result<Track, AudioError> {
    let read_err = |source| AudioError::AssetRead {
        path: path.to_path_buf(),
        source,
    };
    let reader = hound::WavReader::open(path).map_err(read_err)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_err)?,
        hound::SampleFormat::Int => {
            let max_val = (1u64 << spec.bits_per_sample.saturating_sub(1).min(31)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()
                .map_err(read_err)?
        }
    };

    let samples = interleaved
        .chunks(channels)
        .map(|frame| (frame.iter().sum::<f32>() / frame.len() as f32).clamp(-1.0, 1.0))
        .collect::<Vec<_>>();
    if samples.is_empty() {
        return Err(AudioError::EmptyAsset(path.to_path_buf()));
    }

    Ok(Track {
        samples: samples.into(),
        sample_rate_hz: spec.sample_rate.max(1),
    })
}

pub fn volume_to_bits(volume: f32) -> u32 {
    let v = if volume.is_finite() { volume.clamp(0.0, 1.0) } else { 0.0 };
    v.to_bits()
}

/// Loop cursor over a track, resampled by nearest frame to the device rate.
struct Playback {
    track: Arc<[f32]>,
    pos: f64,
    step: f64,
    gain: Arc<AtomicU32>,
    playing: Arc<AtomicBool>,
}

impl Playback {
    fn next(&mut self) -> f32 {
        let len = self.track.len();
        let s = self.track[(self.pos as usize).min(len - 1)];
        self.pos += self.step;
        if self.pos >= len as f64 {
            self.pos -= len as f64;
        }
        s
    }
}

fn write_output<T: SizedSample + FromSample<f32>>(
    data: &mut [T],
    channels: usize,
    pb: &mut Playback,
    prod: &mut ringbuf::HeapProd<f32>,
) {
    let channels = channels.max(1);
    if !pb.playing.load(Ordering::Relaxed) {
        data.fill(T::from_sample(0.0f32));
        return;
    }
    let gain = f32::from_bits(pb.gain.load(Ordering::Relaxed));
    for frame in data.chunks_mut(channels) {
        let s = pb.next();
        // The analyser taps the signal ahead of the gain stage.
        let _ = prod.try_push(s);
        let out = T::from_sample(s * gain);
        for slot in frame.iter_mut() {
            *slot = out;
        }
    }
}

/// Looping background track on the default output device plus its analyser.
/// Dropping the player stops the analyser thread and closes the stream.
pub struct AudioPlayer {
    _stream: cpal::Stream,
    gain: Arc<AtomicU32>,
    playing: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    analyser_handle: Option<thread::JoinHandle<()>>,
    spectrum: Arc<AtomicSpectrum>,
    pub sample_rate_hz: u32,
}

impl AudioPlayer {
    /// Load `track` and open a paused output stream. Call [`AudioPlayer::enable`] to hear it.
    pub fn start(track: &Path, volume: f32) -> Result<Self, AudioError> {
        let track = load_track(track)?;

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoOutputDevice)?;
        let supported = device.default_output_config()?;
        let sample_rate_hz = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let config: cpal::StreamConfig = supported.clone().into();

        let rb = HeapRb::<f32>::new((sample_rate_hz as usize).max(FFT_SIZE * 4));
        let (mut prod, mut cons) = rb.split();

        let gain = Arc::new(AtomicU32::new(volume_to_bits(volume)));
        let playing = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(AtomicBool::new(false));
        let spectrum = Arc::new(AtomicSpectrum::new());

        let mut pb = Playback {
            track: Arc::clone(&track.samples),
            pos: 0.0,
            step: track.sample_rate_hz as f64 / sample_rate_hz.max(1) as f64,
            gain: Arc::clone(&gain),
            playing: Arc::clone(&playing),
        };

        let err_fn = |err| warn!(%err, "audio output stream error");

        let stream = match supported.sample_format() {
            SampleFormat::F32 => device.build_output_stream(
                &config,
                move |data: &mut [f32], _| write_output(data, channels, &mut pb, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::I16 => device.build_output_stream(
                &config,
                move |data: &mut [i16], _| write_output(data, channels, &mut pb, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::U16 => device.build_output_stream(
                &config,
                move |data: &mut [u16], _| write_output(data, channels, &mut pb, &mut prod),
                err_fn,
                None,
            )?,
            fmt => return Err(AudioError::UnsupportedFormat(format!("{fmt:?}"))),
        };
        stream.play()?;

        let stop_for_thread = Arc::clone(&stop);
        let spectrum_for_thread = Arc::clone(&spectrum);
        let analyser_handle =
            thread::spawn(move || analyse_loop(&mut cons, &stop_for_thread, &spectrum_for_thread));

        info!(sample_rate_hz, channels, frames = track.samples.len(), "audio output opened");

        Ok(Self {
            _stream: stream,
            gain,
            playing,
            stop,
            analyser_handle: Some(analyser_handle),
            spectrum,
            sample_rate_hz,
        })
    }

    pub fn enable(&self) {
        self.playing.store(true, Ordering::Relaxed);
    }

    pub fn disable(&self) {
        self.playing.store(false, Ordering::Relaxed);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    pub fn set_volume(&self, volume: f32) {
        self.gain.store(volume_to_bits(volume), Ordering::Relaxed);
    }

    pub fn spectrum(&self) -> Spectrum {
        self.spectrum.load()
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        self.playing.store(false, Ordering::Relaxed);
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.analyser_handle.take() {
            let _ = h.join();
        }
        info!("audio output closed");
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioStatus {
    /// Never enabled; nothing has been opened.
    Idle,
    Playing,
    Paused,
    /// The first start failed; audio stays inert for the session.
    Unavailable,
}

enum Slot {
    Idle,
    Running(AudioPlayer),
    Failed,
}

/// Starts the [`AudioPlayer`] on first enable and never retries after a failure.
pub struct LazyAudio {
    track: PathBuf,
    slot: Slot,
}

impl LazyAudio {
    pub fn new(track: impl Into<PathBuf>) -> Self {
        Self {
            track: track.into(),
            slot: Slot::Idle,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool, volume: f32) {
        if enabled && matches!(self.slot, Slot::Idle) {
            self.slot = match AudioPlayer::start(&self.track, volume) {
                Ok(p) => Slot::Running(p),
                Err(err) => {
                    warn!(error = %err, track = %self.track.display(), "audio unavailable");
                    Slot::Failed
                }
            };
        }
        if let Slot::Running(p) = &self.slot {
            if enabled {
                p.set_volume(volume);
                p.enable();
            } else {
                p.disable();
            }
        }
    }

    pub fn set_volume(&self, volume: f32) {
        if let Slot::Running(p) = &self.slot {
            p.set_volume(volume);
        }
    }

    /// Latest spectrum while playing.
    pub fn spectrum(&self) -> Option<Spectrum> {
        match &self.slot {
            Slot::Running(p) if p.is_playing() => Some(p.spectrum()),
            _ => None,
        }
    }

    pub fn status(&self) -> AudioStatus {
        match &self.slot {
            Slot::Idle => AudioStatus::Idle,
            Slot::Running(p) if p.is_playing() => AudioStatus::Playing,
            Slot::Running(_) => AudioStatus::Paused,
            Slot::Failed => AudioStatus::Unavailable,
        }
    }

    /// Stop playback and release the device.
    pub fn shutdown(&mut self) {
        if let Slot::Running(_) = self.slot {
            self.slot = Slot::Idle;
        }
    }
}
