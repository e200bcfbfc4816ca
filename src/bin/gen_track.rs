use std::f32::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use infinite_zoom::config::DEFAULT_TRACK;

const BPM: f32 = 100.0;
const BARS: usize = 8;
/// Pad chord roots per bar (Hz), looped.
const CHORDS: [[f32; 3]; 4] = [
    [110.00, 164.81, 220.00],
    [98.00, 146.83, 196.00],
    [87.31, 130.81, 174.61],
    [98.00, 123.47, 196.00],
];

struct Args {
    out: PathBuf,
    sample_rate: u32,
}

fn parse_args() -> Args {
    let mut out = PathBuf::from(DEFAULT_TRACK);
    let mut sample_rate = 44_100u32;

    let mut it = std::env::args().skip(1);
    while let Some(k) = it.next() {
        let v = it.next();
        match (k.as_str(), v) {
            ("--out", Some(p)) => out = PathBuf::from(p),
            ("--sample-rate", Some(v)) => {
                if let Ok(sr) = v.parse::<u32>() {
                    sample_rate = sr.clamp(8_000, 192_000);
                }
            }
            _ => {}
        }
    }

    Args { out, sample_rate }
}

fn main() -> Result<()> {
    let args = parse_args();
    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }

    let samples = make_loop(args.sample_rate);
    write_wav_i16_mono(&args.out, args.sample_rate, &samples)
        .with_context(|| format!("write {}", args.out.display()))?;

    println!("generated: {}", args.out.display());
    println!(
        "sample_rate={}Hz duration={:.2}s samples={}",
        args.sample_rate,
        samples.len() as f32 / args.sample_rate as f32,
        samples.len()
    );
    Ok(())
}

/// Seamless loop: four-on-the-floor kick, offbeat hats, slow detuned pad.
fn make_loop(sr: u32) -> Vec<i16> {
    let srf = sr as f32;
    let beat_s = 60.0 / BPM;
    let bar_s = beat_s * 4.0;
    let n = (bar_s * BARS as f32 * srf).round() as usize;

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let t = i as f32 / srf;
        let beat_t = t % beat_s;
        let bar = ((t / bar_s) as usize) % CHORDS.len();
        let bar_t = t % bar_s;

        // Kick: pitch drops from 120 Hz to 45 Hz over the hit.
        let kick_env = (-beat_t * 14.0).exp();
        let kick_f = 45.0 + 75.0 * (-beat_t * 30.0).exp();
        let kick = (2.0 * PI * kick_f * beat_t).sin() * kick_env * 0.85;

        let off_t = (t + beat_s * 0.5) % beat_s;
        let hat = pseudo_noise(i as u32) * (-off_t * 60.0).exp() * 0.12;

        // Pad fades in and out per bar so chord changes never click.
        let pad_env = (PI * bar_t / bar_s).sin().powf(0.6) * 0.22;
        let pad = CHORDS[bar]
            .iter()
            .map(|&f| (2.0 * PI * f * t).sin() + 0.5 * (2.0 * PI * f * 1.003 * t).sin())
            .sum::<f32>()
            / 4.5
            * pad_env;

        out.push(to_i16(kick + hat + pad));
    }
    out
}

fn pseudo_noise(x: u32) -> f32 {
    let mut n = x.wrapping_mul(374_761_393);
    n ^= n >> 13;
    n = n.wrapping_mul(1_274_126_177);
    n ^= n >> 16;
    let v = (n & 0x00FF_FFFF) as f32 / 16_777_215.0;
    v * 2.0 - 1.0
}

fn to_i16(x: f32) -> i16 {
    let y = x.clamp(-1.0, 1.0);
    (y * i16::MAX as f32) as i16
}

fn write_wav_i16_mono(path: &Path, sr: u32, samples: &[i16]) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: sr,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut w = hound::WavWriter::create(path, spec)?;
    for &s in samples {
        w.write_sample(s)?;
    }
    w.finalize()?;
    Ok(())
}
