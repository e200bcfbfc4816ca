mod ascii;
mod halfblock;

pub use ascii::AsciiRenderer;
pub use halfblock::HalfBlockRenderer;

use crate::config::RendererMode;
use std::io::Write;

pub struct Frame<'a> {
    pub term_cols: u16,
    pub term_rows: u16,
    pub visual_rows: u16,
    pub pixel_width: usize,
    pub pixel_height: usize,
    pub pixels_rgba: &'a [u8],
    pub hud: &'a str,
    pub hud_rows: u16,
    /// HUD token to emphasise (e.g. the beat marker).
    pub hud_highlight: Option<&'a str>,
    pub hud_highlight_phase: bool,
    /// Centered text drawn over the visuals without a box (landing title).
    pub caption: Option<&'a str>,
    pub overlay: Option<&'a str>,
    pub sync_updates: bool,
}

pub trait Renderer {
    fn name(&self) -> &'static str;
    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()>;
}

pub fn make_renderer(mode: RendererMode) -> Box<dyn Renderer> {
    match mode {
        RendererMode::HalfBlock => Box::new(HalfBlockRenderer::new()),
        RendererMode::Ascii => Box::new(AsciiRenderer::new()),
    }
}

/// Approx Rec.709 luma using integer math (0..255).
#[inline]
pub(crate) fn luma_u8(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 54 + g as u32 * 183 + b as u32 * 19) >> 8) as u8
}

#[inline]
pub(crate) fn write_fg_rgb(out: &mut dyn Write, r: u8, g: u8, b: u8) -> anyhow::Result<()> {
    write!(out, "\x1b[38;2;{};{};{}m", r, g, b)?;
    Ok(())
}

/// Validate a frame whose pixel grid is `cols*px_w` by `visual_rows*px_h` and start
/// painting it. Returns `(cols, visual_rows, w, h)`, or `None` when there is nothing to draw.
pub(crate) fn text_frame_begin(
    frame: &Frame<'_>,
    px_w: usize,
    px_h: usize,
    out: &mut dyn Write,
) -> anyhow::Result<Option<(usize, usize, usize, usize)>> {
    let cols = frame.term_cols as usize;
    let visual_rows = frame.visual_rows as usize;
    let w = frame.pixel_width;
    let h = frame.pixel_height;

    if cols == 0 || visual_rows == 0 || w == 0 || h == 0 {
        return Ok(None);
    }
    if w != cols * px_w || h != visual_rows * px_h {
        return Ok(None);
    }
    if frame.pixels_rgba.len() < w.saturating_mul(h).saturating_mul(4) {
        return Ok(None);
    }

    if frame.sync_updates {
        out.write_all(b"\x1b[?2026h")?;
    }
    // Home, reset, autowrap off while painting full-width rows.
    out.write_all(b"\x1b[H\x1b[0m\x1b[?7l")?;
    Ok(Some((cols, visual_rows, w, h)))
}

/// HUD rows, caption, overlay, then restore terminal modes and flush.
pub(crate) fn text_frame_end(
    frame: &Frame<'_>,
    cols: usize,
    visual_rows: usize,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let mut hud_lines = frame.hud.lines();
    for i in 0..(frame.hud_rows as usize) {
        write_hud_line(
            out,
            visual_rows + i + 1,
            cols,
            hud_lines.next(),
            frame.hud_highlight,
            frame.hud_highlight_phase,
        )?;
    }

    if let Some(text) = frame.caption {
        draw_caption(out, frame.term_cols, frame.visual_rows, text)?;
    }
    if let Some(text) = frame.overlay {
        draw_overlay_popup(out, frame.term_cols, frame.term_rows, text)?;
    }

    out.write_all(b"\x1b[0m\x1b[?7h")?;
    if frame.sync_updates {
        out.write_all(b"\x1b[?2026l")?;
    }
    out.flush()?;
    Ok(())
}

fn write_hud_line(
    out: &mut dyn Write,
    row: usize,
    cols: usize,
    line: Option<&str>,
    highlight: Option<&str>,
    phase: bool,
) -> anyhow::Result<()> {
    write!(out, "\x1b[{};1H\x1b[0m\x1b[2K", row)?;
    let Some(line) = line else {
        return Ok(());
    };
    let line: String = line.chars().take(cols).collect();

    let hit = highlight.filter(|h| !h.is_empty()).and_then(|h| line.find(h).map(|i| (i, h.len())));
    match hit {
        Some((start, len)) => {
            let (r, g, b) = if phase { (255, 244, 176) } else { (255, 196, 120) };
            out.write_all(line[..start].as_bytes())?;
            write!(out, "\x1b[1m\x1b[38;2;{};{};{}m", r, g, b)?;
            out.write_all(line[start..start + len].as_bytes())?;
            out.write_all(b"\x1b[0m")?;
            out.write_all(line[start + len..].as_bytes())?;
        }
        None => out.write_all(line.as_bytes())?,
    }
    Ok(())
}

fn draw_caption(out: &mut dyn Write, term_cols: u16, visual_rows: u16, text: &str) -> anyhow::Result<()> {
    let cols = term_cols as usize;
    let rows = visual_rows as usize;
    let lines: Vec<&str> = text.lines().collect();
    if cols == 0 || rows == 0 || lines.is_empty() {
        return Ok(());
    }
    let top = rows.saturating_sub(lines.len()) / 2 + 1;
    for (i, line) in lines.iter().enumerate().take(rows) {
        let shown: String = line.chars().take(cols).collect();
        let col = cols.saturating_sub(shown.chars().count()) / 2 + 1;
        if i == 0 {
            write!(out, "\x1b[{};{}H\x1b[0m\x1b[1m\x1b[38;2;255;255;255m{}\x1b[22m", top + i, col, shown)?;
        } else {
            write!(out, "\x1b[{};{}H\x1b[0m\x1b[38;2;200;210;230m{}", top + i, col, shown)?;
        }
    }
    out.write_all(b"\x1b[0m")?;
    Ok(())
}

pub fn draw_overlay_popup(
    out: &mut dyn Write,
    term_cols: u16,
    term_rows: u16,
    text: &str,
) -> anyhow::Result<()> {
    if text.trim().is_empty() {
        return Ok(());
    }

    let cols = term_cols as usize;
    let rows = term_rows as usize;
    if cols < 8 || rows < 4 {
        return Ok(());
    }

    let max_inner_w = cols.saturating_sub(6).max(1);
    let mut lines: Vec<String> = Vec::new();
    for raw in text.lines() {
        if raw.is_empty() {
            lines.push(String::new());
            continue;
        }
        let chars: Vec<char> = raw.chars().collect();
        for chunk in chars.chunks(max_inner_w) {
            lines.push(chunk.iter().collect());
        }
    }
    if lines.is_empty() {
        return Ok(());
    }

    let inner_w = lines
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(1, max_inner_w);
    let box_w = (inner_w + 4).min(cols.saturating_sub(2)).max(4);
    let inner_w = box_w.saturating_sub(4);
    let body_h = lines.len().min(rows.saturating_sub(3).max(1));
    let box_h = (body_h + 2).min(rows.saturating_sub(1)).max(3);

    let start_col = (cols.saturating_sub(box_w)) / 2 + 1;
    let start_row = (rows.saturating_sub(box_h)) / 2 + 1;

    let horiz = "-".repeat(box_w.saturating_sub(2));
    let blank = " ".repeat(inner_w);

    out.write_all(b"\x1b[0m\x1b[38;2;236;242;255m\x1b[48;2;8;10;20m")?;
    write!(out, "\x1b[{};{}H+{}+", start_row, start_col, horiz)?;

    for (i, line) in lines.iter().take(body_h).enumerate() {
        let row = start_row + 1 + i;
        write!(out, "\x1b[{};{}H| {} |", row, start_col, blank)?;
        if i == 0 {
            write!(
                out,
                "\x1b[{};{}H\x1b[1m\x1b[38;2;255;236;160m{}\x1b[22m\x1b[38;2;236;242;255m",
                row,
                start_col + 2,
                line
            )?;
        } else {
            write!(out, "\x1b[{};{}H{}", row, start_col + 2, line)?;
        }
    }

    write!(out, "\x1b[{};{}H+{}+", start_row + box_h - 1, start_col, horiz)?;
    out.write_all(b"\x1b[0m")?;
    Ok(())
}
