use crate::render::{text_frame_begin, text_frame_end, Frame, Renderer};
use std::io::Write;

const HALF_BLOCK: char = '\u{2580}';

/// Two stacked pixels per cell: the top one as foreground, the bottom one as background.
pub struct HalfBlockRenderer {
    last_fg: Option<(u8, u8, u8)>,
    last_bg: Option<(u8, u8, u8)>,
}

impl Default for HalfBlockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl HalfBlockRenderer {
    pub fn new() -> Self {
        Self {
            last_fg: None,
            last_bg: None,
        }
    }
}

impl Renderer for HalfBlockRenderer {
    fn name(&self) -> &'static str {
        "halfblock"
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let Some((cols, visual_rows, w, _h)) = text_frame_begin(frame, 1, 2, out)? else {
            return Ok(());
        };

        self.last_fg = None;
        self.last_bg = None;
        let px = frame.pixels_rgba;

        for row in 0..visual_rows {
            let top_y = row * 2;
            for x in 0..cols {
                let ti = (top_y * w + x) * 4;
                let bi = ((top_y + 1) * w + x) * 4;
                let top = (px[ti], px[ti + 1], px[ti + 2]);
                let bot = (px[bi], px[bi + 1], px[bi + 2]);

                if self.last_fg != Some(top) {
                    write!(out, "\x1b[38;2;{};{};{}m", top.0, top.1, top.2)?;
                    self.last_fg = Some(top);
                }
                if self.last_bg != Some(bot) {
                    write!(out, "\x1b[48;2;{};{};{}m", bot.0, bot.1, bot.2)?;
                    self.last_bg = Some(bot);
                }
                write!(out, "{HALF_BLOCK}")?;
            }
            // No newline after the last row: on a full-height frame it would scroll.
            if row + 1 < visual_rows {
                out.write_all(b"\r\n")?;
            }
        }

        text_frame_end(frame, cols, visual_rows, out)
    }
}
