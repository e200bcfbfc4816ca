//! Square RGBA drawing surface used to paint layer textures.
//!
//! Drawing is source-over blended and clipped to the current viewport. A viewport
//! translates the origin and narrows the clip, which is how nested patterns are drawn
//! into a sub-square of their parent.

pub type Rgba = [u8; 4];

pub const BLACK: Rgba = [0, 0, 0, 255];
pub const CLEAR: Rgba = [0, 0, 0, 0];

#[derive(Clone, Copy, Debug, PartialEq)]
struct Clip {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

pub struct Canvas {
    size: usize,
    pixels: Vec<u8>,
    origin: (f32, f32),
    clip: Clip,
}

impl Canvas {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            pixels: vec![0u8; size.saturating_mul(size).saturating_mul(4)],
            origin: (0.0, 0.0),
            clip: Clip {
                x0: 0,
                y0: 0,
                x1: size,
                y1: size,
            },
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Rgba {
        if x >= self.size || y >= self.size {
            return CLEAR;
        }
        let i = (y * self.size + x) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Run `f` with the origin moved by (`x`, `y`) and drawing clipped to a
    /// `size`-wide square there. Origin and clip are restored afterwards.
    pub fn with_viewport<R>(&mut self, x: f32, y: f32, size: f32, f: impl FnOnce(&mut Canvas) -> R) -> R {
        let saved_origin = self.origin;
        let saved_clip = self.clip;

        let ox = self.origin.0 + x;
        let oy = self.origin.1 + y;
        self.origin = (ox, oy);
        self.clip = Clip {
            x0: to_px(ox).max(saved_clip.x0),
            y0: to_px(oy).max(saved_clip.y0),
            x1: to_px(ox + size).min(saved_clip.x1),
            y1: to_px(oy + size).min(saved_clip.y1),
        };

        let r = f(self);

        self.origin = saved_origin;
        self.clip = saved_clip;
        r
    }

    pub fn fill(&mut self, color: Rgba) {
        let Clip { x0, y0, x1, y1 } = self.clip;
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend(x, y, color);
            }
        }
    }

    /// Fill a `w`×`h` block whose top-left corner is at viewport coords (`x`, `y`).
    pub fn fill_block(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba) {
        let (ax, ay) = self.abs(x, y);
        let (x0, y0, x1, y1) = self.clipped(ax, ay, ax + w, ay + h);
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend(px, py, color);
            }
        }
    }

    /// Radial gradient between radii `r0` and `r1`, padded with the end stops
    /// beyond them, covering the whole viewport.
    pub fn fill_radial_gradient(&mut self, cx: f32, cy: f32, r0: f32, r1: f32, stops: &[(f32, Rgba)]) {
        if stops.is_empty() {
            return;
        }
        let (acx, acy) = self.abs(cx, cy);
        let Clip { x0, y0, x1, y1 } = self.clip;
        for y in y0..y1 {
            for x in x0..x1 {
                let d = dist(x as f32 + 0.5, y as f32 + 0.5, acx, acy);
                let c = gradient_at(stops, gradient_t(d, r0, r1));
                self.blend(x, y, c);
            }
        }
    }

    /// Radial gradient limited to the disc of radius `disc`.
    pub fn fill_ring_gradient(&mut self, cx: f32, cy: f32, r0: f32, r1: f32, disc: f32, stops: &[(f32, Rgba)]) {
        if stops.is_empty() || disc <= 0.0 {
            return;
        }
        let (acx, acy) = self.abs(cx, cy);
        let (x0, y0, x1, y1) = self.clipped(acx - disc, acy - disc, acx + disc, acy + disc);
        for y in y0..y1 {
            for x in x0..x1 {
                let d = dist(x as f32 + 0.5, y as f32 + 0.5, acx, acy);
                if d > disc {
                    continue;
                }
                let c = gradient_at(stops, gradient_t(d, r0, r1));
                self.blend(x, y, c);
            }
        }
    }

    pub fn fill_circle(&mut self, cx: f32, cy: f32, r: f32, color: Rgba) {
        let (acx, acy) = self.abs(cx, cy);
        self.stamp(acx, acy, r, color);
    }

    pub fn stroke_polyline(&mut self, points: &[(f32, f32)], width: f32, color: Rgba) {
        let r = (width * 0.5).max(0.5);
        match points {
            [] => {}
            [(x, y)] => self.fill_circle(*x, *y, r, color),
            _ => {
                for seg in points.windows(2) {
                    let (ax, ay) = self.abs(seg[0].0, seg[0].1);
                    let (bx, by) = self.abs(seg[1].0, seg[1].1);
                    self.stroke_segment(ax, ay, bx, by, r, color);
                }
            }
        }
    }

    /// Open the see-through portal: clears colour and alpha inside radius `r`.
    /// With `feather`, the clearing fades out linearly toward the rim.
    pub fn punch_portal(&mut self, cx: f32, cy: f32, r: f32, feather: bool) {
        if r <= 0.0 {
            return;
        }
        let (acx, acy) = self.abs(cx, cy);
        let (x0, y0, x1, y1) = self.clipped(acx - r, acy - r, acx + r, acy + r);
        for y in y0..y1 {
            for x in x0..x1 {
                let d = dist(x as f32 + 0.5, y as f32 + 0.5, acx, acy);
                if d > r {
                    continue;
                }
                let keep = if feather { d / r } else { 0.0 };
                let i = (y * self.size + x) * 4;
                for c in &mut self.pixels[i..i + 4] {
                    *c = (*c as f32 * keep) as u8;
                }
            }
        }
    }

    fn stroke_segment(&mut self, ax: f32, ay: f32, bx: f32, by: f32, r: f32, color: Rgba) {
        let len = dist(ax, ay, bx, by);
        let steps = (len * 2.0).ceil().max(1.0) as usize;
        for s in 0..=steps {
            let t = s as f32 / steps as f32;
            self.stamp(ax + (bx - ax) * t, ay + (by - ay) * t, r, color);
        }
    }

    fn stamp(&mut self, acx: f32, acy: f32, r: f32, color: Rgba) {
        let (x0, y0, x1, y1) = self.clipped(acx - r, acy - r, acx + r + 1.0, acy + r + 1.0);
        let r2 = r * r;
        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as f32 + 0.5 - acx;
                let dy = y as f32 + 0.5 - acy;
                if dx * dx + dy * dy <= r2 {
                    self.blend(x, y, color);
                }
            }
        }
    }

    fn abs(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin.0 + x, self.origin.1 + y)
    }

    fn clipped(&self, ax0: f32, ay0: f32, ax1: f32, ay1: f32) -> (usize, usize, usize, usize) {
        let c = self.clip;
        let x0 = to_px(ax0).max(c.x0);
        let y0 = to_px(ay0).max(c.y0);
        let x1 = to_px(ax1.ceil()).min(c.x1);
        let y1 = to_px(ay1.ceil()).min(c.y1);
        (x0, y0, x1.max(x0), y1.max(y0))
    }

    #[inline]
    fn blend(&mut self, x: usize, y: usize, src: Rgba) {
        let sa = src[3] as u32;
        if sa == 0 {
            return;
        }
        let i = (y * self.size + x) * 4;
        if sa == 255 {
            self.pixels[i..i + 4].copy_from_slice(&src);
            return;
        }
        let inv = 255 - sa;
        let dst = &mut self.pixels[i..i + 4];
        for c in 0..3 {
            dst[c] = ((src[c] as u32 * sa + dst[c] as u32 * inv) / 255) as u8;
        }
        dst[3] = (sa + dst[3] as u32 * inv / 255).min(255) as u8;
    }
}

#[inline]
fn to_px(v: f32) -> usize {
    if v.is_nan() || v <= 0.0 { 0 } else { v as usize }
}

#[inline]
fn dist(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    ((ax - bx) * (ax - bx) + (ay - by) * (ay - by)).sqrt()
}

fn gradient_t(d: f32, r0: f32, r1: f32) -> f32 {
    let span = r1 - r0;
    if span.abs() < 1e-6 {
        return if d <= r0 { 0.0 } else { 1.0 };
    }
    ((d - r0) / span).clamp(0.0, 1.0)
}

fn gradient_at(stops: &[(f32, Rgba)], t: f32) -> Rgba {
    let first = stops[0];
    if t <= first.0 {
        return first.1;
    }
    for pair in stops.windows(2) {
        let (ta, ca) = pair[0];
        let (tb, cb) = pair[1];
        if t <= tb {
            let k = if tb > ta { (t - ta) / (tb - ta) } else { 1.0 };
            return lerp_rgba(ca, cb, k);
        }
    }
    stops[stops.len() - 1].1
}

fn lerp_rgba(a: Rgba, b: Rgba, t: f32) -> Rgba {
    let t = t.clamp(0.0, 1.0);
    let mut out = [0u8; 4];
    for c in 0..4 {
        out[c] = (a[c] as f32 * (1.0 - t) + b[c] as f32 * t).round() as u8;
    }
    out
}

/// CSS-style `hsl()`: hue wraps, saturation and lightness clamp to 0..=100.
pub fn hsl(h: f32, s: f32, l: f32) -> Rgba {
    hsla(h, s, l, 1.0)
}

pub fn hsla(h: f32, s: f32, l: f32, a: f32) -> Rgba {
    let h = h.rem_euclid(360.0) / 360.0;
    let s = (s / 100.0).clamp(0.0, 1.0);
    let l = (l / 100.0).clamp(0.0, 1.0);

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let r = hue_to_channel(p, q, h + 1.0 / 3.0);
    let g = hue_to_channel(p, q, h);
    let b = hue_to_channel(p, q, h - 1.0 / 3.0);
    [
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
        (a.clamp(0.0, 1.0) * 255.0).round() as u8,
    ]
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsl_primaries() {
        assert_eq!(hsl(0.0, 100.0, 50.0), [255, 0, 0, 255]);
        assert_eq!(hsl(120.0, 100.0, 50.0), [0, 255, 0, 255]);
        assert_eq!(hsl(240.0, 100.0, 50.0), [0, 0, 255, 255]);
        assert_eq!(hsl(480.0, 100.0, 50.0), hsl(120.0, 100.0, 50.0));
        // Lightness past 100 clamps to white.
        assert_eq!(hsl(30.0, 80.0, 184.0), [255, 255, 255, 255]);
    }

    #[test]
    fn viewport_clips_and_restores() {
        let mut c = Canvas::new(16);
        c.with_viewport(4.0, 4.0, 8.0, |c| c.fill(BLACK));
        assert_eq!(c.pixel(0, 0), CLEAR);
        assert_eq!(c.pixel(4, 4), BLACK);
        assert_eq!(c.pixel(11, 11), BLACK);
        assert_eq!(c.pixel(12, 12), CLEAR);

        c.fill([10, 20, 30, 255]);
        assert_eq!(c.pixel(0, 0), [10, 20, 30, 255]);
    }

    #[test]
    fn portal_clears_center_only() {
        let mut c = Canvas::new(64);
        c.fill([200, 100, 50, 255]);
        c.punch_portal(32.0, 32.0, 10.0, false);
        assert_eq!(c.pixel(32, 32)[3], 0);
        assert_eq!(c.pixel(0, 0), [200, 100, 50, 255]);
    }

    #[test]
    fn gradient_pads_past_outer_radius() {
        let mut c = Canvas::new(32);
        c.fill_radial_gradient(16.0, 16.0, 0.0, 4.0, &[(0.0, BLACK), (1.0, [255, 255, 255, 255])]);
        assert_eq!(c.pixel(0, 0), [255, 255, 255, 255]);
    }
}
