//! Core rendering functions
//! Scanline quad fill in 16.16 fixed point, plus the wireframe line drawer

use std::path::Path;

use super::types::{ClipRect, Color, ScreenPoint};

/// Fractional bits of the edge walker
pub const FRAC_SHIFT: u32 = 16;

/// Framebuffer for software rendering (0x00RRGGBB per pixel)
pub struct Framebuffer {
    pub pixels: Vec<u32>,
    pub width: usize,
    pub height: usize,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height],
            width,
            height,
        }
    }

    pub fn clear(&mut self, color: Color) {
        self.pixels.fill(color.rgb());
    }

    pub fn bounds(&self) -> ClipRect {
        ClipRect::full(self.width, self.height)
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> u32 {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x]
        } else {
            0
        }
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, rgb: u32) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = rgb;
        }
    }

    /// Fill `x1..=x2` on row `y`. Callers clip beforehand.
    fn hline(&mut self, x1: usize, x2: usize, y: usize, rgb: u32) {
        let row = y * self.width;
        self.pixels[row + x1..=row + x2].fill(rgb);
    }

    /// Checkerboard fill: only pixels where `(x ^ y) & 1` is set
    fn hline_dithered(&mut self, x1: usize, x2: usize, y: usize, rgb: u32) {
        let row = y * self.width;
        for x in x1..=x2 {
            if (x ^ y) & 1 != 0 {
                self.pixels[row + x] = rgb;
            }
        }
    }

    /// Convert to RGBA bytes (for texture upload or image export)
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|&p| Color(p).to_bytes())
            .collect()
    }

    /// Write the surface as a PNG file
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> image::ImageResult<()> {
        image::save_buffer(
            path,
            &self.to_rgba8(),
            self.width as u32,
            self.height as u32,
            image::ExtendedColorType::Rgba8,
        )
    }
}

/// Draw one span of pixel columns `x1..=x2` clipped to `clip`
fn draw_span(fb: &mut Framebuffer, clip: &ClipRect, color: Color, y: i64, x1: i64, x2: i64) {
    if y < clip.min_y as i64 || y > clip.max_y as i64 {
        return;
    }
    let x1 = x1.max(clip.min_x as i64);
    let x2 = x2.min(clip.max_x as i64);
    if x1 > x2 {
        return;
    }
    let (x1, x2, y) = (x1 as usize, x2 as usize, y as usize);
    if color.is_dithered() {
        fb.hline_dithered(x1, x2, y, color.rgb());
    } else {
        fb.hline(x1, x2, y, color.rgb());
    }
}

/// Single scanline from two fixed-point x positions in either order
fn fill_line(fb: &mut Framebuffer, clip: &ClipRect, color: Color, y: i64, x1: i64, x2: i64) {
    let (lo, hi) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
    draw_span(fb, clip, color, y, lo >> FRAC_SHIFT, hi >> FRAC_SHIFT);
}

/// Walk rows `y1..y2` advancing both edges by their slopes.
/// Returns the edge positions at `y2`, in the order they were passed in.
#[allow(clippy::too_many_arguments)]
fn fill_slope(
    fb: &mut Framebuffer,
    clip: &ClipRect,
    color: Color,
    x1: i64,
    x2: i64,
    sl1: i64,
    sl2: i64,
    y1: i64,
    y2: i64,
) -> (i64, i64) {
    let (cy1, cy2) = (clip.min_y as i64, clip.max_y as i64);

    if y1 > cy2 {
        return (x1, x2);
    }

    if y2 <= cy1 {
        let delta = y2 - y1;
        return (x1 + delta * sl1, x2 + delta * sl2);
    }

    let (mut x1, mut x2, mut y1) = (x1, x2, y1);
    let y2 = if y2 > cy2 { cy2 + 1 } else { y2 };

    if y1 < cy1 {
        let delta = cy1 - y1;
        x1 += delta * sl1;
        x2 += delta * sl2;
        y1 = cy1;
    }

    let swapped = x1 > x2 || (x1 == x2 && sl1 > sl2);
    let (mut left, mut right, sl_left, sl_right) = if swapped {
        (x2, x1, sl2, sl1)
    } else {
        (x1, x2, sl1, sl2)
    };

    while y1 < y2 {
        draw_span(fb, clip, color, y1, left >> FRAC_SHIFT, right >> FRAC_SHIFT);
        left += sl_left;
        right += sl_right;
        y1 += 1;
    }

    if swapped {
        (right, left)
    } else {
        (left, right)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct EdgePoint {
    x: i64, // 16.16
    y: i64,
}

/// Fixed-point x step per row from `b` to `a`
fn slope(a: EdgePoint, b: EdgePoint) -> i64 {
    let dy = a.y - b.y;
    if dy == 0 {
        0
    } else {
        (a.x - b.x) / dy
    }
}

/// Fill a quad given its four screen points in ring order.
///
/// The two edge chains are walked from the topmost vertex down to the
/// bottommost one; rows from min-y to max-y are covered inclusively.
/// Triangles are passed as quads with a repeated vertex.
pub fn fill_quad(fb: &mut Framebuffer, clip: ClipRect, pts: [ScreenPoint; 4], color: Color) {
    let clip = clip.intersect(fb.bounds());
    if clip.is_empty() {
        return;
    }

    // Ring duplicated so both chains can index past the end without wrapping
    let mut p = [EdgePoint::default(); 8];
    for (i, s) in pts.iter().enumerate() {
        let e = EdgePoint {
            x: (s.x as i64) << FRAC_SHIFT,
            y: s.y as i64,
        };
        p[i] = e;
        p[i + 4] = e;
    }

    let mut pmin = 0;
    let mut pmax = 0;
    for i in 1..4 {
        if p[i].y < p[pmin].y {
            pmin = i;
        }
        if p[i].y > p[pmax].y {
            pmax = i;
        }
    }

    let mut cury = p[pmin].y;
    let mut limy = p[pmax].y;

    if cury == limy {
        let (x1, x2) = p[..4]
            .iter()
            .fold((i64::MAX, i64::MIN), |(lo, hi), e| (lo.min(e.x), hi.max(e.x)));
        fill_line(fb, &clip, color, cury, x1, x2);
        return;
    }

    if cury > clip.max_y as i64 || limy < clip.min_y as i64 {
        return;
    }
    if limy > clip.max_y as i64 {
        limy = clip.max_y as i64;
    }

    // ps1 walks backwards through the ring, ps2 forwards
    let mut ps1 = pmin + 4;
    let mut ps2 = pmin;
    while ps1 > 1 && p[ps1 - 1].y == cury {
        ps1 -= 1;
    }
    while ps2 + 2 < p.len() && p[ps2 + 1].y == cury {
        ps2 += 1;
    }
    let mut x1 = p[ps1].x;
    let mut x2 = p[ps2].x;
    let mut sl1 = slope(p[ps1], p[ps1 - 1]);
    let mut sl2 = slope(p[ps2], p[ps2 + 1]);

    loop {
        let next1 = p[ps1 - 1].y;
        let next2 = p[ps2 + 1].y;
        let stop = next1.min(next2);

        (x1, x2) = fill_slope(fb, &clip, color, x1, x2, sl1, sl2, cury, stop);
        cury = stop;
        if cury >= limy {
            break;
        }

        // Only reachable for non-convex input; keeps the walk inside the ring
        if ps1 <= ps2 + 1 {
            break;
        }

        if next1 == stop {
            ps1 -= 1;
            while ps1 > 1 && p[ps1 - 1].y == cury {
                ps1 -= 1;
            }
            x1 = p[ps1].x;
            sl1 = slope(p[ps1], p[ps1 - 1]);
        }
        if next2 == stop {
            ps2 += 1;
            while ps2 + 2 < p.len() && p[ps2 + 1].y == cury {
                ps2 += 1;
            }
            x2 = p[ps2].x;
            sl2 = slope(p[ps2], p[ps2 + 1]);
        }
    }

    if cury == limy {
        fill_line(fb, &clip, color, cury, x1, x2);
    }
}

/// Pick the dominant channel of `color` (plus channels within a small
/// threshold of it) and light them at `brightness`.
fn line_pixel(color: Color, brightness: f32) -> u32 {
    const THRESHOLD: i32 = 20;

    let (r, g, b) = (color.r() as i32, color.g() as i32, color.b() as i32);
    let (use_r, use_g, use_b) = if g > r {
        if b > g {
            (b - r < THRESHOLD, b - g < THRESHOLD, true)
        } else {
            (g - r < THRESHOLD, true, g - b < THRESHOLD)
        }
    } else if b > r {
        (b - r < THRESHOLD, b - g < THRESHOLD, true)
    } else {
        (true, r - g < THRESHOLD, r - b < THRESHOLD)
    };

    let c = (255.0 * brightness.clamp(0.0, 1.0)) as u32;
    let mut out = 0;
    if use_b {
        out |= c;
    }
    if use_g {
        out |= c << 8;
    }
    if use_r {
        out |= c << 16;
    }
    out
}

fn plot(fb: &mut Framebuffer, clip: &ClipRect, x: i32, y: i32, brightness: f32, color: Color) {
    if brightness <= 0.0 || !clip.contains(x, y) {
        return;
    }
    fb.set_pixel(x as usize, y as usize, line_pixel(color, brightness));
}

/// Anti-aliased line (Xiaolin Wu style) between two screen points.
///
/// Each interior column (or row, for steep lines) lights two pixels split by
/// the fractional coverage. Endpoints are left to the adjacent edges.
pub fn draw_line_aa(fb: &mut Framebuffer, clip: ClipRect, color: Color, a: ScreenPoint, b: ScreenPoint) {
    let clip = clip.intersect(fb.bounds());
    let (mut x1, mut y1, mut x2, mut y2) = (a.x, a.y, b.x, b.y);

    if (x1 < clip.min_x && x2 < clip.min_x)
        || (x1 > clip.max_x && x2 > clip.max_x)
        || (y1 < clip.min_y && y2 < clip.min_y)
        || (y1 > clip.max_y && y2 > clip.max_y)
    {
        return;
    }

    let steep = (y2 - y1).abs() > (x2 - x1).abs();
    if steep {
        std::mem::swap(&mut x1, &mut y1);
        std::mem::swap(&mut x2, &mut y2);
    }
    if x1 > x2 {
        std::mem::swap(&mut x1, &mut x2);
        std::mem::swap(&mut y1, &mut y2);
    }

    let dx = (x2 - x1) as f32;
    let dy = (y2 - y1) as f32;
    let gradient = if dx == 0.0 { 1.0 } else { dy / dx };

    let mut intersect_y = y1 as f32 + gradient;
    for x in (x1 + 1)..x2 {
        let iy = intersect_y.floor();
        let frac = intersect_y - iy;
        let iy = iy as i32;
        if steep {
            plot(fb, &clip, iy, x, 1.0 - frac, color);
            plot(fb, &clip, iy + 1, x, frac, color);
        } else {
            plot(fb, &clip, x, iy, 1.0 - frac, color);
            plot(fb, &clip, x, iy + 1, frac, color);
        }
        intersect_y += gradient;
    }
}
