//! Flat lighting and the per-channel luma translation tables

use crate::rasterizer::{Color, Vec3};

use super::memory::{Palette, TextureRam};
use super::view::LightParams;

/// Entries per channel table: 5-bit base level << 8 | 6-bit luma
pub const COLOR_TABLE_ENTRIES: usize = 0x2000;

pub const MAX_LUMA: u8 = 63;

/// Palette half holding polygon colors
const POLY_PALETTE_BANK: usize = 0x1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red = 0,
    Green = 1,
    Blue = 2,
}

/// Host-populated nonlinear correction, one table per channel
pub struct ColorTables {
    tables: [Vec<u16>; 3],
}

impl ColorTables {
    pub fn new() -> Self {
        Self {
            tables: std::array::from_fn(|_| vec![0; COLOR_TABLE_ENTRIES]),
        }
    }

    /// Tables that scale the base level linearly with luma
    pub fn linear() -> Self {
        let mut t = Self::new();
        for ch in [Channel::Red, Channel::Green, Channel::Blue] {
            for base in 0..32u32 {
                for luma in 0..=MAX_LUMA as u32 {
                    let v = ((base << 3) * luma / MAX_LUMA as u32) as u16;
                    t.set(ch, ((base << 8) | luma) as usize, v);
                }
            }
        }
        t
    }

    pub fn get(&self, ch: Channel, index: usize) -> u16 {
        self.tables[ch as usize][index & (COLOR_TABLE_ENTRIES - 1)]
    }

    pub fn set(&mut self, ch: Channel, index: usize, value: u16) {
        self.tables[ch as usize][index & (COLOR_TABLE_ENTRIES - 1)] = value;
    }

    /// Corrected 5-bit level for one channel
    fn translate(&self, ch: Channel, base: u16, luma: u8) -> u8 {
        let index = ((base as usize & 0x1f) << 8) | luma as usize;
        ((self.get(ch, index) >> 3) & 0x1f) as u8
    }

    /// Light an RGB555 base color at the given luma
    pub fn shade(&self, rgb555: u16, luma: u8) -> Color {
        let r = self.translate(Channel::Red, rgb555, luma);
        let g = self.translate(Channel::Green, rgb555 >> 5, luma);
        let b = self.translate(Channel::Blue, rgb555 >> 10, luma);
        Color::from_rgb5(r, g, b)
    }
}

impl Default for ColorTables {
    fn default() -> Self {
        Self::new()
    }
}

/// Always zero: the highlight term is not modeled
pub fn compute_specular(_normal: Vec3, _light: Vec3, _params: &LightParams) -> f32 {
    0.0
}

/// Luma for a unit normal under the current light
pub fn luma_from_normal(normal: Vec3, light: Vec3, params: &LightParams) -> u8 {
    let diffuse = normal.dot(light).max(0.0);
    let ln = params.ambient + params.diffuse * diffuse + compute_specular(normal, light, params);
    luma_from_intensity(ln)
}

pub fn luma_from_intensity(ln: f32) -> u8 {
    (((255.0 * ln.min(1.0)) as i32) >> 2).clamp(0, MAX_LUMA as i32) as u8
}

/// Luma carried in the top byte of a direct-mode luminance word
pub fn luma_from_direct(lum: u32) -> u8 {
    ((((lum >> 24) as f32 * 2.0) as i32) >> 2).clamp(0, MAX_LUMA as i32) as u8
}

/// Base RGB555 color for a texture address
pub fn base_color(texram: &TextureRam, palette: &Palette, tex: u32) -> u16 {
    palette.get(POLY_PALETTE_BANK | (texram.read(tex) as usize & 0x3ff))
}
