//! Core types for the rasterizer

use serde::{Deserialize, Serialize};

/// Packed 0x00RRGGBB color with bit 24 marking a dithered (moire) fill
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Color = Color(0x00_00_00);
    pub const WHITE: Color = Color(0xff_ff_ff);

    /// Dithered-fill flag, never written to the surface
    pub const DITHER: u32 = 0x0100_0000;

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | (b as u32))
    }

    /// Expand three 5-bit channel levels to 8 bits each
    pub fn from_rgb5(r: u8, g: u8, b: u8) -> Self {
        Self::new(pal5bit(r), pal5bit(g), pal5bit(b))
    }

    pub fn with_dither(self, dither: bool) -> Self {
        if dither {
            Self(self.0 | Self::DITHER)
        } else {
            Self(self.0 & !Self::DITHER)
        }
    }

    pub fn is_dithered(self) -> bool {
        self.0 & Self::DITHER != 0
    }

    /// The pixel value actually stored in a surface
    pub fn rgb(self) -> u32 {
        self.0 & 0x00ff_ffff
    }

    pub fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn b(self) -> u8 {
        self.0 as u8
    }

    /// Convert to [u8; 4] RGBA with opaque alpha
    pub fn to_bytes(self) -> [u8; 4] {
        [self.r(), self.g(), self.b(), 255]
    }
}

/// 5-bit to 8-bit channel expansion (replicates the top bits into the bottom)
pub fn pal5bit(c: u8) -> u8 {
    let c = c & 0x1f;
    (c << 3) | (c >> 2)
}

/// Integer screen coordinate of a projected point
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Inclusive pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipRect {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl ClipRect {
    pub fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Rectangle covering a whole `width` x `height` surface
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, width as i32 - 1, height as i32 - 1)
    }

    pub fn intersect(self, other: ClipRect) -> ClipRect {
        ClipRect {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}
