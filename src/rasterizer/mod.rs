//! Software rasterizer for TGP output
//!
//! Features:
//! - Flat-shaded quads (triangles as degenerate quads)
//! - 16.16 fixed-point edge walking, one span per scanline
//! - Moire (alternating pixel) fill for flagged polygons
//! - Anti-aliased wireframe lines
//! - Painter's algorithm only, no Z-buffer

mod math;
mod types;
mod render;

pub use math::*;
pub use types::*;
pub use render::*;

/// Native Model 1 screen dimensions
pub const WIDTH: usize = 496;
pub const HEIGHT: usize = 384;
