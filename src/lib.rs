//! TGP Raster: software model of the Model 1 geometry coprocessor
//!
//! Interprets the per-frame display list the way the arcade hardware did:
//! - Camera transform and perspective projection
//! - Four-plane frustum clipping with recursive quad splitting
//! - Painter's algorithm z-sort (no depth buffer)
//! - 16.16 fixed-point scanline fill, plain or dithered
//! - Luma translation tables for the lighting model

pub mod config;
pub mod logging;
pub mod rasterizer;
pub mod tgp;

pub use config::{load_config, load_config_from_str, save_config, ConfigError, RenderConfig};
pub use rasterizer::{ClipRect, Framebuffer, Vec3};
pub use tgp::{FrameStats, ListWriter, PolyWriter, Tgp};
