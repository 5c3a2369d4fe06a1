//! Renderer configuration loading and saving
//!
//! Uses RON (Rusty Object Notation) for human-readable config files.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::rasterizer::Color;

/// Default point arena capacity (two points per polygon record worst case)
pub const DEFAULT_POINT_CAPACITY: usize = 2_000_000;

/// Default quad arena capacity
pub const DEFAULT_QUAD_CAPACITY: usize = 1_000_000;

/// Model 1 viewport y fields are stored as `base - y` (383 + 39)
pub const MODEL1_VIEWPORT_Y_BASE: i32 = 422;

/// Knobs that are not part of the display list itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Integer upscale applied to viewport, zoom and view translation
    pub scale_x: f32,
    pub scale_y: f32,
    /// Draw outlines over a backdrop fill instead of flat polygons
    pub wireframe: bool,
    pub wireframe_fill: Color,
    pub viewport_y_base: i32,
    pub point_capacity: usize,
    pub quad_capacity: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            wireframe: false,
            wireframe_fill: Color::BLACK,
            viewport_y_base: MODEL1_VIEWPORT_Y_BASE,
            point_capacity: DEFAULT_POINT_CAPACITY,
            quad_capacity: DEFAULT_QUAD_CAPACITY,
        }
    }
}

/// Error type for config loading
#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    ParseError(ron::error::SpannedError),
    SerializeError(ron::Error),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::IoError(e)
    }
}

impl From<ron::error::SpannedError> for ConfigError {
    fn from(e: ron::error::SpannedError) -> Self {
        ConfigError::ParseError(e)
    }
}

impl From<ron::Error> for ConfigError {
    fn from(e: ron::Error) -> Self {
        ConfigError::SerializeError(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Parse error: {}", e),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load a config from a RON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RenderConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    load_config_from_str(&contents)
}

/// Load a config from a RON string
pub fn load_config_from_str(s: &str) -> Result<RenderConfig, ConfigError> {
    let mut config: RenderConfig = ron::from_str(s)?;

    // A zero scale would collapse the viewport to a point
    if config.scale_x <= 0.0 {
        config.scale_x = 1.0;
    }
    if config.scale_y <= 0.0 {
        config.scale_y = 1.0;
    }

    Ok(config)
}

/// Save a config to a RON file
pub fn save_config<P: AsRef<Path>>(config: &RenderConfig, path: P) -> Result<(), ConfigError> {
    let pretty = ron::ser::PrettyConfig::new()
        .depth_limit(2)
        .indentor("  ".to_string());

    let contents = ron::ser::to_string_pretty(config, pretty)?;
    fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = load_config_from_str("(wireframe: true, scale_x: 2.0)").unwrap();
        assert!(config.wireframe);
        assert_eq!(config.scale_x, 2.0);
        assert_eq!(config.scale_y, 1.0);
        assert_eq!(config.quad_capacity, DEFAULT_QUAD_CAPACITY);
    }

    #[test]
    fn test_nonpositive_scale_reset() {
        let config = load_config_from_str("(scale_x: 0.0, scale_y: -3.0)").unwrap();
        assert_eq!(config.scale_x, 1.0);
        assert_eq!(config.scale_y, 1.0);
    }

    #[test]
    fn test_parse_error_reported() {
        let err = load_config_from_str("(wireframe: maybe)").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
        assert!(err.to_string().starts_with("Parse error"));
    }

    #[test]
    fn test_roundtrip_through_file() {
        let path = std::env::temp_dir().join("tgp_raster_config_test.ron");
        let config = RenderConfig {
            wireframe: true,
            wireframe_fill: Color::WHITE,
            quad_capacity: 1234,
            ..Default::default()
        };
        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(loaded, config);
    }
}
