//! Geometry primitives shared by the pusher, clipper and rasterizer

use crate::rasterizer::{Color, ScreenPoint, Vec3};

/// A vertex in view space together with its projection
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub pos: Vec3,
    /// Screen-space ratios (x/z, y/z in perspective mode)
    pub xx: f32,
    pub yy: f32,
    pub s: ScreenPoint,
}

impl Point {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            pos: Vec3::new(x, y, z),
            ..Default::default()
        }
    }
}

/// Index of a point in the frame arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointId(pub u32);

/// Four arena points in ring order; triangles repeat their last vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub p: [PointId; 4],
    pub color: Color,
    /// Sort key only
    pub z: f32,
    /// Insertion order, assigned by the arena
    pub seq: u32,
}

impl Quad {
    pub fn new(p: [PointId; 4], color: Color, z: f32) -> Self {
        Self { p, color, z, seq: 0 }
    }

    /// Same color and depth, different corners (used by clip splitting)
    pub fn with_points(&self, p: [PointId; 4]) -> Self {
        Self { p, ..*self }
    }

    pub fn is_triangle(&self) -> bool {
        self.p[3] == self.p[2]
    }
}
