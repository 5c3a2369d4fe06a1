//! Vector math for the geometry stage

use std::ops::{Add, Mul, Sub};
use serde::{Deserialize, Serialize};

/// 3D Vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn len(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit vector; the zero vector stays zero instead of turning into NaN
    pub fn normalize(self) -> Vec3 {
        let l = self.len();
        if l == 0.0 {
            return Vec3::ZERO;
        }
        Vec3 {
            x: self.x / l,
            y: self.y / l,
            z: self.z / l,
        }
    }

    pub fn scale(self, s: f32) -> Vec3 {
        Vec3 {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }

    /// Linear blend: `self * t + other * (1 - t)`
    pub fn mix(self, other: Vec3, t: f32) -> Vec3 {
        Vec3 {
            x: self.x * t + other.x * (1.0 - t),
            y: self.y * t + other.y * (1.0 - t),
            z: self.z * t + other.z * (1.0 - t),
        }
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: f32) -> Vec3 {
        self.scale(s)
    }
}

/// Affine transform as uploaded by the host: a column-major 3x3 rotation
/// (`m[0..9]`) followed by the translation (`m[9..12]`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub m: [f32; 12],
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0],
    };

    pub fn new(m: [f32; 12]) -> Self {
        Self { m }
    }

    /// Rotate only, translation ignored (used for normals)
    pub fn apply_vector(&self, v: Vec3) -> Vec3 {
        let m = &self.m;
        Vec3 {
            x: m[0] * v.x + m[3] * v.y + m[6] * v.z,
            y: m[1] * v.x + m[4] * v.y + m[7] * v.z,
            z: m[2] * v.x + m[5] * v.y + m[8] * v.z,
        }
    }

    pub fn apply_point(&self, v: Vec3) -> Vec3 {
        self.apply_vector(v) + Vec3::new(self.m[9], self.m[10], self.m[11])
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Scalar triple product `p1 · ((p2 - p1) × (p3 - p1))`.
/// Positive when the triangle winds away from the eye at the origin.
pub fn view_determinant(p1: Vec3, p2: Vec3, p3: Vec3) -> f32 {
    p1.dot((p2 - p1).cross(p3 - p1))
}
