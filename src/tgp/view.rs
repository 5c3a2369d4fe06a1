//! Camera, projection and frustum state
//!
//! One `View` lives for the whole run. Display-list opcodes mutate it and the
//! geometry stages read it; the frustum coefficients are recomputed on every
//! viewport, zoom or translation change so they are never stale.

use crate::rasterizer::{ClipRect, ScreenPoint, Transform, Vec3};

use super::primitives::Point;

/// Number of light modes addressable by UPLOAD_LIGHT
pub const LIGHT_MODES: usize = 32;

/// Per light-mode response, as uploaded by the host
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LightParams {
    pub diffuse: f32,
    pub ambient: f32,
    pub specular: f32,
    pub power: u8,
}

impl LightParams {
    /// Decode a packed upload word: diffuse, ambient, specular bytes, then power
    pub fn from_packed(v: u32) -> Self {
        Self {
            diffuse: (v & 0xff) as f32 / 255.0,
            ambient: ((v >> 8) & 0xff) as f32 / 255.0,
            specular: ((v >> 16) & 0xff) as f32 / 255.0,
            power: (v >> 24) as u8,
        }
    }

    pub fn to_packed(&self) -> u32 {
        let byte = |f: f32| (f.clamp(0.0, 1.0) * 255.0).round() as u32;
        byte(self.diffuse) | byte(self.ambient) << 8 | byte(self.specular) << 16 | (self.power as u32) << 24
    }
}

/// Half-space coefficients: a point is inside an edge iff its coordinate
/// does not cross `coefficient * z`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Frustum {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

#[derive(Debug, Clone)]
pub struct View {
    /// Debug camera yaw, stored as cos/sin
    yaw_cos: f32,
    yaw_sin: f32,
    /// Debug camera offset added after the transform
    pub camera: Vec3,
    pub transform: Transform,

    /// Projection center
    pub xc: f32,
    pub yc: f32,
    /// Viewport, inclusive pixel bounds
    pub x1: i32,
    pub x2: i32,
    pub y1: i32,
    pub y2: i32,

    pub zoom_x: f32,
    pub zoom_y: f32,
    pub view_x: f32,
    pub view_y: f32,

    frustum: Frustum,

    pub light: Vec3,
    pub light_params: [LightParams; LIGHT_MODES],
}

impl View {
    pub fn new() -> Self {
        let mut view = Self {
            yaw_cos: 1.0,
            yaw_sin: 0.0,
            camera: Vec3::ZERO,
            transform: Transform::IDENTITY,
            xc: 248.0,
            yc: 192.0,
            x1: 0,
            x2: 495,
            y1: 0,
            y2: 383,
            zoom_x: 1.0,
            zoom_y: 1.0,
            view_x: 0.0,
            view_y: 0.0,
            frustum: Frustum::default(),
            light: Vec3::new(0.0, 0.0, 1.0),
            light_params: [LightParams::default(); LIGHT_MODES],
        };
        view.recompute_frustum();
        view
    }

    pub fn frustum(&self) -> Frustum {
        self.frustum
    }

    pub fn viewport(&self) -> ClipRect {
        ClipRect::new(self.x1, self.y1, self.x2, self.y2)
    }

    pub fn yaw(&self) -> f32 {
        self.yaw_sin.atan2(self.yaw_cos)
    }

    fn recompute_frustum(&mut self) {
        self.frustum = Frustum {
            left: (self.x1 as f32 - self.xc - self.view_x) / self.zoom_x,
            right: (self.x2 as f32 - self.xc - self.view_x) / self.zoom_x,
            bottom: (-(self.y1 as f32) + self.yc - self.view_y) / self.zoom_y,
            top: (-(self.y2 as f32) + self.yc - self.view_y) / self.zoom_y,
        };
    }

    pub fn set_viewport(&mut self, xc: f32, yc: f32, x1: i32, x2: i32, y1: i32, y2: i32) {
        self.xc = xc;
        self.yc = yc;
        self.x1 = x1;
        self.x2 = x2;
        self.y1 = y1;
        self.y2 = y2;
        self.recompute_frustum();
    }

    pub fn set_zoom(&mut self, x: f32, y: f32) {
        self.zoom_x = x;
        self.zoom_y = y;
        self.recompute_frustum();
    }

    pub fn set_view_translation(&mut self, x: f32, y: f32) {
        self.view_x = x;
        self.view_y = y;
        self.recompute_frustum();
    }

    pub fn set_light_direction(&mut self, dir: Vec3) {
        self.light = dir.normalize();
    }

    pub fn set_light_params(&mut self, index: usize, params: LightParams) {
        self.light_params[index % LIGHT_MODES] = params;
    }

    pub fn light_params(&self, index: usize) -> LightParams {
        self.light_params[index % LIGHT_MODES]
    }

    pub fn set_camera(&mut self, offset: Vec3, yaw: f32) {
        self.camera = offset;
        let (s, c) = yaw.sin_cos();
        self.yaw_cos = c;
        self.yaw_sin = s;
    }

    pub fn reset_transform(&mut self) {
        self.transform = Transform::IDENTITY;
    }

    /// Model space to view space: transform, camera offset, then camera yaw
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        let q = self.transform.apply_point(p) + self.camera;
        Vec3 {
            x: self.yaw_cos * q.x - self.yaw_sin * q.z,
            y: q.y,
            z: self.yaw_sin * q.x + self.yaw_cos * q.z,
        }
    }

    /// Rotation only, for normals
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        self.transform.apply_vector(v)
    }

    /// Perspective divide into screen space
    pub fn project_point(&self, p: &mut Point) {
        p.xx = p.pos.x / p.pos.z;
        p.yy = p.pos.y / p.pos.z;
        p.s = ScreenPoint::new(
            to_screen(self.xc + (p.xx * self.zoom_x + self.view_x)),
            to_screen(self.yc - (p.yy * self.zoom_y + self.view_y)),
        );
    }

    /// Screen mapping without the divide, for pre-projected direct geometry
    pub fn project_point_direct(&self, p: &mut Point) {
        p.xx = p.pos.x;
        p.yy = p.pos.y;
        p.s = ScreenPoint::new(to_screen(self.xc + p.xx), to_screen(self.yc - p.yy));
    }

    /// Project when in front of the eye, otherwise pin to the screen origin
    /// and leave removal to the clipper
    pub fn project_or_origin(&self, p: &mut Point) {
        if p.pos.z > 0.0 {
            self.project_point(p);
        } else {
            p.s = ScreenPoint::default();
        }
    }
}

impl Default for View {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncate toward zero and saturate to a 16-bit screen range so the 16.16
/// edge walker can never overflow
fn to_screen(v: f32) -> i32 {
    (v as i32).clamp(i16::MIN as i32, i16::MAX as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_view() -> View {
        let mut view = View::new();
        view.set_viewport(128.0, 128.0, 0, 255, 0, 255);
        view.set_zoom(40.0, 40.0);
        view
    }

    #[test]
    fn test_projection_formula() {
        let mut view = test_view();
        view.set_view_translation(3.0, -2.0);

        for &(x, y, z) in &[(1.0f32, 2.0f32, 10.0f32), (-4.0, 0.5, 3.0), (0.0, -7.0, 25.0)] {
            let mut p = Point::new(x, y, z);
            p.pos = view.transform_point(p.pos);
            view.project_point(&mut p);
            let ex = 128.0 + ((x / z) * 40.0 + 3.0);
            let ey = 128.0 - ((y / z) * 40.0 + -2.0);
            assert_eq!(p.s.x, ex as i32, "x for {:?}", (x, y, z));
            assert_eq!(p.s.y, ey as i32, "y for {:?}", (x, y, z));
            assert!((p.xx - x / z).abs() < 1e-6);
        }
    }

    #[test]
    fn test_frustum_follows_viewport_and_zoom() {
        let mut view = test_view();
        let f = view.frustum();
        assert!((f.left - (-128.0 / 40.0)).abs() < 1e-6);
        assert!((f.right - (127.0 / 40.0)).abs() < 1e-6);
        assert!((f.bottom - (128.0 / 40.0)).abs() < 1e-6);
        assert!((f.top - (-127.0 / 40.0)).abs() < 1e-6);

        view.set_zoom(80.0, 20.0);
        let g = view.frustum();
        assert!((g.left - (-128.0 / 80.0)).abs() < 1e-6);
        assert!((g.bottom - (128.0 / 20.0)).abs() < 1e-6);

        view.set_view_translation(8.0, 0.0);
        assert!((view.frustum().left - (-136.0 / 80.0)).abs() < 1e-6);
    }

    #[test]
    fn test_frustum_edges_project_to_viewport_edges() {
        let view = test_view();
        let f = view.frustum();
        let z = 7.0;
        let mut right = Point::new(f.right * z, 0.0, z);
        view.project_point(&mut right);
        assert!((right.s.x - 255).abs() <= 1);
        let mut top = Point::new(0.0, f.top * z, z);
        view.project_point(&mut top);
        assert!((top.s.y - 255).abs() <= 1);
    }

    #[test]
    fn test_camera_yaw_and_offset() {
        let mut view = View::new();
        view.set_camera(Vec3::new(0.0, 0.0, 5.0), std::f32::consts::FRAC_PI_2);
        let p = view.transform_point(Vec3::new(0.0, 1.0, 0.0));
        // Offset moves to z=5, a quarter turn swings it onto -x
        assert!((p.x + 5.0).abs() < 1e-5);
        assert!((p.y - 1.0).abs() < 1e-6);
        assert!(p.z.abs() < 1e-5);
        assert!((view.yaw() - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_vectors_ignore_translation() {
        let mut view = View::new();
        view.transform = Transform::new([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 9.0, 9.0, 9.0]);
        assert_eq!(view.transform_vector(Vec3::new(0.0, 0.0, 1.0)), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_behind_eye_goes_to_origin() {
        let view = test_view();
        let mut p = Point::new(1.0, 1.0, -2.0);
        p.s = ScreenPoint::new(5, 5);
        view.project_or_origin(&mut p);
        assert_eq!(p.s, ScreenPoint::default());
    }

    #[test]
    fn test_light_params_unpack() {
        let lp = LightParams::from_packed(0x07_80_00_ff);
        assert_eq!(lp.diffuse, 1.0);
        assert_eq!(lp.ambient, 0.0);
        assert!((lp.specular - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(lp.power, 7);
        assert_eq!(lp.to_packed(), 0x07_80_00_ff);
    }
}
