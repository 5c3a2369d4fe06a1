//! Synthetic scene for the viewer: a spinning cube from polygon ROM plus a
//! direct-mode marker, re-encoded into a fresh display list every frame

use tgp_raster::rasterizer::{Transform, Vec3, HEIGHT, WIDTH};
use tgp_raster::tgp::{ColorTables, LightParams, PolyFlags, PolyWriter, TEXRAM_BASE};
use tgp_raster::{ListWriter, Tgp};

/// Texture address of the first cube face; faces advance from here
const CUBE_TEX: u32 = TEXRAM_BASE + 0x10;

/// Texture address used by the direct-mode marker
const MARKER_TEX: u32 = TEXRAM_BASE + 0x20;

const CUBE_DEPTH: f32 = 6.0;

/// Raw zoom word, scaled by 4 in the interpreter
const ZOOM: f32 = 75.0;

/// RGB555 face colors, palette slots 0x1001..=0x1006
const FACE_COLORS: [u16; 6] = [0x001f, 0x03e0, 0x7c00, 0x03ff, 0x7fe0, 0x7c1f];

const fn rgb555(r: u16, g: u16, b: u16) -> u16 {
    r | g << 5 | b << 10
}

/// Unit cube as six separate strips, outward normals
pub fn cube_rom() -> Vec<u32> {
    let axes = [
        (Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 1.0)),
        (Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 1.0, 0.0)),
        (Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0)),
        (Vec3::new(0.0, -1.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0)),
        (Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)),
        (Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 0.0, 0.0)),
    ];

    let mut w = PolyWriter::new();
    w.begin(Vec3::ZERO, Vec3::ZERO);
    for (i, (n, u, v)) in axes.into_iter().enumerate() {
        // Ring order with (v1 - v0) x (v2 - v0) along the outward normal
        let c = [n - u - v, n + u - v, n + u + v, n - u + v];
        let open = PolyFlags::record(1, 0);
        let close = PolyFlags::record(1, 2).with_z_mode(2) | PolyFlags::TEX_ADVANCE;
        // The last face is drawn with the moire fill
        let close = if i == 5 { close | PolyFlags::DITHER } else { close };
        w.record(open, n, c[1], c[0]);
        w.record(close, n, c[2], c[3]);
    }
    w.end();
    w.into_words()
}

/// Palette and color tables the list can not upload itself
pub fn install(tgp: &mut Tgp) {
    tgp.set_poly_rom(cube_rom());
    let mem = tgp.memories_mut();
    mem.tables = ColorTables::linear();
    mem.palette.load(0x1001, &FACE_COLORS);
    mem.palette.set(0x1010, rgb555(31, 24, 4));
}

fn rotation(yaw: f32, pitch: f32, t: Vec3) -> Transform {
    let (sy, cy) = yaw.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    // Columns of Ry(yaw) * Rx(pitch)
    let x = Vec3::new(cy, 0.0, -sy);
    let y = Vec3::new(sy * sp, cp, cy * sp);
    let z = Vec3::new(sy * cp, -sp, cy * cp);
    Transform::new([x.x, x.y, x.z, y.x, y.y, y.z, z.x, z.y, z.z, t.x, t.y, t.z])
}

/// Display list for one frame at animation time `t` (seconds)
pub fn frame_list(t: f32) -> Vec<u16> {
    let (w, h) = (WIDTH as i16, HEIGHT as i16);
    let marker_z = 1000.0;
    let marker = |flags: u32, x: f32, y: f32| tgp_raster::tgp::DirectRecord {
        flags,
        luminance: 0xff,
        p0: Vec3::new(x, y, marker_z),
        z: marker_z,
        p1: Vec3::new(x, y - 16.0, marker_z),
    };
    let left = -(w as f32) / 2.0 + 12.0;
    let top = h as f32 / 2.0 - 12.0;

    let mut list = ListWriter::new();
    list.set_viewport(w / 2, h / 2, 0, w - 1, 0, h - 1)
        .set_zoom(ZOOM, ZOOM)
        .set_translation(0.0, 0.0)
        .upload_color(CUBE_TEX + 1, &[1, 2, 3, 4, 5, 6])
        .upload_color(MARKER_TEX, &[0x10])
        .upload_light(
            0,
            &[LightParams {
                diffuse: 0.8,
                ambient: 0.2,
                specular: 0.0,
                power: 0,
            }],
        )
        .set_light_dir(Vec3::new(0.4, 0.6, -1.0))
        .set_matrix(&rotation(t * 0.9, t * 0.4, Vec3::new(0.0, 0.0, CUBE_DEPTH)))
        .draw_object(CUBE_TEX, 0, 0)
        .counter_inc(0)
        .draw_direct(
            MARKER_TEX,
            [Vec3::new(left, top, marker_z), Vec3::new(left, top - 16.0, marker_z)],
            &[marker(PolyFlags::record(1, 2).bits(), left + 16.0, top)],
        )
        .end();
    list.into_words()
}
