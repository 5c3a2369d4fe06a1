//! Polygon pushers: object-mode records from polygon memory and inline
//! direct-mode streams from the display list
//!
//! Both formats describe quad strips. Two seed points open the strip, then
//! every record brings two new points (`p0`, `p1`). A record with a non-zero
//! link code closes the quad `(old_p1, old_p0, p0, p1)`; the link code then
//! decides which of the new points become the next shared edge.

use bitflags::bitflags;
use log::{debug, trace};

use crate::rasterizer::{view_determinant, Color, Vec3};

use super::arena::{ArenaFull, FrameArena};
use super::clip::Clipper;
use super::display_list::{ListReader, LIST_WORDS};
use super::lighting::{base_color, luma_from_direct, luma_from_normal};
use super::memory::Memories;
use super::primitives::{Point, PointId, Quad};
use super::view::View;

bitflags! {
    /// Polygon record flag word
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PolyFlags: u32 {
        const TYPE = 0x0000_0003;
        const LINK = 0x0000_0300;
        const Z_MODE = 0x0000_0c00;
        /// Advance the texture address before this record
        const TEX_ADVANCE = 0x0000_1000;
        /// Alternating-pixel fill
        const DITHER = 0x0000_2000;
        /// Skip back-face culling
        const DOUBLE_SIDED = 0x0000_4000;
        const LIGHT_MODE = 0x001e_0000;
    }
}

impl PolyFlags {
    /// Flags for a record of `kind` (1..=3, 0 terminates) with a link code
    pub fn record(kind: u32, link: u32) -> Self {
        Self::from_bits_retain((kind & 3) | (link & 3) << 8)
    }

    pub fn with_z_mode(self, mode: u32) -> Self {
        Self::from_bits_retain((self.bits() & !Self::Z_MODE.bits()) | (mode & 3) << 10)
    }

    pub fn with_light_mode(self, mode: u32) -> Self {
        Self::from_bits_retain((self.bits() & !Self::LIGHT_MODE.bits()) | (mode & 15) << 17)
    }

    pub fn poly_type(self) -> u32 {
        self.bits() & 3
    }

    pub fn link(self) -> u32 {
        (self.bits() >> 8) & 3
    }

    pub fn z_mode(self) -> u32 {
        (self.bits() >> 10) & 3
    }

    pub fn light_mode(self) -> usize {
        ((self.bits() >> 17) & 15) as usize
    }
}

/// Object records are rejected above this count
pub const MAX_OBJECT_SIZE: u32 = 0x100_0000;

/// Texture address marking an object as garbage
pub const NO_TEXTURE: u32 = 0xffff_ffff;

/// Words in one object-mode record
pub const OBJECT_RECORD_WORDS: u32 = 10;

/// Upper bound on direct records in one stream (a whole list of the
/// smallest record)
const MAX_DIRECT_RECORDS: usize = LIST_WORDS / 12 + 1;

/// Shared strip edge
#[derive(Debug, Clone, Copy)]
struct StripEdge {
    p0: PointId,
    p1: PointId,
}

impl StripEdge {
    fn advance(&mut self, link: u32, p0: PointId, p1: PointId) {
        match link {
            1 => self.p1 = p0,
            3 => self.p0 = p1,
            _ => {
                self.p0 = p0;
                self.p1 = p1;
            }
        }
    }
}

/// Everything the pushers read or write during one batch
pub struct GeometryContext<'a> {
    pub view: &'a View,
    pub arena: &'a mut FrameArena,
    pub mem: &'a Memories,
}

impl GeometryContext<'_> {
    fn object_point(&mut self, pos: Vec3) -> Result<PointId, ArenaFull> {
        let mut p = Point {
            pos: self.view.transform_point(pos),
            ..Default::default()
        };
        self.view.project_or_origin(&mut p);
        self.arena.alloc_point(p)
    }

    fn direct_point(&mut self, pos: Vec3) -> Result<PointId, ArenaFull> {
        let mut p = Point { pos, ..Default::default() };
        if pos.z > 0.0 {
            self.view.project_point_direct(&mut p);
        }
        self.arena.alloc_point(p)
    }

    fn read_vec3(&self, addr: u32) -> Vec3 {
        Vec3::new(
            self.mem.poly.read_f32(addr),
            self.mem.poly.read_f32(addr.wrapping_add(1)),
            self.mem.poly.read_f32(addr.wrapping_add(2)),
        )
    }

    fn quad_color(&self, tex: u32, luma: u8, flags: PolyFlags) -> Color {
        let base = base_color(&self.mem.texram, &self.mem.palette, tex);
        self.mem
            .tables
            .shade(base, luma)
            .with_dither(flags.contains(PolyFlags::DITHER))
    }

    fn clip(&mut self, quad: Quad) -> Result<(), ArenaFull> {
        Clipper::new(self.view, self.arena).push_quad(quad)
    }

    /// Walk an object-mode record block and queue its quads
    pub fn push_object(&mut self, mut tex: u32, poly_addr: u32, size: u32) {
        if tex == NO_TEXTURE || size >= MAX_OBJECT_SIZE {
            debug!("rejected object (tex {:x}, poly {:x}, size {:x})", tex, poly_addr, size);
            return;
        }
        debug!("draw object (tex {:x}, poly {:x}, size {:x})", tex, poly_addr, size);

        // Zero means "until the terminator"
        let count = if size == 0 { u32::MAX } else { size };

        let seed0 = self.read_vec3(poly_addr);
        let seed1 = self.read_vec3(poly_addr.wrapping_add(3));
        let (Ok(p0), Ok(p1)) = (self.object_point(seed0), self.object_point(seed1)) else {
            return;
        };
        let mut old = StripEdge { p0, p1 };
        let mut old_z = 0.0f32;
        let mut addr = poly_addr.wrapping_add(6);

        for _ in 0..count {
            let flags = PolyFlags::from_bits_retain(self.mem.poly.read(addr));
            if flags.poly_type() == 0 {
                break;
            }
            if flags.contains(PolyFlags::TEX_ADVANCE) {
                tex = tex.wrapping_add(1);
            }

            let normal = self.read_vec3(addr.wrapping_add(1));
            let v0 = self.read_vec3(addr.wrapping_add(4));
            let v1 = self.read_vec3(addr.wrapping_add(7));
            let (Ok(p0), Ok(p1)) = (self.object_point(v0), self.object_point(v1)) else {
                break;
            };

            let link = flags.link();
            trace!("object record {:08x} at {:x}", flags.bits(), addr);

            if link != 0 {
                let pos = |id: PointId| self.arena.point(id).pos;
                let det = view_determinant(pos(old.p1), pos(old.p0), pos(p0));
                let culled = !flags.contains(PolyFlags::DOUBLE_SIDED) && det > 0.0;

                if !culled {
                    let corners = [old.p1, old.p0, p0, p1];
                    let depths = corners.map(|id| self.arena.point(id).pos.z);
                    let z = match flags.z_mode() {
                        0 => old_z,
                        1 => {
                            old_z = depths.iter().copied().fold(f32::INFINITY, f32::min);
                            old_z
                        }
                        2 => {
                            old_z = depths.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                            old_z
                        }
                        _ => 0.0,
                    };

                    let n = self.view.transform_vector(normal).normalize();
                    let params = self.view.light_params(flags.light_mode());
                    let luma = luma_from_normal(n, self.view.light, &params);
                    let color = self.quad_color(tex, luma, flags);
                    if self.clip(Quad::new(corners, color, z)).is_err() {
                        break;
                    }
                }
            }

            old.advance(link, p0, p1);
            addr = addr.wrapping_add(OBJECT_RECORD_WORDS);
        }
    }

    /// Walk an inline direct-mode stream starting at the opcode and queue its
    /// quads. Returns the offset of the next list record.
    pub fn push_direct(&mut self, list: &ListReader<'_>, offset: usize) -> usize {
        let end = skip_direct(list, offset);
        let mut tex = list.readi(offset + 2);
        debug!("draw direct (tex {:x})", tex);

        let seed0 = list.read_vec3(offset + 6);
        let seed1 = list.read_vec3(offset + 14);
        let (Ok(p0), Ok(p1)) = (self.direct_point(seed0), self.direct_point(seed1)) else {
            return end;
        };
        let mut old = StripEdge { p0, p1 };
        let mut lo = offset + 18;

        for _ in 0..MAX_DIRECT_RECORDS {
            let flags = PolyFlags::from_bits_retain(list.readi(lo + 2));
            if flags.poly_type() == 0 {
                break;
            }
            if flags.contains(PolyFlags::TEX_ADVANCE) {
                tex = tex.wrapping_add(1);
            }

            let lum = list.readi(lo + 4);
            let v0 = list.read_vec3(lo + 8);
            let (v1, z) = if flags.poly_type() == 2 {
                lo += 12;
                (v0, v0.z)
            } else {
                let z = list.readf(lo + 14);
                let v1 = list.read_vec3(lo + 16);
                lo += 20;
                (v1, z)
            };

            let (Ok(p0), Ok(p1)) = (self.direct_point(v0), self.direct_point(v1)) else {
                return end;
            };

            let link = flags.link();
            if link != 0 {
                let color = self.quad_color(tex, luma_from_direct(lum), flags);
                if self.clip(Quad::new([old.p1, old.p0, p0, p1], color, z)).is_err() {
                    return end;
                }
            }
            old.advance(link, p0, p1);
        }

        end
    }
}

/// Offset just past a direct-mode stream, without emitting anything
pub fn skip_direct(list: &ListReader<'_>, offset: usize) -> usize {
    let mut lo = offset + 18;
    for _ in 0..MAX_DIRECT_RECORDS {
        match list.readi(lo + 2) & 3 {
            0 => break,
            2 => lo += 12,
            _ => lo += 20,
        }
    }
    lo + 4
}

/// Encoder for object-mode polygon memory images
#[derive(Debug, Clone, Default)]
pub struct PolyWriter {
    words: Vec<u32>,
}

impl PolyWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an object with its two seed points; returns its word address
    pub fn begin(&mut self, seed0: Vec3, seed1: Vec3) -> u32 {
        let addr = self.words.len() as u32;
        self.vec3(seed0);
        self.vec3(seed1);
        addr
    }

    pub fn record(&mut self, flags: PolyFlags, normal: Vec3, p0: Vec3, p1: Vec3) -> &mut Self {
        self.words.push(flags.bits());
        self.vec3(normal);
        self.vec3(p0);
        self.vec3(p1);
        self
    }

    /// Terminating record
    pub fn end(&mut self) -> &mut Self {
        self.words.push(0);
        self
    }

    fn vec3(&mut self, v: Vec3) {
        self.words.extend([v.x.to_bits(), v.y.to_bits(), v.z.to_bits()]);
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn into_words(self) -> Vec<u32> {
        self.words
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tgp::display_list::{DirectRecord, ListWriter};
    use crate::tgp::lighting::ColorTables;
    use crate::tgp::memory::{POLY_RAM_BANK, TEXRAM_BASE};
    use crate::tgp::view::LightParams;

    const TEX: u32 = TEXRAM_BASE + 4;

    struct Fixture {
        view: View,
        arena: FrameArena,
        mem: Memories,
    }

    impl Fixture {
        fn new() -> Self {
            let mut view = View::new();
            view.set_viewport(128.0, 128.0, 0, 255, 0, 255);
            view.set_zoom(128.0, 128.0);
            view.set_light_direction(Vec3::new(0.0, 0.0, -1.0));
            view.set_light_params(0, LightParams { diffuse: 1.0, ..Default::default() });

            let mut mem = Memories {
                tables: ColorTables::linear(),
                ..Default::default()
            };
            mem.texram.write(TEX, 5);
            mem.palette.set(0x1005, 0x7fff);
            mem.texram.write(TEX + 1, 6);
            mem.palette.set(0x1006, 0x001f);

            Self {
                view,
                arena: FrameArena::new(256, 256),
                mem,
            }
        }

        fn ctx(&mut self) -> GeometryContext<'_> {
            GeometryContext {
                view: &self.view,
                arena: &mut self.arena,
                mem: &self.mem,
            }
        }
    }

    /// Front-facing square at depth 5, normal toward the light
    fn square(flags: PolyFlags) -> Vec<u32> {
        let mut w = PolyWriter::new();
        w.begin(Vec3::new(-1.0, 1.0, 5.0), Vec3::new(-1.0, -1.0, 5.0));
        w.record(flags, Vec3::new(0.0, 0.0, -1.0), Vec3::new(1.0, 1.0, 5.0), Vec3::new(1.0, -1.0, 5.0));
        w.end();
        w.into_words()
    }

    /// Same square wound the other way
    fn back_square(flags: PolyFlags) -> Vec<u32> {
        let mut w = PolyWriter::new();
        w.begin(Vec3::new(-1.0, -1.0, 5.0), Vec3::new(-1.0, 1.0, 5.0));
        w.record(flags, Vec3::new(0.0, 0.0, -1.0), Vec3::new(1.0, -1.0, 5.0), Vec3::new(1.0, 1.0, 5.0));
        w.end();
        w.into_words()
    }

    #[test]
    fn test_object_quad_lit_and_projected() {
        let mut fx = Fixture::new();
        fx.mem.poly.set_rom(square(PolyFlags::record(1, 2).with_z_mode(1)));
        fx.ctx().push_object(TEX, 0, 0);

        let quads = fx.arena.quads();
        assert_eq!(quads.len(), 1);
        let q = quads[0];
        assert_eq!(q.color, Color::WHITE);
        assert_eq!(q.z, 5.0);
        assert_eq!(fx.arena.point_count(), 4);
        // 128 -/+ 0.2 * 128
        let s: Vec<_> = q.p.iter().map(|&id| fx.arena.point(id).s).collect();
        assert_eq!((s[0].x, s[0].y), (102, 153));
        assert_eq!((s[2].x, s[2].y), (153, 102));
    }

    #[test]
    fn test_back_face_culled_unless_double_sided() {
        let mut fx = Fixture::new();
        fx.mem.poly.set_rom(back_square(PolyFlags::record(1, 2)));
        fx.ctx().push_object(TEX, 0, 0);
        assert!(fx.arena.quads().is_empty());
        // Points are still allocated for the strip
        assert_eq!(fx.arena.point_count(), 4);

        let mut fx = Fixture::new();
        fx.mem.poly.set_rom(back_square(PolyFlags::record(1, 2) | PolyFlags::DOUBLE_SIDED));
        fx.ctx().push_object(TEX, 0, 0);
        assert_eq!(fx.arena.quads().len(), 1);
    }

    #[test]
    fn test_link_zero_opens_strip_without_quad() {
        let mut fx = Fixture::new();
        fx.mem.poly.set_rom(square(PolyFlags::record(1, 0)));
        fx.ctx().push_object(TEX, 0, 0);
        assert!(fx.arena.quads().is_empty());
    }

    #[test]
    fn test_texture_advance_and_dither() {
        let mut fx = Fixture::new();
        fx.mem.poly.set_rom(square(PolyFlags::record(1, 2) | PolyFlags::TEX_ADVANCE | PolyFlags::DITHER));
        fx.ctx().push_object(TEX, 0, 0);
        let c = fx.arena.quads()[0].color;
        assert!(c.is_dithered());
        assert_eq!(c.rgb(), 0xff_00_00);
    }

    #[test]
    fn test_light_mode_selects_params() {
        let mut fx = Fixture::new();
        fx.view.set_light_params(3, LightParams::default());
        fx.mem.poly.set_rom(square(PolyFlags::record(1, 2).with_light_mode(3)));
        fx.ctx().push_object(TEX, 0, 0);
        assert_eq!(fx.arena.quads()[0].color, Color::BLACK);
    }

    #[test]
    fn test_z_modes() {
        for (mode, expected) in [(0, 0.0), (2, 5.0), (3, 0.0)] {
            let mut fx = Fixture::new();
            fx.mem.poly.set_rom(square(PolyFlags::record(1, 2).with_z_mode(mode)));
            fx.ctx().push_object(TEX, 0, 0);
            assert_eq!(fx.arena.quads()[0].z, expected, "z mode {}", mode);
        }
    }

    #[test]
    fn test_rejected_objects() {
        let mut fx = Fixture::new();
        fx.mem.poly.set_rom(square(PolyFlags::record(1, 2)));
        fx.ctx().push_object(NO_TEXTURE, 0, 0);
        fx.ctx().push_object(TEX, 0, MAX_OBJECT_SIZE);
        assert_eq!(fx.arena.point_count(), 0);
    }

    #[test]
    fn test_count_limits_records() {
        let mut fx = Fixture::new();
        let flags = PolyFlags::record(1, 2) | PolyFlags::DOUBLE_SIDED;
        let mut w = PolyWriter::new();
        w.begin(Vec3::new(-1.0, 1.0, 5.0), Vec3::new(-1.0, -1.0, 5.0));
        for i in 0..3 {
            let x = i as f32 * 0.5;
            w.record(flags, Vec3::new(0.0, 0.0, -1.0), Vec3::new(x, 1.0, 5.0), Vec3::new(x, -1.0, 5.0));
        }
        w.end();
        fx.mem.poly.set_rom(w.into_words());
        fx.ctx().push_object(TEX, 0, 2);
        assert_eq!(fx.arena.quads().len(), 2);
    }

    #[test]
    fn test_strip_link_codes() {
        let mut old = StripEdge { p0: PointId(0), p1: PointId(1) };
        old.advance(1, PointId(2), PointId(3));
        assert_eq!((old.p0, old.p1), (PointId(0), PointId(2)));
        old.advance(3, PointId(4), PointId(5));
        assert_eq!((old.p0, old.p1), (PointId(5), PointId(2)));
        old.advance(2, PointId(6), PointId(7));
        assert_eq!((old.p0, old.p1), (PointId(6), PointId(7)));
    }

    #[test]
    fn test_object_from_poly_ram() {
        let mut fx = Fixture::new();
        for (i, w) in square(PolyFlags::record(1, 2)).into_iter().enumerate() {
            fx.mem.poly.write_ram(0x100 + i as u32, w);
        }
        fx.ctx().push_object(TEX, POLY_RAM_BANK | 0x100, 0);
        assert_eq!(fx.arena.quads().len(), 1);
    }

    #[test]
    fn test_arena_full_stops_walk() {
        let mut fx = Fixture::new();
        fx.arena = FrameArena::new(3, 16);
        fx.mem.poly.set_rom(square(PolyFlags::record(1, 2)));
        fx.ctx().push_object(TEX, 0, 0);
        assert!(fx.arena.quads().is_empty());
        assert_eq!(fx.arena.take_dropped(), 1);
    }

    fn strip(records: usize) -> Vec<u32> {
        let flags = PolyFlags::record(1, 2) | PolyFlags::DOUBLE_SIDED;
        let mut w = PolyWriter::new();
        w.begin(Vec3::new(-1.0, 1.0, 5.0), Vec3::new(-1.0, -1.0, 5.0));
        for i in 0..records {
            let x = -0.75 + i as f32 * 0.25;
            w.record(flags, Vec3::new(0.0, 0.0, -1.0), Vec3::new(x, 1.0, 5.0), Vec3::new(x, -1.0, 5.0));
        }
        w.end();
        w.into_words()
    }

    #[test]
    fn test_full_quad_pool_stops_walk() {
        let mut fx = Fixture::new();
        fx.arena = FrameArena::new(1000, 1);
        fx.mem.poly.set_rom(strip(8));
        fx.ctx().push_object(TEX, 0, 0);
        assert_eq!(fx.arena.quads().len(), 1);
        assert_eq!(fx.arena.take_dropped(), 1);
        // Seeds plus the two records that were reached
        assert_eq!(fx.arena.point_count(), 6);
    }

    #[test]
    fn test_full_quad_pool_ends_direct_stream() {
        let rec = |x: f32| DirectRecord {
            flags: PolyFlags::record(1, 2).bits(),
            luminance: 0xff,
            p0: Vec3::new(x, 10.0, 10.0),
            z: 10.0,
            p1: Vec3::new(x, -10.0, 10.0),
        };
        let mut w = ListWriter::new();
        w.draw_direct(TEX, [Vec3::new(-10.0, 10.0, 10.0), Vec3::new(-10.0, -10.0, 10.0)], &[rec(0.0), rec(5.0), rec(10.0)]);
        w.end();
        let words = w.into_words();
        let list = ListReader::new(&words);

        let mut fx = Fixture::new();
        fx.view.set_zoom(4.0, 4.0);
        fx.arena = FrameArena::new(1000, 1);
        let next = fx.ctx().push_direct(&list, 0);
        assert_eq!(next, skip_direct(&list, 0));
        assert_eq!(fx.arena.quads().len(), 1);
        assert_eq!(fx.arena.take_dropped(), 1);
        assert_eq!(fx.arena.point_count(), 6);
    }

    fn direct_stream() -> Vec<u16> {
        let rec = DirectRecord {
            flags: PolyFlags::record(1, 2).bits(),
            luminance: 0xff,
            p0: Vec3::new(10.0, 10.0, 10.0),
            z: 10.0,
            p1: Vec3::new(10.0, -10.0, 10.0),
        };
        let tri = DirectRecord {
            flags: PolyFlags::record(2, 1).bits(),
            luminance: 0x80,
            p0: Vec3::new(20.0, 0.0, 10.0),
            ..rec
        };
        let mut w = ListWriter::new();
        w.draw_direct(TEX, [Vec3::new(-10.0, 10.0, 10.0), Vec3::new(-10.0, -10.0, 10.0)], &[rec, tri]);
        w.end();
        w.into_words()
    }

    #[test]
    fn test_direct_stream() {
        let words = direct_stream();
        let list = ListReader::new(&words);
        let mut fx = Fixture::new();
        // Direct points are clipped against the same frustum; widen it
        fx.view.set_zoom(4.0, 4.0);
        let next = fx.ctx().push_direct(&list, 0);

        assert_eq!(next, 20 + 20 + 12 + 2);
        assert_eq!(next, skip_direct(&list, 0));
        assert_eq!(list.readi(next), 0x0f);

        let quads = fx.arena.quads();
        assert_eq!(quads.len(), 2);
        assert_eq!(quads[0].color, Color::WHITE);
        // Direct projection: no divide
        let s: Vec<_> = quads[0].p.iter().map(|&id| fx.arena.point(id).s).collect();
        assert_eq!((s[0].x, s[0].y), (118, 138));
        assert_eq!((s[2].x, s[2].y), (138, 118));
        // Type 2 duplicates its single point
        let t: Vec<_> = quads[1].p.iter().map(|&id| fx.arena.point(id).s).collect();
        assert_eq!(t[2], t[3]);
        assert_eq!(t[2].x, 148);
        assert_eq!(quads[1].z, 10.0);
    }

    #[test]
    fn test_direct_skips_back_face_test() {
        let rec = DirectRecord {
            flags: PolyFlags::record(1, 2).bits(),
            luminance: 0xff,
            p0: Vec3::new(10.0, -10.0, 10.0),
            z: 10.0,
            p1: Vec3::new(10.0, 10.0, 10.0),
        };
        let mut w = ListWriter::new();
        w.draw_direct(TEX, [Vec3::new(-10.0, -10.0, 10.0), Vec3::new(-10.0, 10.0, 10.0)], &[rec]);
        let words = w.into_words();
        let mut fx = Fixture::new();
        fx.view.set_zoom(4.0, 4.0);
        fx.ctx().push_direct(&ListReader::new(&words), 0);
        assert_eq!(fx.arena.quads().len(), 1);
    }
}
