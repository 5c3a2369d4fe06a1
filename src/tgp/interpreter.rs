//! Display-list walker
//!
//! `render` executes every record of the current list. `scan` walks the list
//! that becomes current at the next frame boundary and only applies its
//! uploads, so frames the host skipped still leave memory in the right state.

use log::{debug, trace};

use crate::config::RenderConfig;
use crate::rasterizer::{draw_line_aa, fill_quad, ClipRect, Framebuffer, Transform};

use super::arena::FrameArena;
use super::display_list::{ListReader, LIST_WORDS};
use super::geometry::{skip_direct, GeometryContext};
use super::memory::{Memories, POLY_RAM_BANK};
use super::opcode::Opcode;
use super::sort::sort_quads;
use super::view::{LightParams, View};
use super::{FrameStats, Tgp};

/// A full pass over a list of the smallest records
const MAX_RECORDS: usize = LIST_WORDS / 2;

/// Zoom words are stored at a quarter of the pixel scale
const ZOOM_SCALE: f32 = 4.0;

impl Tgp {
    /// Execute the current display list into `fb`
    pub fn render(&mut self, fb: &mut Framebuffer, clip: ClipRect) {
        self.render_done = true;
        self.stats = FrameStats::default();
        if !self.control.enabled() {
            return;
        }

        let index = self.control.sync_current();
        debug!("render list {}", index);
        self.view.reset_transform();

        let Tgp {
            config,
            view,
            arena,
            mem,
            lists,
            counter,
            stats,
            ..
        } = self;
        let list = lists.reader(index);
        let clip = clip.intersect(fb.bounds());
        let mut offset = 0;

        for _ in 0..MAX_RECORDS {
            let code = list.readi(offset);
            let Some(op) = Opcode::decode(code) else {
                debug!("unknown opcode {:x} at {:x}", code, offset);
                break;
            };
            trace!("{:?} at {:x}", op, offset);
            stats.records += 1;

            match op {
                Opcode::Nop => offset += 2,
                Opcode::DrawObject => {
                    let (tex, poly, size) = (list.readi(offset + 2), list.readi(offset + 4), list.readi(offset + 6));
                    GeometryContext {
                        view: &*view,
                        arena: &mut *arena,
                        mem: &*mem,
                    }
                    .push_object(tex, poly, size);
                    offset += 8;
                }
                Opcode::DrawDirect => {
                    flush(config, view, arena, fb, clip, stats, true);
                    offset = GeometryContext {
                        view: &*view,
                        arena: &mut *arena,
                        mem: &*mem,
                    }
                    .push_direct(&list, offset);
                    flush(config, view, arena, fb, clip, stats, false);
                }
                Opcode::SetViewport => {
                    flush(config, view, arena, fb, clip, stats, true);
                    set_viewport(config, view, &list, offset);
                    offset += 16;
                }
                Opcode::UploadColor => offset = upload_color(&list, offset, mem),
                Opcode::UploadPoly => offset = upload_poly(&list, offset, mem),
                Opcode::UploadLight => offset = upload_light(&list, offset, view),
                Opcode::CounterInc => {
                    *counter = counter.wrapping_add(1);
                    offset += 4;
                }
                Opcode::SelectMode => {
                    debug!("select mode {:08x}", list.readi(offset + 2));
                    offset += 4;
                }
                Opcode::SetZoom => {
                    view.set_zoom(
                        list.readf(offset + 2) * ZOOM_SCALE * config.scale_x,
                        list.readf(offset + 4) * ZOOM_SCALE * config.scale_y,
                    );
                    offset += 6;
                }
                Opcode::SetLightDir => {
                    view.set_light_direction(list.read_vec3(offset + 2));
                    offset += 8;
                }
                Opcode::SetMatrix => {
                    view.transform = Transform::new(std::array::from_fn(|i| list.readf(offset + 2 + 2 * i)));
                    offset += 26;
                }
                Opcode::SetTranslation => {
                    view.set_view_translation(
                        list.readf(offset + 2) * config.scale_x,
                        list.readf(offset + 4) * config.scale_y,
                    );
                    offset += 6;
                }
                Opcode::End => break,
            }
        }

        flush(config, view, arena, fb, clip, stats, true);
    }

    /// Apply only the uploads of the list that becomes current next frame.
    /// Does nothing if a render already ran since the last frame boundary.
    pub fn scan(&mut self) {
        if !self.render_done && self.control.enabled() {
            let index = self.control.pending();
            debug!("scan list {}", index);

            let Tgp { view, mem, lists, .. } = self;
            let list = lists.reader(index);
            let mut offset = 0;

            for _ in 0..MAX_RECORDS {
                let code = list.readi(offset);
                let Some(op) = Opcode::decode(code) else {
                    debug!("unknown opcode {:x} at {:x} during scan", code, offset);
                    break;
                };
                offset = match op {
                    Opcode::End => break,
                    Opcode::DrawDirect => skip_direct(&list, offset),
                    Opcode::UploadColor => upload_color(&list, offset, mem),
                    Opcode::UploadPoly => upload_poly(&list, offset, mem),
                    Opcode::UploadLight => upload_light(&list, offset, view),
                    other => offset + other.fixed_len().unwrap_or(2),
                };
            }
        }
        self.render_done = false;
    }
}

/// Sort (or keep insertion order) and rasterize everything queued, then
/// reset the arena
fn flush(
    config: &RenderConfig,
    view: &View,
    arena: &mut FrameArena,
    fb: &mut Framebuffer,
    clip: ClipRect,
    stats: &mut FrameStats,
    sorted: bool,
) {
    if !arena.is_empty() {
        let order: Vec<usize> = if sorted {
            sort_quads(arena.quads())
        } else {
            (0..arena.quad_count()).collect()
        };
        let clip = view.viewport().intersect(clip);
        debug!("draw batch: {} quads, {} points, sorted {}", order.len(), arena.point_count(), sorted);

        for &i in &order {
            let q = arena.quads()[i];
            let pts = q.p.map(|id| arena.point(id).s);
            if config.wireframe {
                fill_quad(fb, clip, pts, config.wireframe_fill);
                for e in 0..4 {
                    draw_line_aa(fb, clip, q.color, pts[e], pts[(e + 1) & 3]);
                }
            } else {
                fill_quad(fb, clip, pts, q.color);
            }
        }

        stats.quads += order.len();
        stats.batches += 1;
    }

    stats.points += arena.point_count();
    stats.dropped += arena.take_dropped();
    arena.reset();
}

/// Decode SET_VIEWPORT, scaling by the render scale. Upper bounds are scaled
/// as the last pixel of the scaled cell.
fn set_viewport(config: &RenderConfig, view: &mut View, list: &ListReader<'_>, offset: usize) {
    let field = |o: usize| list.readi16(offset + o) as i32;
    let base = config.viewport_y_base;

    let xc = field(4);
    let yc = base - field(6);
    let x1 = field(8);
    let y2 = base - field(10);
    let x2 = field(12);
    let y1 = base - field(14);
    debug!("viewport (xc {}, yc {}, x {}..{}, y {}..{})", xc, yc, x1, x2, y1, y2);

    let (sx, sy) = (config.scale_x, config.scale_y);
    let lo = |v: i32, s: f32| (v as f32 * s) as i32;
    let hi = |v: i32, s: f32| ((v + 1) as f32 * s) as i32 - 1;
    view.set_viewport(
        xc as f32 * sx,
        yc as f32 * sy,
        lo(x1, sx),
        hi(x2, sx),
        lo(y1, sy),
        hi(y2, sy),
    );
}

fn upload_color(list: &ListReader<'_>, offset: usize, mem: &mut Memories) -> usize {
    let addr = list.readi(offset + 2);
    let len = list.read_len(offset + 4, 1);
    debug!("color upload {:x}, {} words", addr, len);
    for i in 0..len {
        mem.texram
            .write(addr.wrapping_add(i as u32), list.readi16(offset + 6 + 2 * i) as u16);
    }
    offset + 6 + len * 2
}

fn upload_poly(list: &ListReader<'_>, offset: usize, mem: &mut Memories) -> usize {
    let addr = list.readi(offset + 2).wrapping_sub(POLY_RAM_BANK);
    let len = list.read_len(offset + 4, 0);
    debug!("poly upload {:x}, {} dwords", addr, len);
    for i in 0..len {
        mem.poly
            .write_ram(addr.wrapping_add(i as u32), list.readi(offset + 6 + 2 * i));
    }
    offset + 6 + len * 2
}

fn upload_light(list: &ListReader<'_>, offset: usize, view: &mut View) -> usize {
    let index = list.readi(offset + 2) as usize;
    let len = list.read_len(offset + 4, 0);
    debug!("light upload {}, {} modes", index, len);
    for i in 0..len {
        let packed = list.readi(offset + 6 + 2 * i);
        view.set_light_params(index.wrapping_add(i), LightParams::from_packed(packed));
    }
    offset + 6 + len * 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::{Color, Vec3};
    use crate::tgp::display_list::ListWriter;
    use crate::tgp::memory::TEXRAM_BASE;

    fn enabled_tgp() -> Tgp {
        let mut tgp = Tgp::new(RenderConfig::default());
        tgp.write_control(1, 0x1f, 0xffff);
        tgp
    }

    #[test]
    fn test_disabled_list_does_nothing() {
        let mut tgp = Tgp::new(RenderConfig::default());
        let mut w = ListWriter::new();
        w.counter_inc(0).end();
        tgp.write_list(0, 0, w.words());
        let mut fb = Framebuffer::new(64, 64);
        let clip = fb.bounds();
        tgp.render(&mut fb, clip);
        assert_eq!(tgp.counter(), 0);
    }

    #[test]
    fn test_state_opcodes() {
        let mut tgp = enabled_tgp();
        let m = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 3.0, 4.0, 5.0];
        let mut w = ListWriter::new();
        w.nop()
            .set_zoom(2.0, 3.0)
            .set_translation(5.0, -6.0)
            .set_light_dir(Vec3::new(0.0, 3.0, 4.0))
            .set_matrix(&Transform::new(m))
            .select_mode(1)
            .counter_inc(0)
            .counter_inc(0)
            .end();
        tgp.write_list(0, 0, w.words());
        let mut fb = Framebuffer::new(64, 64);
        let clip = fb.bounds();
        tgp.render(&mut fb, clip);

        let view = tgp.view();
        assert_eq!((view.zoom_x, view.zoom_y), (8.0, 12.0));
        assert_eq!((view.view_x, view.view_y), (5.0, -6.0));
        assert!((view.light.y - 0.6).abs() < 1e-6);
        assert_eq!(view.transform.m, m);
        assert_eq!(tgp.counter(), 2);
        assert_eq!(tgp.last_stats().records, 9);
    }

    #[test]
    fn test_transform_reset_each_render() {
        let mut tgp = enabled_tgp();
        tgp.view_mut().transform = Transform::new([2.0; 12]);
        let mut w = ListWriter::new();
        w.end();
        tgp.write_list(0, 0, w.words());
        let mut fb = Framebuffer::new(8, 8);
        let clip = fb.bounds();
        tgp.render(&mut fb, clip);
        assert_eq!(tgp.view().transform, Transform::IDENTITY);
    }

    #[test]
    fn test_viewport_decode_and_scale() {
        let mut tgp = Tgp::new(RenderConfig {
            scale_x: 2.0,
            scale_y: 2.0,
            ..RenderConfig::default()
        });
        tgp.write_control(1, 0x1f, 0xffff);
        let mut w = ListWriter::new();
        w.set_viewport(100, 80, 10, 200, 20, 150).end();
        tgp.write_list(0, 0, w.words());
        let mut fb = Framebuffer::new(8, 8);
        let clip = fb.bounds();
        tgp.render(&mut fb, clip);

        let view = tgp.view();
        assert_eq!((view.xc, view.yc), (200.0, 160.0));
        assert_eq!(view.viewport(), ClipRect::new(20, 40, 401, 301));
    }

    #[test]
    fn test_uploads() {
        let mut tgp = enabled_tgp();
        let lp = LightParams { diffuse: 1.0, ambient: 0.0, specular: 0.0, power: 9 };
        let mut w = ListWriter::new();
        w.upload_color(TEXRAM_BASE + 10, &[0x111, 0x222])
            .upload_poly(POLY_RAM_BANK + 4, &[0xdead, 0xbeef])
            .upload_light(2, &[lp, lp])
            .end();
        tgp.write_list(0, 0, w.words());
        let mut fb = Framebuffer::new(8, 8);
        let clip = fb.bounds();
        tgp.render(&mut fb, clip);

        let mem = tgp.memories();
        assert_eq!(mem.texram.read(TEXRAM_BASE + 11), 0x222);
        assert_eq!(mem.poly.read(POLY_RAM_BANK | 5), 0xbeef);
        assert_eq!(tgp.view().light_params(3).power, 9);
        assert_eq!(tgp.view().light_params(4).power, 0);
    }

    #[test]
    fn test_scan_applies_uploads_only() {
        let mut tgp = enabled_tgp();
        let mut w = ListWriter::new();
        w.set_zoom(9.0, 9.0)
            .draw_direct(TEXRAM_BASE, [Vec3::ZERO; 2], &[])
            .counter_inc(0)
            .upload_color(TEXRAM_BASE, &[0x3ff])
            .end();
        tgp.write_list(0, 0, w.words());
        tgp.scan();

        assert_eq!(tgp.memories().texram.read(TEXRAM_BASE), 0x3ff);
        assert_eq!(tgp.view().zoom_x, 1.0);
        assert_eq!(tgp.counter(), 0);
    }

    #[test]
    fn test_scan_skipped_after_render() {
        let mut tgp = enabled_tgp();
        let mut fb = Framebuffer::new(8, 8);
        let clip = fb.bounds();
        tgp.write_list(0, 0, ListWriter::new().end().words());
        tgp.render(&mut fb, clip);

        let mut w = ListWriter::new();
        w.upload_color(TEXRAM_BASE, &[7]).end();
        tgp.write_list(0, 0, w.words());
        tgp.scan();
        assert_eq!(tgp.memories().texram.read(TEXRAM_BASE), 0);
        // The flag is consumed; the next scan runs
        tgp.scan();
        assert_eq!(tgp.memories().texram.read(TEXRAM_BASE), 7);
    }

    #[test]
    fn test_wireframe_outlines_over_backdrop() {
        let mut tgp = enabled_tgp();
        tgp.set_wireframe(true);
        {
            let mem = tgp.memories_mut();
            mem.tables = crate::tgp::lighting::ColorTables::linear();
            mem.texram.write(TEXRAM_BASE, 1);
            mem.palette.set(0x1001, 0x001f);
        }
        let rec = crate::tgp::display_list::DirectRecord {
            flags: 0x201,
            luminance: 0xff,
            p0: Vec3::new(10.0, 10.0, 10.0),
            z: 10.0,
            p1: Vec3::new(10.0, -10.0, 10.0),
        };
        let mut w = ListWriter::new();
        w.set_viewport(32, 32, 0, 63, 0, 63)
            .set_zoom(1.0, 1.0)
            .draw_direct(TEXRAM_BASE, [Vec3::new(-10.0, 10.0, 10.0), Vec3::new(-10.0, -10.0, 10.0)], &[rec])
            .end();
        tgp.write_list(0, 0, w.words());
        let mut fb = Framebuffer::new(64, 64);
        fb.clear(Color::WHITE);
        let clip = fb.bounds();
        tgp.render(&mut fb, clip);

        // Interior gets the backdrop, the edge gets the quad color
        assert_eq!(fb.get_pixel(32, 32), Color::BLACK.rgb());
        assert_eq!(fb.get_pixel(32, 22) & 0xff_00_00, 0xff_00_00);
        assert_eq!(fb.get_pixel(2, 2), Color::WHITE.rgb());
    }
}
