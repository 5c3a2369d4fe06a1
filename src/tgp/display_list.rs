//! Double-buffered display lists, the list control register and an encoder
//!
//! Lists are streams of 16-bit words. 32-bit values are stored low word
//! first and floats are their IEEE bit patterns. Every read wraps at the
//! buffer size, so a runaway offset can never index out of bounds.

use bitflags::bitflags;
use log::debug;

use crate::config::MODEL1_VIEWPORT_Y_BASE;
use crate::rasterizer::{Transform, Vec3};

use super::opcode::Opcode;
use super::view::LightParams;

/// Words per display-list buffer
pub const LIST_WORDS: usize = 0x8000;

const LIST_MASK: usize = LIST_WORDS - 1;

/// Both list buffers
pub struct DisplayLists {
    buffers: [Vec<u16>; 2],
}

impl DisplayLists {
    pub fn new() -> Self {
        Self {
            buffers: [vec![0; LIST_WORDS], vec![0; LIST_WORDS]],
        }
    }

    pub fn buffer(&self, index: usize) -> &[u16] {
        &self.buffers[index & 1]
    }

    /// Copy `words` into a buffer starting at word `offset`, wrapping
    pub fn write(&mut self, index: usize, offset: usize, words: &[u16]) {
        let buf = &mut self.buffers[index & 1];
        for (i, &w) in words.iter().enumerate() {
            buf[(offset + i) & LIST_MASK] = w;
        }
    }

    pub fn reader(&self, index: usize) -> ListReader<'_> {
        ListReader::new(self.buffer(index))
    }
}

impl Default for DisplayLists {
    fn default() -> Self {
        Self::new()
    }
}

/// Typed reads from one list buffer
#[derive(Clone, Copy)]
pub struct ListReader<'a> {
    words: &'a [u16],
}

impl<'a> ListReader<'a> {
    pub fn new(words: &'a [u16]) -> Self {
        Self { words }
    }

    fn word(&self, offset: usize) -> u16 {
        if self.words.is_empty() {
            return 0;
        }
        self.words[(offset & LIST_MASK) % self.words.len()]
    }

    pub fn readi(&self, offset: usize) -> u32 {
        self.word(offset) as u32 | (self.word(offset + 1) as u32) << 16
    }

    pub fn readi16(&self, offset: usize) -> i16 {
        self.word(offset) as i16
    }

    pub fn readf(&self, offset: usize) -> f32 {
        f32::from_bits(self.readi(offset))
    }

    /// Three consecutive floats
    pub fn read_vec3(&self, offset: usize) -> Vec3 {
        Vec3::new(self.readf(offset), self.readf(offset + 2), self.readf(offset + 4))
    }

    /// Upload payload length, capped so garbage can not stall the walk
    pub fn read_len(&self, offset: usize, bias: i32) -> usize {
        let len = (self.readi(offset) as i32).wrapping_add(bias);
        len.clamp(0, LIST_WORDS as i32) as usize
    }
}

bitflags! {
    /// Bits of control word 0
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControlFlags: u16 {
        /// Flip the current buffer at every frame boundary
        const AUTO_TOGGLE = 0x04;
        /// Host buffer choice when not toggling
        const HOST_SELECT = 0x08;
        /// Hardware status, always reads as set
        const STATUS = 0x30;
        /// Buffer being rendered
        const CURRENT = 0x40;
    }
}

/// Control word 1 value that enables list processing
pub const LIST_ENABLE: u16 = 0x1f;

/// The two host-visible list control words
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListControl {
    words: [u16; 2],
}

impl ListControl {
    pub fn read(&self, offset: usize) -> u16 {
        if offset & 1 == 0 {
            self.words[0] | ControlFlags::STATUS.bits()
        } else {
            self.words[1]
        }
    }

    /// Masked write; only bits set in `mask` change
    pub fn write(&mut self, offset: usize, data: u16, mask: u16) {
        let w = &mut self.words[offset & 1];
        *w = (*w & !mask) | (data & mask);
        debug!("list control = {:04x}{:04x}", self.words[1], self.words[0]);
    }

    fn flags(&self) -> ControlFlags {
        ControlFlags::from_bits_retain(self.words[0])
    }

    pub fn enabled(&self) -> bool {
        self.words[1] & LIST_ENABLE == LIST_ENABLE
    }

    pub fn auto_toggle(&self) -> bool {
        self.flags().contains(ControlFlags::AUTO_TOGGLE)
    }

    /// Latch the host select into the current bit (when not toggling) and
    /// return the buffer to render
    pub fn sync_current(&mut self) -> usize {
        let mut flags = self.flags();
        if !flags.contains(ControlFlags::AUTO_TOGGLE) {
            flags.set(ControlFlags::CURRENT, flags.contains(ControlFlags::HOST_SELECT));
            self.words[0] = flags.bits();
        }
        self.current()
    }

    pub fn current(&self) -> usize {
        self.flags().contains(ControlFlags::CURRENT) as usize
    }

    /// Buffer that becomes current after the next frame boundary
    pub fn pending(&mut self) -> usize {
        let current = self.sync_current();
        if self.auto_toggle() {
            current ^ 1
        } else {
            current
        }
    }

    /// Frame boundary
    pub fn end_frame(&mut self) {
        if self.auto_toggle() {
            self.words[0] ^= ControlFlags::CURRENT.bits();
        }
    }
}

/// One direct-mode record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectRecord {
    /// Same layout as object-mode flags; type 2 records carry a single point
    pub flags: u32,
    /// Top byte of the luminance word
    pub luminance: u8,
    pub p0: Vec3,
    /// Sort depth, ignored for type 2
    pub z: f32,
    pub p1: Vec3,
}

/// Encoder producing display-list words
pub struct ListWriter {
    words: Vec<u16>,
    y_base: i32,
}

impl ListWriter {
    pub fn new() -> Self {
        Self::with_y_base(MODEL1_VIEWPORT_Y_BASE)
    }

    /// Encoder whose viewport y fields use a different base
    pub fn with_y_base(y_base: i32) -> Self {
        Self { words: Vec::new(), y_base }
    }

    pub fn words(&self) -> &[u16] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn into_words(self) -> Vec<u16> {
        self.words
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }

    fn dword(&mut self, v: u32) -> &mut Self {
        self.words.push(v as u16);
        self.words.push((v >> 16) as u16);
        self
    }

    fn float(&mut self, f: f32) -> &mut Self {
        self.dword(f.to_bits())
    }

    fn vec3(&mut self, v: Vec3) -> &mut Self {
        self.float(v.x).float(v.y).float(v.z)
    }

    fn op(&mut self, op: Opcode) -> &mut Self {
        self.dword(op.code())
    }

    /// Append arbitrary words
    pub fn raw(&mut self, words: &[u16]) -> &mut Self {
        self.words.extend_from_slice(words);
        self
    }

    pub fn nop(&mut self) -> &mut Self {
        self.op(Opcode::Nop)
    }

    pub fn draw_object(&mut self, tex: u32, poly_addr: u32, count: u32) -> &mut Self {
        self.op(Opcode::DrawObject).dword(tex).dword(poly_addr).dword(count)
    }

    pub fn draw_direct(&mut self, tex: u32, seeds: [Vec3; 2], records: &[DirectRecord]) -> &mut Self {
        self.op(Opcode::DrawDirect).dword(tex).dword(0);
        self.vec3(seeds[0]).dword(0).vec3(seeds[1]);
        for r in records {
            self.dword(r.flags).dword((r.luminance as u32) << 24).dword(0).vec3(r.p0);
            if r.flags & 3 != 2 {
                self.float(r.z).vec3(r.p1);
            }
        }
        self.dword(0)
    }

    /// Viewport in screen pixels; y fields are stored relative to the base
    pub fn set_viewport(&mut self, xc: i16, yc: i16, x1: i16, x2: i16, y1: i16, y2: i16) -> &mut Self {
        let y = |v: i16| (self.y_base - v as i32) as u16 as u32;
        let (yc, y1, y2) = (y(yc), y(y1), y(y2));
        self.op(Opcode::SetViewport).dword(0);
        for v in [xc as u16 as u32, yc, x1 as u16 as u32, y2, x2 as u16 as u32, y1] {
            self.dword(v);
        }
        self
    }

    pub fn upload_color(&mut self, addr: u32, data: &[u16]) -> &mut Self {
        self.op(Opcode::UploadColor)
            .dword(addr)
            .dword((data.len() as u32).wrapping_sub(1));
        for &v in data {
            self.dword(v as u32);
        }
        self
    }

    pub fn upload_poly(&mut self, addr: u32, data: &[u32]) -> &mut Self {
        self.op(Opcode::UploadPoly).dword(addr).dword(data.len() as u32);
        for &v in data {
            self.dword(v);
        }
        self
    }

    pub fn upload_light(&mut self, index: u32, params: &[LightParams]) -> &mut Self {
        self.op(Opcode::UploadLight).dword(index).dword(params.len() as u32);
        for p in params {
            self.dword(p.to_packed());
        }
        self
    }

    pub fn counter_inc(&mut self, value: u32) -> &mut Self {
        self.op(Opcode::CounterInc).dword(value)
    }

    pub fn select_mode(&mut self, mode: u32) -> &mut Self {
        self.op(Opcode::SelectMode).dword(mode)
    }

    /// Raw zoom values; the interpreter multiplies them by 4
    pub fn set_zoom(&mut self, x: f32, y: f32) -> &mut Self {
        self.op(Opcode::SetZoom).float(x).float(y)
    }

    pub fn set_light_dir(&mut self, dir: Vec3) -> &mut Self {
        self.op(Opcode::SetLightDir).vec3(dir)
    }

    pub fn set_matrix(&mut self, transform: &Transform) -> &mut Self {
        self.op(Opcode::SetMatrix);
        for &m in &transform.m {
            self.float(m);
        }
        self
    }

    pub fn set_translation(&mut self, x: f32, y: f32) -> &mut Self {
        self.op(Opcode::SetTranslation).float(x).float(y)
    }

    pub fn end(&mut self) -> &mut Self {
        self.op(Opcode::End)
    }
}

impl Default for ListWriter {
    fn default() -> Self {
        Self::new()
    }
}
