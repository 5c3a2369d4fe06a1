//! Model 1 geometry coprocessor
//!
//! `Tgp` owns everything the display list can touch: the view, the frame
//! arena, host memories and both list buffers. The host fills a list, flips
//! buffers through the control register and calls `render` once per frame.
//!
//! ```text
//! display list -> interpreter -> geometry -> clip -> arena -> sort -> fill
//!                      |                                   ^
//!                      +---- view / memories --------------+
//! ```

mod arena;
mod clip;
mod display_list;
mod geometry;
mod interpreter;
mod lighting;
mod memory;
mod opcode;
mod primitives;
mod sort;
mod view;

pub use arena::{ArenaFull, FrameArena};
pub use clip::{ClipStage, Clipper, CLIP_STAGES};
pub use display_list::{
    ControlFlags, DirectRecord, DisplayLists, ListControl, ListReader, ListWriter, LIST_ENABLE, LIST_WORDS,
};
pub use geometry::{skip_direct, GeometryContext, PolyFlags, PolyWriter, MAX_OBJECT_SIZE, NO_TEXTURE};
pub use lighting::{
    base_color, compute_specular, luma_from_direct, luma_from_intensity, luma_from_normal, Channel, ColorTables,
    COLOR_TABLE_ENTRIES, MAX_LUMA,
};
pub use memory::{
    Memories, Palette, PolygonMemory, TextureRam, PALETTE_ENTRIES, POLY_RAM_BANK, POLY_RAM_WORDS, TEXRAM_BASE,
    TEXRAM_WORDS,
};
pub use opcode::Opcode;
pub use primitives::{Point, PointId, Quad};
pub use sort::sort_quads;
pub use view::{Frustum, LightParams, View, LIGHT_MODES};

use crate::config::RenderConfig;
use crate::rasterizer::Vec3;

/// Counters from the most recent `render`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// List records executed, END included
    pub records: usize,
    /// Draw batches (sorted flushes plus direct batches) that had quads
    pub batches: usize,
    pub quads: usize,
    pub points: usize,
    /// Points or quads rejected by a full arena
    pub dropped: usize,
}

pub struct Tgp {
    config: RenderConfig,
    view: View,
    arena: FrameArena,
    mem: Memories,
    lists: DisplayLists,
    control: ListControl,
    counter: u32,
    render_done: bool,
    stats: FrameStats,
}

impl Tgp {
    pub fn new(config: RenderConfig) -> Self {
        let arena = FrameArena::new(config.point_capacity, config.quad_capacity);
        Self {
            config,
            view: View::new(),
            arena,
            mem: Memories::default(),
            lists: DisplayLists::new(),
            control: ListControl::default(),
            counter: 0,
            render_done: false,
            stats: FrameStats::default(),
        }
    }

    /// Frame boundary: flip buffers when auto-toggle is on
    pub fn end_frame(&mut self) {
        self.control.end_frame();
    }

    /// Vertical blank: pre-process uploads if this frame was not rendered,
    /// then cross the frame boundary
    pub fn vblank(&mut self) {
        self.scan();
        self.end_frame();
    }

    /// Copy words into a list buffer at `offset`
    pub fn write_list(&mut self, buffer: usize, offset: usize, words: &[u16]) {
        self.lists.write(buffer, offset, words);
    }

    pub fn read_control(&self, offset: usize) -> u16 {
        self.control.read(offset)
    }

    pub fn write_control(&mut self, offset: usize, data: u16, mask: u16) {
        self.control.write(offset, data, mask);
    }

    /// Buffer the next `render` will walk
    pub fn current_list(&self) -> usize {
        self.control.current()
    }

    pub fn memories(&self) -> &Memories {
        &self.mem
    }

    pub fn memories_mut(&mut self) -> &mut Memories {
        &mut self.mem
    }

    pub fn set_poly_rom(&mut self, rom: Vec<u32>) {
        self.mem.poly.set_rom(rom);
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut View {
        &mut self.view
    }

    /// Debug camera: offset added after the model transform, then yaw
    pub fn set_camera(&mut self, offset: Vec3, yaw: f32) {
        self.view.set_camera(offset, yaw);
    }

    pub fn set_wireframe(&mut self, on: bool) {
        self.config.wireframe = on;
    }

    pub fn wireframe(&self) -> bool {
        self.config.wireframe
    }

    /// COUNTER_INC executions since creation
    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn last_stats(&self) -> FrameStats {
        self.stats
    }
}

impl Default for Tgp {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}
