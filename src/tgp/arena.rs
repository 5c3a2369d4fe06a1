//! Frame-scoped point and quad storage
//!
//! Both pools have a hard capacity. When a pool is full the allocation is
//! rejected: the caller drops the primitive it was building and the arena
//! counts the loss. Nothing is ever written past the bound.

use log::warn;

use super::primitives::{Point, PointId, Quad};

/// Pool exhausted; carries which pool ran out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaFull {
    Points,
    Quads,
}

pub struct FrameArena {
    points: Vec<Point>,
    quads: Vec<Quad>,
    point_capacity: usize,
    quad_capacity: usize,
    next_seq: u32,
    dropped: usize,
    warned: bool,
}

impl FrameArena {
    pub fn new(point_capacity: usize, quad_capacity: usize) -> Self {
        Self {
            // Grow on demand up to the capacity instead of reserving the worst case
            points: Vec::with_capacity(point_capacity.min(4096)),
            quads: Vec::with_capacity(quad_capacity.min(2048)),
            point_capacity,
            quad_capacity,
            next_seq: 0,
            dropped: 0,
            warned: false,
        }
    }

    /// Forget everything from the previous batch
    pub fn reset(&mut self) {
        self.points.clear();
        self.quads.clear();
        self.next_seq = 0;
        self.warned = false;
    }

    pub fn alloc_point(&mut self, point: Point) -> Result<PointId, ArenaFull> {
        if self.points.len() >= self.point_capacity {
            self.note_drop(ArenaFull::Points);
            return Err(ArenaFull::Points);
        }
        let id = PointId(self.points.len() as u32);
        self.points.push(point);
        Ok(id)
    }

    pub fn push_quad(&mut self, mut quad: Quad) -> Result<(), ArenaFull> {
        if self.quads.len() >= self.quad_capacity {
            self.note_drop(ArenaFull::Quads);
            return Err(ArenaFull::Quads);
        }
        quad.seq = self.next_seq;
        self.next_seq += 1;
        self.quads.push(quad);
        Ok(())
    }

    fn note_drop(&mut self, which: ArenaFull) {
        self.dropped += 1;
        if !self.warned {
            self.warned = true;
            warn!(
                "frame arena full ({:?}: {} points, {} quads), dropping geometry",
                which,
                self.points.len(),
                self.quads.len()
            );
        }
    }

    pub fn point(&self, id: PointId) -> &Point {
        &self.points[id.0 as usize]
    }

    pub fn quads(&self) -> &[Quad] {
        &self.quads
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn quad_count(&self) -> usize {
        self.quads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    /// Allocations rejected since the counter was last taken
    pub fn take_dropped(&mut self) -> usize {
        std::mem::take(&mut self.dropped)
    }
}
