//! Four-plane frustum clipping with recursive quad splitting
//!
//! Stages run in a fixed order (bottom, top, left, right). Each stage splits
//! a straddling quad into at most two children and hands them to the next
//! stage, so recursion depth is bounded by the stage count. Quads that clear
//! every stage are appended to the frame arena.

use log::trace;

use super::arena::{ArenaFull, FrameArena};
use super::primitives::{Point, PointId, Quad};
use super::view::View;

/// One frustum half-space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipStage {
    Bottom,
    Top,
    Left,
    Right,
}

/// Stage order used by the pipeline
pub const CLIP_STAGES: [ClipStage; 4] = [
    ClipStage::Bottom,
    ClipStage::Top,
    ClipStage::Left,
    ClipStage::Right,
];

impl ClipStage {
    fn coefficient(self, view: &View) -> f32 {
        let f = view.frustum();
        match self {
            ClipStage::Bottom => f.bottom,
            ClipStage::Top => f.top,
            ClipStage::Left => f.left,
            ClipStage::Right => f.right,
        }
    }

    /// The coordinate this stage tests against `coefficient * z`
    fn coordinate(self, p: &Point) -> f32 {
        match self {
            ClipStage::Bottom | ClipStage::Top => p.pos.y,
            ClipStage::Left | ClipStage::Right => p.pos.x,
        }
    }

    /// True when `p` lies outside this half-space
    pub fn is_outside(self, view: &View, p: &Point) -> bool {
        let limit = p.pos.z * self.coefficient(view);
        let c = self.coordinate(p);
        match self {
            ClipStage::Bottom | ClipStage::Right => c > limit,
            ClipStage::Top | ClipStage::Left => c < limit,
        }
    }

    /// Point where the edge `p1`-`p2` crosses the plane, projected
    pub fn intersect(self, view: &View, p1: &Point, p2: &Point) -> Point {
        let a = self.coefficient(view);
        let (c1, c2) = (self.coordinate(p1), self.coordinate(p2));
        let t = (p2.pos.z * a - c2) / ((p2.pos.z - p1.pos.z) * a - (c2 - c1));

        let mut pt = Point {
            pos: p1.pos.mix(p2.pos, t),
            ..Default::default()
        };
        view.project_point(&mut pt);
        pt
    }
}

/// Clipping context for one batch
pub struct Clipper<'a> {
    pub view: &'a View,
    pub arena: &'a mut FrameArena,
}

impl<'a> Clipper<'a> {
    pub fn new(view: &'a View, arena: &'a mut FrameArena) -> Self {
        Self { view, arena }
    }

    /// Clip `quad` against every stage and store the survivors. Fails on
    /// the first allocation the arena rejects; survivors stored before it
    /// stay queued.
    pub fn push_quad(&mut self, quad: Quad) -> Result<(), ArenaFull> {
        self.push_at(0, quad)
    }

    fn split_point(&mut self, stage: ClipStage, a: PointId, b: PointId) -> Result<PointId, ArenaFull> {
        let pt = stage.intersect(self.view, self.arena.point(a), self.arena.point(b));
        self.arena.alloc_point(pt)
    }

    fn push_at(&mut self, level: usize, quad: Quad) -> Result<(), ArenaFull> {
        let Some(&stage) = CLIP_STAGES.get(level) else {
            return self.arena.push_quad(quad);
        };

        let out = quad.p.map(|id| stage.is_outside(self.view, self.arena.point(id)));
        trace!("clip {:?}: out {:?}", stage, out);

        if out.iter().all(|&o| !o) {
            return self.push_at(level + 1, quad);
        }
        if out.iter().all(|&o| o) {
            return Ok(());
        }

        // Rotate so vertex 0 is the first clipped one after an unclipped one
        let Some(first) = (0..4).find(|&i| out[i] && !out[(i + 3) & 3]) else {
            return Ok(());
        };
        let pt: [PointId; 4] = std::array::from_fn(|j| quad.p[(first + j) & 3]);
        let out: [bool; 4] = std::array::from_fn(|j| out[(first + j) & 3]);

        match (out[1], out[2]) {
            (true, true) => {
                // 0, 1, 2 out: one triangle left
                let i1 = self.split_point(stage, pt[2], pt[3])?;
                let i2 = self.split_point(stage, pt[3], pt[0])?;
                self.push_at(level + 1, quad.with_points([i1, pt[3], i2, i2]))
            }
            (true, false) => {
                // 0, 1 out: one quad left
                let i1 = self.split_point(stage, pt[1], pt[2])?;
                let i2 = self.split_point(stage, pt[3], pt[0])?;
                self.push_at(level + 1, quad.with_points([i1, pt[2], pt[3], i2]))
            }
            (false, true) => {
                // 0, 2 out (bow-tie input): two triangles
                let i1 = self.split_point(stage, pt[0], pt[1])?;
                let i2 = self.split_point(stage, pt[1], pt[2])?;
                self.push_at(level + 1, quad.with_points([i1, pt[1], i2, i2]))?;
                let i3 = self.split_point(stage, pt[2], pt[3])?;
                let i4 = self.split_point(stage, pt[3], pt[0])?;
                self.push_at(level + 1, quad.with_points([i3, pt[3], i4, i4]))
            }
            (false, false) => {
                // Only 0 out: pentagon, split into quad + triangle
                let i1 = self.split_point(stage, pt[0], pt[1])?;
                let i2 = self.split_point(stage, pt[3], pt[0])?;
                self.push_at(level + 1, quad.with_points([i1, pt[1], pt[2], pt[3]]))?;
                self.push_at(level + 1, quad.with_points([pt[3], i2, i1, i1]))
            }
        }
    }
}
