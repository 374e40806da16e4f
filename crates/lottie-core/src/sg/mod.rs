//! Retained scene graph.
//!
//! Nodes are shared through `Rc` and mutated in place by animators via
//! interior mutability. Every mutation marks the node dirty; the next
//! revalidation pass recomputes cached geometry, and [`Draw`] nodes whose
//! inputs changed report their old and new bounds as damage.
//!
//! A node may be reachable from several parents (a path feeding both a fill
//! and a stroke, a matrix shared by sibling layers). Revalidation is
//! stamped per pass so shared nodes are recomputed once and report the same
//! answer to every parent.

use std::cell::{Cell, RefCell};

use kurbo::{BezPath, Rect};

pub mod canvas;
pub mod geometry;
pub mod image;
pub mod matrix;
pub mod paint;
pub mod path_ops;
pub mod recording;
pub mod render;
pub mod scene;

pub use canvas::{
    BlendMode, Canvas, FillType, GradientStop, LayerPaint, LineCap, LineJoin, Paint, PaintStyle,
    PathOp, Shader, Stroke,
};
pub use geometry::{
    GeometryNode, GeometryTransform, Merge, MergeMode, Path, RRect, RectGeometry, RoundEffect,
    TrimEffect, TrimMode,
};
pub use image::ImageData;
pub use matrix::Matrix;
pub use paint::PaintNode;
pub use render::{ClipEffect, Draw, Group, Image, MaskEffect, MaskMode, OpacityEffect, RenderNode, Transform};
pub use scene::Scene;

#[derive(Debug)]
pub struct NodeState {
    dirty: Cell<bool>,
    stamp: Cell<u64>,
    changed_at: Cell<u64>,
}

impl Default for NodeState {
    fn default() -> Self {
        Self {
            dirty: Cell::new(true),
            stamp: Cell::new(0),
            changed_at: Cell::new(0),
        }
    }
}

impl NodeState {
    pub fn invalidate(&self) {
        self.dirty.set(true);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Runs `update` at most once per pass. `update` receives the dirty flag
    /// and returns whether the node's output changed.
    pub fn revalidate(&self, pass: u64, update: impl FnOnce(bool) -> bool) -> bool {
        if self.stamp.get() == pass {
            return self.changed_at.get() == pass;
        }
        self.stamp.set(pass);
        let changed = update(self.dirty.replace(false));
        if changed {
            self.changed_at.set(pass);
        }
        changed
    }
}

pub struct RevalidationContext<'a> {
    pub pass: u64,
    canvas: &'a dyn Canvas,
    damage: RefCell<Vec<Rect>>,
}

impl<'a> RevalidationContext<'a> {
    pub fn new(pass: u64, canvas: &'a dyn Canvas) -> Self {
        Self {
            pass,
            canvas,
            damage: RefCell::new(Vec::new()),
        }
    }

    pub fn path_op(&self, a: &BezPath, b: &BezPath, op: PathOp) -> Option<BezPath> {
        self.canvas.path_op(a, b, op)
    }

    pub fn add_damage(&self, rect: Rect) {
        if rect.area() > 0.0 {
            self.damage.borrow_mut().push(rect);
        }
    }

    pub fn into_damage(self) -> Vec<Rect> {
        self.damage.into_inner()
    }
}

/// Union that treats empty rectangles as absent.
pub fn union_bounds(acc: Rect, r: Rect) -> Rect {
    if r.area() <= 0.0 {
        acc
    } else if acc.area() <= 0.0 {
        r
    } else {
        acc.union(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revalidate_once_per_pass() {
        let state = NodeState::default();
        let mut calls = 0;
        assert!(state.revalidate(1, |dirty| {
            calls += 1;
            dirty
        }));
        assert!(state.revalidate(1, |_| unreachable!()));
        assert_eq!(calls, 1);
        assert!(!state.revalidate(2, |dirty| dirty));

        state.invalidate();
        assert!(state.revalidate(3, |dirty| dirty));
    }

    #[test]
    fn test_union_ignores_empty() {
        let r = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert_eq!(union_bounds(Rect::ZERO, r), r);
        assert_eq!(union_bounds(r, Rect::ZERO), r);
    }
}
