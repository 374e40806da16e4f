//! Geometry nodes: producers of paths, plus effects that derive a new path
//! from one or more child geometries.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use kurbo::{Affine, BezPath, Point, Rect, Shape, Size};
use tracing::debug;

use super::path_ops;
use super::{FillType, Matrix, NodeState, PathOp, RevalidationContext};

pub trait GeometryNode {
    /// Recomputes the cached path if needed; returns whether it changed.
    fn revalidate(&self, ctx: &RevalidationContext) -> bool;
    fn as_path(&self) -> BezPath;

    fn fill_type(&self) -> FillType {
        FillType::Winding
    }

    fn bounds(&self) -> Rect {
        self.as_path().bounding_box()
    }
}

/// Caches a derived path alongside the node state.
#[derive(Default)]
struct PathCache {
    state: NodeState,
    path: RefCell<BezPath>,
}

impl PathCache {
    fn revalidate(&self, pass: u64, inputs_changed: bool, rebuild: impl FnOnce() -> BezPath) -> bool {
        self.state.revalidate(pass, |dirty| {
            if dirty || inputs_changed {
                *self.path.borrow_mut() = rebuild();
                true
            } else {
                false
            }
        })
    }

    fn get(&self) -> BezPath {
        self.path.borrow().clone()
    }
}

#[derive(Default)]
pub struct Path {
    state: NodeState,
    path: RefCell<BezPath>,
    fill_type: Cell<FillType>,
}

impl Path {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn with_path(path: BezPath) -> Rc<Self> {
        let node = Self::new();
        node.set_path(path);
        node
    }

    pub fn set_path(&self, path: BezPath) {
        *self.path.borrow_mut() = path;
        self.state.invalidate();
    }

    pub fn set_fill_type(&self, fill: FillType) {
        self.fill_type.set(fill);
        self.state.invalidate();
    }
}

impl GeometryNode for Path {
    fn revalidate(&self, ctx: &RevalidationContext) -> bool {
        self.state.revalidate(ctx.pass, |dirty| dirty)
    }

    fn as_path(&self) -> BezPath {
        self.path.borrow().clone()
    }

    fn fill_type(&self) -> FillType {
        self.fill_type.get()
    }
}

/// Axis-aligned rectangle, used for layer clips and solid layers.
pub struct RectGeometry {
    state: NodeState,
    rect: Cell<Rect>,
}

impl RectGeometry {
    pub fn new(rect: Rect) -> Rc<Self> {
        Rc::new(Self {
            state: NodeState::default(),
            rect: Cell::new(rect),
        })
    }

    pub fn set_rect(&self, rect: Rect) {
        self.rect.set(rect);
        self.state.invalidate();
    }

    pub fn rect(&self) -> Rect {
        self.rect.get()
    }
}

impl GeometryNode for RectGeometry {
    fn revalidate(&self, ctx: &RevalidationContext) -> bool {
        self.state.revalidate(ctx.pass, |dirty| dirty)
    }

    fn as_path(&self) -> BezPath {
        self.rect.get().to_path(0.1)
    }

    fn bounds(&self) -> Rect {
        self.rect.get()
    }
}

/// Rounded rectangle centered on `position`. Corner radii are clamped to
/// half the size on each axis.
#[derive(Default)]
pub struct RRect {
    cache: PathCache,
    position: Cell<Point>,
    size: Cell<Size>,
    radius: Cell<Size>,
}

const KAPPA: f64 = 0.5522847498;

impl RRect {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn set_position(&self, p: Point) {
        self.position.set(p);
        self.cache.state.invalidate();
    }

    pub fn set_size(&self, s: Size) {
        self.size.set(s);
        self.cache.state.invalidate();
    }

    pub fn set_radius(&self, r: Size) {
        self.radius.set(r);
        self.cache.state.invalidate();
    }

    fn build(&self) -> BezPath {
        let c = self.position.get();
        let s = self.size.get();
        let (w, h) = (s.width.abs(), s.height.abs());
        let rect = Rect::new(c.x - w / 2.0, c.y - h / 2.0, c.x + w / 2.0, c.y + h / 2.0);
        let r = self.radius.get();
        let rx = r.width.max(0.0).min(w / 2.0);
        let ry = r.height.max(0.0).min(h / 2.0);

        let mut p = BezPath::new();
        if rx <= 0.0 || ry <= 0.0 {
            p.move_to((rect.x0, rect.y0));
            p.line_to((rect.x1, rect.y0));
            p.line_to((rect.x1, rect.y1));
            p.line_to((rect.x0, rect.y1));
            p.close_path();
            return p;
        }

        let (kx, ky) = (rx * KAPPA, ry * KAPPA);
        p.move_to((rect.x0 + rx, rect.y0));
        p.line_to((rect.x1 - rx, rect.y0));
        p.curve_to((rect.x1 - rx + kx, rect.y0), (rect.x1, rect.y0 + ry - ky), (rect.x1, rect.y0 + ry));
        p.line_to((rect.x1, rect.y1 - ry));
        p.curve_to((rect.x1, rect.y1 - ry + ky), (rect.x1 - rx + kx, rect.y1), (rect.x1 - rx, rect.y1));
        p.line_to((rect.x0 + rx, rect.y1));
        p.curve_to((rect.x0 + rx - kx, rect.y1), (rect.x0, rect.y1 - ry + ky), (rect.x0, rect.y1 - ry));
        p.line_to((rect.x0, rect.y0 + ry));
        p.curve_to((rect.x0, rect.y0 + ry - ky), (rect.x0 + rx - kx, rect.y0), (rect.x0 + rx, rect.y0));
        p.close_path();
        p
    }
}

impl GeometryNode for RRect {
    fn revalidate(&self, ctx: &RevalidationContext) -> bool {
        self.cache.revalidate(ctx.pass, false, || self.build())
    }

    fn as_path(&self) -> BezPath {
        self.cache.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    Merge,
    Union,
    Difference,
    Intersect,
    Xor,
}

impl MergeMode {
    fn path_op(self) -> Option<PathOp> {
        match self {
            MergeMode::Merge => None,
            MergeMode::Union => Some(PathOp::Union),
            MergeMode::Difference => Some(PathOp::Difference),
            MergeMode::Intersect => Some(PathOp::Intersect),
            MergeMode::Xor => Some(PathOp::Xor),
        }
    }
}

pub struct Merge {
    cache: PathCache,
    geometries: Vec<Rc<dyn GeometryNode>>,
    mode: MergeMode,
}

impl Merge {
    pub fn new(geometries: Vec<Rc<dyn GeometryNode>>, mode: MergeMode) -> Rc<Self> {
        Rc::new(Self {
            cache: PathCache::default(),
            geometries,
            mode,
        })
    }

    fn build(&self, ctx: &RevalidationContext) -> BezPath {
        let mut acc: Option<BezPath> = None;
        for geo in &self.geometries {
            let path = geo.as_path();
            acc = Some(match (acc, self.mode.path_op()) {
                (None, _) => path,
                (Some(a), None) => append(a, &path),
                (Some(a), Some(op)) => match ctx.path_op(&a, &path, op) {
                    Some(result) => result,
                    None => {
                        debug!(?op, "Path op unavailable, concatenating");
                        append(a, &path)
                    }
                },
            });
        }
        acc.unwrap_or_default()
    }
}

fn append(mut a: BezPath, b: &BezPath) -> BezPath {
    for el in b.elements() {
        a.push(*el);
    }
    a
}

impl GeometryNode for Merge {
    fn revalidate(&self, ctx: &RevalidationContext) -> bool {
        let mut inputs_changed = false;
        for geo in &self.geometries {
            inputs_changed |= geo.revalidate(ctx);
        }
        self.cache.revalidate(ctx.pass, inputs_changed, || self.build(ctx))
    }

    fn as_path(&self) -> BezPath {
        self.cache.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrimMode {
    #[default]
    Normal,
    Inverted,
}

pub struct TrimEffect {
    cache: PathCache,
    child: Rc<dyn GeometryNode>,
    start: Cell<f32>,
    stop: Cell<f32>,
    mode: Cell<TrimMode>,
}

impl TrimEffect {
    pub fn new(child: Rc<dyn GeometryNode>) -> Rc<Self> {
        Rc::new(Self {
            cache: PathCache::default(),
            child,
            start: Cell::new(0.0),
            stop: Cell::new(1.0),
            mode: Cell::new(TrimMode::Normal),
        })
    }

    pub fn set_range(&self, start: f32, stop: f32, mode: TrimMode) {
        self.start.set(start);
        self.stop.set(stop);
        self.mode.set(mode);
        self.cache.state.invalidate();
    }

    pub fn range(&self) -> (f32, f32, TrimMode) {
        (self.start.get(), self.stop.get(), self.mode.get())
    }
}

impl GeometryNode for TrimEffect {
    fn revalidate(&self, ctx: &RevalidationContext) -> bool {
        let child_changed = self.child.revalidate(ctx);
        self.cache.revalidate(ctx.pass, child_changed, || {
            path_ops::trim(
                &self.child.as_path(),
                self.start.get(),
                self.stop.get(),
                self.mode.get() == TrimMode::Inverted,
            )
        })
    }

    fn as_path(&self) -> BezPath {
        self.cache.get()
    }

    fn fill_type(&self) -> FillType {
        self.child.fill_type()
    }
}

pub struct RoundEffect {
    cache: PathCache,
    child: Rc<dyn GeometryNode>,
    radius: Cell<f32>,
}

impl RoundEffect {
    pub fn new(child: Rc<dyn GeometryNode>) -> Rc<Self> {
        Rc::new(Self {
            cache: PathCache::default(),
            child,
            radius: Cell::new(0.0),
        })
    }

    pub fn set_radius(&self, r: f32) {
        self.radius.set(r);
        self.cache.state.invalidate();
    }
}

impl GeometryNode for RoundEffect {
    fn revalidate(&self, ctx: &RevalidationContext) -> bool {
        let child_changed = self.child.revalidate(ctx);
        self.cache.revalidate(ctx.pass, child_changed, || {
            path_ops::round_corners(&self.child.as_path(), self.radius.get())
        })
    }

    fn as_path(&self) -> BezPath {
        self.cache.get()
    }

    fn fill_type(&self) -> FillType {
        self.child.fill_type()
    }
}

/// Bakes a (possibly animated) transform into a child geometry.
pub struct GeometryTransform {
    cache: PathCache,
    child: Rc<dyn GeometryNode>,
    matrix: Rc<Matrix>,
}

impl GeometryTransform {
    pub fn new(child: Rc<dyn GeometryNode>, matrix: Rc<Matrix>) -> Rc<Self> {
        Rc::new(Self {
            cache: PathCache::default(),
            child,
            matrix,
        })
    }
}

impl GeometryNode for GeometryTransform {
    fn revalidate(&self, ctx: &RevalidationContext) -> bool {
        let child_changed = self.child.revalidate(ctx);
        let matrix_changed = self.matrix.revalidate(ctx.pass);
        self.cache.revalidate(ctx.pass, child_changed || matrix_changed, || {
            let m: Affine = self.matrix.total();
            m * self.child.as_path()
        })
    }

    fn as_path(&self) -> BezPath {
        self.cache.get()
    }

    fn fill_type(&self) -> FillType {
        self.child.fill_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sg::recording::RecordingCanvas;

    #[test]
    fn test_rrect_radius_clamped() {
        let rr = RRect::new();
        rr.set_position(Point::new(50.0, 50.0));
        rr.set_size(Size::new(100.0, 20.0));
        rr.set_radius(Size::new(30.0, 30.0));

        let canvas = RecordingCanvas::new();
        let ctx = RevalidationContext::new(1, &canvas);
        assert!(rr.revalidate(&ctx));
        let b = rr.bounds();
        assert!((b.x0 - 0.0).abs() < 1e-9 && (b.x1 - 100.0).abs() < 1e-9);
        assert!((b.y0 - 40.0).abs() < 1e-9 && (b.y1 - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_trim_follows_child_changes() {
        let mut square = BezPath::new();
        square.move_to((0.0, 0.0));
        square.line_to((100.0, 0.0));
        square.line_to((100.0, 100.0));
        let path = Path::with_path(square);
        let trim = TrimEffect::new(path.clone());
        trim.set_range(0.0, 0.5, TrimMode::Normal);

        let canvas = RecordingCanvas::new();
        assert!(trim.revalidate(&RevalidationContext::new(1, &canvas)));
        assert_eq!(trim.bounds(), Rect::new(0.0, 0.0, 100.0, 0.0));
        assert!(!trim.revalidate(&RevalidationContext::new(2, &canvas)));

        let mut line = BezPath::new();
        line.move_to((0.0, 0.0));
        line.line_to((0.0, 50.0));
        path.set_path(line);
        assert!(trim.revalidate(&RevalidationContext::new(3, &canvas)));
        assert_eq!(trim.bounds(), Rect::new(0.0, 0.0, 0.0, 25.0));
    }

    #[test]
    fn test_merge_concatenates_without_path_ops() {
        let a = Path::with_path(Rect::new(0.0, 0.0, 10.0, 10.0).to_path(0.1));
        let b = Path::with_path(Rect::new(20.0, 0.0, 30.0, 10.0).to_path(0.1));
        let merge = Merge::new(vec![a as Rc<dyn GeometryNode>, b], MergeMode::Union);

        let canvas = RecordingCanvas::new();
        merge.revalidate(&RevalidationContext::new(1, &canvas));
        assert_eq!(merge.bounds(), Rect::new(0.0, 0.0, 30.0, 10.0));
    }

    #[test]
    fn test_geometry_transform_applies_matrix() {
        let path = Path::with_path(Rect::new(0.0, 0.0, 10.0, 10.0).to_path(0.1));
        let matrix = Matrix::new(None);
        matrix.set_local(Affine::translate((5.0, 5.0)));
        let xf = GeometryTransform::new(path, matrix.clone());

        let canvas = RecordingCanvas::new();
        xf.revalidate(&RevalidationContext::new(1, &canvas));
        assert_eq!(xf.bounds(), Rect::new(5.0, 5.0, 15.0, 15.0));

        matrix.set_local(Affine::translate((0.0, 0.0)));
        assert!(xf.revalidate(&RevalidationContext::new(2, &canvas)));
        assert_eq!(xf.bounds(), Rect::new(0.0, 0.0, 10.0, 10.0));
    }
}
