//! Adapters collect several animated properties and push one combined
//! result into a scene graph node whenever any of them changes.

use std::cell::{Cell, RefCell};
use std::f64::consts::PI;
use std::rc::Rc;

use kurbo::{Affine, BezPath, Point, Vec2};

use crate::sg::{Matrix, PaintNode, Path, Shader, TrimEffect, TrimMode};
use crate::value::to_gradient_stops;

/// Layer and shape-group transforms.
pub struct TransformAdapter {
    matrix: Rc<Matrix>,
    anchor_point: Cell<Point>,
    position: Cell<Point>,
    scale: Cell<Vec2>,
    rotation: Cell<f64>,
    skew: Cell<f64>,
    skew_axis: Cell<f64>,
}

impl TransformAdapter {
    pub fn new(matrix: Rc<Matrix>) -> Rc<Self> {
        Rc::new(Self {
            matrix,
            anchor_point: Cell::new(Point::ZERO),
            position: Cell::new(Point::ZERO),
            scale: Cell::new(Vec2::new(100.0, 100.0)),
            rotation: Cell::new(0.0),
            skew: Cell::new(0.0),
            skew_axis: Cell::new(0.0),
        })
    }

    pub fn matrix(&self) -> &Rc<Matrix> {
        &self.matrix
    }

    pub fn set_anchor_point(&self, p: Point) {
        self.anchor_point.set(p);
        self.apply();
    }

    pub fn set_position(&self, p: Point) {
        self.position.set(p);
        self.apply();
    }

    pub fn set_position_x(&self, x: f64) {
        let p = self.position.get();
        self.set_position(Point::new(x, p.y));
    }

    pub fn set_position_y(&self, y: f64) {
        let p = self.position.get();
        self.set_position(Point::new(p.x, y));
    }

    /// Percent, per axis.
    pub fn set_scale(&self, s: Vec2) {
        self.scale.set(s);
        self.apply();
    }

    /// Degrees, clockwise.
    pub fn set_rotation(&self, deg: f64) {
        self.rotation.set(deg);
        self.apply();
    }

    pub fn set_skew(&self, deg: f64) {
        self.skew.set(deg);
        self.apply();
    }

    pub fn set_skew_axis(&self, deg: f64) {
        self.skew_axis.set(deg);
        self.apply();
    }

    pub fn total_matrix(&self) -> Affine {
        let a = self.anchor_point.get();
        let p = self.position.get();
        let s = self.scale.get() / 100.0;

        let mut m = Affine::translate((-a.x, -a.y));
        m = Affine::scale_non_uniform(s.x, s.y) * m;

        let skew = self.skew.get();
        if skew != 0.0 {
            let axis = self.skew_axis.get().to_radians();
            let shear = Affine::new([1.0, 0.0, (-skew.to_radians()).tan(), 1.0, 0.0, 0.0]);
            m = Affine::rotate(axis) * shear * Affine::rotate(-axis) * m;
        }

        m = Affine::rotate(self.rotation.get().to_radians()) * m;
        Affine::translate((p.x, p.y)) * m
    }

    fn apply(&self) {
        self.matrix.set_local(self.total_matrix());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolyStarKind {
    Star,
    Poly,
}

const MAX_POINT_COUNT: f64 = 100_000.0;

pub struct PolyStarAdapter {
    path: Rc<Path>,
    kind: PolyStarKind,
    position: Cell<Point>,
    point_count: Cell<f64>,
    inner_radius: Cell<f64>,
    outer_radius: Cell<f64>,
    inner_roundness: Cell<f64>,
    outer_roundness: Cell<f64>,
    rotation: Cell<f64>,
}

impl PolyStarAdapter {
    pub fn new(path: Rc<Path>, kind: PolyStarKind) -> Rc<Self> {
        Rc::new(Self {
            path,
            kind,
            position: Cell::new(Point::ZERO),
            point_count: Cell::new(0.0),
            inner_radius: Cell::new(0.0),
            outer_radius: Cell::new(0.0),
            inner_roundness: Cell::new(0.0),
            outer_roundness: Cell::new(0.0),
            rotation: Cell::new(0.0),
        })
    }

    pub fn set_position(&self, p: Point) {
        self.position.set(p);
        self.apply();
    }

    pub fn set_point_count(&self, n: f64) {
        self.point_count.set(n);
        self.apply();
    }

    pub fn set_inner_radius(&self, r: f64) {
        self.inner_radius.set(r);
        self.apply();
    }

    pub fn set_outer_radius(&self, r: f64) {
        self.outer_radius.set(r);
        self.apply();
    }

    pub fn set_inner_roundness(&self, r: f64) {
        self.inner_roundness.set(r);
        self.apply();
    }

    pub fn set_outer_roundness(&self, r: f64) {
        self.outer_roundness.set(r);
        self.apply();
    }

    pub fn set_rotation(&self, deg: f64) {
        self.rotation.set(deg);
        self.apply();
    }

    fn apply(&self) {
        self.path.set_path(self.build());
    }

    pub fn build(&self) -> BezPath {
        let mut path = BezPath::new();
        let count = self.point_count.get().round().clamp(0.0, MAX_POINT_COUNT) as usize;
        if count == 0 {
            return path;
        }

        let is_star = self.kind == PolyStarKind::Star;
        let total = if is_star { count * 2 } else { count };
        let start_angle = (self.rotation.get() - 90.0).to_radians();
        let step = 2.0 * PI / total as f64;
        let center = self.position.get();

        let radius_at = |i: usize| {
            if is_star && i % 2 == 1 {
                (self.inner_radius.get(), self.inner_roundness.get())
            } else {
                (self.outer_radius.get(), self.outer_roundness.get())
            }
        };

        // (vertex, in control, out control)
        let vertices: Vec<(Point, Point, Point)> = (0..total)
            .map(|i| {
                let (r, roundness) = radius_at(i);
                let angle = start_angle + step * i as f64;
                let (sin, cos) = angle.sin_cos();
                let vertex = center + Vec2::new(r * cos, r * sin);
                let tangent = Vec2::new(-sin, cos);
                let d = r * step * roundness * 0.01;
                (vertex, vertex - tangent * d, vertex + tangent * d)
            })
            .collect();

        let rounded = vertices.iter().any(|(v, i, _)| v != i);
        path.move_to(vertices[0].0);
        for i in 0..total {
            let next = &vertices[(i + 1) % total];
            if rounded {
                path.curve_to(vertices[i].2, next.1, next.0);
            } else {
                path.line_to(next.0);
            }
        }
        path.close_path();
        path
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientKind {
    Linear,
    Radial,
}

pub struct GradientAdapter {
    paint: Rc<PaintNode>,
    kind: GradientKind,
    stop_count: usize,
    start_point: Cell<Point>,
    end_point: Cell<Point>,
    color_stops: RefCell<Vec<f32>>,
}

impl GradientAdapter {
    pub fn new(paint: Rc<PaintNode>, kind: GradientKind, stop_count: usize) -> Rc<Self> {
        Rc::new(Self {
            paint,
            kind,
            stop_count,
            start_point: Cell::new(Point::ZERO),
            end_point: Cell::new(Point::ZERO),
            color_stops: RefCell::new(Vec::new()),
        })
    }

    pub fn set_start_point(&self, p: Point) {
        self.start_point.set(p);
        self.apply();
    }

    pub fn set_end_point(&self, p: Point) {
        self.end_point.set(p);
        self.apply();
    }

    pub fn set_color_stops(&self, stops: &[f32]) {
        *self.color_stops.borrow_mut() = stops.to_vec();
        self.apply();
    }

    fn apply(&self) {
        let stops = to_gradient_stops(&self.color_stops.borrow(), self.stop_count);
        let (start, end) = (self.start_point.get(), self.end_point.get());
        let shader = match self.kind {
            GradientKind::Linear => Shader::Linear { start, end, stops },
            GradientKind::Radial => Shader::Radial {
                center: start,
                radius: start.distance(end),
                stops,
            },
        };
        self.paint.set_shader(shader);
    }
}

/// Maps percent start/end and degree offset onto a normalized trim range.
pub struct TrimEffectAdapter {
    effect: Rc<TrimEffect>,
    start: Cell<f32>,
    end: Cell<f32>,
    offset: Cell<f32>,
}

impl TrimEffectAdapter {
    pub fn new(effect: Rc<TrimEffect>) -> Rc<Self> {
        Rc::new(Self {
            effect,
            start: Cell::new(0.0),
            end: Cell::new(100.0),
            offset: Cell::new(0.0),
        })
    }

    pub fn set_start(&self, v: f32) {
        self.start.set(v);
        self.apply();
    }

    pub fn set_end(&self, v: f32) {
        self.end.set(v);
        self.apply();
    }

    pub fn set_offset(&self, v: f32) {
        self.offset.set(v);
        self.apply();
    }

    fn apply(&self) {
        let start = self.start.get() / 100.0;
        let end = self.end.get() / 100.0;
        let offset = self.offset.get() / 360.0;

        let mut lo = start.min(end) + offset;
        let mut hi = start.max(end) + offset;
        let mut mode = TrimMode::Normal;

        if hi - lo < 1.0 {
            lo -= lo.floor();
            hi -= hi.floor();
            if lo > hi {
                std::mem::swap(&mut lo, &mut hi);
                mode = TrimMode::Inverted;
            }
        } else {
            lo = 0.0;
            hi = 1.0;
        }

        self.effect.set_range(lo, hi, mode);
    }
}
