//! Backend-neutral drawing surface used by the scene graph.

use glam::Vec4;
use kurbo::{Affine, BezPath, Point, Rect};

use super::image::ImageData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillType {
    #[default]
    Winding,
    EvenOdd,
    InverseWinding,
    InverseEvenOdd,
}

impl FillType {
    pub fn is_inverse(self) -> bool {
        matches!(self, FillType::InverseWinding | FillType::InverseEvenOdd)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    SrcOver,
    SrcIn,
    SrcOut,
    DstIn,
    Exclusion,
    Lighten,
    Darken,
    Difference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathOp {
    Union,
    Difference,
    Intersect,
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaintStyle {
    #[default]
    Fill,
    Stroke,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Vec4,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shader {
    Solid(Vec4),
    Linear {
        start: Point,
        end: Point,
        stops: Vec<GradientStop>,
    },
    Radial {
        center: Point,
        radius: f64,
        stops: Vec<GradientStop>,
    },
}

impl Default for Shader {
    fn default() -> Self {
        Shader::Solid(Vec4::new(0.0, 0.0, 0.0, 1.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub width: f32,
    pub miter_limit: f32,
    pub join: LineJoin,
    pub cap: LineCap,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            width: 1.0,
            miter_limit: 4.0,
            join: LineJoin::Miter,
            cap: LineCap::Butt,
        }
    }
}

/// Resolved paint for a single draw call. `opacity` multiplies the shader
/// alpha.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paint {
    pub shader: Shader,
    pub opacity: f32,
    pub anti_alias: bool,
    pub style: PaintStyle,
    pub stroke: Stroke,
    pub blend_mode: BlendMode,
}

/// Paint applied when a layer saved with [`Canvas::save_layer`] is restored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerPaint {
    pub alpha: f32,
    pub blend_mode: BlendMode,
}

impl Default for LayerPaint {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            blend_mode: BlendMode::SrcOver,
        }
    }
}

pub trait Canvas {
    fn save(&mut self);
    fn save_layer(&mut self, bounds: Option<Rect>, paint: &LayerPaint);
    fn restore(&mut self);
    fn concat(&mut self, matrix: Affine);
    fn clip_rect(&mut self, rect: Rect, anti_alias: bool);
    fn clip_path(&mut self, path: &BezPath, fill: FillType, anti_alias: bool);
    fn draw_path(&mut self, path: &BezPath, fill: FillType, paint: &Paint);
    fn draw_image(&mut self, image: &ImageData, dst: Rect);

    /// Boolean path operations, when the backend offers them. Without them
    /// merge geometries fall back to plain concatenation.
    fn path_op(&self, _a: &BezPath, _b: &BezPath, _op: PathOp) -> Option<BezPath> {
        None
    }
}
