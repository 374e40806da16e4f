//! Skia backend for the `lottie-core` scene graph.
//!
//! [`SkiaCanvas`] adapts a `skia_safe::Canvas` to the scene graph's
//! [`Canvas`](lottie_core::sg::Canvas) trait and supplies boolean path
//! operations for merge geometries. [`render_raster`] and [`encode_png`]
//! cover the common offscreen case.

use glam::Vec4;
use kurbo::{Affine, BezPath, PathEl};
use lottie_core::sg::{
    BlendMode as CoreBlendMode, Canvas as SceneCanvas, FillType, GradientStop, ImageData, LayerPaint,
    LineCap, LineJoin, Paint as CorePaint, PaintStyle as CorePaintStyle, PathOp as CorePathOp, Shader,
};
use lottie_core::Animation;
use skia_safe::canvas::SaveLayerRec;
use skia_safe::path::{Iter as PathIter, Verb};
use skia_safe::{
    gradient_shader, images, AlphaType, BlendMode, Canvas, ClipOp, Color, Color4f, ColorType, Data,
    EncodedImageFormat, Image as SkImage, ImageInfo, Matrix, Paint, PaintCap, PaintJoin, PaintStyle,
    Path, PathFillType, PathOp, Point, Rect, TileMode,
};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Could not create a {width}x{height} raster surface")]
    Surface { width: i32, height: i32 },
    #[error("PNG encoding failed")]
    Encode,
}

/// Scene graph canvas drawing into a Skia canvas.
pub struct SkiaCanvas<'a> {
    canvas: &'a Canvas,
}

impl<'a> SkiaCanvas<'a> {
    pub fn new(canvas: &'a Canvas) -> Self {
        Self { canvas }
    }
}

impl SceneCanvas for SkiaCanvas<'_> {
    fn save(&mut self) {
        self.canvas.save();
    }

    fn save_layer(&mut self, bounds: Option<kurbo::Rect>, paint: &LayerPaint) {
        let mut sk_paint = Paint::default();
        sk_paint.set_alpha_f(sanitize(paint.alpha));
        sk_paint.set_blend_mode(convert_blend_mode(paint.blend_mode));

        let bounds = bounds.map(convert_rect);
        let mut rec = SaveLayerRec::default().paint(&sk_paint);
        if let Some(bounds) = &bounds {
            rec = rec.bounds(bounds);
        }
        self.canvas.save_layer(&rec);
    }

    fn restore(&mut self) {
        self.canvas.restore();
    }

    fn concat(&mut self, matrix: Affine) {
        self.canvas.concat(&convert_affine(matrix));
    }

    fn clip_rect(&mut self, rect: kurbo::Rect, anti_alias: bool) {
        self.canvas.clip_rect(convert_rect(rect), ClipOp::Intersect, anti_alias);
    }

    fn clip_path(&mut self, path: &BezPath, fill: FillType, anti_alias: bool) {
        let mut sk_path = kurbo_to_skia_path(path);
        sk_path.set_fill_type(convert_fill_type(fill));
        self.canvas.clip_path(&sk_path, ClipOp::Intersect, anti_alias);
    }

    fn draw_path(&mut self, path: &BezPath, fill: FillType, paint: &CorePaint) {
        let mut sk_path = kurbo_to_skia_path(path);
        sk_path.set_fill_type(convert_fill_type(fill));
        self.canvas.draw_path(&sk_path, &convert_paint(paint));
    }

    fn draw_image(&mut self, image: &ImageData, dst: kurbo::Rect) {
        let Some(sk_image) = image_to_skia(image) else {
            warn!(width = image.width, height = image.height, "Could not upload image");
            return;
        };
        let mut paint = Paint::default();
        paint.set_anti_alias(true);
        self.canvas.draw_image_rect(sk_image, None, convert_rect(dst), &paint);
    }

    fn path_op(&self, a: &BezPath, b: &BezPath, op: CorePathOp) -> Option<BezPath> {
        let a = kurbo_to_skia_path(a);
        let b = kurbo_to_skia_path(b);
        let result = a.op(&b, convert_path_op(op))?;
        Some(skia_to_kurbo_path(&result))
    }
}

/// Renders the animation's current state into a new raster image, scaled to
/// fit `width`x`height` over `background`.
pub fn render_raster(animation: &Animation, width: i32, height: i32, background: Color) -> Result<SkImage, RenderError> {
    let mut surface =
        skia_safe::surfaces::raster_n32_premul((width, height)).ok_or(RenderError::Surface { width, height })?;
    let canvas = surface.canvas();
    canvas.clear(background);

    let dst = kurbo::Rect::new(0.0, 0.0, width as f64, height as f64);
    animation.render(&mut SkiaCanvas::new(canvas), Some(dst));
    Ok(surface.image_snapshot())
}

pub fn encode_png(image: &SkImage) -> Result<Vec<u8>, RenderError> {
    let data = image
        .encode(None, EncodedImageFormat::PNG, 100)
        .ok_or(RenderError::Encode)?;
    Ok(data.as_bytes().to_vec())
}

fn convert_paint(paint: &CorePaint) -> Paint {
    let mut sk_paint = Paint::default();
    sk_paint.set_anti_alias(paint.anti_alias);
    sk_paint.set_blend_mode(convert_blend_mode(paint.blend_mode));

    match paint.style {
        CorePaintStyle::Fill => {
            sk_paint.set_style(PaintStyle::Fill);
        }
        CorePaintStyle::Stroke => {
            sk_paint.set_style(PaintStyle::Stroke);
            sk_paint.set_stroke_width(sanitize(paint.stroke.width));
            sk_paint.set_stroke_miter(sanitize(paint.stroke.miter_limit));
            sk_paint.set_stroke_cap(convert_cap(paint.stroke.cap));
            sk_paint.set_stroke_join(convert_join(paint.stroke.join));
        }
    }

    let opacity = sanitize(paint.opacity);
    match &paint.shader {
        Shader::Solid(color) => {
            let mut c = glam_to_skia_color4f(*color);
            c.a *= opacity;
            sk_paint.set_color4f(c, None);
        }
        Shader::Linear { start, end, stops } => {
            let (colors, pos) = convert_stops(stops);
            let shader = gradient_shader::linear(
                (convert_point(*start), convert_point(*end)),
                colors.as_slice(),
                Some(pos.as_slice()),
                TileMode::Clamp,
                None,
                None,
            );
            set_gradient_shader(&mut sk_paint, shader, opacity);
        }
        Shader::Radial { center, radius, stops } => {
            let (colors, pos) = convert_stops(stops);
            let shader = gradient_shader::radial(
                convert_point(*center),
                sanitize(*radius as f32),
                colors.as_slice(),
                Some(pos.as_slice()),
                TileMode::Clamp,
                None,
                None,
            );
            set_gradient_shader(&mut sk_paint, shader, opacity);
        }
    }
    sk_paint
}

/// A gradient Skia cannot build (no stops) paints nothing.
fn set_gradient_shader(paint: &mut Paint, shader: Option<skia_safe::Shader>, opacity: f32) {
    match shader {
        Some(shader) => {
            paint.set_shader(shader);
            paint.set_alpha_f(opacity);
        }
        None => {
            paint.set_shader(None);
            paint.set_color(Color::TRANSPARENT);
        }
    }
}

fn convert_stops(stops: &[GradientStop]) -> (Vec<Color>, Vec<f32>) {
    stops
        .iter()
        .map(|s| (glam_to_skia_color4f(s.color).to_color(), sanitize(s.offset)))
        .unzip()
}

fn image_to_skia(image: &ImageData) -> Option<SkImage> {
    let info = ImageInfo::new(
        (image.width as i32, image.height as i32),
        ColorType::RGBA8888,
        AlphaType::Unpremul,
        None,
    );
    images::raster_from_data(&info, Data::new_copy(&image.pixels), image.row_bytes())
}

fn sanitize(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

fn convert_point(p: kurbo::Point) -> Point {
    Point::new(sanitize(p.x as f32), sanitize(p.y as f32))
}

fn convert_rect(r: kurbo::Rect) -> Rect {
    Rect::new(
        sanitize(r.x0 as f32),
        sanitize(r.y0 as f32),
        sanitize(r.x1 as f32),
        sanitize(r.y1 as f32),
    )
}

fn convert_affine(m: Affine) -> Matrix {
    let [a, b, c, d, e, f] = m.as_coeffs().map(|v| sanitize(v as f32));
    Matrix::new_all(a, c, e, b, d, f, 0.0, 0.0, 1.0)
}

fn glam_to_skia_color4f(v: Vec4) -> Color4f {
    Color4f::new(sanitize(v.x), sanitize(v.y), sanitize(v.z), sanitize(v.w))
}

fn kurbo_to_skia_path(bez_path: &BezPath) -> Path {
    let mut path = Path::new();
    for el in bez_path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                path.move_to(convert_point(p));
            }
            PathEl::LineTo(p) => {
                path.line_to(convert_point(p));
            }
            PathEl::QuadTo(p1, p2) => {
                path.quad_to(convert_point(p1), convert_point(p2));
            }
            PathEl::CurveTo(p1, p2, p3) => {
                path.cubic_to(convert_point(p1), convert_point(p2), convert_point(p3));
            }
            PathEl::ClosePath => {
                path.close();
            }
        }
    }
    path
}

fn skia_to_kurbo_path(path: &Path) -> BezPath {
    let to_kurbo = |p: Point| kurbo::Point::new(p.x as f64, p.y as f64);
    let mut out = BezPath::new();
    for (verb, points) in PathIter::new(path, false) {
        match verb {
            Verb::Move => out.move_to(to_kurbo(points[0])),
            Verb::Line => out.line_to(to_kurbo(points[1])),
            // Conics only come from arcs, which the scene graph never emits;
            // the control point is kept as a quadratic.
            Verb::Quad | Verb::Conic => out.quad_to(to_kurbo(points[1]), to_kurbo(points[2])),
            Verb::Cubic => out.curve_to(to_kurbo(points[1]), to_kurbo(points[2]), to_kurbo(points[3])),
            Verb::Close => out.close_path(),
            Verb::Done => break,
        }
    }
    out
}

fn convert_fill_type(fill: FillType) -> PathFillType {
    match fill {
        FillType::Winding => PathFillType::Winding,
        FillType::EvenOdd => PathFillType::EvenOdd,
        FillType::InverseWinding => PathFillType::InverseWinding,
        FillType::InverseEvenOdd => PathFillType::InverseEvenOdd,
    }
}

fn convert_path_op(op: CorePathOp) -> PathOp {
    match op {
        CorePathOp::Union => PathOp::Union,
        CorePathOp::Difference => PathOp::Difference,
        CorePathOp::Intersect => PathOp::Intersect,
        CorePathOp::Xor => PathOp::XOR,
    }
}

fn convert_blend_mode(mode: CoreBlendMode) -> BlendMode {
    match mode {
        CoreBlendMode::SrcOver => BlendMode::SrcOver,
        CoreBlendMode::SrcIn => BlendMode::SrcIn,
        CoreBlendMode::SrcOut => BlendMode::SrcOut,
        CoreBlendMode::DstIn => BlendMode::DstIn,
        CoreBlendMode::Exclusion => BlendMode::Exclusion,
        CoreBlendMode::Lighten => BlendMode::Lighten,
        CoreBlendMode::Darken => BlendMode::Darken,
        CoreBlendMode::Difference => BlendMode::Difference,
    }
}

fn convert_cap(cap: LineCap) -> PaintCap {
    match cap {
        LineCap::Butt => PaintCap::Butt,
        LineCap::Round => PaintCap::Round,
        LineCap::Square => PaintCap::Square,
    }
}

fn convert_join(join: LineJoin) -> PaintJoin {
    match join {
        LineJoin::Miter => PaintJoin::Miter,
        LineJoin::Round => PaintJoin::Round,
        LineJoin::Bevel => PaintJoin::Bevel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affine_maps_like_kurbo() {
        let m = Affine::translate((10.0, 5.0)) * Affine::rotate(0.5) * Affine::scale_non_uniform(2.0, 3.0);
        let sk = convert_affine(m);
        let p = m * kurbo::Point::new(3.0, 4.0);
        let q = sk.map_point((3.0, 4.0));
        assert!((p.x as f32 - q.x).abs() < 1e-4);
        assert!((p.y as f32 - q.y).abs() < 1e-4);
    }

    #[test]
    fn test_path_round_trip_keeps_verbs() {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((10.0, 0.0));
        path.quad_to((10.0, 10.0), (0.0, 10.0));
        path.curve_to((-5.0, 5.0), (-5.0, 2.0), (0.0, 0.0));
        path.close_path();

        assert_eq!(skia_to_kurbo_path(&kurbo_to_skia_path(&path)), path);
    }

    #[test]
    fn test_solid_paint_folds_opacity_into_alpha() {
        let paint = CorePaint {
            shader: Shader::Solid(Vec4::new(1.0, 0.0, 0.0, 0.5)),
            opacity: 0.5,
            ..Default::default()
        };
        let sk = convert_paint(&paint);
        assert!((sk.alpha_f() - 0.25).abs() < 1e-6);
        assert_eq!(sk.style(), PaintStyle::Fill);
    }

    #[test]
    fn test_empty_gradient_is_transparent() {
        let paint = CorePaint {
            shader: Shader::Linear {
                start: kurbo::Point::ZERO,
                end: kurbo::Point::new(10.0, 0.0),
                stops: Vec::new(),
            },
            opacity: 1.0,
            ..Default::default()
        };
        let sk = convert_paint(&paint);
        assert!(sk.shader().is_none());
        assert_eq!(sk.alpha(), 0);
    }
}
