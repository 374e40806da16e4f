//! Render nodes: the drawable tree built on top of geometry and paint nodes.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use kurbo::{Affine, Rect};

use super::{
    union_bounds, BlendMode, Canvas, GeometryNode, ImageData, LayerPaint, LineJoin, Matrix,
    NodeState, PaintNode, PaintStyle, RevalidationContext,
};

pub trait RenderNode {
    /// Updates cached state and returns the node's bounds under `ctm`.
    /// `force` is set when an ancestor changed in a way that moves or
    /// re-composites this subtree.
    fn revalidate(&self, ctx: &RevalidationContext, ctm: Affine, force: bool) -> Rect;
    fn render(&self, canvas: &mut dyn Canvas);
}

/// Geometry filled or stroked with a paint.
pub struct Draw {
    geometry: Rc<dyn GeometryNode>,
    paint: Rc<PaintNode>,
    bounds: Cell<Rect>,
}

impl Draw {
    pub fn new(geometry: Rc<dyn GeometryNode>, paint: Rc<PaintNode>) -> Rc<Self> {
        Rc::new(Self {
            geometry,
            paint,
            bounds: Cell::new(Rect::ZERO),
        })
    }

    pub fn geometry(&self) -> &Rc<dyn GeometryNode> {
        &self.geometry
    }

    pub fn paint(&self) -> &Rc<PaintNode> {
        &self.paint
    }

    fn local_bounds(&self) -> Rect {
        let bounds = self.geometry.bounds();
        if self.paint.style() != PaintStyle::Stroke {
            return bounds;
        }
        let stroke = self.paint.stroke();
        let mut outset = stroke.width as f64 / 2.0;
        if stroke.join == LineJoin::Miter {
            outset *= (stroke.miter_limit as f64).max(1.0);
        }
        bounds.inflate(outset, outset)
    }
}

impl RenderNode for Draw {
    fn revalidate(&self, ctx: &RevalidationContext, ctm: Affine, force: bool) -> Rect {
        let geometry_changed = self.geometry.revalidate(ctx);
        let paint_changed = self.paint.revalidate(ctx.pass);
        if geometry_changed || paint_changed || force {
            let device = ctm.transform_rect_bbox(self.local_bounds());
            ctx.add_damage(union_bounds(self.bounds.get(), device));
            self.bounds.set(device);
        }
        self.bounds.get()
    }

    fn render(&self, canvas: &mut dyn Canvas) {
        if self.paint.opacity() <= 0.0 {
            return;
        }
        canvas.draw_path(&self.geometry.as_path(), self.geometry.fill_type(), &self.paint.to_paint());
    }
}

#[derive(Default)]
pub struct Group {
    children: RefCell<Vec<Rc<dyn RenderNode>>>,
}

impl Group {
    pub fn new(children: Vec<Rc<dyn RenderNode>>) -> Rc<Self> {
        Rc::new(Self {
            children: RefCell::new(children),
        })
    }

    pub fn add_child(&self, child: Rc<dyn RenderNode>) {
        self.children.borrow_mut().push(child);
    }

    pub fn len(&self) -> usize {
        self.children.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.borrow().is_empty()
    }
}

impl RenderNode for Group {
    fn revalidate(&self, ctx: &RevalidationContext, ctm: Affine, force: bool) -> Rect {
        self.children
            .borrow()
            .iter()
            .fold(Rect::ZERO, |acc, c| union_bounds(acc, c.revalidate(ctx, ctm, force)))
    }

    fn render(&self, canvas: &mut dyn Canvas) {
        for child in self.children.borrow().iter() {
            child.render(canvas);
        }
    }
}

pub struct Transform {
    child: Rc<dyn RenderNode>,
    matrix: Rc<Matrix>,
}

impl Transform {
    pub fn new(child: Rc<dyn RenderNode>, matrix: Rc<Matrix>) -> Rc<Self> {
        Rc::new(Self { child, matrix })
    }
}

impl RenderNode for Transform {
    fn revalidate(&self, ctx: &RevalidationContext, ctm: Affine, force: bool) -> Rect {
        let changed = self.matrix.revalidate(ctx.pass);
        self.child
            .revalidate(ctx, ctm * self.matrix.total(), force || changed)
    }

    fn render(&self, canvas: &mut dyn Canvas) {
        canvas.save();
        canvas.concat(self.matrix.total());
        self.child.render(canvas);
        canvas.restore();
    }
}

pub struct OpacityEffect {
    state: NodeState,
    child: Rc<dyn RenderNode>,
    opacity: Cell<f32>,
}

impl OpacityEffect {
    pub fn new(child: Rc<dyn RenderNode>, opacity: f32) -> Rc<Self> {
        Rc::new(Self {
            state: NodeState::default(),
            child,
            opacity: Cell::new(opacity),
        })
    }

    pub fn set_opacity(&self, opacity: f32) {
        let opacity = opacity.clamp(0.0, 1.0);
        if opacity != self.opacity.get() {
            self.opacity.set(opacity);
            self.state.invalidate();
        }
    }

    pub fn opacity(&self) -> f32 {
        self.opacity.get()
    }
}

impl RenderNode for OpacityEffect {
    fn revalidate(&self, ctx: &RevalidationContext, ctm: Affine, force: bool) -> Rect {
        let changed = self.state.revalidate(ctx.pass, |dirty| dirty);
        let bounds = self.child.revalidate(ctx, ctm, force || changed);
        if self.opacity.get() <= 0.0 {
            Rect::ZERO
        } else {
            bounds
        }
    }

    fn render(&self, canvas: &mut dyn Canvas) {
        let opacity = self.opacity.get();
        if opacity <= 0.0 {
            return;
        }
        if opacity >= 1.0 {
            self.child.render(canvas);
            return;
        }
        canvas.save_layer(
            None,
            &LayerPaint {
                alpha: opacity,
                blend_mode: BlendMode::SrcOver,
            },
        );
        self.child.render(canvas);
        canvas.restore();
    }
}

/// Clips a subtree to a geometry.
pub struct ClipEffect {
    child: Rc<dyn RenderNode>,
    clip: Rc<dyn GeometryNode>,
}

impl ClipEffect {
    pub fn new(child: Rc<dyn RenderNode>, clip: Rc<dyn GeometryNode>) -> Rc<Self> {
        Rc::new(Self { child, clip })
    }
}

impl RenderNode for ClipEffect {
    fn revalidate(&self, ctx: &RevalidationContext, ctm: Affine, force: bool) -> Rect {
        let clip_changed = self.clip.revalidate(ctx);
        let bounds = self.child.revalidate(ctx, ctm, force || clip_changed);
        if self.clip.fill_type().is_inverse() {
            return bounds;
        }
        bounds.intersect(ctm.transform_rect_bbox(self.clip.bounds()))
    }

    fn render(&self, canvas: &mut dyn Canvas) {
        canvas.save();
        canvas.clip_path(&self.clip.as_path(), self.clip.fill_type(), true);
        self.child.render(canvas);
        canvas.restore();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskMode {
    Normal,
    Invert,
}

/// Composites `child` through the coverage of `mask`.
pub struct MaskEffect {
    child: Rc<dyn RenderNode>,
    mask: Rc<dyn RenderNode>,
    mode: MaskMode,
}

impl MaskEffect {
    pub fn new(child: Rc<dyn RenderNode>, mask: Rc<dyn RenderNode>, mode: MaskMode) -> Rc<Self> {
        Rc::new(Self { child, mask, mode })
    }

    pub fn mode(&self) -> MaskMode {
        self.mode
    }
}

impl RenderNode for MaskEffect {
    fn revalidate(&self, ctx: &RevalidationContext, ctm: Affine, force: bool) -> Rect {
        let mask_bounds = self.mask.revalidate(ctx, ctm, force);
        let bounds = self.child.revalidate(ctx, ctm, force);
        match self.mode {
            MaskMode::Normal => bounds.intersect(mask_bounds),
            MaskMode::Invert => bounds,
        }
    }

    fn render(&self, canvas: &mut dyn Canvas) {
        canvas.save_layer(None, &LayerPaint::default());
        self.mask.render(canvas);

        let blend_mode = match self.mode {
            MaskMode::Normal => BlendMode::SrcIn,
            MaskMode::Invert => BlendMode::SrcOut,
        };
        canvas.save_layer(None, &LayerPaint { alpha: 1.0, blend_mode });
        self.child.render(canvas);
        canvas.restore();

        canvas.restore();
    }
}

/// Raster image drawn at its natural size from the origin.
pub struct Image {
    image: Rc<ImageData>,
    bounds: Cell<Option<Rect>>,
}

impl Image {
    pub fn new(image: Rc<ImageData>) -> Rc<Self> {
        Rc::new(Self {
            image,
            bounds: Cell::new(None),
        })
    }

    fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.image.width as f64, self.image.height as f64)
    }
}

impl RenderNode for Image {
    fn revalidate(&self, ctx: &RevalidationContext, ctm: Affine, force: bool) -> Rect {
        match self.bounds.get() {
            Some(b) if !force => b,
            old => {
                let device = ctm.transform_rect_bbox(self.rect());
                ctx.add_damage(union_bounds(old.unwrap_or(Rect::ZERO), device));
                self.bounds.set(Some(device));
                device
            }
        }
    }

    fn render(&self, canvas: &mut dyn Canvas) {
        canvas.draw_image(&self.image, self.rect());
    }
}
