use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Vec4;

use super::{BlendMode, LineCap, LineJoin, NodeState, Paint, PaintStyle, Shader, Stroke};

/// Mutable paint description shared between a draw and its animators.
#[derive(Default)]
pub struct PaintNode {
    state: NodeState,
    shader: RefCell<Shader>,
    opacity: Cell<f32>,
    anti_alias: Cell<bool>,
    style: Cell<PaintStyle>,
    stroke: Cell<Stroke>,
    blend_mode: Cell<BlendMode>,
}

impl PaintNode {
    pub fn new() -> Rc<Self> {
        let node = Self::default();
        node.opacity.set(1.0);
        Rc::new(node)
    }

    pub fn color(color: Vec4) -> Rc<Self> {
        let node = Self::new();
        node.set_shader(Shader::Solid(color));
        node
    }

    pub fn set_shader(&self, shader: Shader) {
        *self.shader.borrow_mut() = shader;
        self.state.invalidate();
    }

    pub fn set_color(&self, color: Vec4) {
        self.set_shader(Shader::Solid(color));
    }

    pub fn set_opacity(&self, opacity: f32) {
        self.opacity.set(opacity.clamp(0.0, 1.0));
        self.state.invalidate();
    }

    pub fn opacity(&self) -> f32 {
        self.opacity.get()
    }

    pub fn set_anti_alias(&self, aa: bool) {
        self.anti_alias.set(aa);
        self.state.invalidate();
    }

    pub fn set_style(&self, style: PaintStyle) {
        self.style.set(style);
        self.state.invalidate();
    }

    pub fn style(&self) -> PaintStyle {
        self.style.get()
    }

    fn update_stroke(&self, f: impl FnOnce(&mut Stroke)) {
        let mut s = self.stroke.get();
        f(&mut s);
        self.stroke.set(s);
        self.state.invalidate();
    }

    pub fn set_stroke_width(&self, w: f32) {
        self.update_stroke(|s| s.width = w.max(0.0));
    }

    pub fn set_stroke_miter(&self, m: f32) {
        self.update_stroke(|s| s.miter_limit = m);
    }

    pub fn set_stroke_join(&self, j: LineJoin) {
        self.update_stroke(|s| s.join = j);
    }

    pub fn set_stroke_cap(&self, c: LineCap) {
        self.update_stroke(|s| s.cap = c);
    }

    pub fn stroke(&self) -> Stroke {
        self.stroke.get()
    }

    pub fn set_blend_mode(&self, mode: BlendMode) {
        self.blend_mode.set(mode);
        self.state.invalidate();
    }

    pub fn revalidate(&self, pass: u64) -> bool {
        self.state.revalidate(pass, |dirty| dirty)
    }

    pub fn to_paint(&self) -> Paint {
        Paint {
            shader: self.shader.borrow().clone(),
            opacity: self.opacity.get(),
            anti_alias: self.anti_alias.get(),
            style: self.style.get(),
            stroke: self.stroke.get(),
            blend_mode: self.blend_mode.get(),
        }
    }
}
