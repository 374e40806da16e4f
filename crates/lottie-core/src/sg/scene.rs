use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Vec4;
use kurbo::{Affine, Rect};

use super::{Canvas, FillType, Paint, PaintStyle, RenderNode, RevalidationContext, Shader, Stroke};
use crate::animator::AnimatorList;

/// A render tree plus the animators that drive it.
pub struct Scene {
    root: Option<Rc<dyn RenderNode>>,
    animators: AnimatorList,
    pass: Cell<u64>,
    damage: RefCell<Vec<Rect>>,
    show_inval: Cell<bool>,
}

impl Scene {
    pub fn new(root: Option<Rc<dyn RenderNode>>, animators: AnimatorList) -> Self {
        Self {
            root,
            animators,
            pass: Cell::new(0),
            damage: RefCell::new(Vec::new()),
            show_inval: Cell::new(false),
        }
    }

    pub fn root(&self) -> Option<&Rc<dyn RenderNode>> {
        self.root.as_ref()
    }

    pub fn animator_count(&self) -> usize {
        self.animators.len()
    }

    /// Pushes frame `t` through every animator.
    pub fn animate(&mut self, t: f32) {
        for animator in &mut self.animators {
            animator.tick(t);
        }
    }

    pub fn set_show_inval(&self, show: bool) {
        self.show_inval.set(show);
    }

    /// Regions repainted by the last [`Scene::render`].
    pub fn damage(&self) -> Vec<Rect> {
        self.damage.borrow().clone()
    }

    /// Revalidates against `canvas` (which also supplies path ops), then
    /// draws.
    pub fn revalidate(&self, canvas: &dyn Canvas) -> Rect {
        let Some(root) = &self.root else {
            return Rect::ZERO;
        };
        let pass = self.pass.get() + 1;
        self.pass.set(pass);
        let ctx = RevalidationContext::new(pass, canvas);
        let bounds = root.revalidate(&ctx, Affine::IDENTITY, false);
        *self.damage.borrow_mut() = ctx.into_damage();
        bounds
    }

    pub fn render(&self, canvas: &mut dyn Canvas) {
        self.revalidate(&*canvas);
        let Some(root) = &self.root else {
            return;
        };
        root.render(canvas);

        if self.show_inval.get() {
            let paint = Paint {
                shader: Shader::Solid(Vec4::new(1.0, 0.0, 0.0, 1.0)),
                opacity: 1.0,
                anti_alias: true,
                style: PaintStyle::Stroke,
                stroke: Stroke::default(),
                ..Paint::default()
            };
            for rect in self.damage.borrow().iter() {
                canvas.draw_path(&kurbo::Shape::to_path(rect, 0.1), FillType::Winding, &paint);
            }
        }
    }
}
