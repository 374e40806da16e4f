//! Independent animations referenced from a precomposition layer by a
//! `$`-prefixed id.

use std::cell::RefCell;
use std::rc::Rc;

use kurbo::{Affine, Point, Rect};
use serde_json::Value;

use crate::animation::{Animation, AnimationBuilder};
use crate::animator::Animator;
use crate::attach::AttachContext;
use crate::diagnostics::DiagnosticKind;
use crate::sg::{Canvas, RenderNode, RevalidationContext};

struct NestedAnimation {
    animation: Rc<RefCell<Animation>>,
}

impl RenderNode for NestedAnimation {
    fn revalidate(&self, ctx: &RevalidationContext, ctm: Affine, _force: bool) -> Rect {
        let size = self.animation.borrow().size();
        let device = ctm.transform_rect_bbox(Rect::from_origin_size(Point::ZERO, size));
        // The inner scene tracks its own invalidation; the whole area is
        // reported as damage here.
        ctx.add_damage(device);
        device
    }

    fn render(&self, canvas: &mut dyn Canvas) {
        self.animation.borrow().render(canvas, None);
    }
}

/// Converts the host layer's frame time into the nested animation's
/// milliseconds.
struct NestedAnimator {
    animation: Rc<RefCell<Animation>>,
    frame_rate: f32,
}

impl Animator for NestedAnimator {
    fn tick(&mut self, t: f32) {
        let ms = t as f64 * 1000.0 / self.frame_rate as f64;
        self.animation.borrow_mut().tick(ms);
    }
}

pub fn attach_nested_animation(path: &str, json: &Value, ctx: &mut AttachContext) -> Option<Rc<dyn RenderNode>> {
    let env = ctx.env;
    let depth = env.depth + env.comp_stack.borrow().len();
    if depth >= env.max_nesting {
        ctx.report(DiagnosticKind::Cycle, format!("Nested animation '{path}' exceeds the nesting limit"), json);
        return None;
    }

    let Some(bytes) = env.resources.open_stream(path) else {
        ctx.report(DiagnosticKind::ResourceLoad, format!("Could not open: {path}"), json);
        return None;
    };

    let loaded = AnimationBuilder::new()
        .resource_provider(env.resources.clone())
        .diagnostics(env.diagnostics.clone())
        .max_nesting(env.max_nesting)
        .nesting_depth(depth + 1)
        .from_slice(&bytes);
    let animation = match loaded {
        Ok(animation) => Rc::new(RefCell::new(animation)),
        Err(e) => {
            ctx.report(DiagnosticKind::ResourceLoad, format!("Could not load nested animation {path}: {e}"), json);
            return None;
        }
    };

    ctx.animators.push(Box::new(NestedAnimator {
        animation: animation.clone(),
        frame_rate: ctx.frame_rate,
    }));
    Some(Rc::new(NestedAnimation { animation }))
}
