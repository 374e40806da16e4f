//! Attachers translate one document primitive into scene graph nodes plus
//! the animators that keep those nodes current.
//!
//! Every attacher returns `Option`: `None` means the primitive is skipped.
//! The reason, if any, has already been reported to the diagnostic sink.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::animator::{bind_property, AnimatorList};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::resources::ResourceProvider;
use crate::value::PropertyValue;

pub mod effects;
pub mod geometry;
pub mod layer;
pub mod mask;
pub mod paint;
pub mod shape;
pub mod transform;

/// Load-wide configuration shared by every attacher of one document.
pub struct LoadEnv {
    pub resources: Rc<dyn ResourceProvider>,
    pub diagnostics: Rc<dyn DiagnosticSink>,
    /// Deepest allowed precomposition (and nested animation) chain.
    pub max_nesting: usize,
    /// Nesting level of this document when loaded as a nested animation.
    pub depth: usize,
    /// Ids of the precompositions currently being attached, outermost first.
    pub comp_stack: RefCell<Vec<String>>,
}

impl LoadEnv {
    pub fn new(
        resources: Rc<dyn ResourceProvider>,
        diagnostics: Rc<dyn DiagnosticSink>,
        max_nesting: usize,
        depth: usize,
    ) -> Self {
        Self {
            resources,
            diagnostics,
            max_nesting,
            depth,
            comp_stack: RefCell::new(Vec::new()),
        }
    }

    pub fn report(&self, kind: DiagnosticKind, message: impl Into<String>, json: &Value) {
        self.diagnostics
            .report(Diagnostic::new(kind, message).with_fragment(json));
    }
}

/// Decodes a 1-based enum index, clamping out-of-range values.
pub(crate) fn clamped_index(json: &Value, len: usize) -> usize {
    let raw = lottie_data::parse_default::<i64>(json, 1) - 1;
    raw.clamp(0, len as i64 - 1) as usize
}

pub type AssetMap<'a> = HashMap<String, &'a Value>;

pub struct AttachContext<'a> {
    pub env: &'a LoadEnv,
    pub assets: &'a AssetMap<'a>,
    pub frame_rate: f32,
    pub animators: &'a mut AnimatorList,
}

impl<'a> AttachContext<'a> {
    /// A context that shares everything but appends animators to `animators`.
    pub fn scoped<'b>(&'b self, animators: &'b mut AnimatorList) -> AttachContext<'b> {
        AttachContext {
            env: self.env,
            assets: self.assets,
            frame_rate: self.frame_rate,
            animators,
        }
    }

    pub fn bind<T: PropertyValue>(&mut self, json: &Value, apply: impl Fn(&T) + 'static) -> bool {
        bind_property(json, &mut *self.animators, &*self.env.diagnostics, apply)
    }

    pub fn report(&self, kind: DiagnosticKind, message: impl Into<String>, json: &Value) {
        self.env.report(kind, message, json);
    }
}
