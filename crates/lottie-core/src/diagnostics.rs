//! Structured reporting for recoverable load problems.
//!
//! Attachers never fail the whole animation; they skip the offending
//! primitive and emit a [`Diagnostic`] to the sink configured on the
//! [`AnimationBuilder`](crate::AnimationBuilder).

use std::cell::RefCell;
use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A property node that is neither a static value nor valid keyframes.
    InvalidProperty,
    /// Keyframes out of order or structurally malformed.
    InvalidKeyframes,
    UnknownShape,
    UnknownLayer,
    /// A primitive missing a mandatory field (transform, stroke width, solid color...).
    InvalidPrimitive,
    MissingAsset,
    ResourceLoad,
    Unsupported,
    Cycle,
    InvalidDocument,
}

impl DiagnosticKind {
    /// Stubs for features we knowingly skip are informational.
    pub fn is_informational(self) -> bool {
        matches!(self, DiagnosticKind::Unsupported)
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::InvalidProperty => "invalid-property",
            DiagnosticKind::InvalidKeyframes => "invalid-keyframes",
            DiagnosticKind::UnknownShape => "unknown-shape",
            DiagnosticKind::UnknownLayer => "unknown-layer",
            DiagnosticKind::InvalidPrimitive => "invalid-primitive",
            DiagnosticKind::MissingAsset => "missing-asset",
            DiagnosticKind::ResourceLoad => "resource-load",
            DiagnosticKind::Unsupported => "unsupported",
            DiagnosticKind::Cycle => "cycle",
            DiagnosticKind::InvalidDocument => "invalid-document",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    /// Truncated dump of the document fragment that triggered the report.
    pub fragment: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            fragment: None,
        }
    }

    pub fn with_fragment(mut self, json: &Value) -> Self {
        self.fragment = Some(lottie_data::dump(json));
        self
    }
}

pub trait DiagnosticSink {
    fn report(&self, diagnostic: Diagnostic);
}

/// Default sink: forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, d: Diagnostic) {
        let fragment = d.fragment.as_deref().unwrap_or("");
        if d.kind.is_informational() {
            debug!(kind = %d.kind, fragment, "{}", d.message);
        } else {
            warn!(kind = %d.kind, fragment, "{}", d.message);
        }
    }
}

/// Keeps every diagnostic in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: RefCell<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Diagnostic> {
        self.events.borrow().clone()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.events.borrow().iter().filter(|d| d.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.events.borrow_mut().push(diagnostic);
    }
}
