//! Lottie interpreter: builds a retained scene graph from a Lottie document
//! and drives it through time.
//!
//! ```no_run
//! use lottie_core::Animation;
//! use lottie_core::sg::recording::RecordingCanvas;
//!
//! let mut animation = Animation::from_file("animation.json")?;
//! animation.tick(500.0);
//! animation.render(&mut RecordingCanvas::new(), None);
//! # Ok::<(), lottie_core::Error>(())
//! ```

pub mod adapter;
pub mod animation;
pub mod animator;
pub mod attach;
pub mod diagnostics;
pub mod error;
mod nested;
pub mod resources;
pub mod sg;
pub mod value;

pub use animation::{Animation, AnimationBuilder, Stats, DEFAULT_MAX_NESTING};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, RecordingSink, TracingSink};
pub use error::{Error, Result};
pub use resources::{DirectoryResourceProvider, NullResourceProvider, ResourceProvider};
