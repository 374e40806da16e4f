//! # Lottie Player
//!
//! Loads a Lottie document from disk, seeks it to a set of timestamps and
//! writes each frame as a PNG through the Skia backend.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lottie_core::Animation;
use lottie_skia::{encode_png, render_raster};
use skia_safe::Color;
use tracing::{debug, info};

/// Which timestamps to render.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameSelection {
    /// Explicit timestamps in milliseconds.
    Times(Vec<f64>),
    /// `n` timestamps spread evenly over the animation's duration.
    Count(usize),
}

impl FrameSelection {
    pub fn resolve(&self, animation: &Animation) -> Vec<f64> {
        match self {
            FrameSelection::Times(times) => times.clone(),
            FrameSelection::Count(0) => Vec::new(),
            FrameSelection::Count(1) => vec![0.0],
            FrameSelection::Count(n) => {
                let duration_ms = animation.duration() * 1000.0;
                // Stop one step short of the end, which wraps back to the start.
                let step = duration_ms / *n as f64;
                (0..*n).map(|i| i as f64 * step).collect()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub width: i32,
    pub height: i32,
    pub background: Color,
    pub show_inval: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            background: Color::TRANSPARENT,
            show_inval: false,
        }
    }
}

/// Renders `frames` of the animation at `input` into `out_dir` as
/// `frame_NNNN.png`, returning the written paths in order.
pub fn render_frames(input: &Path, out_dir: &Path, frames: &FrameSelection, options: &RenderOptions) -> Result<Vec<PathBuf>> {
    let mut animation =
        Animation::from_file(input).with_context(|| format!("Failed to load animation {}", input.display()))?;
    info!(
        version = animation.version(),
        width = animation.size().width,
        height = animation.size().height,
        fps = animation.frame_rate(),
        duration = animation.duration(),
        "Loaded animation"
    );
    animation.set_show_inval(options.show_inval);

    fs::create_dir_all(out_dir).with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let times = frames.resolve(&animation);
    let mut written = Vec::with_capacity(times.len());
    for (i, &ms) in times.iter().enumerate() {
        animation.tick(ms);
        let image = render_raster(&animation, options.width, options.height, options.background)?;
        let png = encode_png(&image)?;

        let path = out_dir.join(format!("frame_{i:04}.png"));
        fs::write(&path, png).with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(frame = i, ms, path = %path.display(), "Wrote frame");
        written.push(path);
    }

    info!(frames = written.len(), out_dir = %out_dir.display(), "Render complete");
    Ok(written)
}
