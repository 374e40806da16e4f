use std::fmt;
use std::io::Read;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use kurbo::{Affine, Point, Rect, Size};
use lottie_data::{parse, parse_default};
use serde_json::Value;
use tracing::debug;

use crate::animator::AnimatorList;
use crate::attach::layer::attach_composition;
use crate::attach::{AssetMap, AttachContext, LoadEnv};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, TracingSink};
use crate::error::{Error, Result};
use crate::resources::{DirectoryResourceProvider, NullResourceProvider, ResourceProvider};
use crate::sg::{Canvas, Scene};

/// Deepest precomposition or nested-animation chain accepted by default.
pub const DEFAULT_MAX_NESTING: usize = 64;

/// Load statistics, filled in once at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    /// Bytes of JSON parsed. Zero when built from an existing value.
    pub json_size: usize,
    pub json_parse_time: Duration,
    pub scene_parse_time: Duration,
    pub total_load_time: Duration,
    pub animator_count: usize,
}

/// Load-time configuration for an [`Animation`].
#[derive(Clone)]
pub struct AnimationBuilder {
    resources: Option<Rc<dyn ResourceProvider>>,
    diagnostics: Rc<dyn DiagnosticSink>,
    max_nesting: usize,
    depth: usize,
}

impl Default for AnimationBuilder {
    fn default() -> Self {
        Self {
            resources: None,
            diagnostics: Rc::new(TracingSink),
            max_nesting: DEFAULT_MAX_NESTING,
            depth: 0,
        }
    }
}

impl AnimationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source for image assets and nested animations. Without one every
    /// lookup fails, except through [`AnimationBuilder::from_file`], which
    /// falls back to the file's directory.
    pub fn resource_provider(mut self, provider: Rc<dyn ResourceProvider>) -> Self {
        self.resources = Some(provider);
        self
    }

    pub fn diagnostics(mut self, sink: Rc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    pub fn max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }

    pub(crate) fn nesting_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn from_slice(&self, bytes: &[u8]) -> Result<Animation> {
        let start = Instant::now();
        let json: Value = serde_json::from_slice(bytes).map_err(|e| self.structural(Error::Json(e), None))?;
        let parse_time = start.elapsed();
        self.build(&json, bytes.len(), start, parse_time)
    }

    pub fn from_reader(&self, mut reader: impl Read) -> Result<Animation> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| self.structural(Error::Io(e), None))?;
        self.from_slice(&bytes)
    }

    pub fn from_file(&self, path: impl AsRef<Path>) -> Result<Animation> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| self.structural(Error::Io(e), None))?;
        if self.resources.is_some() {
            return self.from_slice(&bytes);
        }
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        self.clone()
            .resource_provider(Rc::new(DirectoryResourceProvider::new(dir)))
            .from_slice(&bytes)
    }

    /// Loads `name` through the configured resource provider.
    pub fn from_resource(&self, name: &str) -> Result<Animation> {
        let bytes = self
            .resources
            .as_ref()
            .and_then(|r| r.open_stream(name))
            .ok_or_else(|| Error::ResourceNotFound(name.to_string()))?;
        self.from_slice(&bytes)
    }

    pub fn from_value(&self, json: &Value) -> Result<Animation> {
        self.build(json, 0, Instant::now(), Duration::ZERO)
    }

    /// Reports a structural failure before handing it back.
    fn structural(&self, error: Error, json: Option<&Value>) -> Error {
        let mut diagnostic = Diagnostic::new(DiagnosticKind::InvalidDocument, error.to_string());
        if let Some(json) = json {
            diagnostic = diagnostic.with_fragment(json);
        }
        self.diagnostics.report(diagnostic);
        error
    }

    fn build(&self, json: &Value, json_size: usize, start: Instant, json_parse_time: Duration) -> Result<Animation> {
        if !json.is_object() {
            return Err(self.structural(Error::NotAnObject, Some(json)));
        }
        let Some(version) = parse::<String>(&json["v"]).filter(|v| !v.is_empty()) else {
            return Err(self.structural(Error::MissingVersion, Some(json)));
        };
        let width = parse_default(&json["w"], 0.0f32);
        let height = parse_default(&json["h"], 0.0f32);
        if !(width > 0.0 && height > 0.0) {
            return Err(self.structural(Error::InvalidSize { width, height }, Some(json)));
        }
        let frame_rate = parse_default(&json["fr"], 0.0f32);
        if !(frame_rate > 0.0) {
            return Err(self.structural(Error::InvalidFrameRate(frame_rate), Some(json)));
        }
        let in_point = parse_default(&json["ip"], 0.0f32);
        let out_point = parse_default(&json["op"], f32::MAX).max(in_point);

        let scene_start = Instant::now();
        let assets: AssetMap = json["assets"]
            .as_array()
            .map(|assets| {
                assets
                    .iter()
                    .filter(|a| a.is_object())
                    .map(|a| (parse_default(&a["id"], String::new()), a))
                    .collect()
            })
            .unwrap_or_default();

        let resources = self
            .resources
            .clone()
            .unwrap_or_else(|| Rc::new(NullResourceProvider));
        let env = LoadEnv::new(resources, self.diagnostics.clone(), self.max_nesting, self.depth);
        let mut animators = AnimatorList::new();
        let root = {
            let mut ctx = AttachContext {
                env: &env,
                assets: &assets,
                frame_rate,
                animators: &mut animators,
            };
            attach_composition(json, &mut ctx)
        };

        let stats = Stats {
            json_size,
            json_parse_time,
            scene_parse_time: scene_start.elapsed(),
            total_load_time: start.elapsed(),
            animator_count: animators.len(),
        };
        debug!(
            version = %version,
            json_size = stats.json_size,
            animators = stats.animator_count,
            parse_ms = stats.json_parse_time.as_secs_f64() * 1000.0,
            scene_ms = stats.scene_parse_time.as_secs_f64() * 1000.0,
            "Loaded animation"
        );

        let mut animation = Animation {
            version,
            size: Size::new(width as f64, height as f64),
            frame_rate,
            in_point,
            out_point,
            scene: Scene::new(root, animators),
            stats,
        };
        // Callers may render before their first tick.
        animation.tick(0.0);
        Ok(animation)
    }
}

/// A loaded animation: a scene graph plus the animators driving it.
pub struct Animation {
    version: String,
    size: Size,
    frame_rate: f32,
    in_point: f32,
    out_point: f32,
    scene: Scene,
    stats: Stats,
}

impl fmt::Debug for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animation")
            .field("version", &self.version)
            .field("size", &self.size)
            .field("frame_rate", &self.frame_rate)
            .field("in_point", &self.in_point)
            .field("out_point", &self.out_point)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Animation {
    pub fn builder() -> AnimationBuilder {
        AnimationBuilder::new()
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        AnimationBuilder::new().from_slice(bytes)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        AnimationBuilder::new().from_reader(reader)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        AnimationBuilder::new().from_file(path)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    pub fn in_point(&self) -> f32 {
        self.in_point
    }

    pub fn out_point(&self) -> f32 {
        self.out_point
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        (self.out_point - self.in_point) as f64 / self.frame_rate as f64
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn set_show_inval(&self, show: bool) {
        self.scene.set_show_inval(show);
    }

    /// Device-space regions repainted by the last render.
    pub fn damage(&self) -> Vec<Rect> {
        self.scene.damage()
    }

    /// Renders the current state. With `dst` the animation is scaled
    /// uniformly to fit and centered in it.
    pub fn render(&self, canvas: &mut dyn Canvas, dst: Option<Rect>) {
        let src = Rect::from_origin_size(Point::ZERO, self.size);
        canvas.save();
        if let Some(dst) = dst {
            canvas.concat(center_fit(src, dst));
        }
        canvas.clip_rect(src, false);
        self.scene.render(canvas);
        canvas.restore();
    }

    /// Seeks to `ms` milliseconds, wrapping into `[in_point, out_point)`.
    pub fn tick(&mut self, ms: f64) {
        let frame = (ms * self.frame_rate as f64 / 1000.0) as f32;
        let span = self.out_point - self.in_point;
        let t = if span > 0.0 && span.is_finite() {
            self.in_point + frame.rem_euclid(span)
        } else {
            self.in_point
        };
        self.scene.animate(t);
    }

    /// Seeks to a frame index relative to the in point, clamped to the
    /// animation's range.
    pub fn seek_frame(&mut self, frame: f32) {
        let span = self.out_point - self.in_point;
        self.scene.animate(self.in_point + frame.clamp(0.0, span.max(0.0)));
    }
}

/// Uniform scale-to-fit of `src` into `dst`, centered.
fn center_fit(src: Rect, dst: Rect) -> Affine {
    let scale = (dst.width() / src.width()).min(dst.height() / src.height());
    let tx = dst.x0 + (dst.width() - src.width() * scale) / 2.0 - src.x0 * scale;
    let ty = dst.y0 + (dst.height() - src.height() * scale) / 2.0 - src.y0 * scale;
    Affine::translate((tx, ty)) * Affine::scale(scale)
}
