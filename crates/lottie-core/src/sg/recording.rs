//! A [`Canvas`] that records calls instead of rasterizing them.
//!
//! Used to inspect scene output without a graphics backend.

use kurbo::{Affine, BezPath, Rect};

use super::{Canvas, FillType, ImageData, LayerPaint, Paint};

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Save,
    SaveLayer {
        bounds: Option<Rect>,
        paint: LayerPaint,
    },
    Restore,
    Concat(Affine),
    ClipRect(Rect),
    ClipPath {
        path: BezPath,
        fill: FillType,
    },
    DrawPath {
        path: BezPath,
        fill: FillType,
        paint: Paint,
    },
    DrawImage {
        width: u32,
        height: u32,
        dst: Rect,
    },
}

#[derive(Debug, Default)]
pub struct RecordingCanvas {
    commands: Vec<DrawCommand>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn draw_paths(&self) -> Vec<(&BezPath, &Paint)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::DrawPath { path, paint, .. } => Some((path, paint)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&DrawCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| pred(c)).count()
    }
}

impl Canvas for RecordingCanvas {
    fn save(&mut self) {
        self.commands.push(DrawCommand::Save);
    }

    fn save_layer(&mut self, bounds: Option<Rect>, paint: &LayerPaint) {
        self.commands.push(DrawCommand::SaveLayer { bounds, paint: *paint });
    }

    fn restore(&mut self) {
        self.commands.push(DrawCommand::Restore);
    }

    fn concat(&mut self, matrix: Affine) {
        self.commands.push(DrawCommand::Concat(matrix));
    }

    fn clip_rect(&mut self, rect: Rect, _anti_alias: bool) {
        self.commands.push(DrawCommand::ClipRect(rect));
    }

    fn clip_path(&mut self, path: &BezPath, fill: FillType, _anti_alias: bool) {
        self.commands.push(DrawCommand::ClipPath {
            path: path.clone(),
            fill,
        });
    }

    fn draw_path(&mut self, path: &BezPath, fill: FillType, paint: &Paint) {
        self.commands.push(DrawCommand::DrawPath {
            path: path.clone(),
            fill,
            paint: paint.clone(),
        });
    }

    fn draw_image(&mut self, image: &ImageData, dst: Rect) {
        self.commands.push(DrawCommand::DrawImage {
            width: image.width,
            height: image.height,
            dst,
        });
    }
}
