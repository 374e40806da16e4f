//! Layers and compositions.

use std::collections::HashMap;
use std::rc::Rc;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use glam::Vec4;
use kurbo::Rect;
use lottie_data::{parse, parse_default};
use serde_json::Value;
use tracing::debug;

use super::mask::attach_mask;
use super::shape::attach_shape_list;
use super::transform::{attach_matrix, attach_opacity};
use super::AttachContext;
use crate::animator::{Animator, AnimatorList};
use crate::diagnostics::DiagnosticKind;
use crate::nested::attach_nested_animation;
use crate::resources::join_asset_path;
use crate::sg::{
    ClipEffect, Draw, Group, Image, ImageData, MaskEffect, MaskMode, Matrix, OpacityEffect,
    PaintNode, RectGeometry, RenderNode, Transform,
};

/// Maps composition time onto a layer's local time:
/// `local = (t + bias) * scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerTiming {
    pub bias: f32,
    pub scale: f32,
}

impl Default for LayerTiming {
    fn default() -> Self {
        Self { bias: 0.0, scale: 1.0 }
    }
}

type LayerAttachFn = fn(&Value, &mut AttachContext, &mut LayerTiming) -> Option<Rc<dyn RenderNode>>;

/// Indexed by the layer `ty` code.
const LAYER_ATTACHERS: [LayerAttachFn; 6] = [
    attach_comp_layer,
    attach_solid_layer,
    attach_image_layer,
    attach_null_layer,
    attach_shape_layer,
    attach_text_layer,
];

/// Gates a layer to its in/out window and drives its local animators.
struct LayerController {
    animators: AnimatorList,
    node: Rc<OpacityEffect>,
    in_point: f32,
    out_point: f32,
    timing: LayerTiming,
}

impl Animator for LayerController {
    fn tick(&mut self, t: f32) {
        let active = t >= self.in_point && t <= self.out_point;
        // Opacity 0 skips the subtree entirely; 1 is a pass-through.
        self.node.set_opacity(if active { 1.0 } else { 0.0 });
        if active {
            let local = (t + self.timing.bias) * self.timing.scale;
            for animator in &mut self.animators {
                animator.tick(local);
            }
        }
    }
}

/// Per-composition state: the parent matrix cache and the pending matte.
pub struct LayerContext<'j> {
    layers: &'j [Value],
    matrices: HashMap<i64, Option<Rc<Matrix>>>,
    current_matte: Option<Rc<dyn RenderNode>>,
}

impl<'j> LayerContext<'j> {
    pub fn new(layers: &'j [Value]) -> Self {
        Self {
            layers,
            matrices: HashMap::new(),
            current_matte: None,
        }
    }

    fn attach_parent_matrix(&mut self, layer: &Value, ctx: &mut AttachContext) -> Option<Rc<Matrix>> {
        let parent = parse_default::<i64>(&layer["parent"], -1);
        if parent < 0 {
            return None;
        }
        if let Some(matrix) = self.matrices.get(&parent) {
            return matrix.clone();
        }
        let layers = self.layers;
        let parent_layer = layers
            .iter()
            .find(|l| parse_default::<i64>(&l["ind"], -1) == parent)?;
        self.attach_layer_matrix(parent_layer, ctx)
    }

    /// Resolves a layer's world matrix, memoized by `ind`.
    fn attach_layer_matrix(&mut self, layer: &Value, ctx: &mut AttachContext) -> Option<Rc<Matrix>> {
        let index = parse_default::<i64>(&layer["ind"], -1);
        if index >= 0 {
            if let Some(matrix) = self.matrices.get(&index) {
                return matrix.clone();
            }
            // Placeholder: a parent chain leading back here resolves to no
            // transform for the cyclic edge.
            self.matrices.insert(index, None);
        }

        let parent = self.attach_parent_matrix(layer, ctx);
        let matrix = match &layer["ks"] {
            ks if ks.is_object() => attach_matrix(ks, ctx, parent.clone()).or(parent),
            _ => parent,
        };
        if index >= 0 {
            self.matrices.insert(index, matrix.clone());
        }
        matrix
    }

    pub fn attach_layer(&mut self, layer: &Value, ctx: &mut AttachContext) -> Option<Rc<dyn RenderNode>> {
        if !layer.is_object() {
            return None;
        }

        let ty = parse_default::<i64>(&layer["ty"], -1);
        let Some(attach) = usize::try_from(ty).ok().and_then(|i| LAYER_ATTACHERS.get(i)) else {
            ctx.report(DiagnosticKind::UnknownLayer, format!("Unsupported layer type: {ty}"), layer);
            return None;
        };
        if !layer["tm"].is_null() {
            ctx.report(DiagnosticKind::Unsupported, "Time remapping is not supported", layer);
            return None;
        }

        let in_point = parse_default(&layer["ip"], 0.0f32);
        let out_point = parse_default(&layer["op"], in_point);
        if in_point >= out_point {
            debug!(in_point, out_point, "Dropping layer with empty lifespan");
            return None;
        }

        let mut layer_animators = AnimatorList::new();
        let mut timing = LayerTiming::default();

        let content = {
            let mut local = ctx.scoped(&mut layer_animators);
            attach(layer, &mut local, &mut timing).map(|node| {
                // Explicit dimensions clip the content.
                let node = match (parse::<f32>(&layer["w"]), parse::<f32>(&layer["h"])) {
                    (Some(w), Some(h)) => {
                        let clip = RectGeometry::new(Rect::new(0.0, 0.0, w as f64, h as f64));
                        ClipEffect::new(node, clip) as Rc<dyn RenderNode>
                    }
                    _ => node,
                };
                attach_mask(&layer["masksProperties"], &mut local, node)
            })
        };
        let mut node = content?;

        if let Some(matrix) = self.attach_layer_matrix(layer, ctx) {
            node = Transform::new(node, matrix);
        }
        node = attach_opacity(&layer["ks"], &mut ctx.scoped(&mut layer_animators), node);

        let controller = OpacityEffect::new(node, 1.0);
        ctx.animators.push(Box::new(LayerController {
            animators: layer_animators,
            node: controller.clone(),
            in_point,
            out_point,
            timing,
        }));

        if parse_default(&layer["td"], false) {
            // Held back and applied to the next layer.
            self.current_matte = Some(controller as Rc<dyn RenderNode>);
            return None;
        }

        let node: Rc<dyn RenderNode> = controller;
        if let Some(matte) = self.current_matte.take() {
            let mode = match parse_default::<i64>(&layer["tt"], 1) {
                1 => Some(MaskMode::Normal),
                2 => Some(MaskMode::Invert),
                _ => None,
            };
            match mode {
                Some(mode) => return Some(MaskEffect::new(node, matte, mode)),
                None => debug!("Dropping unused track matte"),
            }
        }
        Some(node)
    }
}

/// Attaches the `layers` of a composition (the document root or a
/// precomposition asset) into a group painted bottom layer first.
pub fn attach_composition(json: &Value, ctx: &mut AttachContext) -> Option<Rc<dyn RenderNode>> {
    let layers = json["layers"].as_array()?;
    let mut layer_ctx = LayerContext::new(layers);

    let nodes: Vec<Rc<dyn RenderNode>> = layers
        .iter()
        .filter_map(|layer| layer_ctx.attach_layer(layer, ctx))
        .collect();
    if nodes.is_empty() {
        return None;
    }
    Some(Group::new(nodes.into_iter().rev().collect()))
}

fn attach_comp_layer(json: &Value, ctx: &mut AttachContext, timing: &mut LayerTiming) -> Option<Rc<dyn RenderNode>> {
    let Some(ref_id) = json["refId"].as_str() else {
        ctx.report(DiagnosticKind::InvalidPrimitive, "Comp layer missing refId", json);
        return None;
    };

    let start_time = parse_default(&json["st"], 0.0f32);
    let stretch = parse_default(&json["sr"], 1.0f32);
    timing.bias = -start_time;
    timing.scale = 1.0 / stretch;
    if !timing.scale.is_finite() {
        timing.scale = 1.0;
    }

    if let Some(path) = ref_id.strip_prefix('$') {
        return attach_nested_animation(path, json, ctx);
    }

    let assets = ctx.assets;
    let Some(&comp) = assets.get(ref_id) else {
        ctx.report(DiagnosticKind::MissingAsset, format!("Precomp not found: '{ref_id}'"), json);
        return None;
    };

    let rejected = {
        let stack = ctx.env.comp_stack.borrow();
        stack.iter().any(|id| id == ref_id) || ctx.env.depth + stack.len() >= ctx.env.max_nesting
    };
    if rejected {
        ctx.report(DiagnosticKind::Cycle, format!("Precomp '{ref_id}' references itself"), json);
        return None;
    }

    ctx.env.comp_stack.borrow_mut().push(ref_id.to_string());
    let node = attach_composition(comp, ctx);
    ctx.env.comp_stack.borrow_mut().pop();
    node
}

/// Parses `#rrggbb`; the result is always opaque.
fn parse_hex_color(s: &str) -> Option<Vec4> {
    let hex = s.strip_prefix('#')?;
    let c = u32::from_str_radix(hex, 16).ok()?;
    let channel = |shift: u32| ((c >> shift) & 0xff) as f32 / 255.0;
    Some(Vec4::new(channel(16), channel(8), channel(0), 1.0))
}

fn attach_solid_layer(json: &Value, ctx: &mut AttachContext, _timing: &mut LayerTiming) -> Option<Rc<dyn RenderNode>> {
    let width = parse_default(&json["sw"], 0.0f32);
    let height = parse_default(&json["sh"], 0.0f32);
    let color = json["sc"].as_str().and_then(parse_hex_color);

    match color {
        Some(color) if width > 0.0 && height > 0.0 => {
            let rect = RectGeometry::new(Rect::new(0.0, 0.0, width as f64, height as f64));
            Some(Draw::new(rect, PaintNode::color(color)))
        }
        _ => {
            ctx.report(DiagnosticKind::InvalidPrimitive, "Could not parse solid layer", json);
            None
        }
    }
}

fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let (_, payload) = uri.split_once(";base64,")?;
    BASE64_STANDARD.decode(payload).ok()
}

fn attach_image_asset(asset: &Value, ctx: &mut AttachContext) -> Option<Rc<dyn RenderNode>> {
    let Some(name) = asset["p"].as_str() else {
        ctx.report(DiagnosticKind::InvalidPrimitive, "Image asset missing path", asset);
        return None;
    };

    let (source, bytes) = if name.starts_with("data:") {
        ("data URI".to_string(), decode_data_uri(name))
    } else {
        let path = join_asset_path(asset["u"].as_str().unwrap_or(""), name);
        let bytes = ctx.env.resources.open_stream(&path);
        (path, bytes)
    };
    let Some(bytes) = bytes else {
        ctx.report(DiagnosticKind::ResourceLoad, format!("Could not load image resource: {source}"), asset);
        return None;
    };

    match ImageData::decode(&bytes) {
        Ok(image) => Some(Image::new(Rc::new(image))),
        Err(e) => {
            ctx.report(DiagnosticKind::ResourceLoad, format!("Could not decode image {source}: {e}"), asset);
            None
        }
    }
}

fn attach_image_layer(json: &Value, ctx: &mut AttachContext, _timing: &mut LayerTiming) -> Option<Rc<dyn RenderNode>> {
    let Some(ref_id) = json["refId"].as_str() else {
        ctx.report(DiagnosticKind::InvalidPrimitive, "Image layer missing refId", json);
        return None;
    };
    let assets = ctx.assets;
    let Some(&asset) = assets.get(ref_id) else {
        ctx.report(DiagnosticKind::MissingAsset, format!("Image asset not found: '{ref_id}'"), json);
        return None;
    };
    attach_image_asset(asset, ctx)
}

/// Null layers only exist to be parented to.
fn attach_null_layer(_json: &Value, _ctx: &mut AttachContext, _timing: &mut LayerTiming) -> Option<Rc<dyn RenderNode>> {
    None
}

fn attach_shape_layer(json: &Value, ctx: &mut AttachContext, _timing: &mut LayerTiming) -> Option<Rc<dyn RenderNode>> {
    attach_shape_list(&json["shapes"], ctx)
}

fn attach_text_layer(json: &Value, ctx: &mut AttachContext, _timing: &mut LayerTiming) -> Option<Rc<dyn RenderNode>> {
    ctx.report(DiagnosticKind::Unsupported, "Text layer stub", json);
    None
}
