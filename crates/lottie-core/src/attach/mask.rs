use std::rc::Rc;

use glam::Vec4;
use lottie_data::{parse, parse_default};
use serde_json::Value;

use super::geometry::attach_path_property;
use super::AttachContext;
use crate::diagnostics::DiagnosticKind;
use crate::sg::{BlendMode, ClipEffect, Draw, FillType, Group, MaskEffect, MaskMode, PaintNode, Path, RenderNode};
use crate::value::ScalarValue;

enum MaskBlend {
    Apply(BlendMode),
    /// Mode `n`: the mask does nothing.
    Skip,
    Unknown,
}

fn mask_blend(mode: &str) -> MaskBlend {
    let mut chars = mode.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return MaskBlend::Unknown;
    };
    match c {
        'a' => MaskBlend::Apply(BlendMode::SrcOver),
        's' => MaskBlend::Apply(BlendMode::Exclusion),
        'i' => MaskBlend::Apply(BlendMode::DstIn),
        'l' => MaskBlend::Apply(BlendMode::Lighten),
        'd' => MaskBlend::Apply(BlendMode::Darken),
        'f' => MaskBlend::Apply(BlendMode::Difference),
        'n' => MaskBlend::Skip,
        _ => MaskBlend::Unknown,
    }
}

struct MaskRecord {
    path: Rc<Path>,
    paint: Rc<PaintNode>,
}

/// Applies a layer's `masksProperties` to `child`.
pub fn attach_mask(json: &Value, ctx: &mut AttachContext, child: Rc<dyn RenderNode>) -> Rc<dyn RenderNode> {
    let Some(masks) = json.as_array() else {
        return child;
    };

    let mut records = Vec::with_capacity(masks.len());
    let mut opaque = true;
    for mask in masks.iter().filter(|m| m.is_object()) {
        let mode = parse::<String>(&mask["mode"]).unwrap_or_default();
        let blend_mode = match mask_blend(&mode) {
            MaskBlend::Apply(blend_mode) => blend_mode,
            MaskBlend::Skip => continue,
            MaskBlend::Unknown => {
                ctx.report(DiagnosticKind::Unsupported, format!("Unsupported mask mode: '{mode}'"), mask);
                continue;
            }
        };

        let Some(path) = attach_path_property(&mask["pt"], ctx) else {
            ctx.report(DiagnosticKind::InvalidPrimitive, "Could not parse mask path", mask);
            continue;
        };
        path.set_fill_type(if parse_default(&mask["inv"], false) {
            FillType::InverseWinding
        } else {
            FillType::Winding
        });

        let paint = PaintNode::color(Vec4::new(0.0, 0.0, 0.0, 1.0));
        paint.set_anti_alias(true);
        paint.set_blend_mode(blend_mode);

        let before = ctx.animators.len();
        {
            let paint = paint.clone();
            ctx.bind::<ScalarValue>(&mask["o"], move |o| paint.set_opacity(o * 0.01));
        }
        let animated = ctx.animators.len() > before;
        opaque &= !animated && paint.opacity() >= 1.0;

        records.push(MaskRecord { path, paint });
    }

    if records.is_empty() {
        return child;
    }
    if records.len() == 1 && opaque {
        let path = records.remove(0).path;
        return ClipEffect::new(child, path);
    }

    let group = Group::new(Vec::new());
    for record in records {
        group.add_child(Draw::new(record.path, record.paint));
    }
    MaskEffect::new(child, group, MaskMode::Normal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animator::AnimatorList;
    use crate::attach::{AssetMap, LoadEnv};
    use crate::diagnostics::RecordingSink;
    use crate::resources::NullResourceProvider;
    use crate::sg::recording::{DrawCommand, RecordingCanvas};
    use crate::sg::{Canvas, RevalidationContext};
    use kurbo::Affine;
    use serde_json::json;

    fn square() -> serde_json::Value {
        json!({ "a": 0, "k": { "c": true, "v": [[0, 0], [10, 0], [10, 10], [0, 10]] } })
    }

    fn render(masks: serde_json::Value) -> (RecordingCanvas, Rc<RecordingSink>) {
        let sink = Rc::new(RecordingSink::new());
        let env = LoadEnv::new(Rc::new(NullResourceProvider), sink.clone(), 64, 0);
        let assets = AssetMap::new();
        let mut animators = AnimatorList::new();
        let mut ctx = AttachContext { env: &env, assets: &assets, frame_rate: 30.0, animators: &mut animators };

        let node = attach_mask(&masks, &mut ctx, Group::new(Vec::new()));
        let mut canvas = RecordingCanvas::new();
        node.revalidate(&RevalidationContext::new(1, &canvas), Affine::IDENTITY, false);
        node.render(&mut canvas as &mut dyn Canvas);
        (canvas, sink)
    }

    #[test]
    fn test_single_opaque_mask_is_a_clip() {
        let (canvas, _) = render(json!([{ "mode": "a", "pt": square(), "o": { "a": 0, "k": 100 } }]));
        assert_eq!(canvas.count(|c| matches!(c, DrawCommand::ClipPath { .. })), 1);
        assert_eq!(canvas.count(|c| matches!(c, DrawCommand::SaveLayer { .. })), 0);
    }

    #[test]
    fn test_translucent_or_multiple_masks_composite() {
        let (canvas, _) = render(json!([{ "mode": "a", "pt": square(), "o": { "a": 0, "k": 50 } }]));
        assert_eq!(canvas.count(|c| matches!(c, DrawCommand::SaveLayer { .. })), 2);
        let paths = canvas.draw_paths();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].1.opacity, 0.5);

        let (canvas, _) = render(json!([
            { "mode": "a", "pt": square() },
            { "mode": "s", "pt": square(), "inv": true }
        ]));
        let fills: Vec<_> = canvas
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::DrawPath { fill, paint, .. } => Some((*fill, paint.blend_mode)),
                _ => None,
            })
            .collect();
        assert_eq!(
            fills,
            vec![(FillType::Winding, BlendMode::SrcOver), (FillType::InverseWinding, BlendMode::Exclusion)]
        );
    }

    #[test]
    fn test_none_and_unknown_modes_are_skipped() {
        let (canvas, sink) = render(json!([
            { "mode": "n", "pt": square() },
            { "mode": "add", "pt": square() }
        ]));
        assert!(canvas.commands().is_empty());
        assert_eq!(sink.count(DiagnosticKind::Unsupported), 1);
    }
}
