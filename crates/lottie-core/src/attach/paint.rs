use std::rc::Rc;

use glam::Vec4;
use lottie_data::parse_default;
use serde_json::Value;

use super::{clamped_index, AttachContext};
use crate::adapter::{GradientAdapter, GradientKind};
use crate::diagnostics::DiagnosticKind;
use crate::sg::{LineCap, LineJoin, PaintNode, PaintStyle};
use crate::value::{to_color, to_point, ScalarValue, VectorValue};

const JOINS: [LineJoin; 3] = [LineJoin::Miter, LineJoin::Round, LineJoin::Bevel];
const CAPS: [LineCap; 3] = [LineCap::Butt, LineCap::Round, LineCap::Square];

fn attach_paint(json: &Value, ctx: &mut AttachContext, paint: Rc<PaintNode>) -> Rc<PaintNode> {
    paint.set_anti_alias(true);
    {
        let paint = paint.clone();
        ctx.bind::<ScalarValue>(&json["o"], move |o| paint.set_opacity(o * 0.01));
    }
    paint
}

fn attach_color(json: &Value, ctx: &mut AttachContext) -> Option<Rc<PaintNode>> {
    let paint = PaintNode::color(Vec4::new(0.0, 0.0, 0.0, 1.0));
    let bound = {
        let paint = paint.clone();
        ctx.bind::<VectorValue>(&json["c"], move |c| paint.set_color(to_color(c)))
    };
    if !bound {
        ctx.report(DiagnosticKind::InvalidPrimitive, "Could not parse color", json);
        return None;
    }
    Some(paint)
}

fn attach_gradient(json: &Value, ctx: &mut AttachContext) -> Option<Rc<PaintNode>> {
    let stops = &json["g"];
    if !stops.is_object() {
        ctx.report(DiagnosticKind::InvalidPrimitive, "Gradient without stops", json);
        return None;
    }
    let count = parse_default::<i64>(&stops["p"], -1);
    if count < 0 {
        ctx.report(DiagnosticKind::InvalidPrimitive, "Invalid gradient stop count", json);
        return None;
    }

    let kind = if parse_default::<i64>(&json["t"], 1) == 1 {
        GradientKind::Linear
    } else {
        GradientKind::Radial
    };

    let paint = PaintNode::new();
    let count = usize::try_from(count).unwrap_or(usize::MAX);
    let adapter = GradientAdapter::new(paint.clone(), kind, count);
    {
        let adapter = adapter.clone();
        ctx.bind::<VectorValue>(&stops["k"], move |s| adapter.set_color_stops(s));
    }
    {
        let adapter = adapter.clone();
        ctx.bind::<VectorValue>(&json["s"], move |p| adapter.set_start_point(to_point(p)));
    }
    ctx.bind::<VectorValue>(&json["e"], move |p| adapter.set_end_point(to_point(p)));

    Some(paint)
}

fn attach_stroke(json: &Value, ctx: &mut AttachContext, paint: Rc<PaintNode>) -> Option<Rc<PaintNode>> {
    paint.set_style(PaintStyle::Stroke);

    let width_bound = {
        let paint = paint.clone();
        ctx.bind::<ScalarValue>(&json["w"], move |w| paint.set_stroke_width(*w))
    };
    if !width_bound {
        ctx.report(DiagnosticKind::InvalidPrimitive, "Stroke without width", json);
        return None;
    }

    paint.set_stroke_miter(parse_default(&json["ml"], 4.0f32));
    paint.set_stroke_join(JOINS[clamped_index(&json["lj"], JOINS.len())]);
    paint.set_stroke_cap(CAPS[clamped_index(&json["lc"], CAPS.len())]);

    Some(paint)
}

pub fn attach_color_fill(json: &Value, ctx: &mut AttachContext) -> Option<Rc<PaintNode>> {
    let color = attach_color(json, ctx)?;
    Some(attach_paint(json, ctx, color))
}

pub fn attach_gradient_fill(json: &Value, ctx: &mut AttachContext) -> Option<Rc<PaintNode>> {
    let gradient = attach_gradient(json, ctx)?;
    Some(attach_paint(json, ctx, gradient))
}

pub fn attach_color_stroke(json: &Value, ctx: &mut AttachContext) -> Option<Rc<PaintNode>> {
    let color = attach_color(json, ctx)?;
    let paint = attach_paint(json, ctx, color);
    attach_stroke(json, ctx, paint)
}

pub fn attach_gradient_stroke(json: &Value, ctx: &mut AttachContext) -> Option<Rc<PaintNode>> {
    let gradient = attach_gradient(json, ctx)?;
    let paint = attach_paint(json, ctx, gradient);
    attach_stroke(json, ctx, paint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animator::AnimatorList;
    use crate::attach::{AssetMap, LoadEnv};
    use crate::diagnostics::RecordingSink;
    use crate::resources::NullResourceProvider;
    use crate::sg::Shader;
    use serde_json::json;

    fn with_ctx(f: impl FnOnce(&mut AttachContext, &RecordingSink)) {
        let sink = Rc::new(RecordingSink::new());
        let env = LoadEnv::new(Rc::new(NullResourceProvider), sink.clone(), 64, 0);
        let assets = AssetMap::new();
        let mut animators = AnimatorList::new();
        let mut ctx = AttachContext { env: &env, assets: &assets, frame_rate: 30.0, animators: &mut animators };
        f(&mut ctx, &*sink);
    }

    #[test]
    fn test_fill_color_and_opacity() {
        with_ctx(|ctx, _| {
            let fill = json!({ "ty": "fl", "c": { "a": 0, "k": [1, 0, 0, 1] }, "o": { "a": 0, "k": 50 } });
            let paint = attach_color_fill(&fill, ctx).unwrap().to_paint();
            assert_eq!(paint.shader, Shader::Solid(Vec4::new(1.0, 0.0, 0.0, 1.0)));
            assert_eq!(paint.opacity, 0.5);
            assert!(paint.anti_alias);
            assert_eq!(paint.style, PaintStyle::Fill);
        });
    }

    #[test]
    fn test_stroke_requires_width_and_clamps_enums() {
        with_ctx(|ctx, sink| {
            let no_width = json!({ "ty": "st", "c": { "a": 0, "k": [0, 0, 0] } });
            assert!(attach_color_stroke(&no_width, ctx).is_none());
            assert_eq!(sink.count(DiagnosticKind::InvalidPrimitive), 1);

            let stroke = json!({
                "ty": "st", "c": { "a": 0, "k": [0, 0, 0] }, "w": { "a": 0, "k": 4 },
                "lj": 9, "lc": -3
            });
            let paint = attach_color_stroke(&stroke, ctx).unwrap().to_paint();
            assert_eq!(paint.style, PaintStyle::Stroke);
            assert_eq!(paint.stroke.width, 4.0);
            assert_eq!(paint.stroke.miter_limit, 4.0);
            assert_eq!(paint.stroke.join, LineJoin::Bevel);
            assert_eq!(paint.stroke.cap, LineCap::Butt);
        });
    }

    #[test]
    fn test_gradient_type_selection() {
        with_ctx(|ctx, _| {
            let grad = json!({
                "ty": "gf", "t": 2,
                "g": { "p": 2, "k": { "a": 0, "k": [0, 1, 0, 0, 1, 0, 0, 1] } },
                "s": { "a": 0, "k": [0, 0] }, "e": { "a": 0, "k": [3, 4] }
            });
            let paint = attach_gradient_fill(&grad, ctx).unwrap().to_paint();
            match paint.shader {
                Shader::Radial { radius, stops, .. } => {
                    assert_eq!(radius, 5.0);
                    assert_eq!(stops.len(), 2);
                }
                other => panic!("expected radial, got {other:?}"),
            }

            let bad = json!({ "ty": "gf", "g": { "p": -1 } });
            assert!(attach_gradient_fill(&bad, ctx).is_none());
        });
    }

    #[test]
    fn test_gradient_stop_count_bounds() {
        with_ctx(|ctx, sink| {
            let grad = |p: Value| {
                json!({
                    "ty": "gf", "t": 1,
                    "g": { "p": p, "k": { "a": 0, "k": [0, 1, 0, 0, 1, 0, 0, 1] } },
                    "s": { "a": 0, "k": [0, 0] }, "e": { "a": 0, "k": [10, 0] }
                })
            };
            let stops = |paint: Rc<PaintNode>| match paint.to_paint().shader {
                Shader::Linear { stops, .. } => stops,
                other => panic!("expected linear, got {other:?}"),
            };

            assert!(stops(attach_gradient_fill(&grad(json!(0)), ctx).unwrap()).is_empty());
            assert_eq!(stops(attach_gradient_fill(&grad(json!(i64::MAX)), ctx).unwrap()).len(), 2);

            assert!(attach_gradient_fill(&grad(json!(-5)), ctx).is_none());
            assert_eq!(sink.count(DiagnosticKind::InvalidPrimitive), 1);
        });
    }
}
