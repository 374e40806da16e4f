use std::rc::Rc;

use lottie_data::parse_default;
use serde_json::Value;

use super::AttachContext;
use crate::adapter::TransformAdapter;
use crate::diagnostics::DiagnosticKind;
use crate::sg::{Matrix, OpacityEffect, RenderNode};
use crate::value::{to_point, ScalarValue, VectorValue};

/// Fully opaque, on the document's 0-100 scale.
const OPACITY_OPAQUE: f32 = 100.0;

/// Attaches a transform object (`a`, `p`, `s`, `r`/`rz`, `sk`, `sa`) as a
/// matrix chained to `parent`.
pub fn attach_matrix(
    json: &Value,
    ctx: &mut AttachContext,
    parent: Option<Rc<Matrix>>,
) -> Option<Rc<Matrix>> {
    if !json.is_object() {
        return None;
    }

    let matrix = Matrix::new(parent);
    let adapter = TransformAdapter::new(matrix.clone());

    let anchor = {
        let adapter = adapter.clone();
        ctx.bind::<VectorValue>(&json["a"], move |v| adapter.set_anchor_point(to_point(v)))
    };
    let position = attach_position(&json["p"], ctx, &adapter);
    let scale = {
        let adapter = adapter.clone();
        ctx.bind::<VectorValue>(&json["s"], move |v| adapter.set_scale(to_point(v).to_vec2()))
    };
    // 3D rotation is approximated by its z component.
    let rotation_json = if json.get("r").is_some() { &json["r"] } else { &json["rz"] };
    let rotation = {
        let adapter = adapter.clone();
        ctx.bind::<ScalarValue>(rotation_json, move |r| adapter.set_rotation(*r as f64))
    };
    let skew = {
        let adapter = adapter.clone();
        ctx.bind::<ScalarValue>(&json["sk"], move |sk| adapter.set_skew(*sk as f64))
    };
    let skew_axis = {
        let adapter = adapter.clone();
        ctx.bind::<ScalarValue>(&json["sa"], move |sa| adapter.set_skew_axis(*sa as f64))
    };

    if !(anchor || position || scale || rotation || skew || skew_axis) {
        ctx.report(DiagnosticKind::InvalidPrimitive, "Could not parse transform", json);
        return None;
    }

    Some(matrix)
}

fn attach_position(json: &Value, ctx: &mut AttachContext, adapter: &Rc<TransformAdapter>) -> bool {
    if !parse_default(&json["s"], false) {
        let adapter = adapter.clone();
        return ctx.bind::<VectorValue>(json, move |v| adapter.set_position(to_point(v)));
    }

    // Split position: independent x and y properties.
    let x = {
        let adapter = adapter.clone();
        ctx.bind::<ScalarValue>(&json["x"], move |x| adapter.set_position_x(*x as f64))
    };
    let y = {
        let adapter = adapter.clone();
        ctx.bind::<ScalarValue>(&json["y"], move |y| adapter.set_position_y(*y as f64))
    };
    x || y
}

/// Wraps `child` in an opacity node bound to the transform's `o`, unless the
/// opacity is statically opaque.
pub fn attach_opacity(
    json: &Value,
    ctx: &mut AttachContext,
    child: Rc<dyn RenderNode>,
) -> Rc<dyn RenderNode> {
    if !json.is_object() {
        return child;
    }

    let opacity = &json["o"];
    if opacity.is_object()
        && !parse_default(&opacity["a"], true)
        && parse_default(&opacity["k"], -1.0f32) == OPACITY_OPAQUE
    {
        return child;
    }

    let node = OpacityEffect::new(child.clone(), 1.0);
    let bound = {
        let node = node.clone();
        ctx.bind::<ScalarValue>(opacity, move |o| node.set_opacity(o * 0.01))
    };
    if !bound {
        return child;
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animator::AnimatorList;
    use crate::attach::{AssetMap, LoadEnv};
    use crate::diagnostics::RecordingSink;
    use crate::resources::NullResourceProvider;
    use crate::sg::Group;
    use kurbo::Point;
    use serde_json::json;

    fn env(sink: Rc<RecordingSink>) -> LoadEnv {
        LoadEnv::new(Rc::new(NullResourceProvider), sink, 64, 0)
    }

    #[test]
    fn test_static_opaque_is_elided() {
        let env = env(Rc::new(RecordingSink::new()));
        let assets = AssetMap::new();
        let mut animators = AnimatorList::new();
        let mut ctx = AttachContext { env: &env, assets: &assets, frame_rate: 30.0, animators: &mut animators };

        let child: Rc<dyn RenderNode> = Group::new(vec![]);
        let opaque = attach_opacity(&json!({ "o": { "a": 0, "k": 100 } }), &mut ctx, child.clone());
        assert!(Rc::ptr_eq(&opaque, &child));

        let translucent = attach_opacity(&json!({ "o": { "a": 0, "k": 99 } }), &mut ctx, child.clone());
        assert!(!Rc::ptr_eq(&translucent, &child));
        assert!(animators.is_empty());
    }

    #[test]
    fn test_matrix_needs_one_property() {
        let sink = Rc::new(RecordingSink::new());
        let env = env(sink.clone());
        let assets = AssetMap::new();
        let mut animators = AnimatorList::new();
        let mut ctx = AttachContext { env: &env, assets: &assets, frame_rate: 30.0, animators: &mut animators };

        assert!(attach_matrix(&json!({}), &mut ctx, None).is_none());
        assert_eq!(sink.count(DiagnosticKind::InvalidPrimitive), 1);

        let m = attach_matrix(&json!({ "rz": { "a": 0, "k": 90 } }), &mut ctx, None).unwrap();
        let p = m.total() * Point::new(1.0, 0.0);
        assert!((p - Point::new(0.0, 1.0)).hypot() < 1e-9);
    }

    #[test]
    fn test_split_position_binds_axes() {
        let env = env(Rc::new(RecordingSink::new()));
        let assets = AssetMap::new();
        let mut animators = AnimatorList::new();
        let mut ctx = AttachContext { env: &env, assets: &assets, frame_rate: 30.0, animators: &mut animators };

        let t = json!({ "p": { "s": true, "x": { "a": 0, "k": 3 }, "y": { "a": 1, "k": [
            { "t": 0, "s": [0] }, { "t": 10, "s": [10] }
        ] } } });
        let m = attach_matrix(&t, &mut ctx, None).unwrap();
        assert_eq!(animators.len(), 1);
        animators[0].tick(5.0);
        assert_eq!(m.total() * Point::ZERO, Point::new(3.0, 5.0));
    }
}
