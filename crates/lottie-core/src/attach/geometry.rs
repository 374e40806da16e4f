use std::rc::Rc;

use kurbo::Size;
use lottie_data::parse_default;
use serde_json::Value;

use super::AttachContext;
use crate::adapter::{PolyStarAdapter, PolyStarKind};
use crate::diagnostics::DiagnosticKind;
use crate::sg::{GeometryNode, Path, RRect};
use crate::value::{to_path, to_point, to_size, ScalarValue, ShapeValue, VectorValue};

/// Binds a shape-valued property to a fresh path node.
pub fn attach_path_property(json: &Value, ctx: &mut AttachContext) -> Option<Rc<Path>> {
    let path = Path::new();
    let bound = {
        let path = path.clone();
        ctx.bind::<ShapeValue>(json, move |shape| path.set_path(to_path(shape)))
    };
    bound.then_some(path)
}

pub fn attach_path_geometry(json: &Value, ctx: &mut AttachContext) -> Option<Rc<dyn GeometryNode>> {
    attach_path_property(&json["ks"], ctx).map(|p| p as Rc<dyn GeometryNode>)
}

pub fn attach_rrect_geometry(json: &Value, ctx: &mut AttachContext) -> Option<Rc<dyn GeometryNode>> {
    let rrect = RRect::new();

    let position = {
        let rrect = rrect.clone();
        ctx.bind::<VectorValue>(&json["p"], move |p| rrect.set_position(to_point(p)))
    };
    let size = {
        let rrect = rrect.clone();
        ctx.bind::<VectorValue>(&json["s"], move |s| rrect.set_size(to_size(s)))
    };
    let radius = {
        let rrect = rrect.clone();
        ctx.bind::<ScalarValue>(&json["r"], move |r| {
            let r = *r as f64;
            rrect.set_radius(Size::new(r, r))
        })
    };

    if !(position || size || radius) {
        return None;
    }
    Some(rrect)
}

pub fn attach_ellipse_geometry(json: &Value, ctx: &mut AttachContext) -> Option<Rc<dyn GeometryNode>> {
    let rrect = RRect::new();

    let position = {
        let rrect = rrect.clone();
        ctx.bind::<VectorValue>(&json["p"], move |p| rrect.set_position(to_point(p)))
    };
    let size = {
        let rrect = rrect.clone();
        ctx.bind::<VectorValue>(&json["s"], move |s| {
            let size = to_size(s);
            rrect.set_size(size);
            rrect.set_radius(Size::new(size.width / 2.0, size.height / 2.0));
        })
    };

    if !(position || size) {
        return None;
    }
    Some(rrect)
}

pub fn attach_polystar_geometry(json: &Value, ctx: &mut AttachContext) -> Option<Rc<dyn GeometryNode>> {
    let kind = match parse_default::<i64>(&json["sy"], 0) - 1 {
        0 => PolyStarKind::Star,
        1 => PolyStarKind::Poly,
        _ => {
            ctx.report(DiagnosticKind::InvalidPrimitive, "Unknown polystar type", json);
            return None;
        }
    };

    let path = Path::new();
    let adapter = PolyStarAdapter::new(path.clone(), kind);

    macro_rules! bind_scalar {
        ($key:literal, $setter:ident) => {{
            let adapter = adapter.clone();
            ctx.bind::<ScalarValue>(&json[$key], move |v| adapter.$setter(*v as f64));
        }};
    }

    {
        let adapter = adapter.clone();
        ctx.bind::<VectorValue>(&json["p"], move |p| adapter.set_position(to_point(p)));
    }
    bind_scalar!("pt", set_point_count);
    bind_scalar!("ir", set_inner_radius);
    bind_scalar!("or", set_outer_radius);
    bind_scalar!("is", set_inner_roundness);
    bind_scalar!("os", set_outer_roundness);
    bind_scalar!("r", set_rotation);

    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animator::AnimatorList;
    use crate::attach::{AssetMap, LoadEnv};
    use crate::diagnostics::RecordingSink;
    use crate::resources::NullResourceProvider;
    use crate::sg::recording::RecordingCanvas;
    use crate::sg::RevalidationContext;
    use kurbo::Rect;
    use serde_json::json;

    #[test]
    fn test_ellipse_derives_radius_from_size() {
        let env = LoadEnv::new(Rc::new(NullResourceProvider), Rc::new(RecordingSink::new()), 64, 0);
        let assets = AssetMap::new();
        let mut animators = AnimatorList::new();
        let mut ctx = AttachContext { env: &env, assets: &assets, frame_rate: 30.0, animators: &mut animators };

        let geo = attach_ellipse_geometry(
            &json!({ "ty": "el", "p": { "a": 0, "k": [50, 50] }, "s": { "a": 0, "k": [20, 40] } }),
            &mut ctx,
        )
        .unwrap();
        let canvas = RecordingCanvas::new();
        geo.revalidate(&RevalidationContext::new(1, &canvas));
        let b: Rect = geo.bounds();
        assert!((b.width() - 20.0).abs() < 1e-9 && (b.height() - 40.0).abs() < 1e-9);
        let curves = geo
            .as_path()
            .elements()
            .iter()
            .filter(|e| matches!(e, kurbo::PathEl::CurveTo(..)))
            .count();
        assert_eq!(curves, 4);
    }

    #[test]
    fn test_polystar_type_is_validated() {
        let sink = Rc::new(RecordingSink::new());
        let env = LoadEnv::new(Rc::new(NullResourceProvider), sink.clone(), 64, 0);
        let assets = AssetMap::new();
        let mut animators = AnimatorList::new();
        let mut ctx = AttachContext { env: &env, assets: &assets, frame_rate: 30.0, animators: &mut animators };

        assert!(attach_polystar_geometry(&json!({ "ty": "sr", "sy": 3 }), &mut ctx).is_none());
        assert_eq!(sink.count(DiagnosticKind::InvalidPrimitive), 1);
        assert!(attach_polystar_geometry(&json!({ "ty": "sr", "sy": 2, "pt": { "k": 5 } }), &mut ctx).is_some());
    }

    #[test]
    fn test_path_requires_shape() {
        let env = LoadEnv::new(Rc::new(NullResourceProvider), Rc::new(RecordingSink::new()), 64, 0);
        let assets = AssetMap::new();
        let mut animators = AnimatorList::new();
        let mut ctx = AttachContext { env: &env, assets: &assets, frame_rate: 30.0, animators: &mut animators };

        assert!(attach_path_geometry(&json!({ "ty": "sh" }), &mut ctx).is_none());
        let shape = json!({ "ty": "sh", "ks": { "a": 0, "k": { "c": true, "v": [[0, 0], [10, 0], [10, 10]] } } });
        assert!(attach_path_geometry(&shape, &mut ctx).is_some());
    }
}
