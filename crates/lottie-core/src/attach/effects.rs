//! Geometry effects: list-in, list-out transforms over the geometries a
//! shape group has accumulated so far.

use std::rc::Rc;

use lottie_data::parse_default;
use serde_json::Value;

use super::{clamped_index, AttachContext};
use crate::adapter::TrimEffectAdapter;
use crate::sg::{GeometryNode, Merge, MergeMode, RoundEffect, TrimEffect};
use crate::value::ScalarValue;

pub type GeometryList = Vec<Rc<dyn GeometryNode>>;

/// Signature shared by every geometry effect attacher.
pub type GeometryEffectFn = fn(&Value, &mut AttachContext, GeometryList) -> GeometryList;

const MERGE_MODES: [MergeMode; 5] = [
    MergeMode::Merge,
    MergeMode::Union,
    MergeMode::Difference,
    MergeMode::Intersect,
    MergeMode::Xor,
];

pub fn merge_geometries(geometries: GeometryList, mode: MergeMode) -> Rc<dyn GeometryNode> {
    Merge::new(geometries, mode)
}

pub fn attach_merge_geometry_effect(
    json: &Value,
    _ctx: &mut AttachContext,
    geometries: GeometryList,
) -> GeometryList {
    let mode = MERGE_MODES[clamped_index(&json["mm"], MERGE_MODES.len())];
    vec![merge_geometries(geometries, mode)]
}

pub fn attach_trim_geometry_effect(
    json: &Value,
    ctx: &mut AttachContext,
    geometries: GeometryList,
) -> GeometryList {
    // 1: trim the merged result, 2: trim each geometry on its own.
    let inputs = match parse_default::<i64>(&json["m"], 1) {
        2 => geometries,
        _ => vec![merge_geometries(geometries, MergeMode::Merge)],
    };

    inputs
        .into_iter()
        .map(|geometry| {
            let trim = TrimEffect::new(geometry);
            let adapter = TrimEffectAdapter::new(trim.clone());
            {
                let adapter = adapter.clone();
                ctx.bind::<ScalarValue>(&json["s"], move |s| adapter.set_start(*s));
            }
            {
                let adapter = adapter.clone();
                ctx.bind::<ScalarValue>(&json["e"], move |e| adapter.set_end(*e));
            }
            ctx.bind::<ScalarValue>(&json["o"], move |o| adapter.set_offset(*o));
            trim as Rc<dyn GeometryNode>
        })
        .collect()
}

pub fn attach_round_geometry_effect(
    json: &Value,
    ctx: &mut AttachContext,
    geometries: GeometryList,
) -> GeometryList {
    geometries
        .into_iter()
        .map(|geometry| {
            let round = RoundEffect::new(geometry);
            {
                let round = round.clone();
                ctx.bind::<ScalarValue>(&json["r"], move |r| round.set_radius(*r));
            }
            round as Rc<dyn GeometryNode>
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animator::AnimatorList;
    use crate::attach::{AssetMap, LoadEnv};
    use crate::diagnostics::RecordingSink;
    use crate::resources::NullResourceProvider;
    use crate::sg::recording::RecordingCanvas;
    use crate::sg::{path_ops, Path, RevalidationContext};
    use kurbo::{BezPath, Rect, Shape};
    use serde_json::json;

    fn square(x: f64) -> Rc<dyn GeometryNode> {
        Path::with_path(Rect::new(x, 0.0, x + 100.0, 100.0).to_path(0.1))
    }

    fn run(f: impl FnOnce(&mut AttachContext)) -> AnimatorList {
        let env = LoadEnv::new(Rc::new(NullResourceProvider), Rc::new(RecordingSink::new()), 64, 0);
        let assets = AssetMap::new();
        let mut animators = AnimatorList::new();
        let mut ctx = AttachContext { env: &env, assets: &assets, frame_rate: 30.0, animators: &mut animators };
        f(&mut ctx);
        animators
    }

    fn path_of(geo: &Rc<dyn GeometryNode>) -> BezPath {
        let canvas = RecordingCanvas::new();
        geo.revalidate(&RevalidationContext::new(1, &canvas));
        geo.as_path()
    }

    #[test]
    fn test_merge_reduces_to_one() {
        run(|ctx| {
            let out = attach_merge_geometry_effect(&json!({ "ty": "mm", "mm": 42 }), ctx, vec![square(0.0), square(200.0)]);
            assert_eq!(out.len(), 1);
        });
    }

    #[test]
    fn test_trim_modes() {
        run(|ctx| {
            let trim = json!({ "ty": "tm", "m": 2, "s": { "a": 0, "k": 0 }, "e": { "a": 0, "k": 50 } });
            let separate = attach_trim_geometry_effect(&trim, ctx, vec![square(0.0), square(200.0)]);
            assert_eq!(separate.len(), 2);
            for geo in &separate {
                assert!((path_ops::path_length(&path_of(geo)) - 200.0).abs() < 1e-3);
            }

            let merged = attach_trim_geometry_effect(&json!({ "ty": "tm", "e": { "a": 0, "k": 50 } }), ctx, vec![square(0.0), square(200.0)]);
            assert_eq!(merged.len(), 1);
            assert!((path_ops::path_length(&path_of(&merged[0])) - 400.0).abs() < 1e-3);
        });
    }

    #[test]
    fn test_round_preserves_length_and_registers_animators() {
        let animators = run(|ctx| {
            let round = json!({ "ty": "rd", "r": { "a": 1, "k": [{ "t": 0, "s": [0] }, { "t": 10, "s": [10] }] } });
            let out = attach_round_geometry_effect(&round, ctx, vec![square(0.0), square(200.0), square(400.0)]);
            assert_eq!(out.len(), 3);
        });
        assert_eq!(animators.len(), 3);
    }
}
