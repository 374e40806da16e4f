//! Shape-list compositor.
//!
//! Shape items are stored paint-last within a group, but effects declared
//! later in the list apply to everything before them. Attachment therefore
//! runs in two passes: a discovery pass from the last item to the first
//! (transform, opacity, effect stack) and a consumption pass in authoring
//! order (geometries accumulate, effects rewrite them, paints emit draws).

use std::rc::Rc;

use serde_json::Value;

use super::effects::{
    attach_merge_geometry_effect, attach_round_geometry_effect, attach_trim_geometry_effect,
    merge_geometries, GeometryEffectFn, GeometryList,
};
use super::geometry::{
    attach_ellipse_geometry, attach_path_geometry, attach_polystar_geometry, attach_rrect_geometry,
};
use super::paint::{
    attach_color_fill, attach_color_stroke, attach_gradient_fill, attach_gradient_stroke,
};
use super::transform::{attach_matrix, attach_opacity};
use super::AttachContext;
use crate::diagnostics::DiagnosticKind;
use crate::sg::{
    Draw, GeometryNode, GeometryTransform, Group, Matrix, MergeMode, PaintNode, RenderNode,
    Transform,
};

type GeometryAttachFn = fn(&Value, &mut AttachContext) -> Option<Rc<dyn GeometryNode>>;
type PaintAttachFn = fn(&Value, &mut AttachContext) -> Option<Rc<PaintNode>>;

#[derive(Clone, Copy)]
enum ShapeKind {
    Geometry(GeometryAttachFn),
    GeometryEffect(GeometryEffectFn),
    Paint(PaintAttachFn),
    Group,
    Transform,
}

fn shape_kind(json: &Value) -> Option<ShapeKind> {
    let kind = match json["ty"].as_str()? {
        "el" => ShapeKind::Geometry(attach_ellipse_geometry),
        "fl" => ShapeKind::Paint(attach_color_fill),
        "gf" => ShapeKind::Paint(attach_gradient_fill),
        "gr" => ShapeKind::Group,
        "gs" => ShapeKind::Paint(attach_gradient_stroke),
        "mm" => ShapeKind::GeometryEffect(attach_merge_geometry_effect),
        "rc" => ShapeKind::Geometry(attach_rrect_geometry),
        "rd" => ShapeKind::GeometryEffect(attach_round_geometry_effect),
        "sh" => ShapeKind::Geometry(attach_path_geometry),
        "sr" => ShapeKind::Geometry(attach_polystar_geometry),
        "st" => ShapeKind::Paint(attach_color_stroke),
        "tm" => ShapeKind::GeometryEffect(attach_trim_geometry_effect),
        "tr" => ShapeKind::Transform,
        _ => return None,
    };
    Some(kind)
}

/// A geometry effect waiting to be applied, pushed during discovery.
pub struct EffectRecord<'j> {
    json: &'j Value,
    attach: GeometryEffectFn,
}

impl EffectRecord<'_> {
    fn apply(&self, ctx: &mut AttachContext, geometries: GeometryList) -> GeometryList {
        (self.attach)(self.json, ctx, geometries)
    }
}

/// State a shape group shares with its ancestors.
pub struct ShapeScope<'s, 'j> {
    /// Geometries handed up to the enclosing group for its paints.
    pub geometries: &'s mut GeometryList,
    /// Effects declared by this group and every ancestor, innermost on top.
    pub effects: &'s mut Vec<EffectRecord<'j>>,
    /// Animator count at the last emitted draw. Animators past this mark
    /// belong to geometries no paint consumed.
    pub committed: &'s mut usize,
}

enum DrawSlot {
    Ready(Rc<dyn RenderNode>),
    /// A paint that preceded every geometry of its group.
    Deferred(Rc<PaintNode>),
}

/// Applies every pending effect, innermost first, and collapses the result
/// into the single geometry a draw needs.
fn draw_geometries(
    geometries: &GeometryList,
    effects: &[EffectRecord],
    ctx: &mut AttachContext,
) -> Option<Rc<dyn GeometryNode>> {
    let mut geometries = geometries.clone();
    for effect in effects.iter().rev() {
        geometries = effect.apply(ctx, geometries);
    }
    match geometries.len() {
        0 => None,
        1 => geometries.pop(),
        _ => Some(merge_geometries(geometries, MergeMode::Merge)),
    }
}

/// Attaches a shape item list (`shapes` of a layer, `it` of a group).
/// Returns `None` when nothing in it draws.
pub fn attach_shape<'j>(
    items: &'j Value,
    ctx: &mut AttachContext,
    scope: &mut ShapeScope<'_, 'j>,
) -> Option<Rc<dyn RenderNode>> {
    let items = items.as_array()?;

    let group = Group::new(Vec::new());
    let mut wrapper: Rc<dyn RenderNode> = group.clone();
    let mut matrix: Option<Rc<Matrix>> = None;
    let initial_effects = scope.effects.len();

    // Discovery, last item first.
    let mut records: Vec<(&'j Value, ShapeKind)> = Vec::with_capacity(items.len());
    for json in items.iter().rev() {
        let Some(kind) = shape_kind(json) else {
            ctx.report(DiagnosticKind::UnknownShape, "Unknown shape", json);
            continue;
        };
        records.push((json, kind));

        match kind {
            ShapeKind::Transform => {
                if let Some(m) = attach_matrix(json, ctx, None) {
                    wrapper = Transform::new(wrapper, m.clone());
                    matrix = Some(m);
                }
                wrapper = attach_opacity(json, ctx, wrapper);
            }
            ShapeKind::GeometryEffect(attach) => scope.effects.push(EffectRecord { json, attach }),
            _ => {}
        }
    }

    // Consumption, authoring order.
    let mut geometries = GeometryList::new();
    let mut draws: Vec<DrawSlot> = Vec::new();
    for &(json, kind) in records.iter().rev() {
        match kind {
            ShapeKind::Geometry(attach) => {
                if let Some(geometry) = attach(json, ctx) {
                    geometries.push(geometry);
                }
            }
            ShapeKind::GeometryEffect(_) => {
                let Some(effect) = scope.effects.pop() else {
                    continue;
                };
                debug_assert!(std::ptr::eq(effect.json, json));
                if !geometries.is_empty() {
                    geometries = effect.apply(ctx, std::mem::take(&mut geometries));
                }
            }
            ShapeKind::Group => {
                let mut child = ShapeScope {
                    geometries: &mut geometries,
                    effects: &mut *scope.effects,
                    committed: &mut *scope.committed,
                };
                if let Some(subgroup) = attach_shape(&json["it"], ctx, &mut child) {
                    draws.push(DrawSlot::Ready(subgroup));
                }
            }
            ShapeKind::Paint(attach) => {
                let Some(paint) = attach(json, ctx) else {
                    continue;
                };
                if geometries.is_empty() {
                    draws.push(DrawSlot::Deferred(paint));
                    continue;
                }
                if let Some(geometry) = draw_geometries(&geometries, &scope.effects[..], ctx) {
                    draws.push(DrawSlot::Ready(Draw::new(geometry, paint)));
                    *scope.committed = ctx.animators.len();
                }
            }
            ShapeKind::Transform => {}
        }
    }
    debug_assert_eq!(scope.effects.len(), initial_effects);

    // Paints that came before their geometries consume whatever the group
    // accumulated.
    let mut resolved: Vec<Rc<dyn RenderNode>> = Vec::with_capacity(draws.len());
    for slot in draws {
        match slot {
            DrawSlot::Ready(node) => resolved.push(node),
            DrawSlot::Deferred(paint) => {
                if geometries.is_empty() {
                    continue;
                }
                if let Some(geometry) = draw_geometries(&geometries, &scope.effects[..], ctx) {
                    resolved.push(Draw::new(geometry, paint));
                    *scope.committed = ctx.animators.len();
                }
            }
        }
    }

    for geometry in geometries {
        let geometry: Rc<dyn GeometryNode> = match &matrix {
            Some(m) => GeometryTransform::new(geometry, m.clone()),
            None => geometry,
        };
        scope.geometries.push(geometry);
    }

    if resolved.is_empty() {
        return None;
    }
    for draw in resolved.into_iter().rev() {
        group.add_child(draw);
    }
    Some(wrapper)
}

/// Attaches a shape layer's item list, discarding animators that belong to
/// geometries no paint consumed.
pub fn attach_shape_list(items: &Value, ctx: &mut AttachContext) -> Option<Rc<dyn RenderNode>> {
    let mut geometries = GeometryList::new();
    let mut effects = Vec::new();
    let mut committed = ctx.animators.len();
    let node = {
        let mut scope = ShapeScope {
            geometries: &mut geometries,
            effects: &mut effects,
            committed: &mut committed,
        };
        attach_shape(items, ctx, &mut scope)
    };
    ctx.animators.truncate(committed);
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animator::AnimatorList;
    use crate::attach::{AssetMap, LoadEnv};
    use crate::diagnostics::RecordingSink;
    use crate::resources::NullResourceProvider;
    use crate::sg::recording::{DrawCommand, RecordingCanvas};
    use crate::sg::{path_ops, Canvas, RevalidationContext};
    use kurbo::Affine;
    use serde_json::json;

    fn render(node: &Rc<dyn RenderNode>) -> RecordingCanvas {
        let mut canvas = RecordingCanvas::new();
        {
            let ctx = RevalidationContext::new(1, &canvas);
            node.revalidate(&ctx, Affine::IDENTITY, false);
        }
        node.render(&mut canvas as &mut dyn Canvas);
        canvas
    }

    fn attach(items: serde_json::Value) -> (Option<Rc<dyn RenderNode>>, AnimatorList, Rc<RecordingSink>) {
        let sink = Rc::new(RecordingSink::new());
        let env = LoadEnv::new(Rc::new(NullResourceProvider), sink.clone(), 64, 0);
        let assets = AssetMap::new();
        let mut animators = AnimatorList::new();
        let node = {
            let mut ctx = AttachContext { env: &env, assets: &assets, frame_rate: 30.0, animators: &mut animators };
            attach_shape_list(&items, &mut ctx)
        };
        (node, animators, sink)
    }

    fn rect(x: f64, w: f64) -> serde_json::Value {
        json!({ "ty": "rc", "p": { "a": 0, "k": [x + w / 2.0, 50] }, "s": { "a": 0, "k": [w, 100] }, "r": { "a": 0, "k": 0 } })
    }

    fn fill(r: f32) -> serde_json::Value {
        json!({ "ty": "fl", "c": { "a": 0, "k": [r, 0, 0, 1] }, "o": { "a": 0, "k": 100 } })
    }

    #[test]
    fn test_paint_position_does_not_matter() {
        let (trailing, _, _) = attach(json!([rect(0.0, 100.0), fill(1.0)]));
        let (leading, _, _) = attach(json!([fill(1.0), rect(0.0, 100.0)]));

        let a = render(&trailing.unwrap());
        let b = render(&leading.unwrap());
        assert_eq!(a.draw_paths().len(), 1);
        assert_eq!(a.commands(), b.commands());
    }

    #[test]
    fn test_paints_render_bottom_first() {
        let stroke = json!({ "ty": "st", "c": { "a": 0, "k": [0, 0, 1, 1] }, "w": { "a": 0, "k": 2 } });
        let (node, _, _) = attach(json!([rect(0.0, 100.0), stroke, fill(1.0)]));
        let canvas = render(&node.unwrap());
        let paints = canvas.draw_paths();
        assert_eq!(paints.len(), 2);
        assert_eq!(paints[0].1.style, crate::sg::PaintStyle::Fill);
        assert_eq!(paints[1].1.style, crate::sg::PaintStyle::Stroke);
    }

    #[test]
    fn test_separate_trim_feeds_one_draw() {
        let trim = json!({ "ty": "tm", "m": 2, "s": { "a": 0, "k": 0 }, "e": { "a": 0, "k": 50 } });
        let (node, _, _) = attach(json!([rect(0.0, 100.0), rect(200.0, 100.0), trim, fill(1.0)]));
        let canvas = render(&node.unwrap());
        let paths = canvas.draw_paths();
        assert_eq!(paths.len(), 1);
        // Two 400-unit squares, each trimmed to its first half.
        assert!((path_ops::path_length(paths[0].0) - 400.0).abs() < 1e-3);
    }

    #[test]
    fn test_group_without_paint_yields_nothing() {
        let animated = json!({ "ty": "rc", "p": { "a": 1, "k": [
            { "t": 0, "s": [0, 0] }, { "t": 10, "s": [10, 10] }
        ] }, "s": { "a": 0, "k": [10, 10] } });
        let (node, animators, _) = attach(json!([{ "ty": "gr", "it": [animated] }]));
        assert!(node.is_none());
        assert!(animators.is_empty());
    }

    #[test]
    fn test_orphaned_geometry_animators_are_dropped() {
        let animated = json!({ "ty": "rc", "p": { "a": 1, "k": [
            { "t": 0, "s": [0, 0] }, { "t": 10, "s": [10, 10] }
        ] }, "s": { "a": 0, "k": [10, 10] } });
        let painted_group = json!({ "ty": "gr", "it": [animated.clone(), fill(1.0)] });
        let orphan_group = json!({ "ty": "gr", "it": [animated] });

        // Groups are consumed in authoring order, so the orphan comes last.
        let (node, animators, _) = attach(json!([painted_group, orphan_group]));
        assert!(node.is_some());
        assert_eq!(animators.len(), 1);
    }

    #[test]
    fn test_parent_paint_consumes_transformed_child_geometry() {
        let group = json!({ "ty": "gr", "it": [
            rect(0.0, 10.0),
            { "ty": "tr", "p": { "a": 0, "k": [100, 0] } }
        ] });
        let (node, _, _) = attach(json!([group, fill(1.0)]));
        let canvas = render(&node.unwrap());
        let paths = canvas.draw_paths();
        assert_eq!(paths.len(), 1);
        let bounds = kurbo::Shape::bounding_box(paths[0].0);
        assert!((bounds.x0 - 100.0).abs() < 1e-9);
        assert_eq!(canvas.count(|c| matches!(c, DrawCommand::Concat(_))), 0);
    }

    #[test]
    fn test_unknown_shape_is_reported_and_skipped() {
        let (node, _, sink) = attach(json!([{ "ty": "zz" }, rect(0.0, 10.0), fill(1.0)]));
        assert!(node.is_some());
        assert_eq!(sink.count(DiagnosticKind::UnknownShape), 1);
    }
}
