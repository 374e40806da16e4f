//! Property value kinds and their conversions to geometry types.

use glam::{Vec2, Vec4};
use kurbo::{BezPath, Point, Size};
use lottie_data::{BezierPath, Parse};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::sg::GradientStop;

pub type ScalarValue = f32;
pub type VectorValue = Vec<f32>;
pub type ShapeValue = BezierPath;

pub trait Interpolatable: Sized + Clone {
    fn lerp(&self, other: &Self, t: f32) -> Self;

    fn lerp_spatial(
        &self,
        other: &Self,
        t: f32,
        _tan_out: Option<&[f32]>,
        _tan_in: Option<&[f32]>,
    ) -> Self {
        self.lerp(other, t)
    }
}

/// A value that can be decoded from a static `k` node or from keyframe
/// records, and interpolated between two keyframes.
pub trait PropertyValue: Interpolatable + DeserializeOwned + 'static {
    fn from_json(v: &Value) -> Option<Self>;
}

impl Interpolatable for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl PropertyValue for f32 {
    fn from_json(v: &Value) -> Option<Self> {
        f32::parse(v)
    }
}

impl Interpolatable for Vec<f32> {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        if self.len() != other.len() {
            return if t < 1.0 { self.clone() } else { other.clone() };
        }
        self.iter()
            .zip(other.iter())
            .map(|(a, b)| a + (b - a) * t)
            .collect()
    }

    /// Positions follow the cubic `s, s + to, e + ti, e` when tangents are
    /// present.
    fn lerp_spatial(
        &self,
        other: &Self,
        t: f32,
        tan_out: Option<&[f32]>,
        tan_in: Option<&[f32]>,
    ) -> Self {
        let (Some(to), Some(ti)) = (tan_out, tan_in) else {
            return self.lerp(other, t);
        };
        if self.len() < 2 || other.len() < 2 || to.len() < 2 || ti.len() < 2 {
            return self.lerp(other, t);
        }
        if to.iter().chain(ti.iter()).all(|c| *c == 0.0) {
            return self.lerp(other, t);
        }

        let p0 = Vec2::new(self[0], self[1]);
        let p3 = Vec2::new(other[0], other[1]);
        let p1 = p0 + Vec2::new(to[0], to[1]);
        let p2 = p3 + Vec2::new(ti[0], ti[1]);

        let mt = 1.0 - t;
        let p = p0 * (mt * mt * mt) + p1 * (3.0 * mt * mt * t) + p2 * (3.0 * mt * t * t) + p3 * (t * t * t);

        // Components past x/y (z) stay linear.
        let mut out = self.lerp(other, t);
        out[0] = p.x;
        out[1] = p.y;
        out
    }
}

impl PropertyValue for Vec<f32> {
    fn from_json(v: &Value) -> Option<Self> {
        Vec::<f32>::parse(v)
    }
}

impl Interpolatable for BezierPath {
    /// Vertex-wise when topologies match, otherwise the start shape holds.
    fn lerp(&self, other: &Self, t: f32) -> Self {
        if self.v.len() != other.v.len() {
            return if t < 1.0 { self.clone() } else { other.clone() };
        }

        let lerp_pt = |a: [f32; 2], b: [f32; 2]| [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t];
        let n = self.v.len();
        BezierPath {
            c: self.c,
            v: (0..n).map(|i| lerp_pt(self.v[i], other.v[i])).collect(),
            i: (0..n).map(|i| lerp_pt(self.in_tangent(i), other.in_tangent(i))).collect(),
            o: (0..n).map(|i| lerp_pt(self.out_tangent(i), other.out_tangent(i))).collect(),
        }
    }
}

impl PropertyValue for BezierPath {
    fn from_json(v: &Value) -> Option<Self> {
        match v {
            Value::Array(a) if a.len() == 1 => Self::from_json(&a[0]),
            // A bare keyframe record would otherwise decode as an empty path.
            Value::Object(o) if o.contains_key("v") => serde_json::from_value(v.clone()).ok(),
            _ => None,
        }
    }
}

fn component(v: &[f32], i: usize) -> f64 {
    v.get(i).copied().unwrap_or(0.0) as f64
}

pub fn to_point(v: &[f32]) -> Point {
    Point::new(component(v, 0), component(v, 1))
}

pub fn to_size(v: &[f32]) -> Size {
    Size::new(component(v, 0), component(v, 1))
}

/// RGBA in [0, 1]; alpha defaults to opaque.
pub fn to_color(v: &[f32]) -> Vec4 {
    let c = |i: usize, default: f32| v.get(i).copied().unwrap_or(default).clamp(0.0, 1.0);
    Vec4::new(c(0, 0.0), c(1, 0.0), c(2, 0.0), c(3, 1.0))
}

pub fn to_path(shape: &BezierPath) -> BezPath {
    let mut bp = BezPath::new();
    let count = shape.v.len();
    if count == 0 {
        return bp;
    }

    let pt = |p: [f32; 2]| Point::new(p[0] as f64, p[1] as f64);
    bp.move_to(pt(shape.v[0]));
    for i in 0..count {
        let next = (i + 1) % count;
        if next == 0 && !shape.c {
            break;
        }
        let p0 = shape.v[i];
        let p1 = shape.v[next];
        let o = shape.out_tangent(i);
        let in_ = shape.in_tangent(next);
        bp.curve_to(
            pt([p0[0] + o[0], p0[1] + o[1]]),
            pt([p1[0] + in_[0], p1[1] + in_[1]]),
            pt(p1),
        );
    }
    if shape.c {
        bp.close_path();
    }
    bp
}

struct ColorStop {
    t: f32,
    rgb: [f32; 3],
}

struct AlphaStop {
    t: f32,
    a: f32,
}

/// Decodes `count` `(offset, r, g, b)` groups followed by optional
/// `(offset, alpha)` pairs. Short color data keeps its complete stops and
/// carries no alpha.
pub fn to_gradient_stops(raw: &[f32], count: usize) -> Vec<GradientStop> {
    let color_len = count.saturating_mul(4);
    let (color_raw, alpha_raw) = if raw.len() >= color_len {
        raw.split_at(color_len)
    } else {
        (&raw[..raw.len() - raw.len() % 4], &[][..])
    };
    let color_stops: Vec<ColorStop> = color_raw
        .chunks_exact(4)
        .map(|c| ColorStop { t: c[0], rgb: [c[1], c[2], c[3]] })
        .collect();
    let alpha_stops: Vec<AlphaStop> = alpha_raw
        .chunks_exact(2)
        .map(|c| AlphaStop { t: c[0], a: c[1] })
        .collect();

    if alpha_stops.is_empty() || color_stops.is_empty() {
        return color_stops
            .iter()
            .map(|c| GradientStop {
                offset: c.t,
                color: Vec4::new(c.rgb[0], c.rgb[1], c.rgb[2], 1.0),
            })
            .collect();
    }

    let mut offsets: Vec<f32> = color_stops
        .iter()
        .map(|c| c.t)
        .chain(alpha_stops.iter().map(|a| a.t))
        .collect();
    offsets.sort_by(f32::total_cmp);
    offsets.dedup();

    offsets
        .into_iter()
        .map(|t| {
            let [r, g, b] = sample_color(&color_stops, t);
            GradientStop {
                offset: t,
                color: Vec4::new(r, g, b, sample_alpha(&alpha_stops, t)),
            }
        })
        .collect()
}

fn ramp_fraction(t0: f32, t1: f32, t: f32) -> f32 {
    let range = t1 - t0;
    if range == 0.0 {
        0.0
    } else {
        (t - t0) / range
    }
}

fn sample_color(stops: &[ColorStop], t: f32) -> [f32; 3] {
    let (first, last) = match (stops.first(), stops.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return [1.0, 1.0, 1.0],
    };
    if t <= first.t {
        return first.rgb;
    }
    if t >= last.t {
        return last.rgb;
    }
    for w in stops.windows(2) {
        if t >= w[0].t && t <= w[1].t {
            let f = ramp_fraction(w[0].t, w[1].t, t);
            return [
                w[0].rgb[0].lerp(&w[1].rgb[0], f),
                w[0].rgb[1].lerp(&w[1].rgb[1], f),
                w[0].rgb[2].lerp(&w[1].rgb[2], f),
            ];
        }
    }
    last.rgb
}

fn sample_alpha(stops: &[AlphaStop], t: f32) -> f32 {
    let (first, last) = match (stops.first(), stops.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return 1.0,
    };
    if t <= first.t {
        return first.a;
    }
    if t >= last.t {
        return last.a;
    }
    for w in stops.windows(2) {
        if t >= w[0].t && t <= w[1].t {
            return w[0].a.lerp(&w[1].a, ramp_fraction(w[0].t, w[1].t, t));
        }
    }
    last.a
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::PathEl;
    use serde_json::json;

    #[test]
    fn test_vector_lerp_is_componentwise() {
        let a = vec![0.0, 10.0, 20.0];
        let b = vec![10.0, 30.0, 20.0];
        assert_eq!(a.lerp(&b, 0.5), vec![5.0, 20.0, 20.0]);
    }

    #[test]
    fn test_spatial_lerp_without_tangents_is_linear() {
        let a = vec![0.0, 0.0];
        let b = vec![100.0, 50.0];
        let zero = [0.0, 0.0];
        assert_eq!(a.lerp_spatial(&b, 0.5, Some(&zero), Some(&zero)), vec![50.0, 25.0]);
        assert_eq!(a.lerp_spatial(&b, 0.5, None, None), vec![50.0, 25.0]);
    }

    #[test]
    fn test_spatial_lerp_bends_through_tangents() {
        let a = vec![0.0, 0.0];
        let b = vec![100.0, 0.0];
        let up = [0.0, -40.0];
        let v = a.lerp_spatial(&b, 0.5, Some(&up), Some(&up));
        assert!((v[0] - 50.0).abs() < 1e-4);
        assert!((v[1] - -30.0).abs() < 1e-4);
    }

    #[test]
    fn test_shape_from_json_rejects_keyframe_records() {
        assert!(BezierPath::from_json(&json!({ "t": 0, "s": [] })).is_none());
        let shape = BezierPath::from_json(&json!([{ "c": true, "v": [[0, 0], [1, 0]] }])).unwrap();
        assert!(shape.c);
    }

    #[test]
    fn test_closed_path_conversion() {
        let shape = BezierPath {
            c: true,
            v: vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]],
            i: vec![],
            o: vec![],
        };
        let path = to_path(&shape);
        let els = path.elements();
        assert_eq!(els.len(), 5);
        assert_eq!(els[0], PathEl::MoveTo(Point::new(0.0, 0.0)));
        assert_eq!(els[4], PathEl::ClosePath);
    }

    #[test]
    fn test_color_defaults_alpha() {
        assert_eq!(to_color(&[1.0, 0.5, 0.0]), Vec4::new(1.0, 0.5, 0.0, 1.0));
        assert_eq!(to_color(&[2.0, -1.0, 0.0, 0.5]), Vec4::new(1.0, 0.0, 0.0, 0.5));
    }

    #[test]
    fn test_gradient_stops_merge_alpha() {
        let raw = [0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.5, 0.5, 1.0, 0.0];
        let stops = to_gradient_stops(&raw, 2);
        assert_eq!(stops.len(), 3);
        assert_eq!(stops[0].color, Vec4::new(1.0, 0.0, 0.0, 0.5));
        assert_eq!(stops[1].offset, 0.5);
        assert_eq!(stops[1].color, Vec4::new(0.5, 0.0, 0.5, 0.5));
        assert_eq!(stops[2].color, Vec4::new(0.0, 0.0, 1.0, 0.0));
    }

    #[test]
    fn test_gradient_stops_truncate() {
        // Declared three stops, only one and a half present.
        let stops = to_gradient_stops(&[0.0, 1.0, 1.0, 1.0, 1.0, 0.0], 3);
        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].color, Vec4::ONE);
    }

    #[test]
    fn test_gradient_stop_count_extremes() {
        let raw = [0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        assert!(to_gradient_stops(&raw, 0).is_empty());

        // A count far past the data keeps what is there, opaque.
        let stops = to_gradient_stops(&raw, usize::MAX);
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[1].color, Vec4::new(0.0, 0.0, 1.0, 1.0));
    }
}
