//! Keyframe evaluation and property binding.
//!
//! Attachers never hold on to document values. Each property is bound once:
//! static values are pushed into the scene graph immediately, animated ones
//! become a [`KeyframeAnimator`] that pushes a fresh value on every tick.

use std::cell::Cell;

use glam::Vec2;
use lottie_data::{EasingHandle, Keyframe};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::value::PropertyValue;

pub trait Animator {
    /// `t` is in frames of the owning composition.
    fn tick(&mut self, t: f32);
}

pub type AnimatorList = Vec<Box<dyn Animator>>;

#[derive(Error, Debug, PartialEq)]
pub enum KeyframeError {
    #[error("Keyframe list is empty")]
    Empty,
    #[error("Keyframe times are not strictly increasing at index {0}")]
    OutOfOrder(usize),
    #[error("Keyframe {0} has no start value")]
    MissingValue(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Easing {
    Linear,
    Hold,
    Cubic(CubicEasing),
}

impl Easing {
    fn from_handles(hold: bool, o: Option<EasingHandle>, i: Option<EasingHandle>) -> Self {
        if hold {
            return Easing::Hold;
        }
        match (o, i) {
            (Some(o), Some(i)) => Easing::Cubic(CubicEasing::new(Vec2::new(o.x, o.y), Vec2::new(i.x, i.y))),
            _ => Easing::Linear,
        }
    }

    fn apply(self, t: f32) -> f32 {
        match self {
            Easing::Linear => t,
            Easing::Hold => 0.0,
            Easing::Cubic(cubic) => cubic.ease(t),
        }
    }
}

struct Segment<T> {
    t0: f32,
    t1: f32,
    v0: T,
    v1: T,
    easing: Easing,
    to: Option<Vec<f32>>,
    ti: Option<Vec<f32>>,
}

impl<T: PropertyValue> Segment<T> {
    fn sample(&self, t: f32) -> T {
        let span = self.t1 - self.t0;
        if span <= 0.0 {
            return self.v0.clone();
        }
        let local = ((t - self.t0) / span).clamp(0.0, 1.0);
        let eased = self.easing.apply(local);
        self.v0
            .lerp_spatial(&self.v1, eased, self.to.as_deref(), self.ti.as_deref())
    }
}

/// Evaluates a keyframed property and forwards each value to `apply`.
pub struct KeyframeAnimator<T> {
    segments: Vec<Segment<T>>,
    current: Cell<usize>,
    apply: Box<dyn Fn(&T)>,
}

impl<T: PropertyValue> KeyframeAnimator<T> {
    pub fn new(
        keyframes: Vec<Keyframe<T>>,
        apply: impl Fn(&T) + 'static,
    ) -> Result<Self, KeyframeError> {
        let segments = Self::build_segments(keyframes)?;
        Ok(Self {
            segments,
            current: Cell::new(0),
            apply: Box::new(apply),
        })
    }

    fn build_segments(keyframes: Vec<Keyframe<T>>) -> Result<Vec<Segment<T>>, KeyframeError> {
        if keyframes.is_empty() {
            return Err(KeyframeError::Empty);
        }
        for (i, w) in keyframes.windows(2).enumerate() {
            if w[1].t <= w[0].t {
                return Err(KeyframeError::OutOfOrder(i + 1));
            }
        }

        let n = keyframes.len();
        let mut segments = Vec::with_capacity(n);
        for i in 0..n {
            let kf = &keyframes[i];
            let next = keyframes.get(i + 1);

            let Some(v0) = kf.s.clone() else {
                // Legacy exports close the list with a time-only record.
                if i + 1 == n && i > 0 {
                    break;
                }
                return Err(KeyframeError::MissingValue(i));
            };

            let Some(next) = next else {
                if segments.is_empty() {
                    segments.push(Segment {
                        t0: kf.t,
                        t1: kf.t,
                        v1: v0.clone(),
                        v0,
                        easing: Easing::Hold,
                        to: None,
                        ti: None,
                    });
                }
                break;
            };

            let v1 = kf
                .e
                .clone()
                .or_else(|| next.s.clone())
                .unwrap_or_else(|| v0.clone());
            segments.push(Segment {
                t0: kf.t,
                t1: next.t,
                v0,
                v1,
                easing: Easing::from_handles(kf.h, kf.o, kf.i),
                to: kf.to.clone(),
                ti: kf.ti.clone(),
            });
        }

        Ok(segments)
    }

    fn find_segment(&self, t: f32) -> usize {
        let cached = self.current.get();
        if let Some(seg) = self.segments.get(cached) {
            if t >= seg.t0 && t < seg.t1 {
                return cached;
            }
        }
        let idx = self
            .segments
            .partition_point(|s| s.t1 <= t)
            .min(self.segments.len() - 1);
        self.current.set(idx);
        idx
    }

    pub fn value_at(&self, t: f32) -> T {
        let (first, last) = (&self.segments[0], &self.segments[self.segments.len() - 1]);
        if t <= first.t0 {
            return first.v0.clone();
        }
        if t >= last.t1 {
            return last.v1.clone();
        }
        self.segments[self.find_segment(t)].sample(t)
    }
}

impl<T: PropertyValue> Animator for KeyframeAnimator<T> {
    fn tick(&mut self, t: f32) {
        let value = self.value_at(t);
        (self.apply)(&value);
    }
}

/// Unit cubic from (0,0) to (1,1) held in power-basis form, so both axes
/// evaluate as `((a * s + b) * s + c) * s`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicEasing {
    x: [f32; 3],
    y: [f32; 3],
}

impl CubicEasing {
    const TOLERANCE: f32 = 1e-5;

    /// Handle x coordinates are clamped to `[0, 1]` so `x(s)` is monotonic.
    pub fn new(p1: Vec2, p2: Vec2) -> Self {
        let coefficients = |c1: f32, c2: f32| [1.0 + 3.0 * (c1 - c2), 3.0 * (c2 - 2.0 * c1), 3.0 * c1];
        Self {
            x: coefficients(p1.x.clamp(0.0, 1.0), p2.x.clamp(0.0, 1.0)),
            y: coefficients(p1.y, p2.y),
        }
    }

    fn eval([a, b, c]: [f32; 3], s: f32) -> f32 {
        ((a * s + b) * s + c) * s
    }

    fn slope([a, b, c]: [f32; 3], s: f32) -> f32 {
        (3.0 * a * s + 2.0 * b) * s + c
    }

    /// Maps progress `x` to eased progress.
    pub fn ease(&self, x: f32) -> f32 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }
        Self::eval(self.y, self.param_for(x))
    }

    /// Newton steps from `x`, falling back to bisection on flat or
    /// diverging slopes.
    fn param_for(&self, x: f32) -> f32 {
        let mut s = x;
        for _ in 0..6 {
            let err = Self::eval(self.x, s) - x;
            if err.abs() < Self::TOLERANCE {
                return s;
            }
            let slope = Self::slope(self.x, s);
            if slope.abs() < 1e-6 {
                break;
            }
            let next = s - err / slope;
            if !(0.0..=1.0).contains(&next) {
                break;
            }
            s = next;
        }

        let (mut lo, mut hi) = (0.0f32, 1.0f32);
        s = x;
        for _ in 0..32 {
            let err = Self::eval(self.x, s) - x;
            if err.abs() < Self::TOLERANCE {
                break;
            }
            if err > 0.0 {
                hi = s;
            } else {
                lo = s;
            }
            s = 0.5 * (lo + hi);
        }
        s
    }
}

/// Binds a property node to `apply`.
///
/// Returns `false` when the node is absent or cannot be decoded, in which case
/// `apply` is never called. A static value is applied exactly once; keyframes
/// append one animator to `animators`.
pub fn bind_property<T: PropertyValue>(
    json: &Value,
    animators: &mut AnimatorList,
    diagnostics: &dyn DiagnosticSink,
    apply: impl Fn(&T) + 'static,
) -> bool {
    let Some(obj) = json.as_object() else {
        return false;
    };
    let k = obj.get("k").unwrap_or(&Value::Null);
    let animated = obj.get("a").is_some_and(|a| lottie_data::parse_default(a, false));

    if !animated {
        return match T::from_json(k) {
            Some(v) => {
                apply(&v);
                true
            }
            None => {
                if obj.contains_key("a") {
                    diagnostics.report(
                        Diagnostic::new(DiagnosticKind::InvalidProperty, "Could not parse static property value")
                            .with_fragment(json),
                    );
                }
                false
            }
        };
    }

    let keyframes = match Vec::<Keyframe<T>>::deserialize(k) {
        Ok(kfs) => kfs,
        Err(e) => {
            diagnostics.report(
                Diagnostic::new(DiagnosticKind::InvalidKeyframes, format!("Malformed keyframes: {e}"))
                    .with_fragment(json),
            );
            return false;
        }
    };

    match KeyframeAnimator::new(keyframes, apply) {
        Ok(animator) => {
            animators.push(Box::new(animator));
            true
        }
        Err(e) => {
            diagnostics.report(Diagnostic::new(DiagnosticKind::InvalidKeyframes, e.to_string()).with_fragment(json));
            false
        }
    }
}
