use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};

pub type Vec2 = [f32; 2];

/// One record of an animated property's `k` array.
///
/// Both exporter generations are accepted: legacy records carry their own
/// end value in `e`, newer ones leave it out and the next record's `s` is used.
#[derive(Debug, Deserialize, Clone)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Keyframe<T> {
    pub t: f32,
    #[serde(default, deserialize_with = "deserialize_keyframe_value")]
    pub s: Option<T>,
    #[serde(default, deserialize_with = "deserialize_keyframe_value")]
    pub e: Option<T>,
    #[serde(default)]
    pub i: Option<EasingHandle>,
    #[serde(default)]
    pub o: Option<EasingHandle>,
    #[serde(default)]
    pub to: Option<Vec<f32>>,
    #[serde(default)]
    pub ti: Option<Vec<f32>>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub h: bool,
}

fn deserialize_keyframe_value<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    if v.is_null() {
        return Ok(None);
    }

    if let Ok(val) = serde_json::from_value(v.clone()) {
        return Ok(Some(val));
    }

    if let Ok(vec) = serde_json::from_value::<Vec<T>>(v) {
        if let Some(first) = vec.into_iter().next() {
            return Ok(Some(first));
        }
    }

    Ok(None)
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(false),
        serde_json::Value::Bool(b) => Ok(b),
        serde_json::Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
        other => Err(D::Error::custom(format!("expected a flag, found {other}"))),
    }
}

/// Cubic-bezier easing control point, `{ "x": .., "y": .. }`.
///
/// Multi-dimensional properties may carry one handle per component as arrays;
/// only the first component drives the timing curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EasingHandle {
    pub x: f32,
    pub y: f32,
}

impl<'de> Deserialize<'de> for EasingHandle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            x: serde_json::Value,
            y: serde_json::Value,
        }

        fn first(v: &serde_json::Value) -> Option<f32> {
            match v {
                serde_json::Value::Array(a) => a.first().and_then(first),
                serde_json::Value::Number(n) => n.as_f64().map(|f| f as f32),
                _ => None,
            }
        }

        let raw = Raw::deserialize(deserializer)?;
        let x = first(&raw.x).ok_or_else(|| D::Error::custom("easing handle without x"))?;
        let y = first(&raw.y).ok_or_else(|| D::Error::custom("easing handle without y"))?;
        Ok(EasingHandle { x, y })
    }
}

/// Vertex-based path description. `i` and `o` are tangents relative to
/// their vertex.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct BezierPath {
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub c: bool,
    #[serde(default, deserialize_with = "deserialize_points")]
    pub i: Vec<Vec2>,
    #[serde(default, deserialize_with = "deserialize_points")]
    pub o: Vec<Vec2>,
    #[serde(default, deserialize_with = "deserialize_points")]
    pub v: Vec<Vec2>,
}

impl BezierPath {
    pub fn vertex_count(&self) -> usize {
        self.v.len()
    }

    /// Tangent lookups tolerate short `i`/`o` arrays.
    pub fn in_tangent(&self, index: usize) -> Vec2 {
        self.i.get(index).copied().unwrap_or([0.0, 0.0])
    }

    pub fn out_tangent(&self, index: usize) -> Vec2 {
        self.o.get(index).copied().unwrap_or([0.0, 0.0])
    }
}

fn deserialize_points<'de, D>(deserializer: D) -> Result<Vec<Vec2>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Vec<f32>> = Vec::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|p| {
            [
                p.first().copied().unwrap_or(0.0),
                p.get(1).copied().unwrap_or(0.0),
            ]
        })
        .collect())
}
