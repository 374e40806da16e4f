use serde_json::Value;

/// Longest fragment rendered by [`dump`].
const MAX_DUMP_LEN: usize = 256;

/// Lenient conversion from a JSON node into a typed value.
///
/// Exporters are inconsistent about scalar encoding: numbers show up as
/// single-element arrays and booleans as 0/1, so the readers accept both.
pub trait Parse: Sized {
    fn parse(v: &Value) -> Option<Self>;
}

impl Parse for f32 {
    fn parse(v: &Value) -> Option<Self> {
        match v {
            Value::Array(a) if a.len() == 1 => f32::parse(&a[0]),
            Value::Number(n) => n.as_f64().map(|f| f as f32),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

impl Parse for i64 {
    fn parse(v: &Value) -> Option<Self> {
        match v {
            Value::Array(a) if a.len() == 1 => i64::parse(&a[0]),
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }
}

impl Parse for bool {
    fn parse(v: &Value) -> Option<Self> {
        match v {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|f| f != 0.0),
            _ => None,
        }
    }
}

impl Parse for String {
    fn parse(v: &Value) -> Option<Self> {
        v.as_str().map(str::to_owned)
    }
}

impl Parse for Vec<f32> {
    fn parse(v: &Value) -> Option<Self> {
        match v {
            Value::Array(a) => a
                .iter()
                .map(|item| item.as_f64().map(|f| f as f32))
                .collect(),
            Value::Number(n) => n.as_f64().map(|f| vec![f as f32]),
            _ => None,
        }
    }
}

pub fn parse<T: Parse>(v: &Value) -> Option<T> {
    T::parse(v)
}

pub fn parse_default<T: Parse>(v: &Value, default: T) -> T {
    T::parse(v).unwrap_or(default)
}

/// Compact single-line rendering of a document fragment, truncated for logs.
pub fn dump(v: &Value) -> String {
    let mut s = v.to_string();
    if s.len() > MAX_DUMP_LEN {
        let mut cut = MAX_DUMP_LEN;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push_str("...");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vector_parse() {
        assert_eq!(parse::<Vec<f32>>(&json!([1, 2.5, 3])), Some(vec![1.0, 2.5, 3.0]));
        assert_eq!(parse::<Vec<f32>>(&json!(7)), Some(vec![7.0]));
        assert_eq!(parse::<Vec<f32>>(&json!([1, "x"])), None);
        assert_eq!(parse::<Vec<f32>>(&json!({ "k": 1 })), None);
    }

    #[test]
    fn test_null_and_strings_are_not_numbers() {
        assert_eq!(parse::<f32>(&Value::Null), None);
        assert_eq!(parse::<f32>(&json!("12")), None);
        assert_eq!(parse::<String>(&json!(12)), None);
    }

    #[test]
    fn test_dump_truncates() {
        let long = json!({ "nm": "x".repeat(1000) });
        let out = dump(&long);
        assert!(out.len() <= MAX_DUMP_LEN + 3);
        assert!(out.ends_with("..."));
        assert_eq!(dump(&json!({ "a": 1 })), r#"{"a":1}"#);
    }
}
