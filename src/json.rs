//! Defaulted lookups over loosely shaped API payloads.
//!
//! Every accessor returns `None` (or an empty slice) instead of failing when a key is
//! missing, has the wrong type or an intermediate object is absent.

use serde_json::Value;

static NULL: Value = Value::Null;

/// Walks nested object keys, yielding `Value::Null` when any hop is missing.
pub fn at<'a>(v: &'a Value, path: &[&str]) -> &'a Value {
    let mut cur = v;
    for key in path {
        match cur.get(*key) {
            Some(next) => cur = next,
            None => return &NULL,
        }
    }
    cur
}

pub fn obj<'a>(v: &'a Value, key: &str) -> &'a Value {
    v.get(key).filter(|x| x.is_object()).unwrap_or(&NULL)
}

pub fn array<'a>(v: &'a Value, key: &str) -> &'a [Value] {
    v.get(key)
        .and_then(|x| x.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub fn str_at(v: &Value, key: &str) -> Option<String> {
    v.get(key)?.as_str().map(|s| s.to_string())
}

/// Like [`str_at`], but numbers are rendered too (jersey numbers, video ids).
pub fn text_at(v: &Value, key: &str) -> Option<String> {
    match v.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn i64_at(v: &Value, key: &str) -> Option<i64> {
    v.get(key).and_then(as_i64_any)
}

pub fn f64_at(v: &Value, key: &str) -> Option<f64> {
    v.get(key).and_then(as_f64_any)
}

pub fn bool_at(v: &Value, key: &str) -> Option<bool> {
    v.get(key)?.as_bool()
}

pub fn as_i64_any(v: &Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    if let Some(f) = v.as_f64()
        && f.fract() == 0.0
    {
        return Some(f as i64);
    }
    v.as_str()?.trim().parse::<i64>().ok()
}

pub fn as_f64_any(v: &Value) -> Option<f64> {
    if let Some(n) = v.as_f64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<f64>().ok()
}

/// Object or `{}`; used for the JSON side columns so they are never NULL.
pub fn object_or_empty(v: Option<&Value>) -> Value {
    match v {
        Some(x) if x.is_object() => x.clone(),
        _ => Value::Object(Default::default()),
    }
}

pub fn to_text(v: &Value) -> String {
    serde_json::to_string(v).unwrap_or_else(|_| "null".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn at_tolerates_missing_hops() {
        let v = json!({"a": {"b": {"c": 3}}});
        assert_eq!(at(&v, &["a", "b", "c"]), &json!(3));
        assert!(at(&v, &["a", "x", "c"]).is_null());
        assert!(at(&json!(null), &["a"]).is_null());
    }

    #[test]
    fn numeric_lookups_accept_strings() {
        let v = json!({"id": "42", "f": 2.0, "bad": "x", "rating": "7.3"});
        assert_eq!(i64_at(&v, "id"), Some(42));
        assert_eq!(i64_at(&v, "f"), Some(2));
        assert_eq!(i64_at(&v, "bad"), None);
        assert_eq!(f64_at(&v, "rating"), Some(7.3));
        assert_eq!(i64_at(&v, "missing"), None);
    }

    #[test]
    fn array_and_obj_default_to_empty() {
        let v = json!({"list": 5, "o": [1]});
        assert!(array(&v, "list").is_empty());
        assert!(obj(&v, "o").is_null());
        assert_eq!(object_or_empty(v.get("o")), json!({}));
    }

    #[test]
    fn text_at_renders_numbers() {
        let v = json!({"n": 10, "s": "10", "b": true});
        assert_eq!(text_at(&v, "n").as_deref(), Some("10"));
        assert_eq!(text_at(&v, "s").as_deref(), Some("10"));
        assert_eq!(text_at(&v, "b"), None);
    }
}
