//! Lenient field coercion for editor-written JSON.
//!
//! Every accessor takes the (possibly missing) raw value and never fails:
//! absent or unusable input falls back to the supplied default.

use serde_json::Value;

pub fn field<'a>(raw: &'a Value, key: &str) -> Option<&'a Value> {
    raw.as_object().and_then(|o| o.get(key))
}

/// JavaScript-style truthiness.
pub fn truthy(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

pub fn int_or(v: Option<&Value>, default: i64) -> i64 {
    match v {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(|f| f as i64).unwrap_or(default),
        Some(Value::Bool(b)) => i64::from(*b),
        _ => default,
    }
}

pub fn int(raw: &Value, key: &str) -> i64 {
    int_or(field(raw, key), 0)
}

pub fn int_default(raw: &Value, key: &str, default: i64) -> i64 {
    int_or(field(raw, key), default)
}

/// `String(x)` for scalars, `""` for null/missing and containers.
pub fn text_of(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

pub fn text(raw: &Value, key: &str) -> String {
    text_of(field(raw, key))
}

/// Like [`text`], but only genuine strings count.
pub fn string_slot(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str).map(str::to_string)
}

pub fn flag(raw: &Value, key: &str) -> bool {
    truthy(field(raw, key))
}

pub fn array<'a>(raw: &'a Value, key: &str) -> &'a [Value] {
    field(raw, key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub fn ints(raw: &Value, key: &str) -> Vec<i64> {
    array(raw, key).iter().map(|v| int_or(Some(v), 0)).collect()
}

pub fn values(raw: &Value, key: &str) -> Vec<Value> {
    array(raw, key).to_vec()
}

/// Nested object, or `null` so callers can keep reading defaults from it.
pub fn object<'a>(raw: &'a Value, key: &str) -> &'a Value {
    static MISSING: Value = Value::Null;
    match field(raw, key) {
        Some(v) if v.is_object() => v,
        _ => &MISSING,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_follows_javascript() {
        assert!(!truthy(None));
        assert!(!truthy(Some(&json!(0))));
        assert!(!truthy(Some(&json!(""))));
        assert!(!truthy(Some(&json!(null))));
        assert!(truthy(Some(&json!("a"))));
        assert!(truthy(Some(&json!([]))));
        assert!(truthy(Some(&json!(0.5))));
    }

    #[test]
    fn numbers_fall_back_to_default() {
        let raw = json!({ "a": 3, "b": "7", "c": "x", "d": 2.9, "e": null });
        assert_eq!(int(&raw, "a"), 3);
        assert_eq!(int(&raw, "b"), 7);
        assert_eq!(int(&raw, "c"), 0);
        assert_eq!(int(&raw, "d"), 2);
        assert_eq!(int_default(&raw, "e", 30), 30);
        assert_eq!(int_default(&raw, "missing", 99), 99);
    }

    #[test]
    fn text_stringifies_scalars_only() {
        let raw = json!({ "n": 12, "s": "hi", "o": {}, "z": null });
        assert_eq!(text(&raw, "n"), "12");
        assert_eq!(text(&raw, "s"), "hi");
        assert_eq!(text(&raw, "o"), "");
        assert_eq!(text(&raw, "z"), "");
        assert_eq!(text(&raw, "missing"), "");
    }

    #[test]
    fn missing_objects_read_as_empty() {
        let raw = json!({ "conditions": 5 });
        let conditions = object(&raw, "conditions");
        assert_eq!(int_default(conditions, "actorHp", 50), 50);
        assert!(!flag(conditions, "actorValid"));
        assert!(array(&raw, "list").is_empty());
    }
}
