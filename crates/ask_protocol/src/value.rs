//! Defensive field readers for semi-structured payloads.
//!
//! Every reader returns `None` for a missing key, a wrong type, or a blank
//! string. Callers pick the default.

use serde_json::Value;

pub fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToString::to_string)
}

/// Like [`str_field`] but keeps surrounding whitespace; used for text deltas.
pub fn raw_str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(ToString::to_string)
}

/// Reads a finite number, accepting numeric strings such as `"42"`.
pub fn number_field(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(as_number)
}

pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|n| n.is_finite()),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
        }
        _ => None,
    }
}

/// Reads a non-negative integer count; fractional values are truncated.
pub fn count_field(value: &Value, key: &str) -> Option<u64> {
    number_field(value, key)
        .filter(|n| *n >= 0.0)
        .map(|n| n as u64)
}

/// Renders a value as display text: strings verbatim, everything else as JSON.
pub fn display_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{count_field, display_text, number_field, str_field};

    #[test]
    fn blank_and_mistyped_strings_are_absent() {
        let value = json!({"a": "  ", "b": 3, "c": " x "});
        assert_eq!(str_field(&value, "a"), None);
        assert_eq!(str_field(&value, "b"), None);
        assert_eq!(str_field(&value, "c").as_deref(), Some("x"));
        assert_eq!(str_field(&json!("not an object"), "a"), None);
    }

    #[test]
    fn numbers_accept_numeric_strings() {
        let value = json!({"a": "12", "b": 3.5, "c": "abc", "d": ""});
        assert_eq!(number_field(&value, "a"), Some(12.0));
        assert_eq!(number_field(&value, "b"), Some(3.5));
        assert_eq!(number_field(&value, "c"), None);
        assert_eq!(number_field(&value, "d"), None);
    }

    #[test]
    fn counts_reject_negative_values() {
        assert_eq!(count_field(&json!({"n": -1}), "n"), None);
        assert_eq!(count_field(&json!({"n": "7"}), "n"), Some(7));
    }

    #[test]
    fn display_text_prefers_raw_strings() {
        assert_eq!(display_text(&json!("hi")), "hi");
        assert_eq!(display_text(&json!({"k": 1})), r#"{"k":1}"#);
        assert_eq!(display_text(&json!(null)), "");
    }
}
