//! JSON helpers shared by every engine operation.
//!
//! Tolerant parsing of model- or scraper-produced text, plus the value
//! comparisons the query operators are built on.

use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::LazyLock;
use tracing::warn;

static FENCE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*").expect("valid fence regex"));
static TRAILING_COMMA_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*\}").expect("valid comma regex"));
static TRAILING_COMMA_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*\]").expect("valid comma regex"));
static EMBEDDED_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid object regex"));

/// Parse JSON text, repairing the usual damage before giving up.
///
/// The repair pass strips markdown fences, drops trailing commas and narrows
/// the text to the outermost `{...}` span. Returns `None` if the text still
/// does not parse.
pub fn safe_parse(text: &str) -> Option<Value> {
    match serde_json::from_str(text) {
        Ok(value) => return Some(value),
        Err(e) => warn!("JSON parse attempt 1 failed: {}", e),
    }

    let repaired = repair(text);
    match serde_json::from_str(&repaired) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("JSON parse attempt 2 failed: {}", e);
            None
        }
    }
}

fn repair(text: &str) -> String {
    let stripped = FENCE_OPEN.replace_all(text, "");
    let stripped = TRAILING_COMMA_OBJECT.replace_all(&stripped, "}");
    let stripped = TRAILING_COMMA_ARRAY.replace_all(&stripped, "]");

    match EMBEDDED_OBJECT.find(&stripped) {
        Some(m) => m.as_str().to_string(),
        None => stripped.trim().to_string(),
    }
}

/// Render a value the way it reads in a report: strings raw, everything else as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Keep at most `max_chars` characters of `s`.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Short name of a value's JSON type.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Numeric view of a value. Booleans are not numbers.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Structural equality where numbers compare by value (`1 == 1.0`).
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Ordering between two values of the same scalar kind.
///
/// Numbers order numerically, strings lexicographically; any other pairing is
/// unordered.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => as_number(a)?.partial_cmp(&as_number(b)?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_safe_parse_plain() {
        assert_eq!(safe_parse(r#"{"a": 1}"#), Some(json!({"a": 1})));
    }

    #[test]
    fn test_safe_parse_fenced_with_trailing_commas() {
        let text = "```json\n{\"tags\": [\"a\", \"b\",], \"n\": 2,}\n```";
        assert_eq!(safe_parse(text), Some(json!({"tags": ["a", "b"], "n": 2})));
    }

    #[test]
    fn test_safe_parse_embedded_in_prose() {
        let text = "Sure! Here it is: {\"action\": \"answer\", \"response\": \"ok\"} hope that helps";
        assert_eq!(
            safe_parse(text),
            Some(json!({"action": "answer", "response": "ok"}))
        );
    }

    #[test]
    fn test_safe_parse_gives_up() {
        assert_eq!(safe_parse("not json at all"), None);
    }

    #[test]
    fn test_truncate_chars_is_char_safe() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }

    #[test]
    fn test_values_equal_numbers_by_value() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(values_equal(&json!({"a": [1, 2.0]}), &json!({"a": [1.0, 2]})));
        assert!(!values_equal(&json!("1"), &json!(1)));
    }

    #[test]
    fn test_compare_values_mixed_is_unordered() {
        assert_eq!(compare_values(&json!(3), &json!(2.5)), Some(Ordering::Greater));
        assert_eq!(compare_values(&json!("a"), &json!("b")), Some(Ordering::Less));
        assert_eq!(compare_values(&json!("3"), &json!(2)), None);
        assert_eq!(compare_values(&json!(true), &json!(false)), None);
    }
}
