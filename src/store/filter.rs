// Exact-match document filtering
// Every filter entry must match the field of the same name (AND).

use serde_json::Value;

use super::{Document, ParamMap};

/// Check whether `doc` satisfies every entry of `filter`
pub fn matches(doc: &Document, filter: &ParamMap) -> bool {
    filter
        .iter()
        .all(|(key, expected)| doc.get(key).is_some_and(|actual| value_matches(actual, expected)))
}

/// Query values arrive as strings, so scalars compare by their JSON text
fn value_matches(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(actual), Value::Object(expected)) => expected
            .iter()
            .all(|(k, v)| actual.get(k).is_some_and(|a| value_matches(a, v))),
        (Value::Array(actual), Value::Array(expected)) => {
            actual.len() == expected.len()
                && actual
                    .iter()
                    .zip(expected)
                    .all(|(a, e)| value_matches(a, e))
        }
        (Value::Object(_) | Value::Array(_), _) | (_, Value::Object(_) | Value::Array(_)) => false,
        (actual, expected) => scalar_text(actual) == scalar_text(expected),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
