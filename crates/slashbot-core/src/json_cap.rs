//! Size-capping of JSON values before observability emission.
//!
//! Hook payloads can be arbitrarily large (full conversation snapshots,
//! tool outputs). Before they ride the event bus they are capped: depth 4,
//! 40 items per array/object level, 600 chars per string.

use serde_json::{Map, Value};

/// Maximum nesting depth retained.
const MAX_DEPTH: usize = 4;
/// Maximum entries kept per array or object level.
const MAX_ITEMS: usize = 40;
/// Maximum characters kept per string.
const MAX_STRING: usize = 600;

/// Cap a JSON value to the emission limits.
#[must_use]
pub fn cap_json(value: &Value) -> Value {
    cap(value, 0)
}

fn cap(value: &Value, depth: usize) -> Value {
    match value {
        Value::String(s) => Value::String(cap_string(s)),
        Value::Array(items) => {
            if depth >= MAX_DEPTH {
                return Value::String(format!("[array: {} items]", items.len()));
            }
            let mut out: Vec<Value> = items
                .iter()
                .take(MAX_ITEMS)
                .map(|v| cap(v, depth + 1))
                .collect();
            if items.len() > MAX_ITEMS {
                out.push(Value::String(format!(
                    "[... {} more items]",
                    items.len() - MAX_ITEMS
                )));
            }
            Value::Array(out)
        },
        Value::Object(fields) => {
            if depth >= MAX_DEPTH {
                return Value::String(format!("[object: {} fields]", fields.len()));
            }
            let mut out = Map::new();
            for (key, val) in fields.iter().take(MAX_ITEMS) {
                out.insert(key.clone(), cap(val, depth + 1));
            }
            if fields.len() > MAX_ITEMS {
                out.insert(
                    "...".to_string(),
                    Value::String(format!("[{} more fields]", fields.len() - MAX_ITEMS)),
                );
            }
            Value::Object(out)
        },
        other => other.clone(),
    }
}

fn cap_string(s: &str) -> String {
    if s.chars().count() <= MAX_STRING {
        return s.to_string();
    }
    let kept: String = s.chars().take(MAX_STRING).collect();
    format!("{kept}… [+{} chars]", s.chars().count() - MAX_STRING)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn small_values_pass_through() {
        let value = json!({"a": 1, "b": [true, null], "c": "short"});
        assert_eq!(cap_json(&value), value);
    }

    #[test]
    fn long_strings_are_truncated() {
        let value = json!("x".repeat(700));
        let capped = cap_json(&value);
        let s = capped.as_str().unwrap();
        assert!(s.len() < 700);
        assert!(s.contains("[+100 chars]"));
    }

    #[test]
    fn wide_arrays_are_clipped() {
        let value = json!((0..100).collect::<Vec<i32>>());
        let capped = cap_json(&value);
        let items = capped.as_array().unwrap();
        assert_eq!(items.len(), 41);
        assert_eq!(items[40], json!("[... 60 more items]"));
    }

    #[test]
    fn deep_nesting_is_flattened_at_depth_four() {
        let value = json!({"a": {"b": {"c": {"d": {"e": 1}}}}});
        let capped = cap_json(&value);
        assert_eq!(capped["a"]["b"]["c"]["d"], json!("[object: 1 fields]"));
    }
}
