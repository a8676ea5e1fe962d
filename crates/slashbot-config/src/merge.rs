//! Deep merge of JSON config layers.

use serde_json::Value;

/// Dotted paths whose array values extend (deduped) instead of replacing.
const EXTEND_PATHS: &[&str] = &["plugins.paths"];

/// Recursively deep-merge `overlay` into `base`.
///
/// - Objects merge recursively per-field.
/// - Scalars and arrays from the overlay **replace** the base value,
///   except at the paths in [`EXTEND_PATHS`], where arrays extend with
///   dedupe (base order kept, overlay additions appended).
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    merge_at(base, overlay, "");
}

fn merge_at(base: &mut Value, overlay: &Value, path: &str) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                if let Some(base_val) = base_map.get_mut(key) {
                    merge_at(base_val, overlay_val, &child_path);
                } else {
                    base_map.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (Value::Array(base_items), Value::Array(overlay_items))
            if EXTEND_PATHS.contains(&path) =>
        {
            for item in overlay_items {
                if !base_items.contains(item) {
                    base_items.push(item.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}
