//! Embedded linked-data (`application/ld+json`) lookups.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

static LD_JSON: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

/// Every JSON object in the page's linked-data blocks, with top-level arrays
/// and `@graph` lists flattened. Unparseable blocks are skipped.
pub fn linked_data(document: &Html) -> Vec<Value> {
    let mut objects = Vec::new();
    for script in document.select(&LD_JSON) {
        let raw: String = script.text().collect();
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(value) => flatten(value, &mut objects),
            Err(e) => debug!(error = %e, "Skipping malformed linked-data block"),
        }
    }
    objects
}

fn flatten(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|v| flatten(v, out)),
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                flatten(graph, out);
            }
            if !map.is_empty() {
                out.push(Value::Object(map));
            }
        }
        _ => {}
    }
}

/// First non-empty string found under `key` across the objects.
pub fn string_field(objects: &[Value], key: &str) -> Option<String> {
    objects
        .iter()
        .filter_map(|o| o.get(key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Names in a person-ish value: a string, an object with `name`, or a list of
/// either, comma-joined.
pub fn names(value: &Value) -> Option<String> {
    let joined = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Object(map) => map
            .get("name")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        Value::Array(items) => items
            .iter()
            .filter_map(names)
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    };
    (!joined.is_empty()).then_some(joined)
}
