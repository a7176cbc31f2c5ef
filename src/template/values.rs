//! Variable-bag preparation for template rendering.
//!
//! Callers pass variables as plain strings. A value may also carry
//! JSON-serialized structured data; parsing it here lets templates iterate
//! over arrays and reach into objects with dotted paths, while plain scalars
//! keep their exact original text.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Build the render context from a caller-supplied variable bag.
///
/// Each string value is tentatively parsed as JSON:
/// - an object or array becomes structured data the template can traverse,
/// - anything else (parse failure or a JSON primitive) stays the original
///   string, so `"42"` interpolates as `42` and not as a re-serialized number.
pub(crate) fn prepare_variables(vars: &HashMap<String, String>) -> Value {
    let mut prepared = Map::new();
    for (name, raw) in vars {
        prepared.insert(name.clone(), prepare_value(raw));
    }
    Value::Object(prepared)
}

fn prepare_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) | Ok(value @ Value::Array(_)) => value,
        _ => Value::String(raw.to_string()),
    }
}
