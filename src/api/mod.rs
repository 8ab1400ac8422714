//! Typed wrappers over the remote API endpoints
//!
//! Each submodule pairs a fetch function (building the exact query parameters
//! the endpoint expects) with extractors that decode the loose response
//! envelopes into usable values.

use serde_json::Value;

use crate::client::Payload;

pub mod directory;
pub mod reviews;
pub mod users;

const EMPTY: &[Value] = &[];

/// Extract a list from a response envelope.
///
/// Known envelope shapes, tried in order:
/// 1. `{"result": {"<key>": [..]}}` - the canonical shape
/// 2. `{"<key>": [..]}` - bare shape some endpoints return
/// 3. anything else, including non-JSON degraded payloads, decodes as empty
pub fn extract_list<'a>(payload: &'a Payload, key: &str) -> &'a [Value] {
    let Some(root) = payload.as_json() else {
        return EMPTY;
    };
    if let Some(list) = root
        .get("result")
        .and_then(|result| result.get(key))
        .and_then(Value::as_array)
    {
        return list;
    }
    if let Some(list) = root.get(key).and_then(Value::as_array) {
        return list;
    }
    EMPTY
}

/// Extract a stable integer id from a user-like object, preferring `id` and
/// falling back to `user_id`. Accepts integers and numeric strings.
pub fn extract_user_id(obj: &Value) -> Option<i64> {
    let raw = obj
        .get("id")
        .filter(|v| !v.is_null())
        .or_else(|| obj.get("user_id"))?;
    id_from_value(raw)
}

/// Coerce a JSON value into an integer id.
pub(crate) fn id_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
