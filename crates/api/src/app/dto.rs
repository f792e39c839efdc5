//! Wire shapes at the API boundary.

use axum::body::Bytes;
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Callable request body: `{ "data": ... }`.
#[derive(Debug, Default, Deserialize)]
pub struct CallableEnvelope {
    #[serde(default)]
    pub data: JsonValue,
}

/// Parse a request body as JSON.
///
/// An empty or non-JSON body is treated as `null`, so validators report the
/// missing fields instead of the transport rejecting the request.
pub fn json_body(body: &Bytes) -> JsonValue {
    if body.is_empty() {
        return JsonValue::Null;
    }
    serde_json::from_slice(body).unwrap_or(JsonValue::Null)
}

pub fn callable_envelope(body: &Bytes) -> CallableEnvelope {
    serde_json::from_value(json_body(body)).unwrap_or_default()
}
