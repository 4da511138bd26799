use crate::server::error::ApiError;
use axum::body::Body;
use axum::http::HeaderMap;
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::{Map, Value};

/// Maximum request body size (10MB by default)
pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Header value as an owned string. Non-UTF-8 and empty values are skipped.
pub fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
}

/// Read request body with size limit
///
/// Buffers the whole body, failing with `413` once more than `max_size`
/// bytes have arrived.
pub async fn read_body_with_limit(body: Body, max_size: usize) -> Result<Bytes, ApiError> {
    match Limited::new(body, max_size).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(ApiError::PayloadTooLarge(
            format!("Request body too large (max: {} bytes)", max_size),
        )),
        Err(e) => Err(ApiError::BadRequest(format!("Failed to read request body: {}", e))),
    }
}

/// Interprets a buffered body: JSON when it parses, form fields for
/// urlencoded bodies, otherwise text. Empty bodies yield `None`.
pub fn parse_body(bytes: &[u8], content_type: Option<&str>) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
        return Some(value);
    }

    let text = String::from_utf8_lossy(bytes);
    let is_form = content_type
        .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);
    if is_form {
        return Some(Value::Object(parse_query(&text)));
    }
    Some(Value::String(text.into_owned()))
}

/// Decodes `a=1&b=two+words` into a JSON object. Later duplicates win.
pub fn parse_query(query: &str) -> Map<String, Value> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(key);
            if key.is_empty() {
                return None;
            }
            Some((key, Value::String(decode_component(value))))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    let decoded = urlencoding::decode(&spaced).map(|s| s.into_owned()).ok();
    decoded.unwrap_or(spaced)
}

/// Body, query and path parameters folded into one object for logging.
/// A non-object body is kept under `body`.
pub fn merge_payload(
    body: Option<Value>,
    query: Map<String, Value>,
    params: &[(String, String)],
) -> Option<Value> {
    let mut merged = Map::new();

    match body {
        Some(Value::Object(fields)) => merged.extend(fields),
        Some(Value::Null) | None => {}
        Some(other) => {
            merged.insert("body".to_string(), other);
        }
    }
    merged.extend(query);
    for (key, value) in params {
        merged.insert(key.clone(), Value::String(value.clone()));
    }

    if merged.is_empty() {
        None
    } else {
        Some(Value::Object(merged))
    }
}
