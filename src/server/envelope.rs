use super::error::{ApiError, INTERNAL_ERROR_MESSAGE};
use crate::logging::Redactor;
use axum::http::StatusCode;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SUCCESS_MESSAGE: &str = "success";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope<T = Value> {
    pub success: bool,
    pub message: String,
    pub code: u16,
    pub timestamp: String,
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn wrap<T>(result: T, request_id: &str, status: StatusCode) -> ResponseEnvelope<T> {
    ResponseEnvelope {
        success: true,
        message: SUCCESS_MESSAGE.to_string(),
        code: status.as_u16(),
        timestamp: now_iso(),
        request_id: request_id.to_string(),
        data: Some(result),
    }
}

/// Failure envelope. Sensitive keys in the detail are masked before it
/// reaches the client.
pub fn wrap_error(error: &ApiError, request_id: &str, redactor: &Redactor) -> ResponseEnvelope<Value> {
    let payload = error.payload();
    let message = message_from_payload(&payload);
    let data = redactor.mask(&detail_from_payload(&payload, &message));

    ResponseEnvelope {
        success: false,
        message,
        code: error.status().as_u16(),
        timestamp: now_iso(),
        request_id: request_id.to_string(),
        data: Some(data),
    }
}

/// `message`, then `error`, then the generic internal message.
pub fn message_from_payload(payload: &Value) -> String {
    match payload {
        Value::String(message) if !message.is_empty() => message.clone(),
        Value::Object(map) => match map.get("message") {
            Some(Value::String(message)) if !message.is_empty() => message.clone(),
            // list of constraint messages
            Some(Value::Array(_)) => "Validation failed".to_string(),
            _ => map
                .get("error")
                .and_then(Value::as_str)
                .filter(|error| !error.is_empty())
                .unwrap_or(INTERNAL_ERROR_MESSAGE)
                .to_string(),
        },
        _ => INTERNAL_ERROR_MESSAGE.to_string(),
    }
}

/// Most specific detail available: validation list, then a
/// `details`/`errors` collection, then a single error string, then the
/// message itself.
pub fn detail_from_payload(payload: &Value, message: &str) -> Value {
    if let Value::Object(map) = payload {
        if let Some(list @ Value::Array(_)) = map.get("data") {
            return list.clone();
        }
        if let Some(list @ Value::Array(_)) = map.get("message") {
            return list.clone();
        }
        for key in ["details", "errors"] {
            match map.get(key) {
                Some(Value::Null) | None => {}
                Some(detail) => return detail.clone(),
            }
        }
        if let Some(error) = map.get("error").and_then(Value::as_str) {
            if error != message {
                return Value::String(error.to_string());
            }
        }
    }
    Value::String(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::error::FieldError;
    use serde_json::json;

    #[test]
    fn test_wrap_success() {
        let envelope = wrap(json!({"id": 1}), "req-1", StatusCode::CREATED);

        assert!(envelope.success);
        assert_eq!(envelope.message, "success");
        assert_eq!(envelope.code, 201);
        assert_eq!(envelope.request_id, "req-1");
        assert_eq!(envelope.data, Some(json!({"id": 1})));
        assert!(envelope.timestamp.ends_with('Z'));
    }

    #[test]
    fn test_not_found_envelope() {
        let err = ApiError::NotFound("Post with ID 5 not found".to_string());
        let envelope = wrap_error(&err, "req-5", &Redactor::default());

        assert!(!envelope.success);
        assert_eq!(envelope.code, 404);
        assert_eq!(envelope.message, "Post with ID 5 not found");
        assert_eq!(envelope.data, Some(json!("Post with ID 5 not found")));
    }

    #[test]
    fn test_validation_envelope_carries_field_list() {
        let err = ApiError::Validation(vec![
            FieldError::new("title", "title should not be empty"),
            FieldError::new("content", "content must be a string"),
        ]);
        let envelope = wrap_error(&err, "req-v", &Redactor::default());

        assert_eq!(envelope.code, 400);
        assert_eq!(envelope.message, "Validation failed");
        let data = envelope.data.unwrap();
        assert_eq!(data.as_array().unwrap().len(), 2);
        assert_eq!(data[0]["field"], "title");
    }

    #[test]
    fn test_details_and_error_fallbacks() {
        let status = StatusCode::CONFLICT;
        let err = ApiError::Status {
            status,
            payload: json!({"message": "Email taken", "details": {"email": "a@b.c"}}),
        };
        let envelope = wrap_error(&err, "r", &Redactor::default());
        assert_eq!(envelope.code, 409);
        assert_eq!(envelope.data, Some(json!({"email": "a@b.c"})));

        let err = ApiError::Status {
            status,
            payload: json!({"error": "Conflict"}),
        };
        let envelope = wrap_error(&err, "r", &Redactor::default());
        assert_eq!(envelope.message, "Conflict");
        assert_eq!(envelope.data, Some(json!("Conflict")));

        let err = ApiError::Status {
            status,
            payload: json!({"message": "Duplicate", "error": "Conflict"}),
        };
        assert_eq!(wrap_error(&err, "r", &Redactor::default()).data, Some(json!("Conflict")));
    }

    #[test]
    fn test_error_detail_is_masked() {
        let err = ApiError::Status {
            status: StatusCode::CONFLICT,
            payload: json!({"message": "dup", "details": {"email": "a@b.c", "password": "hunter2"}}),
        };
        let envelope = wrap_error(&err, "r", &Redactor::default());

        assert_eq!(envelope.data, Some(json!({"email": "a@b.c", "password": "***"})));
        assert!(!serde_json::to_string(&envelope).unwrap().contains("hunter2"));
    }

    #[test]
    fn test_internal_error_is_generic() {
        let err = ApiError::Internal(anyhow::anyhow!("disk on fire"));
        let envelope = wrap_error(&err, "r", &Redactor::default());

        assert_eq!(envelope.code, 500);
        assert_eq!(envelope.message, "Internal server error");
        assert!(!serde_json::to_string(&envelope).unwrap().contains("disk on fire"));
    }

    #[test]
    fn test_serialized_shape() {
        let envelope = wrap(json!([1, 2]), "abc", StatusCode::OK);
        let value = serde_json::to_value(&envelope).unwrap();

        for key in ["success", "message", "code", "timestamp", "requestId", "data"] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
    }

    #[test]
    fn test_payload_without_message() {
        assert_eq!(message_from_payload(&json!({})), "Internal server error");
        assert_eq!(message_from_payload(&json!(null)), "Internal server error");
        assert_eq!(message_from_payload(&json!("plain")), "plain");
    }
}
