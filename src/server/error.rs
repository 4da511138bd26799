use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub errors: Vec<String>,
}

impl FieldError {
    pub fn new(field: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            errors: vec![error.into()],
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// Any other status with a framework-style structured payload.
    #[error("HTTP {status}")]
    Status { status: StatusCode, payload: Value },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Status { status, .. } => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Structured payload the envelope builder reads message and detail from.
    pub fn payload(&self) -> Value {
        match self {
            Self::Validation(errors) => json!({
                "message": "Validation failed",
                "data": errors,
            }),
            Self::BadRequest(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::PayloadTooLarge(message) => json!({ "message": message }),
            Self::Unauthorized => json!({ "message": "Unauthorized" }),
            Self::Status { payload, .. } => payload.clone(),
            Self::Internal(_) => json!({ "message": INTERNAL_ERROR_MESSAGE }),
        }
    }

    /// Message for the `error:` section of the log line. Unlike the
    /// payload it includes internal causes.
    pub fn log_message(&self) -> String {
        match self {
            Self::Internal(e) => format!("{:#}", e),
            Self::Status { payload, .. } => super::envelope::message_from_payload(payload),
            other => other.to_string(),
        }
    }
}

/// Marker the pipeline reads back from the response extensions.
#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    Success(Value),
    Failure(Arc<ApiError>),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = self.status().into_response();
        response
            .extensions_mut()
            .insert(Outcome::Failure(Arc::new(self)));
        response
    }
}

/// Successful handler result. Rendered into an envelope by the pipeline.
#[derive(Debug, Clone)]
pub struct Reply<T> {
    status: StatusCode,
    data: T,
}

impl<T> Reply<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            data,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        match serde_json::to_value(&self.data) {
            Ok(data) => {
                let mut response = self.status.into_response();
                response.extensions_mut().insert(Outcome::Success(data));
                response
            }
            Err(e) => ApiError::Internal(anyhow::Error::new(e).context("Failed to serialize response"))
                .into_response(),
        }
    }
}

pub type ApiResult<T> = Result<Reply<T>, ApiError>;
