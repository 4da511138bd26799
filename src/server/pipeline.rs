use super::envelope::{message_from_payload, wrap, wrap_error, ResponseEnvelope};
use super::error::{ApiError, Outcome};
use super::request_id::RequestId;
use crate::logging::Redactor;
use crate::utils::http::{header_str, merge_payload, parse_body, parse_query, read_body_with_limit};
use axum::body::Body;
use axum::extract::{ConnectInfo, FromRequestParts, OriginalUri, RawPathParams, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info_span, Instrument};

/// What the stages know about an inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub method: String,
    pub url: String,
    pub remote_addr: Option<String>,
    pub user_agent: Option<String>,
    /// Merged body, query and path parameters; `None` when all were empty
    pub payload: Option<Value>,
    pub arrived_at: DateTime<Utc>,
    started: Instant,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>, method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            method: method.into(),
            url: url.into(),
            remote_addr: None,
            user_agent: None,
            payload: None,
            arrived_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Milliseconds since the request arrived.
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Result of one request as seen by the stages.
#[derive(Debug)]
pub struct Completion<'a> {
    pub envelope: &'a ResponseEnvelope<Value>,
    pub elapsed_ms: u64,
    /// Log-only failure description, may include internal causes
    pub cause: Option<&'a str>,
}

pub trait Stage: Send + Sync {
    fn on_request(&self, _ctx: &RequestContext) {}

    fn on_response(&self, _ctx: &RequestContext, _done: &Completion<'_>) {}

    fn on_error(&self, _ctx: &RequestContext, _done: &Completion<'_>) {}
}

/// Stages run `on_request` in registration order before the handler and
/// `on_response`/`on_error` in reverse order after the envelope is built.
#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
    body_limit: usize,
    redactor: Redactor,
}

impl Pipeline {
    pub fn new(body_limit: usize) -> Self {
        Self {
            stages: Vec::new(),
            body_limit,
            redactor: Redactor::default(),
        }
    }

    /// Redactor applied to error detail before it is sent to the client.
    pub fn with_redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = redactor;
        self
    }

    pub fn with_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn request(&self, ctx: &RequestContext) {
        for stage in &self.stages {
            stage.on_request(ctx);
        }
    }

    pub fn complete(&self, ctx: &RequestContext, done: &Completion<'_>) {
        for stage in self.stages.iter().rev() {
            if done.envelope.success {
                stage.on_response(ctx, done);
            } else {
                stage.on_error(ctx, done);
            }
        }
    }
}

pub async fn run_pipeline(
    State(pipeline): State<Arc<Pipeline>>,
    req: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let arrived_at = Utc::now();

    let (mut parts, body) = req.into_parts();
    let request_id = match parts.extensions.get::<RequestId>() {
        Some(id) => id.clone(),
        None => {
            let id = RequestId::generate();
            parts.extensions.insert(id.clone());
            id
        }
    };

    let url = parts
        .extensions
        .get::<OriginalUri>()
        .map(|uri| uri.0.to_string())
        .unwrap_or_else(|| parts.uri.to_string());
    let params: Vec<(String, String)> = match RawPathParams::from_request_parts(&mut parts, &()).await {
        Ok(raw) => raw
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        Err(_) => Vec::new(),
    };

    let (bytes, body_error) = match read_body_with_limit(body, pipeline.body_limit).await {
        Ok(bytes) => (bytes, None),
        Err(e) => (Bytes::new(), Some(e)),
    };

    let content_type = header_str(&parts.headers, header::CONTENT_TYPE.as_str());
    let query = parts.uri.query().map(parse_query).unwrap_or_default();
    let payload = merge_payload(parse_body(&bytes, content_type.as_deref()), query, &params);

    let ctx = RequestContext {
        request_id: request_id.to_string(),
        method: parts.method.to_string(),
        url,
        remote_addr: parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip().to_string()),
        user_agent: header_str(&parts.headers, header::USER_AGENT.as_str()),
        payload,
        arrived_at,
        started,
    };

    pipeline.request(&ctx);

    let response = match body_error {
        Some(e) => e.into_response(),
        None => {
            let span = info_span!(
                "request",
                request_id = %ctx.request_id,
                method = %ctx.method,
                uri = %ctx.url
            );
            let req = Request::from_parts(parts, Body::from(bytes));
            next.run(req).instrument(span).await
        }
    };

    let (response, envelope, cause) = settle(response, &ctx.request_id, &pipeline.redactor).await;
    let done = Completion {
        envelope: &envelope,
        elapsed_ms: ctx.elapsed_ms(),
        cause: cause.as_deref(),
    };
    pipeline.complete(&ctx, &done);

    render(response, &envelope)
}

/// Builds the envelope for whatever the handler produced. Responses that
/// bypassed `Reply`/`ApiError` are enveloped from their status and body.
async fn settle(
    response: Response,
    request_id: &str,
    redactor: &Redactor,
) -> (axum::http::response::Parts, ResponseEnvelope<Value>, Option<String>) {
    let (mut parts, body) = response.into_parts();

    let (envelope, cause) = match parts.extensions.remove::<Outcome>() {
        Some(Outcome::Success(data)) => (wrap(data, request_id, parts.status), None),
        Some(Outcome::Failure(err)) => {
            (wrap_error(&err, request_id, redactor), Some(err.log_message()))
        }
        // handler bodies are already in memory, no limit on re-reading them
        None => match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => settle_raw(parts.status, &bytes, request_id, redactor),
            Err(e) => {
                let err = ApiError::Internal(
                    anyhow::Error::new(e).context("Failed to read response body"),
                );
                (wrap_error(&err, request_id, redactor), Some(err.log_message()))
            }
        },
    };

    parts.status = StatusCode::from_u16(envelope.code).unwrap_or(parts.status);
    (parts, envelope, cause)
}

fn settle_raw(
    status: StatusCode,
    bytes: &[u8],
    request_id: &str,
    redactor: &Redactor,
) -> (ResponseEnvelope<Value>, Option<String>) {
    let data = parse_body(bytes, None).unwrap_or(Value::Null);

    if status.is_success() || status.is_redirection() {
        return (wrap(data, request_id, status), None);
    }

    let payload = if data.is_null() {
        Value::String(status.canonical_reason().unwrap_or("Error").to_string())
    } else {
        data
    };
    let cause = message_from_payload(&payload);
    let err = ApiError::Status { status, payload };
    (wrap_error(&err, request_id, redactor), Some(cause))
}

fn render(mut parts: axum::http::response::Parts, envelope: &ResponseEnvelope<Value>) -> Response {
    let body = match serde_json::to_vec(envelope) {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, "Failed to serialize response envelope");
            br#"{"success":false,"message":"Internal server error","code":500}"#.to_vec()
        }
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Response::from_parts(parts, Body::from(body))
}
