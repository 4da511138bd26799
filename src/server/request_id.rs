use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Reuses the header value verbatim when present and non-blank.
    pub fn from_headers(headers: &HeaderMap, header: &HeaderName) -> Self {
        headers
            .get(header)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.trim().is_empty())
            .map(|value| Self(value.to_string()))
            .unwrap_or_else(Self::generate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reuses a non-blank inbound id or generates one, stores it in the
/// request extensions and echoes it on the response.
pub async fn assign_request_id(
    State(header): State<HeaderName>,
    mut req: Request,
    next: Next,
) -> Response {
    let request_id = RequestId::from_headers(req.headers(), &header);
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(header, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn header() -> HeaderName {
        HeaderName::from_static("x-request-id")
    }

    #[test]
    fn test_inbound_header_is_reused_verbatim() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("Trace-42/abc"));

        let id = RequestId::from_headers(&headers, &header());
        assert_eq!(id.as_str(), "Trace-42/abc");
    }

    #[test]
    fn test_missing_header_generates_uuid() {
        let id = RequestId::from_headers(&HeaderMap::new(), &header());
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn test_blank_header_generates_uuid() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("   "));

        let id = RequestId::from_headers(&headers, &header());
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn test_generated_ids_do_not_collide() {
        let ids: HashSet<_> = (0..10_000).map(|_| RequestId::generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }
}
