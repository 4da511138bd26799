use super::redact::Redactor;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Request,
    Response,
    Error,
}

/// One access-log entry. The file line is
/// `timestamp,requestId,method,url,code,delay[,payload:..][,response:..][,error:..]`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogRecord {
    pub kind: RecordKind,
    pub timestamp: String,
    pub request_id: String,
    pub method: Option<String>,
    pub url: Option<String>,
    pub remote_addr: Option<String>,
    pub user_agent: Option<String>,
    pub code: Option<u16>,
    pub delay_ms: Option<u64>,
    pub payload: Option<Value>,
    pub response: Option<Value>,
    pub error: Option<String>,
}

impl LogRecord {
    pub fn request(timestamp: String, request_id: String, method: String, url: String) -> Self {
        Self {
            kind: RecordKind::Request,
            timestamp,
            request_id,
            method: Some(method),
            url: Some(url),
            remote_addr: None,
            user_agent: None,
            code: None,
            delay_ms: None,
            payload: None,
            response: None,
            error: None,
        }
    }

    pub fn response(
        timestamp: String,
        request_id: String,
        method: String,
        url: String,
        code: u16,
        delay_ms: u64,
    ) -> Self {
        Self {
            kind: RecordKind::Response,
            code: Some(code),
            delay_ms: Some(delay_ms),
            ..Self::request(timestamp, request_id, method, url)
        }
    }

    pub fn error(
        timestamp: String,
        request_id: String,
        method: String,
        url: String,
        code: u16,
        delay_ms: u64,
        message: String,
    ) -> Self {
        Self {
            kind: RecordKind::Error,
            error: Some(message),
            ..Self::response(timestamp, request_id, method, url, code, delay_ms)
        }
    }

    pub fn with_client(mut self, remote_addr: Option<String>, user_agent: Option<String>) -> Self {
        self.remote_addr = remote_addr;
        self.user_agent = user_agent;
        self
    }

    pub fn with_payload(mut self, payload: Option<Value>) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_response(mut self, response: Option<Value>) -> Self {
        self.response = response;
        self
    }

    pub fn to_line(&self, redactor: &Redactor) -> String {
        let mut parts = vec![
            self.timestamp.clone(),
            placeholder(Some(&self.request_id), "unknown"),
            placeholder(self.method.as_deref(), "-"),
            placeholder(self.url.as_deref(), "-"),
            self.code.map(|code| code.to_string()).unwrap_or_else(|| "-".to_string()),
            self.delay_ms.map(|ms| format!("{}ms", ms)).unwrap_or_else(|| "-".to_string()),
        ];

        if let Some(payload) = present(&self.payload) {
            parts.push(format!("payload:{}", redactor.redact(payload)));
        }
        if let Some(response) = present(&self.response) {
            parts.push(format!("response:{}", redactor.redact(response)));
        }
        if let Some(error) = self.error.as_deref().filter(|e| !e.is_empty()) {
            parts.push(format!("error:{}", error));
        }

        parts.join(",")
    }

    /// JSON form for structured console output; payloads are masked the
    /// same way as in the file line.
    pub fn to_json(&self, redactor: &Redactor) -> String {
        let mut masked = self.clone();
        masked.payload = masked.payload.map(|p| redactor.mask(&p));
        masked.response = masked.response.map(|r| redactor.mask(&r));
        serde_json::to_string(&masked).unwrap_or_else(|_| "{}".to_string())
    }
}

fn placeholder(value: Option<&str>, missing: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => missing.to_string(),
    }
}

fn present(value: &Option<Value>) -> Option<&Value> {
    value.as_ref().filter(|v| !v.is_null())
}
