use std::path::PathBuf;

// Server defaults
pub(super) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(super) fn default_port() -> u16 {
    3000
}

pub(super) fn default_prefix() -> String {
    "/api/v1".to_string()
}

pub(super) fn default_body_limit() -> usize {
    crate::utils::MAX_BODY_SIZE
}

// Logging defaults
pub(super) fn default_true() -> bool {
    true
}

pub(super) fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_log_format() -> String {
    "pretty".to_string()
}

pub(super) fn default_log_directory() -> PathBuf {
    PathBuf::from("logs")
}

pub(super) fn default_max_file_size() -> u64 {
    20 * 1024 * 1024 // 20MB
}

pub(super) fn default_retention_days() -> u64 {
    30
}

pub(super) fn default_prune_interval_secs() -> u64 {
    3600 // 1 hour
}

// Redaction defaults
pub(super) fn default_sensitive_fields() -> Vec<String> {
    [
        "password",
        "token",
        "authorization",
        "cookie",
        "access_token",
        "refresh_token",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub(super) fn default_redaction_depth() -> usize {
    1
}

pub(super) fn default_max_string_len() -> usize {
    500
}

pub(super) fn default_max_serialized_len() -> usize {
    1000
}

// Correlation defaults
pub(super) fn default_correlation_header() -> String {
    "x-request-id".to_string()
}
