//! Masking and truncation of values before they reach a log file.
//!
//! Masking is intentionally shallow: sensitive keys are replaced at the top
//! level and `depth` levels below it (one by default). Anything deeper is
//! serialized as-is.

use crate::config::RedactionConfig;
use serde_json::Value;

pub const MASK: &str = "***";
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone)]
pub struct Redactor {
    sensitive_fields: Vec<String>,
    depth: usize,
    max_string_len: usize,
    max_serialized_len: usize,
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(&RedactionConfig::default())
    }
}

impl Redactor {
    pub fn new(config: &RedactionConfig) -> Self {
        Self {
            sensitive_fields: config
                .sensitive_fields
                .iter()
                .map(|field| field.to_ascii_lowercase())
                .collect(),
            depth: config.depth,
            max_string_len: config.max_string_len,
            max_serialized_len: config.max_serialized_len,
        }
    }

    /// Renders `value` for a log line. Never fails.
    pub fn redact(&self, value: &Value) -> String {
        match value {
            Value::Null => "null".to_string(),
            Value::String(text) => truncate(text, self.max_string_len),
            Value::Object(_) | Value::Array(_) => {
                let masked = self.mask(value);
                truncate(&masked.to_string(), self.max_serialized_len)
            }
            scalar => truncate(&scalar.to_string(), self.max_string_len),
        }
    }

    /// Copy of `value` with sensitive keys replaced by [`MASK`].
    pub fn mask(&self, value: &Value) -> Value {
        let mut copy = value.clone();
        self.mask_in_place(&mut copy, self.depth);
        copy
    }

    pub fn is_sensitive(&self, key: &str) -> bool {
        self.sensitive_fields
            .iter()
            .any(|field| field.eq_ignore_ascii_case(key))
    }

    fn mask_in_place(&self, value: &mut Value, depth: usize) {
        match value {
            Value::Object(map) => {
                for (key, child) in map.iter_mut() {
                    if self.is_sensitive(key) {
                        *child = Value::String(MASK.to_string());
                    } else if depth > 0 {
                        self.mask_in_place(child, depth - 1);
                    }
                }
            }
            // arrays are containers, not a nesting level
            Value::Array(items) => {
                for item in items.iter_mut() {
                    self.mask_in_place(item, depth);
                }
            }
            _ => {}
        }
    }
}

/// Keeps the first `max` characters and marks the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + ELLIPSIS.len());
            out.push_str(&text[..cut]);
            out.push_str(ELLIPSIS);
            out
        }
        None => text.to_string(),
    }
}
