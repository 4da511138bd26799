pub mod defaults;
pub mod parser;
pub mod types;
pub mod validator;

pub use types::Environment;

use defaults::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use anyhow::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub redaction: RedactionConfig,
    #[serde(default)]
    pub correlation: CorrelationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Global route prefix, empty for none
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
    /// Fixed UTC offset for log timestamps and file dates; local time when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_offset_hours: Option<i32>,
    /// When false only the error category is written to disk
    #[serde(default = "default_true")]
    pub application_file: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionConfig {
    #[serde(default = "default_sensitive_fields")]
    pub sensitive_fields: Vec<String>,
    /// Nesting levels below the top level that are masked
    #[serde(default = "default_redaction_depth")]
    pub depth: usize,
    #[serde(default = "default_max_string_len")]
    pub max_string_len: usize,
    #[serde(default = "default_max_serialized_len")]
    pub max_serialized_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationConfig {
    #[serde(default = "default_correlation_header")]
    pub header: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            prefix: default_prefix(),
            body_limit: default_body_limit(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            directory: default_log_directory(),
            max_file_size: default_max_file_size(),
            retention_days: default_retention_days(),
            prune_interval_secs: default_prune_interval_secs(),
            utc_offset_hours: None,
            application_file: true,
        }
    }
}

impl LoggingConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days.saturating_mul(24 * 60 * 60))
    }
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            sensitive_fields: default_sensitive_fields(),
            depth: default_redaction_depth(),
            max_string_len: default_max_string_len(),
            max_serialized_len: default_max_serialized_len(),
        }
    }
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            header: default_correlation_header(),
        }
    }
}

impl Config {
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        parser::parse_config(path)
    }

    /// Loads `path` when given, otherwise the built-in defaults. The
    /// `REQTRAIL_ENV` variable wins over the file's `environment`.
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.environment = Environment::from_env_or(config.environment);
        Ok(config)
    }

    pub fn validate(&self) -> Result<Vec<String>> {
        validator::validate_config(self)
    }
}
