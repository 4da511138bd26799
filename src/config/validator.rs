use super::Config;
use anyhow::Result;
use axum::http::HeaderName;

pub fn validate_config(config: &Config) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    if config.server.port < 1024 {
        warnings.push(format!(
            "[!] Port {} requires root privileges. Consider using a port >= 1024",
            config.server.port
        ));
    }

    if !config.server.prefix.is_empty() && !config.server.prefix.starts_with('/') {
        warnings.push(format!(
            "[X] Route prefix must start with '/': {}",
            config.server.prefix
        ));
    }

    if config.server.body_limit == 0 {
        warnings.push("[X] Request body limit cannot be 0".to_string());
    }

    if !["trace", "debug", "info", "warn", "error"].contains(&config.logging.level.as_str()) {
        warnings.push(format!(
            "[X] Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
            config.logging.level
        ));
    }

    if !["json", "pretty", "compact"].contains(&config.logging.format.as_str()) {
        warnings.push(format!(
            "[X] Invalid log format: {}. Must be 'json', 'pretty' or 'compact'",
            config.logging.format
        ));
    }

    if config.logging.max_file_size == 0 {
        warnings.push("[X] Log max_file_size cannot be 0".to_string());
    } else if config.logging.max_file_size < 1024 {
        warnings.push(format!(
            "[!] Log max_file_size is only {} bytes. Files will rotate on almost every write.",
            config.logging.max_file_size
        ));
    }

    if config.logging.retention_days == 0 {
        warnings.push(
            "[!] Log retention is 0 days. Every existing log file will be deleted at startup."
                .to_string(),
        );
    }

    if let Some(offset) = config.logging.utc_offset_hours {
        if !(-12..=14).contains(&offset) {
            warnings.push(format!(
                "[X] utc_offset_hours {} is outside the range -12..=14",
                offset
            ));
        }
    }

    if !config.logging.application_file {
        warnings.push(
            "[i] application_file is disabled. Only errors will be written to disk.".to_string(),
        );
    }

    if config.redaction.sensitive_fields.is_empty() {
        warnings.push("[!] No sensitive fields configured. Passwords and tokens will be logged.".to_string());
    }

    if HeaderName::from_bytes(config.correlation.header.as_bytes()).is_err() {
        warnings.push(format!(
            "[X] Invalid correlation header name: {}",
            config.correlation.header
        ));
    }

    if config.environment.is_production()
        && (config.logging.level == "debug" || config.logging.level == "trace")
    {
        warnings.push(
            "[*] Recommendation: Use 'info' or 'warn' log level in production".to_string()
        );
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    #[test]
    fn test_default_config_has_no_errors() {
        let warnings = validate_config(&Config::default()).unwrap();
        assert!(warnings.iter().all(|w| !w.starts_with("[X]")), "{:?}", warnings);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        config.logging.max_file_size = 0;
        config.logging.utc_offset_hours = Some(20);
        config.correlation.header = "bad header".to_string();

        let warnings = validate_config(&config).unwrap();
        let errors: Vec<_> = warnings.iter().filter(|w| w.starts_with("[X]")).collect();
        assert_eq!(errors.len(), 4, "{:?}", warnings);
    }

    #[test]
    fn test_debug_level_in_production_is_flagged() {
        let mut config = Config::default();
        config.environment = Environment::Production;
        config.logging.level = "debug".to_string();

        let warnings = validate_config(&config).unwrap();
        assert!(warnings.iter().any(|w| w.starts_with("[*]")));
    }
}
