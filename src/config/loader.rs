//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ServiceConfig, ConfigError> {
    let config: ServiceConfig = toml::from_str(content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:9000");
        assert_eq!(config.observability.metrics_path, "/metrics");
        assert!(!config.simulation.fault_injection_enabled);
        assert!(config.simulation.response_delay_enabled);
        assert_eq!(config.simulation.max_delay_ms, 1000);
    }

    #[test]
    fn test_partial_config() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "0.0.0.0:8080"

            [observability]
            log_format = "json"

            [observability.tracing]
            otlp_endpoint = "http://localhost:4318/v1/traces"

            [simulation]
            fault_injection_enabled = true
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.observability.log_format, crate::config::LogFormat::Json);
        assert_eq!(config.observability.metrics_namespace, "ocmetricsexample");
        assert_eq!(
            config.observability.tracing.otlp_endpoint.as_deref(),
            Some("http://localhost:4318/v1/traces")
        );
        assert!(config.simulation.fault_injection_enabled);
        assert_eq!(config.simulation.fault_probability, 0.4);
    }

    #[test]
    fn test_invalid_config_reports_validation() {
        let err = parse_config(
            r#"
            [simulation]
            fault_probability = 2.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("fault_probability"));
    }

    #[test]
    fn test_malformed_toml() {
        let err = parse_config("[listener\nbind_address = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/significant-persons.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_bundled_example_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("significant-persons.toml");
        let config = load_config(&path).unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:9000");
        assert_eq!(config.observability.metrics_namespace, "ocmetricsexample");
        assert!(config.observability.tracing.otlp_endpoint.is_none());
    }
}
