//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, probability in [0, 1])
//! - Keep the artificial delay shorter than the request timeout
//! - Detect route collisions between the scrape endpoint and the API
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ServiceConfig;
use crate::http::server::PERSONS_PATH;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    let observability = &config.observability;
    if !observability.metrics_path.starts_with('/') {
        errors.push(ValidationError::new(
            "observability.metrics_path",
            "must start with '/'",
        ));
    } else if observability.metrics_path == PERSONS_PATH {
        errors.push(ValidationError::new(
            "observability.metrics_path",
            format!("collides with {}", PERSONS_PATH),
        ));
    }

    if !is_metric_identifier(&observability.metrics_namespace) {
        errors.push(ValidationError::new(
            "observability.metrics_namespace",
            format!("'{}' is not a valid metric name prefix", observability.metrics_namespace),
        ));
    }

    if observability.tracing.service_name.trim().is_empty() {
        errors.push(ValidationError::new(
            "observability.tracing.service_name",
            "must not be empty",
        ));
    }

    let probability = config.simulation.fault_probability;
    if !(0.0..=1.0).contains(&probability) {
        errors.push(ValidationError::new(
            "simulation.fault_probability",
            format!("{} is outside [0, 1]", probability),
        ));
    }

    let simulation = &config.simulation;
    let timeout_ms = config.timeouts.request_secs.saturating_mul(1000);
    if simulation.response_delay_enabled && timeout_ms > 0 && simulation.max_delay_ms >= timeout_ms {
        errors.push(ValidationError::new(
            "simulation.max_delay_ms",
            format!(
                "{} ms can outlast the {} s request timeout",
                simulation.max_delay_ms, config.timeouts.request_secs
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_metric_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
