//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the significant persons service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Fault injection and artificial latency.
    pub simulation: SimulationConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9000".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Serve the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Path of the scrape endpoint.
    pub metrics_path: String,

    /// Prefix for every metric name.
    pub metrics_namespace: String,

    /// Distributed tracing settings.
    pub tracing: TracingConfig,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "debug".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_path: "/metrics".to_string(),
            metrics_namespace: "ocmetricsexample".to_string(),
            tracing: TracingConfig::default(),
        }
    }
}

/// Distributed tracing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Bridge spans to OpenTelemetry.
    pub enabled: bool,

    /// `service.name` resource attribute.
    pub service_name: String,

    /// OTLP/HTTP traces endpoint. Spans are still created and correlated
    /// when unset, just not exported.
    pub otlp_endpoint: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: "significant-persons".to_string(),
            otlp_endpoint: None,
        }
    }
}

/// Demo aids that exercise the error and latency reporting paths.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Randomly fail list-all requests with a 500.
    pub fault_injection_enabled: bool,

    /// Probability of an injected fault, in [0, 1].
    pub fault_probability: f64,

    /// Sleep before completing successful responses.
    pub response_delay_enabled: bool,

    /// Upper bound (exclusive) of the uniform delay in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fault_injection_enabled: false,
            fault_probability: 0.4,
            response_delay_enabled: true,
            max_delay_ms: 1000,
        }
    }
}

impl SimulationConfig {
    /// No faults, no delay.
    pub fn disabled() -> Self {
        Self {
            fault_injection_enabled: false,
            response_delay_enabled: false,
            ..Self::default()
        }
    }
}
