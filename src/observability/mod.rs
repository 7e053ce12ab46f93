//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request handler
//!     → context.rs (one InstrumentationContext per request)
//!         → logging.rs (structured log events with correlation fields)
//!         → metrics.rs (counter, latency and id histograms)
//!         → tracing.rs (root span + child spans per sub-operation)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Distributed tracing (OTLP export, optional)
//! ```
//!
//! # Design Decisions
//! - Sinks are traits, constructed once at startup and injected via [`Telemetry`]
//! - Request ID and trace ID flow through every log entry
//! - Metrics are cheap (atomic increments)
//! - recording.rs provides in-memory sinks for tests

pub mod context;
pub mod logging;
pub mod metrics;
pub mod recording;
pub mod tracing;

use std::sync::Arc;

use crate::config::ObservabilityConfig;

pub use context::{Correlation, InstrumentationContext, Outcome};
pub use logging::{init_logging, LogSink, TelemetryGuard, TracingLog};
pub use metrics::{MetricNames, MetricsSink, PrometheusSink};
pub use self::tracing::{ScopedSpan, SpanHandle, SpanParent, TraceSink, TracingSink};

/// Errors raised while setting up telemetry. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to build metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to build span exporter: {0}")]
    Exporter(#[from] opentelemetry_otlp::ExporterBuildError),

    #[error("failed to install log subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// The three sinks every request reports to.
#[derive(Clone)]
pub struct Telemetry {
    pub metrics: Arc<dyn MetricsSink>,
    pub traces: Arc<dyn TraceSink>,
    pub logs: Arc<dyn LogSink>,
    pub names: MetricNames,
}

impl Telemetry {
    pub fn new(
        metrics: Arc<dyn MetricsSink>,
        traces: Arc<dyn TraceSink>,
        logs: Arc<dyn LogSink>,
        names: MetricNames,
    ) -> Self {
        Self {
            metrics,
            traces,
            logs,
            names,
        }
    }

    /// Production sinks: Prometheus metrics, `tracing` spans and events.
    pub fn from_config(config: &ObservabilityConfig) -> Result<Self, TelemetryError> {
        let names = MetricNames::new(&config.metrics_namespace);
        let metrics = Arc::new(PrometheusSink::new(&names)?);
        Ok(Self::new(
            metrics,
            Arc::new(TracingSink::new()),
            Arc::new(TracingLog),
            names,
        ))
    }
}
