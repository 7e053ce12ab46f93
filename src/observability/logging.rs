//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the logging subsystem (and the OpenTelemetry bridge)
//! - Provide the leveled, structured log sink used by the handler
//! - Flush buffered span exporters on shutdown
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and `RUST_LOG`

use std::fmt;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::observability::tracing::{build_tracer_provider, SpanHandle};
use crate::observability::TelemetryError;

/// Structured log fields as `(key, value)` pairs.
pub type Fields<'a> = &'a [(&'static str, String)];

/// Keys emitted as first-class event fields. Anything else is folded into
/// a single `extra` field.
pub const EVENT_KEYS: &[&str] = &[
    "method",
    "id",
    "request_id",
    "trace_id",
    "status",
    "outcome",
    "latency_ms",
    "error",
];

/// A captured log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
    /// Id of the span the entry was logged under.
    pub span: Option<u64>,
}

impl LogEntry {
    pub fn field(&self, key: &str) -> Option<&str> {
        lookup(&self.fields, key)
    }
}

fn lookup<'a>(fields: Fields<'a>, key: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.as_str())
}

/// Destination for leveled, structured log entries.
pub trait LogSink: Send + Sync {
    /// Log under `span`, or under whatever span is current when `None`.
    fn log(&self, span: Option<&SpanHandle>, level: Level, message: &str, fields: Fields<'_>);
}

struct FieldList<'a>(Vec<&'a (&'static str, String)>);

impl fmt::Display for FieldList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

fn extra_fields(fields: Fields<'_>) -> FieldList<'_> {
    FieldList(
        fields
            .iter()
            .filter(|(key, _)| !EVENT_KEYS.contains(key))
            .collect(),
    )
}

macro_rules! emit {
    ($level:expr, $fields:expr, $message:expr) => {{
        let fields = $fields;
        let extra = extra_fields(fields);
        tracing::event!(
            $level,
            method = lookup(fields, "method"),
            id = lookup(fields, "id"),
            request_id = lookup(fields, "request_id"),
            trace_id = lookup(fields, "trace_id"),
            status = lookup(fields, "status"),
            outcome = lookup(fields, "outcome"),
            latency_ms = lookup(fields, "latency_ms"),
            error = lookup(fields, "error"),
            extra = (!extra.0.is_empty()).then(|| tracing::field::display(&extra)),
            "{}",
            $message
        )
    }};
}

fn emit_event(level: Level, message: &str, fields: Fields<'_>) {
    if level == Level::ERROR {
        emit!(Level::ERROR, fields, message);
    } else if level == Level::WARN {
        emit!(Level::WARN, fields, message);
    } else if level == Level::INFO {
        emit!(Level::INFO, fields, message);
    } else if level == Level::DEBUG {
        emit!(Level::DEBUG, fields, message);
    } else {
        emit!(Level::TRACE, fields, message);
    }
}

/// Log sink that emits `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl LogSink for TracingLog {
    fn log(&self, span: Option<&SpanHandle>, level: Level, message: &str, fields: Fields<'_>) {
        match span {
            Some(handle) => handle.span().in_scope(|| emit_event(level, message, fields)),
            None => emit_event(level, message, fields),
        }
    }
}

/// Keeps the tracer provider alive; flush it with [`TelemetryGuard::shutdown`].
#[derive(Default)]
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    /// Flush buffered spans and stop the exporter.
    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "Failed to flush trace exporter");
            }
        }
    }
}

fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("significant_persons={level},tower_http={level}"))
    })
}

/// Install the global `tracing` subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<TelemetryGuard, TelemetryError> {
    let provider = if config.tracing.enabled {
        Some(build_tracer_provider(&config.tracing)?)
    } else {
        None
    };

    let fmt_layer = match config.log_format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
    };

    let otel_layer = provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer()
            .with_tracer(provider.tracer(config.tracing.service_name.clone()))
    });

    tracing_subscriber::registry()
        .with(default_filter(&config.log_level))
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(TelemetryGuard { provider })
}
