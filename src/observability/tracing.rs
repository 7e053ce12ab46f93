//! Distributed tracing support.
//!
//! # Responsibilities
//! - Extract trace context from incoming requests (W3C `traceparent`)
//! - Create spans for the handler and its sub-operations
//! - Attach outcome fields to spans and finish them exactly once
//!
//! # Design Decisions
//! - Spans are `tracing` spans; `tracing-opentelemetry` bridges them to
//!   OpenTelemetry when the layer is installed
//! - Span handles are owned, not cloned: finishing consumes the handle
//! - The propagator belongs to the sink instead of the OpenTelemetry globals

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::http::HeaderMap;
use opentelemetry::propagation::{Extractor, TextMapPropagator};
use opentelemetry::trace::TraceContextExt;
use opentelemetry::Context;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use tracing::field::Empty;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::config::TracingConfig;
use crate::observability::TelemetryError;

/// Annotation field that marks a span as failed.
pub const ERROR_FIELD: &str = "error";

/// Annotation field carrying the HTTP status code.
pub const STATUS_CODE_FIELD: &str = "status_code";

/// Where a new span hangs in the trace.
#[derive(Debug)]
pub enum SpanParent<'a> {
    /// Start a new trace.
    Root,
    /// Continue a trace propagated by the caller.
    Remote(Context),
    /// Child of a span opened in this process.
    Local(&'a SpanHandle),
}

/// An open span. Finishing consumes it, so it cannot be finished twice.
#[derive(Debug)]
pub struct SpanHandle {
    id: u64,
    name: &'static str,
    span: tracing::Span,
    trace_id: Option<String>,
}

impl SpanHandle {
    pub fn new(id: u64, name: &'static str, span: tracing::Span) -> Self {
        let trace_id = trace_id_of(&span);
        Self {
            id,
            name,
            span,
            trace_id,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Hex trace id, when the span is bridged to OpenTelemetry.
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }
}

fn trace_id_of(span: &tracing::Span) -> Option<String> {
    let cx = span.context();
    let span_ref = cx.span();
    let span_context = span_ref.span_context();
    span_context
        .is_valid()
        .then(|| span_context.trace_id().to_string())
}

/// Span lifecycle management.
pub trait TraceSink: Send + Sync {
    /// Parent context propagated on the inbound request headers.
    fn extract_parent(&self, headers: &HeaderMap) -> SpanParent<'static> {
        let _ = headers;
        SpanParent::Root
    }

    fn start_span(&self, name: &'static str, parent: SpanParent<'_>) -> SpanHandle;

    fn annotate(&self, span: &SpanHandle, field: &'static str, value: &str);

    fn finish(&self, span: SpanHandle);
}

struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Extract a W3C trace context from request headers.
pub fn extract_remote_parent(
    propagator: &TraceContextPropagator,
    headers: &HeaderMap,
) -> SpanParent<'static> {
    let cx = propagator.extract(&HeaderExtractor(headers));
    if cx.span().span_context().is_valid() {
        SpanParent::Remote(cx)
    } else {
        SpanParent::Root
    }
}

/// Trace sink backed by `tracing` spans.
pub struct TracingSink {
    propagator: TraceContextPropagator,
    next_id: AtomicU64,
}

impl TracingSink {
    pub fn new() -> Self {
        Self {
            propagator: TraceContextPropagator::new(),
            next_id: AtomicU64::new(0),
        }
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceSink for TracingSink {
    fn extract_parent(&self, headers: &HeaderMap) -> SpanParent<'static> {
        extract_remote_parent(&self.propagator, headers)
    }

    fn start_span(&self, name: &'static str, parent: SpanParent<'_>) -> SpanHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let span = match &parent {
            SpanParent::Local(handle) => tracing::info_span!(
                parent: &handle.span,
                "operation",
                otel.name = name,
                otel.status_code = Empty,
                otel.status_message = Empty,
                http.status_code = Empty,
            ),
            SpanParent::Root | SpanParent::Remote(_) => tracing::info_span!(
                parent: None,
                "request",
                otel.name = name,
                otel.kind = "server",
                otel.status_code = Empty,
                otel.status_message = Empty,
                http.status_code = Empty,
            ),
        };
        if let SpanParent::Remote(cx) = parent {
            let _ = span.set_parent(cx);
        }
        SpanHandle::new(id, name, span)
    }

    fn annotate(&self, span: &SpanHandle, field: &'static str, value: &str) {
        match field {
            ERROR_FIELD => {
                span.span.record("otel.status_code", "ERROR");
                span.span.record("otel.status_message", value);
            }
            STATUS_CODE_FIELD => {
                span.span.record("http.status_code", value);
            }
            _ => {}
        }
        tracing::debug!(
            parent: &span.span,
            annotation.field = field,
            annotation.value = value,
            "span annotation"
        );
    }

    fn finish(&self, span: SpanHandle) {
        drop(span);
    }
}

/// A span that finishes when it goes out of scope.
pub struct ScopedSpan {
    sink: Arc<dyn TraceSink>,
    handle: Option<SpanHandle>,
}

impl ScopedSpan {
    pub fn new(sink: Arc<dyn TraceSink>, handle: SpanHandle) -> Self {
        Self {
            sink,
            handle: Some(handle),
        }
    }

    pub fn annotate(&self, field: &'static str, value: &str) {
        if let Some(handle) = &self.handle {
            self.sink.annotate(handle, field, value);
        }
    }

    pub fn handle(&self) -> Option<&SpanHandle> {
        self.handle.as_ref()
    }
}

impl Drop for ScopedSpan {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.sink.finish(handle);
        }
    }
}

/// Build the OpenTelemetry tracer provider. Spans are exported over
/// OTLP/HTTP only when an endpoint is configured.
pub fn build_tracer_provider(config: &TracingConfig) -> Result<SdkTracerProvider, TelemetryError> {
    let resource = Resource::builder()
        .with_service_name(config.service_name.clone())
        .build();

    let mut builder = SdkTracerProvider::builder().with_resource(resource);
    if let Some(endpoint) = &config.otlp_endpoint {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(endpoint.clone())
            .build()?;
        builder = builder.with_batch_exporter(exporter);
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_without_headers_is_root() {
        let sink = TracingSink::new();
        assert!(matches!(sink.extract_parent(&HeaderMap::new()), SpanParent::Root));
    }

    #[test]
    fn test_extract_traceparent() {
        let sink = TracingSink::new();
        let mut headers = HeaderMap::new();
        headers.insert(
            "traceparent",
            HeaderValue::from_static("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"),
        );
        match sink.extract_parent(&headers) {
            SpanParent::Remote(cx) => {
                assert_eq!(
                    cx.span().span_context().trace_id().to_string(),
                    "4bf92f3577b34da6a3ce929d0e0e4736"
                );
            }
            other => panic!("expected remote parent, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_traceparent_is_root() {
        let sink = TracingSink::new();
        let mut headers = HeaderMap::new();
        headers.insert("traceparent", HeaderValue::from_static("not-a-trace"));
        assert!(matches!(sink.extract_parent(&headers), SpanParent::Root));
    }

    #[test]
    fn test_span_ids_are_unique() {
        let sink = TracingSink::new();
        let root = sink.start_span("root", SpanParent::Root);
        let child = sink.start_span("child", SpanParent::Local(&root));
        assert_ne!(root.id(), child.id());
        assert_eq!(child.name(), "child");
        sink.annotate(&child, ERROR_FIELD, "boom");
        sink.finish(child);
        sink.finish(root);
    }
}
