//! Per-request instrumentation context.
//!
//! Binds one request's timer, root span and correlation fields together so
//! the handler manages a single resource instead of three. The context is
//! acquired in [`InstrumentationContext::begin`] and released exactly once,
//! either through [`InstrumentationContext::end`] or, on panic or
//! cancellation, by `Drop`. A dropped context reports [`Outcome::Cancelled`]
//! and no status code, since the response (if any) came from the middleware.

use std::time::Instant;

use axum::http::StatusCode;
use tracing::Level;

use crate::observability::metrics::{LABEL_METHOD, LABEL_STATUS};
use crate::observability::tracing::{
    ScopedSpan, SpanHandle, SpanParent, ERROR_FIELD, STATUS_CODE_FIELD,
};
use crate::observability::Telemetry;

/// Root span name for the persons handler.
pub const HANDLER_SPAN: &str = "process_handler";

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    ClientError,
    ServerError,
    /// The handler future was dropped before producing a response.
    Cancelled,
}

impl Outcome {
    pub fn from_status(status: StatusCode) -> Self {
        if status.is_server_error() {
            Outcome::ServerError
        } else if status.is_client_error() {
            Outcome::ClientError
        } else {
            Outcome::Success
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::ClientError => "client_error",
            Outcome::ServerError => "server_error",
            Outcome::Cancelled => "cancelled",
        }
    }
}

/// Request-scoped identifiers attached to every log entry.
#[derive(Debug, Clone, Default)]
pub struct Correlation {
    pub method: String,
    pub id: Option<String>,
    pub request_id: Option<String>,
}

/// The instrumentation bundle for one request.
pub struct InstrumentationContext {
    telemetry: Telemetry,
    started: Instant,
    span: Option<SpanHandle>,
    correlation: Correlation,
    trace_id: Option<String>,
    error: Option<String>,
}

impl InstrumentationContext {
    /// Start timing and open the root span under `parent`.
    pub fn begin(telemetry: &Telemetry, correlation: Correlation, parent: SpanParent<'_>) -> Self {
        let started = Instant::now();
        let span = telemetry.traces.start_span(HANDLER_SPAN, parent);
        telemetry.traces.annotate(&span, "method", &correlation.method);
        let trace_id = span.trace_id().map(str::to_string);

        let ctx = Self {
            telemetry: telemetry.clone(),
            started,
            span: Some(span),
            correlation,
            trace_id,
            error: None,
        };
        ctx.log(Level::DEBUG, "process handler called", &[]);
        ctx
    }

    /// Open a child span for a sub-operation; it finishes when dropped.
    pub fn child(&self, name: &'static str) -> Option<ScopedSpan> {
        let parent = self.span.as_ref()?;
        let handle = self
            .telemetry
            .traces
            .start_span(name, SpanParent::Local(parent));
        Some(ScopedSpan::new(self.telemetry.traces.clone(), handle))
    }

    /// Annotate the root span.
    pub fn annotate(&self, field: &'static str, value: &str) {
        if let Some(span) = &self.span {
            self.telemetry.traces.annotate(span, field, value);
        }
    }

    /// Remember an error message for the outcome annotation.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Emit a log entry carrying the correlation fields.
    pub fn log(&self, level: Level, message: &str, fields: &[(&'static str, String)]) {
        let mut all = Vec::with_capacity(fields.len() + 4);
        all.push(("method", self.correlation.method.clone()));
        if let Some(id) = &self.correlation.id {
            all.push(("id", id.clone()));
        }
        if let Some(request_id) = &self.correlation.request_id {
            all.push(("request_id", request_id.clone()));
        }
        if let Some(trace_id) = &self.trace_id {
            all.push(("trace_id", trace_id.clone()));
        }
        all.extend_from_slice(fields);
        self.telemetry
            .logs
            .log(self.span.as_ref(), level, message, &all);
    }

    /// Close the span and emit the request metrics.
    pub fn end(mut self, outcome: Outcome, status: StatusCode) {
        self.complete(outcome, Some(status));
    }

    fn complete(&mut self, outcome: Outcome, status: Option<StatusCode>) {
        let Some(span) = self.span.as_ref() else {
            return;
        };

        let traces = &self.telemetry.traces;
        traces.annotate(span, "outcome", outcome.as_str());
        if let Some(status) = status {
            traces.annotate(span, STATUS_CODE_FIELD, status.as_str());
        }
        if let Some(error) = &self.error {
            traces.annotate(span, ERROR_FIELD, error);
        }

        let latency_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let metrics = &self.telemetry.metrics;
        let names = &self.telemetry.names;
        metrics.increment_counter(&names.requests);
        metrics.observe_histogram(
            &names.latency,
            &[(LABEL_METHOD, self.correlation.method.clone())],
            latency_ms,
        );
        if outcome == Outcome::Success {
            if let Some(value) = self.correlation.id.as_deref().and_then(numeric_id) {
                metrics.observe_histogram(
                    &names.persons_by_id,
                    &[(LABEL_STATUS, "OK".to_string())],
                    value,
                );
            }
        }

        let mut fields = vec![
            ("outcome", outcome.as_str().to_string()),
            ("latency_ms", format!("{:.3}", latency_ms)),
        ];
        if let Some(status) = status {
            fields.insert(0, ("status", status.as_u16().to_string()));
        }
        self.log(Level::DEBUG, "request completed", &fields);

        if let Some(span) = self.span.take() {
            self.telemetry.traces.finish(span);
        }
    }
}

impl Drop for InstrumentationContext {
    fn drop(&mut self) {
        if self.span.is_some() {
            if self.error.is_none() {
                self.error = Some("request dropped before completion".to_string());
            }
            self.log(Level::WARN, "request ended without a response", &[]);
            self.complete(Outcome::Cancelled, None);
        }
    }
}

/// Requested ids that read as numbers are sampled into the id histogram.
fn numeric_id(id: &str) -> Option<f64> {
    id.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::observability::metrics::MetricNames;
    use crate::observability::recording::{RecordingLogs, RecordingMetrics, RecordingTraces};

    struct Fixture {
        telemetry: Telemetry,
        metrics: Arc<RecordingMetrics>,
        traces: Arc<RecordingTraces>,
        logs: Arc<RecordingLogs>,
    }

    fn fixture() -> Fixture {
        let metrics = Arc::new(RecordingMetrics::new());
        let traces = Arc::new(RecordingTraces::new());
        let logs = Arc::new(RecordingLogs::new());
        let telemetry = Telemetry::new(
            metrics.clone(),
            traces.clone(),
            logs.clone(),
            MetricNames::default(),
        );
        Fixture {
            telemetry,
            metrics,
            traces,
            logs,
        }
    }

    fn correlation(method: &str, id: Option<&str>) -> Correlation {
        Correlation {
            method: method.to_string(),
            id: id.map(str::to_string),
            request_id: Some("req-1".to_string()),
        }
    }

    #[test]
    fn test_begin_logs_entry() {
        let f = fixture();
        let ctx = InstrumentationContext::begin(&f.telemetry, correlation("GET", Some("2")), SpanParent::Root);

        let entries = f.logs.with_message("process handler called");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, Level::DEBUG);
        assert_eq!(entries[0].field("method"), Some("GET"));
        assert_eq!(entries[0].field("id"), Some("2"));
        assert_eq!(entries[0].field("request_id"), Some("req-1"));

        ctx.end(Outcome::Success, StatusCode::OK);
    }

    #[test]
    fn test_end_emits_everything_once() {
        let f = fixture();
        let names = f.telemetry.names.clone();
        let ctx = InstrumentationContext::begin(&f.telemetry, correlation("GET", Some("3")), SpanParent::Root);
        ctx.end(Outcome::Success, StatusCode::OK);

        assert_eq!(f.traces.started_count(), 1);
        assert_eq!(f.traces.finished_count(), 1);
        assert!(f.traces.open_spans().is_empty());
        assert_eq!(f.metrics.counter(&names.requests), 1);

        let latency = f.metrics.observations(&names.latency);
        assert_eq!(latency.len(), 1);
        assert_eq!(latency[0].labels, vec![(LABEL_METHOD, "GET".to_string())]);
        assert!(latency[0].value >= 0.0);

        let ids = f.metrics.observations(&names.persons_by_id);
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].value, 3.0);
        assert_eq!(ids[0].labels, vec![(LABEL_STATUS, "OK".to_string())]);
    }

    #[test]
    fn test_outcome_annotations() {
        let f = fixture();
        let mut ctx = InstrumentationContext::begin(&f.telemetry, correlation("POST", None), SpanParent::Root);
        ctx.record_error("method not allowed");
        ctx.end(Outcome::ClientError, StatusCode::METHOD_NOT_ALLOWED);

        let root = f.traces.started(HANDLER_SPAN)[0];
        let annotations = f.traces.annotations(root);
        assert!(annotations.contains(&("method", "POST".to_string())));
        assert!(annotations.contains(&("outcome", "client_error".to_string())));
        assert!(annotations.contains(&(STATUS_CODE_FIELD, "405".to_string())));
        assert!(annotations.contains(&(ERROR_FIELD, "method not allowed".to_string())));
    }

    #[test]
    fn test_id_histogram_only_on_numeric_success() {
        let f = fixture();
        let names = f.telemetry.names.clone();

        InstrumentationContext::begin(&f.telemetry, correlation("GET", Some("abc")), SpanParent::Root)
            .end(Outcome::Success, StatusCode::OK);
        InstrumentationContext::begin(&f.telemetry, correlation("GET", Some("4")), SpanParent::Root)
            .end(Outcome::ServerError, StatusCode::INTERNAL_SERVER_ERROR);
        InstrumentationContext::begin(&f.telemetry, correlation("GET", None), SpanParent::Root)
            .end(Outcome::Success, StatusCode::OK);

        assert!(f.metrics.observations(&names.persons_by_id).is_empty());
        assert_eq!(f.metrics.counter(&names.requests), 3);
        assert_eq!(f.metrics.observations(&names.latency).len(), 3);
    }

    #[test]
    fn test_drop_without_end_closes_span() {
        let f = fixture();
        let names = f.telemetry.names.clone();
        {
            let ctx = InstrumentationContext::begin(&f.telemetry, correlation("GET", None), SpanParent::Root);
            let _child = ctx.child("write_response_persons");
        }

        assert!(f.traces.open_spans().is_empty());
        assert_eq!(f.traces.started_count(), 2);
        assert_eq!(f.traces.finished_count(), 2);
        assert_eq!(f.metrics.counter(&names.requests), 1);

        let root = f.traces.started(HANDLER_SPAN)[0];
        let annotations = f.traces.annotations(root);
        assert!(annotations.contains(&("outcome", "cancelled".to_string())));
        assert!(annotations.iter().all(|(field, _)| *field != STATUS_CODE_FIELD));
        assert_eq!(f.logs.at_level(Level::WARN).len(), 1);

        let completed = f.logs.with_message("request completed");
        assert_eq!(completed[0].field("outcome"), Some("cancelled"));
        assert_eq!(completed[0].field("status"), None);
    }

    #[test]
    fn test_drop_on_panic_closes_span() {
        let f = fixture();
        let telemetry = f.telemetry.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _ctx = InstrumentationContext::begin(&telemetry, correlation("GET", None), SpanParent::Root);
            panic!("handler blew up");
        }));
        assert!(result.is_err());
        assert!(f.traces.open_spans().is_empty());
        assert_eq!(f.traces.finished_count(), 1);
    }

    #[test]
    fn test_child_span_parent() {
        let f = fixture();
        let ctx = InstrumentationContext::begin(&f.telemetry, correlation("GET", Some("1")), SpanParent::Root);
        let child = ctx.child("write_response_by_person_id").unwrap();
        let child_id = child.handle().unwrap().id();
        drop(child);
        ctx.end(Outcome::Success, StatusCode::OK);

        let root = f.traces.started(HANDLER_SPAN)[0];
        assert_eq!(f.traces.parent_of(child_id), Some(root));
        assert_eq!(f.traces.finish_count(child_id), 1);
        assert_eq!(f.traces.finish_count(root), 1);
    }

    #[test]
    fn test_logs_are_parented_on_root_span() {
        let f = fixture();
        let ctx = InstrumentationContext::begin(&f.telemetry, correlation("GET", Some("5")), SpanParent::Root);
        ctx.log(Level::INFO, "inside handler", &[]);
        ctx.end(Outcome::Success, StatusCode::OK);

        let root = f.traces.started(HANDLER_SPAN)[0];
        let entries = f.logs.entries();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.span == Some(root)));
    }

    #[test]
    fn test_numeric_id() {
        assert_eq!(numeric_id("5"), Some(5.0));
        assert_eq!(numeric_id("2.5"), Some(2.5));
        assert_eq!(numeric_id("x1"), None);
        assert_eq!(numeric_id("inf"), None);
        assert_eq!(numeric_id("NaN"), None);
    }
}
