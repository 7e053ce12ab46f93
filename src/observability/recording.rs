//! In-memory sinks that record every call.
//!
//! Used by tests to check span lifecycles, emitted metrics and log
//! correlation without installing a subscriber or exporter.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use axum::http::HeaderMap;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tracing::Level;

use crate::observability::logging::{Fields, LogEntry, LogSink};
use crate::observability::metrics::{Labels, MetricsSink};
use crate::observability::tracing::{extract_remote_parent, SpanHandle, SpanParent, TraceSink};

/// One histogram observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub name: String,
    pub labels: Vec<(&'static str, String)>,
    pub value: f64,
}

/// Metrics sink that keeps counters and observations in memory.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    counters: Mutex<BTreeMap<String, u64>>,
    observations: Mutex<Vec<Observation>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> u64 {
        let counters = self.counters.lock().expect("metrics mutex poisoned");
        counters.get(name).copied().unwrap_or(0)
    }

    pub fn observations(&self, name: &str) -> Vec<Observation> {
        let observations = self.observations.lock().expect("metrics mutex poisoned");
        observations
            .iter()
            .filter(|o| o.name == name)
            .cloned()
            .collect()
    }
}

impl MetricsSink for RecordingMetrics {
    fn increment_counter(&self, name: &str) {
        let mut counters = self.counters.lock().expect("metrics mutex poisoned");
        *counters.entry(name.to_string()).or_insert(0) += 1;
    }

    fn observe_histogram(&self, name: &str, labels: Labels<'_>, value: f64) {
        let mut observations = self.observations.lock().expect("metrics mutex poisoned");
        observations.push(Observation {
            name: name.to_string(),
            labels: labels.to_vec(),
            value,
        });
    }

    fn render(&self) -> String {
        let counters = self.counters.lock().expect("metrics mutex poisoned");
        let mut body = String::new();
        for (name, value) in counters.iter() {
            body.push_str(&format!("{} {}\n", name, value));
        }
        let observations = self.observations.lock().expect("metrics mutex poisoned");
        let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
        for observation in observations.iter() {
            *counts.entry(observation.name.as_str()).or_insert(0) += 1;
        }
        for (name, count) in counts {
            body.push_str(&format!("{}_count {}\n", name, count));
        }
        body
    }
}

/// A recorded span lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanEvent {
    Started {
        id: u64,
        name: &'static str,
        parent: Option<u64>,
        remote_parent: bool,
    },
    Annotated {
        id: u64,
        field: &'static str,
        value: String,
    },
    Finished {
        id: u64,
    },
}

/// Trace sink that records span starts, annotations and finishes.
pub struct RecordingTraces {
    propagator: TraceContextPropagator,
    next_id: AtomicU64,
    events: Mutex<Vec<SpanEvent>>,
}

impl Default for RecordingTraces {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingTraces {
    pub fn new() -> Self {
        Self {
            propagator: TraceContextPropagator::new(),
            next_id: AtomicU64::new(0),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<SpanEvent> {
        self.events.lock().expect("trace mutex poisoned").clone()
    }

    /// Ids of started spans with the given name, in start order.
    pub fn started(&self, name: &str) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SpanEvent::Started { id, name: n, .. } if n == name => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn started_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SpanEvent::Started { .. }))
            .count()
    }

    pub fn finished_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SpanEvent::Finished { .. }))
            .count()
    }

    /// How many times the span was finished.
    pub fn finish_count(&self, id: u64) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SpanEvent::Finished { id: i } if *i == id))
            .count()
    }

    /// Spans started but not finished.
    pub fn open_spans(&self) -> Vec<u64> {
        let events = self.events();
        events
            .iter()
            .filter_map(|e| match e {
                SpanEvent::Started { id, .. } => Some(*id),
                _ => None,
            })
            .filter(|id| !events.contains(&SpanEvent::Finished { id: *id }))
            .collect()
    }

    /// Annotations recorded on one span, in order.
    pub fn annotations(&self, id: u64) -> Vec<(&'static str, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SpanEvent::Annotated { id: i, field, value } if i == id => Some((field, value)),
                _ => None,
            })
            .collect()
    }

    pub fn parent_of(&self, id: u64) -> Option<u64> {
        self.events().into_iter().find_map(|e| match e {
            SpanEvent::Started { id: i, parent, .. } if i == id => parent,
            _ => None,
        })
    }

    pub fn has_remote_parent(&self, id: u64) -> bool {
        self.events().into_iter().any(|e| {
            matches!(e, SpanEvent::Started { id: i, remote_parent: true, .. } if i == id)
        })
    }

    fn push(&self, event: SpanEvent) {
        self.events.lock().expect("trace mutex poisoned").push(event);
    }
}

impl TraceSink for RecordingTraces {
    fn extract_parent(&self, headers: &HeaderMap) -> SpanParent<'static> {
        extract_remote_parent(&self.propagator, headers)
    }

    fn start_span(&self, name: &'static str, parent: SpanParent<'_>) -> SpanHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (parent, remote_parent) = match parent {
            SpanParent::Root => (None, false),
            SpanParent::Remote(_) => (None, true),
            SpanParent::Local(handle) => (Some(handle.id()), false),
        };
        self.push(SpanEvent::Started {
            id,
            name,
            parent,
            remote_parent,
        });
        SpanHandle::new(id, name, tracing::Span::none())
    }

    fn annotate(&self, span: &SpanHandle, field: &'static str, value: &str) {
        self.push(SpanEvent::Annotated {
            id: span.id(),
            field,
            value: value.to_string(),
        });
    }

    fn finish(&self, span: SpanHandle) {
        self.push(SpanEvent::Finished { id: span.id() });
    }
}

/// Log sink that keeps every entry.
#[derive(Debug, Default)]
pub struct RecordingLogs {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingLogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().expect("log mutex poisoned").clone()
    }

    pub fn with_message(&self, message: &str) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.message == message)
            .collect()
    }

    pub fn at_level(&self, level: Level) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .collect()
    }
}

impl LogSink for RecordingLogs {
    fn log(&self, span: Option<&SpanHandle>, level: Level, message: &str, fields: Fields<'_>) {
        self.entries
            .lock()
            .expect("log mutex poisoned")
            .push(LogEntry {
                level,
                message: message.to_string(),
                fields: fields.to_vec(),
                span: span.map(SpanHandle::id),
            });
    }
}
