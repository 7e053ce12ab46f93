//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define the request metrics (count, latency, requested ids)
//! - Expose a Prometheus-compatible scrape body
//!
//! # Metrics
//! - `<ns>_persons_counter` (counter): total requests, every outcome
//! - `<ns>_persons_latency` (histogram, `method`): latency in milliseconds
//! - `<ns>_persons_by_ids` (histogram, `status`): numeric ids of successful lookups
//!
//! # Design Decisions
//! - The recorder is owned by the sink, never installed as the global recorder
//! - Low-overhead metric updates (atomic operations in the exporter)
//! - Histogram buckets mirror the latency range of the simulated backend

use metrics::{Key, KeyName, Label, Level, Metadata, Recorder, SharedString};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};

pub const LABEL_METHOD: &str = "method";
pub const LABEL_STATUS: &str = "status";

/// Latency buckets in milliseconds.
pub const LATENCY_BUCKETS_MS: &[f64] = &[
    0.0, 25.0, 50.0, 75.0, 100.0, 200.0, 400.0, 600.0, 800.0, 1000.0, 2000.0, 4000.0, 6000.0,
];

/// Buckets for the requested person ids.
pub const PERSON_ID_BUCKETS: &[f64] = &[1.0, 2.0, 3.0, 4.0, 5.0];

/// Metric labels as `(name, value)` pairs.
pub type Labels<'a> = &'a [(&'static str, String)];

/// Destination for request metrics.
pub trait MetricsSink: Send + Sync {
    fn increment_counter(&self, name: &str);

    fn observe_histogram(&self, name: &str, labels: Labels<'_>, value: f64);

    /// Current state of every registered series in text exposition format.
    fn render(&self) -> String;
}

/// Fully qualified metric names for one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricNames {
    pub requests: String,
    pub latency: String,
    pub persons_by_id: String,
}

impl MetricNames {
    pub fn new(namespace: &str) -> Self {
        Self {
            requests: format!("{}_persons_counter", namespace),
            latency: format!("{}_persons_latency", namespace),
            persons_by_id: format!("{}_persons_by_ids", namespace),
        }
    }
}

impl Default for MetricNames {
    fn default() -> Self {
        Self::new("ocmetricsexample")
    }
}

/// Prometheus-backed metrics sink.
pub struct PrometheusSink {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl PrometheusSink {
    pub fn new(names: &MetricNames) -> Result<Self, BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(names.latency.clone()), LATENCY_BUCKETS_MS)?
            .set_buckets_for_metric(
                Matcher::Full(names.persons_by_id.clone()),
                PERSON_ID_BUCKETS,
            )?
            .build_recorder();
        let handle = recorder.handle();

        recorder.describe_counter(
            KeyName::from(names.requests.clone()),
            None,
            SharedString::from("The number of times persons are requested"),
        );
        recorder.describe_histogram(
            KeyName::from(names.latency.clone()),
            None,
            SharedString::from("The distribution of the latencies"),
        );
        recorder.describe_histogram(
            KeyName::from(names.persons_by_id.clone()),
            None,
            SharedString::from("Groups persons requests by ids"),
        );

        Ok(Self { recorder, handle })
    }

    /// Value of a single rendered series line, e.g.
    /// `ocmetricsexample_persons_latency_count{method="GET"}`.
    pub fn sample(&self, series: &str) -> Option<f64> {
        find_sample(&self.render(), series)
    }
}

fn metadata() -> Metadata<'static> {
    Metadata::new(module_path!(), Level::INFO, Some(module_path!()))
}

fn key(name: &str, labels: Labels<'_>) -> Key {
    let labels: Vec<Label> = labels
        .iter()
        .map(|(k, v)| Label::new(*k, v.clone()))
        .collect();
    Key::from_parts(name.to_string(), labels)
}

impl MetricsSink for PrometheusSink {
    fn increment_counter(&self, name: &str) {
        self.recorder
            .register_counter(&key(name, &[]), &metadata())
            .increment(1);
    }

    fn observe_histogram(&self, name: &str, labels: Labels<'_>, value: f64) {
        self.recorder
            .register_histogram(&key(name, labels), &metadata())
            .record(value);
    }

    fn render(&self) -> String {
        self.handle.render()
    }
}

/// Find the value of `series` in a text exposition body.
pub fn find_sample(body: &str, series: &str) -> Option<f64> {
    body.lines()
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| {
            let rest = line.strip_prefix(series)?;
            rest.strip_prefix(' ')?.trim().parse().ok()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink() -> (PrometheusSink, MetricNames) {
        let names = MetricNames::default();
        (PrometheusSink::new(&names).unwrap(), names)
    }

    #[test]
    fn test_metric_names() {
        let names = MetricNames::new("demo");
        assert_eq!(names.requests, "demo_persons_counter");
        assert_eq!(names.latency, "demo_persons_latency");
        assert_eq!(names.persons_by_id, "demo_persons_by_ids");
    }

    #[test]
    fn test_counter_renders() {
        let (sink, names) = sink();
        sink.increment_counter(&names.requests);
        sink.increment_counter(&names.requests);
        assert_eq!(sink.sample(&names.requests), Some(2.0));

        let body = sink.render();
        assert!(body.contains("The number of times persons are requested"));
    }

    #[test]
    fn test_latency_histogram_buckets() {
        let (sink, names) = sink();
        let labels = [(LABEL_METHOD, "GET".to_string())];
        sink.observe_histogram(&names.latency, &labels, 30.0);
        sink.observe_histogram(&names.latency, &labels, 700.0);

        let count = format!("{}_count{{method=\"GET\"}}", names.latency);
        assert_eq!(sink.sample(&count), Some(2.0));

        let le_50 = format!("{}_bucket{{method=\"GET\",le=\"50\"}}", names.latency);
        assert_eq!(sink.sample(&le_50), Some(1.0));

        let le_800 = format!("{}_bucket{{method=\"GET\",le=\"800\"}}", names.latency);
        assert_eq!(sink.sample(&le_800), Some(2.0));
    }

    #[test]
    fn test_independent_sinks() {
        let (a, names) = sink();
        let (b, _) = sink();
        a.increment_counter(&names.requests);
        assert_eq!(a.sample(&names.requests), Some(1.0));
        assert_eq!(b.sample(&names.requests), None);
    }

    #[test]
    fn test_find_sample_skips_comments() {
        let body = "# HELP x_total help\n# TYPE x_total counter\nx_total 7\nx_total_extra 1\n";
        assert_eq!(find_sample(body, "x_total"), Some(7.0));
        assert_eq!(find_sample(body, "x"), None);
    }
}
