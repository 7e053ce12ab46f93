//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use significant_persons::config::{ServiceConfig, SimulationConfig};
use significant_persons::http::HttpServer;
use significant_persons::lifecycle::Shutdown;
use significant_persons::observability::metrics::MetricNames;
use significant_persons::observability::recording::{RecordingLogs, RecordingTraces};
use significant_persons::observability::{PrometheusSink, Telemetry};
use significant_persons::store::StaticStore;
use tokio::net::TcpListener;

/// A service running on an ephemeral local port.
#[allow(dead_code)]
pub struct TestService {
    pub addr: SocketAddr,
    pub metrics: Arc<PrometheusSink>,
    pub traces: Arc<RecordingTraces>,
    pub logs: Arc<RecordingLogs>,
    pub names: MetricNames,
    shutdown: Shutdown,
}

#[allow(dead_code)]
impl TestService {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn stop(&self) {
        self.shutdown.trigger();
    }
}

/// Start the service with Prometheus metrics and recording trace/log sinks.
pub async fn start_service(simulation: SimulationConfig) -> TestService {
    let names = MetricNames::default();
    let metrics = Arc::new(PrometheusSink::new(&names).unwrap());
    let traces = Arc::new(RecordingTraces::new());
    let logs = Arc::new(RecordingLogs::new());
    let telemetry = Telemetry::new(metrics.clone(), traces.clone(), logs.clone(), names.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = ServiceConfig::default();
    config.listener.bind_address = addr.to_string();
    config.simulation = simulation;

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, Arc::new(StaticStore::default()), telemetry);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    TestService {
        addr,
        metrics,
        traces,
        logs,
        names,
        shutdown,
    }
}

/// HTTP client that never goes through a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
