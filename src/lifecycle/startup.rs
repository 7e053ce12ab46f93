//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize logging and tracing from configuration
//! - Construct the sinks and the record store
//! - Bind the listener and serve until a termination signal
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The listener binds last (traffic only when ready)

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::ServiceConfig;
use crate::http::HttpServer;
use crate::lifecycle::signals::spawn_signal_listener;
use crate::lifecycle::Shutdown;
use crate::observability::{init_logging, Telemetry};
use crate::store::StaticStore;

/// Run the service with `config` until SIGINT/SIGTERM.
pub async fn run(config: ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let guard = init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        metrics_enabled = config.observability.metrics_enabled,
        tracing_enabled = config.observability.tracing.enabled,
        otlp_endpoint = ?config.observability.tracing.otlp_endpoint,
        fault_injection = config.simulation.fault_injection_enabled,
        response_delay = config.simulation.response_delay_enabled,
        "Configuration loaded"
    );

    let telemetry = Telemetry::from_config(&config.observability)?;
    let store = Arc::new(StaticStore::default());
    tracing::debug!(records = store.len(), "Record store ready");

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config, store, telemetry);

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    let signals = spawn_signal_listener(shutdown.clone());

    let result = server.run(listener, server_shutdown).await;
    signals.abort();

    tracing::info!("Shutdown complete");
    guard.shutdown();
    result.map_err(Into::into)
}
