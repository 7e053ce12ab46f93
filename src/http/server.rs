//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (timeout, request ID, HTTP trace layer)
//! - Serve the Prometheus scrape endpoint
//! - Bind server to listener and shut down gracefully

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::IntoResponse,
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::http::handler::persons_handler;
use crate::http::request::UuidRequestId;
use crate::observability::Telemetry;
use crate::simulation::Simulation;
use crate::store::PersonStore;

/// Path of the persons endpoint.
pub const PERSONS_PATH: &str = "/significant_persons";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PersonStore>,
    pub telemetry: Telemetry,
    pub simulation: Simulation,
}

/// HTTP server for the persons service.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and sinks.
    pub fn new(config: ServiceConfig, store: Arc<dyn PersonStore>, telemetry: Telemetry) -> Self {
        let state = AppState {
            store,
            telemetry,
            simulation: Simulation::from_config(&config.simulation),
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let mut router = Router::new().route(PERSONS_PATH, any(persons_handler));
        if config.observability.metrics_enabled {
            router = router.route(&config.observability.metrics_path, get(metrics_handler));
        }

        router
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(TraceLayer::new_for_http())
    }

    /// A clone of the fully layered router, for in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            metrics_enabled = self.config.observability.metrics_enabled,
            "HTTP server starting"
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Prometheus scrape endpoint.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        )],
        state.telemetry.metrics.render(),
    )
}
