//! Significant persons lookup service with a layered instrumentation pipeline.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod simulation;
pub mod store;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use observability::Telemetry;
