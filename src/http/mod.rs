//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, graceful shutdown)
//!     → request.rs (request ID, `ID` query parameter)
//!     → handler.rs (instrumented persons lookup)
//!     → response.rs (JSON bodies, error mapping)
//!     → Send to client
//! ```

pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use request::{person_id_param, RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use response::{ServiceError, PROCESSING_ERROR};
pub use server::{AppState, HttpServer, PERSONS_PATH};
