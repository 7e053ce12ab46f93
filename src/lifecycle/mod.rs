//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Logging/tracing → Sinks → Server → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Broadcast → Stop accepting → Drain → Flush exporters
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then telemetry, then listeners
//! - Any startup error is fatal
//! - Trace exporters are flushed after the server stops

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
