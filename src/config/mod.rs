//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, defaults for missing fields)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → handed to the server and telemetry at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; sinks are never reconfigured
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ListenerConfig, LogFormat, ObservabilityConfig, ServiceConfig, SimulationConfig,
    TimeoutConfig, TracingConfig,
};
pub use validation::{validate_config, ValidationError};
