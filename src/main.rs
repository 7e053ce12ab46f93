//! Significant persons service.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────────┐
//!                       │                 SIGNIFICANT PERSONS                  │
//!                       │                                                      │
//!   Client Request      │  ┌──────────┐   ┌────────────┐   ┌───────────────┐  │
//!   ────────────────────┼─▶│  axum +  │──▶│  persons   │──▶│    record     │  │
//!                       │  │middleware│   │  handler   │   │     store     │  │
//!                       │  └──────────┘   └─────┬──────┘   └───────────────┘  │
//!                       │                       │                              │
//!                       │                       ▼                              │
//!                       │          ┌─────────────────────────┐                 │
//!                       │          │ InstrumentationContext  │                 │
//!                       │          │  begin ─────────── end  │                 │
//!                       │          └──┬─────────┬─────────┬──┘                 │
//!                       │             ▼         ▼         ▼                    │
//!                       │         ┌───────┐ ┌───────┐ ┌───────┐                │
//!                       │         │metrics│ │ logs  │ │ spans │                │
//!                       │         └───┬───┘ └───────┘ └───┬───┘                │
//!                       │             ▼                   ▼                    │
//!                       │        GET /metrics        OTLP exporter             │
//!                       └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use significant_persons::config::{load_config, validate_config, ConfigError, ServiceConfig};
use significant_persons::lifecycle::startup;

#[derive(Parser)]
#[command(name = "significant-persons", version)]
#[command(about = "Significant persons lookup service", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    startup::run(config).await
}
