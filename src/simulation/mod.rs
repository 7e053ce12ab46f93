//! Fault injection and artificial latency.
//!
//! # Responsibilities
//! - Decide whether a list-all request should fail on purpose
//! - Draw the artificial backend latency for a completed response
//!
//! # Design Decisions
//! - Both aids are off unless enabled in config, so tests stay deterministic
//! - Draws are uniform and independent per request
//! - The delay is awaited, so it suspends only the current request

use std::time::Duration;

use rand::Rng;

use crate::config::SimulationConfig;

/// Demo aids injected into the request handler.
#[derive(Debug, Clone)]
pub struct Simulation {
    fault_probability: Option<f64>,
    max_delay_ms: Option<u64>,
}

impl Simulation {
    pub fn from_config(config: &SimulationConfig) -> Self {
        let fault_probability = config
            .fault_injection_enabled
            .then(|| config.fault_probability.clamp(0.0, 1.0));
        let max_delay_ms = (config.response_delay_enabled && config.max_delay_ms > 0)
            .then_some(config.max_delay_ms);

        Self {
            fault_probability,
            max_delay_ms,
        }
    }

    /// Neither faults nor delays.
    pub fn disabled() -> Self {
        Self::from_config(&SimulationConfig::disabled())
    }

    /// Whether this request should short-circuit with an injected fault.
    pub fn should_fail(&self) -> bool {
        match self.fault_probability {
            Some(p) => rand::thread_rng().gen_bool(p),
            None => false,
        }
    }

    /// Artificial latency for this request, uniform in `[0, max_delay_ms)`.
    pub fn delay(&self) -> Duration {
        match self.max_delay_ms {
            Some(max) => Duration::from_millis(rand::thread_rng().gen_range(0..max)),
            None => Duration::ZERO,
        }
    }

    /// Sleep for a freshly drawn delay.
    pub async fn pause(&self) {
        let delay = self.delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
