//! Aggregator configuration with sensible defaults.
//!
//! [`AggregatorConfig`] controls the per-source result cap, the per-source
//! timeout, result caching and the circuit breaker. The defaults are tuned
//! for an interactive search box.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::error::AggregationFault;

/// Configuration for an [`crate::Aggregator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Maximum results per source, enforced by adapters and again after ranking.
    pub per_source_limit: usize,
    /// Per-source timeout in milliseconds. A timeout counts as a source failure.
    pub per_source_timeout_ms: u64,
    /// How long successful per-source results are cached. 0 disables caching.
    pub cache_ttl_seconds: u64,
    /// Skipping of repeatedly failing sources.
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            per_source_limit: 10,
            per_source_timeout_ms: 2000,
            cache_ttl_seconds: 0,
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl AggregatorConfig {
    /// The per-source timeout as a [`Duration`].
    pub fn per_source_timeout(&self) -> Duration {
        Duration::from_millis(self.per_source_timeout_ms)
    }

    /// Validates this configuration.
    ///
    /// Checks:
    /// - `per_source_limit` must be greater than 0
    /// - `per_source_timeout_ms` must be greater than 0
    pub fn validate(&self) -> Result<(), AggregationFault> {
        if self.per_source_limit == 0 {
            return Err(AggregationFault::Config(
                "per_source_limit must be greater than 0".into(),
            ));
        }
        if self.per_source_timeout_ms == 0 {
            return Err(AggregationFault::Config(
                "per_source_timeout_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
