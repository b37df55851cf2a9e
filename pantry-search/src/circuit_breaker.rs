//! Per-source circuit breaker.
//!
//! Tracks consecutive failures per [`SourceKind`] and temporarily skips a
//! source that keeps failing, so a dead backend does not cost a full
//! timeout on every keystroke. After a cooldown a single probe request is
//! let through.
//!
//! # State Machine
//!
//! ```text
//! ┌────────┐  N failures   ┌────────┐  cooldown   ┌──────────┐
//! │ Closed ├──────────────►│  Open  ├────────────►│ HalfOpen │
//! └───▲────┘               └────────┘             └────┬─────┘
//!     │                         ▲                      │
//!     │  success                │  failure              │
//!     └─────────────────────────┴──────────────────────┘
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::types::SourceKind;

/// Circuit state for a single source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Healthy; every request goes through.
    Closed,
    /// Failing; requests are skipped until the cooldown expires.
    Open,
    /// Cooldown elapsed; one probe request at a time is let through.
    HalfOpen,
}

#[derive(Debug, Clone)]
struct SourceHealth {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
    /// A half-open probe has been admitted and not yet settled.
    probe_in_flight: bool,
}

impl Default for SourceHealth {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
            probe_in_flight: false,
        }
    }
}

/// Circuit breaker tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before a source is skipped. `0` disables the breaker.
    pub failure_threshold: u32,
    /// Seconds a tripped source stays skipped before a probe is allowed.
    pub cooldown_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_secs: 30,
        }
    }
}

/// Per-source circuit breaker owned by one aggregator.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    sources: HashMap<SourceKind, SourceHealth>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            sources: HashMap::new(),
        }
    }

    fn enabled(&self) -> bool {
        self.config.failure_threshold > 0
    }

    /// Record a successful call; closes the circuit.
    pub fn record_success(&mut self, kind: SourceKind) {
        let health = self.sources.entry(kind).or_default();
        health.state = CircuitState::Closed;
        health.consecutive_failures = 0;
        health.probe_in_flight = false;
    }

    /// Record a failed call; trips the circuit at the threshold.
    pub fn record_failure(&mut self, kind: SourceKind) {
        if !self.enabled() {
            return;
        }
        let threshold = self.config.failure_threshold;
        let health = self.sources.entry(kind).or_default();
        health.consecutive_failures += 1;
        health.last_failure_at = Some(Instant::now());
        health.probe_in_flight = false;

        // A failed probe re-trips immediately.
        if health.state == CircuitState::HalfOpen || health.consecutive_failures >= threshold {
            if health.state != CircuitState::Open {
                tracing::warn!(source = %kind, failures = health.consecutive_failures, "circuit opened");
            }
            health.state = CircuitState::Open;
        }
    }

    /// Whether a call to `kind` should be attempted now.
    ///
    /// An open circuit whose cooldown has elapsed moves to half-open and
    /// admits exactly one probe; further calls are skipped until that probe
    /// is recorded or released.
    pub fn should_attempt(&mut self, kind: SourceKind) -> bool {
        if !self.enabled() {
            return true;
        }
        let cooldown = Duration::from_secs(self.config.cooldown_secs);
        let health = self.sources.entry(kind).or_default();

        match health.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => !std::mem::replace(&mut health.probe_in_flight, true),
            CircuitState::Open => {
                let cooldown_elapsed = health
                    .last_failure_at
                    .is_none_or(|t| t.elapsed() >= cooldown);
                if cooldown_elapsed {
                    health.state = CircuitState::HalfOpen;
                    health.probe_in_flight = true;
                }
                cooldown_elapsed
            }
        }
    }

    /// Give back an admitted probe whose outcome will never be recorded
    /// (the aggregation was cancelled). The next call probes again.
    pub fn release_probe(&mut self, kind: SourceKind) {
        if let Some(health) = self.sources.get_mut(&kind) {
            health.probe_in_flight = false;
        }
    }

    /// Current state for `kind`; untracked sources are closed.
    pub fn state(&self, kind: SourceKind) -> CircuitState {
        self.sources
            .get(&kind)
            .map_or(CircuitState::Closed, |h| h.state)
    }

    /// `(source, state, consecutive failures)` for every tracked source.
    pub fn health_report(&self) -> Vec<(SourceKind, CircuitState, u32)> {
        let mut report: Vec<_> = self
            .sources
            .iter()
            .map(|(kind, health)| (*kind, health.state, health.consecutive_failures))
            .collect();
        report.sort_by_key(|(kind, _, _)| *kind);
        report
    }
}
