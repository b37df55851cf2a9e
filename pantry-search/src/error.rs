//! Error types for the pantry-search crate.
//!
//! Two layers of failure exist. A [`SourceError`] belongs to exactly one
//! backend and is recovered by the aggregator: the source contributes an
//! empty list and an entry in the failure report. An [`AggregationFault`]
//! is structural (misuse, bad configuration, cancellation) and is surfaced
//! to the caller instead of a page.

use serde::Serialize;

/// A single source adapter failed to produce candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum SourceError {
    /// The backend could not be reached or answered with an error status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The backend response could not be interpreted as a record list.
    #[error("parse error: {0}")]
    Parse(String),

    /// The backend reported a failure of its own.
    #[error("backend error: {0}")]
    Backend(String),

    /// The adapter did not settle within the per-source timeout.
    #[error("source timed out after {0} ms")]
    Timeout(u64),

    /// The source is temporarily disabled after repeated failures.
    #[error("circuit open: {0}")]
    CircuitOpen(String),
}

/// Aggregation could not run at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregationFault {
    /// None of the requested sources has a registered adapter.
    #[error("no adapters registered for requested sources: {0}")]
    NoAdapters(String),

    /// Invalid aggregator configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The caller cancelled the aggregation before it settled.
    #[error("aggregation cancelled")]
    Cancelled,
}

/// Convenience type alias for aggregation results.
pub type Result<T> = std::result::Result<T, AggregationFault>;
