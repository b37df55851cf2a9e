//! Interactive query sessions.
//!
//! A [`QuerySession`] sits between a search box and the
//! [`pantry_search::Aggregator`]: it debounces keystrokes, tags each
//! aggregation with a generation number, cancels and discards superseded
//! work, and publishes the latest [`Snapshot`].

mod controller;

pub use controller::QuerySession;

use pantry_search::{FailureReport, ResultPage};
use serde::Serialize;

/// The latest published search state of a session.
///
/// `generation` 0 is the initial empty snapshot; every published snapshot
/// after that carries the generation that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub generation: u64,
    /// Normalized query text that produced this page (empty for a blank query).
    pub query: String,
    pub page: ResultPage,
    pub failures: FailureReport,
}

/// Something a session subscriber should hear about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A new snapshot was published.
    Published(Snapshot),
    /// The latest generation could not be aggregated at all.
    Failed {
        generation: u64,
        query: String,
        message: String,
    },
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    /// Waiting for input to go quiet.
    Debouncing,
    /// An aggregation for the latest generation is in flight.
    Aggregating,
    /// Terminal.
    Disposed,
}
