//! Error types for the pantry service.

use pantry_search::AggregationFault;

/// Top-level error type for the pantry service.
#[derive(Debug, thiserror::Error)]
pub enum PantryError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// Query session error (disposed session, actor gone).
    #[error("session error: {0}")]
    Session(String),

    /// Catalog seed file could not be loaded.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Host command rejected (missing or invalid payload).
    #[error("command error: {0}")]
    Command(String),

    /// Aggregation could not run.
    #[error("aggregation error: {0}")]
    Aggregation(#[from] AggregationFault),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, PantryError>;
