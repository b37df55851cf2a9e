//! Pantry: interactive multi-source search for the Pantry cooking app.
//!
//! This crate wires the [`pantry_search`] aggregation core into a running
//! service:
//!
//! # Architecture
//!
//! - **Config**: TOML settings for the aggregator, sessions and backends
//! - **Catalog**: builds one source adapter per backend, from HTTP
//!   endpoints or a JSON seed file
//! - **Session**: a debounced, generation-tagged query session that only
//!   ever publishes the latest result snapshot
//! - **Host bridge**: newline-delimited JSON commands in, responses and
//!   `search.results` events out

pub mod catalog;
pub mod config;
pub mod error;
pub mod host;
pub mod pantry_dirs;
pub mod session;

pub use config::{BackendConfig, PantryConfig, SessionConfig};
pub use error::{PantryError, Result};
pub use session::{QuerySession, SessionEvent, SessionState, Snapshot};
