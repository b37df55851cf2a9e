//! Record stores: the read-only backend handle behind each adapter.
//!
//! A store answers "records whose title matches `text`, at most `limit`"
//! with raw JSON records. Adapters decode and normalize them.

pub mod memory;
pub mod remote;

use async_trait::async_trait;

use crate::error::SourceError;

pub use memory::{MatchPolicy, MemoryStore};
pub use remote::HttpStore;

/// A read-only backend query call.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch up to `limit` raw records matching the normalized `text`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the backend cannot be reached or
    /// answers with something that is not a record list.
    async fn fetch(&self, text: &str, limit: usize) -> Result<Vec<serde_json::Value>, SourceError>;
}
