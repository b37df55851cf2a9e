//! Source adapter implementations.
//!
//! Each module provides a struct implementing [`crate::adapter::SourceAdapter`]
//! for one backend: its native record shape, its normalization into
//! [`crate::types::SearchResult`], and the matching policy it asks of an
//! in-memory store.

pub mod food;
pub mod news;
pub mod recipe;
pub mod user;

use crate::error::SourceError;
use serde_json::Value;

use crate::orchestrator::normalize::{is_usable, normalize_records, NativeRecord};
use crate::store::RecordStore;
use crate::types::{SearchResult, SourceKind};

pub use food::FoodAdapter;
pub use news::NewsAdapter;
pub use recipe::RecipeAdapter;
pub use user::UserAdapter;

/// Raw records requested from a store for a cap of `limit`. The extra half
/// batch absorbs records dropped during normalization.
fn fetch_batch(limit: usize) -> usize {
    limit.saturating_add(limit.div_ceil(2))
}

/// Fetch raw records for `text` and normalize them as `R`, capped at `limit`.
pub(crate) async fn fetch_normalized<R: NativeRecord>(
    store: &dyn RecordStore,
    kind: SourceKind,
    text: &str,
    limit: usize,
) -> Result<Vec<SearchResult>, SourceError> {
    tracing::trace!(source = %kind, text, limit, "source search");
    let raw = store.fetch(text, fetch_batch(limit)).await?;
    let mut results = normalize_records::<R>(kind, raw);
    results.truncate(limit);
    tracing::debug!(source = %kind, count = results.len(), "source returned results");
    Ok(results)
}

/// Keep only records that normalize as `R`, so an in-memory store never
/// spends a slot under the cap on a record that would be dropped.
fn usable_records<R: NativeRecord>(kind: SourceKind, records: Vec<Value>) -> Vec<Value> {
    let total = records.len();
    let kept: Vec<Value> = records.into_iter().filter(|r| is_usable::<R>(r)).collect();
    if kept.len() < total {
        tracing::debug!(
            source = %kind,
            kept = kept.len(),
            dropped = total - kept.len(),
            "dropped malformed catalog records"
        );
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_batch_leaves_headroom() {
        assert_eq!(fetch_batch(0), 0);
        assert_eq!(fetch_batch(1), 2);
        assert_eq!(fetch_batch(10), 15);
        assert_eq!(fetch_batch(usize::MAX), usize::MAX);
    }
}
