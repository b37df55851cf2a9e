//! Trait definition for pluggable source adapters.
//!
//! Each backend (recipes, foods, news, users) implements [`SourceAdapter`]
//! to provide a uniform interface for querying and normalizing results.
//! The aggregator only ever sees this trait and never special-cases a
//! source kind.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::types::{SearchResult, SourceKind};

/// A pluggable search backend.
///
/// Implementors own their matching policy (prefix, substring, external
/// index) and hand back already-filtered, already-normalized candidates.
/// Contract:
///
/// - at most `limit` results are returned
/// - "no matches" is `Ok(vec![])`, never an error
/// - only connectivity or backend failures are [`SourceError`]
/// - no side effects on the backend
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Which source this adapter serves.
    fn kind(&self) -> SourceKind;

    /// Return up to `limit` candidates for the normalized `text`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the backend cannot be queried.
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<SearchResult>, SourceError>;
}

/// Adapters keyed by the source they serve. At most one per kind.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<SourceKind, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own kind, returning any adapter it replaced.
    pub fn register<A: SourceAdapter + 'static>(
        &mut self,
        adapter: A,
    ) -> Option<Arc<dyn SourceAdapter>> {
        self.register_arc(Arc::new(adapter))
    }

    pub fn register_arc(
        &mut self,
        adapter: Arc<dyn SourceAdapter>,
    ) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.insert(adapter.kind(), adapter)
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with<A: SourceAdapter + 'static>(mut self, adapter: A) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, kind: SourceKind) -> Option<&Arc<dyn SourceAdapter>> {
        self.adapters.get(&kind)
    }

    /// Registered kinds, in [`SourceKind`] order.
    pub fn kinds(&self) -> Vec<SourceKind> {
        self.adapters.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResultPayload;

    /// A mock adapter for testing trait bounds and async execution.
    struct MockAdapter {
        kind: SourceKind,
        titles: Vec<&'static str>,
        fail: bool,
    }

    #[async_trait]
    impl SourceAdapter for MockAdapter {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn search(&self, _text: &str, limit: usize) -> Result<Vec<SearchResult>, SourceError> {
            if self.fail {
                return Err(SourceError::Backend("mock adapter failure".into()));
            }
            Ok(self
                .titles
                .iter()
                .take(limit)
                .enumerate()
                .map(|(i, title)| SearchResult {
                    id: i.to_string(),
                    title: (*title).to_owned(),
                    image_url: None,
                    payload: ResultPayload::User {
                        handle: title.to_lowercase(),
                        email: None,
                    },
                })
                .collect())
        }
    }

    #[test]
    fn adapter_trait_object_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn SourceAdapter>();
        assert_send_sync::<AdapterRegistry>();
    }

    #[tokio::test]
    async fn mock_adapter_respects_limit() {
        let adapter = MockAdapter {
            kind: SourceKind::User,
            titles: vec!["An", "Bình", "Chi"],
            fail: false,
        };
        let results = adapter.search("a", 2).await.expect("should succeed");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "An");
    }

    #[tokio::test]
    async fn mock_adapter_propagates_errors() {
        let adapter = MockAdapter {
            kind: SourceKind::User,
            titles: vec![],
            fail: true,
        };
        let err = adapter.search("a", 10).await.unwrap_err();
        assert!(err.to_string().contains("mock adapter failure"));
    }

    #[test]
    fn registry_keys_by_adapter_kind() {
        let registry = AdapterRegistry::new()
            .with(MockAdapter {
                kind: SourceKind::User,
                titles: vec![],
                fail: false,
            })
            .with(MockAdapter {
                kind: SourceKind::Recipe,
                titles: vec![],
                fail: false,
            });
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.kinds(), vec![SourceKind::Recipe, SourceKind::User]);
        assert!(registry.get(SourceKind::News).is_none());
    }

    #[test]
    fn registering_same_kind_replaces() {
        let mut registry = AdapterRegistry::new();
        let first = registry.register(MockAdapter {
            kind: SourceKind::Food,
            titles: vec![],
            fail: false,
        });
        assert!(first.is_none());
        let replaced = registry.register(MockAdapter {
            kind: SourceKind::Food,
            titles: vec![],
            fail: true,
        });
        assert!(replaced.is_some());
        assert_eq!(registry.len(), 1);
    }
}
