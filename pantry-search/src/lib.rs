//! # pantry-search
//!
//! Multi-source search aggregation for the Pantry cooking app.
//!
//! A free-text query fans out to several independent backends (recipes,
//! foods, news articles, users), each with its own record schema and
//! matching capabilities, and comes back as one typed page of ranked
//! results per source.
//!
//! ## Design
//!
//! - Every backend sits behind the [`SourceAdapter`] trait; the aggregator
//!   never special-cases a source kind
//! - Sources are queried concurrently, each bounded by its own timeout
//! - Per-source candidates are ranked exact > prefix > contains > all-tokens,
//!   keeping backend order within a tier, and capped per source
//! - Partial failure is a normal outcome: a failing source contributes an
//!   empty list plus an entry in the [`FailureReport`]
//! - Optional per-source circuit breaker and TTL result cache
//!
//! ## Privacy
//!
//! Query text is only ever logged at trace level.

pub mod adapter;
pub mod adapters;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod query;
pub mod store;
pub mod types;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

pub use adapter::{AdapterRegistry, SourceAdapter};
pub use adapters::{FoodAdapter, NewsAdapter, RecipeAdapter, UserAdapter};
pub use circuit_breaker::{CircuitBreakerConfig, CircuitState};
pub use config::AggregatorConfig;
pub use error::{AggregationFault, Result, SourceError};
pub use orchestrator::aggregate::Aggregator;
pub use query::Query;
pub use store::{HttpStore, MatchPolicy, MemoryStore, RecordStore};
pub use types::{Aggregation, FailureReport, Macros, ResultPage, ResultPayload, SearchResult, SourceKind};

/// One-shot aggregation over `adapters` with the given per-source timeout.
///
/// Uses the default per-source limit, no cache and no circuit breaker. For
/// repeated queries build an [`Aggregator`] once and reuse it.
///
/// # Errors
///
/// Returns [`AggregationFault::NoAdapters`] if none of the requested
/// sources has an adapter, or [`AggregationFault::Config`] for a zero
/// timeout. Individual source failures are reported in
/// [`Aggregation::failures`], not as errors.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> pantry_search::Result<()> {
/// use std::time::Duration;
/// use pantry_search::{AdapterRegistry, FoodAdapter, Query};
///
/// let registry = AdapterRegistry::new().with(FoodAdapter::in_memory(vec![
///     serde_json::json!({"id": 1, "name": "Ức gà", "calories": 165}),
/// ]));
/// let out = pantry_search::aggregate(&Query::all_sources("ức"), &registry, Duration::from_secs(2)).await?;
/// for (kind, results) in out.page.iter() {
///     println!("{kind}: {} results", results.len());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn aggregate(
    query: &Query,
    adapters: &AdapterRegistry,
    per_source_timeout: Duration,
) -> Result<Aggregation> {
    let timeout_ms = u64::try_from(per_source_timeout.as_millis()).unwrap_or(u64::MAX);
    let config = AggregatorConfig {
        per_source_timeout_ms: timeout_ms,
        circuit_breaker: CircuitBreakerConfig {
            failure_threshold: 0,
            ..CircuitBreakerConfig::default()
        },
        ..AggregatorConfig::default()
    };
    Aggregator::new(adapters.clone(), config)?
        .aggregate(query, &CancellationToken::new())
        .await
}
