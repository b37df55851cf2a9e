//! Fan-out/fan-in coordinator.
//!
//! Queries every requested source concurrently, bounds each call by the
//! per-source timeout, ranks and caps each source's candidates
//! independently, and folds failures into a [`crate::types::FailureReport`] instead of
//! failing the whole aggregation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::adapter::{AdapterRegistry, SourceAdapter};
use crate::cache::{CacheKey, ResultCache};
use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::config::AggregatorConfig;
use crate::error::{AggregationFault, Result, SourceError};
use crate::query::Query;
use crate::types::{Aggregation, SearchResult, SourceKind};

use super::ranking::rank_and_cap;

type Launch = (SourceKind, Arc<dyn SourceAdapter>);

/// Long-lived coordinator over a fixed set of adapters.
///
/// Cheap to share behind an [`Arc`]; all interior state (circuit breaker,
/// cache) is synchronized.
#[derive(Debug)]
pub struct Aggregator {
    registry: AdapterRegistry,
    config: AggregatorConfig,
    cache: Option<ResultCache>,
    breaker: Mutex<CircuitBreaker>,
}

impl Aggregator {
    /// # Errors
    ///
    /// Returns [`AggregationFault::Config`] if `config` is invalid.
    pub fn new(registry: AdapterRegistry, config: AggregatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            cache: ResultCache::new(config.cache_ttl_seconds),
            breaker: Mutex::new(CircuitBreaker::new(config.circuit_breaker.clone())),
            registry,
            config,
        })
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// `(source, circuit state, consecutive failures)` for every source seen so far.
    pub fn circuit_health(&self) -> Vec<(SourceKind, CircuitState, u32)> {
        self.breaker().health_report()
    }

    /// Run one aggregation.
    ///
    /// A blank query returns an empty page without invoking any adapter.
    /// Every targeted source gets a page entry; failed sources get an empty
    /// list plus a failure-report entry.
    ///
    /// # Errors
    ///
    /// - [`AggregationFault::NoAdapters`] if no requested source has an adapter
    /// - [`AggregationFault::Cancelled`] if `cancel` fires before all sources settle
    pub async fn aggregate(&self, query: &Query, cancel: &CancellationToken) -> Result<Aggregation> {
        if query.is_blank() {
            return Ok(Aggregation::default());
        }

        let targets = self.targets(query)?;
        tracing::trace!(text = query.text(), sources = targets.len(), "aggregating");

        let mut aggregation = Aggregation::default();
        let launches = self.admit(targets, &mut aggregation);
        let launched: Vec<SourceKind> = launches.iter().map(|(kind, _)| *kind).collect();

        let fan_out = futures::future::join_all(launches.into_iter().map(|(kind, adapter)| {
            let text = query.text();
            async move { (kind, self.query_source(kind, adapter.as_ref(), text).await) }
        }));

        let outcomes = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("aggregation cancelled");
                self.release_probes(&launched);
                return Err(AggregationFault::Cancelled);
            }
            outcomes = fan_out => outcomes,
        };

        self.settle(outcomes, &mut aggregation);
        Ok(aggregation)
    }

    fn targets(&self, query: &Query) -> Result<Vec<Launch>> {
        let targets: Vec<Launch> = query
            .requested_sources()
            .iter()
            .filter_map(|kind| self.registry.get(*kind).map(|a| (*kind, Arc::clone(a))))
            .collect();

        if targets.is_empty() {
            let requested = query
                .requested_sources()
                .iter()
                .map(SourceKind::name)
                .collect::<Vec<_>>();
            let requested = if requested.is_empty() {
                "none requested".to_owned()
            } else {
                requested.join(", ")
            };
            return Err(AggregationFault::NoAdapters(requested));
        }
        Ok(targets)
    }

    /// Split targets into launches and sources skipped by an open circuit.
    fn admit(&self, targets: Vec<Launch>, aggregation: &mut Aggregation) -> Vec<Launch> {
        let mut breaker = self.breaker();
        let mut launches = Vec::with_capacity(targets.len());
        for (kind, adapter) in targets {
            if breaker.should_attempt(kind) {
                launches.push((kind, adapter));
            } else {
                tracing::debug!(
                    source = %kind,
                    state = ?breaker.state(kind),
                    "skipping source with open circuit"
                );
                aggregation.page.insert(kind, Vec::new());
                aggregation.failures.record(
                    kind,
                    SourceError::CircuitOpen(format!("{kind} skipped after repeated failures")),
                );
            }
        }
        launches
    }

    /// Launched sources never settle when the aggregation is cancelled.
    fn release_probes(&self, launched: &[SourceKind]) {
        let mut breaker = self.breaker();
        for kind in launched {
            breaker.release_probe(*kind);
        }
    }

    fn settle(
        &self,
        outcomes: Vec<(SourceKind, std::result::Result<Vec<SearchResult>, SourceError>)>,
        aggregation: &mut Aggregation,
    ) {
        let mut breaker = self.breaker();
        for (kind, outcome) in outcomes {
            match outcome {
                Ok(results) => {
                    breaker.record_success(kind);
                    tracing::debug!(source = %kind, count = results.len(), "source settled");
                    aggregation.page.insert(kind, results);
                }
                Err(err) => {
                    breaker.record_failure(kind);
                    tracing::warn!(source = %kind, error = %err, "source query failed");
                    aggregation.page.insert(kind, Vec::new());
                    aggregation.failures.record(kind, err);
                }
            }
        }
    }

    async fn query_source(
        &self,
        kind: SourceKind,
        adapter: &dyn SourceAdapter,
        text: &str,
    ) -> std::result::Result<Vec<SearchResult>, SourceError> {
        let limit = self.config.per_source_limit;
        let key = CacheKey::new(kind, text, limit);
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key).await {
                tracing::debug!(source = %kind, "cache hit");
                return Ok(hit);
            }
        }

        let results =
            match tokio::time::timeout(self.config.per_source_timeout(), adapter.search(text, limit))
                .await
            {
                Ok(outcome) => outcome?,
                Err(_) => return Err(SourceError::Timeout(self.config.per_source_timeout_ms)),
            };

        let ranked = rank_and_cap(results, text, limit);
        if let Some(cache) = &self.cache {
            cache.insert(key, ranked.clone()).await;
        }
        Ok(ranked)
    }

    fn breaker(&self) -> MutexGuard<'_, CircuitBreaker> {
        self.breaker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::CircuitBreakerConfig;
    use crate::types::ResultPayload;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Scripted {
        kind: SourceKind,
        titles: Vec<&'static str>,
        fail: bool,
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn ok(kind: SourceKind, titles: Vec<&'static str>) -> Self {
            Self {
                kind,
                titles,
                fail: false,
                delay: Duration::ZERO,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing(kind: SourceKind) -> Self {
            Self {
                fail: true,
                ..Self::ok(kind, vec![])
            }
        }
    }

    #[async_trait]
    impl SourceAdapter for Scripted {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn search(
            &self,
            _text: &str,
            limit: usize,
        ) -> std::result::Result<Vec<SearchResult>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(SourceError::Backend("scripted failure".into()));
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
                    payload: ResultPayload::News {
                        category: None,
                        snippet: String::new(),
                    },
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn blank_query_is_empty() {
        let agg = Aggregator::new(
            AdapterRegistry::new().with(Scripted::failing(SourceKind::News)),
            AggregatorConfig::default(),
        )
        .expect("valid");
        let out = agg
            .aggregate(&Query::all_sources("  "), &CancellationToken::new())
            .await
            .expect("aggregate");
        assert!(out.page.is_empty());
        assert!(out.failures.is_empty());
    }

    #[tokio::test]
    async fn missing_adapters_are_a_fault() {
        let agg = Aggregator::new(
            AdapterRegistry::new().with(Scripted::ok(SourceKind::News, vec![])),
            AggregatorConfig::default(),
        )
        .expect("valid");
        let err = agg
            .aggregate(&Query::new("gà", [SourceKind::Food]), &CancellationToken::new())
            .await
            .expect_err("no food adapter");
        assert_eq!(err, AggregationFault::NoAdapters("food".into()));

        let err = agg
            .aggregate(&Query::new("gà", Vec::<SourceKind>::new()), &CancellationToken::new())
            .await
            .expect_err("nothing requested");
        assert!(matches!(err, AggregationFault::NoAdapters(_)));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = AggregatorConfig {
            per_source_limit: 0,
            ..AggregatorConfig::default()
        };
        let err = Aggregator::new(AdapterRegistry::new(), config).expect_err("invalid");
        assert!(matches!(err, AggregationFault::Config(_)));
    }

    #[tokio::test]
    async fn results_are_ranked_and_unmatched_dropped() {
        let agg = Aggregator::new(
            AdapterRegistry::new().with(Scripted::ok(
                SourceKind::News,
                vec!["Thời tiết", "Bánh mì gà", "Gà chiên", "gà"],
            )),
            AggregatorConfig::default(),
        )
        .expect("valid");
        let out = agg
            .aggregate(&Query::all_sources("Gà"), &CancellationToken::new())
            .await
            .expect("aggregate");
        let titles: Vec<_> = out
            .page
            .get(SourceKind::News)
            .iter()
            .map(|r| r.title.as_str())
            .collect();
        assert_eq!(titles, vec!["gà", "Gà chiên", "Bánh mì gà"]);
    }

    #[tokio::test]
    async fn open_circuit_skips_source() {
        let adapter = Scripted::failing(SourceKind::News);
        let calls = Arc::clone(&adapter.calls);
        let config = AggregatorConfig {
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: 2,
                cooldown_secs: 600,
            },
            ..AggregatorConfig::default()
        };
        let agg = Aggregator::new(AdapterRegistry::new().with(adapter), config).expect("valid");
        let query = Query::all_sources("gà");

        for _ in 0..3 {
            agg.aggregate(&query, &CancellationToken::new())
                .await
                .expect("aggregate");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let out = agg
            .aggregate(&query, &CancellationToken::new())
            .await
            .expect("aggregate");
        assert!(matches!(
            out.failures.get(SourceKind::News),
            Some(SourceError::CircuitOpen(_))
        ));
        assert_eq!(
            agg.circuit_health(),
            vec![(SourceKind::News, CircuitState::Open, 2)]
        );
    }

    #[tokio::test]
    async fn half_open_circuit_lets_one_probe_through() {
        let adapter = Scripted {
            delay: Duration::from_millis(30),
            ..Scripted::failing(SourceKind::News)
        };
        let calls = Arc::clone(&adapter.calls);
        let config = AggregatorConfig {
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: 1,
                cooldown_secs: 0,
            },
            ..AggregatorConfig::default()
        };
        let agg = Aggregator::new(AdapterRegistry::new().with(adapter), config).expect("valid");
        let query = Query::all_sources("gà");

        agg.aggregate(&query, &CancellationToken::new())
            .await
            .expect("aggregate");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let (cancel_a, cancel_b) = (CancellationToken::new(), CancellationToken::new());
        let (first, second) = tokio::join!(
            agg.aggregate(&query, &cancel_a),
            agg.aggregate(&query, &cancel_b),
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let skipped = [first.expect("aggregate"), second.expect("aggregate")]
            .iter()
            .filter(|out| {
                matches!(
                    out.failures.get(SourceKind::News),
                    Some(SourceError::CircuitOpen(_))
                )
            })
            .count();
        assert_eq!(skipped, 1);
    }

    #[tokio::test]
    async fn cancelled_probe_is_released() {
        let adapter = Scripted::failing(SourceKind::News);
        let calls = Arc::clone(&adapter.calls);
        let config = AggregatorConfig {
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: 1,
                cooldown_secs: 0,
            },
            ..AggregatorConfig::default()
        };
        let agg = Aggregator::new(AdapterRegistry::new().with(adapter), config).expect("valid");
        let query = Query::all_sources("gà");

        agg.aggregate(&query, &CancellationToken::new())
            .await
            .expect("aggregate");

        let cancelled = CancellationToken::new();
        cancelled.cancel();
        let err = agg.aggregate(&query, &cancelled).await.expect_err("cancelled");
        assert_eq!(err, AggregationFault::Cancelled);

        agg.aggregate(&query, &CancellationToken::new())
            .await
            .expect("aggregate");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cache_serves_repeat_queries() {
        let adapter = Scripted::ok(SourceKind::News, vec!["Gà chiên"]);
        let calls = Arc::clone(&adapter.calls);
        let config = AggregatorConfig {
            cache_ttl_seconds: 60,
            ..AggregatorConfig::default()
        };
        let agg = Aggregator::new(AdapterRegistry::new().with(adapter), config).expect("valid");

        for raw in ["gà", " GÀ "] {
            let out = agg
                .aggregate(&Query::all_sources(raw), &CancellationToken::new())
                .await
                .expect("aggregate");
            assert_eq!(out.page.get(SourceKind::News).len(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_stops_waiting() {
        let adapter = Scripted {
            delay: Duration::from_secs(5),
            ..Scripted::ok(SourceKind::News, vec!["Gà chiên"])
        };
        let agg = Aggregator::new(AdapterRegistry::new().with(adapter), AggregatorConfig::default())
            .expect("valid");
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = agg
            .aggregate(&Query::all_sources("gà"), &cancel)
            .await
            .expect_err("cancelled");
        assert_eq!(err, AggregationFault::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
