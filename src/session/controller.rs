//! Query session actor.
//!
//! All session state (pending text, debounce deadline, generation counter,
//! enabled sources) is owned by a single task. [`QuerySession`] is a handle
//! that talks to it over a channel and reads published state from `watch`
//! channels, so no lock ever guards session state.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use pantry_search::query::normalize_text;
use pantry_search::{Aggregation, AggregationFault, Aggregator, Query, SourceKind};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;

use super::{SessionEvent, SessionState, Snapshot};
use crate::config::SessionConfig;
use crate::error::{PantryError, Result};

/// Session event broadcast capacity.
const EVENT_CAPACITY: usize = 64;

enum SessionCommand {
    Submit(String),
    Toggle {
        kind: SourceKind,
        reply: oneshot::Sender<bool>,
    },
}

struct Completion {
    generation: u64,
    query: String,
    outcome: std::result::Result<Aggregation, AggregationFault>,
}

/// Handle to one interactive search session.
///
/// Dropping the handle disposes the session.
pub struct QuerySession {
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    snapshot_rx: watch::Receiver<Snapshot>,
    state_rx: watch::Receiver<SessionState>,
    sources_rx: watch::Receiver<BTreeSet<SourceKind>>,
    event_tx: broadcast::Sender<SessionEvent>,
    stale_discarded: Arc<AtomicU64>,
    shutdown: CancellationToken,
    registered: Vec<SourceKind>,
}

impl QuerySession {
    /// Start a session over `aggregator`.
    ///
    /// Must be called within a Tokio runtime: the session actor is spawned
    /// immediately.
    pub fn new(aggregator: Arc<Aggregator>, config: &SessionConfig) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        let sources: BTreeSet<SourceKind> = config.default_sources.iter().copied().collect();
        let (sources_tx, sources_rx) = watch::channel(sources.clone());
        let (event_tx, _event_rx) = broadcast::channel(EVENT_CAPACITY);
        let stale_discarded = Arc::new(AtomicU64::new(0));
        let shutdown = CancellationToken::new();
        let registered = aggregator.registry().kinds();

        let actor = SessionActor {
            aggregator,
            debounce: config.debounce(),
            sources,
            pending: None,
            deadline: None,
            last_text: None,
            generation: 0,
            in_flight: None,
            snapshot_tx,
            state_tx,
            sources_tx,
            event_tx: event_tx.clone(),
            stale_discarded: Arc::clone(&stale_discarded),
            shutdown: shutdown.clone(),
        };
        tokio::spawn(actor.run(command_rx));

        Self {
            command_tx,
            snapshot_rx,
            state_rx,
            sources_rx,
            event_tx,
            stale_discarded,
            shutdown,
            registered,
        }
    }

    /// Feed the latest raw search-box text. Returns immediately; results
    /// arrive as a published snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`PantryError::Session`] once the session is disposed.
    pub fn submit(&self, raw_text: &str) -> Result<()> {
        self.ensure_live()?;
        self.command_tx
            .send(SessionCommand::Submit(raw_text.to_owned()))
            .map_err(|_| PantryError::Session("session actor stopped".into()))
    }

    /// Flip `kind` in the requested source set and re-run the current query
    /// right away. Returns whether `kind` is now enabled.
    ///
    /// # Errors
    ///
    /// Returns [`PantryError::Session`] once the session is disposed.
    pub async fn toggle_source(&self, kind: SourceKind) -> Result<bool> {
        self.ensure_live()?;
        let (reply, enabled) = oneshot::channel();
        self.command_tx
            .send(SessionCommand::Toggle { kind, reply })
            .map_err(|_| PantryError::Session("session actor stopped".into()))?;
        enabled
            .await
            .map_err(|_| PantryError::Session("session disposed before toggle applied".into()))
    }

    /// The most recently published snapshot.
    pub fn current_snapshot(&self) -> Snapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Stream of published snapshots, starting with the current one.
    ///
    /// Latest-value semantics: a slow reader skips intermediate snapshots.
    pub fn snapshots(&self) -> WatchStream<Snapshot> {
        WatchStream::new(self.snapshot_rx.clone())
    }

    /// Every publish and session-level failure, in order.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub fn state(&self) -> SessionState {
        if self.shutdown.is_cancelled() {
            return SessionState::Disposed;
        }
        *self.state_rx.borrow()
    }

    /// Sources the next aggregation will ask.
    pub fn enabled_sources(&self) -> BTreeSet<SourceKind> {
        self.sources_rx.borrow().clone()
    }

    /// Sources the aggregator has adapters for.
    pub fn registered_sources(&self) -> &[SourceKind] {
        &self.registered
    }

    /// Completed aggregations dropped because a newer generation had started.
    pub fn stale_discarded(&self) -> u64 {
        self.stale_discarded.load(Ordering::Relaxed)
    }

    pub fn is_disposed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stop the session: pending debounce and in-flight work are cancelled
    /// and nothing is published afterwards.
    pub fn dispose(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::debug!("disposing query session");
            self.shutdown.cancel();
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(PantryError::Session("session disposed".into()));
        }
        Ok(())
    }
}

impl Drop for QuerySession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct SessionActor {
    aggregator: Arc<Aggregator>,
    debounce: Duration,
    sources: BTreeSet<SourceKind>,
    /// Raw text waiting for the debounce deadline.
    pending: Option<String>,
    deadline: Option<Instant>,
    /// Last non-blank text handed to the aggregator; re-run on toggle.
    last_text: Option<String>,
    generation: u64,
    in_flight: Option<CancellationToken>,
    snapshot_tx: watch::Sender<Snapshot>,
    state_tx: watch::Sender<SessionState>,
    sources_tx: watch::Sender<BTreeSet<SourceKind>>,
    event_tx: broadcast::Sender<SessionEvent>,
    stale_discarded: Arc<AtomicU64>,
    shutdown: CancellationToken,
}

impl SessionActor {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
        let shutdown = self.shutdown.clone();

        loop {
            let deadline = self.deadline;
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => self.handle(command, &done_tx),
                    None => break,
                },
                Some(completion) = done_rx.recv() => self.complete(completion),
                () = wait_until(deadline) => self.fire(&done_tx),
            }
        }

        self.supersede();
        self.pending = None;
        self.deadline = None;
        self.state_tx.send_replace(SessionState::Disposed);
        tracing::debug!(generation = self.generation, "query session stopped");
    }

    fn handle(&mut self, command: SessionCommand, done_tx: &mpsc::UnboundedSender<Completion>) {
        match command {
            SessionCommand::Submit(raw) => self.submit(raw),
            SessionCommand::Toggle { kind, reply } => {
                let enabled = self.toggle(kind);
                let _ = reply.send(enabled);
                self.rerun(done_tx);
            }
        }
    }

    fn submit(&mut self, raw: String) {
        if normalize_text(&raw).is_empty() {
            self.clear();
            return;
        }
        self.pending = Some(raw);
        self.deadline = Some(Instant::now() + self.debounce);
        self.state_tx.send_replace(SessionState::Debouncing);
    }

    /// Blank input: drop everything pending and publish an empty page now.
    fn clear(&mut self) {
        self.pending = None;
        self.deadline = None;
        self.last_text = None;
        self.supersede();
        self.generation += 1;
        self.publish(Snapshot {
            generation: self.generation,
            ..Snapshot::default()
        });
        self.state_tx.send_replace(SessionState::Idle);
    }

    fn toggle(&mut self, kind: SourceKind) -> bool {
        let enabled = if self.sources.remove(&kind) {
            false
        } else {
            self.sources.insert(kind);
            true
        };
        tracing::debug!(source = %kind, enabled, "source toggled");
        self.sources_tx.send_replace(self.sources.clone());
        enabled
    }

    fn rerun(&mut self, done_tx: &mpsc::UnboundedSender<Completion>) {
        self.deadline = None;
        if let Some(text) = self.pending.take().or_else(|| self.last_text.clone()) {
            self.start(text, done_tx);
        }
    }

    fn fire(&mut self, done_tx: &mpsc::UnboundedSender<Completion>) {
        self.deadline = None;
        if let Some(text) = self.pending.take() {
            self.start(text, done_tx);
        }
    }

    fn start(&mut self, text: String, done_tx: &mpsc::UnboundedSender<Completion>) {
        self.supersede();
        self.generation += 1;
        let generation = self.generation;
        let query = Query::new(&text, self.sources.iter().copied());
        self.last_text = Some(text);

        let cancel = self.shutdown.child_token();
        self.in_flight = Some(cancel.clone());
        self.state_tx.send_replace(SessionState::Aggregating);
        tracing::debug!(generation, "aggregation started");

        let aggregator = Arc::clone(&self.aggregator);
        let done_tx = done_tx.clone();
        tokio::spawn(async move {
            let outcome = aggregator.aggregate(&query, &cancel).await;
            let _ = done_tx.send(Completion {
                generation,
                query: query.text().to_owned(),
                outcome,
            });
        });
    }

    /// Cancel the in-flight generation, if any.
    fn supersede(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
    }

    fn complete(&mut self, completion: Completion) {
        let Completion {
            generation,
            query,
            outcome,
        } = completion;

        if generation != self.generation {
            self.stale_discarded.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(generation, latest = self.generation, "stale result discarded");
            return;
        }
        self.in_flight = None;

        match outcome {
            Ok(aggregation) => self.publish(Snapshot {
                generation,
                query,
                page: aggregation.page,
                failures: aggregation.failures,
            }),
            Err(fault) => {
                tracing::warn!(generation, error = %fault, "aggregation failed");
                let _ = self.event_tx.send(SessionEvent::Failed {
                    generation,
                    query,
                    message: fault.to_string(),
                });
            }
        }

        let next = if self.deadline.is_some() {
            SessionState::Debouncing
        } else {
            SessionState::Idle
        };
        self.state_tx.send_replace(next);
    }

    fn publish(&mut self, snapshot: Snapshot) {
        if self.shutdown.is_cancelled() {
            return;
        }
        tracing::debug!(
            generation = snapshot.generation,
            results = snapshot.page.total(),
            failures = snapshot.failures.len(),
            "snapshot published"
        );
        self.snapshot_tx.send_replace(snapshot.clone());
        let _ = self.event_tx.send(SessionEvent::Published(snapshot));
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use pantry_search::{AdapterRegistry, AggregatorConfig, RecipeAdapter};
    use serde_json::json;

    fn session(debounce_ms: u64) -> QuerySession {
        let registry = AdapterRegistry::new().with(RecipeAdapter::in_memory(vec![
            json!({"id": 1, "name": "Gà chiên"}),
        ]));
        let aggregator =
            Arc::new(Aggregator::new(registry, AggregatorConfig::default()).unwrap());
        QuerySession::new(
            aggregator,
            &SessionConfig {
                debounce_ms,
                ..SessionConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn starts_idle_with_empty_snapshot() {
        let session = session(50);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.current_snapshot(), Snapshot::default());
        assert_eq!(session.registered_sources(), &[SourceKind::Recipe]);
        assert_eq!(session.enabled_sources().len(), 4);
    }

    #[tokio::test]
    async fn submit_debounces_then_publishes() {
        let session = session(30);
        let mut events = session.subscribe();
        session.submit("gà").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            SessionEvent::Published(snapshot) => {
                assert_eq!(snapshot.generation, 1);
                assert_eq!(snapshot.query, "gà");
                assert_eq!(snapshot.page.get(SourceKind::Recipe).len(), 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn toggle_reports_new_state() {
        let session = session(30);
        assert!(!session.toggle_source(SourceKind::News).await.unwrap());
        assert!(!session.enabled_sources().contains(&SourceKind::News));
        assert!(session.toggle_source(SourceKind::News).await.unwrap());
        assert!(session.enabled_sources().contains(&SourceKind::News));
    }

    #[tokio::test]
    async fn disposed_session_rejects_input() {
        let session = session(30);
        session.dispose();
        assert_eq!(session.state(), SessionState::Disposed);
        assert!(matches!(session.submit("gà"), Err(PantryError::Session(_))));
        assert!(session.toggle_source(SourceKind::Food).await.is_err());
    }

    #[test]
    fn snapshot_serializes_page_by_source() {
        let value = serde_json::to_value(Snapshot::default()).unwrap();
        assert_eq!(
            value,
            json!({"generation": 0, "query": "", "page": {}, "failures": {}})
        );
    }
}
