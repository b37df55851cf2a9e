//! Host command channel and router.
//!
//! [`HostCommandClient`] sends validated [`CommandEnvelope`]s to a
//! [`HostCommandServer`], which routes them to a [`SearchHandler`] and
//! answers with a [`ResponseEnvelope`]. Session events reach the client's
//! event subscribers as [`EventEnvelope`]s.

use async_trait::async_trait;
use pantry_search::SourceKind;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::error::{PantryError, Result};
use crate::host::contract::{
    CommandEnvelope, CommandName, EVENT_SEARCH_ERROR, EVENT_SEARCH_RESULTS, EVENT_VERSION,
    EventEnvelope, ResponseEnvelope,
};
use crate::session::{QuerySession, SessionEvent};

/// What the host bridge needs from a search backend.
#[async_trait]
pub trait SearchHandler: Send + Sync + 'static {
    /// Feed new search-box text.
    fn submit(&self, text: &str) -> Result<()>;

    /// Flip a source filter; returns whether it is now enabled.
    async fn toggle_source(&self, kind: SourceKind) -> Result<bool>;

    /// The latest published snapshot, as JSON.
    fn snapshot(&self) -> Result<serde_json::Value>;

    /// Registered and enabled sources, as JSON.
    fn sources(&self) -> Result<serde_json::Value>;

    /// Session events to forward to the frontend, if any.
    fn subscribe(&self) -> Option<broadcast::Receiver<SessionEvent>> {
        None
    }

    fn request_runtime_stop(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl SearchHandler for QuerySession {
    fn submit(&self, text: &str) -> Result<()> {
        QuerySession::submit(self, text)
    }

    async fn toggle_source(&self, kind: SourceKind) -> Result<bool> {
        QuerySession::toggle_source(self, kind).await
    }

    fn snapshot(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self.current_snapshot())
            .map_err(|e| PantryError::Session(format!("failed to serialize snapshot: {e}")))
    }

    fn sources(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({
            "registered": self.registered_sources(),
            "enabled": self.enabled_sources(),
        }))
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<SessionEvent>> {
        Some(QuerySession::subscribe(self))
    }

    fn request_runtime_stop(&self) -> Result<()> {
        self.dispose();
        Ok(())
    }
}

struct HostCommandRequest {
    envelope: CommandEnvelope,
    response_tx: oneshot::Sender<Result<ResponseEnvelope>>,
}

#[derive(Clone)]
pub struct HostCommandClient {
    request_tx: mpsc::Sender<HostCommandRequest>,
    event_tx: broadcast::Sender<EventEnvelope>,
}

impl HostCommandClient {
    pub async fn send(&self, envelope: CommandEnvelope) -> Result<ResponseEnvelope> {
        envelope.validate().map_err(|e| {
            PantryError::Command(format!(
                "invalid host command envelope {}: {}",
                envelope.request_id, e
            ))
        })?;

        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(HostCommandRequest {
                envelope,
                response_tx,
            })
            .await
            .map_err(|e| {
                PantryError::Channel(format!("failed to send host command request: {e}"))
            })?;

        response_rx
            .await
            .map_err(|e| PantryError::Channel(format!("host command response dropped: {e}")))?
    }

    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<EventEnvelope> {
        self.event_tx.subscribe()
    }
}

pub struct HostCommandServer<H: SearchHandler> {
    request_rx: mpsc::Receiver<HostCommandRequest>,
    event_tx: broadcast::Sender<EventEnvelope>,
    handler: H,
}

#[must_use]
pub fn command_channel<H: SearchHandler>(
    request_capacity: usize,
    event_capacity: usize,
    handler: H,
) -> (HostCommandClient, HostCommandServer<H>) {
    let (event_tx, _event_rx) = broadcast::channel(event_capacity.max(1));
    let (request_tx, request_rx) = mpsc::channel(request_capacity.max(1));

    (
        HostCommandClient {
            request_tx,
            event_tx: event_tx.clone(),
        },
        HostCommandServer {
            request_rx,
            event_tx,
            handler,
        },
    )
}

impl<H: SearchHandler> HostCommandServer<H> {
    /// Serve requests until every client is dropped.
    ///
    /// Session events are forwarded to the event channel for as long as the
    /// server runs.
    pub async fn run(mut self) {
        let forwarder = self
            .handler
            .subscribe()
            .map(|rx| tokio::spawn(forward_session_events(rx, self.event_tx.clone())));

        while let Some(request) = self.request_rx.recv().await {
            let response = self.route(&request.envelope).await;
            let _ = request.response_tx.send(response);
        }

        if let Some(forwarder) = forwarder {
            forwarder.abort();
        }
    }

    /// Route a command envelope to the appropriate handler.
    pub async fn route(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let request_id = envelope.request_id.clone();
        match envelope.command {
            CommandName::HostPing => Ok(ResponseEnvelope::ok(
                request_id,
                serde_json::json!({"pong": true}),
            )),
            CommandName::HostVersion => Ok(ResponseEnvelope::ok(
                request_id,
                serde_json::json!({
                    "contract_version": EVENT_VERSION,
                    "channel": "pantry_host_v1",
                    "version": env!("CARGO_PKG_VERSION"),
                }),
            )),
            CommandName::SearchSubmit => {
                let text = parse_submit_text(&envelope.payload)?;
                self.handler.submit(text)?;
                Ok(ResponseEnvelope::ok(
                    request_id,
                    serde_json::json!({"accepted": true}),
                ))
            }
            CommandName::SearchToggleSource => {
                let kind = parse_source(&envelope.payload)?;
                let enabled = self.handler.toggle_source(kind).await?;
                Ok(ResponseEnvelope::ok(
                    request_id,
                    serde_json::json!({"source": kind, "enabled": enabled}),
                ))
            }
            CommandName::SearchSnapshot => {
                Ok(ResponseEnvelope::ok(request_id, self.handler.snapshot()?))
            }
            CommandName::SearchSources => {
                Ok(ResponseEnvelope::ok(request_id, self.handler.sources()?))
            }
            CommandName::RuntimeStop => {
                self.handler.request_runtime_stop()?;
                Ok(ResponseEnvelope::ok(
                    request_id,
                    serde_json::json!({"stopping": true}),
                ))
            }
        }
    }
}

/// Re-publish session events as `search.results` / `search.error` envelopes.
async fn forward_session_events(
    mut rx: broadcast::Receiver<SessionEvent>,
    event_tx: broadcast::Sender<EventEnvelope>,
) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(lagged = n, "session event forwarder lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let (name, payload) = match &event {
            SessionEvent::Published(snapshot) => {
                (EVENT_SEARCH_RESULTS, serde_json::to_value(snapshot))
            }
            SessionEvent::Failed { .. } => (EVENT_SEARCH_ERROR, serde_json::to_value(&event)),
        };
        match payload {
            Ok(payload) => {
                let _ = event_tx.send(EventEnvelope::new(name, payload));
            }
            Err(e) => tracing::error!(error = %e, "failed to serialize session event; skipping"),
        }
    }
}

fn parse_submit_text(payload: &serde_json::Value) -> Result<&str> {
    payload
        .get("text")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| PantryError::Command("search.submit requires payload.text".to_owned()))
}

fn parse_source(payload: &serde_json::Value) -> Result<SourceKind> {
    let Some(raw) = payload.get("source").and_then(serde_json::Value::as_str) else {
        return Err(PantryError::Command(
            "search.toggle_source requires payload.source".to_owned(),
        ));
    };

    SourceKind::parse(raw).ok_or_else(|| {
        PantryError::Command(format!(
            "unsupported source `{raw}` (expected recipe/food/news/user)"
        ))
    })
}
