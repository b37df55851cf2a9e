//! Versioned host command/event envelopes for the search host bridge.

use serde::{Deserialize, Serialize};

/// Contract version for host command/event envelopes.
pub const EVENT_VERSION: u32 = 1;

/// Event emitted when a session publishes a snapshot.
pub const EVENT_SEARCH_RESULTS: &str = "search.results";

/// Event emitted when the latest query could not be aggregated.
pub const EVENT_SEARCH_ERROR: &str = "search.error";

/// Command set for host integrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandName {
    #[serde(rename = "host.ping")]
    HostPing,
    #[serde(rename = "host.version")]
    HostVersion,
    #[serde(rename = "search.submit")]
    SearchSubmit,
    #[serde(rename = "search.toggle_source")]
    SearchToggleSource,
    #[serde(rename = "search.snapshot")]
    SearchSnapshot,
    #[serde(rename = "search.sources")]
    SearchSources,
    #[serde(rename = "runtime.stop")]
    RuntimeStop,
}

impl CommandName {
    /// Render command name to wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HostPing => "host.ping",
            Self::HostVersion => "host.version",
            Self::SearchSubmit => "search.submit",
            Self::SearchToggleSource => "search.toggle_source",
            Self::SearchSnapshot => "search.snapshot",
            Self::SearchSources => "search.sources",
            Self::RuntimeStop => "runtime.stop",
        }
    }

    /// Parse a command name from wire format.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "host.ping" => Some(Self::HostPing),
            "host.version" => Some(Self::HostVersion),
            "search.submit" => Some(Self::SearchSubmit),
            "search.toggle_source" => Some(Self::SearchToggleSource),
            "search.snapshot" => Some(Self::SearchSnapshot),
            "search.sources" => Some(Self::SearchSources),
            "runtime.stop" => Some(Self::RuntimeStop),
            _ => None,
        }
    }
}

/// A versioned response envelope from host -> frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub v: u32,
    pub request_id: String,
    pub ok: bool,
    pub payload: serde_json::Value,
    pub error: Option<String>,
}

impl ResponseEnvelope {
    /// Build a successful response envelope.
    #[must_use]
    pub fn ok(request_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: true,
            payload,
            error: None,
        }
    }

    /// Build an error response envelope.
    #[must_use]
    pub fn error(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: false,
            payload: serde_json::Value::Null,
            error: Some(message.into()),
        }
    }
}

/// A versioned command envelope from frontend -> host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub v: u32,
    pub request_id: String,
    pub command: CommandName,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl CommandEnvelope {
    /// Build a v1 command envelope.
    #[must_use]
    pub fn new(
        request_id: impl Into<String>,
        command: CommandName,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            command,
            payload,
        }
    }

    /// Validate envelope version and required identifiers.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.v != EVENT_VERSION {
            return Err(ContractError::new(
                ContractErrorKind::UnsupportedVersion,
                format!(
                    "unsupported contract version {}; expected {}",
                    self.v, EVENT_VERSION
                ),
            ));
        }
        if self.request_id.trim().is_empty() {
            return Err(ContractError::new(
                ContractErrorKind::InvalidEnvelope,
                "request_id cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// A versioned event envelope from host -> frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub v: u32,
    pub event_id: String,
    pub event: String,
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Build a v1 event envelope with a fresh random id.
    #[must_use]
    pub fn new(event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            v: EVENT_VERSION,
            event_id: uuid::Uuid::new_v4().to_string(),
            event: event.into(),
            payload,
        }
    }
}

/// Contract validation error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractErrorKind {
    UnsupportedVersion,
    InvalidEnvelope,
}

/// Contract validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct ContractError {
    pub kind: ContractErrorKind,
    pub message: String,
}

impl ContractError {
    #[must_use]
    pub fn new(kind: ContractErrorKind, message: String) -> Self {
        Self { kind, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_names_round_trip_through_wire_format() {
        for name in [
            CommandName::HostPing,
            CommandName::HostVersion,
            CommandName::SearchSubmit,
            CommandName::SearchToggleSource,
            CommandName::SearchSnapshot,
            CommandName::SearchSources,
            CommandName::RuntimeStop,
        ] {
            assert_eq!(CommandName::parse(name.as_str()), Some(name));
            let json = serde_json::to_string(&name).expect("serialize in test");
            assert_eq!(json, format!("\"{}\"", name.as_str()));
        }
        assert_eq!(CommandName::parse("search.unknown"), None);
    }

    #[test]
    fn missing_payload_defaults_to_null() {
        let envelope: CommandEnvelope =
            serde_json::from_str(r#"{"v":1,"request_id":"r1","command":"search.snapshot"}"#)
                .expect("deserialize in test");
        assert!(envelope.payload.is_null());
        assert!(envelope.validate().is_ok());
    }

    #[test]
    fn validate_rejects_wrong_version() {
        let mut envelope =
            CommandEnvelope::new("r1", CommandName::HostPing, serde_json::json!({}));
        envelope.v = 2;
        let err = envelope.validate().expect_err("version 2");
        assert_eq!(err.kind, ContractErrorKind::UnsupportedVersion);
    }

    #[test]
    fn validate_rejects_blank_request_id() {
        let envelope = CommandEnvelope::new("  ", CommandName::HostPing, serde_json::json!({}));
        let err = envelope.validate().expect_err("blank id");
        assert_eq!(err.kind, ContractErrorKind::InvalidEnvelope);
    }

    #[test]
    fn events_get_unique_ids() {
        let a = EventEnvelope::new(EVENT_SEARCH_RESULTS, serde_json::json!({}));
        let b = EventEnvelope::new(EVENT_SEARCH_RESULTS, serde_json::json!({}));
        assert_ne!(a.event_id, b.event_id);
        assert_eq!(a.v, EVENT_VERSION);
    }
}
