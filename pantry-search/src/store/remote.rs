//! HTTP record store for backends that expose a JSON search endpoint.
//!
//! Issues `GET {endpoint}?q={text}&limit={limit}` and accepts either a
//! bare JSON array of records or an object with an `items` array.

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::SourceError;

use super::RecordStore;

/// A read-only JSON search endpoint.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpStore {
    /// Create a store for `endpoint` using a shared client.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] when `endpoint` is rejected by
    /// [`HttpStore::parse_endpoint`].
    pub fn new(client: reqwest::Client, endpoint: &str) -> Result<Self, SourceError> {
        let endpoint = Self::parse_endpoint(endpoint)?;
        Ok(Self { client, endpoint })
    }

    /// Parse an endpoint: an absolute http(s) URL with a host.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] describing why `endpoint` is unusable.
    pub fn parse_endpoint(endpoint: &str) -> Result<Url, SourceError> {
        let url = Url::parse(endpoint)
            .map_err(|e| SourceError::Http(format!("invalid endpoint {endpoint:?}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SourceError::Http(format!(
                "unsupported endpoint scheme: {}",
                url.scheme()
            )));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(SourceError::Http(format!("endpoint {endpoint:?} has no host")));
        }
        Ok(url)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request_url(&self, text: &str, limit: usize) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", text)
            .append_pair("limit", &limit.to_string());
        url
    }
}

#[async_trait]
impl RecordStore for HttpStore {
    async fn fetch(&self, text: &str, limit: usize) -> Result<Vec<Value>, SourceError> {
        let url = self.request_url(text, limit);
        tracing::trace!(host = url.host_str().unwrap_or_default(), "record store request");

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SourceError::Http(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| SourceError::Http(format!("backend status: {e}")))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("response is not JSON: {e}")))?;

        let mut records = extract_records(body)?;
        records.truncate(limit);
        Ok(records)
    }
}

/// Pull the record list out of a response body.
fn extract_records(body: Value) -> Result<Vec<Value>, SourceError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(SourceError::Parse(
                "response object has no `items` array".into(),
            )),
        },
        other => Err(SourceError::Parse(format!(
            "expected a record array, got {}",
            json_type(&other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
