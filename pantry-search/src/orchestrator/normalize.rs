//! Record normalization: backend-native JSON into [`SearchResult`].
//!
//! A malformed record must never take a whole source down, so each raw
//! record is decoded on its own and anything that fails to decode, or
//! decodes but is unusable, is dropped with a debug log.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::types::{SearchResult, SourceKind};

/// A backend-native record that can be turned into a [`SearchResult`].
pub trait NativeRecord: DeserializeOwned {
    /// Convert into the common shape. `None` drops the record.
    fn into_result(self) -> Option<SearchResult>;
}

/// Decode and convert every raw record, silently dropping bad ones.
pub fn normalize_records<R: NativeRecord>(
    kind: SourceKind,
    raw: Vec<serde_json::Value>,
) -> Vec<SearchResult> {
    let total = raw.len();
    let results: Vec<SearchResult> = raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<R>(value) {
            Ok(record) => {
                let result = record.into_result();
                if result.is_none() {
                    tracing::debug!(source = %kind, "dropping record without usable title");
                }
                result
            }
            Err(e) => {
                tracing::debug!(source = %kind, error = %e, "dropping unparseable record");
                None
            }
        })
        .collect();

    if results.len() < total {
        tracing::debug!(
            source = %kind,
            kept = results.len(),
            dropped = total - results.len(),
            "normalized records"
        );
    }
    results
}

/// Whether `value` decodes as `R` into a usable result.
pub fn is_usable<R: NativeRecord>(value: &serde_json::Value) -> bool {
    R::deserialize(value)
        .ok()
        .and_then(NativeRecord::into_result)
        .is_some()
}

/// Deserialize an identifier that a backend may send as a string or a number.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Uint(u64),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Text(s) if !s.trim().is_empty() => Ok(s),
        RawId::Text(_) => Err(serde::de::Error::custom("empty identifier")),
        RawId::Int(n) => Ok(n.to_string()),
        RawId::Uint(n) => Ok(n.to_string()),
    }
}

/// [`string_or_number`] for an optional field; pair with `#[serde(default)]`.
pub fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    string_or_number(deserializer).map(Some)
}

/// Trimmed, non-empty text or `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
