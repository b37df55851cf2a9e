//! In-memory record store.
//!
//! Holds a snapshot of backend records (typically loaded from a catalog
//! file) and answers queries with the same contract a remote backend
//! would: filtered by the configured [`MatchPolicy`], ordered exact >
//! prefix > substring > all-tokens, ties broken by ascending identifier,
//! capped at `limit`.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SourceError;
use crate::orchestrator::ranking::{classify, MatchTier};

use super::RecordStore;

/// Which candidates a store is willing to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Title starts with the query (a key-range scan on a sorted index).
    Prefix,
    /// Title contains the query anywhere.
    Substring,
    /// Substring, or every query token appears in the title.
    AllTokens,
}

impl MatchPolicy {
    fn admits(self, tier: MatchTier) -> bool {
        match self {
            Self::Prefix => tier <= MatchTier::Prefix,
            Self::Substring => tier <= MatchTier::Contains,
            Self::AllTokens => true,
        }
    }
}

/// Records held in memory, matched on one or more string fields.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    records: Vec<Value>,
    match_fields: Vec<String>,
    id_fields: Vec<String>,
    policy: MatchPolicy,
}

impl MemoryStore {
    /// Store matching on `name`, identified by `id`.
    pub fn new(records: Vec<Value>, policy: MatchPolicy) -> Self {
        Self {
            records,
            match_fields: vec!["name".to_owned()],
            id_fields: vec!["id".to_owned()],
            policy,
        }
    }

    /// Replace the fields matched against, in priority order.
    #[must_use]
    pub fn match_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.match_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the identifier fields; the first one present on a record is its id.
    #[must_use]
    pub fn id_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.id_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn id_of<'a>(&self, record: &'a Value) -> Option<&'a Value> {
        self.id_fields
            .iter()
            .find_map(|field| record.get(field).filter(|v| !v.is_null()))
    }

    fn tier(&self, record: &Value, text: &str) -> Option<MatchTier> {
        self.match_fields
            .iter()
            .filter_map(|field| record.get(field).and_then(Value::as_str))
            .filter_map(|candidate| classify(candidate, text))
            .min()
    }

    /// Candidates for `text`, ordered and capped. Synchronous core of [`RecordStore::fetch`].
    pub fn lookup(&self, text: &str, limit: usize) -> Vec<Value> {
        let mut matched: Vec<(MatchTier, &Value)> = self
            .records
            .iter()
            .filter_map(|record| self.tier(record, text).map(|tier| (tier, record)))
            .filter(|(tier, _)| self.policy.admits(*tier))
            .collect();

        matched.sort_by(|(ta, a), (tb, b)| {
            ta.cmp(tb)
                .then_with(|| compare_ids(self.id_of(a), self.id_of(b)))
        });

        matched
            .into_iter()
            .take(limit)
            .map(|(_, record)| record.clone())
            .collect()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch(&self, text: &str, limit: usize) -> Result<Vec<Value>, SourceError> {
        Ok(self.lookup(text, limit))
    }
}

/// Ascending identifier order: numeric ids numerically, otherwise lexically.
/// Records without an id sort last.
fn compare_ids(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (id_key(a), id_key(b)) {
        (Some(IdKey::Num(x)), Some(IdKey::Num(y))) => x.cmp(&y),
        (Some(x), Some(y)) => x.as_text().cmp(&y.as_text()),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

enum IdKey {
    Num(u64),
    Text(String),
}

impl IdKey {
    fn as_text(&self) -> String {
        match self {
            Self::Num(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

fn id_key(value: Option<&Value>) -> Option<IdKey> {
    match value? {
        Value::Number(n) => n.as_u64().map(IdKey::Num).or_else(|| Some(IdKey::Text(n.to_string()))),
        Value::String(s) => Some(s.parse::<u64>().map_or_else(|_| IdKey::Text(s.clone()), IdKey::Num)),
        _ => None,
    }
}
