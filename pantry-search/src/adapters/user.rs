//! User directory source.
//!
//! Users are found by display name or handle. The display name is the
//! result title; the handle is an alternate match field for ranking.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::adapter::SourceAdapter;
use crate::error::SourceError;
use crate::orchestrator::normalize::{non_blank, optional_string_or_number, NativeRecord};
use crate::store::{MatchPolicy, MemoryStore, RecordStore};
use crate::types::{ResultPayload, SearchResult, SourceKind};

/// User record. Directory backends disagree on field names, so every
/// spelling is its own optional field and the first present one wins.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub uid: Option<String>,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl NativeRecord for UserRecord {
    fn into_result(self) -> Option<SearchResult> {
        let id = self.uid.or(self.id)?;
        let handle = non_blank(self.username).or_else(|| non_blank(self.handle));
        let title = non_blank(self.full_name)
            .or_else(|| non_blank(self.display_name))
            .or_else(|| non_blank(self.name))
            .or_else(|| handle.clone())?;
        Some(SearchResult {
            id,
            title: title.clone(),
            image_url: non_blank(self.avatar_url)
                .or_else(|| non_blank(self.avatar))
                .or_else(|| non_blank(self.image_url)),
            payload: ResultPayload::User {
                handle: handle.unwrap_or(title),
                email: non_blank(self.email),
            },
        })
    }
}

pub struct UserAdapter {
    store: Arc<dyn RecordStore>,
}

impl UserAdapter {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Adapter over in-memory records, matched by name or handle substring.
    pub fn in_memory(records: Vec<serde_json::Value>) -> Self {
        Self::new(Arc::new(
            MemoryStore::new(
                super::usable_records::<UserRecord>(SourceKind::User, records),
                MatchPolicy::Substring,
            )
            .match_fields(["fullName", "displayName", "name", "username", "handle"])
            .id_fields(["uid", "id"]),
        ))
    }
}

#[async_trait]
impl SourceAdapter for UserAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::User
    }

    async fn search(&self, text: &str, limit: usize) -> Result<Vec<SearchResult>, SourceError> {
        super::fetch_normalized::<UserRecord>(self.store.as_ref(), SourceKind::User, text, limit)
            .await
    }
}
