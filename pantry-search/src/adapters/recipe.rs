//! Recipe source.
//!
//! Recipe names are multi-word ("Gà xào sả ớt"), so this source accepts
//! candidates where every query token appears somewhere in the name, not
//! only contiguous substrings.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::adapter::SourceAdapter;
use crate::error::SourceError;
use crate::orchestrator::normalize::{non_blank, string_or_number, NativeRecord};
use crate::store::{MatchPolicy, MemoryStore, RecordStore};
use crate::types::{ResultPayload, SearchResult, SourceKind};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Older exports call the name `title`; `name` wins when both are set.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
    #[serde(default, alias = "authorName")]
    pub author: Option<String>,
    #[serde(default, alias = "cookTimeMinutes")]
    pub cook_time: Option<u32>,
    #[serde(default)]
    pub servings: Option<u32>,
}

impl NativeRecord for RecipeRecord {
    fn into_result(self) -> Option<SearchResult> {
        let title = non_blank(self.name).or_else(|| non_blank(self.title))?;
        Some(SearchResult {
            id: self.id,
            title,
            image_url: non_blank(self.image_url),
            payload: ResultPayload::Recipe {
                author: non_blank(self.author),
                cook_minutes: self.cook_time,
                servings: self.servings.filter(|s| *s > 0),
            },
        })
    }
}

pub struct RecipeAdapter {
    store: Arc<dyn RecordStore>,
}

impl RecipeAdapter {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Adapter over in-memory records, matched on name with token fallback.
    pub fn in_memory(records: Vec<serde_json::Value>) -> Self {
        Self::new(Arc::new(
            MemoryStore::new(
                super::usable_records::<RecipeRecord>(SourceKind::Recipe, records),
                MatchPolicy::AllTokens,
            )
            .match_fields(["name", "title"]),
        ))
    }
}

#[async_trait]
impl SourceAdapter for RecipeAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Recipe
    }

    async fn search(&self, text: &str, limit: usize) -> Result<Vec<SearchResult>, SourceError> {
        super::fetch_normalized::<RecipeRecord>(self.store.as_ref(), SourceKind::Recipe, text, limit)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records() -> Vec<serde_json::Value> {
        vec![
            json!({"id": "r1", "name": "Gà xào sả ớt", "authorName": "Mai", "cookTime": 25, "servings": 2}),
            json!({"id": "r2", "name": "Canh chua cá lóc"}),
            json!({"id": "r3", "title": "Cơm gà Hội An", "servings": 0}),
        ]
    }

    #[tokio::test]
    async fn token_query_matches_scattered_words() {
        let adapter = RecipeAdapter::in_memory(records());
        let results = adapter.search("gà ớt", 10).await.expect("search");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "r1");
        match &results[0].payload {
            ResultPayload::Recipe {
                author,
                cook_minutes,
                servings,
            } => {
                assert_eq!(author.as_deref(), Some("Mai"));
                assert_eq!(*cook_minutes, Some(25));
                assert_eq!(*servings, Some(2));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn title_alias_and_zero_servings() {
        let adapter = RecipeAdapter::in_memory(records());
        let results = adapter.search("cơm gà", 10).await.expect("search");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Cơm gà Hội An");
        assert!(matches!(
            results[0].payload,
            ResultPayload::Recipe { servings: None, .. }
        ));
    }

    #[test]
    fn record_with_name_and_title_is_kept() {
        let record: RecipeRecord = serde_json::from_value(
            json!({"id": 7, "name": "Phở bò", "title": "Phở bò tái"}),
        )
        .expect("decode");
        let result = record.into_result().expect("usable");
        assert_eq!(result.title, "Phở bò");

        let record: RecipeRecord =
            serde_json::from_value(json!({"id": 8, "name": " ", "title": "Bún chả"})).expect("decode");
        assert_eq!(record.into_result().expect("usable").title, "Bún chả");
    }

    #[tokio::test]
    async fn no_match_is_empty_success() {
        let adapter = RecipeAdapter::in_memory(records());
        assert!(adapter.search("bún bò", 10).await.expect("search").is_empty());
    }
}
