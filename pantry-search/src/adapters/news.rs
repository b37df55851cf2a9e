//! News article source.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::adapter::SourceAdapter;
use crate::error::SourceError;
use crate::orchestrator::normalize::{non_blank, string_or_number, NativeRecord};
use crate::store::{MatchPolicy, MemoryStore, RecordStore};
use crate::types::{ResultPayload, SearchResult, SourceKind};

/// Maximum snippet length in characters.
const SNIPPET_CHARS: usize = 160;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "body", alias = "description")]
    pub content: Option<String>,
}

impl NativeRecord for NewsRecord {
    fn into_result(self) -> Option<SearchResult> {
        let title = non_blank(Some(self.title))?;
        Some(SearchResult {
            id: self.id,
            title,
            image_url: non_blank(self.image_url),
            payload: ResultPayload::News {
                category: non_blank(self.category),
                snippet: self.content.as_deref().map(snippet).unwrap_or_default(),
            },
        })
    }
}

/// Collapse whitespace and cut to [`SNIPPET_CHARS`] characters.
pub fn snippet(content: &str) -> String {
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= SNIPPET_CHARS {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(SNIPPET_CHARS).collect();
    cut.truncate(cut.trim_end().len());
    cut.push('…');
    cut
}

pub struct NewsAdapter {
    store: Arc<dyn RecordStore>,
}

impl NewsAdapter {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Adapter over in-memory records, matched by title substring.
    pub fn in_memory(records: Vec<serde_json::Value>) -> Self {
        Self::new(Arc::new(
            MemoryStore::new(
                super::usable_records::<NewsRecord>(SourceKind::News, records),
                MatchPolicy::Substring,
            )
            .match_fields(["title"]),
        ))
    }
}

#[async_trait]
impl SourceAdapter for NewsAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::News
    }

    async fn search(&self, text: &str, limit: usize) -> Result<Vec<SearchResult>, SourceError> {
        super::fetch_normalized::<NewsRecord>(self.store.as_ref(), SourceKind::News, text, limit)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn short_content_is_kept_whole() {
        assert_eq!(snippet("  Ăn   sáng\nđủ chất "), "Ăn sáng đủ chất");
    }

    #[test]
    fn long_content_is_cut_on_char_boundary() {
        let long = "ờ".repeat(400);
        let cut = snippet(&long);
        assert_eq!(cut.chars().count(), SNIPPET_CHARS + 1);
        assert!(cut.ends_with('…'));
    }

    #[tokio::test]
    async fn substring_search_builds_snippets() {
        let adapter = NewsAdapter::in_memory(vec![
            json!({"id": 11, "title": "Lợi ích của rau xanh", "category": "health", "body": "Rau xanh giàu chất xơ."}),
            json!({"id": 12, "title": "Giá rau tăng mạnh", "category": " "}),
            json!({"id": 13, "title": "Thời tiết hôm nay"}),
        ]);
        let results = adapter.search("rau", 10).await.expect("search");
        assert_eq!(results.len(), 2);
        match &results[0].payload {
            ResultPayload::News { category, snippet } => {
                assert_eq!(category.as_deref(), Some("health"));
                assert_eq!(snippet, "Rau xanh giàu chất xơ.");
            }
            other => panic!("unexpected payload {other:?}"),
        }
        assert!(matches!(
            &results[1].payload,
            ResultPayload::News { category: None, snippet } if snippet.is_empty()
        ));
    }
}
