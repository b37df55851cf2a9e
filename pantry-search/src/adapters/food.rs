//! Food / ingredient source — nutrition database entries.
//!
//! Foods are looked up by name prefix, the way a sorted name index is
//! range-scanned, and carry macro-nutrient values per serving unit.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::adapter::SourceAdapter;
use crate::error::SourceError;
use crate::orchestrator::normalize::{non_blank, string_or_number, NativeRecord};
use crate::store::{MatchPolicy, MemoryStore, RecordStore};
use crate::types::{Macros, ResultPayload, SearchResult, SourceKind};

/// Food record as stored by the nutrition backend.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
    #[serde(default, alias = "kcal")]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default, alias = "lipid")]
    pub fat: f64,
    #[serde(default, alias = "carb", alias = "carbohydrate")]
    pub carbs: f64,
    #[serde(default)]
    pub unit: Option<String>,
}

impl NativeRecord for FoodRecord {
    fn into_result(self) -> Option<SearchResult> {
        let title = non_blank(Some(self.name))?;
        let macros = Macros {
            calories: self.calories,
            protein: self.protein,
            fat: self.fat,
            carbs: self.carbs,
        };
        // Negative nutrition values mean a corrupt record.
        if [macros.calories, macros.protein, macros.fat, macros.carbs]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return None;
        }
        Some(SearchResult {
            id: self.id,
            title,
            image_url: non_blank(self.image_url),
            payload: ResultPayload::Food {
                macros,
                unit: non_blank(self.unit).unwrap_or_else(|| "100g".to_owned()),
            },
        })
    }
}

/// Adapter for the food backend.
pub struct FoodAdapter {
    store: Arc<dyn RecordStore>,
}

impl FoodAdapter {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Adapter over in-memory records, matched by name prefix.
    pub fn in_memory(records: Vec<serde_json::Value>) -> Self {
        Self::new(Arc::new(
            MemoryStore::new(
                super::usable_records::<FoodRecord>(SourceKind::Food, records),
                MatchPolicy::Prefix,
            )
            .match_fields(["name"]),
        ))
    }
}

#[async_trait]
impl SourceAdapter for FoodAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Food
    }

    async fn search(&self, text: &str, limit: usize) -> Result<Vec<SearchResult>, SourceError> {
        super::fetch_normalized::<FoodRecord>(self.store.as_ref(), SourceKind::Food, text, limit)
            .await
    }
}
