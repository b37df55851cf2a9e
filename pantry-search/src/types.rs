//! Core types: source kinds, typed search results and result pages.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Backends that pantry-search can query.
///
/// Ordering follows declaration order and is used wherever a deterministic
/// iteration over sources is required (fan-out order, page layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Cooking recipes.
    Recipe,
    /// Foods and ingredients with nutrition values.
    Food,
    /// News articles.
    News,
    /// Registered users.
    User,
}

impl SourceKind {
    /// Returns the wire name of this source.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Recipe => "recipe",
            Self::Food => "food",
            Self::News => "news",
            Self::User => "user",
        }
    }

    /// Returns all available source variants.
    pub fn all() -> &'static [SourceKind] {
        &[Self::Recipe, Self::Food, Self::News, Self::User]
    }

    /// Parse a wire name, accepting a few plural/alias spellings.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "recipe" | "recipes" => Some(Self::Recipe),
            "food" | "foods" | "ingredient" | "ingredients" => Some(Self::Food),
            "news" | "article" | "articles" => Some(Self::News),
            "user" | "users" => Some(Self::User),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Macro-nutrient values of a food, per serving unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

/// Kind-specific part of a [`SearchResult`].
///
/// Serialized inline with the common fields, tagged by `source_kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source_kind", rename_all = "lowercase")]
pub enum ResultPayload {
    Recipe {
        author: Option<String>,
        cook_minutes: Option<u32>,
        servings: Option<u32>,
    },
    Food {
        macros: Macros,
        unit: String,
    },
    News {
        category: Option<String>,
        snippet: String,
    },
    User {
        handle: String,
        email: Option<String>,
    },
}

impl ResultPayload {
    /// The source this payload belongs to.
    pub fn source_kind(&self) -> SourceKind {
        match self {
            Self::Recipe { .. } => SourceKind::Recipe,
            Self::Food { .. } => SourceKind::Food,
            Self::News { .. } => SourceKind::News,
            Self::User { .. } => SourceKind::User,
        }
    }
}

/// A single normalized search result.
///
/// Identity is `(source_kind, id)`. Identical ids from different sources
/// are unrelated records and are never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Backend-native identifier.
    pub id: String,
    /// Display title used for relevance ranking.
    pub title: String,
    /// Optional thumbnail.
    pub image_url: Option<String>,
    /// Kind-specific fields.
    #[serde(flatten)]
    pub payload: ResultPayload,
}

impl SearchResult {
    /// The source this result came from.
    pub fn source_kind(&self) -> SourceKind {
        self.payload.source_kind()
    }

    /// Text fields the ranker matches against, title first.
    pub fn match_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        if let ResultPayload::User { handle, .. } = &self.payload {
            fields.push(handle.as_str());
        }
        fields
    }
}

/// Ranked results grouped by source. Vector order is rank order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultPage {
    sources: BTreeMap<SourceKind, Vec<SearchResult>>,
}

impl ResultPage {
    /// A page with no sources at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Set the ranked list for a source, replacing any previous list.
    pub fn insert(&mut self, kind: SourceKind, results: Vec<SearchResult>) {
        self.sources.insert(kind, results);
    }

    /// Ranked results for `kind`; empty when the source is absent.
    pub fn get(&self, kind: SourceKind) -> &[SearchResult] {
        self.sources.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the page has an entry (possibly empty) for `kind`.
    pub fn contains(&self, kind: SourceKind) -> bool {
        self.sources.contains_key(&kind)
    }

    /// Sources present on this page, in [`SourceKind`] order.
    pub fn kinds(&self) -> impl Iterator<Item = SourceKind> + '_ {
        self.sources.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SourceKind, &[SearchResult])> {
        self.sources.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Total number of results across all sources.
    pub fn total(&self) -> usize {
        self.sources.values().map(Vec::len).sum()
    }

    /// True when no source holds any result.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Per-source failures recorded during one aggregation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FailureReport {
    failures: BTreeMap<SourceKind, SourceError>,
}

impl FailureReport {
    pub fn record(&mut self, kind: SourceKind, error: SourceError) {
        self.failures.insert(kind, error);
    }

    pub fn get(&self, kind: SourceKind) -> Option<&SourceError> {
        self.failures.get(&kind)
    }

    pub fn contains(&self, kind: SourceKind) -> bool {
        self.failures.contains_key(&kind)
    }

    /// Failed sources, in [`SourceKind`] order.
    pub fn kinds(&self) -> Vec<SourceKind> {
        self.failures.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SourceKind, &SourceError)> {
        self.failures.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of one aggregation: the ranked page plus what went wrong.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregation {
    pub page: ResultPage,
    pub failures: FailureReport,
}
