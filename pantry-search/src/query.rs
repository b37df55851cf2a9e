//! Normalized search queries.

use std::collections::BTreeSet;

use crate::types::SourceKind;

/// A normalized query: trimmed, case-folded text plus the sources to ask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    requested_sources: BTreeSet<SourceKind>,
}

impl Query {
    /// Build a query from raw caller input.
    pub fn new(raw: &str, sources: impl IntoIterator<Item = SourceKind>) -> Self {
        Self {
            text: normalize_text(raw),
            requested_sources: sources.into_iter().collect(),
        }
    }

    /// Build a query against every known source.
    pub fn all_sources(raw: &str) -> Self {
        Self::new(raw, SourceKind::all().iter().copied())
    }

    /// The trimmed, lowercased text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Blank queries never reach an adapter.
    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }

    pub fn requested_sources(&self) -> &BTreeSet<SourceKind> {
        &self.requested_sources
    }

    /// Whitespace-separated tokens of the normalized text.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.text.split_whitespace()
    }
}

/// Trim and case-fold raw input.
pub fn normalize_text(raw: &str) -> String {
    raw.trim().to_lowercase()
}
