//! Tiered relevance ranking for one source's candidates.
//!
//! Every candidate gets a [`MatchTier`] computed against the normalized
//! query:
//!
//! ```text
//! Exact      folded title == query
//! Prefix     folded title starts with query
//! Contains   folded title contains query
//! AllTokens  every query token appears somewhere in the folded title
//! ```
//!
//! Candidates are sorted by tier, then by their original backend order
//! (the sort is stable). Candidates with no tier are excluded.

use crate::query::normalize_text;
use crate::types::SearchResult;

/// Match quality of a candidate; lower sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchTier {
    Exact,
    Prefix,
    Contains,
    AllTokens,
}

/// Classify `candidate` text against an already-normalized `query`.
///
/// Returns `None` when the candidate does not match at all or the query is
/// blank.
pub fn classify(candidate: &str, query: &str) -> Option<MatchTier> {
    if query.is_empty() {
        return None;
    }
    let folded = normalize_text(candidate);
    if folded == query {
        Some(MatchTier::Exact)
    } else if folded.starts_with(query) {
        Some(MatchTier::Prefix)
    } else if folded.contains(query) {
        Some(MatchTier::Contains)
    } else if query
        .split_whitespace()
        .all(|token| folded.contains(token))
    {
        Some(MatchTier::AllTokens)
    } else {
        None
    }
}

/// Best tier over all of a result's match fields.
pub fn tier_of(result: &SearchResult, query: &str) -> Option<MatchTier> {
    result
        .match_fields()
        .into_iter()
        .filter_map(|field| classify(field, query))
        .min()
}

/// Order candidates by tier, keeping backend order within a tier, and drop
/// candidates that match no tier.
pub fn rank(results: Vec<SearchResult>, query: &str) -> Vec<SearchResult> {
    let mut tiered: Vec<(MatchTier, SearchResult)> = results
        .into_iter()
        .filter_map(|result| tier_of(&result, query).map(|tier| (tier, result)))
        .collect();
    tiered.sort_by_key(|(tier, _)| *tier);
    tiered.into_iter().map(|(_, result)| result).collect()
}

/// [`rank`] followed by truncation to `limit`.
pub fn rank_and_cap(results: Vec<SearchResult>, query: &str, limit: usize) -> Vec<SearchResult> {
    let mut ranked = rank(results, query);
    ranked.truncate(limit);
    ranked
}
