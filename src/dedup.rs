//! Listing Deduplication Module
//!
//! The same search is scraped once per sort order (standard, price, age), so
//! a car usually shows up in several sets. Records sharing a canonical
//! identifier collapse to the first one seen, in set order then row order.
//! Exclusions are applied to the unique records afterwards.

use crate::filter::apply_exclusions;
use crate::types::{ExclusionSet, ListingRecord};
use serde::Serialize;
use std::collections::HashSet;
use tracing::info;

/// Deduplication result counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeduplicationStats {
    pub total_input: usize,
    pub unique_output: usize,
    pub duplicates_removed: usize,
    pub excluded: usize,
}

/// Collapse records with the same identifier, keeping the first occurrence.
pub fn deduplicate(sets: Vec<Vec<ListingRecord>>) -> Vec<ListingRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    sets.into_iter()
        .flatten()
        .filter(|record| seen.insert(record.id.clone()))
        .collect()
}

/// Deduplicate across all sort-order sets, then drop excluded brand/model pairs.
pub fn deduplicate_with_stats(
    sets: Vec<Vec<ListingRecord>>,
    exclusions: &ExclusionSet,
) -> (Vec<ListingRecord>, DeduplicationStats) {
    let total_input = sets.iter().map(Vec::len).sum();
    let unique = deduplicate(sets);
    let duplicates_removed = total_input - unique.len();
    let (kept, excluded) = apply_exclusions(unique, exclusions);

    let stats = DeduplicationStats {
        total_input,
        unique_output: kept.len(),
        duplicates_removed,
        excluded,
    };
    info!(
        total_input = stats.total_input,
        unique = stats.unique_output,
        duplicates = stats.duplicates_removed,
        excluded = stats.excluded,
        "Deduplicated listing sets"
    );
    (kept, stats)
}
