use crate::types::ScoredRecord;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Default size of the shortlist shown on the dashboard and in emails
pub const DEFAULT_TOP_N: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankOptions {
    pub top_n: usize,
    /// Keep only the best listing per brand + model
    pub distinct_models: bool,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            distinct_models: false,
        }
    }
}

/// Sort by composite score (descending). `sort_by` is stable, so equal
/// scores keep their deduplicated order.
pub fn sort_by_score(records: &mut [ScoredRecord]) {
    records.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

/// Sort, optionally collapse to one listing per model, and truncate.
pub fn rank(mut records: Vec<ScoredRecord>, options: &RankOptions) -> Vec<ScoredRecord> {
    sort_by_score(&mut records);

    if options.distinct_models {
        let mut seen: HashSet<(String, String)> = HashSet::new();
        records.retain(|scored| {
            seen.insert((
                scored.record.brand.to_lowercase(),
                scored.record.model.to_lowercase(),
            ))
        });
    }

    records.truncate(options.top_n);
    records
}
