//! Ranking Pipeline
//!
//! Raw listing sets in, ranked shortlist out:
//! - Normalize every set
//! - Deduplicate across sets and drop excluded models
//! - Score against a profile
//! - Rank and truncate
//!
//! Configuration is passed in explicitly; nothing here reads files or env.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::dedup::{deduplicate_with_stats, DeduplicationStats};
use crate::error::ConfigError;
use crate::normalize::normalize_listings;
use crate::scorer::score_batch;
use crate::settings::Settings;
use crate::sorter::{rank, RankOptions};
use crate::types::{ExclusionSet, ListingRecord, RawListing, ScoredRecord, ScoringProfile};

/// Result of ranking one profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRun {
    pub profile: String,
    pub stats: DeduplicationStats,
    pub ranked: Vec<ScoredRecord>,
}

/// Normalize and deduplicate the raw sets into the batch every profile scores.
pub fn prepare_batch(
    raw_sets: &[Vec<RawListing>],
    exclusions: &ExclusionSet,
) -> (Vec<ListingRecord>, DeduplicationStats) {
    let sets = raw_sets.iter().map(|set| normalize_listings(set)).collect();
    deduplicate_with_stats(sets, exclusions)
}

/// Rank a prepared batch against one profile.
pub fn rank_batch(
    batch: &[ListingRecord],
    stats: DeduplicationStats,
    profile_name: &str,
    profile: &ScoringProfile,
    options: &RankOptions,
) -> Result<RankedRun, ConfigError> {
    profile.validate(profile_name)?;

    let ranked = rank(score_batch(batch, profile), options);
    info!(
        profile = profile_name,
        scored = batch.len(),
        ranked = ranked.len(),
        top_score = ranked.first().map(|s| s.score),
        "Ranked listings"
    );

    Ok(RankedRun {
        profile: profile_name.to_string(),
        stats,
        ranked,
    })
}

pub fn rank_listings(
    raw_sets: &[Vec<RawListing>],
    profile_name: &str,
    profile: &ScoringProfile,
    exclusions: &ExclusionSet,
    options: &RankOptions,
) -> Result<RankedRun, ConfigError> {
    let (batch, stats) = prepare_batch(raw_sets, exclusions);
    rank_batch(&batch, stats, profile_name, profile, options)
}

/// Rank one named profile from the settings.
pub fn rank_profile(
    raw_sets: &[Vec<RawListing>],
    settings: &Settings,
    profile_name: &str,
    options: &RankOptions,
) -> Result<RankedRun, ConfigError> {
    let profile = settings.profile(profile_name)?;
    rank_listings(raw_sets, profile_name, profile, &settings.excluded_cars, options)
}

/// Rank every configured profile; the batch is prepared once.
pub fn rank_all_profiles(
    raw_sets: &[Vec<RawListing>],
    settings: &Settings,
    options: &RankOptions,
) -> Result<BTreeMap<String, RankedRun>, ConfigError> {
    settings.validate()?;
    let (batch, stats) = prepare_batch(raw_sets, &settings.excluded_cars);

    settings
        .scoring_profiles
        .iter()
        .map(|(name, profile)| {
            rank_batch(&batch, stats.clone(), name, profile, options).map(|run| (name.clone(), run))
        })
        .collect()
}
