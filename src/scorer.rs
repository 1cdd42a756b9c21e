//! Batch-relative scoring.
//!
//! Each factor is scaled linearly between the minimum and maximum observed in
//! the current batch, so the same price can score differently across runs.
//! The composite is the weighted sum of the sub-scores, capped to 0-30.

use crate::types::{
    Factor, FactorScores, Grade, ListingRecord, ScoredRecord, ScoringProfile,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Upper bound of a single factor's sub-score
pub const MAX_SUB_SCORE: f64 = 10.0;
/// Upper bound of the composite score
pub const MAX_COMPOSITE: f64 = MAX_SUB_SCORE * Factor::ALL.len() as f64;

/// Grade thresholds, highest first
const GRADE_THRESHOLDS: &[(f64, Grade)] = &[
    (28.0, Grade::Outstanding),
    (25.0, Grade::Excellent),
    (20.0, Grade::Good),
    (15.0, Grade::Decent),
    (10.0, Grade::NotGood),
];

/// Observed min/max of one factor within a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorRange {
    pub min: f64,
    pub max: f64,
}

impl FactorRange {
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        values.into_iter().fold(None, |range, value| match range {
            None => Some(FactorRange { min: value, max: value }),
            Some(r) => Some(FactorRange {
                min: r.min.min(value),
                max: r.max.max(value),
            }),
        })
    }

    /// Linear position of `value` in the range, mapped to 0-10.
    /// A degenerate range (every value equal) scores full marks.
    pub fn sub_score(&self, value: f64, lower_is_better: bool) -> f64 {
        if self.max <= self.min {
            return MAX_SUB_SCORE;
        }
        let position = ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0);
        let fraction = if lower_is_better { 1.0 - position } else { position };
        fraction * MAX_SUB_SCORE
    }
}

/// Per-factor ranges of one batch. Unknown values do not widen a range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchRanges {
    ranges: BTreeMap<Factor, FactorRange>,
}

impl BatchRanges {
    pub fn from_records(records: &[ListingRecord]) -> Self {
        let ranges = Factor::ALL
            .into_iter()
            .filter_map(|factor| {
                FactorRange::from_values(records.iter().filter_map(|r| r.factor_value(factor)))
                    .map(|range| (factor, range))
            })
            .collect();
        Self { ranges }
    }

    pub fn get(&self, factor: Factor) -> Option<FactorRange> {
        self.ranges.get(&factor).copied()
    }
}

/// Sub-scores of one record against the batch; unknown values score 0.
pub fn sub_scores(record: &ListingRecord, ranges: &BatchRanges) -> FactorScores {
    let mut scores = FactorScores::default();
    for factor in Factor::ALL {
        let score = match (record.factor_value(factor), ranges.get(factor)) {
            (Some(value), Some(range)) => range.sub_score(value, factor.lower_is_better()),
            _ => 0.0,
        };
        scores.set(factor, score);
    }
    scores
}

/// `Σ(weight × sub-score)`, clamped to 0-30 and rounded to one decimal.
/// All-zero weights give 0.
pub fn composite_score(scores: &FactorScores, profile: &ScoringProfile) -> f64 {
    let weighted: f64 = Factor::ALL
        .iter()
        .map(|factor| profile.weight(*factor) * scores.get(*factor))
        .sum();
    round_score(weighted.clamp(0.0, MAX_COMPOSITE))
}

pub fn round_score(score: f64) -> f64 {
    (score * 10.0).round() / 10.0
}

pub fn assign_grade(score: f64) -> Grade {
    GRADE_THRESHOLDS
        .iter()
        .find(|(threshold, _)| score >= *threshold)
        .map(|(_, grade)| *grade)
        .unwrap_or(Grade::Bad)
}

/// Score a deduplicated batch against one profile, preserving input order.
pub fn score_batch(records: &[ListingRecord], profile: &ScoringProfile) -> Vec<ScoredRecord> {
    let ignored = profile.ignored_factors();
    if !ignored.is_empty() {
        warn!(?ignored, "Profile weights name factors that are not scored");
    }
    if profile.total_weight() <= 0.0 {
        warn!("Profile has no positive weight, every composite will be 0");
    }

    let ranges = BatchRanges::from_records(records);
    debug!(?ranges, records = records.len(), "Computed batch ranges");

    records
        .iter()
        .map(|record| {
            let sub_scores = sub_scores(record, &ranges);
            let score = composite_score(&sub_scores, profile);
            ScoredRecord {
                record: record.clone(),
                sub_scores,
                score,
                grade: assign_grade(score),
            }
        })
        .collect()
}

/// Score the same batch once per profile, keyed by profile name.
pub fn score_profiles(
    records: &[ListingRecord],
    profiles: &BTreeMap<String, ScoringProfile>,
) -> BTreeMap<String, Vec<ScoredRecord>> {
    profiles
        .iter()
        .map(|(name, profile)| (name.clone(), score_batch(records, profile)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn car(id: &str, price: Option<u32>, mileage: Option<u32>, year: Option<i32>) -> ListingRecord {
        ListingRecord {
            id: id.to_string(),
            brand: "Skoda".to_string(),
            model: "Octavia".to_string(),
            price,
            mileage,
            year,
            power_kw: Some(110),
            body_type: None,
            fuel_type: None,
            seats: None,
            image_url: None,
            url: String::new(),
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_price_interpolation() {
        let records = vec![
            car("cheap", Some(10000), Some(50000), Some(2020)),
            car("mid", Some(20000), Some(50000), Some(2020)),
            car("dear", Some(30000), Some(50000), Some(2020)),
        ];
        let scored = score_batch(&records, &ScoringProfile::new(1.0, 1.0, 1.0));

        assert!(approx(scored[0].sub_scores.price, 10.0));
        assert!(approx(scored[1].sub_scores.price, 5.0));
        assert!(approx(scored[2].sub_scores.price, 0.0));
        // constant mileage/year score full marks
        assert!(approx(scored[1].sub_scores.mileage, 10.0));
        assert!(approx(scored[1].sub_scores.year, 10.0));
        assert_eq!(scored.iter().map(|s| s.score).collect::<Vec<_>>(), vec![30.0, 25.0, 20.0]);
        assert_eq!(scored[0].grade, Grade::Outstanding);
        assert_eq!(scored[1].grade, Grade::Excellent);
        assert_eq!(scored[2].grade, Grade::Good);
    }

    #[test]
    fn test_newer_year_scores_higher() {
        let records = vec![
            car("old", Some(10000), Some(1000), Some(2016)),
            car("new", Some(10000), Some(1000), Some(2020)),
        ];
        let scored = score_batch(&records, &ScoringProfile::new(0.0, 0.0, 1.0));
        assert!(approx(scored[0].sub_scores.year, 0.0));
        assert!(approx(scored[1].sub_scores.year, 10.0));
        assert_eq!(scored[0].score, 0.0);
        assert_eq!(scored[1].score, 10.0);
    }

    #[test]
    fn test_zero_weights_score_zero() {
        let records = vec![
            car("a", Some(10000), Some(1000), Some(2020)),
            car("b", Some(12000), Some(2000), Some(2019)),
        ];
        for scored in score_batch(&records, &ScoringProfile::new(0.0, 0.0, 0.0)) {
            assert_eq!(scored.score, 0.0);
            assert_eq!(scored.grade, Grade::Bad);
        }
    }

    #[test]
    fn test_record_missing_all_factors() {
        let records = vec![
            car("known", Some(10000), Some(1000), Some(2020)),
            car("unknown", None, None, None),
        ];
        let scored = score_batch(&records, &ScoringProfile::new(1.0, 1.0, 1.0));
        assert_eq!(scored.len(), 2);
        assert_eq!(scored[1].score, 0.0);
        assert_eq!(scored[1].grade, Grade::Bad);
        // unknown values do not widen the range
        assert_eq!(scored[0].score, 30.0);
    }

    #[test]
    fn test_composite_stays_on_scale_with_large_weights() {
        let records = vec![
            car("a", Some(10000), Some(1000), Some(2021)),
            car("b", Some(15000), Some(9000), Some(2018)),
        ];
        let scored = score_batch(&records, &ScoringProfile::new(4.5, 3.0, 3.0));
        // 4.5*10 + 3*10 + 3*10 caps at 30
        assert_eq!(scored[0].score, MAX_COMPOSITE);
        assert_eq!(scored[0].grade, Grade::Outstanding);
        assert_eq!(scored[1].score, 0.0);
    }

    #[test]
    fn test_single_factor_profile_scores_weighted_sum() {
        let records = vec![
            car("cheap", Some(10000), Some(1000), Some(2020)),
            car("dear", Some(20000), Some(1000), Some(2020)),
        ];
        let scored = score_batch(&records, &ScoringProfile::new(1.0, 0.0, 0.0));
        assert_eq!(scored[0].score, 10.0);
        assert_eq!(scored[0].grade, Grade::NotGood);
        assert_eq!(scored[1].score, 0.0);
    }

    #[test]
    fn test_half_weights_halve_the_composite() {
        let records = vec![
            car("best", Some(10000), Some(1000), Some(2022)),
            car("worst", Some(20000), Some(9000), Some(2018)),
        ];
        let scored = score_batch(&records, &ScoringProfile::new(0.5, 0.5, 0.5));
        assert_eq!(scored[0].score, 15.0);
        assert_eq!(scored[0].grade, Grade::Decent);
        assert_eq!(scored[1].score, 0.0);
    }

    #[test]
    fn test_registration_year_alias() {
        let mut profile = ScoringProfile::default();
        profile.weights.insert("registration_year".to_string(), 2.0);
        let records = vec![car("a", None, None, Some(2018)), car("b", None, None, Some(2022))];
        let scored = score_batch(&records, &profile);
        assert_eq!(scored[1].score, 20.0);
    }

    #[test]
    fn test_assign_grade_thresholds() {
        assert_eq!(assign_grade(30.0), Grade::Outstanding);
        assert_eq!(assign_grade(28.0), Grade::Outstanding);
        assert_eq!(assign_grade(27.9), Grade::Excellent);
        assert_eq!(assign_grade(25.0), Grade::Excellent);
        assert_eq!(assign_grade(24.9), Grade::Good);
        assert_eq!(assign_grade(20.0), Grade::Good);
        assert_eq!(assign_grade(19.0), Grade::Decent);
        assert_eq!(assign_grade(15.0), Grade::Decent);
        assert_eq!(assign_grade(14.5), Grade::NotGood);
        assert_eq!(assign_grade(10.0), Grade::NotGood);
        assert_eq!(assign_grade(9.9), Grade::Bad);
        assert_eq!(assign_grade(0.0), Grade::Bad);
    }

    #[test]
    fn test_factor_range_degenerate() {
        let range = FactorRange::from_values([5.0, 5.0]).unwrap();
        assert_eq!(range.sub_score(5.0, true), MAX_SUB_SCORE);
        assert!(FactorRange::from_values(std::iter::empty()).is_none());
    }

    #[test]
    fn test_score_profiles_independent() {
        let records = vec![
            car("cheap_old", Some(10000), Some(1000), Some(2016)),
            car("dear_new", Some(20000), Some(1000), Some(2022)),
        ];
        let profiles: BTreeMap<String, ScoringProfile> = [
            ("budget".to_string(), ScoringProfile::new(1.0, 0.0, 0.0)),
            ("modern".to_string(), ScoringProfile::new(0.0, 0.0, 1.0)),
        ]
        .into_iter()
        .collect();

        let by_profile = score_profiles(&records, &profiles);
        assert_eq!(by_profile["budget"][0].score, 10.0);
        assert_eq!(by_profile["budget"][1].score, 0.0);
        assert_eq!(by_profile["modern"][0].score, 0.0);
        assert_eq!(by_profile["modern"][1].score, 10.0);
    }
}
