use crate::types::{ExclusionSet, ListingRecord};
use std::collections::BTreeMap;

// ============================================
// Default exclusions
// ============================================

/// Models that never make the shortlist, keyed by brand.
const DEFAULT_EXCLUDED: &[(&str, &[&str])] = &[
    ("volkswagen", &["caddy", "taigo"]),
    ("opel", &["astra", "corsa", "grandland x", "grandland", "crossland x", "crossland", "mokka"]),
    ("ford", &["puma", "fiesta"]),
    ("skoda", &["scala", "fabia"]),
    ("hyundai", &["kona", "i20", "nexo"]),
    ("toyota", &["c-hr"]),
    ("bmw", &["118"]),
    ("peugeot", &["208", "308"]),
    ("nissan", &["micra", "juke"]),
    ("renault", &["zoe", "clio"]),
    ("citroen", &["c3"]),
    ("kia", &["rio", "niro"]),
    ("dacia", &["logan", "sandero"]),
    ("seat", &["ibiza"]),
];

impl ExclusionSet {
    pub fn new(models: BTreeMap<String, Vec<String>>) -> Self {
        Self { models }
    }

    pub fn defaults() -> Self {
        DEFAULT_EXCLUDED
            .iter()
            .map(|(brand, models)| (*brand, models.iter().copied()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.models.values().all(|models| models.is_empty())
    }

    /// Case-insensitive brand + model match.
    pub fn is_excluded(&self, brand: &str, model: &str) -> bool {
        let brand = normalize_name(brand);
        let model = normalize_name(model);
        self.models
            .iter()
            .filter(|(excluded_brand, _)| normalize_name(excluded_brand) == brand)
            .flat_map(|(_, models)| models.iter())
            .any(|excluded_model| normalize_name(excluded_model) == model)
    }

    pub fn excludes(&self, record: &ListingRecord) -> bool {
        self.is_excluded(&record.brand, &record.model)
    }
}

impl<'a, M> FromIterator<(&'a str, M)> for ExclusionSet
where
    M: IntoIterator<Item = &'a str>,
{
    fn from_iter<I: IntoIterator<Item = (&'a str, M)>>(iter: I) -> Self {
        let mut models: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (brand, brand_models) in iter {
            models
                .entry(brand.to_string())
                .or_default()
                .extend(brand_models.into_iter().map(str::to_string));
        }
        Self { models }
    }
}

/// Drop excluded records, returning the survivors and how many were dropped.
pub fn apply_exclusions(
    records: Vec<ListingRecord>,
    exclusions: &ExclusionSet,
) -> (Vec<ListingRecord>, usize) {
    if exclusions.is_empty() {
        return (records, 0);
    }
    let before = records.len();
    let kept: Vec<ListingRecord> = records
        .into_iter()
        .filter(|record| !exclusions.excludes(record))
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

/// Normalize text for comparison (lowercase, collapse whitespace)
fn normalize_name(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
