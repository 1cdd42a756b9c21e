use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ConfigError;

/// One scraped listing as handed over by the scraper: column name -> cell text.
///
/// Keys are stored trimmed and lowercased so lookups do not depend on how the
/// scraper spelled its headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawListing {
    fields: BTreeMap<String, String>,
}

impl RawListing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.fields.insert(key.trim().to_lowercase(), value.into());
    }

    /// First non-blank value among `keys`, in the order given.
    pub fn get(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|key| self.fields.get(*key))
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for RawListing {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut listing = RawListing::new();
        for (key, value) in iter {
            listing.insert(key.as_ref(), value);
        }
        listing
    }
}

/// A listing after normalization. Numeric fields use `None` for "unknown".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    /// Canonical identifier used for deduplication
    pub id: String,
    pub brand: String,
    pub model: String,
    pub price: Option<u32>,
    pub mileage: Option<u32>,
    pub year: Option<i32>,
    pub power_kw: Option<u32>,
    pub body_type: Option<String>,
    pub fuel_type: Option<String>,
    pub seats: Option<u8>,
    pub image_url: Option<String>,
    pub url: String,
}

impl ListingRecord {
    /// Listing URL, or the identifier when the scrape carried no URL.
    pub fn link(&self) -> &str {
        if self.url.is_empty() {
            &self.id
        } else {
            &self.url
        }
    }

    /// Numeric value of a scoring factor, if known.
    pub fn factor_value(&self, factor: Factor) -> Option<f64> {
        match factor {
            Factor::Price => self.price.map(f64::from),
            Factor::Mileage => self.mileage.map(f64::from),
            Factor::Year => self.year.map(f64::from),
        }
    }
}

/// Factors the scorer knows how to rank on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Factor {
    Price,
    Mileage,
    Year,
}

impl Factor {
    pub const ALL: [Factor; 3] = [Factor::Price, Factor::Mileage, Factor::Year];

    pub fn as_str(&self) -> &'static str {
        match self {
            Factor::Price => "price",
            Factor::Mileage => "mileage",
            Factor::Year => "year",
        }
    }

    /// Names accepted in a profile's weight map, canonical name first.
    pub fn names(&self) -> &'static [&'static str] {
        match self {
            Factor::Price => &["price"],
            Factor::Mileage => &["mileage"],
            Factor::Year => &["year", "registration_year"],
        }
    }

    pub fn from_name(name: &str) -> Option<Factor> {
        let name = name.trim().to_lowercase();
        Factor::ALL
            .into_iter()
            .find(|factor| factor.names().contains(&name.as_str()))
    }

    /// Cheaper cars and lower mileage are better; newer years are better.
    pub fn lower_is_better(&self) -> bool {
        !matches!(self, Factor::Year)
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named weight configuration, persisted as `{"weights": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringProfile {
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
}

impl ScoringProfile {
    pub fn new(price: f64, mileage: f64, year: f64) -> Self {
        let weights = [("price", price), ("mileage", mileage), ("year", year)]
            .into_iter()
            .map(|(name, weight)| (name.to_string(), weight))
            .collect();
        Self { weights }
    }

    /// Weight for a factor; a missing entry counts as zero.
    pub fn weight(&self, factor: Factor) -> f64 {
        factor
            .names()
            .iter()
            .find_map(|name| self.weights.get(*name))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn total_weight(&self) -> f64 {
        Factor::ALL.iter().map(|factor| self.weight(*factor)).sum()
    }

    /// Weight keys that do not name a scored factor.
    pub fn ignored_factors(&self) -> Vec<&str> {
        self.weights
            .keys()
            .map(|name| name.as_str())
            .filter(|name| Factor::from_name(name).is_none())
            .collect()
    }

    pub fn validate(&self, profile: &str) -> Result<(), ConfigError> {
        for (factor, weight) in &self.weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    profile: profile.to_string(),
                    factor: factor.clone(),
                    weight: *weight,
                });
            }
        }
        Ok(())
    }
}

/// Brand -> excluded model names. Matching is case-insensitive (see `filter`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusionSet {
    pub models: BTreeMap<String, Vec<String>>,
}

/// Qualitative label derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    Outstanding,
    Excellent,
    Good,
    Decent,
    #[serde(rename = "Not Good")]
    NotGood,
    Bad,
}

impl Grade {
    pub fn label(&self) -> &'static str {
        match self {
            Grade::Outstanding => "Outstanding",
            Grade::Excellent => "Excellent",
            Grade::Good => "Good",
            Grade::Decent => "Decent",
            Grade::NotGood => "Not Good",
            Grade::Bad => "Bad",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-factor sub-scores on the 0-10 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorScores {
    pub price: f64,
    pub mileage: f64,
    pub year: f64,
}

impl FactorScores {
    pub fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Price => self.price,
            Factor::Mileage => self.mileage,
            Factor::Year => self.year,
        }
    }

    pub fn set(&mut self, factor: Factor, value: f64) {
        match factor {
            Factor::Price => self.price = value,
            Factor::Mileage => self.mileage = value,
            Factor::Year => self.year = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub record: ListingRecord,
    pub sub_scores: FactorScores,
    /// Composite on the 0-30 scale, rounded to one decimal
    pub score: f64,
    pub grade: Grade,
}

/// Display/archive row shared by the HTML table and the best-cars archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarRow {
    pub brand: String,
    pub model: String,
    pub price: Option<u32>,
    pub mileage: Option<u32>,
    pub year: Option<i32>,
    pub power: Option<u32>,
    pub score: f64,
    pub grade: Grade,
    pub url: String,
    pub img_url: Option<String>,
}

impl From<&ScoredRecord> for CarRow {
    fn from(scored: &ScoredRecord) -> Self {
        let record = &scored.record;
        CarRow {
            brand: record.brand.clone(),
            model: record.model.clone(),
            price: record.price,
            mileage: record.mileage,
            year: record.year,
            power: record.power_kw,
            score: scored.score,
            grade: scored.grade,
            url: record.link().to_string(),
            img_url: record.image_url.clone(),
        }
    }
}
