//! Settings Module
//!
//! `settings.json` holds everything a run needs:
//! - `filters`: marketplace search filters, in marketplace codes
//! - `num_pages`: result pages to scrape per sort order
//! - `scoring_profiles`: named weight sets
//! - `excluded_cars`: brand -> models to drop
//!
//! The dashboard edits filters with readable labels; the helpers at the
//! bottom translate between the two vocabularies.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::normalize::HP_PER_KW;
use crate::types::{ExclusionSet, ScoringProfile};

const SETTINGS_FILE: &str = "settings.json";

/// Marketplace body type codes
const BODY_LABELS: &[(&str, &str)] = &[
    ("1", "Compact"),
    ("2", "Convertible"),
    ("3", "Coupe"),
    ("4", "Off-Road/Pick-up"),
    ("5", "Station wagon"),
    ("6", "Sedan"),
    ("7", "Van"),
    ("12", "Transporter"),
    ("13", "Other"),
];

/// Marketplace fuel type codes
const FUEL_LABELS: &[(&str, &str)] = &[
    ("B", "Gasoline"),
    ("D", "Diesel"),
    ("E", "Electric"),
    ("L", "LPG"),
    ("C", "CNG"),
    ("2", "Electric/Gasoline"),
    ("3", "Electric/Diesel"),
    ("H", "Hydrogen"),
    ("O", "Others"),
];

/// A filter is either a single code or a list of codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    One(String),
    Many(Vec<String>),
}

impl FilterValue {
    fn map(&self, f: impl Fn(&str) -> String) -> FilterValue {
        match self {
            FilterValue::One(value) => FilterValue::One(f(value)),
            FilterValue::Many(values) => FilterValue::Many(values.iter().map(|v| f(v)).collect()),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::One(value.to_string())
    }
}

impl From<&[&str]> for FilterValue {
    fn from(values: &[&str]) -> Self {
        FilterValue::Many(values.iter().map(|v| v.to_string()).collect())
    }
}

pub type Filters = BTreeMap<String, FilterValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_filters")]
    pub filters: Filters,
    #[serde(default = "default_num_pages")]
    pub num_pages: u32,
    #[serde(default = "default_scoring_profiles")]
    pub scoring_profiles: BTreeMap<String, ScoringProfile>,
    #[serde(default = "ExclusionSet::defaults")]
    pub excluded_cars: ExclusionSet,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            filters: default_filters(),
            num_pages: default_num_pages(),
            scoring_profiles: default_scoring_profiles(),
            excluded_cars: ExclusionSet::defaults(),
        }
    }
}

/// Makes the search is restricted to
const DEFAULT_BRANDS: &[&str] = &[
    "Volkswagen", "Mazda", "MG", "Tesla", "Land Rover", "Peugeot", "Fiat", "Citroen",
    "Chevrolet", "SEAT", "Daihatsu", "Porsche", "Jaguar", "Dacia", "Opel", "Volvo", "Ford",
    "Alfa Romeo", "Lotus", "Jeep", "Suzuki", "Hyundai", "Maserati", "Toyota", "BMW",
    "Renault", "Nissan", "Skoda", "MINI", "Kia", "Audi", "CUPRA", "Subaru", "Lancia",
    "Polestar", "Mercedes-Benz", "Mitsubishi", "Lexus",
];

fn default_filters() -> Filters {
    let pairs: [(&str, FilterValue); 14] = [
        ("brands", DEFAULT_BRANDS.into()),
        ("body", (&["2", "3", "4", "5", "6"][..]).into()),
        ("custtype", "D".into()), // dealer
        ("country", "D".into()),
        ("emclass", "5".into()),
        ("ensticker", "4".into()),
        ("eq", (&["37"][..]).into()),
        ("min_year", "2020".into()),
        ("kmto", "100000".into()),
        ("min_power", "74".into()), // kW
        ("max_price", "20000".into()),
        ("min_seats", "4".into()),
        ("fuel", (&["2", "3", "B", "D"][..]).into()),
        ("sort", "standard".into()),
    ];
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn default_num_pages() -> u32 {
    2
}

fn default_scoring_profiles() -> BTreeMap<String, ScoringProfile> {
    BTreeMap::from([("standard".to_string(), ScoringProfile::new(1.0, 1.0, 1.0))])
}

pub fn settings_path(root: &str) -> PathBuf {
    PathBuf::from(root).join(SETTINGS_FILE)
}

impl Settings {
    /// Load settings; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "No settings file, using defaults");
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(
            path = %path.display(),
            profiles = settings.scoring_profiles.len(),
            "Loaded settings"
        );
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write settings to {:?}", path))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_pages == 0 {
            return Err(ConfigError::InvalidPages(self.num_pages));
        }
        if self.scoring_profiles.is_empty() {
            return Err(ConfigError::NoProfiles);
        }
        for (name, profile) in &self.scoring_profiles {
            profile.validate(name)?;
        }
        Ok(())
    }

    pub fn profile(&self, name: &str) -> Result<&ScoringProfile, ConfigError> {
        self.scoring_profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))
    }

    /// Filters with codes replaced by labels and power in hp.
    pub fn filters_for_frontend(&self) -> Filters {
        to_frontend_filters(&self.filters)
    }

    /// Replace the filters with a frontend (label/hp) filter set.
    pub fn apply_frontend_filters(&mut self, frontend: &Filters) {
        self.filters = from_frontend_filters(frontend);
    }
}

// ============================================
// Frontend label mapping
// ============================================

pub fn to_frontend_filters(filters: &Filters) -> Filters {
    filters
        .iter()
        .map(|(key, value)| {
            let mapped = match key.as_str() {
                "body" => value.map(|code| lookup(BODY_LABELS, code, false)),
                "fuel" => value.map(|code| lookup(FUEL_LABELS, code, false)),
                "min_power" => value.map(|kw| convert_power(kw, |kw| kw * HP_PER_KW)),
                _ => value.clone(),
            };
            (key.clone(), mapped)
        })
        .collect()
}

pub fn from_frontend_filters(filters: &Filters) -> Filters {
    filters
        .iter()
        .map(|(key, value)| {
            let mapped = match key.as_str() {
                "body" => value.map(|label| lookup(BODY_LABELS, label, true)),
                "fuel" => value.map(|label| lookup(FUEL_LABELS, label, true)),
                "min_power" => value.map(|hp| convert_power(hp, |hp| hp / HP_PER_KW)),
                _ => value.clone(),
            };
            (key.clone(), mapped)
        })
        .collect()
}

/// Code -> label, or label -> code when `reverse`. Unknown values pass through.
fn lookup(table: &[(&str, &str)], value: &str, reverse: bool) -> String {
    table
        .iter()
        .find(|(code, label)| {
            if reverse {
                label.eq_ignore_ascii_case(value)
            } else {
                *code == value
            }
        })
        .map(|(code, label)| if reverse { code } else { label })
        .unwrap_or(&value)
        .to_string()
}

fn convert_power(value: &str, convert: impl Fn(f64) -> f64) -> String {
    match value.trim().parse::<f64>() {
        Ok(power) => format!("{}", convert(power).round() as i64),
        Err(_) => value.to_string(),
    }
}
