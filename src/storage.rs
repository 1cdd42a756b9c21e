use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{Grade, RawListing, ScoredRecord};

/// Directory holding one scrape result file per sort order
pub const RESULTS_DIR: &str = "data/results";

/// Sort orders the scraper runs the same search with
pub const SORT_METHODS: &[&str] = &["standard", "price", "age"];

/// One row of the ranked export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRow {
    pub brand: String,
    pub model: String,
    pub price: Option<u32>,
    pub mileage: Option<u32>,
    pub year: Option<i32>,
    pub power: Option<u32>,
    pub score: f64,
    pub grade: Grade,
    pub link: String,
}

impl From<&ScoredRecord> for RankedRow {
    fn from(scored: &ScoredRecord) -> Self {
        let record = &scored.record;
        RankedRow {
            brand: record.brand.clone(),
            model: record.model.clone(),
            price: record.price,
            mileage: record.mileage,
            year: record.year,
            power: record.power_kw,
            score: scored.score,
            grade: scored.grade,
            link: record.link().to_string(),
        }
    }
}

pub fn results_dir(root: &str) -> PathBuf {
    PathBuf::from(root).join(RESULTS_DIR)
}

pub fn listing_set_path(root: &str, sort_method: &str) -> PathBuf {
    results_dir(root).join(format!("filtered_cars_{}.csv", sort_method))
}

pub fn ranked_csv_path(root: &str, profile: &str) -> PathBuf {
    results_dir(root).join(format!("ranked_{}.csv", profile))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    Ok(())
}

/// Load one raw listing set per sort method, in the order given.
///
/// A sort method without a result file contributes an empty set.
pub fn load_listing_sets(root: &str, sort_methods: &[&str]) -> Result<Vec<Vec<RawListing>>> {
    let mut sets = Vec::with_capacity(sort_methods.len());
    for sort_method in sort_methods {
        let path = listing_set_path(root, sort_method);
        if !path.exists() {
            warn!(sort_method, path = %path.display(), "No scrape results for sort method");
            sets.push(Vec::new());
            continue;
        }
        let rows = read_raw_listings(&path)?;
        info!(sort_method, rows = rows.len(), "Loaded scrape results");
        sets.push(rows);
    }
    Ok(sets)
}

/// Read scraped rows from CSV, keyed by header.
pub fn read_raw_listings(path: &Path) -> Result<Vec<RawListing>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open listings {:?}", path))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {:?}", path))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to read row from {:?}", path))?;
        let row: RawListing = headers.iter().zip(record.iter()).collect();
        if !row.is_empty() {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Write scraped rows to CSV. Columns are the union of all row keys,
/// in first-seen order.
pub fn write_raw_listings(path: &Path, rows: &[RawListing]) -> Result<()> {
    ensure_parent(path)?;

    let mut seen: HashSet<&str> = HashSet::new();
    let columns: Vec<&str> = rows
        .iter()
        .flat_map(|row| row.iter().map(|(key, _)| key))
        .filter(|key| seen.insert(*key))
        .collect();

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create listings {:?}", path))?;
    writer.write_record(&columns)?;
    for row in rows {
        let cells: Vec<&str> = columns
            .iter()
            .map(|column| row.get(&[*column]).unwrap_or_default())
            .collect();
        writer.write_record(&cells)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the ranked list with the fixed export columns.
pub fn write_ranked_csv(path: &Path, ranked: &[ScoredRecord]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create ranked export {:?}", path))?;
    if ranked.is_empty() {
        writer.write_record(RANKED_COLUMNS)?;
    }
    for scored in ranked {
        writer
            .serialize(RankedRow::from(scored))
            .context("Failed to serialize ranked row")?;
    }
    writer.flush()?;
    Ok(())
}

const RANKED_COLUMNS: &[&str] = &[
    "brand", "model", "price", "mileage", "year", "power", "score", "grade", "link",
];

pub fn read_ranked_csv(path: &Path) -> Result<Vec<RankedRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open ranked export {:?}", path))?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row.with_context(|| format!("Failed to parse ranked row in {:?}", path))?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CarRow, FactorScores, ListingRecord};

    fn temp_root(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("car_scout_storage_{}_{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn raw(pairs: &[(&str, &str)]) -> RawListing {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_raw_listings_round_trip() {
        let root = temp_root("raw");
        let path = root.join("cars.csv");
        let rows = vec![
            raw(&[("make", "Skoda"), ("model", "Superb"), ("price", "€ 19.500,-")]),
            raw(&[("make", "Mazda"), ("model", "6"), ("url", "https://x.com/o/2")]),
        ];

        write_raw_listings(&path, &rows).unwrap();
        let loaded = read_raw_listings(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].get(&["price"]), Some("€ 19.500,-"));
        assert_eq!(loaded[0].get(&["url"]), None);
        assert_eq!(loaded[1].get(&["url"]), Some("https://x.com/o/2"));
        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_missing_sort_method_is_empty_set() {
        let root = temp_root("sets");
        let root_str = root.to_str().unwrap();
        write_raw_listings(
            &listing_set_path(root_str, "price"),
            &[raw(&[("id", "L1"), ("make", "Kia")])],
        )
        .unwrap();

        let sets = load_listing_sets(root_str, SORT_METHODS).unwrap();
        assert_eq!(sets.len(), 3);
        assert!(sets[0].is_empty());
        assert_eq!(sets[1].len(), 1);
        assert!(sets[2].is_empty());
        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_ranked_csv_columns() {
        let root = temp_root("ranked");
        let path = root.join("ranked.csv");
        let ranked = vec![ScoredRecord {
            record: ListingRecord {
                id: "L1".to_string(),
                brand: "Toyota".to_string(),
                model: "Camry".to_string(),
                price: Some(19990),
                mileage: None,
                year: Some(2021),
                power_kw: Some(131),
                body_type: None,
                fuel_type: None,
                seats: None,
                image_url: None,
                url: "https://x.com/o/1".to_string(),
            },
            sub_scores: FactorScores::default(),
            score: 14.5,
            grade: Grade::NotGood,
        }];

        write_ranked_csv(&path, &ranked).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("brand,model,price,mileage,year,power,score,grade,link"));
        assert_eq!(lines.next(), Some("Toyota,Camry,19990,,2021,131,14.5,Not Good,https://x.com/o/1"));

        let rows = read_ranked_csv(&path).unwrap();
        assert_eq!(rows[0].grade, Grade::NotGood);
        assert_eq!(rows[0].mileage, None);
        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_ranked_link_falls_back_to_id() {
        let scored = ScoredRecord {
            record: ListingRecord {
                id: "L9".to_string(),
                brand: "Kia".to_string(),
                model: "Ceed".to_string(),
                price: None,
                mileage: None,
                year: None,
                power_kw: None,
                body_type: None,
                fuel_type: None,
                seats: None,
                image_url: None,
                url: String::new(),
            },
            sub_scores: FactorScores::default(),
            score: 0.0,
            grade: Grade::Bad,
        };
        assert_eq!(RankedRow::from(&scored).link, "L9");
        assert_eq!(CarRow::from(&scored).url, "L9");
    }

    #[test]
    fn test_empty_ranked_csv_has_header() {
        let root = temp_root("ranked_empty");
        let path = root.join("ranked.csv");
        write_ranked_csv(&path, &[]).unwrap();
        assert!(read_ranked_csv(&path).unwrap().is_empty());
        fs::remove_dir_all(root).ok();
    }
}
