//! All-time Best Cars Archive
//!
//! Every ranked run feeds its shortlist into its profile's archive,
//! `data/best/best_cars_{profile}.csv`. Profiles weigh factors differently,
//! so their scores are never mixed in one file.
//! The archive keeps the highest score seen per listing URL and is capped,
//! so it never grows past `DEFAULT_MAX_ROWS` rows.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::types::{CarRow, ScoredRecord};

const BEST_CARS_DIR: &str = "data/best";

/// Archive size cap
pub const DEFAULT_MAX_ROWS: usize = 300;

pub fn best_cars_path(root: &str, profile: &str) -> PathBuf {
    PathBuf::from(root)
        .join(BEST_CARS_DIR)
        .join(format!("best_cars_{}.csv", profile))
}

/// Load the archive; a missing file is an empty archive.
pub fn load_best_cars(path: &Path) -> Result<Vec<CarRow>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open best cars archive {:?}", path))?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row.with_context(|| format!("Failed to parse archive row in {:?}", path))?);
    }
    Ok(rows)
}

pub fn save_best_cars(path: &Path, rows: &[CarRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create archive directory {:?}", parent))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to write best cars archive {:?}", path))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Merge new rows into the archive: best score per URL, sorted, capped.
///
/// On equal scores the row already in the archive wins.
pub fn merge_best_cars(existing: Vec<CarRow>, new_rows: Vec<CarRow>, max_rows: usize) -> Vec<CarRow> {
    let mut combined: Vec<CarRow> = existing.into_iter().chain(new_rows).collect();
    combined.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut seen: HashSet<String> = HashSet::new();
    combined.retain(|row| seen.insert(row.url.clone()));
    combined.truncate(max_rows);
    combined
}

/// Fold a ranked run into the archive file. Returns the archive size.
pub fn update_best_cars(path: &Path, top: &[ScoredRecord], max_rows: usize) -> Result<usize> {
    let existing = load_best_cars(path)?;
    let new_rows = top.iter().map(CarRow::from).collect();
    let merged = merge_best_cars(existing, new_rows, max_rows);
    save_best_cars(path, &merged)?;
    info!(path = %path.display(), rows = merged.len(), "Updated best cars archive");
    Ok(merged.len())
}

/// Top `n` archived cars, one per brand + model. Scores are read as stored.
pub fn all_time_best(path: &Path, n: usize) -> Result<Vec<CarRow>> {
    if !path.exists() {
        bail!("No best cars archive found at {:?}", path);
    }
    let mut rows = load_best_cars(path)?;
    rows.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut seen: HashSet<(String, String)> = HashSet::new();
    rows.retain(|row| seen.insert((row.brand.to_lowercase(), row.model.to_lowercase())));
    rows.truncate(n);
    Ok(rows)
}
