use std::collections::BTreeMap;
use std::fs;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use car_scout::archive::{all_time_best, best_cars_path, update_best_cars, DEFAULT_MAX_ROWS};
use car_scout::logging::init_tracing;
use car_scout::notify::{compose_email, EmailSettings};
use car_scout::pipeline::{rank_all_profiles, rank_profile, RankedRun};
use car_scout::report::render_table_html;
use car_scout::settings::{settings_path, Settings};
use car_scout::sorter::{RankOptions, DEFAULT_TOP_N};
use car_scout::storage::{load_listing_sets, ranked_csv_path, write_ranked_csv, SORT_METHODS};
use car_scout::CarRow;

const DEFAULT_PROFILE: &str = "standard";

#[derive(Parser)]
#[command(name = "car_scout")]
#[command(about = "Score, deduplicate and rank scraped car listings")]
struct Cli {
    /// Data root holding settings.json and data/
    #[arg(long, env = "ROOT", default_value = ".")]
    root: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank the latest scrape results
    Rank {
        /// Profile to rank; every profile when omitted
        #[arg(long)]
        profile: Option<String>,
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top: usize,
        /// Keep only the best listing per brand and model
        #[arg(long)]
        distinct_models: bool,
        /// Print one composed email per profile as a JSON line
        #[arg(long)]
        emit_email: bool,
        #[arg(long, default_value_t = DEFAULT_MAX_ROWS)]
        archive_rows: usize,
    },

    /// Show the all-time best cars of one profile
    Best {
        #[arg(long, default_value = DEFAULT_PROFILE)]
        profile: String,
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top: usize,
    },

    /// Validate and print the effective settings
    Settings,
}

fn main() -> Result<()> {
    init_tracing("info");
    let cli = Cli::parse();

    match cli.command {
        Commands::Rank {
            profile,
            top,
            distinct_models,
            emit_email,
            archive_rows,
        } => {
            let options = RankOptions {
                top_n: top,
                distinct_models,
            };
            run_rank(&cli.root, profile.as_deref(), &options, emit_email, archive_rows)
        }
        Commands::Best { profile, top } => run_best(&cli.root, &profile, top),
        Commands::Settings => run_settings(&cli.root),
    }
}

fn load_settings(root: &str) -> Result<Settings> {
    let path = settings_path(root);
    let settings = Settings::load(&path)?;
    settings
        .validate()
        .with_context(|| format!("Invalid settings in {:?}", path))?;
    Ok(settings)
}

fn run_rank(
    root: &str,
    profile: Option<&str>,
    options: &RankOptions,
    emit_email: bool,
    archive_rows: usize,
) -> Result<()> {
    let settings = load_settings(root)?;
    let raw_sets = load_listing_sets(root, SORT_METHODS)?;

    let runs: BTreeMap<String, RankedRun> = match profile {
        Some(name) => {
            let run = rank_profile(&raw_sets, &settings, name, options)?;
            BTreeMap::from([(name.to_string(), run)])
        }
        None => rank_all_profiles(&raw_sets, &settings, options)?,
    };

    let email_settings = if emit_email { EmailSettings::from_env() } else { None };

    for (name, run) in &runs {
        let csv_path = ranked_csv_path(root, name);
        write_ranked_csv(&csv_path, &run.ranked)?;

        let rows: Vec<CarRow> = run.ranked.iter().map(CarRow::from).collect();
        let html_path = csv_path.with_extension("html");
        fs::write(&html_path, render_table_html(&rows, &format!("Top cars: {}", name)))
            .with_context(|| format!("Failed to write report {:?}", html_path))?;
        info!(profile = %name, csv = %csv_path.display(), html = %html_path.display(), "Wrote ranked exports");

        update_best_cars(&best_cars_path(root, name), &run.ranked, archive_rows)?;

        if let Some(email) = &email_settings {
            let subject = format!("Top {} cars ({})", rows.len(), name);
            match compose_email(&subject, &rows, email)? {
                Some(message) => println!("{}", serde_json::to_string(&message)?),
                None => info!(profile = %name, "Nothing to email"),
            }
        }
    }

    if emit_email && email_settings.is_none() {
        warn!("--emit-email given but no email settings found, skipped");
    }
    Ok(())
}

fn run_best(root: &str, profile: &str, top: usize) -> Result<()> {
    let best = all_time_best(&best_cars_path(root, profile), top)?;
    if best.is_empty() {
        println!("No cars archived yet.");
        return Ok(());
    }
    for (position, car) in best.iter().enumerate() {
        println!(
            "{:>3}. {:>5.1} {:<12} {} {} | {} EUR | {} km | {} | {}",
            position + 1,
            car.score,
            car.grade.label(),
            car.brand,
            car.model,
            display_or_dash(car.price),
            display_or_dash(car.mileage),
            display_or_dash(car.year),
            car.url
        );
    }
    Ok(())
}

fn display_or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn run_settings(root: &str) -> Result<()> {
    let settings = load_settings(root)?;
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}
