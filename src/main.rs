//! Bioscope - Biometric Aggregation and Analysis Sync
//!
//! Command line entry point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bioscope::analysis::ScoreKind;
use bioscope::cache::{CacheState, ReferenceZone};
use bioscope::metrics::Outcome;
use bioscope::storage::config;
use bioscope::{BiometricSource, DailySync, HealthDataEntry, MetricSnapshot};

#[derive(Parser)]
#[command(name = "bioscope")]
#[command(version)]
#[command(about = "Biometric aggregation and analysis sync", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the platform data directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate the biometric source for a date and print the values
    Snapshot {
        /// Date as YYYY-MM-DD (defaults to today)
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Aggregate the biometric source for a date and upload it
    Sync {
        /// Date as YYYY-MM-DD (defaults to today)
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Validate and upload a manual entry read from a JSON file
    Submit {
        #[arg(value_name = "ENTRY")]
        entry: PathBuf,
    },
    /// Load the derived scores for a date
    Scores {
        /// Date as YYYY-MM-DD (defaults to today)
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    ReferenceZone::parse(s).map_err(|e| format!("invalid date '{}': {}", s, e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_from(path),
        None => config::load_config(),
    }
    .context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Bioscope v{}", env!("CARGO_PKG_VERSION"));

    let sync = DailySync::from_config(&config).context("Failed to initialize")?;
    let today = sync.zone().today();

    match cli.command {
        Commands::Snapshot { date } => {
            let date = date.unwrap_or(today);
            let snapshot = sync.snapshot(date).await?;
            print_snapshot(&sync, date, &snapshot);
        }
        Commands::Sync { date } => {
            let date = date.unwrap_or(today);
            let snapshot = sync
                .sync_wearable(date)
                .await
                .with_context(|| format!("Failed to sync {}", date))?;
            print_snapshot(&sync, date, &snapshot);
            println!("Uploaded.");
        }
        Commands::Submit { entry } => {
            let content = std::fs::read_to_string(&entry)
                .with_context(|| format!("Failed to read {}", entry.display()))?;
            let entry: HealthDataEntry =
                serde_json::from_str(&content).context("Failed to parse entry")?;
            sync.submit_entry(&entry)
                .await
                .with_context(|| format!("Failed to submit entry for {}", entry.date))?;
            println!("Submitted entry for {}.", entry.date);
        }
        Commands::Scores { date } => {
            let date = date.unwrap_or(today);
            let entry = sync.load_scores(date).await;
            match entry.state {
                CacheState::Ready(scores) => {
                    println!("Scores for {}", date);
                    for kind in ScoreKind::ALL {
                        println!("  {:<10} {:.1}", kind.as_str(), scores.get(kind));
                    }
                }
                CacheState::Empty => println!("No data for {}.", date),
                CacheState::Failed(reason) => {
                    anyhow::bail!("Could not load scores for {}: {}", date, reason)
                }
                CacheState::NotFetched | CacheState::Fetching => {
                    println!("Scores for {} are still loading.", date)
                }
            }
        }
    }

    Ok(())
}

fn print_snapshot<S: BiometricSource>(
    sync: &DailySync<S>,
    date: NaiveDate,
    snapshot: &MetricSnapshot,
) {
    let catalog = sync.aggregator().catalog();
    println!("{} ({})", date, sync.source().label());
    for entry in catalog.entries() {
        let shown = match snapshot.get(entry.id) {
            Some(Outcome::Value(_)) => snapshot
                .formatted(catalog, entry.id)
                .map(|v| format!("{} {}", v, entry.unit))
                .unwrap_or_default(),
            Some(Outcome::Unavailable) | None => "-".to_string(),
            Some(Outcome::Error(reason)) => format!("error: {}", reason),
        };
        println!("  {:<18} {}", entry.display_name, shown);
    }
}
