mod analyzer;
mod classifier;
mod config;
mod merger;
mod model;
mod parser;
mod report;
mod snapshot;
mod storage;
mod utils;

use std::error::Error;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use config::{AppConfig, load_config};
use model::MergeStats;
use snapshot::{DirectorySource, SnapshotProvider};
use storage::LedgerStore;

#[derive(Parser)]
#[command(name = "member-ledger")]
#[command(about = "Membership payment ledger merge and dashboard analytics", long_about = None)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, default_value = "config.json")]
    config: String,
    /// Analysis time override, e.g. "2026-08-15 12:00:00"
    #[arg(long)]
    as_of: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the latest payment export into the master ledger
    Merge,
    /// Compute dashboard metrics from the master ledger
    Analyze,
    /// Merge, then analyze
    Run,
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Config load error: {}", e);
            std::process::exit(1);
        }
    };

    let as_of = match resolve_as_of(cli.as_of.as_deref(), &config) {
        Ok(ts) => ts,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Merge => run_merge(&config).map(|_| ()),
        Commands::Analyze => run_analyze(&config, as_of),
        Commands::Run => run_merge(&config).and_then(|_| run_analyze(&config, as_of)),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn resolve_as_of(flag: Option<&str>, config: &AppConfig) -> Result<DateTime<Utc>, String> {
    match flag.or(config.as_of.as_deref()) {
        None => Ok(Utc::now()),
        Some(raw) => {
            utils::parse_datetime(raw).ok_or_else(|| format!("unparsable as-of override: {raw}"))
        }
    }
}

fn ledger_store(config: &AppConfig) -> LedgerStore {
    LedgerStore::new(
        config.ledger_file.as_str(),
        config.backup_dir.as_deref().map(PathBuf::from),
    )
}

/// One merge pass: lock, load, fetch, normalize, merge, backup, persist.
/// An unreadable snapshot aborts before the ledger is touched.
fn run_merge(config: &AppConfig) -> Result<MergeStats, Box<dyn Error>> {
    let store = ledger_store(config);
    let _lock = store.lock()?;

    let existing = store.load()?;
    info!("Ledger has {} records", existing.len());

    let source = DirectorySource::new(
        config.export_dir.as_str(),
        config.snapshot_file.as_deref().map(PathBuf::from),
    );
    let raw = source.fetch()?;
    let rows = parser::normalize(&raw);
    info!("Snapshot has {} rows", rows.len());

    let (merged, stats) = merger::merge(existing, rows);
    store.write_backup(&merged)?;
    store.save(&merged)?;

    info!(
        "Merge complete: {} total records ({} added, {} updated, {} unchanged, {} duplicates removed)",
        merged.len(),
        stats.added,
        stats.updated,
        stats.unchanged,
        stats.duplicates_removed
    );
    Ok(stats)
}

fn run_analyze(config: &AppConfig, as_of: DateTime<Utc>) -> Result<(), Box<dyn Error>> {
    let store = ledger_store(config);
    let records = store.load()?;
    info!("Loaded {} ledger records", records.len());

    let metrics = analyzer::analyze(&records, as_of, &config.windows());
    info!("Active members: {}", metrics.total_active_members);
    info!("Monthly revenue: ${:.2}", metrics.monthly_revenue);
    info!("Members quit (60 days): {}", metrics.members_quit_60_days);
    info!("Membership breakdown: {:?}", metrics.membership_breakdown);

    let data = report::render(&metrics);
    report::write_json(&data, Path::new(&config.output_file))?;
    Ok(())
}
