//! # PlaylistRX
//!
//! Command-line front end: loads curation options, opens the local catalog
//! and runs the curator, or manages the catalog itself.
//!
//! ## Usage
//!
//! ```bash
//! # Load a library export
//! playlistrx import library.json
//!
//! # Full run with a fixed seed
//! RUST_LOG=info playlistrx run --seed 42
//!
//! # Inspect the result
//! playlistrx show "[RX] Master"
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use playlistrx::catalog::retry::retry_rate_limited;
use playlistrx::catalog::{
    CatalogService, LibrarySnapshot, RetryingCatalog, SqliteCatalog, ThreadSleep,
};
use playlistrx::cli::{self, CurateArgs};
use playlistrx::completion;
use playlistrx::config::{self, CurateConfig};
use playlistrx::curator::{CurateReport, Curator, RunMode};
use playlistrx::master::{MasterResult, Verdict};
use playlistrx::radio::RadioResult;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};

/// Main entry point.
///
/// Logging is controlled via `RUST_LOG`:
/// - `RUST_LOG=info playlistrx run` - Per-artist radio and split-the-deck summaries
/// - `RUST_LOG=playlistrx::master=debug playlistrx master` - Every weight decision
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    match args.command {
        cli::Command::Run(curate) => {
            curate_command(&args.config, args.db, RunMode::Full, &curate)?;
        }
        cli::Command::Radio(curate) => {
            curate_command(&args.config, args.db, RunMode::RadioOnly, &curate)?;
        }
        cli::Command::Master(curate) => {
            curate_command(&args.config, args.db, RunMode::MasterOnly, &curate)?;
        }
        cli::Command::Import { path } => {
            let db_path = resolve_db_path(args.db)?;
            info!("Importing {} into {}", path.display(), db_path.display());
            let snapshot = read_snapshot(&path)?;
            let mut catalog = open_catalog(&db_path)?;
            retry_rate_limited(&ThreadSleep, || catalog.import(&snapshot))
                .context("Failed to import library snapshot")?;
            println!(
                "Imported {} tracks and {} playlists into {}",
                snapshot.tracks.len(),
                snapshot.playlists.len(),
                db_path.display()
            );
        }
        cli::Command::Playlists => {
            let catalog = open_catalog(&resolve_db_path(args.db)?)?;
            for summary in catalog.list_playlists()? {
                println!("{:>5}  {}  ({})", summary.length, summary.name, summary.id);
            }
        }
        cli::Command::Show { name } => {
            let catalog = RetryingCatalog::new(open_catalog(&resolve_db_path(args.db)?)?);
            let id = catalog
                .find_playlist_id_by_name(&name)?
                .with_context(|| format!("No playlist named '{name}'"))?;
            for (position, track) in catalog.inner().playlist_listing(&id)?.iter().enumerate() {
                println!("{:>4}. {} - {}", position + 1, track.name, track.artist_name);
            }
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(shell), &mut cmd);
        }
    }

    Ok(())
}

fn curate_command(
    config_path: &Path,
    db: Option<PathBuf>,
    mode: RunMode,
    curate: &CurateArgs,
) -> Result<()> {
    let mut config = CurateConfig::load(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    curate.overrides.apply(&mut config);
    debug!("Effective config: {config:?}");

    let mut rng = match curate.seed {
        Some(seed) => {
            info!("Using seed {seed}");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let catalog = RetryingCatalog::new(open_catalog(&resolve_db_path(db)?)?);
    let report = Curator::new(&catalog, &config)
        .execute(mode, &mut rng)
        .context("Curation run failed")?;
    print_report(&config, &report);
    Ok(())
}

fn resolve_db_path(db: Option<PathBuf>) -> Result<PathBuf> {
    match db {
        Some(path) => Ok(path),
        None => config::get_db_path(),
    }
}

fn open_catalog(path: &Path) -> Result<SqliteCatalog> {
    SqliteCatalog::open(path)
        .with_context(|| format!("Failed to open catalog at {}", path.display()))
}

fn read_snapshot(path: &Path) -> Result<LibrarySnapshot> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Malformed library snapshot {}", path.display()))
}

fn print_report(config: &CurateConfig, report: &CurateReport) {
    let names = &config.playlist_names;
    if let Some(radio) = &report.radio {
        print_radio(&names.radio, &names.master, radio);
    }
    if let Some(master) = &report.master {
        print_master(&names.master, master);
    }
}

fn print_radio(radio_name: &str, master_name: &str, radio: &RadioResult) {
    println!("{radio_name}: {} tracks", radio.track_ids.len());
    for entry in &radio.artists {
        match &entry.blacklisted_by {
            Some(rule) => println!("  {} (blacklisted by '{rule}')", entry.artist.name),
            None => println!(
                "  {}: {} tracks, {} deep cuts",
                entry.artist.name,
                entry.mix.tracks.len(),
                entry.mix.replaced
            ),
        }
    }
    if radio.filtered > 0 {
        println!("  {} songs filtered out by weight", radio.filtered);
    }
    if !radio.appended_to_master.is_empty() {
        println!(
            "  {} new tracks appended to {master_name}",
            radio.appended_to_master.len()
        );
    }
}

fn print_master(master_name: &str, master: &MasterResult) {
    let blacklisted = master
        .decisions
        .iter()
        .filter(|d| matches!(d.verdict, Verdict::Blacklisted(_)))
        .count();
    let included = master.decisions.iter().filter(|d| d.included()).count();
    let excluded = master.decisions.len() - included - blacklisted;

    println!("{master_name}: {} tracks", master.track_ids.len());
    println!(
        "  {} candidates: {included} included, {excluded} excluded by weight, {blacklisted} blacklisted",
        master.decisions.len()
    );
    if master.retained > 0 {
        println!("  {} tracks kept from the previous Master", master.retained);
    }
}
