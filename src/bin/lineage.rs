//! lineage: progenitor histories from a simulation catalog API
//!
//! ## Commands
//!
//! - **track**: follow progenitor links from one or more roots and emit time series
//! - **scan**: enumerate a snapshot's catalog to find the entry with the largest field value
//! - **lookup**: fetch one field for a list of objects
//!
//! ## Example Usage
//!
//! ```bash
//! # Stellar mass and SFR history of one subhalo
//! lineage track --root 99:227576 --field mass_stars --field sfr --out-dir out/
//!
//! # Every flagged candidate from a table, four roots at a time
//! lineage track --roots-csv candidates.csv --flag-column JellyfishFlag \
//!     --min-snapshot 67 --max-snapshot 99 --field mass_stars --parallelism 4 --out-dir out/
//!
//! # Most massive halo at z = 0
//! lineage scan --snapshot 99 --field Group_M_Crit200
//!
//! # Parent group of each subhalo in a table
//! lineage lookup --rows-csv table.csv --field GroupNumber --out groups.csv
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use lineage::args::{CatalogArgs, RetryArgs};
use lineage_types::env_bool;
use tracing::Level;

mod lineage_cli;

use lineage_cli::{lookup::LookupCmd, scan::ScanCmd, track::TrackCmd};

#[derive(Parser)]
#[command(
    name = "lineage",
    author,
    version,
    about = "Progenitor-chain time series from a simulation catalog",
    long_about = "Follows main-progenitor links backward in time through a simulation catalog \
                  web API and writes aligned, chronological per-field time series."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    catalog: CatalogArgs,

    #[command(flatten)]
    retry: RetryArgs,

    /// Output as JSON instead of human-readable format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (debug logging, fetch metrics)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow progenitor links from one or more roots
    Track(TrackCmd),

    /// Find the entry with the largest field value in one snapshot
    Scan(ScanCmd),

    /// Fetch one field for a list of objects
    Lookup(LookupCmd),
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let Cli {
        command,
        catalog,
        retry,
        json,
        verbose,
    } = Cli::parse();

    let verbose = verbose || env_bool("LINEAGE_VERBOSE");
    init_logging(verbose);
    catalog.validate()?;

    match command {
        Commands::Track(cmd) => cmd.execute(&catalog, &retry, json, verbose),
        Commands::Scan(cmd) => cmd.execute(&catalog, &retry, json),
        Commands::Lookup(cmd) => cmd.execute(&catalog, &retry, json),
    }
}
