//! `lineage track`: progenitor histories for one or many roots.

use anyhow::{bail, Result};
use clap::Parser;
use lineage::args::{CatalogArgs, RetryArgs};
use lineage_engine::{
    load_candidates, write_batch, BatchConfig, BatchOrchestrator, BatchResult, BatchSummary,
    CandidateFilter, TraversalConfig,
};
use lineage_types::ObjectKey;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use super::output::{format_batch, format_metrics, print_json};

#[derive(Parser, Debug)]
pub struct TrackCmd {
    /// Root object as SNAPSHOT:ID. Can be provided multiple times.
    #[arg(long = "root", value_name = "SNAP:ID")]
    pub roots: Vec<ObjectKey>,

    /// Field to sample at every step. Can be provided multiple times.
    #[arg(long = "field", value_name = "NAME", required = true)]
    pub fields: Vec<String>,

    /// Read additional roots from a CSV table
    #[arg(long, value_name = "PATH")]
    pub roots_csv: Option<PathBuf>,

    /// Snapshot column of --roots-csv
    #[arg(long, default_value = "SnapNum")]
    pub snapshot_column: String,

    /// Id column of --roots-csv
    #[arg(long, default_value = "SubfindID")]
    pub id_column: String,

    /// Only keep --roots-csv rows where this column equals --flag-value
    #[arg(long)]
    pub flag_column: Option<String>,

    #[arg(long, default_value_t = 1)]
    pub flag_value: i64,

    /// Lowest snapshot accepted from --roots-csv
    #[arg(long)]
    pub min_snapshot: Option<i64>,

    /// Highest snapshot accepted from --roots-csv
    #[arg(long)]
    pub max_snapshot: Option<i64>,

    /// Drop repeated roots from --roots-csv
    #[arg(long, default_value_t = false)]
    pub dedup: bool,

    /// Stop before any snapshot lower than this
    #[arg(long, default_value_t = 0)]
    pub floor: i64,

    /// Collect at most N samples per root
    #[arg(long, value_name = "N")]
    pub max_steps: Option<usize>,

    /// Roots walked concurrently (1 = sequential)
    #[arg(long, default_value_t = 1)]
    pub parallelism: usize,

    /// Log progress every N roots
    #[arg(long, default_value_t = 50)]
    pub progress_every: usize,

    /// Write root_<snap>_<id>.csv files and summary.json here
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}

#[derive(Serialize)]
struct TrackOutput<'a> {
    summary: BatchSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    out_dir: Option<String>,
    results: &'a BatchResult,
}

impl TrackCmd {
    /// Explicit roots first, then CSV roots in file order.
    fn collect_roots(&self) -> Result<Vec<ObjectKey>> {
        let mut roots = self.roots.clone();
        if let Some(path) = &self.roots_csv {
            let filter = CandidateFilter {
                snapshot_column: self.snapshot_column.clone(),
                id_column: self.id_column.clone(),
                flag_column: self.flag_column.clone(),
                flag_value: self.flag_value,
                min_snapshot: self.min_snapshot,
                max_snapshot: self.max_snapshot,
                dedup: self.dedup,
            };
            roots.extend(load_candidates(path, &filter)?);
        }
        Ok(roots)
    }

    fn validate(&self) -> Result<()> {
        if self.roots.is_empty() && self.roots_csv.is_none() {
            bail!("no roots given: use --root SNAP:ID or --roots-csv PATH");
        }
        if let Some(bad) = self.roots.iter().find(|r| r.is_sentinel()) {
            bail!("invalid root {}: snapshot and id must be non-negative", bad);
        }
        if self.fields.iter().any(|f| f.trim().is_empty()) {
            bail!("--field must not be empty");
        }
        if let (Some(min), Some(max)) = (self.min_snapshot, self.max_snapshot) {
            if min > max {
                bail!("--min-snapshot {} is above --max-snapshot {}", min, max);
            }
        }
        Ok(())
    }

    pub fn execute(
        &self,
        catalog: &CatalogArgs,
        retry: &RetryArgs,
        json_output: bool,
        verbose: bool,
    ) -> Result<()> {
        self.validate()?;
        let roots = self.collect_roots()?;
        let (client, retry) = super::connect(catalog, retry);

        let traversal = TraversalConfig::new(self.fields.clone())
            .with_floor(self.floor)
            .with_max_steps(self.max_steps);
        let mut config = BatchConfig::new(traversal)
            .with_retry(retry)
            .with_parallelism(self.parallelism);
        config.progress_every = self.progress_every;

        let orchestrator = BatchOrchestrator::new(client, config);
        let result = orchestrator.run(&roots)?;

        if let Some(dir) = &self.out_dir {
            let written = write_batch(dir, &result)?;
            info!(dir = %dir.display(), files = written.len(), "wrote batch output");
        }

        if json_output {
            print_json(&TrackOutput {
                summary: result.summary(),
                out_dir: self.out_dir.as_ref().map(|d| d.display().to_string()),
                results: &result,
            })?;
        } else {
            print!("{}", format_batch(&result));
            if let Some(dir) = &self.out_dir {
                println!("Output written to {}", dir.display());
            }
            if verbose {
                print!("{}", format_metrics(&result.metrics));
            }
        }
        Ok(())
    }
}
