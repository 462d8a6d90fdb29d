//! `lineage scan`: largest value of a field across one snapshot.

use anyhow::{bail, Result};
use clap::Parser;
use lineage::args::{parse_kind, CatalogArgs, RetryArgs};
use lineage_engine::{scan_max, RetryPolicy, ScanConfig};
use lineage_types::CatalogKind;

use super::output::{format_scan, print_json};

#[derive(Parser, Debug)]
pub struct ScanCmd {
    /// Snapshot to enumerate
    #[arg(long)]
    pub snapshot: i64,

    /// Field to maximize
    #[arg(long, default_value = "Group_M_Crit200")]
    pub field: String,

    /// Catalog namespace: halo or subhalo
    #[arg(long, default_value = "halo", value_parser = parse_kind)]
    pub kind: CatalogKind,

    /// Probe at most this many indices
    #[arg(long, default_value_t = 50_000)]
    pub max_index: i64,

    /// Log progress every N indices
    #[arg(long, default_value_t = 1000)]
    pub progress_every: i64,
}

impl ScanCmd {
    pub fn execute(&self, catalog: &CatalogArgs, retry: &RetryArgs, json_output: bool) -> Result<()> {
        if self.snapshot < 0 {
            bail!("--snapshot must be non-negative, got {}", self.snapshot);
        }
        if self.max_index < 0 {
            bail!("--max-index must be non-negative, got {}", self.max_index);
        }

        let (client, retry) = super::connect(catalog, retry);
        let policy = RetryPolicy::new(retry);
        let mut config = ScanConfig::new(&self.field)
            .with_kind(self.kind)
            .with_max_index(self.max_index);
        config.progress_every = self.progress_every;

        let report = scan_max(&client, &policy, self.snapshot, &config);

        if json_output {
            print_json(&report)?;
        } else {
            print!("{}", format_scan(&report));
        }
        Ok(())
    }
}
