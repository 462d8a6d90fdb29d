//! `lineage lookup`: one field for every object listed in a CSV.

use anyhow::Result;
use clap::Parser;
use lineage::args::{parse_kind, CatalogArgs, RetryArgs};
use lineage_engine::{load_lookup_rows, lookup_fields, write_lookup_csv, RetryPolicy};
use lineage_types::CatalogKind;
use std::path::PathBuf;

use super::output::{format_lookup, print_json};

#[derive(Parser, Debug)]
pub struct LookupCmd {
    /// CSV table listing the objects
    #[arg(long, value_name = "PATH")]
    pub rows_csv: PathBuf,

    #[arg(long, default_value = "snapshot")]
    pub snapshot_column: String,

    #[arg(long, default_value = "subhalo_id")]
    pub id_column: String,

    /// Field to fetch for each object
    #[arg(long)]
    pub field: String,

    /// Catalog namespace: subhalo or halo
    #[arg(long, default_value = "subhalo", value_parser = parse_kind)]
    pub kind: CatalogKind,

    /// Write `snapshot,id,<field>,status` here instead of printing a table
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

impl LookupCmd {
    pub fn execute(&self, catalog: &CatalogArgs, retry: &RetryArgs, json_output: bool) -> Result<()> {
        let keys = load_lookup_rows(&self.rows_csv, &self.snapshot_column, &self.id_column)?;

        let (client, retry) = super::connect(catalog, retry);
        let policy = RetryPolicy::new(retry);
        let rows = lookup_fields(&client, &policy, self.kind, &keys, &self.field);

        if let Some(path) = &self.out {
            write_lookup_csv(path, &rows, &self.field)?;
        }

        if json_output {
            print_json(&rows)?;
        } else if let Some(path) = &self.out {
            println!("Wrote {} rows to {}", rows.len(), path.display());
        } else {
            print!("{}", format_lookup(&rows, &self.field));
        }
        Ok(())
    }
}
