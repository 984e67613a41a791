// src/pipeline/merge.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::pipeline::table::{inner_join, Table};

/// Columns the two datasets are joined on.
pub const JOIN_COLUMNS: [&str; 2] = ["Country Name", "Year"];

/// Inner-join the two downloaded CSVs on country and year and write the
/// merged table to `dest`.
pub async fn merge_csv_files(left: PathBuf, right: PathBuf, dest: PathBuf) -> Result<()> {
    tokio::task::spawn_blocking(move || merge_blocking(&left, &right, &dest))
        .await
        .context("merge worker aborted")?
}

fn merge_blocking(left_path: &Path, right_path: &Path, dest: &Path) -> Result<()> {
    let left = Table::read_csv(left_path)?;
    let right = Table::read_csv(right_path)?;

    left.require_columns("population dataset", &JOIN_COLUMNS)?;
    right.require_columns("gdp dataset", &JOIN_COLUMNS)?;

    let merged = inner_join(&left, &right, &JOIN_COLUMNS)?;
    if merged.is_empty() {
        // Not fatal by itself, but the report task will have nothing to say.
        warn!("merged table is empty; the datasets share no (country, year) pairs");
    }

    info!(
        left_rows = left.len(),
        right_rows = right.len(),
        merged_rows = merged.len(),
        "datasets merged"
    );

    merged.write_csv(dest)
}
