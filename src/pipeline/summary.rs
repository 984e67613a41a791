// src/pipeline/summary.rs

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::pipeline::table::Table;

pub const COUNTRY_COLUMN: &str = "Country Name";

/// The left-hand `Value` column as named after the join suffixes it: this is
/// the population figure.
pub const POPULATION_COLUMN: &str = "Value_x";

const TOP_N: usize = 5;

/// Read the merged table, find the peak population per country, and write a
/// top-5 text report.
pub async fn write_top_countries_report(merged: PathBuf, dest: PathBuf) -> Result<()> {
    tokio::task::spawn_blocking(move || report_blocking(&merged, &dest))
        .await
        .context("report worker aborted")?
}

fn report_blocking(merged_path: &Path, dest: &Path) -> Result<()> {
    let table = Table::read_csv(merged_path)?;
    table.require_columns("merged dataset", &[COUNTRY_COLUMN, POPULATION_COLUMN])?;

    let top = top_countries(&table, TOP_N)?;

    let mut out = String::new();
    out.push_str("Top 5 countries by combined population\n");
    out.push_str("======================================\n\n");
    for (country, population) in &top {
        out.push_str(&format!("{country}: {}\n", format_thousands(*population)));
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating directory {:?}", parent))?;
    }
    fs::write(dest, out).with_context(|| format!("writing report to {:?}", dest))?;

    info!(?dest, countries = top.len(), "report written");
    Ok(())
}

/// Peak population per country, descending, ties broken by name for a stable
/// report.
fn top_countries(table: &Table, n: usize) -> Result<Vec<(String, f64)>> {
    // require_columns ran before this; the lookups cannot miss.
    let country_idx = table
        .column_index(COUNTRY_COLUMN)
        .context("country column vanished after validation")?;
    let value_idx = table
        .column_index(POPULATION_COLUMN)
        .context("population column vanished after validation")?;

    let mut max_by_country: BTreeMap<&str, f64> = BTreeMap::new();
    for row in table.rows() {
        let raw = row[value_idx].trim();
        if raw.is_empty() {
            continue;
        }
        let value: f64 = raw.parse().with_context(|| {
            format!(
                "non-numeric population value '{raw}' for country '{}'",
                row[country_idx]
            )
        })?;

        let entry = max_by_country.entry(row[country_idx].as_str()).or_insert(value);
        if value > *entry {
            *entry = value;
        }
    }

    let mut ranked: Vec<(String, f64)> = max_by_country
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked.truncate(n);

    Ok(ranked)
}

/// Format a value as a whole number with thousands separators, e.g.
/// `1404910000` -> `"1,404,910,000"`.
fn format_thousands(value: f64) -> String {
    let rounded = value.round() as i128;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}
