// src/pipeline/table.rs

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

/// A small in-memory CSV table: one header row plus string cells.
///
/// This is all the tabular model the pipeline needs; anything heavier would
/// be out of proportion for two public datasets joined once per run.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader =
            csv::Reader::from_path(path).with_context(|| format!("opening CSV at {:?}", path))?;

        let headers = reader
            .headers()
            .with_context(|| format!("reading CSV header from {:?}", path))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.with_context(|| format!("reading CSV row from {:?}", path))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {:?}", parent))?;
        }

        let mut writer =
            csv::Writer::from_path(path).with_context(|| format!("creating CSV at {:?}", path))?;
        writer
            .write_record(&self.headers)
            .context("writing CSV header")?;
        for row in &self.rows {
            writer.write_record(row).context("writing CSV row")?;
        }
        writer.flush().with_context(|| format!("flushing CSV to {:?}", path))?;

        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Number of data rows (excluding the header).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Check that every named column exists.
    ///
    /// The datasets this pipeline consumes are externally maintained and
    /// their schemas can drift; failing here gives the task a named-column
    /// error instead of a silently wrong join or aggregate.
    pub fn require_columns(&self, label: &str, columns: &[&str]) -> Result<()> {
        for column in columns {
            if self.column_index(column).is_none() {
                return Err(anyhow!(
                    "{label} is missing expected column '{column}' (found: {:?})",
                    self.headers
                ));
            }
        }
        Ok(())
    }
}

/// Inner join of two tables on shared key columns.
///
/// Matches the merge semantics the report downstream relies on:
/// - only rows whose key tuple appears in both tables are kept, in left
///   row order;
/// - key columns appear once, under their original names;
/// - non-key columns present in both tables are disambiguated with `_x`
///   (left) and `_y` (right) suffixes.
pub fn inner_join(left: &Table, right: &Table, keys: &[&str]) -> Result<Table> {
    let left_key_idx: Vec<usize> = keys
        .iter()
        .map(|k| {
            left.column_index(k)
                .ok_or_else(|| anyhow!("left table is missing join column '{k}'"))
        })
        .collect::<Result<_>>()?;
    let right_key_idx: Vec<usize> = keys
        .iter()
        .map(|k| {
            right
                .column_index(k)
                .ok_or_else(|| anyhow!("right table is missing join column '{k}'"))
        })
        .collect::<Result<_>>()?;

    let right_value_idx: Vec<usize> = (0..right.headers.len())
        .filter(|i| !right_key_idx.contains(i))
        .collect();

    // Output headers: left columns first, then right non-key columns.
    let mut headers: Vec<String> = Vec::with_capacity(left.headers.len() + right_value_idx.len());
    for (i, header) in left.headers.iter().enumerate() {
        let overlaps = !left_key_idx.contains(&i)
            && right_value_idx
                .iter()
                .any(|&j| &right.headers[j] == header);
        if overlaps {
            headers.push(format!("{header}_x"));
        } else {
            headers.push(header.clone());
        }
    }
    for &j in &right_value_idx {
        let header = &right.headers[j];
        let overlaps = left
            .column_index(header)
            .is_some_and(|i| !left_key_idx.contains(&i));
        if overlaps {
            headers.push(format!("{header}_y"));
        } else {
            headers.push(header.clone());
        }
    }

    // Index right rows by key tuple, preserving row order within a key.
    let mut by_key: HashMap<Vec<&str>, Vec<usize>> = HashMap::new();
    for (row_idx, row) in right.rows.iter().enumerate() {
        let key: Vec<&str> = right_key_idx.iter().map(|&i| row[i].as_str()).collect();
        by_key.entry(key).or_default().push(row_idx);
    }

    let mut joined = Table::new(headers);
    for row in &left.rows {
        let key: Vec<&str> = left_key_idx.iter().map(|&i| row[i].as_str()).collect();
        if let Some(matches) = by_key.get(&key) {
            for &row_idx in matches {
                let mut out = row.clone();
                out.extend(
                    right_value_idx
                        .iter()
                        .map(|&j| right.rows[row_idx][j].clone()),
                );
                joined.push_row(out);
            }
        }
    }

    Ok(joined)
}
