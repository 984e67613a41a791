// src/pipeline/mod.rs

//! The concrete batch pipeline: two dataset downloads feeding a merge,
//! feeding a report.
//!
//! Everything here is a plain task body behind the engine's task contract;
//! the engine knows nothing about CSVs or HTTP. [`build_graph`] is the only
//! coupling point: it wires the four tasks and their edges from config.

pub mod fetch;
pub mod merge;
pub mod summary;
pub mod table;

use anyhow::{anyhow, Context, Result};

use crate::config::ConfigFile;
use crate::dag::{task_fn, Task, TaskGraph};

pub const FETCH_POPULATION: &str = "fetch_population";
pub const FETCH_GDP: &str = "fetch_gdp";
pub const MERGE: &str = "merge_datasets";
pub const REPORT: &str = "generate_report";

/// Build the four-task pipeline graph:
///
/// ```text
/// fetch_population ─┐
///                   ├─> merge_datasets ──> generate_report
/// fetch_gdp ────────┘
/// ```
///
/// The two fetches are independent and land in the same ready set; the merge
/// starts only after both succeeded.
pub fn build_graph(cfg: &ConfigFile) -> Result<TaskGraph> {
    let retry_delay = cfg
        .run
        .retry_delay_duration()
        .map_err(|e| anyhow!(e))
        .context("invalid [run].retry_delay")?;
    let max_attempts = cfg.run.max_attempts;

    let client = reqwest::Client::builder()
        .build()
        .context("building HTTP client")?;

    let population_csv = cfg.pipeline.population_csv();
    let gdp_csv = cfg.pipeline.gdp_csv();
    let merged_csv = cfg.pipeline.merged_csv();
    let report_file = cfg.pipeline.report_file();

    let mut graph = TaskGraph::new();

    {
        let client = client.clone();
        let url = cfg.pipeline.population_url.clone();
        let dest = population_csv.clone();
        graph.add_task(Task::new(
            FETCH_POPULATION,
            task_fn(move || {
                let client = client.clone();
                let url = url.clone();
                let dest = dest.clone();
                async move { fetch::fetch_to_file(&client, &url, &dest).await }
            }),
            max_attempts,
            retry_delay,
        ))?;
    }

    {
        let client = client.clone();
        let url = cfg.pipeline.gdp_url.clone();
        let dest = gdp_csv.clone();
        graph.add_task(Task::new(
            FETCH_GDP,
            task_fn(move || {
                let client = client.clone();
                let url = url.clone();
                let dest = dest.clone();
                async move { fetch::fetch_to_file(&client, &url, &dest).await }
            }),
            max_attempts,
            retry_delay,
        ))?;
    }

    {
        let merged = merged_csv.clone();
        graph.add_task(Task::new(
            MERGE,
            task_fn(move || {
                let left = population_csv.clone();
                let right = gdp_csv.clone();
                let dest = merged.clone();
                async move { merge::merge_csv_files(left, right, dest).await }
            }),
            max_attempts,
            retry_delay,
        ))?;
    }

    graph.add_task(Task::new(
        REPORT,
        task_fn(move || {
            let merged = merged_csv.clone();
            let dest = report_file.clone();
            async move { summary::write_top_countries_report(merged, dest).await }
        }),
        max_attempts,
        retry_delay,
    ))?;

    graph.add_dependency(FETCH_POPULATION, MERGE)?;
    graph.add_dependency(FETCH_GDP, MERGE)?;
    graph.add_dependency(MERGE, REPORT)?;

    Ok(graph)
}
