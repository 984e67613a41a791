// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod pipeline;

use tokio::sync::watch;

use crate::cli::CliArgs;
use crate::config::{default_config_path, load_and_validate, load_or_default, ConfigFile};
use crate::dag::TaskGraph;
use crate::engine::{Executor, ExecutorOptions, RunOutcome};
use crate::errors::Result;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the pipeline task graph
/// - the executor
/// - Ctrl-C handling (cancels the in-flight run)
///
/// The returned outcome mirrors the run report: task failures are reported,
/// not raised, so only setup problems (bad config, bad graph) surface as
/// errors here.
pub async fn run(args: CliArgs) -> Result<RunOutcome> {
    let cfg = match args.config.as_deref() {
        Some(path) => load_and_validate(path)?,
        None => load_or_default(default_config_path())?,
    };

    let graph = pipeline::build_graph(&cfg)?;

    if args.dry_run {
        print_dry_run(&cfg, &graph);
        return Ok(RunOutcome::Success);
    }

    // Ctrl-C → cancel the run; already-finished tasks keep their status.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        let _ = shutdown_tx.send(true);
    });

    let options = ExecutorOptions {
        concurrency: args.concurrency.or(cfg.run.concurrency),
    };
    let executor = Executor::with_options(options);
    let report = executor.run_with_shutdown(&graph, shutdown_rx).await;

    print!("{}", report.render());
    Ok(report.outcome())
}

/// Simple dry-run output: print config, tasks, deps, and execution order.
fn print_dry_run(cfg: &ConfigFile, graph: &TaskGraph) {
    println!("pipedag dry-run");
    println!("  pipeline.population_url = {}", cfg.pipeline.population_url);
    println!("  pipeline.gdp_url = {}", cfg.pipeline.gdp_url);
    println!("  pipeline.work_dir = {:?}", cfg.pipeline.work_dir);
    println!("  pipeline.report = {:?}", cfg.pipeline.report_file());
    println!("  run.max_attempts = {}", cfg.run.max_attempts);
    println!("  run.retry_delay = {}", cfg.run.retry_delay);
    if let Some(n) = cfg.run.concurrency {
        println!("  run.concurrency = {n}");
    }
    println!();

    println!("tasks ({}):", graph.len());
    for name in graph.task_names() {
        println!("  - {name}");
        let deps = graph.dependencies_of(name);
        if !deps.is_empty() {
            println!("      after: {:?}", deps);
        }
    }
    println!();

    println!("execution order:");
    for (i, batch) in graph.topological_batches().enumerate() {
        println!("  {}: {:?}", i + 1, batch);
    }
}
