// src/engine/executor.rs

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::dag::{Task, TaskBody, TaskGraph};
use crate::engine::report::{RunReport, TaskRun, TaskStatus};

/// Options that influence how a run is executed.
#[derive(Debug, Clone, Default)]
pub struct ExecutorOptions {
    /// Maximum number of task attempts in flight at once.
    ///
    /// `None` means the size of the current ready set is the only bound.
    /// Values below 1 are treated as 1. The cap applies to attempts, not to
    /// retry-delay waits: a task sleeping between attempts does not occupy a
    /// slot, so delayed retries never starve sibling tasks.
    pub concurrency: Option<usize>,
}

/// Drives one complete run over a fixed [`TaskGraph`].
///
/// The executor walks the graph's ready sets in order, launches every task of
/// a set concurrently, and waits for the whole set to reach terminal status
/// before advancing. It is the single writer of per-run state: spawned
/// workers report back over an mpsc channel and never touch shared state.
#[derive(Debug, Default)]
pub struct Executor {
    options: ExecutorOptions,
}

/// Message a worker sends back when its task reaches a terminal outcome.
#[derive(Debug)]
struct TaskCompletion {
    name: String,
    succeeded: bool,
    attempts: u32,
    started_at: Instant,
    finished_at: Instant,
    last_error: Option<String>,
}

impl Executor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ExecutorOptions) -> Self {
        Self { options }
    }

    /// Run the graph to completion and return the report.
    ///
    /// Task failures never surface as an error here: the report records every
    /// task's fate and the overall outcome, and the caller decides whether to
    /// escalate.
    pub async fn run(&self, graph: &TaskGraph) -> RunReport {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        self.run_with_shutdown(graph, shutdown_rx).await
    }

    /// Like [`Executor::run`], but stops early when `shutdown` flips to true.
    ///
    /// On cancellation, in-flight attempts are aborted and recorded as
    /// `Skipped`, tasks not yet started are `Skipped`, and already-terminal
    /// statuses stand.
    pub async fn run_with_shutdown(
        &self,
        graph: &TaskGraph,
        mut shutdown: watch::Receiver<bool>,
    ) -> RunReport {
        info!(tasks = graph.len(), "starting run");

        let mut runs: BTreeMap<String, TaskRun> = graph
            .task_names()
            .map(|name| (name.to_string(), TaskRun::new(name)))
            .collect();

        // Tasks that must not be invoked because an ancestor failed.
        let mut skip: HashSet<String> = HashSet::new();

        let semaphore = self
            .options
            .concurrency
            .map(|n| Arc::new(Semaphore::new(n.max(1))));

        let mut cancelled = *shutdown.borrow();
        let mut shutdown_open = true;

        for batch in graph.topological_batches() {
            if cancelled {
                break;
            }

            let mut launch: Vec<&Task> = Vec::new();
            for name in batch {
                if skip.contains(name) {
                    debug!(task = %name, "skipping task: upstream failed");
                    if let Some(run) = runs.get_mut(name) {
                        run.status = TaskStatus::Skipped;
                    }
                } else if let Some(task) = graph.task(name) {
                    launch.push(task);
                }
            }
            if launch.is_empty() {
                continue;
            }

            debug!(
                tasks = ?launch.iter().map(|t| t.name()).collect::<Vec<_>>(),
                "launching ready set"
            );

            let (tx, mut rx) = mpsc::channel::<TaskCompletion>(launch.len());
            let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(launch.len());

            for task in &launch {
                if let Some(run) = runs.get_mut(task.name()) {
                    run.status = TaskStatus::Running;
                }
                handles.push(tokio::spawn(run_task(
                    task.name().to_string(),
                    task.body(),
                    task.max_attempts(),
                    task.retry_delay(),
                    semaphore.clone(),
                    tx.clone(),
                )));
            }
            drop(tx);

            // Join point: the whole ready set must reach terminal status
            // before the next set (fan-in tasks rely on this).
            let mut remaining = handles.len();
            while remaining > 0 {
                tokio::select! {
                    maybe = rx.recv() => match maybe {
                        Some(done) => {
                            remaining -= 1;
                            if !done.succeeded {
                                let downstream = graph.downstream_of(&done.name);
                                if !downstream.is_empty() {
                                    warn!(
                                        task = %done.name,
                                        skipped = downstream.len(),
                                        "task failed; downstream tasks will be skipped"
                                    );
                                }
                                skip.extend(downstream);
                            }
                            apply_completion(&mut runs, done);
                        }
                        None => {
                            // A worker dropped its sender without reporting,
                            // i.e. the body panicked. Record the still-running
                            // tasks of this batch as failed and move on.
                            warn!("completion channel closed early; marking in-flight tasks failed");
                            for run in runs.values_mut() {
                                if run.status == TaskStatus::Running {
                                    run.status = TaskStatus::Failed;
                                    run.finished_at = Some(Instant::now());
                                    run.last_error
                                        .get_or_insert_with(|| "task body panicked".to_string());
                                    skip.extend(graph.downstream_of(&run.name));
                                }
                            }
                            remaining = 0;
                        }
                    },
                    changed = shutdown.changed(), if shutdown_open && !cancelled => {
                        match changed {
                            Ok(()) if *shutdown.borrow() => {
                                info!("cancellation requested; aborting in-flight tasks");
                                cancelled = true;
                                for handle in &handles {
                                    handle.abort();
                                }
                                // Completions that raced in before the abort
                                // still count.
                                while let Ok(done) = rx.try_recv() {
                                    apply_completion(&mut runs, done);
                                }
                                for run in runs.values_mut() {
                                    if run.status == TaskStatus::Running {
                                        run.status = TaskStatus::Skipped;
                                    }
                                }
                                remaining = 0;
                            }
                            Ok(()) => {}
                            Err(_) => {
                                // Sender dropped; no cancellation can arrive.
                                shutdown_open = false;
                            }
                        }
                    }
                }
            }

            if cancelled {
                break;
            }
        }

        // Cancellation path: everything that never reached a terminal status
        // was never invoked.
        for run in runs.values_mut() {
            if !run.status.is_terminal() {
                run.status = TaskStatus::Skipped;
            }
        }

        let report = RunReport::from_runs(runs);
        info!(outcome = ?report.outcome(), "run finished");
        report
    }
}

fn apply_completion(runs: &mut BTreeMap<String, TaskRun>, done: TaskCompletion) {
    if let Some(run) = runs.get_mut(&done.name) {
        run.status = if done.succeeded {
            TaskStatus::Succeeded
        } else {
            TaskStatus::Failed
        };
        run.attempts = done.attempts;
        run.started_at = Some(done.started_at);
        run.finished_at = Some(done.finished_at);
        run.last_error = done.last_error;
    }
}

/// Per-task worker: runs the attempt loop and reports exactly one completion.
///
/// The concurrency permit is held per attempt and released before the retry
/// sleep, so a waiting retry never blocks a sibling task out of a slot.
async fn run_task(
    name: String,
    body: TaskBody,
    max_attempts: u32,
    retry_delay: Duration,
    semaphore: Option<Arc<Semaphore>>,
    tx: mpsc::Sender<TaskCompletion>,
) {
    let started_at = Instant::now();
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        let _permit = match semaphore.as_ref() {
            Some(sem) => match Arc::clone(sem).acquire_owned().await {
                Ok(permit) => Some(permit),
                // The semaphore is never closed while a run is active; if it
                // is, the run is being torn down and reporting is pointless.
                Err(_) => return,
            },
            None => None,
        };

        debug!(task = %name, attempt, max_attempts, "invoking task body");
        match (body)().await {
            Ok(()) => {
                info!(task = %name, attempts = attempt, "task succeeded");
                let _ = tx
                    .send(TaskCompletion {
                        name,
                        succeeded: true,
                        attempts: attempt,
                        started_at,
                        finished_at: Instant::now(),
                        last_error: None,
                    })
                    .await;
                return;
            }
            Err(err) => {
                warn!(
                    task = %name,
                    attempt,
                    max_attempts,
                    error = %format!("{err:#}"),
                    "task attempt failed"
                );
                last_error = Some(format!("{err:#}"));
                if attempt < max_attempts {
                    drop(_permit);
                    sleep(retry_delay).await;
                }
            }
        }
    }

    warn!(task = %name, attempts = max_attempts, "task failed; attempts exhausted");
    let _ = tx
        .send(TaskCompletion {
            name,
            succeeded: false,
            attempts: max_attempts,
            started_at,
            finished_at: Instant::now(),
            last_error,
        })
        .await;
}
