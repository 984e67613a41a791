// src/engine/report.rs

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Per-run state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Waiting for its ready set to come up.
    Pending,
    /// Dispatched; an attempt is in flight (or a retry delay is ticking).
    Running,
    /// An attempt completed successfully.
    Succeeded,
    /// All attempts exhausted without success.
    Failed,
    /// Never invoked: an upstream task failed, or the run was cancelled.
    Skipped,
}

impl TaskStatus {
    /// Whether the status will not change further within the run.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Skipped
        )
    }
}

/// Final snapshot of one task's execution within a single run.
#[derive(Debug, Clone)]
pub struct TaskRun {
    pub name: String,
    pub status: TaskStatus,
    /// Number of attempts actually made (0 for skipped tasks).
    pub attempts: u32,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
    /// Error from the last failed attempt, formatted with its context chain.
    pub last_error: Option<String>,
}

impl TaskRun {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TaskStatus::Pending,
            attempts: 0,
            started_at: None,
            finished_at: None,
            last_error: None,
        }
    }

    /// Wall-clock duration from first attempt start to terminal status.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        }
    }
}

/// Overall result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every task succeeded.
    Success,
    /// At least one task failed, was skipped, or never reached terminal
    /// success (e.g. the run was cancelled).
    Failure,
}

/// The record of one complete run: a final [`TaskRun`] snapshot per task plus
/// the overall outcome.
///
/// `run()` always returns a complete report, even (especially) when tasks
/// failed; callers that want hard failure inspect the outcome and escalate.
#[derive(Debug, Clone)]
pub struct RunReport {
    outcome: RunOutcome,
    tasks: BTreeMap<String, TaskRun>,
}

impl RunReport {
    pub(crate) fn from_runs(tasks: BTreeMap<String, TaskRun>) -> Self {
        let outcome = if tasks
            .values()
            .all(|run| run.status == TaskStatus::Succeeded)
        {
            RunOutcome::Success
        } else {
            RunOutcome::Failure
        };
        Self { outcome, tasks }
    }

    pub fn outcome(&self) -> RunOutcome {
        self.outcome
    }

    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Success
    }

    /// Snapshot for a single task, if it exists in the graph.
    pub fn task(&self, name: &str) -> Option<&TaskRun> {
        self.tasks.get(name)
    }

    /// All task snapshots in name order.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskRun> {
        self.tasks.values()
    }

    /// Tasks that never ran because an ancestor failed or the run was
    /// cancelled before they started.
    pub fn skipped(&self) -> impl Iterator<Item = &TaskRun> {
        self.tasks
            .values()
            .filter(|run| run.status == TaskStatus::Skipped)
    }

    /// Plain-text summary for CLI output.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let outcome = match self.outcome {
            RunOutcome::Success => "success",
            RunOutcome::Failure => "failure",
        };
        out.push_str(&format!("run outcome: {outcome}\n"));

        for run in self.tasks.values() {
            let status = match run.status {
                TaskStatus::Pending => "pending",
                TaskStatus::Running => "running",
                TaskStatus::Succeeded => "succeeded",
                TaskStatus::Failed => "failed",
                TaskStatus::Skipped => "skipped",
            };
            out.push_str(&format!(
                "  - {} {} (attempts: {})",
                run.name, status, run.attempts
            ));
            if let Some(dur) = run.duration() {
                out.push_str(&format!(" [{:.2?}]", dur));
            }
            out.push('\n');
            if let Some(ref err) = run.last_error {
                out.push_str(&format!("      last error: {err}\n"));
            }
        }

        out
    }
}
