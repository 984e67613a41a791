// src/dag/task.rs

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

/// Future produced by one invocation of a task body.
pub type BodyFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// A task body: a zero-argument async callable that reports success or a
/// typed error. The engine invokes it once per attempt, so bodies must be
/// safe to re-run after a failed attempt (overwrite outputs, don't append).
///
/// Bodies communicate only through their return value; any side effects
/// (network, filesystem) are their own concern and invisible to the engine.
pub type TaskBody = Arc<dyn Fn() -> BodyFuture + Send + Sync>;

/// Wrap an async closure as a [`TaskBody`].
pub fn task_fn<F, Fut>(f: F) -> TaskBody
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

/// A named unit of work plus its retry policy.
///
/// Immutable once added to a graph. The body is behind an `Arc` so the
/// executor can hand a clone to a spawned worker without borrowing the graph
/// across the spawn.
#[derive(Clone)]
pub struct Task {
    name: String,
    body: TaskBody,
    max_attempts: u32,
    retry_delay: Duration,
}

impl Task {
    /// Create a task. `max_attempts` is clamped to at least 1, as a task
    /// that is never attempted has no meaningful status.
    pub fn new(
        name: impl Into<String>,
        body: TaskBody,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            body,
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> TaskBody {
        Arc::clone(&self.body)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}
