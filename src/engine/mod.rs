// src/engine/mod.rs

//! Execution engine.
//!
//! This module ties together:
//! - the executor's batch-at-a-time run loop with retry and skip propagation
//! - the run report handed back to callers
//!
//! The executor answers exactly one question: "run this graph once, now".
//! Anything recurring (cron-style triggers, calendars) lives outside.

pub mod executor;
pub mod report;

pub use executor::{Executor, ExecutorOptions};
pub use report::{RunOutcome, RunReport, TaskRun, TaskStatus};
