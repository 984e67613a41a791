// src/dag/mod.rs

//! Task and dependency-graph definitions.
//!
//! - [`task`] defines the named unit of work and its retry policy.
//! - [`graph`] holds the directed acyclic graph of tasks and produces the
//!   ready-set batches the executor walks.

pub mod graph;
pub mod task;

pub use graph::{GraphError, TaskGraph, TopologicalBatches};
pub use task::{task_fn, BodyFuture, Task, TaskBody};
