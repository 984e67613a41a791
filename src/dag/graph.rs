// src/dag/graph.rs

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use thiserror::Error;

use crate::dag::task::Task;

/// Errors that can occur while building a [`TaskGraph`].
///
/// All of these are construction-time: a graph that was built without error
/// can always be executed, and the executor never has to re-check for cycles
/// or dangling references mid-run.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("task '{0}' is already defined")]
    DuplicateTask(String),

    #[error("unknown task '{0}' referenced in dependency")]
    UnknownTask(String),

    #[error("dependency '{upstream}' -> '{downstream}' would create a cycle")]
    Cycle {
        upstream: String,
        downstream: String,
    },
}

/// Internal node structure: the task itself plus adjacency in both directions.
#[derive(Debug)]
struct GraphNode {
    task: Task,
    /// Direct dependencies: tasks that must succeed before this one can run.
    deps: Vec<String>,
    /// Direct dependents: tasks that list this one as a dependency.
    dependents: Vec<String>,
}

/// An immutable-once-built set of tasks plus directed dependency edges.
///
/// A `TaskGraph` is constructed by a caller (there is no process-wide
/// registry), validated edge by edge, then handed to the executor read-only.
/// The same graph can be executed any number of times; per-run state lives
/// entirely in the executor.
///
/// Tasks are keyed by name in a `BTreeMap` so iteration order (and therefore
/// batch order among independent tasks) is stable across runs.
#[derive(Debug, Default)]
pub struct TaskGraph {
    nodes: BTreeMap<String, GraphNode>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task to the graph.
    ///
    /// Fails with [`GraphError::DuplicateTask`] if a task with the same name
    /// already exists; the graph is left unchanged in that case.
    pub fn add_task(&mut self, task: Task) -> Result<(), GraphError> {
        if self.nodes.contains_key(task.name()) {
            return Err(GraphError::DuplicateTask(task.name().to_string()));
        }
        self.nodes.insert(
            task.name().to_string(),
            GraphNode {
                task,
                deps: Vec::new(),
                dependents: Vec::new(),
            },
        );
        Ok(())
    }

    /// Declare that `downstream` must not start before `upstream` succeeded.
    ///
    /// Both names must refer to tasks already added. The edge is rejected
    /// with [`GraphError::Cycle`] if inserting it would make some task its
    /// own transitive dependency (a self-edge is the one-task case of this).
    /// On any error the graph is left unchanged.
    pub fn add_dependency(&mut self, upstream: &str, downstream: &str) -> Result<(), GraphError> {
        if !self.nodes.contains_key(upstream) {
            return Err(GraphError::UnknownTask(upstream.to_string()));
        }
        if !self.nodes.contains_key(downstream) {
            return Err(GraphError::UnknownTask(downstream.to_string()));
        }

        self.check_acyclic_with(upstream, downstream)?;

        // Ignore an exact duplicate edge rather than double-counting it in
        // the in-degree bookkeeping of `topological_batches`.
        let node = self
            .nodes
            .get_mut(downstream)
            .ok_or_else(|| GraphError::UnknownTask(downstream.to_string()))?;
        if node.deps.iter().any(|d| d == upstream) {
            return Ok(());
        }
        node.deps.push(upstream.to_string());

        let node = self
            .nodes
            .get_mut(upstream)
            .ok_or_else(|| GraphError::UnknownTask(upstream.to_string()))?;
        node.dependents.push(downstream.to_string());

        Ok(())
    }

    /// Run a topological sort over the current edges plus the candidate edge.
    ///
    /// Edge direction: dep -> task, so for "B after A" we check A -> B.
    fn check_acyclic_with(&self, upstream: &str, downstream: &str) -> Result<(), GraphError> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for name in self.nodes.keys() {
            graph.add_node(name.as_str());
        }
        for (name, node) in self.nodes.iter() {
            for dep in node.deps.iter() {
                graph.add_edge(dep.as_str(), name.as_str(), ());
            }
        }
        graph.add_edge(upstream, downstream, ());

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(_cycle) => Err(GraphError::Cycle {
                upstream: upstream.to_string(),
                downstream: downstream.to_string(),
            }),
        }
    }

    /// Number of tasks in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a task by name.
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.nodes.get(name).map(|n| &n.task)
    }

    /// All task names, in stable (sorted) order.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.nodes.get(name).map(|n| n.deps.as_slice()).unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// All tasks reachable from `name` via dependency edges, not including
    /// `name` itself. This is the set that must be skipped when `name` fails.
    pub fn downstream_of(&self, name: &str) -> HashSet<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut stack: Vec<String> = self.dependents_of(name).to_vec();

        while let Some(current) = stack.pop() {
            if seen.insert(current.clone()) {
                stack.extend(self.dependents_of(&current).iter().cloned());
            }
        }

        seen
    }

    /// Kahn's-algorithm ready sets.
    ///
    /// Yields batches of task names where every batch contains only tasks
    /// whose dependencies all appeared in earlier batches. Tasks within one
    /// batch have no dependency relationship and may run concurrently. The
    /// iterator is a pure function of the graph, so calling this again
    /// restarts from the first batch.
    pub fn topological_batches(&self) -> TopologicalBatches<'_> {
        let in_degree: HashMap<&str, usize> = self
            .nodes
            .iter()
            .map(|(name, node)| (name.as_str(), node.deps.len()))
            .collect();

        TopologicalBatches {
            graph: self,
            in_degree,
        }
    }
}

/// Lazy iterator over ready sets, produced by [`TaskGraph::topological_batches`].
pub struct TopologicalBatches<'a> {
    graph: &'a TaskGraph,
    in_degree: HashMap<&'a str, usize>,
}

impl<'a> Iterator for TopologicalBatches<'a> {
    type Item = Vec<&'a str>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.in_degree.is_empty() {
            return None;
        }

        // Stable order within a batch: iterate the BTreeMap keys, not the
        // in-degree hash map.
        let batch: Vec<&'a str> = self
            .graph
            .nodes
            .keys()
            .map(|s| s.as_str())
            .filter(|name| self.in_degree.get(name).copied() == Some(0))
            .collect();

        // Acyclicity is enforced at construction, so an empty batch with
        // entries remaining cannot happen; bail out instead of spinning.
        if batch.is_empty() {
            return None;
        }

        for name in &batch {
            self.in_degree.remove(name);
            for dependent in self.graph.dependents_of(name) {
                if let Some(deg) = self.in_degree.get_mut(dependent.as_str()) {
                    *deg = deg.saturating_sub(1);
                }
            }
        }

        Some(batch)
    }
}
