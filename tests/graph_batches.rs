use std::collections::HashSet;
use std::error::Error;
use std::time::Duration;

use pipedag::dag::{task_fn, GraphError, Task, TaskGraph};

type TestResult = Result<(), Box<dyn Error>>;

fn noop_task(name: &str) -> Task {
    Task::new(name, task_fn(|| async { Ok(()) }), 1, Duration::ZERO)
}

fn pipeline_graph() -> Result<TaskGraph, GraphError> {
    // fetch_a, fetch_b -> merge -> report
    let mut graph = TaskGraph::new();
    graph.add_task(noop_task("fetch_a"))?;
    graph.add_task(noop_task("fetch_b"))?;
    graph.add_task(noop_task("merge"))?;
    graph.add_task(noop_task("report"))?;
    graph.add_dependency("fetch_a", "merge")?;
    graph.add_dependency("fetch_b", "merge")?;
    graph.add_dependency("merge", "report")?;
    Ok(graph)
}

#[test]
fn batches_respect_dependencies_and_partition_all_tasks() -> TestResult {
    let graph = pipeline_graph()?;

    let batches: Vec<Vec<&str>> = graph.topological_batches().collect();
    assert_eq!(
        batches,
        vec![vec!["fetch_a", "fetch_b"], vec!["merge"], vec!["report"]]
    );

    // Partition: every task exactly once.
    let mut seen = HashSet::new();
    for batch in &batches {
        for name in batch {
            assert!(seen.insert(*name), "task {name} appeared twice");
        }
    }
    assert_eq!(seen.len(), graph.len());

    Ok(())
}

#[test]
fn batches_are_restartable() -> TestResult {
    let graph = pipeline_graph()?;

    let first: Vec<Vec<&str>> = graph.topological_batches().collect();
    let second: Vec<Vec<&str>> = graph.topological_batches().collect();
    assert_eq!(first, second);

    Ok(())
}

#[test]
fn duplicate_task_name_is_rejected() -> TestResult {
    let mut graph = TaskGraph::new();
    graph.add_task(noop_task("a"))?;

    let err = graph.add_task(noop_task("a")).unwrap_err();
    assert!(matches!(err, GraphError::DuplicateTask(name) if name == "a"));
    assert_eq!(graph.len(), 1);

    Ok(())
}

#[test]
fn unknown_task_in_dependency_is_rejected() -> TestResult {
    let mut graph = TaskGraph::new();
    graph.add_task(noop_task("a"))?;

    let err = graph.add_dependency("a", "missing").unwrap_err();
    assert!(matches!(err, GraphError::UnknownTask(name) if name == "missing"));

    let err = graph.add_dependency("missing", "a").unwrap_err();
    assert!(matches!(err, GraphError::UnknownTask(name) if name == "missing"));

    Ok(())
}

#[test]
fn cycle_is_rejected_and_graph_left_unchanged() -> TestResult {
    let mut graph = TaskGraph::new();
    graph.add_task(noop_task("a"))?;
    graph.add_task(noop_task("b"))?;
    graph.add_task(noop_task("c"))?;
    graph.add_dependency("a", "b")?;
    graph.add_dependency("b", "c")?;

    let err = graph.add_dependency("c", "a").unwrap_err();
    assert!(matches!(err, GraphError::Cycle { .. }));

    // The rejected edge must not have been inserted.
    assert!(graph.dependencies_of("a").is_empty());
    assert_eq!(graph.dependents_of("c").len(), 0);

    let batches: Vec<Vec<&str>> = graph.topological_batches().collect();
    assert_eq!(batches, vec![vec!["a"], vec!["b"], vec!["c"]]);

    Ok(())
}

#[test]
fn self_dependency_is_a_cycle() -> TestResult {
    let mut graph = TaskGraph::new();
    graph.add_task(noop_task("a"))?;

    let err = graph.add_dependency("a", "a").unwrap_err();
    assert!(matches!(err, GraphError::Cycle { .. }));

    Ok(())
}

#[test]
fn duplicate_edge_does_not_double_count_in_degree() -> TestResult {
    let mut graph = TaskGraph::new();
    graph.add_task(noop_task("a"))?;
    graph.add_task(noop_task("b"))?;
    graph.add_dependency("a", "b")?;
    graph.add_dependency("a", "b")?;

    assert_eq!(graph.dependencies_of("b"), ["a".to_string()]);
    let batches: Vec<Vec<&str>> = graph.topological_batches().collect();
    assert_eq!(batches, vec![vec!["a"], vec!["b"]]);

    Ok(())
}

#[test]
fn downstream_closure_is_transitive() -> TestResult {
    let graph = pipeline_graph()?;

    let downstream = graph.downstream_of("fetch_a");
    assert_eq!(downstream.len(), 2);
    assert!(downstream.contains("merge"));
    assert!(downstream.contains("report"));
    assert!(graph.downstream_of("report").is_empty());

    Ok(())
}
