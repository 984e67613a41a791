use std::error::Error;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use pipedag::dag::{task_fn, Task, TaskGraph};
use pipedag::engine::{Executor, ExecutorOptions, TaskStatus};

type TestResult = Result<(), Box<dyn Error>>;

fn sleeping_task(name: &str, sleep_for: Duration) -> Task {
    Task::new(
        name,
        task_fn(move || async move {
            tokio::time::sleep(sleep_for).await;
            Ok(())
        }),
        1,
        Duration::ZERO,
    )
}

fn two_sleepers() -> Result<TaskGraph, Box<dyn Error>> {
    let mut graph = TaskGraph::new();
    graph.add_task(sleeping_task("left", Duration::from_millis(150)))?;
    graph.add_task(sleeping_task("right", Duration::from_millis(150)))?;
    Ok(graph)
}

#[tokio::test]
async fn independent_tasks_in_one_batch_run_in_parallel() -> TestResult {
    let graph = two_sleepers()?;

    let started = Instant::now();
    let report = Executor::new().run(&graph).await;
    let elapsed = started.elapsed();

    // Wall time should approximate max(150ms, 150ms), not the 300ms sum.
    assert!(
        elapsed < Duration::from_millis(280),
        "batch took {elapsed:?}, tasks appear to have run sequentially"
    );
    assert!(report.is_success());

    Ok(())
}

#[tokio::test]
async fn concurrency_limit_of_one_serializes_a_batch() -> TestResult {
    let graph = two_sleepers()?;

    let executor = Executor::with_options(ExecutorOptions {
        concurrency: Some(1),
    });

    let started = Instant::now();
    let report = executor.run(&graph).await;
    let elapsed = started.elapsed();

    assert!(
        elapsed >= Duration::from_millis(300),
        "batch took {elapsed:?}, limit of 1 should force sequential execution"
    );
    assert!(report.is_success());

    Ok(())
}

#[tokio::test]
async fn same_graph_can_run_twice_with_independent_state() -> TestResult {
    let calls = Arc::new(AtomicU32::new(0));

    let mut graph = TaskGraph::new();
    {
        let calls = calls.clone();
        graph.add_task(Task::new(
            "only",
            task_fn(move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
            3,
            Duration::ZERO,
        ))?;
    }

    let executor = Executor::new();
    let first = executor.run(&graph).await;
    let second = executor.run(&graph).await;

    assert!(first.is_success());
    assert!(second.is_success());
    // Attempt counts are per-run, not cumulative.
    assert_eq!(first.task("only").ok_or("only")?.attempts, 1);
    assert_eq!(second.task("only").ok_or("only")?.attempts, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    Ok(())
}

#[tokio::test]
async fn batch_waits_for_slowest_member_before_advancing() -> TestResult {
    // fast and slow are one batch; literally anything downstream must see
    // both finished.
    let order = Arc::new(std::sync::Mutex::new(Vec::<&'static str>::new()));

    let mut graph = TaskGraph::new();
    {
        let order = order.clone();
        graph.add_task(Task::new(
            "fast",
            task_fn(move || {
                let order = order.clone();
                async move {
                    order.lock().unwrap().push("fast");
                    Ok(())
                }
            }),
            1,
            Duration::ZERO,
        ))?;
    }
    {
        let order = order.clone();
        graph.add_task(Task::new(
            "slow",
            task_fn(move || {
                let order = order.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    order.lock().unwrap().push("slow");
                    Ok(())
                }
            }),
            1,
            Duration::ZERO,
        ))?;
    }
    {
        let order = order.clone();
        graph.add_task(Task::new(
            "joined",
            task_fn(move || {
                let order = order.clone();
                async move {
                    order.lock().unwrap().push("joined");
                    Ok(())
                }
            }),
            1,
            Duration::ZERO,
        ))?;
    }
    graph.add_dependency("fast", "joined")?;
    graph.add_dependency("slow", "joined")?;

    let report = Executor::new().run(&graph).await;
    assert!(report.is_success());
    assert_eq!(report.task("joined").ok_or("joined")?.status, TaskStatus::Succeeded);

    let order = order.lock().unwrap();
    assert_eq!(order.last(), Some(&"joined"));
    assert!(order[..order.len() - 1].contains(&"fast"));
    assert!(order[..order.len() - 1].contains(&"slow"));

    Ok(())
}
