//! Task graph evaluation.
//!
//! A graph is a tree of `Series` and `Parallel` nodes over named tasks. A
//! series runs its children in order and stops after a child that failed
//! outright; a parallel node runs every child on its own scoped thread and
//! waits for all of them. Nothing is ever cancelled.

use crate::build::result::format_duration;
use crate::build::{BuildResult, TaskName, TaskResult, TaskStatus};
use std::fmt;
use std::time::{Duration, Instant};

/// A node of the task graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskNode {
    Task(TaskName),
    Series(Vec<TaskNode>),
    Parallel(Vec<TaskNode>),
}

impl TaskNode {
    /// Every task in the graph, in declaration order.
    pub fn tasks(&self) -> Vec<TaskName> {
        let mut out = Vec::new();
        self.collect_tasks(&mut out);
        out
    }

    fn collect_tasks(&self, out: &mut Vec<TaskName>) {
        match self {
            TaskNode::Task(task) => out.push(*task),
            TaskNode::Series(children) | TaskNode::Parallel(children) => {
                for child in children {
                    child.collect_tasks(out);
                }
            }
        }
    }

    /// Check whether a task appears anywhere in the graph.
    pub fn contains(&self, task: TaskName) -> bool {
        self.tasks().contains(&task)
    }
}

impl fmt::Display for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, children) = match self {
            TaskNode::Task(task) => return write!(f, "{}", task),
            TaskNode::Series(children) => ("series", children),
            TaskNode::Parallel(children) => ("parallel", children),
        };
        write!(f, "{}(", name)?;
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", child)?;
        }
        write!(f, ")")
    }
}

/// Executes individual tasks on behalf of the graph evaluator.
///
/// Implementations are shared across the threads of parallel nodes.
pub trait TaskRunner: Sync {
    fn run_task(&self, task: TaskName) -> TaskResult;
}

/// Evaluate a task graph, returning every task result in completion order.
pub fn evaluate<R: TaskRunner + ?Sized>(node: &TaskNode, runner: &R) -> BuildResult {
    let start = Instant::now();
    let mut result = BuildResult::new();
    for task_result in run_node(node, runner) {
        result.add_result(task_result);
    }
    result.with_duration(start.elapsed())
}

fn run_node<R: TaskRunner + ?Sized>(node: &TaskNode, runner: &R) -> Vec<TaskResult> {
    match node {
        TaskNode::Task(task) => vec![run_logged(*task, runner)],
        TaskNode::Series(children) => {
            let mut results = Vec::new();
            for child in children {
                let child_results = run_node(child, runner);
                let failed = child_results.iter().any(|r| r.status.is_failure());
                results.extend(child_results);
                if failed {
                    log::error!("Stopping '{}' after a failed step", node);
                    break;
                }
            }
            results
        }
        TaskNode::Parallel(children) => std::thread::scope(|s| {
            let handles: Vec<_> = children
                .iter()
                .map(|child| (child, s.spawn(move || run_node(child, runner))))
                .collect();

            handles
                .into_iter()
                .flat_map(|(child, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        child
                            .tasks()
                            .into_iter()
                            .map(|t| TaskResult::failed(t, "task panicked".into(), Duration::ZERO))
                            .collect()
                    })
                })
                .collect()
        }),
    }
}

/// Run one task between "Starting" and "Finished" log lines.
pub fn run_logged<R: TaskRunner + ?Sized>(task: TaskName, runner: &R) -> TaskResult {
    log::info!("Starting '{}'...", task);
    let result = runner.run_task(task);
    match &result.status {
        TaskStatus::Failed(reason) => {
            log::error!("'{}' errored after {}: {}", task, format_duration(result.duration), reason)
        }
        _ => {
            for error in &result.file_errors {
                log::error!("[{}] {}", task, error);
            }
            log::info!("Finished '{}' after {}", task, format_duration(result.duration));
        }
    }
    result
}
