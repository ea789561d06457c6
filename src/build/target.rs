//! Task names and the named entry points composed from them.

use crate::build::TaskNode;
use crate::config::Category;
use std::fmt;

/// A named unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskName {
    /// Delete the release directory
    Clean,
    /// Run one category's transform
    Transform(Category),
    /// Re-run transforms on source changes (never returns)
    Watch,
}

impl TaskName {
    /// Category of a transform task.
    pub fn category(&self) -> Option<Category> {
        match self {
            TaskName::Transform(category) => Some(*category),
            _ => None,
        }
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskName::Clean => write!(f, "clean"),
            TaskName::Transform(category) => write!(f, "{}", category),
            TaskName::Watch => write!(f, "watch"),
        }
    }
}

/// Runnable entry points composed from tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// All category transforms, in parallel
    Build,
    /// clean, then build, then watch
    Serve,
    /// clean, then build
    Publish,
    /// Delete the release directory
    Clean,
}

impl Target {
    /// Task graph of this entry point.
    pub fn graph(self) -> TaskNode {
        match self {
            Target::Build => build_graph(),
            Target::Serve => TaskNode::Series(vec![
                TaskNode::Task(TaskName::Clean),
                build_graph(),
                TaskNode::Task(TaskName::Watch),
            ]),
            Target::Publish => {
                TaskNode::Series(vec![TaskNode::Task(TaskName::Clean), build_graph()])
            }
            Target::Clean => TaskNode::Task(TaskName::Clean),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Build => write!(f, "build"),
            Target::Serve => write!(f, "serve"),
            Target::Publish => write!(f, "publish"),
            Target::Clean => write!(f, "clean"),
        }
    }
}

fn build_graph() -> TaskNode {
    TaskNode::Parallel(
        Category::ALL.iter().map(|c| TaskNode::Task(TaskName::Transform(*c))).collect(),
    )
}
