//! Build pipeline execution.
//!
//! [`Pipeline`] runs the tasks of a target's graph against one build
//! context, or describes what they would do in a dry run.

use crate::build::graph::run_logged;
use crate::build::{
    discover_script_entries, evaluate, BuildContext, BuildResult, TaskName, TaskNode, TaskResult,
    TaskRunner, Target,
};
use crate::config::Category;
use crate::tasks::{self, clean, run_transform, TaskError};
use crate::watch::watch;
use std::fmt::Write as _;
use std::time::Instant;

/// Runs tasks against a build context.
pub struct Pipeline {
    context: BuildContext,
}

impl Pipeline {
    /// Create a new pipeline.
    pub fn new(context: BuildContext) -> Self {
        Self { context }
    }

    /// Get the build context.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Run the graph of `target`.
    pub fn run(&self, target: Target) -> BuildResult {
        let graph = target.graph();
        log::debug!("Running {}: {}", target, graph);
        evaluate(&graph, self)
    }

    /// Describe what `target` would do without touching the filesystem.
    pub fn dry_run(&self, target: Target) -> Result<String, TaskError> {
        let graph = target.graph();
        let mut out = String::new();
        let _ = writeln!(out, "{}: {}", target, graph);
        for task in graph.tasks() {
            self.describe_task(task, &mut out)?;
        }
        Ok(out)
    }

    fn describe_task(&self, task: TaskName, out: &mut String) -> Result<(), TaskError> {
        let ctx = &self.context;
        match task {
            TaskName::Clean => {
                let _ = writeln!(out, "\n{}: delete {}", task, ctx.display_path(&ctx.out_dir()));
            }
            TaskName::Watch => {
                let globs: usize = Category::ALL.iter().map(|c| ctx.path_spec(*c).sources.len()).sum();
                let _ = writeln!(out, "\n{}: re-run tasks on changes to {} glob(s)", task, globs);
            }
            TaskName::Transform(category) => {
                let files = match category {
                    Category::Scripts => discover_script_entries(ctx)?,
                    Category::Styles => tasks::sources(ctx, category)?
                        .into_iter()
                        .filter(|f| !tasks::styles::is_partial(f))
                        .collect(),
                    _ => tasks::sources(ctx, category)?,
                };
                let dest = ctx.dest_dir(category);
                let _ = writeln!(
                    out,
                    "\n{}: {} file(s) -> {}",
                    task,
                    files.len(),
                    ctx.display_path(&dest)
                );
                for file in &files {
                    let _ = writeln!(out, "  {}", ctx.display_path(file));
                }
            }
        }
        Ok(())
    }
}

impl TaskRunner for Pipeline {
    fn run_task(&self, task: TaskName) -> TaskResult {
        let start = Instant::now();
        match task {
            TaskName::Clean => match clean(&self.context) {
                Ok(_) => TaskResult::success(task, vec![], start.elapsed()),
                Err(e) => TaskResult::failed(task, e.to_string(), start.elapsed()),
            },
            TaskName::Transform(category) => match run_transform(&self.context, category) {
                Ok(output) => {
                    TaskResult::completed(task, output.outputs, output.file_errors, start.elapsed())
                        .with_warnings(output.warnings)
                }
                Err(e) => TaskResult::failed(task, e.to_string(), start.elapsed()),
            },
            TaskName::Watch => {
                let rerun = |category: Category| {
                    run_logged(TaskName::Transform(category), self);
                };
                match watch(&self.context, &rerun) {
                    Ok(()) => TaskResult::success(task, vec![], start.elapsed()),
                    Err(e) => TaskResult::failed(task, e.to_string(), start.elapsed()),
                }
            }
        }
    }
}

/// Render a task graph one node per line, for verbose output.
pub fn format_graph(node: &TaskNode) -> String {
    fn walk(node: &TaskNode, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        match node {
            TaskNode::Task(task) => {
                let _ = writeln!(out, "{}{}", indent, task);
            }
            TaskNode::Series(children) | TaskNode::Parallel(children) => {
                let kind = if matches!(node, TaskNode::Series(_)) { "series" } else { "parallel" };
                let _ = writeln!(out, "{}{}", indent, kind);
                for child in children {
                    walk(child, depth + 1, out);
                }
            }
        }
    }
    let mut out = String::new();
    walk(node, 0, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::TaskStatus;
    use crate::config::{default_config, BuildMode, EnvironmentFlags};
    use crate::tasks::write_output;
    use std::path::Path;
    use tempfile::TempDir;

    fn create_test_project() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write_output(&root.join("manifest.json"), "{ \"version\": \"1.0.0.1\" }\n").unwrap();
        write_output(&root.join("src/js/popup.js"), "console.log('popup');\n").unwrap();
        write_output(&root.join("src/css/popup.scss"), ".a { .b { color: red; } }\n").unwrap();
        write_output(&root.join("src/css/_partial.scss"), "$x: 1px;\n").unwrap();
        temp
    }

    fn pipeline(root: &Path) -> Pipeline {
        let ctx = BuildContext::new(default_config(), root.to_path_buf())
            .with_flags(EnvironmentFlags::from(BuildMode::Development));
        Pipeline::new(ctx)
    }

    #[test]
    fn test_publish_cleans_then_builds() {
        let temp = create_test_project();
        let stale = temp.path().join("release/stale.txt");
        write_output(&stale, "old").unwrap();

        let result = pipeline(temp.path()).run(Target::Publish);
        assert!(result.is_clean(), "{}", result.summary());
        assert_eq!(result.tasks[0].task, TaskName::Clean);
        assert_eq!(result.tasks.len(), 5);

        assert!(!stale.exists());
        assert!(temp.path().join("release/js/popup.js").exists());
        assert!(temp.path().join("release/css/style.css").exists());
        assert!(temp.path().join("release/manifest.json").exists());
    }

    #[test]
    fn test_unsafe_clean_stops_publish() {
        let temp = create_test_project();
        let mut config = default_config();
        config.project.out = ".".into();
        let pipeline = Pipeline::new(BuildContext::new(config, temp.path().to_path_buf()));

        let result = pipeline.run(Target::Publish);
        assert_eq!(result.tasks.len(), 1);
        assert!(matches!(result.tasks[0].status, TaskStatus::Failed(_)));
        assert!(temp.path().join("manifest.json").exists());
    }

    #[test]
    fn test_dry_run_lists_files_without_writing() {
        let temp = create_test_project();
        let plan = pipeline(temp.path()).dry_run(Target::Publish).unwrap();
        assert!(plan.starts_with("publish: series(clean, parallel(scripts, styles, images, copy))"));
        assert!(plan.contains("src/js/popup.js"));
        assert!(plan.contains("src/css/popup.scss"));
        assert!(!plan.contains("_partial.scss"));
        assert!(!temp.path().join("release").exists());
    }

    #[test]
    fn test_format_graph() {
        let text = format_graph(&Target::Publish.graph());
        assert_eq!(text, "series\n  clean\n  parallel\n    scripts\n    styles\n    images\n    copy\n");
    }
}
