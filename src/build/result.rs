//! Build result types.
//!
//! Contains types for representing the outcome of task runs.

use crate::build::TaskName;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Format duration for display
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// Status of a single task run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Every file processed cleanly
    Success,
    /// The task ran to completion but some files failed
    Partial,
    /// The task could not run at all
    Failed(String),
}

impl TaskStatus {
    /// Check if the status indicates the task completed.
    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Partial)
    }

    /// Check if the status indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::Failed(_))
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Partial => write!(f, "completed with errors"),
            TaskStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// An error confined to one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileError {
    /// Path to the file containing the error
    pub file: PathBuf,
    /// Line number (1-indexed, None if unknown)
    pub line: Option<usize>,
    /// Error message
    pub message: String,
}

impl FileError {
    /// Create a new file error
    pub fn new(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self { file: file.into(), line: None, message: message.into() }
    }

    /// Create a file error with line information
    pub fn with_line(file: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self { file: file.into(), line: Some(line), message: message.into() }
    }
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file.display())?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Result of running a single task.
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Task that ran
    pub task: TaskName,
    /// Run status
    pub status: TaskStatus,
    /// Output files produced
    pub outputs: Vec<PathBuf>,
    /// Per-file errors (non-fatal)
    pub file_errors: Vec<FileError>,
    /// Warning messages (if any)
    pub warnings: Vec<String>,
    /// Run duration
    pub duration: Duration,
}

impl TaskResult {
    /// Create a result from the outputs and per-file errors of a finished run.
    pub fn completed(
        task: TaskName,
        outputs: Vec<PathBuf>,
        file_errors: Vec<FileError>,
        duration: Duration,
    ) -> Self {
        let status = if file_errors.is_empty() { TaskStatus::Success } else { TaskStatus::Partial };
        Self { task, status, outputs, file_errors, warnings: vec![], duration }
    }

    /// Create a successful result.
    pub fn success(task: TaskName, outputs: Vec<PathBuf>, duration: Duration) -> Self {
        Self::completed(task, outputs, vec![], duration)
    }

    /// Create a failed result.
    pub fn failed(task: TaskName, error: String, duration: Duration) -> Self {
        Self {
            task,
            status: TaskStatus::Failed(error),
            outputs: vec![],
            file_errors: vec![],
            warnings: vec![],
            duration,
        }
    }

    /// Add warnings to the result.
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Check if this result completed.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Result of a complete graph run.
#[derive(Debug, Default)]
pub struct BuildResult {
    /// Results for each task, in completion order
    pub tasks: Vec<TaskResult>,
    /// Total duration
    pub total_duration: Duration,
}

impl BuildResult {
    /// Create a new empty build result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task result.
    pub fn add_result(&mut self, result: TaskResult) {
        self.tasks.push(result);
    }

    /// Set the total duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    /// Find the result of a task.
    pub fn get(&self, task: TaskName) -> Option<&TaskResult> {
        self.tasks.iter().find(|r| r.task == task)
    }

    /// Number of tasks that failed outright.
    pub fn failed_count(&self) -> usize {
        self.tasks.iter().filter(|r| r.status.is_failure()).count()
    }

    /// Total number of per-file errors.
    pub fn file_error_count(&self) -> usize {
        self.tasks.iter().map(|r| r.file_errors.len()).sum()
    }

    /// Check if every task completed (per-file errors allowed).
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Check if every task completed without any per-file error.
    pub fn is_clean(&self) -> bool {
        self.is_success() && self.file_error_count() == 0
    }

    /// Get all outputs produced.
    pub fn all_outputs(&self) -> Vec<&PathBuf> {
        self.tasks.iter().flat_map(|r| r.outputs.iter()).collect()
    }

    /// Get all per-file errors.
    pub fn all_file_errors(&self) -> Vec<&FileError> {
        self.tasks.iter().flat_map(|r| r.file_errors.iter()).collect()
    }

    /// Get all warnings.
    pub fn all_warnings(&self) -> Vec<&String> {
        self.tasks.iter().flat_map(|r| r.warnings.iter()).collect()
    }

    /// Get failed task results.
    pub fn failures(&self) -> Vec<&TaskResult> {
        self.tasks.iter().filter(|r| r.status.is_failure()).collect()
    }

    /// Format a summary of the build result.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        let failed = self.failed_count();
        let file_errors = self.file_error_count();
        let outputs = self.all_outputs().len();
        let total = self.tasks.len();

        if failed > 0 {
            lines.push(format!(
                "Build failed: {} of {} tasks failed, {} file error{}",
                failed,
                total,
                file_errors,
                if file_errors == 1 { "" } else { "s" }
            ));
            for task in self.failures() {
                lines.push(format!("  - {}: {}", task.task, task.status));
            }
        } else if file_errors > 0 {
            lines.push(format!(
                "Build finished with {} file error{}: {} tasks, {} outputs in {}",
                file_errors,
                if file_errors == 1 { "" } else { "s" },
                total,
                outputs,
                format_duration(self.total_duration)
            ));
        } else {
            lines.push(format!(
                "Build succeeded: {} tasks, {} outputs in {}",
                total,
                outputs,
                format_duration(self.total_duration)
            ));
        }

        for error in self.all_file_errors() {
            lines.push(format!("  - {}", error));
        }

        let warnings = self.all_warnings();
        if !warnings.is_empty() {
            lines.push(format!("Warnings ({}): ", warnings.len()));
            for warning in warnings.iter().take(5) {
                lines.push(format!("  - {}", warning));
            }
            if warnings.len() > 5 {
                lines.push(format!("  ... and {} more", warnings.len() - 5));
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Category;

    const SCRIPTS: TaskName = TaskName::Transform(Category::Scripts);
    const STYLES: TaskName = TaskName::Transform(Category::Styles);

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }

    #[test]
    fn test_task_status_display() {
        assert_eq!(TaskStatus::Success.to_string(), "success");
        assert_eq!(TaskStatus::Partial.to_string(), "completed with errors");
        assert_eq!(TaskStatus::Failed("boom".to_string()).to_string(), "failed: boom");
    }

    #[test]
    fn test_task_status_is_success() {
        assert!(TaskStatus::Success.is_success());
        assert!(TaskStatus::Partial.is_success());
        assert!(!TaskStatus::Failed("error".to_string()).is_success());
    }

    #[test]
    fn test_completed_with_file_errors_is_partial() {
        let result = TaskResult::completed(
            STYLES,
            vec![PathBuf::from("style.css")],
            vec![FileError::with_line("src/css/bad.scss", 3, "unclosed block")],
            Duration::ZERO,
        );
        assert_eq!(result.status, TaskStatus::Partial);
        assert!(result.is_success());
    }

    #[test]
    fn test_file_error_display() {
        let error = FileError::with_line("src/css/bad.scss", 7, "expected ':'");
        assert_eq!(error.to_string(), "src/css/bad.scss:7: expected ':'");
        let error = FileError::new("src/img/x.png", "decode failed");
        assert_eq!(error.to_string(), "src/img/x.png: decode failed");
    }

    #[test]
    fn test_build_result_counts() {
        let mut result = BuildResult::new();
        result.add_result(TaskResult::success(SCRIPTS, vec![], Duration::ZERO));
        result.add_result(TaskResult::completed(
            STYLES,
            vec![],
            vec![FileError::new("a.scss", "x")],
            Duration::ZERO,
        ));
        result.add_result(TaskResult::failed(TaskName::Clean, "denied".into(), Duration::ZERO));

        assert_eq!(result.failed_count(), 1);
        assert_eq!(result.file_error_count(), 1);
        assert!(!result.is_success());
        assert_eq!(result.get(STYLES).map(|r| r.status.clone()), Some(TaskStatus::Partial));
    }

    #[test]
    fn test_build_result_partial_is_success_not_clean() {
        let mut result = BuildResult::new();
        result.add_result(TaskResult::completed(
            STYLES,
            vec![],
            vec![FileError::new("a.scss", "x")],
            Duration::ZERO,
        ));
        assert!(result.is_success());
        assert!(!result.is_clean());
    }

    #[test]
    fn test_build_result_summary() {
        let mut result = BuildResult::new();
        result.add_result(TaskResult::success(
            SCRIPTS,
            vec![PathBuf::from("release/js/popup.js")],
            Duration::from_millis(10),
        ));
        let summary = result.with_duration(Duration::from_millis(10)).summary();
        assert!(summary.contains("Build succeeded"));
        assert!(summary.contains("1 outputs"));
    }

    #[test]
    fn test_build_result_summary_lists_file_errors() {
        let mut result = BuildResult::new();
        result.add_result(TaskResult::completed(
            STYLES,
            vec![],
            vec![FileError::with_line("src/css/bad.scss", 2, "unclosed block")],
            Duration::ZERO,
        ));
        let summary = result.summary();
        assert!(summary.contains("1 file error"));
        assert!(summary.contains("src/css/bad.scss:2: unclosed block"));
    }
}
