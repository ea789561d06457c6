//! Source linting for scripts and stylesheets
//!
//! Each linter checks one file's text against a fixed rule set and returns
//! [`Finding`]s. [`LintReport`] collects the findings of many files and
//! prints them grouped by file.

pub mod script;
pub mod style;

use crate::build::{discover_category, BuildContext, DiscoveryError};
use crate::config::Category;
use std::fmt;
use std::path::{Path, PathBuf};

/// Severity of a lint finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A rule violation at a position in a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub file: PathBuf,
    /// 1-indexed
    pub line: usize,
    /// 1-indexed
    pub col: usize,
    pub rule: &'static str,
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    pub fn error(
        file: &Path,
        (line, col): (usize, usize),
        rule: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.to_path_buf(),
            line,
            col,
            rule,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(
        file: &Path,
        (line, col): (usize, usize),
        rule: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self { severity: Severity::Warning, ..Self::error(file, (line, col), rule, message) }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}  {}  {}  {}",
            self.file.display(),
            self.line,
            self.col,
            self.severity,
            self.message,
            self.rule
        )
    }
}

/// Linter entry point: file path and contents in, findings out.
pub type LintFn = fn(&Path, &str) -> Vec<Finding>;

/// Findings of a lint run over several files
#[derive(Debug, Clone, Default)]
pub struct LintReport {
    pub files_checked: usize,
    pub findings: Vec<Finding>,
}

impl LintReport {
    pub fn error_count(&self) -> usize {
        self.findings.iter().filter(|f| f.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.findings.len() - self.error_count()
    }

    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(Finding::is_error)
    }

    /// Findings sorted by file then position, for display.
    pub fn sorted(&self) -> Vec<&Finding> {
        let mut sorted: Vec<&Finding> = self.findings.iter().collect();
        sorted.sort_by(|a, b| (&a.file, a.line, a.col).cmp(&(&b.file, b.line, b.col)));
        sorted
    }

    /// Print every finding grouped by file, then a summary line.
    pub fn print(&self) {
        let mut current: Option<&Path> = None;
        for finding in self.sorted() {
            if current != Some(finding.file.as_path()) {
                if current.is_some() {
                    println!();
                }
                println!("{}", finding.file.display());
                current = Some(&finding.file);
            }
            println!("  {}", finding);
        }
        if !self.findings.is_empty() {
            println!();
        }
        println!(
            "{} file(s) checked: {} error(s), {} warning(s)",
            self.files_checked,
            self.error_count(),
            self.warning_count()
        );
    }
}

/// Lint one file from disk; an unreadable file is an error finding.
pub fn lint_file(path: &Path, linter: LintFn) -> Vec<Finding> {
    match std::fs::read_to_string(path) {
        Ok(source) => linter(path, &source),
        Err(e) => vec![Finding::error(path, (1, 1), "read-error", e.to_string())],
    }
}

/// Lint every file in `paths`.
pub fn lint_files(paths: &[PathBuf], linter: LintFn) -> LintReport {
    let findings = paths.iter().flat_map(|path| lint_file(path, linter)).collect();
    LintReport { files_checked: paths.len(), findings }
}

/// Lint every file under the scripts source globs.
pub fn lint_scripts(ctx: &BuildContext) -> Result<LintReport, DiscoveryError> {
    let files = discover_category(ctx, Category::Scripts)?;
    Ok(lint_files(&files, script::lint))
}

/// Lint every file under the styles source globs.
pub fn lint_styles(ctx: &BuildContext) -> Result<LintReport, DiscoveryError> {
    let files = discover_category(ctx, Category::Styles)?;
    Ok(lint_files(&files, style::lint))
}

/// Log findings from an inline lint inside a transform task.
pub fn log_findings(ctx: &BuildContext, findings: &[Finding]) {
    for finding in findings {
        let line = format!(
            "{}:{}:{}  {}  {}",
            ctx.display_path(&finding.file),
            finding.line,
            finding.col,
            finding.message,
            finding.rule
        );
        match finding.severity {
            Severity::Error => log::error!("{}", line),
            Severity::Warning => log::warn!("{}", line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_finding_display() {
        let finding = Finding::error(Path::new("src/js/a.js"), (3, 7), "eqeqeq", "Expected '==='");
        assert_eq!(finding.to_string(), "src/js/a.js:3:7  error  Expected '==='  eqeqeq");
    }

    #[test]
    fn test_report_counts() {
        let report = LintReport {
            files_checked: 2,
            findings: vec![
                Finding::warning(Path::new("b.js"), (1, 1), "no-var", "x"),
                Finding::error(Path::new("a.js"), (2, 1), "no-debugger", "y"),
                Finding::warning(Path::new("a.js"), (1, 5), "eol-last", "z"),
            ],
        };
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.warning_count(), 2);
        assert!(report.has_errors());

        let order: Vec<_> = report.sorted().iter().map(|f| f.rule).collect();
        assert_eq!(order, vec!["eol-last", "no-debugger", "no-var"]);
    }

    #[test]
    fn test_lint_files_reads_from_disk() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("good.js");
        let bad = temp.path().join("bad.js");
        fs::write(&good, "const a = 1;\n").unwrap();
        fs::write(&bad, "debugger;\n").unwrap();
        let missing = temp.path().join("missing.js");

        let report = lint_files(&[good, bad, missing], script::lint);
        assert_eq!(report.files_checked, 3);
        assert_eq!(report.error_count(), 2);
        assert!(report.findings.iter().any(|f| f.rule == "read-error"));
    }
}
