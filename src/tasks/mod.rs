//! Asset transform tasks
//!
//! One module per category plus `clean`. A transform processes every source
//! file of its category; a failure confined to one file is recorded as a
//! [`FileError`] and the loop moves on to the next file. Only errors that
//! prevent the task from running at all are returned as [`TaskError`].

pub mod clean;
pub mod copy;
pub mod images;
pub mod scripts;
pub mod styles;

pub use clean::{clean, CleanError};

use crate::build::{discover_category, glob_base, BuildContext, DiscoveryError, FileError};
use crate::config::Category;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error that stops a task before it processes any file.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Clean(#[from] CleanError),
}

/// What a task produced.
#[derive(Debug, Default)]
pub struct TaskOutput {
    pub outputs: Vec<PathBuf>,
    pub file_errors: Vec<FileError>,
    pub warnings: Vec<String>,
}

impl TaskOutput {
    /// Record the outcome of one file.
    pub fn record(&mut self, result: Result<PathBuf, FileError>) {
        match result {
            Ok(path) => self.outputs.push(path),
            Err(e) => self.file_errors.push(e),
        }
    }
}

/// Run the transform task of `category`.
pub fn run_transform(ctx: &BuildContext, category: Category) -> Result<TaskOutput, TaskError> {
    match category {
        Category::Scripts => scripts::run(ctx),
        Category::Styles => styles::run(ctx),
        Category::Images => images::run(ctx),
        Category::Copy => copy::run(ctx),
    }
}

/// Source files of a category, minus anything inside the release directory.
pub fn sources(ctx: &BuildContext, category: Category) -> Result<Vec<PathBuf>, DiscoveryError> {
    let out = ctx.out_dir();
    let mut files = discover_category(ctx, category)?;
    files.retain(|f| !f.starts_with(&out));
    Ok(files)
}

/// Path of `file` relative to the static prefix of the first glob whose
/// prefix contains it, falling back to the project root.
pub fn relative_to_glob_base(ctx: &BuildContext, patterns: &[String], file: &Path) -> PathBuf {
    let root = ctx.project_root();
    patterns
        .iter()
        .map(|p| root.join(glob_base(p)))
        .find_map(|base| file.strip_prefix(&base).ok())
        .or_else(|| file.strip_prefix(root).ok())
        .unwrap_or(file)
        .to_path_buf()
}

/// Write `contents` to `path`, creating parent directories.
pub fn write_output(path: &Path, contents: impl AsRef<[u8]>) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}
