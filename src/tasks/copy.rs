//! Copy task: static files copied verbatim, keeping their paths relative
//! to the project root.

use super::{sources, TaskError, TaskOutput};
use crate::build::{BuildContext, FileError};
use crate::config::Category;
use std::fs;
use std::path::{Path, PathBuf};

pub fn run(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let dest = ctx.dest_dir(Category::Copy);
    let mut output = TaskOutput::default();
    for file in sources(ctx, Category::Copy)? {
        output.record(copy_one(ctx, &file, &dest));
    }
    Ok(output)
}

fn copy_one(ctx: &BuildContext, file: &Path, dest: &Path) -> Result<PathBuf, FileError> {
    let relative = file.strip_prefix(ctx.project_root()).unwrap_or(file);
    let target = dest.join(relative);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| FileError::new(file, e.to_string()))?;
    }
    fs::copy(file, &target).map_err(|e| FileError::new(file, e.to_string()))?;
    log::debug!("Copied {}", ctx.display_path(file));
    Ok(target)
}
