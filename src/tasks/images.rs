//! Images task: optimise every image in parallel.

use super::{relative_to_glob_base, sources, write_output, TaskError, TaskOutput};
use crate::build::{BuildContext, FileError};
use crate::config::Category;
use crate::images::optimize;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Bytes before and after optimising one file.
struct Optimized {
    path: PathBuf,
    before: usize,
    after: usize,
}

pub fn run(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let files = sources(ctx, Category::Images)?;
    let dest = ctx.dest_dir(Category::Images);

    let results: Vec<Result<Optimized, FileError>> =
        files.par_iter().map(|file| optimize_one(ctx, file, &dest)).collect();

    let mut output = TaskOutput::default();
    let (mut before, mut after) = (0, 0);
    for result in results {
        match result {
            Ok(done) => {
                before += done.before;
                after += done.after;
                output.outputs.push(done.path);
            }
            Err(e) => output.file_errors.push(e),
        }
    }

    if !output.outputs.is_empty() {
        log::info!(
            "Minified {} image(s) (saved {} - {})",
            output.outputs.len(),
            format_bytes(before - after),
            format_percent(before, after)
        );
    }
    Ok(output)
}

fn optimize_one(ctx: &BuildContext, file: &Path, dest: &Path) -> Result<Optimized, FileError> {
    let data = fs::read(file).map_err(|e| FileError::new(file, e.to_string()))?;
    let optimized = optimize(file, &data, ctx.config().images.jpeg_quality)
        .map_err(|e| FileError::new(file, e.to_string()))?;

    let relative = relative_to_glob_base(ctx, &ctx.config().images.src, file);
    let out_path = dest.join(relative);
    write_output(&out_path, &optimized).map_err(|e| FileError::new(file, e.to_string()))?;

    if ctx.is_verbose() {
        log::info!(
            "{}: saved {} - {}",
            ctx.display_path(file),
            format_bytes(data.len() - optimized.len()),
            format_percent(data.len(), optimized.len())
        );
    }
    Ok(Optimized { path: out_path, before: data.len(), after: optimized.len() })
}

fn format_bytes(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} kB", bytes as f64 / 1024.0)
    }
}

fn format_percent(before: usize, after: usize) -> String {
    if before == 0 {
        return "0%".to_string();
    }
    format!("{:.1}%", (before - after) as f64 * 100.0 / before as f64)
}
