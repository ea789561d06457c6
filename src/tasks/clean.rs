//! Delete the release directory.

use crate::build::BuildContext;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CleanError {
    /// The release directory is (or contains) the project root
    #[error("Refusing to delete '{0}': it contains the project root")]
    UnsafeTarget(PathBuf),
    #[error("Failed to delete '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Remove the release directory; returns whether there was anything to remove.
pub fn clean(ctx: &BuildContext) -> Result<bool, CleanError> {
    let out = ctx.out_dir();
    if canonical(ctx.project_root()).starts_with(canonical(&out)) {
        return Err(CleanError::UnsafeTarget(out));
    }
    if !out.exists() {
        log::debug!("{} does not exist", ctx.display_path(&out));
        return Ok(false);
    }
    fs::remove_dir_all(&out).map_err(|source| CleanError::Io { path: out.clone(), source })?;
    log::debug!("Deleted {}", ctx.display_path(&out));
    Ok(true)
}
