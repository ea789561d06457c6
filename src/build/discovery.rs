//! Source file discovery for the build system.
//!
//! Expands the glob patterns of the path registry into sorted file lists.

use crate::build::BuildContext;
use crate::config::Category;
use glob::{glob, Pattern};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error during source discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Invalid glob pattern
    #[error("Invalid glob pattern '{0}': {1}")]
    InvalidPattern(String, glob::PatternError),
    /// IO error during file enumeration
    #[error("IO error during discovery: {0}")]
    Io(#[from] std::io::Error),
}

/// Discover files matching a glob pattern.
///
/// The pattern is resolved against `base_dir`; only regular files are
/// returned, sorted by path.
pub fn discover_files(base_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    let escaped = Pattern::escape(&base_dir.to_string_lossy());
    let full_pattern = format!("{}/{}", escaped.trim_end_matches('/'), pattern);

    let paths =
        glob(&full_pattern).map_err(|e| DiscoveryError::InvalidPattern(pattern.to_string(), e))?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    files.push(path);
                }
            }
            Err(e) => {
                // Log but continue on unreadable entries
                log::warn!("error reading path: {}", e);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Discover files matching any of several patterns, deduplicated and sorted.
pub fn discover_all(base_dir: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut all = BTreeSet::new();
    for pattern in patterns {
        all.extend(discover_files(base_dir, pattern)?);
    }
    Ok(all.into_iter().collect())
}

/// Discover the source files of a category.
pub fn discover_category(
    ctx: &BuildContext,
    category: Category,
) -> Result<Vec<PathBuf>, DiscoveryError> {
    let spec = ctx.path_spec(category);
    discover_all(ctx.project_root(), &spec.sources)
}

/// Discover the script entry points (one bundle each).
pub fn discover_script_entries(ctx: &BuildContext) -> Result<Vec<PathBuf>, DiscoveryError> {
    discover_all(ctx.project_root(), &ctx.config().scripts.entry)
}

/// Static directory prefix of a glob pattern.
///
/// `src/js/**/*.js` gives `src/js`, `manifest.json` gives an empty path.
pub fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    let components: Vec<&str> = pattern.split('/').collect();
    for (i, component) in components.iter().enumerate() {
        let is_last = i + 1 == components.len();
        if is_last || component.contains(['*', '?', '[', '{']) {
            break;
        }
        base.push(component);
    }
    base
}

/// Check whether a project-relative path matches any of the patterns.
pub fn matches_any(patterns: &[String], relative: &Path) -> bool {
    patterns
        .iter()
        .filter_map(|p| Pattern::new(p).ok())
        .any(|p| p.matches_path(relative))
}
