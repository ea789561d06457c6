//! Watch mode: re-run a category's task when one of its sources changes.
//!
//! The static prefix directory of every source glob is watched. Each
//! debounced batch of changes is matched against the category globs and
//! every affected category's task is started on its own thread. Runs are
//! never cancelled, so a slow task may overlap with its next run.

use crate::build::{glob_base, matches_any, BuildContext};
use crate::config::Category;
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;
use thiserror::Error;

/// Error setting up or running watch mode
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),
    #[error("Failed to watch {path}: {source}")]
    WatchPath {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("Watch channel error: {0}")]
    Channel(String),
}

/// A directory to watch and how deep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub dir: PathBuf,
    pub recursive: bool,
}

/// Directories covering `patterns`, deduplicated.
///
/// A glob whose prefix directory does not exist yet is covered by its
/// nearest existing ancestor. Plain file names at the root only need the
/// root itself, non-recursively.
pub fn watch_targets(root: &Path, patterns: &[String]) -> Vec<WatchTarget> {
    let mut targets: Vec<WatchTarget> = Vec::new();
    for pattern in patterns {
        let base = glob_base(pattern);
        let plain_root_file = base.as_os_str().is_empty() && !pattern.contains(['/', '*']);
        let mut dir = root.join(&base);
        while !dir.exists() && dir != root {
            match dir.parent() {
                Some(parent) => dir = parent.to_path_buf(),
                None => break,
            }
        }
        let target = WatchTarget { dir, recursive: !plain_root_file };
        match targets.iter_mut().find(|t| t.dir == target.dir) {
            Some(existing) => existing.recursive |= target.recursive,
            None => targets.push(target),
        }
    }
    targets
}

/// Categories whose source globs match any of the changed paths, in
/// category order. Paths inside the release directory are ignored.
pub fn affected_categories(ctx: &BuildContext, paths: &[PathBuf]) -> Vec<Category> {
    let root = ctx.project_root();
    let canonical_root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let out = ctx.out_dir();
    let canonical_out = out.canonicalize().unwrap_or_else(|_| out.clone());

    let relative: Vec<&Path> = paths
        .iter()
        .filter(|p| !p.starts_with(&out) && !p.starts_with(&canonical_out))
        .filter_map(|p| p.strip_prefix(root).or_else(|_| p.strip_prefix(&canonical_root)).ok())
        .collect();

    Category::ALL
        .into_iter()
        .filter(|c| {
            let sources = ctx.path_spec(*c).sources;
            relative.iter().any(|rel| matches_any(&sources, rel))
        })
        .collect()
}

/// Clear the terminal screen
fn clear_screen() {
    // ANSI escape code to clear screen and move cursor to top-left
    print!("\x1B[2J\x1B[1;1H");
}

/// Watch every category's sources and call `run` for each affected
/// category. Blocks until the watcher's channel closes.
pub fn watch(ctx: &BuildContext, run: &(dyn Fn(Category) + Sync)) -> Result<(), WatchError> {
    let (tx, rx) = channel();
    let debounce = Duration::from_millis(ctx.config().watch.debounce_ms as u64);
    let mut debouncer = new_debouncer(debounce, tx).map_err(WatchError::WatcherInit)?;

    let patterns: Vec<String> =
        Category::ALL.into_iter().flat_map(|c| ctx.path_spec(c).sources).collect();
    for target in watch_targets(ctx.project_root(), &patterns) {
        let mode =
            if target.recursive { RecursiveMode::Recursive } else { RecursiveMode::NonRecursive };
        debouncer
            .watcher()
            .watch(&target.dir, mode)
            .map_err(|source| WatchError::WatchPath { path: target.dir.clone(), source })?;
        log::debug!("Watching {}", ctx.display_path(&target.dir));
    }
    log::info!("Watching for changes...");

    std::thread::scope(|s| loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let paths: Vec<PathBuf> = events.into_iter().map(|e| e.path).collect();
                let categories = affected_categories(ctx, &paths);
                if categories.is_empty() {
                    continue;
                }
                if ctx.config().watch.clear_screen {
                    clear_screen();
                }
                for path in &paths {
                    log::debug!("Changed: {}", ctx.display_path(path));
                }
                for category in categories {
                    s.spawn(move || run(category));
                }
            }
            Ok(Err(error)) => {
                // Non-fatal, keep watching
                log::warn!("Watch error: {:?}", error);
            }
            Err(e) => return Err(WatchError::Channel(e.to_string())),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_watch_targets() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src/js")).unwrap();
        fs::create_dir_all(root.join("_locales")).unwrap();

        let patterns: Vec<String> =
            ["src/js/**/*.js", "src/js/*.js", "src/img/**/*", "_locales/**/*", "manifest.json"]
                .iter()
                .map(|s| s.to_string())
                .collect();
        let targets = watch_targets(root, &patterns);
        assert_eq!(
            targets,
            vec![
                WatchTarget { dir: root.join("src/js"), recursive: true },
                WatchTarget { dir: root.join("src"), recursive: true },
                WatchTarget { dir: root.join("_locales"), recursive: true },
                WatchTarget { dir: root.to_path_buf(), recursive: false },
            ]
        );
    }

    #[test]
    fn test_affected_categories() {
        let ctx = BuildContext::new(default_config(), PathBuf::from("/p"));
        let changed = |rel: &str| affected_categories(&ctx, &[PathBuf::from("/p").join(rel)]);

        assert_eq!(changed("src/js/lib/util.js"), vec![Category::Scripts]);
        assert_eq!(changed("src/css/_vars.scss"), vec![Category::Styles]);
        assert_eq!(changed("src/img/icon.png"), vec![Category::Images]);
        assert_eq!(changed("manifest.json"), vec![Category::Copy]);
        assert!(changed("README.md").is_empty());
        assert!(changed("release/manifest.json").is_empty());
    }

    #[test]
    fn test_affected_categories_dedup_and_order() {
        let ctx = BuildContext::new(default_config(), PathBuf::from("/p"));
        let paths = vec![
            PathBuf::from("/p/manifest.json"),
            PathBuf::from("/p/src/js/a.js"),
            PathBuf::from("/p/src/js/b.js"),
        ];
        assert_eq!(affected_categories(&ctx, &paths), vec![Category::Scripts, Category::Copy]);
    }
}
