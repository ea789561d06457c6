//! Build context containing configuration and state for a build.

use crate::config::{Category, CrxConfig, EnvironmentFlags, PathSpec};
use std::path::{Path, PathBuf};

/// Build context containing configuration and paths for a build operation.
///
/// The context is created once at startup and handed to every task; it is
/// the only place tasks read configuration or the build mode from.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The loaded configuration
    config: CrxConfig,
    /// Project root directory (where crxpack.toml is located)
    project_root: PathBuf,
    /// Source map / minification flags
    flags: EnvironmentFlags,
    /// Whether to run in verbose mode
    verbose: bool,
    /// Whether to only report what would be done
    dry_run: bool,
}

impl BuildContext {
    /// Create a new build context.
    pub fn new(config: CrxConfig, project_root: PathBuf) -> Self {
        Self {
            config,
            project_root,
            flags: EnvironmentFlags::default(),
            verbose: false,
            dry_run: false,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &CrxConfig {
        &self.config
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Get the environment flags.
    pub fn flags(&self) -> EnvironmentFlags {
        self.flags
    }

    /// Get the release directory (resolved to absolute path).
    pub fn out_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.out)
    }

    /// Destination directory of a category inside the release directory.
    pub fn dest_dir(&self, category: Category) -> PathBuf {
        let spec = self.config.path_spec(category);
        let out = self.out_dir();
        if spec.dest == Path::new(".") {
            out
        } else {
            out.join(spec.dest)
        }
    }

    /// Path registry entry for a category.
    pub fn path_spec(&self, category: Category) -> PathSpec {
        self.config.path_spec(category)
    }

    /// Directories searched by stylesheet imports.
    pub fn include_paths(&self) -> Vec<PathBuf> {
        self.config.project.include_paths.iter().map(|p| self.resolve_path(p)).collect()
    }

    /// Whether verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Whether this is a dry run.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Set the environment flags.
    pub fn with_flags(mut self, flags: EnvironmentFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Resolve a path relative to the project root.
    ///
    /// If the path is absolute, returns it unchanged.
    /// If relative, joins it with the project root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        crate::config::loader::resolve_path(&self.project_root, path)
    }

    /// Path relative to the project root, for display.
    pub fn display_path<'a>(&self, path: &'a Path) -> std::borrow::Cow<'a, str> {
        path.strip_prefix(&self.project_root).unwrap_or(path).to_string_lossy()
    }
}
