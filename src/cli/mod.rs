//! Command-line interface implementation
//!
//! Parses arguments, sets up logging, loads the configuration into a
//! [`BuildContext`] and dispatches to the command modules.

mod build;
mod lint;
mod version;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::build::{BuildContext, Target};
use crate::config::loader::{
    default_config, find_config, load_config, merge_cli_overrides, project_root, CliOverrides,
};
use crate::config::{BuildMode, ConfigError, EnvironmentFlags};

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// crxpack - Build, lint and version a browser extension
#[derive(Parser)]
#[command(name = "crxpack")]
#[command(about = "crxpack - Build, lint and version a browser extension")]
#[command(version)]
pub struct Cli {
    /// Path to crxpack.toml (default: search upward from the current directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Build mode; overrides NODE_ENV
    #[arg(long, global = true, value_enum)]
    pub mode: Option<BuildMode>,

    /// Release directory; overrides project.out
    #[arg(long, global = true)]
    pub out: Option<PathBuf>,

    /// Show per-file progress
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile scripts, styles, images and static files into the release directory
    Build {
        /// Show what would be built without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Clean, build, then rebuild whenever a source changes
    Serve {
        /// Show what would be built without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Clean, then build
    Publish {
        /// Show what would be built without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete the release directory
    Clean {
        /// Show what would be deleted without deleting it
        #[arg(long)]
        dry_run: bool,
    },

    /// Lint scripts; fails if any error is found
    #[command(name = "lint-js")]
    LintJs,

    /// Lint stylesheets; reports only
    #[command(name = "lint-css")]
    LintCss,

    /// Increment the last version component in the manifest and tracked files
    #[command(name = "bump-version")]
    BumpVersion {
        /// Print the new version and affected files without writing
        #[arg(long)]
        dry_run: bool,
    },
}

/// Initialise `env_logger`: `info` by default, `debug` with `--verbose`,
/// `RUST_LOG` wins over both.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_target(false)
        .try_init();
}

/// Load the configuration and build mode into a build context.
fn load_context(cli: &Cli) -> Result<BuildContext, ConfigError> {
    let config_path = cli.config.clone().or_else(find_config);
    let mut config = match &config_path {
        Some(path) => {
            log::debug!("Using config: {}", path.display());
            load_config(Some(path))?
        }
        None => {
            log::debug!("No crxpack.toml found, using defaults");
            default_config()
        }
    };
    merge_cli_overrides(&mut config, &CliOverrides { out: cli.out.clone() });

    let cwd = std::env::current_dir()?;
    let root = config_path
        .as_deref()
        .and_then(project_root)
        .filter(|p| !p.as_os_str().is_empty())
        .map_or(cwd.clone(), |p: &Path| cwd.join(p));

    let mode = cli.mode.unwrap_or_else(BuildMode::from_env);
    log::debug!("Build mode: {}", mode);

    Ok(BuildContext::new(config, root)
        .with_flags(EnvironmentFlags::from(mode))
        .with_verbose(cli.verbose))
}

/// Entry point of the `crxpack` binary.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = match load_context(&cli) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    match cli.command {
        Commands::Build { dry_run } => build::run_target(ctx, Target::Build, dry_run),
        Commands::Serve { dry_run } => build::run_target(ctx, Target::Serve, dry_run),
        Commands::Publish { dry_run } => build::run_target(ctx, Target::Publish, dry_run),
        Commands::Clean { dry_run } => build::run_target(ctx, Target::Clean, dry_run),
        Commands::LintJs => lint::run_lint_js(&ctx),
        Commands::LintCss => lint::run_lint_css(&ctx),
        Commands::BumpVersion { dry_run } => version::run_bump_version(&ctx, dry_run),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["crxpack", "publish", "--mode", "production", "-v", "--out", "dist"])
                .unwrap();
        assert_eq!(cli.mode, Some(BuildMode::Production));
        assert!(cli.verbose);
        assert_eq!(cli.out, Some(PathBuf::from("dist")));
        assert!(matches!(cli.command, Commands::Publish { dry_run: false }));
    }

    #[test]
    fn test_parse_command_names() {
        for name in ["lint-js", "lint-css", "clean", "serve", "build"] {
            assert!(Cli::try_parse_from(["crxpack", name]).is_ok(), "{}", name);
        }
        let cli = Cli::try_parse_from(["crxpack", "bump-version", "--dry-run"]).unwrap();
        assert!(matches!(cli.command, Commands::BumpVersion { dry_run: true }));
    }

    #[test]
    fn test_invalid_mode_rejected() {
        assert!(Cli::try_parse_from(["crxpack", "build", "--mode", "staging"]).is_err());
    }
}
