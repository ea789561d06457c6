//! bump-version command

use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_SUCCESS};
use crate::build::BuildContext;
use crate::version::bump_version;

pub fn run_bump_version(ctx: &BuildContext, dry_run: bool) -> ExitCode {
    let plan = match bump_version(ctx.project_root(), &ctx.config().version, dry_run) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let verb = if dry_run { "Would update" } else { "Updated" };
    println!("{} -> {}", plan.old, plan.new);
    for change in &plan.changes {
        println!(
            "  {} {} ({} replacement{})",
            verb,
            ctx.display_path(&change.path),
            change.replacements,
            if change.replacements == 1 { "" } else { "s" }
        );
    }
    for path in &plan.unchanged {
        println!("  Unchanged {} (no version found)", ctx.display_path(path));
    }
    for path in &plan.missing {
        println!("  Skipped {} (not found)", ctx.display_path(path));
    }
    ExitCode::from(EXIT_SUCCESS)
}
