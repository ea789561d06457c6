//! Pipeline commands (build, serve, publish, clean)

use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_SUCCESS};
use crate::build::{format_graph, BuildContext, Pipeline, Target};

/// Run the graph of `target`, or describe it with `dry_run`.
pub fn run_target(ctx: BuildContext, target: Target, dry_run: bool) -> ExitCode {
    let pipeline = Pipeline::new(ctx.with_dry_run(dry_run));

    if pipeline.context().is_dry_run() {
        return match pipeline.dry_run(target) {
            Ok(plan) => {
                println!("Dry run - nothing will be written");
                print!("{}", plan);
                ExitCode::from(EXIT_SUCCESS)
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::from(EXIT_ERROR)
            }
        };
    }

    if pipeline.context().is_verbose() {
        print!("{}", format_graph(&target.graph()));
    }

    let result = pipeline.run(target);
    if result.is_clean() {
        println!("{}", result.summary());
        ExitCode::from(EXIT_SUCCESS)
    } else {
        eprintln!("{}", result.summary());
        ExitCode::from(EXIT_ERROR)
    }
}
