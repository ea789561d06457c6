//! Lint commands (lint-js, lint-css)

use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_SUCCESS};
use crate::build::BuildContext;
use crate::lint::{lint_scripts, lint_styles};

/// Lint scripts; any error-severity finding fails the command.
pub fn run_lint_js(ctx: &BuildContext) -> ExitCode {
    match lint_scripts(ctx) {
        Ok(report) => {
            report.print();
            if report.has_errors() {
                ExitCode::from(EXIT_ERROR)
            } else {
                ExitCode::from(EXIT_SUCCESS)
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Lint stylesheets; findings never fail the command.
pub fn run_lint_css(ctx: &BuildContext) -> ExitCode {
    match lint_styles(ctx) {
        Ok(report) => {
            report.print();
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
