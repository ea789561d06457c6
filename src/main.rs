//! crxpack - Command-line asset build pipeline for browser extensions

use std::process::ExitCode;

use crxpack::cli;

fn main() -> ExitCode {
    cli::run()
}
