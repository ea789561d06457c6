//! SCSS compiler
//!
//! Supports the subset of Sass an extension stylesheet typically uses:
//! variables (with `!default` and `!global`), nesting with `&`, nested
//! properties, `@import` of partials, `@mixin`/`@include` with parameters
//! and `@content`, `#{}` interpolation, simple arithmetic and the `rgba`,
//! `lighten` and `darken` color functions. Control flow, `@extend`, `@use`
//! and user functions are rejected with an error.

pub mod compile;
mod functions;
pub mod parser;

pub use compile::{compile_file, compile_str, CompileOptions};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// What went wrong while compiling a stylesheet.
#[derive(Debug, Error)]
pub enum ScssErrorKind {
    #[error("{0}")]
    Syntax(String),
    #[error("undefined variable ${0}")]
    UndefinedVariable(String),
    #[error("undefined mixin '{0}'")]
    UndefinedMixin(String),
    #[error("@{0} is not supported")]
    Unsupported(String),
    #[error("can't find stylesheet to import: {0}")]
    ImportNotFound(String),
    #[error("import cycle through {0}")]
    ImportCycle(String),
    #[error("{0}")]
    Custom(String),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Compile error located in a source file.
#[derive(Debug, Error)]
#[error("{}: {kind}", location(.file, .line))]
pub struct ScssError {
    pub file: PathBuf,
    pub line: Option<usize>,
    #[source]
    pub kind: ScssErrorKind,
}

impl ScssError {
    pub fn new(file: &Path, line: Option<usize>, kind: ScssErrorKind) -> Self {
        Self { file: file.to_path_buf(), line, kind }
    }
}

fn location(file: &Path, line: &Option<usize>) -> String {
    match line {
        Some(line) => format!("{}:{}", file.display(), line),
        None => file.display().to_string(),
    }
}
