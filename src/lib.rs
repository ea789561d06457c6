//! crxpack - Asset build pipeline for browser extensions
//!
//! This library provides functionality to:
//! - Bundle, minify and map extension scripts
//! - Compile SCSS stylesheets and vendor-prefix the result
//! - Optimise images and copy static files into a release directory
//! - Lint scripts and stylesheets
//! - Bump the extension version across tracked files
//! - Watch the source tree and rebuild on change

/// Declare a function returning a lazily compiled, process-wide regex.
macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static regex::Regex {
            static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
            RE.get_or_init(|| regex::Regex::new($pattern).unwrap())
        }
    };
}

pub mod build;
pub mod cli;
pub mod config;
pub mod css;
pub mod images;
pub mod js;
pub mod lint;
pub mod scss;
pub mod tasks;
pub mod tool;
pub mod version;
pub mod watch;
