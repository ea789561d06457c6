//! Styles task: compile every non-partial stylesheet, prefix it for the
//! browser targets and concatenate the results into one bundle.

use super::{sources, write_output, TaskError, TaskOutput};
use crate::build::{BuildContext, FileError};
use crate::config::Category;
use crate::css::{self, CssError};
use crate::lint::{lint_file, log_findings, style};
use crate::scss::{compile_file, CompileOptions, ScssError};
use lightningcss::targets::Targets;
use std::path::Path;

/// Partials start with `_` and are only reachable through `@import`.
pub fn is_partial(path: &Path) -> bool {
    path.file_name().is_some_and(|n| n.to_string_lossy().starts_with('_'))
}

pub fn run(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let files: Vec<_> =
        sources(ctx, Category::Styles)?.into_iter().filter(|f| !is_partial(f)).collect();
    let options = CompileOptions {
        include_paths: ctx.include_paths(),
        precision: ctx.config().styles.precision,
    };
    let targets = css::targets_from_config(&ctx.config().targets);
    let minify = ctx.flags().minify();

    let mut output = TaskOutput::default();
    let mut pieces = Vec::new();
    for file in &files {
        match compile_one(ctx, file, &options, targets.clone(), minify) {
            Ok(css) => pieces.push(css),
            Err(e) => output.file_errors.push(e),
        }
    }

    if pieces.is_empty() {
        if !files.is_empty() {
            output.warnings.push("no stylesheet compiled, bundle not written".to_string());
        }
        return Ok(output);
    }

    let separator = if minify { "" } else { "\n" };
    let mut bundle = pieces.join(separator);
    if !bundle.ends_with('\n') {
        bundle.push('\n');
    }
    let out_path = ctx.dest_dir(Category::Styles).join(&ctx.config().styles.bundle_name);
    match write_output(&out_path, bundle) {
        Ok(()) => output.outputs.push(out_path),
        Err(e) => output.file_errors.push(FileError::new(out_path, e.to_string())),
    }
    Ok(output)
}

fn compile_one(
    ctx: &BuildContext,
    file: &Path,
    options: &CompileOptions,
    targets: Targets,
    minify: bool,
) -> Result<String, FileError> {
    log_findings(ctx, &lint_file(file, style::lint));

    let compiled = compile_file(file, options).map_err(|e: ScssError| FileError {
        file: e.file.clone(),
        line: e.line,
        message: e.kind.to_string(),
    })?;
    let name = ctx.display_path(file);
    let processed = css::process(&compiled, &name, targets, minify).map_err(|e: CssError| {
        FileError { file: file.to_path_buf(), line: e.line(), message: e.to_string() }
    })?;
    log::debug!("Compiled {}", name);
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_config, BuildMode, EnvironmentFlags};
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        write_output(&root.join(rel), contents).unwrap();
    }

    fn ctx(root: &Path, mode: BuildMode) -> BuildContext {
        BuildContext::new(default_config(), root.to_path_buf())
            .with_flags(EnvironmentFlags::from(mode))
    }

    #[test]
    fn test_is_partial() {
        assert!(is_partial(Path::new("src/css/_vars.scss")));
        assert!(!is_partial(Path::new("src/css/popup.scss")));
    }

    #[test]
    fn test_styles_concatenate_in_path_order() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/css/_vars.scss", "$accent: #336699;\n");
        write(temp.path(), "src/css/b.scss", "@import 'vars';\n.b { color: $accent; }\n");
        write(temp.path(), "src/css/a.scss", ".a { .inner { margin: 0; } }\n");

        let output = run(&ctx(temp.path(), BuildMode::None)).unwrap();
        assert!(output.file_errors.is_empty(), "{:?}", output.file_errors);

        let css = fs::read_to_string(temp.path().join("release/css/style.css")).unwrap();
        let a = css.find(".a .inner").unwrap();
        let b = css.find(".b").unwrap();
        assert!(a < b);
        assert!(css.contains("#369") || css.contains("#336699"));
        assert!(!css.contains("$accent"));
    }

    #[test]
    fn test_malformed_stylesheet_is_isolated() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/css/a.scss", ".a { color: red; }\n");
        write(temp.path(), "src/css/b.scss", ".b {\n  color: $missing;\n}\n");
        write(temp.path(), "src/css/c.scss", ".c { color: blue; }\n");

        let output = run(&ctx(temp.path(), BuildMode::None)).unwrap();
        assert_eq!(output.file_errors.len(), 1);
        assert_eq!(output.file_errors[0].line, Some(2));

        let css = fs::read_to_string(temp.path().join("release/css/style.css")).unwrap();
        assert!(css.contains(".a"));
        assert!(css.contains(".c"));
        assert!(!css.contains(".b"));
    }

    #[test]
    fn test_production_minifies() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/css/a.scss", ".a {\n  color: red;\n}\n");
        run(&ctx(temp.path(), BuildMode::Production)).unwrap();
        let css = fs::read_to_string(temp.path().join("release/css/style.css")).unwrap();
        assert_eq!(css, ".a{color:red}\n");
    }

    #[test]
    fn test_only_partials_writes_nothing() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/css/_only.scss", ".a { color: red; }\n");
        let output = run(&ctx(temp.path(), BuildMode::None)).unwrap();
        assert!(output.outputs.is_empty());
        assert!(!temp.path().join("release/css/style.css").exists());
    }
}
