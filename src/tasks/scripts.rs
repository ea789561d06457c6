//! Scripts task: lint, bundle, transpile and minify each entry script.

use super::{write_output, TaskError, TaskOutput};
use crate::build::{discover_script_entries, BuildContext, FileError};
use crate::config::Category;
use crate::js::{bundle, minify, BundleError};
use crate::lint::{lint_file, log_findings, script};
use crate::tool::run_tool;
use std::path::{Path, PathBuf};

pub fn run(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let entries = discover_script_entries(ctx)?;
    let dest = ctx.dest_dir(Category::Scripts);
    let mut output = TaskOutput::default();
    for entry in &entries {
        let result = build_entry(ctx, entry, &dest, &mut output.warnings);
        output.record(result);
    }
    Ok(output)
}

fn bundle_error(e: BundleError) -> FileError {
    FileError { file: e.file().to_path_buf(), line: e.line(), message: e.to_string() }
}

/// Build one entry into `<dest>/<entry file name>`.
pub fn build_entry(
    ctx: &BuildContext,
    entry: &Path,
    dest: &Path,
    warnings: &mut Vec<String>,
) -> Result<PathBuf, FileError> {
    log_findings(ctx, &lint_file(entry, script::lint));

    let bundled = bundle(entry, ctx.project_root()).map_err(bundle_error)?;
    let file_name = entry.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let flags = ctx.flags();

    let mut code = bundled.code.clone();
    let mut map_usable = true;
    if let Some(transpiler) = &ctx.config().scripts.transpiler {
        let transpiled = run_tool(transpiler, &code, ctx.project_root())
            .map_err(|e| FileError::new(entry, e.to_string()))?;
        if transpiled.lines().count() != code.lines().count() {
            map_usable = false;
            if flags.source_maps() {
                let warning = format!(
                    "{}: transpiler changed the line count, source map omitted",
                    ctx.display_path(entry)
                );
                log::warn!("{}", warning);
                warnings.push(warning);
            }
        }
        code = transpiled;
    }

    if flags.minify() {
        code = minify(&code);
    } else if flags.source_maps() && map_usable {
        if !code.ends_with('\n') {
            code.push('\n');
        }
        code.push_str(&bundled.source_map().to_inline_comment(&file_name));
        code.push('\n');
    }

    let out_path = dest.join(&file_name);
    write_output(&out_path, code).map_err(|e| FileError::new(entry, e.to_string()))?;
    log::debug!(
        "{} -> {} ({} module(s))",
        ctx.display_path(entry),
        ctx.display_path(&out_path),
        bundled.modules.len()
    );
    Ok(out_path)
}
