//! Script bundler.
//!
//! Follows the `import`/`export` statements and `require()` calls of an
//! entry script, and emits one self-contained IIFE holding a small module
//! registry. Every module keeps its own line count through the rewrite, so
//! a line-granular source map stays exact. A lone entry that neither
//! imports nor touches `module`/`exports` is emitted without the registry.
//!
//! Imported names are read once from the module record when the import
//! statement runs; they are not live bindings.

use super::resolve::resolve;
use super::scan::{line_col, mask, scan, SpanKind};
use super::sourcemap::SourceMapBuilder;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error while bundling an entry script.
#[derive(Debug, Error)]
pub enum BundleError {
    /// A module could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// An import specifier did not resolve to a file
    #[error("Cannot resolve '{specifier}'")]
    Unresolved { importer: PathBuf, line: usize, specifier: String },
}

impl BundleError {
    /// File the error is attributed to.
    pub fn file(&self) -> &Path {
        match self {
            BundleError::Read { path, .. } => path,
            BundleError::Unresolved { importer, .. } => importer,
        }
    }

    /// Line in that file, if known.
    pub fn line(&self) -> Option<usize> {
        match self {
            BundleError::Read { .. } => None,
            BundleError::Unresolved { line, .. } => Some(*line),
        }
    }
}

static_regex!(
    import_from_re,
    r#"(?m)^[ \t]*import\s+([\w$*{}\s,]+?)\s*from\s*['"]([^'"\n]+)['"][ \t]*;?"#
);
static_regex!(import_bare_re, r#"(?m)^[ \t]*import\s*['"]([^'"\n]+)['"][ \t]*;?"#);
static_regex!(
    export_from_re,
    r#"(?m)^[ \t]*export\s*(\*(?:\s+as\s+[\w$]+)?|\{[^}]*\})\s*from\s*['"]([^'"\n]+)['"][ \t]*;?"#
);
static_regex!(export_list_re, r"(?m)^[ \t]*export\s*\{([^}]*)\}[ \t]*;?");
static_regex!(
    export_default_decl_re,
    r"(?m)^([ \t]*)export\s+default\s+(?:(?:async\s+)?function\b\s*\*?\s*([\w$]+)|class\s+([\w$]+))"
);
static_regex!(export_default_re, r"(?m)^([ \t]*)export\s+default\s+");
static_regex!(
    export_decl_re,
    r"(?m)^([ \t]*)export\s+(?:(?:async\s+)?function\b\s*\*?\s*([\w$]+)|class\s+([\w$]+)|(?:const|let|var)\s+([\w$]+|\{[^}]*\}|\[[^\]]*\]))"
);
static_regex!(commonjs_re, r"\b(?:module|exports)\b");
static_regex!(
    require_re,
    r#"(^|[^\w$.])require\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#
);

/// Runtime placed ahead of the module table.
const RUNTIME: &str = r#"var __modules = [], __cache = [];
function __require(id) {
  var cached = __cache[id];
  if (cached) return cached.exports;
  var module = __cache[id] = { exports: {} };
  __modules[id].call(module.exports, module, module.exports);
  return module.exports;
}
function __default(mod) {
  return mod && mod.__esModule ? mod["default"] : mod;
}
function __export(target, getters) {
  Object.keys(getters).forEach(function (key) {
    Object.defineProperty(target, key, { enumerable: true, get: getters[key] });
  });
}
function __reexport(target, source) {
  Object.keys(source).forEach(function (key) {
    if (key === "default" || Object.prototype.hasOwnProperty.call(target, key)) return;
    Object.defineProperty(target, key, { enumerable: true, get: function () { return source[key]; } });
  });
}
"#;

/// Bundled output of one entry script.
#[derive(Debug, Clone)]
pub struct Bundle {
    /// Generated script, without a source map comment
    pub code: String,
    /// Every module included, entry first
    pub modules: Vec<PathBuf>,
    map: SourceMapBuilder,
}

impl Bundle {
    /// Line map from the generated code back to the module sources.
    pub fn source_map(&self) -> &SourceMapBuilder {
        &self.map
    }
}

#[derive(Debug)]
struct Module {
    path: PathBuf,
    source: String,
    body: String,
    esm: bool,
    /// Refers to the CommonJS `module` or `exports` bindings
    commonjs: bool,
    /// (exported name, expression) pairs exposed as getters
    exports: Vec<(String, String)>,
}

/// Bundle `entry`; source map paths are made relative to `root`.
pub fn bundle(entry: &Path, root: &Path) -> Result<Bundle, BundleError> {
    let mut graph = ModuleGraph::default();
    graph.id_for(entry.to_path_buf());

    let mut modules = Vec::new();
    while let Some(path) = graph.queue.pop_front() {
        let source = fs::read_to_string(&path)
            .map_err(|source| BundleError::Read { path: path.clone(), source })?;
        modules.push(graph.rewrite(path, source)?);
    }

    Ok(emit(&modules, root))
}

#[derive(Default)]
struct ModuleGraph {
    ids: HashMap<PathBuf, usize>,
    queue: VecDeque<PathBuf>,
}

impl ModuleGraph {
    fn id_for(&mut self, path: PathBuf) -> usize {
        let next = self.ids.len();
        *self.ids.entry(path.clone()).or_insert_with(|| {
            self.queue.push_back(path);
            next
        })
    }

    fn require(
        &mut self,
        importer: &Path,
        source: &str,
        offset: usize,
        specifier: &str,
    ) -> Result<usize, BundleError> {
        match resolve(specifier, importer) {
            Some(path) => Ok(self.id_for(path)),
            None => Err(BundleError::Unresolved {
                importer: importer.to_path_buf(),
                line: line_col(source, offset).0,
                specifier: specifier.to_string(),
            }),
        }
    }

    fn rewrite(&mut self, path: PathBuf, source: String) -> Result<Module, BundleError> {
        if path.extension().is_some_and(|e| e == "json") {
            let body = format!("module.exports = {};", source.trim_end());
            return Ok(Module { path, source, body, esm: false, commonjs: true, exports: vec![] });
        }

        let spans = scan(&source);
        let code = mask(&source, &spans, |kind| kind != SpanKind::String);
        let bare = mask(&source, &spans, |_| true);
        let mut edits = Edits::default();
        let mut exports = Vec::new();
        let mut esm = false;
        let mut temp = 0usize;
        let mut fresh = || {
            temp += 1;
            format!("__m{}", temp)
        };

        for caps in export_from_re().captures_iter(&code) {
            let (Some(m), Some(what), Some(spec)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            let id = self.require(&path, &source, spec.start(), spec.as_str())?;
            let what = what.as_str().trim();
            let replacement = if what == "*" {
                format!("__reexport(exports, __require({}));", id)
            } else {
                let tmp = fresh();
                if let Some(name) = what.strip_prefix('*') {
                    let name = name.trim().trim_start_matches("as").trim();
                    exports.push((name.to_string(), tmp.clone()));
                } else {
                    for (local, exported) in parse_specifiers(what) {
                        exports.push((exported, format!("{}.{}", tmp, local)));
                    }
                }
                format!("var {} = __require({});", tmp, id)
            };
            edits.push(m.start(), m.end(), &source, replacement);
            esm = true;
        }

        for caps in export_list_re().captures_iter(&code) {
            let (Some(m), Some(list)) = (caps.get(0), caps.get(1)) else { continue };
            if edits.push(m.start(), m.end(), &source, String::new()) {
                for (local, exported) in parse_specifiers(list.as_str()) {
                    exports.push((exported, local));
                }
                esm = true;
            }
        }

        for caps in import_from_re().captures_iter(&code) {
            let (Some(m), Some(clause), Some(spec)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            let id = self.require(&path, &source, spec.start(), spec.as_str())?;
            let replacement = import_bindings(clause.as_str(), id, &mut fresh);
            edits.push(m.start(), m.end(), &source, replacement);
            esm = true;
        }

        for caps in import_bare_re().captures_iter(&code) {
            let (Some(m), Some(spec)) = (caps.get(0), caps.get(1)) else { continue };
            let id = self.require(&path, &source, spec.start(), spec.as_str())?;
            edits.push(m.start(), m.end(), &source, format!("__require({});", id));
            esm = true;
        }

        for caps in export_default_decl_re().captures_iter(&code) {
            let (Some(m), Some(indent)) = (caps.get(0), caps.get(1)) else { continue };
            let Some(name) = caps.get(2).or_else(|| caps.get(3)) else { continue };
            // `export default class extends Base {}` has no name
            if name.as_str() == "extends" {
                continue;
            }
            let keyword_start = m.as_str().find("default").map_or(m.start(), |i| m.start() + i);
            let decl_start = keyword_start + "default".len();
            if edits.push(m.start(), decl_start, &source, indent.as_str().to_string()) {
                exports.push(("default".to_string(), name.as_str().to_string()));
                esm = true;
            }
        }

        for caps in export_default_re().captures_iter(&code) {
            let (Some(m), Some(indent)) = (caps.get(0), caps.get(1)) else { continue };
            let replacement = format!("{}exports[\"default\"] = ", indent.as_str());
            if edits.push(m.start(), m.end(), &source, replacement) {
                esm = true;
            }
        }

        for caps in export_decl_re().captures_iter(&code) {
            let (Some(m), Some(indent)) = (caps.get(0), caps.get(1)) else { continue };
            let Some(decl) = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4)) else {
                continue;
            };
            let export_end = m.start()
                + indent.len()
                + m.as_str()[indent.len()..].find(char::is_whitespace).unwrap_or(6);
            if edits.push(m.start(), export_end, &source, indent.as_str().to_string()) {
                let names = match caps.get(4) {
                    Some(_) => declarator_names(&bare, decl.start()),
                    None => declared_names(decl.as_str()),
                };
                for name in names {
                    exports.push((name.clone(), name));
                }
                esm = true;
            }
        }

        for caps in require_re().captures_iter(&code) {
            let (Some(m), Some(lead), Some(spec)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            let call_start = m.start() + lead.len();
            if spans.iter().any(|s| s.kind == SpanKind::String && s.start <= call_start && call_start < s.end) {
                continue;
            }
            let id = self.require(&path, &source, spec.start(), spec.as_str())?;
            edits.push(call_start, m.end(), &source, format!("__require({})", id));
        }

        let commonjs =
            commonjs_re().find_iter(&bare).any(|m| !bare[..m.start()].trim_end().ends_with('.'));
        let body = edits.apply(&source);
        Ok(Module { path, source, body, esm, commonjs, exports })
    }
}

/// Non-overlapping replacements over the source, applied in offset order.
#[derive(Default)]
struct Edits {
    edits: Vec<(usize, usize, String)>,
}

impl Edits {
    /// Record a replacement unless it overlaps one already recorded.
    ///
    /// Newlines of the replaced text are re-appended so line numbers hold.
    fn push(&mut self, start: usize, end: usize, source: &str, replacement: String) -> bool {
        if self.edits.iter().any(|(s, e, _)| start < *e && *s < end) {
            return false;
        }
        let newlines = source[start..end].matches('\n').count();
        let mut replacement = replacement;
        replacement.push_str(&"\n".repeat(newlines));
        self.edits.push((start, end, replacement));
        true
    }

    fn apply(mut self, source: &str) -> String {
        self.edits.sort_by_key(|(start, _, _)| *start);
        let mut out = String::with_capacity(source.len());
        let mut pos = 0;
        for (start, end, replacement) in &self.edits {
            out.push_str(&source[pos..*start]);
            out.push_str(replacement);
            pos = *end;
        }
        out.push_str(&source[pos..]);
        out
    }
}

/// Parse `a, b as c` (braces optional) into (local, exported) pairs.
fn parse_specifiers(list: &str) -> Vec<(String, String)> {
    list.trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .split(',')
        .filter_map(|item| {
            let mut words = item.split_whitespace();
            let local = words.next()?;
            let exported = match (words.next(), words.next()) {
                (Some("as"), Some(alias)) => alias,
                _ => local,
            };
            Some((local.to_string(), exported.to_string()))
        })
        .collect()
}

/// Names bound by `name`, `{ a, b: c, d = 1 }` or `[a, , b]`.
fn declared_names(decl: &str) -> Vec<String> {
    let decl = decl.trim();
    if !decl.starts_with('{') && !decl.starts_with('[') {
        return vec![decl.to_string()];
    }
    decl[1..decl.len().saturating_sub(1).max(1)]
        .split(',')
        .filter_map(|item| {
            let item = item.split('=').next()?.trim();
            let item = item.rsplit(':').next()?.trim().trim_start_matches("...");
            (!item.is_empty()).then(|| item.to_string())
        })
        .collect()
}

/// Names bound by every declarator of the `const`/`let`/`var` statement
/// whose first declarator starts at `start` in `code` (literals blanked).
///
/// The statement ends at `;` or at a line break not preceded by a comma or
/// an operator, outside any brackets.
fn declarator_names(code: &str, start: usize) -> Vec<String> {
    let rest = &code[start..];
    let bytes = rest.as_bytes();
    let mut depth = 0usize;
    let mut pieces = Vec::new();
    let mut piece_start = 0;
    let mut end = bytes.len();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                pieces.push(&rest[piece_start..i]);
                piece_start = i + 1;
            }
            b';' if depth == 0 => {
                end = i;
                break;
            }
            b'\n' if depth == 0 => {
                let continued = rest[..i].trim_end().ends_with(|c: char| ",=>?:+-*&|".contains(c));
                if !continued {
                    end = i;
                    break;
                }
            }
            _ => {}
        }
    }
    pieces.push(&rest[piece_start..end]);

    pieces
        .into_iter()
        .flat_map(|piece| {
            let target = top_level_lhs(piece).trim();
            if target.is_empty() {
                vec![]
            } else {
                declared_names(target)
            }
        })
        .collect()
}

/// The binding target of one declarator: everything before its top-level `=`.
fn top_level_lhs(declarator: &str) -> &str {
    let mut depth = 0usize;
    for (i, b) in declarator.bytes().enumerate() {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b'=' if depth == 0 => return &declarator[..i],
            _ => {}
        }
    }
    declarator
}

/// Translate an import clause into variable declarations.
fn import_bindings(clause: &str, id: usize, fresh: &mut impl FnMut() -> String) -> String {
    let clause = clause.trim();
    let (default, rest) = match clause.find(|c| c == '{' || c == '*') {
        Some(0) => (None, clause),
        Some(i) => (Some(clause[..i].trim().trim_end_matches(',').trim()), &clause[i..]),
        None => (Some(clause), ""),
    };

    if rest.is_empty() {
        let name = default.unwrap_or("__unused");
        return format!("var {} = __default(__require({}));", name, id);
    }

    if let Some(ns) = rest.strip_prefix('*') {
        let ns = ns.trim().trim_start_matches("as").trim();
        let mut out = format!("var {} = __require({})", ns, id);
        if let Some(name) = default {
            out.push_str(&format!(", {} = __default({})", name, ns));
        }
        out.push(';');
        return out;
    }

    let tmp = fresh();
    let mut out = format!("var {} = __require({})", tmp, id);
    if let Some(name) = default {
        out.push_str(&format!(", {} = __default({})", name, tmp));
    }
    for (imported, local) in parse_specifiers(rest) {
        if imported == "default" {
            out.push_str(&format!(", {} = __default({})", local, tmp));
        } else {
            out.push_str(&format!(", {} = {}.{}", local, tmp, imported));
        }
    }
    out.push(';');
    out
}

fn source_name(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).to_string_lossy().replace('\\', "/")
}

fn emit(modules: &[Module], root: &Path) -> Bundle {
    let mut code = String::new();
    let mut map = SourceMapBuilder::new();
    let unmapped = |code: &mut String, map: &mut SourceMapBuilder, text: &str| {
        for line in text.lines() {
            code.push_str(line);
            code.push('\n');
            map.add_unmapped();
        }
    };
    let mapped = |code: &mut String, map: &mut SourceMapBuilder, module: &Module| {
        let source = map.add_source(source_name(&module.path, root), module.source.clone());
        for (i, line) in module.body.lines().enumerate() {
            code.push_str(line);
            code.push('\n');
            map.add_mapped(source, i);
        }
    };

    unmapped(&mut code, &mut map, "(function () {");

    match modules {
        [only] if !only.esm && !only.commonjs => mapped(&mut code, &mut map, only),
        _ => {
            unmapped(&mut code, &mut map, RUNTIME);
            for (id, module) in modules.iter().enumerate() {
                let mut header = format!("__modules[{}] = function (module, exports) {{", id);
                if module.esm {
                    header.push_str(" exports.__esModule = true;");
                }
                if !module.exports.is_empty() {
                    let getters: Vec<String> = module
                        .exports
                        .iter()
                        .map(|(name, expr)| format!("\"{}\": function () {{ return {}; }}", name, expr))
                        .collect();
                    header.push_str(&format!(" __export(exports, {{ {} }});", getters.join(", ")));
                }
                unmapped(&mut code, &mut map, &header);
                mapped(&mut code, &mut map, module);
                unmapped(&mut code, &mut map, "};");
            }
            unmapped(&mut code, &mut map, "__require(0);");
        }
    }

    unmapped(&mut code, &mut map, "}());");

    Bundle { code, modules: modules.iter().map(|m| m.path.clone()).collect(), map }
}
