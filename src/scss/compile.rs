//! SCSS to CSS compilation.

use super::functions;
use super::parser::{parse, Node};
use super::{ScssError, ScssErrorKind};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Nested `@include` depth at which compilation gives up.
const MAX_INCLUDE_DEPTH: usize = 64;

/// Options for a compilation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Extra directories searched by `@import`, after the importing file's own
    pub include_paths: Vec<PathBuf>,
    /// Digits kept after the decimal point of computed numbers
    pub precision: u8,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { include_paths: vec![], precision: 5 }
    }
}

/// Compile the stylesheet at `path`.
pub fn compile_file(path: &Path, options: &CompileOptions) -> Result<String, ScssError> {
    let source = fs::read_to_string(path)
        .map_err(|e| ScssError::new(path, None, ScssErrorKind::Io(e)))?;
    compile_str(&source, path, options)
}

/// Compile SCSS source text; `file` locates relative imports and errors.
pub fn compile_str(source: &str, file: &Path, options: &CompileOptions) -> Result<String, ScssError> {
    let nodes = parse(source, file)?;
    let mut compiler = Compiler {
        options,
        scopes: vec![HashMap::new()],
        mixins: HashMap::new(),
        import_stack: vec![canonical(file)],
        content: Vec::new(),
        file: file.to_path_buf(),
    };
    let mut out = Vec::new();
    compiler.compile_body(&nodes, &[], None, &mut out)?;

    let mut css = String::new();
    // @charset and @import must precede every other rule
    let (hoisted, rest): (Vec<&Out>, Vec<&Out>) =
        out.iter().partition(|o| matches!(o, Out::Raw(text) if text.starts_with("@charset") || text.starts_with("@import")));
    for item in hoisted.into_iter().chain(rest) {
        item.print(0, &mut css);
    }
    Ok(css)
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[derive(Debug, Clone)]
struct Mixin {
    params: Vec<(String, Option<String>)>,
    body: Vec<Node>,
}

/// Flattened output tree.
#[derive(Debug)]
enum Out {
    Rule { selector: String, decls: Vec<String> },
    At { prelude: String, decls: Vec<String>, body: Vec<Out> },
    Raw(String),
}

impl Out {
    fn is_empty(&self) -> bool {
        match self {
            Out::Rule { decls, .. } => decls.is_empty(),
            Out::At { decls, body, .. } => decls.is_empty() && body.iter().all(Out::is_empty),
            Out::Raw(_) => false,
        }
    }

    fn print(&self, depth: usize, css: &mut String) {
        if self.is_empty() {
            return;
        }
        let indent = "  ".repeat(depth);
        match self {
            Out::Rule { selector, decls } => {
                css.push_str(&format!("{}{} {{\n", indent, selector));
                for decl in decls {
                    css.push_str(&format!("{}  {};\n", indent, decl));
                }
                css.push_str(&format!("{}}}\n", indent));
            }
            Out::At { prelude, decls, body } => {
                css.push_str(&format!("{}{} {{\n", indent, prelude));
                for decl in decls {
                    css.push_str(&format!("{}  {};\n", indent, decl));
                }
                for item in body {
                    item.print(depth + 1, css);
                }
                css.push_str(&format!("{}}}\n", indent));
            }
            Out::Raw(text) => {
                css.push_str(&format!("{}{}\n", indent, text));
            }
        }
    }
}

struct Compiler<'a> {
    options: &'a CompileOptions,
    scopes: Vec<HashMap<String, String>>,
    mixins: HashMap<String, Mixin>,
    import_stack: Vec<PathBuf>,
    /// Content blocks of the active `@include`s
    content: Vec<Option<Vec<Node>>>,
    /// File currently being compiled
    file: PathBuf,
}

impl<'a> Compiler<'a> {
    fn err(&self, line: usize, kind: ScssErrorKind) -> ScssError {
        ScssError::new(&self.file, Some(line), kind)
    }

    fn compile_body(
        &mut self,
        nodes: &[Node],
        selectors: &[String],
        mut decls: Option<&mut Vec<String>>,
        out: &mut Vec<Out>,
    ) -> Result<(), ScssError> {
        for node in nodes {
            match node {
                Node::Variable { name, value, default, global, line } => {
                    let name = normalize_name(name);
                    if *default && self.lookup(&name).is_some_and(|v| v != "null") {
                        continue;
                    }
                    let value = self.eval(value, *line)?;
                    self.assign(name, value, *global);
                }
                Node::Decl { property, value, line } => {
                    let Some(decls) = decls.as_deref_mut() else {
                        return Err(self.err(*line, outside_rule()));
                    };
                    let property = self.interpolate(property, *line)?;
                    let value = self.eval(value, *line)?;
                    decls.push(format!("{}: {}", property, self.round(&value)));
                }
                Node::NestedProperty { property, value, children, line } => {
                    let Some(decls) = decls.as_deref_mut() else {
                        return Err(self.err(*line, outside_rule()));
                    };
                    let prefix = self.interpolate(property, *line)?;
                    if let Some(value) = value {
                        let value = self.eval(value, *line)?;
                        decls.push(format!("{}: {}", prefix, self.round(&value)));
                    }
                    self.nested_properties(&prefix, children, decls)?;
                }
                Node::Rule { selector, children, line } => {
                    let resolved = self.interpolate(selector, *line)?;
                    let combined = combine_selectors(selectors, &split_top_level(&resolved));
                    self.compile_rule(combined, children, out)?;
                }
                Node::AtRule { name, params, children, line } => {
                    self.compile_at_rule(name, params, children.as_deref(), *line, selectors, decls.as_deref_mut(), out)?;
                }
            }
        }
        Ok(())
    }

    fn compile_rule(&mut self, selectors: Vec<String>, children: &[Node], out: &mut Vec<Out>) -> Result<(), ScssError> {
        let index = out.len();
        out.push(Out::Rule { selector: selectors.join(", "), decls: vec![] });
        let mut decls = Vec::new();

        self.scopes.push(HashMap::new());
        let result = self.compile_body(children, &selectors, Some(&mut decls), out);
        self.scopes.pop();
        result?;

        if let Some(Out::Rule { decls: slot, .. }) = out.get_mut(index) {
            *slot = decls;
        }
        Ok(())
    }

    fn nested_properties(&mut self, prefix: &str, children: &[Node], decls: &mut Vec<String>) -> Result<(), ScssError> {
        for child in children {
            match child {
                Node::Decl { property, value, line } => {
                    let property = self.interpolate(property, *line)?;
                    let value = self.eval(value, *line)?;
                    decls.push(format!("{}-{}: {}", prefix, property, self.round(&value)));
                }
                Node::NestedProperty { property, value, children, line } => {
                    let nested = format!("{}-{}", prefix, self.interpolate(property, *line)?);
                    if let Some(value) = value {
                        let value = self.eval(value, *line)?;
                        decls.push(format!("{}: {}", nested, self.round(&value)));
                    }
                    self.nested_properties(&nested, children, decls)?;
                }
                other => {
                    return Err(self.err(
                        other.line(),
                        ScssErrorKind::Syntax("only properties may appear in a nested property group".into()),
                    ))
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn compile_at_rule(
        &mut self,
        name: &str,
        params: &str,
        children: Option<&[Node]>,
        line: usize,
        selectors: &[String],
        mut decls: Option<&mut Vec<String>>,
        out: &mut Vec<Out>,
    ) -> Result<(), ScssError> {
        match (name, children) {
            ("import", None) => {
                for target in split_top_level(params) {
                    self.import(&target, line, selectors, decls.as_deref_mut(), out)?;
                }
            }
            ("mixin", Some(body)) => {
                let (mixin_name, args) = split_call(params);
                let params = split_top_level(args)
                    .into_iter()
                    .map(|param| match param.split_once(':') {
                        Some((n, default)) => {
                            (normalize_name(n.trim().trim_start_matches('$')), Some(default.trim().to_string()))
                        }
                        None => (normalize_name(param.trim().trim_start_matches('$')), None),
                    })
                    .collect();
                self.mixins.insert(normalize_name(mixin_name), Mixin { params, body: body.to_vec() });
            }
            ("include", _) => self.include(params, children, line, selectors, decls, out)?,
            ("content", None) => {
                if let Some(Some(block)) = self.content.last().cloned() {
                    self.compile_body(&block, selectors, decls, out)?;
                }
            }
            ("media" | "supports" | "container" | "document" | "-moz-document", Some(body)) => {
                let prelude = format!("@{} {}", name, self.eval(params, line)?);
                let mut inner = Vec::new();
                self.scopes.push(HashMap::new());
                let result = if selectors.is_empty() {
                    self.compile_body(body, &[], None, &mut inner)
                } else {
                    self.compile_rule(selectors.to_vec(), body, &mut inner)
                };
                self.scopes.pop();
                result?;
                out.push(Out::At { prelude, decls: vec![], body: inner });
            }
            (
                "extend" | "if" | "else" | "each" | "for" | "while" | "function" | "return" | "use"
                | "forward" | "at-root",
                _,
            ) => return Err(self.err(line, ScssErrorKind::Unsupported(name.to_string()))),
            ("debug" | "warn", None) => {
                log::warn!("{}:{}: {}", self.file.display(), line, self.eval(params, line)?);
            }
            ("error", None) => {
                return Err(self.err(line, ScssErrorKind::Custom(self.eval(params, line)?)));
            }
            (_, Some(body)) => {
                let params = self.interpolate(params, line)?;
                let prelude = format!("@{} {}", name, params).trim_end().to_string();
                let mut at_decls = Vec::new();
                let mut inner = Vec::new();
                self.scopes.push(HashMap::new());
                let result = self.compile_body(body, &[], Some(&mut at_decls), &mut inner);
                self.scopes.pop();
                result?;
                out.push(Out::At { prelude, decls: at_decls, body: inner });
            }
            (_, None) => {
                let params = self.interpolate(params, line)?;
                let text = if params.is_empty() { format!("@{};", name) } else { format!("@{} {};", name, params) };
                out.push(Out::Raw(text));
            }
        }
        Ok(())
    }

    fn import(
        &mut self,
        target: &str,
        line: usize,
        selectors: &[String],
        decls: Option<&mut Vec<String>>,
        out: &mut Vec<Out>,
    ) -> Result<(), ScssError> {
        let unquoted = target.trim_matches(|c| c == '"' || c == '\'');
        if is_plain_css_import(target, unquoted) {
            out.push(Out::Raw(format!("@import {};", target)));
            return Ok(());
        }

        let path = self
            .resolve_import(unquoted)
            .ok_or_else(|| self.err(line, ScssErrorKind::ImportNotFound(unquoted.to_string())))?;
        let key = canonical(&path);
        if self.import_stack.contains(&key) {
            return Err(self.err(line, ScssErrorKind::ImportCycle(path.display().to_string())));
        }

        let source = fs::read_to_string(&path)
            .map_err(|e| ScssError::new(&path, None, ScssErrorKind::Io(e)))?;
        let nodes = parse(&source, &path)?;

        self.import_stack.push(key);
        let importer = std::mem::replace(&mut self.file, path);
        let result = self.compile_body(&nodes, selectors, decls, out);
        self.file = importer;
        self.import_stack.pop();
        result
    }

    /// Find `name` as a partial (`_name.scss`), a plain file or a directory index.
    fn resolve_import(&self, target: &str) -> Option<PathBuf> {
        let own_dir = self.file.parent().map(Path::to_path_buf).unwrap_or_default();
        let dirs = std::iter::once(own_dir).chain(self.options.include_paths.iter().cloned());

        for dir in dirs {
            let base = dir.join(target);
            let Some(file_name) = base.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            let parent = base.parent().map(Path::to_path_buf).unwrap_or_default();
            let candidates = if file_name.ends_with(".scss") {
                vec![parent.join(&file_name), parent.join(format!("_{}", file_name))]
            } else {
                vec![
                    parent.join(format!("_{}.scss", file_name)),
                    parent.join(format!("{}.scss", file_name)),
                    base.join("_index.scss"),
                    base.join("index.scss"),
                ]
            };
            if let Some(found) = candidates.into_iter().find(|c| c.is_file()) {
                return Some(found);
            }
        }
        None
    }

    fn include(
        &mut self,
        params: &str,
        content: Option<&[Node]>,
        line: usize,
        selectors: &[String],
        decls: Option<&mut Vec<String>>,
        out: &mut Vec<Out>,
    ) -> Result<(), ScssError> {
        let (name, args) = split_call(params);
        let name = normalize_name(name);
        let mixin = self
            .mixins
            .get(&name)
            .cloned()
            .ok_or_else(|| self.err(line, ScssErrorKind::UndefinedMixin(name.clone())))?;
        if self.content.len() >= MAX_INCLUDE_DEPTH {
            return Err(self.err(line, ScssErrorKind::Custom(format!("@include {} nests too deeply", name))));
        }

        let mut positional = Vec::new();
        let mut named = HashMap::new();
        for arg in split_top_level(args) {
            match arg.strip_prefix('$').and_then(|a| a.split_once(':')) {
                Some((n, v)) => {
                    named.insert(normalize_name(n.trim()), self.eval(v.trim(), line)?);
                }
                None => positional.push(self.eval(&arg, line)?),
            }
        }

        self.scopes.push(HashMap::new());
        for (i, (param, default)) in mixin.params.iter().enumerate() {
            let value = match positional.get(i).cloned().or_else(|| named.remove(param)) {
                Some(value) => value,
                None => match default {
                    Some(default) => match self.eval(default, line) {
                        Ok(value) => value,
                        Err(e) => {
                            self.scopes.pop();
                            return Err(e);
                        }
                    },
                    None => {
                        self.scopes.pop();
                        return Err(self.err(
                            line,
                            ScssErrorKind::Custom(format!("missing argument ${} for @include {}", param, name)),
                        ));
                    }
                },
            };
            if let Some(scope) = self.scopes.last_mut() {
                scope.insert(param.clone(), value);
            }
        }

        self.content.push(content.map(<[Node]>::to_vec));
        let result = self.compile_body(&mixin.body, selectors, decls, out);
        self.content.pop();
        self.scopes.pop();
        result
    }

    fn lookup(&self, name: &str) -> Option<&String> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Assign a variable: `!global` writes the root scope, otherwise an
    /// existing local binding is updated, otherwise a new local is created.
    fn assign(&mut self, name: String, value: String, global: bool) {
        let depth = self.scopes.len();
        let target = if global || depth == 1 {
            0
        } else {
            (1..depth).rev().find(|&i| self.scopes[i].contains_key(&name)).unwrap_or(depth - 1)
        };
        self.scopes[target].insert(name, value);
    }

    /// Evaluate a value: interpolation, variables, arithmetic, color functions.
    fn eval(&self, value: &str, line: usize) -> Result<String, ScssError> {
        let value = self.interpolate(value, line)?;
        let value = self.substitute_variables(&value, line)?;
        Ok(functions::apply(&reduce_arithmetic(&value)))
    }

    /// Replace every `#{expr}` with the unquoted value of `expr`.
    fn interpolate(&self, text: &str, line: usize) -> Result<String, ScssError> {
        let mut out = String::new();
        let mut rest = text;
        while let Some(start) = rest.find("#{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let mut depth = 1usize;
            let mut end = None;
            for (i, c) in after.char_indices() {
                match c {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            end = Some(i);
                            break;
                        }
                    }
                    _ => {}
                }
            }
            let Some(end) = end else {
                return Err(self.err(line, ScssErrorKind::Syntax("unclosed interpolation".into())));
            };
            let value = self.eval(&after[..end], line)?;
            out.push_str(value.trim().trim_matches(|c| c == '"' || c == '\''));
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Replace `$name` references outside quoted strings.
    fn substitute_variables(&self, text: &str, line: usize) -> Result<String, ScssError> {
        if !text.contains('$') {
            return Ok(text.to_string());
        }
        let mut out = String::with_capacity(text.len());
        let mut quote: Option<char> = None;
        let mut chars = text.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            match (quote, c) {
                (Some(q), c) if c == q => {
                    quote = None;
                    out.push(c);
                }
                (Some(_), c) => out.push(c),
                (None, '"' | '\'') => {
                    quote = Some(c);
                    out.push(c);
                }
                (None, '$') => {
                    let start = i + 1;
                    let mut end = start;
                    while let Some(&(j, n)) = chars.peek() {
                        if n.is_ascii_alphanumeric() || n == '-' || n == '_' {
                            end = j + n.len_utf8();
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    if end == start {
                        out.push('$');
                        continue;
                    }
                    let name = normalize_name(&text[start..end]);
                    match self.lookup(&name) {
                        Some(value) => out.push_str(value),
                        None => return Err(self.err(line, ScssErrorKind::UndefinedVariable(name))),
                    }
                }
                (None, c) => out.push(c),
            }
        }
        Ok(out)
    }

    fn round(&self, value: &str) -> String {
        round_numbers(value, self.options.precision)
    }
}

fn outside_rule() -> ScssErrorKind {
    ScssErrorKind::Syntax("declarations may only be used within a rule".into())
}

/// Sass treats `-` and `_` in names as the same character.
fn normalize_name(name: &str) -> String {
    name.trim().replace('_', "-")
}

fn is_plain_css_import(target: &str, unquoted: &str) -> bool {
    let quoted = target.starts_with('"') || target.starts_with('\'');
    unquoted.ends_with(".css")
        || unquoted.starts_with("http://")
        || unquoted.starts_with("https://")
        || unquoted.starts_with("//")
        || target.starts_with("url(")
        || (quoted && !(target.ends_with('"') || target.ends_with('\'')))
}

/// Split `name(args)` into its name and argument text.
fn split_call(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.find('(') {
        Some(open) => {
            let close = text.rfind(')').filter(|&c| c > open).unwrap_or(text.len());
            (text[..open].trim(), &text[open + 1..close])
        }
        None => (text, ""),
    }
}

/// Split at commas outside parentheses and quotes; empty items dropped.
fn split_top_level(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut current = String::new();
    for c in text.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                items.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    items.push(current);
    items.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

/// Resolve child selectors against their parents.
///
/// `&` is replaced by the parent; otherwise the child becomes a descendant.
/// Comma lists multiply out.
fn combine_selectors(parents: &[String], children: &[String]) -> Vec<String> {
    if parents.is_empty() {
        return children.iter().map(|c| c.replace('&', "").trim().to_string()).collect();
    }
    parents
        .iter()
        .flat_map(|parent| {
            children.iter().map(move |child| {
                if child.contains('&') {
                    child.replace('&', parent)
                } else {
                    format!("{} {}", parent, child)
                }
            })
        })
        .collect()
}

static_regex!(
    paren_arith_re,
    r"(^|[\s(,:])\(\s*(-?\d*\.?\d+)([a-z%]*)\s*([-+*/])\s*(-?\d*\.?\d+)([a-z%]*)\s*\)"
);
static_regex!(
    arith_re,
    r"(^|[\s(,])(-?\d*\.?\d+)([a-z%]*)(\s+[-+]\s+|\s*\*\s*)(-?\d*\.?\d+)([a-z%]*)"
);
static_regex!(decimal_re, r"(^|[^\w.#-])(-?\d*\.\d+)");

/// Fold numeric expressions: `(a op b)` for `+ - * /`, and bare `a + b`,
/// `a - b`, `a * b`. Expressions with incompatible units are left alone.
fn reduce_arithmetic(value: &str) -> String {
    let mut current = value.to_string();
    for _ in 0..16 {
        let next = fold_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn fold_once(value: &str) -> String {
    for re in [paren_arith_re(), arith_re()] {
        for caps in re.captures_iter(value) {
            let (Some(m), Some(lead)) = (caps.get(0), caps.get(1)) else { continue };
            let (Ok(a), Ok(b)) = (caps[2].parse::<f64>(), caps[5].parse::<f64>()) else { continue };
            let Some(result) = compute(a, &caps[3], caps[4].trim(), b, &caps[6]) else { continue };
            return format!("{}{}{}{}", &value[..m.start()], lead.as_str(), result, &value[m.end()..]);
        }
    }
    value.to_string()
}

fn compute(a: f64, unit_a: &str, op: &str, b: f64, unit_b: &str) -> Option<String> {
    let (number, unit) = match op {
        "+" | "-" => {
            if !unit_a.is_empty() && !unit_b.is_empty() && unit_a != unit_b {
                return None;
            }
            let unit = if unit_a.is_empty() { unit_b } else { unit_a };
            (if op == "+" { a + b } else { a - b }, unit)
        }
        "*" => {
            if !unit_a.is_empty() && !unit_b.is_empty() {
                return None;
            }
            (a * b, if unit_a.is_empty() { unit_b } else { unit_a })
        }
        "/" => {
            if b == 0.0 {
                return None;
            }
            let unit = match (unit_a, unit_b) {
                (ua, "") => ua,
                (ua, ub) if ua == ub => "",
                _ => return None,
            };
            (a / b, unit)
        }
        _ => return None,
    };
    Some(format!("{}{}", format_number(number), unit))
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Round decimals outside quoted strings to `precision` digits.
pub fn round_numbers(value: &str, precision: u8) -> String {
    if !value.contains('.') {
        return value.to_string();
    }
    value
        .split_inclusive(['"', '\''])
        .scan(false, |in_string, segment| {
            let was_in_string = *in_string;
            if segment.ends_with(['"', '\'']) {
                *in_string = !*in_string;
            }
            Some(if was_in_string { segment.to_string() } else { round_segment(segment, precision) })
        })
        .collect()
}

fn round_segment(segment: &str, precision: u8) -> String {
    decimal_re()
        .replace_all(segment, |caps: &regex::Captures| {
            let Ok(n) = caps[2].parse::<f64>() else { return caps[0].to_string() };
            let rounded = format!("{:.*}", precision as usize, n);
            let rounded = if rounded.contains('.') {
                rounded.trim_end_matches('0').trim_end_matches('.').to_string()
            } else {
                rounded
            };
            let rounded = if rounded == "-0" { "0".to_string() } else { rounded };
            format!("{}{}", &caps[1], rounded)
        })
        .into_owned()
}
