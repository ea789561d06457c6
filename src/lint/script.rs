//! Script rules
//!
//! Rules run on the source with comments, strings, templates and regexes
//! blanked out, so nothing inside a literal is flagged.

use super::Finding;
use crate::js::scan::{line_col, mask, scan, SpanKind};
use std::path::Path;

static_regex!(debugger_re, r"\bdebugger\b");
static_regex!(eval_re, r"\beval\s*\(");
static_regex!(var_re, r"\bvar\s");

/// Check a script against the rule set.
pub fn lint(file: &Path, source: &str) -> Vec<Finding> {
    let spans = scan(source);
    let code = mask(source, &spans, |_| true);
    let at = |offset: usize| line_col(source, offset);

    let mut findings = Vec::new();

    for span in spans.iter().filter(|s| !s.terminated) {
        let what = match span.kind {
            SpanKind::String => "Unterminated string literal",
            SpanKind::Template => "Unterminated template literal",
            SpanKind::BlockComment => "Unterminated comment",
            SpanKind::Regex => "Unterminated regular expression",
            SpanKind::LineComment => continue,
        };
        findings.push(Finding::error(file, at(span.start), "parse-error", what));
    }
    if let Some(finding) = check_brackets(file, source, &code) {
        findings.push(finding);
    }

    for m in debugger_re().find_iter(&code).filter(|m| !is_member(&code, m.start())) {
        findings.push(Finding::error(
            file,
            at(m.start()),
            "no-debugger",
            "Unexpected 'debugger' statement",
        ));
    }
    for m in eval_re().find_iter(&code).filter(|m| !is_member(&code, m.start())) {
        findings.push(Finding::error(file, at(m.start()), "no-eval", "eval can be harmful"));
    }
    for (offset, op) in loose_equality(&code) {
        findings.push(Finding::error(
            file,
            at(offset),
            "eqeqeq",
            format!("Expected '{op}=' and instead saw '{op}'"),
        ));
    }
    for m in var_re().find_iter(&code).filter(|m| !is_member(&code, m.start())) {
        findings.push(Finding::warning(
            file,
            at(m.start()),
            "no-var",
            "Unexpected var, use let or const instead",
        ));
    }

    findings.extend(layout_findings(file, source));
    findings
}

/// Whether the word at `offset` is a property name (`obj.var`, `obj?.eval`).
fn is_member(code: &str, offset: usize) -> bool {
    code[..offset].trim_end().ends_with('.')
}

/// Offsets of `==` and `!=` that are not part of a strict comparison.
fn loose_equality(code: &str) -> Vec<(usize, &'static str)> {
    let bytes = code.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i + 1] != b'=' || !matches!(bytes[i], b'=' | b'!') {
            i += 1;
            continue;
        }
        let strict = bytes.get(i + 2) == Some(&b'=');
        let compound = bytes[i] == b'=' && i > 0 && matches!(bytes[i - 1], b'=' | b'!' | b'<' | b'>');
        if strict {
            i += 3;
            continue;
        }
        if !compound {
            found.push((i, if bytes[i] == b'!' { "!=" } else { "==" }));
        }
        i += 2;
    }
    found
}

/// First unbalanced bracket, if any.
fn check_brackets(file: &Path, source: &str, code: &str) -> Option<Finding> {
    let mut stack: Vec<(u8, usize)> = Vec::new();
    for (i, b) in code.bytes().enumerate() {
        match b {
            b'(' | b'[' | b'{' => stack.push((b, i)),
            b')' | b']' | b'}' => {
                let expected = match b {
                    b')' => b'(',
                    b']' => b'[',
                    _ => b'{',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    _ => {
                        return Some(Finding::error(
                            file,
                            line_col(source, i),
                            "parse-error",
                            format!("Unexpected token '{}'", b as char),
                        ))
                    }
                }
            }
            _ => {}
        }
    }
    stack.pop().map(|(open, i)| {
        Finding::error(file, line_col(source, i), "parse-error", format!("Unclosed '{}'", open as char))
    })
}

/// Whitespace rules checked line by line on the raw text.
fn layout_findings(file: &Path, source: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut empty_run = 0;
    for (idx, line) in source.lines().enumerate() {
        let trimmed = line.trim_end();
        if trimmed.len() != line.len() && !trimmed.is_empty() {
            findings.push(Finding::warning(
                file,
                (idx + 1, trimmed.len() + 1),
                "no-trailing-spaces",
                "Trailing spaces not allowed",
            ));
        }
        if trimmed.is_empty() {
            empty_run += 1;
            if empty_run == 3 {
                findings.push(Finding::warning(
                    file,
                    (idx + 1, 1),
                    "no-multiple-empty-lines",
                    "More than 2 blank lines not allowed",
                ));
            }
        } else {
            empty_run = 0;
        }
    }
    if !source.is_empty() && !source.ends_with('\n') {
        findings.push(Finding::warning(
            file,
            line_col(source, source.len()),
            "eol-last",
            "Newline required at end of file but not found",
        ));
    }
    findings
}
