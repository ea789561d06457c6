//! Stylesheet rules, checked on the parsed SCSS tree.

use super::Finding;
use crate::scss::parser::{parse, Node};
use std::collections::HashSet;
use std::path::Path;

static_regex!(hex_re, r"(?:^|[\s,(])(#([0-9A-Za-z]+))");

/// Check a stylesheet against the rule set.
pub fn lint(file: &Path, source: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    match parse(source, file) {
        Ok(nodes) => check_nodes(&mut Checker { file, source, findings: &mut findings }, &nodes),
        Err(e) => findings.push(Finding::error(
            file,
            (e.line.unwrap_or(1), 1),
            "parse-error",
            e.kind.to_string(),
        )),
    }

    for (idx, line) in source.lines().enumerate() {
        let trimmed = line.trim_end();
        if trimmed.len() != line.len() {
            findings.push(Finding::warning(
                file,
                (idx + 1, trimmed.len() + 1),
                "no-eol-whitespace",
                "Unexpected whitespace at end of line",
            ));
        }
    }
    findings
}

struct Checker<'a> {
    file: &'a Path,
    source: &'a str,
    findings: &'a mut Vec<Finding>,
}

impl Checker<'_> {
    /// Column of `needle` on a 1-indexed line, or 1 if it is not there.
    fn col(&self, line: usize, needle: &str) -> usize {
        self.source
            .lines()
            .nth(line.saturating_sub(1))
            .and_then(|text| text.find(needle))
            .map_or(1, |i| i + 1)
    }

    fn check_value(&mut self, value: &str, line: usize) {
        for caps in hex_re().captures_iter(value) {
            let digits = &caps[2];
            let valid = matches!(digits.len(), 3 | 4 | 6 | 8)
                && digits.bytes().all(|b| b.is_ascii_hexdigit());
            if !valid {
                let col = self.col(line, &caps[1]);
                self.findings.push(Finding::error(
                    self.file,
                    (line, col),
                    "color-no-invalid-hex",
                    format!("Unexpected invalid hex color \"{}\"", &caps[1]),
                ));
            }
        }
        if value.contains("!important") {
            let col = self.col(line, "!important");
            self.findings.push(Finding::warning(
                self.file,
                (line, col),
                "declaration-no-important",
                "Unexpected !important",
            ));
        }
    }
}

fn check_nodes(checker: &mut Checker<'_>, nodes: &[Node]) {
    let mut seen = HashSet::new();
    for node in nodes {
        match node {
            Node::Rule { selector, children, line } => {
                if children.is_empty() {
                    let col = checker.col(*line, "{");
                    checker.findings.push(Finding::warning(
                        checker.file,
                        (*line, col),
                        "block-no-empty",
                        format!("Unexpected empty block in '{}'", selector),
                    ));
                }
                check_nodes(checker, children);
            }
            Node::Decl { property, value, line } => {
                if !seen.insert(property.as_str()) {
                    let col = checker.col(*line, property);
                    checker.findings.push(Finding::warning(
                        checker.file,
                        (*line, col),
                        "declaration-block-no-duplicate-properties",
                        format!("Unexpected duplicate \"{}\"", property),
                    ));
                }
                // Interpolation is not a color
                if !value.contains("#{") {
                    checker.check_value(value, *line);
                }
            }
            Node::Variable { value, line, .. } => {
                if !value.contains("#{") {
                    checker.check_value(value, *line);
                }
            }
            Node::NestedProperty { value, children, line, .. } => {
                if let Some(value) = value {
                    checker.check_value(value, *line);
                }
                check_nodes(checker, children);
            }
            Node::AtRule { children: Some(children), .. } => check_nodes(checker, children),
            Node::AtRule { children: None, .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::Severity;

    fn lint_str(source: &str) -> Vec<Finding> {
        lint(Path::new("a.scss"), source)
    }

    fn rules(source: &str) -> Vec<&'static str> {
        lint_str(source).into_iter().map(|f| f.rule).collect()
    }

    #[test]
    fn test_clean_stylesheet() {
        assert!(rules("$c: #fff;\n.a {\n  color: $c;\n  &:hover { color: #123456; }\n}\n").is_empty());
    }

    #[test]
    fn test_invalid_hex() {
        let findings = lint_str(".a {\n  color: #ggg;\n}\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, "color-no-invalid-hex");
        assert_eq!((findings[0].line, findings[0].col), (2, 10));
        assert_eq!(findings[0].severity, Severity::Error);

        assert_eq!(rules("$c: #12345;\n"), vec!["color-no-invalid-hex"]);
    }

    #[test]
    fn test_id_selectors_are_not_colors() {
        assert!(rules("#main .b { color: red; }\n").is_empty());
    }

    #[test]
    fn test_empty_block_and_duplicates() {
        assert_eq!(rules(".a {}\n"), vec!["block-no-empty"]);
        assert_eq!(
            rules(".a {\n  color: red;\n  color: blue;\n}\n"),
            vec!["declaration-block-no-duplicate-properties"]
        );
    }

    #[test]
    fn test_important_and_eol_whitespace() {
        assert_eq!(rules(".a { color: red !important; }\n"), vec!["declaration-no-important"]);
        assert_eq!(rules(".a { color: red; }  \n"), vec!["no-eol-whitespace"]);
    }

    #[test]
    fn test_parse_error_reported() {
        let findings = lint_str(".a {\n  color red;\n}\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, "parse-error");
        assert_eq!(findings[0].line, 2);
    }
}
