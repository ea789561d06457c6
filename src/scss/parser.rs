//! SCSS statement parser.
//!
//! Produces a tree of rules, declarations, variables and at-rules. Values
//! and selectors are kept as raw text; they are evaluated by the compiler.

use super::{ScssError, ScssErrorKind};
use std::path::Path;

/// A parsed SCSS statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `selector { ... }`
    Rule { selector: String, children: Vec<Node>, line: usize },
    /// `property: value`
    Decl { property: String, value: String, line: usize },
    /// `font: { family: x; }` or `margin: 0 { left: 1px; }`
    NestedProperty { property: String, value: Option<String>, children: Vec<Node>, line: usize },
    /// `$name: value [!default] [!global]`
    Variable { name: String, value: String, default: bool, global: bool, line: usize },
    /// `@name params;` or `@name params { ... }`
    AtRule { name: String, params: String, children: Option<Vec<Node>>, line: usize },
}

impl Node {
    pub fn line(&self) -> usize {
        match self {
            Node::Rule { line, .. }
            | Node::Decl { line, .. }
            | Node::NestedProperty { line, .. }
            | Node::Variable { line, .. }
            | Node::AtRule { line, .. } => *line,
        }
    }
}

/// Parse a stylesheet.
pub fn parse(source: &str, file: &Path) -> Result<Vec<Node>, ScssError> {
    let mut parser = Parser {
        bytes: source.as_bytes(),
        source,
        pos: 0,
        file,
        line_starts: std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect(),
    };
    parser.parse_block(None)
}

struct Parser<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    file: &'a Path,
    line_starts: Vec<usize>,
}

enum Terminator {
    Semicolon,
    Open,
    Close,
    Eof,
}

impl<'a> Parser<'a> {
    fn line_at(&self, pos: usize) -> usize {
        match self.line_starts.binary_search(&pos) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    }

    fn error(&self, line: usize, message: impl Into<String>) -> ScssError {
        ScssError::new(self.file, Some(line), ScssErrorKind::Syntax(message.into()))
    }

    fn parse_block(&mut self, opened_at: Option<usize>) -> Result<Vec<Node>, ScssError> {
        let mut nodes = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.pos >= self.bytes.len() {
                return match opened_at {
                    Some(line) => Err(self.error(line, "unclosed block")),
                    None => Ok(nodes),
                };
            }
            if self.bytes[self.pos] == b'}' {
                if opened_at.is_none() {
                    return Err(self.error(self.line_at(self.pos), "unexpected '}'"));
                }
                self.pos += 1;
                return Ok(nodes);
            }

            let line = self.line_at(self.pos);
            let (prelude, terminator) = self.read_prelude(line)?;
            match terminator {
                Terminator::Open => {
                    self.pos += 1;
                    let children = self.parse_block(Some(line))?;
                    nodes.push(self.block_node(prelude, children, line)?);
                }
                Terminator::Semicolon => {
                    self.pos += 1;
                    nodes.extend(self.statement_node(prelude, line)?);
                }
                Terminator::Close | Terminator::Eof => {
                    nodes.extend(self.statement_node(prelude, line)?);
                }
            }
        }
    }

    /// Skip whitespace and comments between statements.
    fn skip_trivia(&mut self) -> Result<(), ScssError> {
        while self.pos < self.bytes.len() {
            match (self.bytes[self.pos], self.bytes.get(self.pos + 1)) {
                (b, _) if b.is_ascii_whitespace() => self.pos += 1,
                (b'/', Some(b'/')) => {
                    while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                (b'/', Some(b'*')) => self.skip_block_comment()?,
                _ => break,
            }
        }
        Ok(())
    }

    fn skip_block_comment(&mut self) -> Result<(), ScssError> {
        let line = self.line_at(self.pos);
        match self.source[self.pos + 2..].find("*/") {
            Some(end) => {
                self.pos += 2 + end + 2;
                Ok(())
            }
            None => Err(self.error(line, "unterminated comment")),
        }
    }

    /// Read statement text up to `;`, `{` or `}` at nesting depth zero.
    ///
    /// Comments are dropped; `#{...}` interpolation and parentheses nest.
    fn read_prelude(&mut self, line: usize) -> Result<(String, Terminator), ScssError> {
        let mut out = String::new();
        let mut parens = 0usize;
        let mut interp = 0usize;
        let mut chunk_start = self.pos;

        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            let next = self.bytes.get(self.pos + 1).copied();
            match b {
                b'"' | b'\'' => {
                    let start = self.pos;
                    self.pos += 1;
                    loop {
                        match self.bytes.get(self.pos) {
                            None | Some(b'\n') => {
                                return Err(self.error(self.line_at(start), "unterminated string"))
                            }
                            Some(b'\\') => self.pos += 2,
                            Some(&c) if c == b => {
                                self.pos += 1;
                                break;
                            }
                            Some(_) => self.pos += 1,
                        }
                    }
                    continue;
                }
                b'/' if next == Some(b'*') => {
                    out.push_str(&self.source[chunk_start..self.pos]);
                    self.skip_block_comment()?;
                    chunk_start = self.pos;
                    continue;
                }
                b'/' if next == Some(b'/') && parens == 0 => {
                    out.push_str(&self.source[chunk_start..self.pos]);
                    while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                    chunk_start = self.pos;
                    continue;
                }
                b'#' if next == Some(b'{') => {
                    interp += 1;
                    self.pos += 2;
                    continue;
                }
                b'(' => parens += 1,
                b')' => parens = parens.saturating_sub(1),
                b'}' if interp > 0 => interp -= 1,
                b';' | b'{' | b'}' if parens == 0 => {
                    out.push_str(&self.source[chunk_start..self.pos]);
                    let terminator = match b {
                        b';' => Terminator::Semicolon,
                        b'{' => Terminator::Open,
                        _ => Terminator::Close,
                    };
                    return Ok((out.trim().to_string(), terminator));
                }
                _ => {}
            }
            self.pos += 1;
        }

        if interp > 0 {
            return Err(self.error(line, "unclosed interpolation"));
        }
        out.push_str(&self.source[chunk_start..self.pos.min(self.bytes.len())]);
        Ok((out.trim().to_string(), Terminator::Eof))
    }

    fn statement_node(&self, prelude: String, line: usize) -> Result<Option<Node>, ScssError> {
        if prelude.is_empty() {
            return Ok(None);
        }

        if let Some(rest) = prelude.strip_prefix('@') {
            let (name, params) = split_at_rule(rest);
            return Ok(Some(Node::AtRule { name, params, children: None, line }));
        }

        let Some(colon) = find_colon(&prelude) else {
            return Err(self.error(line, format!("expected ':' in \"{}\"", prelude)));
        };
        let name = prelude[..colon].trim();
        let mut value = prelude[colon + 1..].trim().to_string();

        if let Some(var) = name.strip_prefix('$') {
            let mut default = false;
            let mut global = false;
            loop {
                if let Some(v) = value.strip_suffix("!default") {
                    default = true;
                    value = v.trim_end().to_string();
                } else if let Some(v) = value.strip_suffix("!global") {
                    global = true;
                    value = v.trim_end().to_string();
                } else {
                    break;
                }
            }
            if value.is_empty() {
                return Err(self.error(line, format!("expected value for ${}", var)));
            }
            return Ok(Some(Node::Variable { name: var.to_string(), value, default, global, line }));
        }

        if name.is_empty() || value.is_empty() {
            return Err(self.error(line, format!("expected declaration, found \"{}\"", prelude)));
        }
        Ok(Some(Node::Decl { property: name.to_string(), value, line }))
    }

    fn block_node(&self, prelude: String, children: Vec<Node>, line: usize) -> Result<Node, ScssError> {
        if prelude.is_empty() {
            return Err(self.error(line, "expected selector"));
        }
        if let Some(rest) = prelude.strip_prefix('@') {
            let (name, params) = split_at_rule(rest);
            return Ok(Node::AtRule { name, params, children: Some(children), line });
        }
        if let Some((property, value)) = nested_property(&prelude) {
            return Ok(Node::NestedProperty { property, value, children, line });
        }
        Ok(Node::Rule { selector: prelude, children, line })
    }
}

fn split_at_rule(rest: &str) -> (String, String) {
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(rest.len());
    (rest[..end].to_string(), rest[end..].trim().to_string())
}

/// First `:` outside `#{}` interpolation.
fn find_colon(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut interp = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'#' if bytes.get(i + 1) == Some(&b'{') => {
                interp += 1;
                i += 1;
            }
            b'}' if interp > 0 => interp -= 1,
            b':' if interp == 0 => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// `font:` or `margin: 0` before a block opens a nested property group.
///
/// `a:hover` is a selector: the colon of a nested property is followed by
/// whitespace or nothing.
fn nested_property(prelude: &str) -> Option<(String, Option<String>)> {
    let colon = prelude.find(':')?;
    let name = &prelude[..colon];
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
        return None;
    }
    let rest = &prelude[colon + 1..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let value = rest.trim();
    Some((name.to_string(), (!value.is_empty()).then(|| value.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Vec<Node> {
        parse(source, Path::new("test.scss")).unwrap()
    }

    fn parse_err(source: &str) -> ScssError {
        parse(source, Path::new("test.scss")).unwrap_err()
    }

    #[test]
    fn test_parse_rule_with_declarations() {
        let nodes = parse_ok(".a {\n  color: red;\n  margin: 0\n}\n");
        assert_eq!(
            nodes,
            vec![Node::Rule {
                selector: ".a".into(),
                children: vec![
                    Node::Decl { property: "color".into(), value: "red".into(), line: 2 },
                    Node::Decl { property: "margin".into(), value: "0".into(), line: 3 },
                ],
                line: 1,
            }]
        );
    }

    #[test]
    fn test_parse_variables_with_flags() {
        let nodes = parse_ok("$a: 1px !default;\n$b: red !global;\n$c: 2;");
        assert!(matches!(&nodes[0], Node::Variable { name, default: true, global: false, .. } if name == "a"));
        assert!(matches!(&nodes[1], Node::Variable { value, global: true, .. } if value == "red"));
        assert!(matches!(&nodes[2], Node::Variable { default: false, line: 3, .. }));
    }

    #[test]
    fn test_parse_skips_comments() {
        let nodes = parse_ok("// line\n/* block */\na { /* in */ color: red; // trailing\n}");
        assert_eq!(nodes.len(), 1);
        let Node::Rule { children, .. } = &nodes[0] else { panic!("expected rule") };
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn test_parse_url_with_double_slash() {
        let nodes = parse_ok("a { background: url(http://x.test/a.png); }");
        let Node::Rule { children, .. } = &nodes[0] else { panic!("expected rule") };
        assert_eq!(
            children[0],
            Node::Decl {
                property: "background".into(),
                value: "url(http://x.test/a.png)".into(),
                line: 1
            }
        );
    }

    #[test]
    fn test_parse_pseudo_selector_vs_nested_property() {
        let nodes = parse_ok("a:hover { color: red; }\nb { font: { family: x; } }");
        assert!(matches!(&nodes[0], Node::Rule { selector, .. } if selector == "a:hover"));
        let Node::Rule { children, .. } = &nodes[1] else { panic!("expected rule") };
        assert!(matches!(&children[0], Node::NestedProperty { property, value: None, .. } if property == "font"));
    }

    #[test]
    fn test_parse_interpolation_braces() {
        let nodes = parse_ok(".icon-#{$name} { width: #{$w}px; }");
        assert!(matches!(&nodes[0], Node::Rule { selector, .. } if selector == ".icon-#{$name}"));
    }

    #[test]
    fn test_parse_at_rules() {
        let nodes = parse_ok("@import 'a', 'b';\n@media (min-width: 10px) { a { b: c; } }");
        assert!(matches!(&nodes[0], Node::AtRule { name, params, children: None, .. } if name == "import" && params == "'a', 'b'"));
        assert!(matches!(&nodes[1], Node::AtRule { name, children: Some(c), line: 2, .. } if name == "media" && c.len() == 1));
    }

    #[test]
    fn test_parse_errors_carry_lines() {
        let err = parse_err("a {\n  color red;\n}");
        assert_eq!(err.line, Some(2));

        let err = parse_err("a {\n  color: red;\n");
        assert_eq!(err.line, Some(1));
        assert!(err.to_string().contains("unclosed block"));

        let err = parse_err("a { color: red; }\n}");
        assert_eq!(err.line, Some(2));

        let err = parse_err("a { content: 'open; }");
        assert!(err.to_string().contains("unterminated string"));
    }
}
