//! Lexical scan of script sources.
//!
//! Finds the comment, string, template and regular expression spans of a
//! script without parsing it. The bundler, the minifier and the linter all
//! work on source text with some of these spans blanked out, so that an
//! `import` inside a comment or a `==` inside a string is never mistaken for
//! code.

/// Kind of a non-code span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    LineComment,
    BlockComment,
    /// Single or double quoted string literal
    String,
    /// Template literal, including any `${}` expressions
    Template,
    Regex,
}

impl SpanKind {
    pub fn is_comment(self) -> bool {
        matches!(self, SpanKind::LineComment | SpanKind::BlockComment)
    }
}

/// A non-code span of the source, as a byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub kind: SpanKind,
    pub start: usize,
    pub end: usize,
    /// False when the source ended (or a line ended) before the closing delimiter
    pub terminated: bool,
}

impl Span {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

/// Keywords after which a `/` starts a regular expression.
const REGEX_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
];

/// Keywords whose parenthesised head may be followed by a statement.
const CONTROL_HEADS: &[&str] = &["if", "while", "for", "with"];

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Scan a script and return its non-code spans in source order.
pub fn scan(source: &str) -> Vec<Span> {
    let bytes = source.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    // Last significant code byte and, if it ended a word, that word
    let mut prev: Option<u8> = None;
    let mut prev_word: Option<&str> = None;
    // Open parens, flagged when they start an `if`/`while`/`for` head
    let mut parens: Vec<bool> = Vec::new();
    // The last `)` closed such a head, so a statement (maybe a regex) follows
    let mut head_closed = false;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        let start = i;

        let span = match b {
            b'/' if next == Some(b'/') => {
                let end = find_byte(bytes, i, b'\n').unwrap_or(bytes.len());
                Some(Span { kind: SpanKind::LineComment, start, end, terminated: true })
            }
            b'/' if next == Some(b'*') => Some(match find_seq(bytes, i + 2, b"*/") {
                Some(pos) => Span { kind: SpanKind::BlockComment, start, end: pos + 2, terminated: true },
                None => Span { kind: SpanKind::BlockComment, start, end: bytes.len(), terminated: false },
            }),
            b'\'' | b'"' => {
                let (end, terminated) = scan_string(bytes, i, b);
                Some(Span { kind: SpanKind::String, start, end, terminated })
            }
            b'`' => {
                let (end, terminated) = scan_template(bytes, i);
                Some(Span { kind: SpanKind::Template, start, end, terminated })
            }
            b'/' if regex_allowed(prev, prev_word, head_closed) => {
                let (end, terminated) = scan_regex(bytes, i);
                Some(Span { kind: SpanKind::Regex, start, end, terminated })
            }
            _ => None,
        };

        if let Some(span) = span {
            if !span.kind.is_comment() {
                prev = Some(b'"');
                prev_word = None;
                head_closed = false;
            }
            i = span.end.max(i + 1);
            spans.push(span);
            continue;
        }

        if is_ident_byte(b) {
            let mut end = i;
            while end < bytes.len() && is_ident_byte(bytes[end]) {
                end += 1;
            }
            prev = Some(bytes[end - 1]);
            prev_word = source.get(i..end);
            head_closed = false;
            i = end;
            continue;
        }

        if !b.is_ascii_whitespace() {
            head_closed = match b {
                b'(' => {
                    parens.push(prev_word.is_some_and(|w| CONTROL_HEADS.contains(&w)));
                    false
                }
                b')' => parens.pop().unwrap_or(false),
                _ => false,
            };
            prev = Some(b);
            prev_word = None;
        }
        i += 1;
    }

    spans
}

fn regex_allowed(prev: Option<u8>, prev_word: Option<&str>, head_closed: bool) -> bool {
    match prev {
        None => true,
        Some(b) if is_ident_byte(b) => prev_word.is_some_and(|w| REGEX_KEYWORDS.contains(&w)),
        Some(b')') => head_closed,
        Some(b']') | Some(b'"') => false,
        Some(_) => true,
    }
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes[from..].iter().position(|&b| b == needle).map(|p| p + from)
}

fn find_seq(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > bytes.len() {
        return None;
    }
    bytes[from..].windows(needle.len()).position(|w| w == needle).map(|p| p + from)
}

/// Scan a quoted string starting at `start`; returns (end, terminated).
fn scan_string(bytes: &[u8], start: usize, quote: u8) -> (usize, bool) {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return (i, false),
            b if b == quote => return (i + 1, true),
            _ => i += 1,
        }
    }
    (bytes.len(), false)
}

/// Scan a template literal starting at the backtick at `start`.
fn scan_template(bytes: &[u8], start: usize) -> (usize, bool) {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return (i + 1, true),
            b'$' if bytes.get(i + 1) == Some(&b'{') => match scan_expression(bytes, i + 2) {
                Some(end) => i = end,
                None => return (bytes.len(), false),
            },
            _ => i += 1,
        }
    }
    (bytes.len(), false)
}

/// Skip a `${...}` expression; returns the index after the closing brace.
fn scan_expression(bytes: &[u8], mut i: usize) -> Option<usize> {
    let mut depth = 1usize;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            q @ (b'\'' | b'"') => {
                let (end, terminated) = scan_string(bytes, i, q);
                if !terminated {
                    return None;
                }
                i = end;
                continue;
            }
            b'`' => {
                let (end, terminated) = scan_template(bytes, i);
                if !terminated {
                    return None;
                }
                i = end;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Scan a regex literal starting at the slash at `start`.
fn scan_regex(bytes: &[u8], start: usize) -> (usize, bool) {
    let mut i = start + 1;
    let mut in_class = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return (i, false),
            b'[' => {
                in_class = true;
                i += 1;
            }
            b']' => {
                in_class = false;
                i += 1;
            }
            b'/' if !in_class => {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                    i += 1;
                }
                return (i, true);
            }
            _ => i += 1,
        }
    }
    (bytes.len(), false)
}

/// Blank out the spans whose kind passes `blank`, keeping newlines.
///
/// Byte offsets and line numbers of the result match the source.
pub fn mask(source: &str, spans: &[Span], blank: impl Fn(SpanKind) -> bool) -> String {
    let mut out = source.as_bytes().to_vec();
    for span in spans.iter().filter(|s| blank(s.kind)) {
        for b in &mut out[span.start..span.end.min(source.len())] {
            if *b != b'\n' {
                *b = b' ';
            }
        }
    }
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Blank out every comment, string, template and regex.
pub fn code_only(source: &str) -> String {
    mask(source, &scan(source), |_| true)
}

/// 1-based line and column of a byte offset.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let col = before.rfind('\n').map_or(before.len(), |nl| before.len() - nl - 1) + 1;
    (line, col)
}
