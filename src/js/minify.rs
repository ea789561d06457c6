//! Conservative script minification.
//!
//! Strips comments (keeping `/*!` license comments), drops indentation,
//! blank lines and optional spaces. Line breaks between statements are kept
//! so automatic semicolon insertion still sees them. Strings, templates and
//! regular expressions are copied untouched.

use super::scan::{scan, SpanKind};

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Whether a space between `prev` and `next` must be kept.
fn space_required(prev: u8, next: u8) -> bool {
    if is_word_byte(prev) && is_word_byte(next) {
        return true;
    }
    // `a + +b`, `a - -b`, and a regex or comment opener after a slash
    matches!((prev, next), (b'+', b'+') | (b'-', b'-') | (b'+', b'-') | (b'-', b'+'))
        || prev == b'/'
        || next == b'/'
}

/// Minify a script.
pub fn minify(source: &str) -> String {
    let bytes = source.as_bytes();
    let spans = scan(source);
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());

    // Pending whitespace run: (seen any, contains newline)
    let mut pending = (false, false);
    let mut spans = spans.iter().peekable();
    let mut i = 0;

    while i < bytes.len() {
        if let Some(span) = spans.peek().filter(|s| s.start == i).copied() {
            spans.next();
            let text = &bytes[span.start..span.end];
            let keep = match span.kind {
                SpanKind::BlockComment => text.starts_with(b"/*!"),
                SpanKind::LineComment => false,
                _ => true,
            };
            if keep {
                flush(&mut out, &mut pending, text[0]);
                out.extend_from_slice(text);
                if span.kind == SpanKind::BlockComment {
                    pending = (true, true);
                }
            } else {
                pending.0 = true;
                pending.1 |= text.contains(&b'\n');
            }
            i = span.end.max(i + 1);
            continue;
        }

        let b = bytes[i];
        if b.is_ascii_whitespace() {
            pending.0 = true;
            pending.1 |= b == b'\n';
        } else {
            flush(&mut out, &mut pending, b);
            out.push(b);
        }
        i += 1;
    }

    if out.last() != Some(&b'\n') && !out.is_empty() {
        out.push(b'\n');
    }

    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Emit the pending whitespace run before `next`, if it is needed at all.
fn flush(out: &mut Vec<u8>, pending: &mut (bool, bool), next: u8) {
    let (seen, newline) = *pending;
    *pending = (false, false);
    let Some(&prev) = out.last() else {
        return;
    };
    if !seen || prev == b'\n' {
        return;
    }
    if newline {
        out.push(b'\n');
    } else if space_required(prev, next) {
        out.push(b' ');
    }
}
