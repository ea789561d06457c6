//! Line-granular source maps (revision 3).
//!
//! Every generated line maps, at column zero, to the start of one original
//! line. The bundler keeps the line count of each module, so this is enough
//! for stack traces and breakpoints to land on the right source line.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

const BASE64_CHARS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Append the base64 VLQ encoding of `value` to `out`.
pub fn encode_vlq(value: i64, out: &mut String) {
    let mut vlq = if value < 0 { ((-value) << 1) | 1 } else { value << 1 };
    loop {
        let mut digit = (vlq & 0b11111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b100000;
        }
        out.push(BASE64_CHARS[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMapJson<'a> {
    version: u8,
    file: &'a str,
    sources: &'a [String],
    sources_content: &'a [String],
    names: [&'a str; 0],
    mappings: String,
}

/// Builds a source map one generated line at a time.
#[derive(Debug, Default, Clone)]
pub struct SourceMapBuilder {
    sources: Vec<String>,
    contents: Vec<String>,
    /// (source index, 0-based original line) per generated line
    lines: Vec<Option<(usize, usize)>>,
}

impl SourceMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an original source; returns its index.
    pub fn add_source(&mut self, name: impl Into<String>, content: impl Into<String>) -> usize {
        self.sources.push(name.into());
        self.contents.push(content.into());
        self.sources.len() - 1
    }

    /// Add one generated line with no original counterpart.
    pub fn add_unmapped(&mut self) {
        self.lines.push(None);
    }

    /// Add one generated line mapped to `line` (0-based) of `source`.
    pub fn add_mapped(&mut self, source: usize, line: usize) {
        self.lines.push(Some((source, line)));
    }

    /// Number of generated lines recorded so far.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Encode the `mappings` field.
    pub fn mappings(&self) -> String {
        let mut out = String::new();
        let mut prev_source = 0i64;
        let mut prev_line = 0i64;
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            if let Some((source, orig)) = line {
                let (source, orig) = (*source as i64, *orig as i64);
                encode_vlq(0, &mut out);
                encode_vlq(source - prev_source, &mut out);
                encode_vlq(orig - prev_line, &mut out);
                encode_vlq(0, &mut out);
                prev_source = source;
                prev_line = orig;
            }
        }
        out
    }

    /// Serialize to source map JSON.
    pub fn to_json(&self, file: &str) -> String {
        let map = SourceMapJson {
            version: 3,
            file,
            sources: &self.sources,
            sources_content: &self.contents,
            names: [],
            mappings: self.mappings(),
        };
        serde_json::to_string(&map).unwrap_or_default()
    }

    /// The trailing comment that inlines the map as a data URL.
    pub fn to_inline_comment(&self, file: &str) -> String {
        format!(
            "//# sourceMappingURL=data:application/json;charset=utf-8;base64,{}",
            STANDARD.encode(self.to_json(file))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vlq(value: i64) -> String {
        let mut out = String::new();
        encode_vlq(value, &mut out);
        out
    }

    #[test]
    fn test_encode_vlq() {
        assert_eq!(vlq(0), "A");
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(-1), "D");
        assert_eq!(vlq(15), "e");
        assert_eq!(vlq(16), "gB");
        assert_eq!(vlq(-17), "jB");
    }

    #[test]
    fn test_mappings_relative_across_lines() {
        let mut map = SourceMapBuilder::new();
        let a = map.add_source("a.js", "x\ny");
        let b = map.add_source("b.js", "z");
        map.add_unmapped();
        map.add_mapped(a, 0);
        map.add_mapped(a, 1);
        map.add_unmapped();
        map.add_mapped(b, 0);
        assert_eq!(map.mappings(), ";AAAA;AACA;;ACDA");
        assert_eq!(map.line_count(), 5);
    }

    #[test]
    fn test_to_json() {
        let mut map = SourceMapBuilder::new();
        let a = map.add_source("src/js/a.js", "var a;");
        map.add_mapped(a, 0);
        let json: serde_json::Value = serde_json::from_str(&map.to_json("a.js")).unwrap();
        assert_eq!(json["version"], 3);
        assert_eq!(json["file"], "a.js");
        assert_eq!(json["sources"][0], "src/js/a.js");
        assert_eq!(json["sourcesContent"][0], "var a;");
        assert_eq!(json["mappings"], "AAAA");
    }

    #[test]
    fn test_inline_comment_round_trips() {
        let mut map = SourceMapBuilder::new();
        map.add_source("a.js", "");
        let comment = map.to_inline_comment("a.js");
        let prefix = "//# sourceMappingURL=data:application/json;charset=utf-8;base64,";
        assert!(comment.starts_with(prefix));
        let decoded = STANDARD.decode(&comment[prefix.len()..]).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), map.to_json("a.js"));
    }
}
