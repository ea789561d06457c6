//! CSS post-processing with lightningcss: vendor prefixing for the
//! configured browser targets, and minification.

use crate::config::{parse_browser_version, TargetsConfig};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use thiserror::Error;

/// Error from CSS post-processing
#[derive(Debug, Error)]
pub enum CssError {
    /// The compiled stylesheet is not valid CSS
    #[error("CSS parse error: {message}")]
    Parse { message: String, line: Option<usize> },
    /// Rule transformation failed
    #[error("CSS minify error: {0}")]
    Minify(String),
    /// Serialization failed
    #[error("CSS print error: {0}")]
    Print(String),
}

impl CssError {
    /// 1-based line of the error in the processed text, if known.
    pub fn line(&self) -> Option<usize> {
        match self {
            CssError::Parse { line, .. } => *line,
            _ => None,
        }
    }
}

/// Browser targets from the `[targets]` config section.
pub fn targets_from_config(config: &TargetsConfig) -> Targets {
    let version = |v: &Option<String>| v.as_deref().and_then(parse_browser_version);
    Targets::from(Browsers {
        chrome: version(&config.chrome),
        firefox: version(&config.firefox),
        edge: version(&config.edge),
        safari: version(&config.safari),
        ..Browsers::default()
    })
}

/// Add vendor prefixes for `targets`, optionally minifying the output.
pub fn process(css: &str, filename: &str, targets: Targets, minify: bool) -> Result<String, CssError> {
    let options = ParserOptions { filename: filename.to_string(), ..ParserOptions::default() };
    let mut sheet = StyleSheet::parse(css, options).map_err(|e| CssError::Parse {
        message: e.kind.to_string(),
        line: e.loc.as_ref().map(|loc| loc.line as usize + 1),
    })?;

    sheet
        .minify(MinifyOptions { targets: targets.clone(), ..MinifyOptions::default() })
        .map_err(|e| CssError::Minify(e.to_string()))?;

    let result = sheet
        .to_css(PrinterOptions { minify, targets, ..PrinterOptions::default() })
        .map_err(|e| CssError::Print(e.to_string()))?;

    Ok(result.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn safari(major: u32) -> Targets {
        Targets::from(Browsers { safari: Some(major << 16), ..Browsers::default() })
    }

    #[test]
    fn test_process_adds_vendor_prefixes() {
        let css = process(".a { user-select: none; }", "a.css", safari(13), false).unwrap();
        assert!(css.contains("-webkit-user-select: none"));
    }

    #[test]
    fn test_process_minify() {
        let css = process(".a {\n  color: red;\n}\n", "a.css", Targets::default(), true).unwrap();
        assert_eq!(css, ".a{color:red}");
    }

    #[test]
    fn test_process_pretty() {
        let css = process(".a{color:red}", "a.css", Targets::default(), false).unwrap();
        assert!(css.contains("color: red;"));
    }

    #[test]
    fn test_process_parse_error() {
        let err = process("\n..a { color: red; }", "a.css", Targets::default(), false).unwrap_err();
        assert!(matches!(err, CssError::Parse { .. }));
    }

    #[test]
    fn test_targets_from_config() {
        let config = TargetsConfig {
            chrome: Some("88".into()),
            firefox: None,
            edge: None,
            safari: Some("14.1".into()),
        };
        let targets = targets_from_config(&config);
        let browsers = targets.browsers.unwrap();
        assert_eq!(browsers.chrome, Some(88 << 16));
        assert_eq!(browsers.safari, Some((14 << 16) | (1 << 8)));
        assert_eq!(browsers.firefox, None);
    }
}
