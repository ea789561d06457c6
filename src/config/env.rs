//! Build mode and the environment flags derived from it.
//!
//! The mode is read once at startup (from `NODE_ENV` or the `--mode` flag)
//! and then travels with the [`BuildContext`](crate::build::BuildContext).
//! Task bodies never look at the process environment.

use std::fmt;

/// Environment variable that selects the build mode.
pub const MODE_VAR: &str = "NODE_ENV";

/// Build mode selected for the whole process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BuildMode {
    /// Source maps on, minification off
    Development,
    /// Minification on, source maps off
    Production,
    /// Neither source maps nor minification
    #[default]
    None,
}

impl BuildMode {
    /// Interpret a mode string. Anything other than the two known values
    /// selects [`BuildMode::None`].
    pub fn parse(value: &str) -> Self {
        match value {
            "development" => BuildMode::Development,
            "production" => BuildMode::Production,
            _ => BuildMode::None,
        }
    }

    /// Read the mode from `NODE_ENV`.
    pub fn from_env() -> Self {
        std::env::var(MODE_VAR).map(|v| Self::parse(&v)).unwrap_or_default()
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Development => write!(f, "development"),
            BuildMode::Production => write!(f, "production"),
            BuildMode::None => write!(f, "none"),
        }
    }
}

/// Flags gating source maps and minification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnvironmentFlags {
    pub development: bool,
    pub production: bool,
}

impl EnvironmentFlags {
    /// Whether script bundles carry inline source maps.
    pub fn source_maps(&self) -> bool {
        self.development
    }

    /// Whether scripts and the stylesheet bundle are minified.
    pub fn minify(&self) -> bool {
        self.production
    }
}

impl From<BuildMode> for EnvironmentFlags {
    fn from(mode: BuildMode) -> Self {
        Self {
            development: mode == BuildMode::Development,
            production: mode == BuildMode::Production,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_known_modes() {
        assert_eq!(BuildMode::parse("development"), BuildMode::Development);
        assert_eq!(BuildMode::parse("production"), BuildMode::Production);
    }

    #[test]
    fn test_parse_unknown_mode_is_none() {
        assert_eq!(BuildMode::parse("staging"), BuildMode::None);
        assert_eq!(BuildMode::parse(""), BuildMode::None);
        assert_eq!(BuildMode::parse("Production"), BuildMode::None);
    }

    #[test]
    fn test_flags_from_mode() {
        let dev = EnvironmentFlags::from(BuildMode::Development);
        assert!(dev.source_maps());
        assert!(!dev.minify());

        let prod = EnvironmentFlags::from(BuildMode::Production);
        assert!(!prod.source_maps());
        assert!(prod.minify());

        let none = EnvironmentFlags::from(BuildMode::None);
        assert!(!none.source_maps());
        assert!(!none.minify());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var(MODE_VAR, "production");
        assert_eq!(BuildMode::from_env(), BuildMode::Production);

        std::env::remove_var(MODE_VAR);
        assert_eq!(BuildMode::from_env(), BuildMode::None);
    }
}
