//! Configuration schema types for `crxpack.toml`
//!
//! Defines the path registry for each asset category together with the
//! tool, version and watch settings, and the validation rules applied after
//! parsing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Asset category, each with its own source globs and transform task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Scripts,
    Styles,
    Images,
    Copy,
}

impl Category {
    /// All categories in the order they are listed in the `build` step.
    pub const ALL: [Category; 4] =
        [Category::Scripts, Category::Styles, Category::Images, Category::Copy];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Scripts => write!(f, "scripts"),
            Category::Styles => write!(f, "styles"),
            Category::Images => write!(f, "images"),
            Category::Copy => write!(f, "copy"),
        }
    }
}

/// Source globs and destination directory of one category.
///
/// Globs are relative to the project root, `dest` is relative to the
/// release directory (`project.out`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSpec {
    pub category: Category,
    pub sources: Vec<String>,
    pub dest: PathBuf,
}

/// External command used as a pipeline stage.
///
/// The stage input is written to the command's stdin and its stdout becomes
/// the stage output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommand {
    /// Program to execute (looked up on `PATH`)
    pub program: String,
    /// Arguments passed to the program
    #[serde(default)]
    pub args: Vec<String>,
}

/// Project-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Release directory, deleted and repopulated on each build
    #[serde(default = "default_out")]
    pub out: PathBuf,
    /// Extra directories searched by stylesheet `@import`
    #[serde(default = "default_include_paths")]
    pub include_paths: Vec<PathBuf>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { out: default_out(), include_paths: default_include_paths() }
    }
}

fn default_out() -> PathBuf {
    PathBuf::from("release")
}

fn default_include_paths() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}

/// Script bundling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptsConfig {
    /// Globs linted and watched
    #[serde(default = "default_scripts_src")]
    pub src: Vec<String>,
    /// Globs of the entry points, one bundle per match
    #[serde(default = "default_scripts_entry")]
    pub entry: Vec<String>,
    /// Output directory inside the release directory
    #[serde(default = "default_scripts_dest")]
    pub dest: PathBuf,
    /// Optional down-levelling command run on each bundle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transpiler: Option<ToolCommand>,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            src: default_scripts_src(),
            entry: default_scripts_entry(),
            dest: default_scripts_dest(),
            transpiler: None,
        }
    }
}

fn default_scripts_src() -> Vec<String> {
    vec!["src/js/**/*.js".to_string()]
}

fn default_scripts_entry() -> Vec<String> {
    vec!["src/js/*.js".to_string()]
}

fn default_scripts_dest() -> PathBuf {
    PathBuf::from("js")
}

/// Stylesheet settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylesConfig {
    #[serde(default = "default_styles_src")]
    pub src: Vec<String>,
    #[serde(default = "default_styles_dest")]
    pub dest: PathBuf,
    /// Name of the concatenated stylesheet
    #[serde(default = "default_bundle_name")]
    pub bundle_name: String,
    /// Decimal places kept in numeric values
    #[serde(default = "default_precision")]
    pub precision: u8,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            src: default_styles_src(),
            dest: default_styles_dest(),
            bundle_name: default_bundle_name(),
            precision: default_precision(),
        }
    }
}

fn default_styles_src() -> Vec<String> {
    vec!["src/css/**/*.scss".to_string()]
}

fn default_styles_dest() -> PathBuf {
    PathBuf::from("css")
}

fn default_bundle_name() -> String {
    "style.css".to_string()
}

fn default_precision() -> u8 {
    3
}

/// Image optimization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    #[serde(default = "default_images_src")]
    pub src: Vec<String>,
    #[serde(default = "default_images_dest")]
    pub dest: PathBuf,
    /// JPEG re-encoding quality (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            src: default_images_src(),
            dest: default_images_dest(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

fn default_images_src() -> Vec<String> {
    vec!["src/img/**/*".to_string()]
}

fn default_images_dest() -> PathBuf {
    PathBuf::from("img")
}

fn default_jpeg_quality() -> u8 {
    75
}

/// Files copied verbatim into the release directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyConfig {
    #[serde(default = "default_copy_src")]
    pub src: Vec<String>,
    #[serde(default = "default_copy_dest")]
    pub dest: PathBuf,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self { src: default_copy_src(), dest: default_copy_dest() }
    }
}

fn default_copy_src() -> Vec<String> {
    vec!["_locales/**/*".to_string(), "background.js".to_string(), "manifest.json".to_string()]
}

fn default_copy_dest() -> PathBuf {
    PathBuf::from(".")
}

/// Files kept in sync by `bump-version`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionConfig {
    /// File the current version is read from
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,
    /// Additional files rewritten with the new version
    #[serde(default = "default_version_files")]
    pub files: Vec<PathBuf>,
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self { manifest: default_manifest(), files: default_version_files() }
    }
}

fn default_manifest() -> PathBuf {
    PathBuf::from("manifest.json")
}

fn default_version_files() -> Vec<PathBuf> {
    vec![PathBuf::from("src/js/lib/ui.js"), PathBuf::from("updates.xml")]
}

/// Minimum browser versions used for vendor prefixing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetsConfig {
    #[serde(default = "default_chrome")]
    pub chrome: Option<String>,
    #[serde(default = "default_firefox")]
    pub firefox: Option<String>,
    #[serde(default)]
    pub edge: Option<String>,
    #[serde(default)]
    pub safari: Option<String>,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self { chrome: default_chrome(), firefox: default_firefox(), edge: None, safari: None }
    }
}

fn default_chrome() -> Option<String> {
    Some("88".to_string())
}

fn default_firefox() -> Option<String> {
    Some("109".to_string())
}

/// Watch mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Clear terminal between rebuilds
    #[serde(default)]
    pub clear_screen: bool,
}

fn default_debounce_ms() -> u32 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), clear_screen: false }
    }
}

/// Complete crxpack.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrxConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub scripts: ScriptsConfig,
    #[serde(default)]
    pub styles: StylesConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub copy: CopyConfig,
    #[serde(default)]
    pub version: VersionConfig,
    #[serde(default)]
    pub targets: TargetsConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "styles.bundle_name")
    pub field: String,
    /// Error message
    pub message: String,
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "crxpack.toml: '{}' {}", self.field, self.message)
    }
}

impl CrxConfig {
    /// Path registry entry for a category.
    pub fn path_spec(&self, category: Category) -> PathSpec {
        let (sources, dest) = match category {
            Category::Scripts => (self.scripts.src.clone(), self.scripts.dest.clone()),
            Category::Styles => (self.styles.src.clone(), self.styles.dest.clone()),
            Category::Images => (self.images.src.clone(), self.images.dest.clone()),
            Category::Copy => (self.copy.src.clone(), self.copy.dest.clone()),
        };
        PathSpec { category, sources, dest }
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: &str| {
            errors.push(ConfigValidationError {
                field: field.to_string(),
                message: message.to_string(),
            });
        };

        if self.project.out.as_os_str().is_empty() {
            push("project.out", "must be a non-empty path");
        }

        let globs = [
            ("scripts.src", &self.scripts.src),
            ("scripts.entry", &self.scripts.entry),
            ("styles.src", &self.styles.src),
            ("images.src", &self.images.src),
            ("copy.src", &self.copy.src),
        ];
        for (field, patterns) in globs {
            if patterns.is_empty() {
                push(field, "must contain at least one glob pattern");
            }
            for pattern in patterns {
                if let Err(e) = glob::Pattern::new(pattern) {
                    push(field, &format!("has invalid glob '{}': {}", pattern, e));
                }
            }
        }

        if self.styles.bundle_name.is_empty()
            || self.styles.bundle_name.contains('/')
            || self.styles.bundle_name.contains('\\')
        {
            push("styles.bundle_name", "must be a plain file name");
        }

        if self.styles.precision > 10 {
            push("styles.precision", "must be between 0 and 10");
        }

        if !(1..=100).contains(&self.images.jpeg_quality) {
            push("images.jpeg_quality", "must be between 1 and 100");
        }

        if let Some(tool) = &self.scripts.transpiler {
            if tool.program.trim().is_empty() {
                push("scripts.transpiler.program", "must be a non-empty command");
            }
        }

        if self.version.manifest.as_os_str().is_empty() {
            push("version.manifest", "must be a non-empty path");
        }

        let browsers = [
            ("targets.chrome", &self.targets.chrome),
            ("targets.firefox", &self.targets.firefox),
            ("targets.edge", &self.targets.edge),
            ("targets.safari", &self.targets.safari),
        ];
        for (field, version) in browsers {
            if let Some(v) = version {
                if parse_browser_version(v).is_none() {
                    push(field, "must look like MAJOR[.MINOR[.PATCH]]");
                }
            }
        }

        if self.watch.debounce_ms == 0 {
            push("watch.debounce_ms", "must be a positive integer");
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// Encode a `MAJOR[.MINOR[.PATCH]]` version the way lightningcss expects
/// (`major << 16 | minor << 8 | patch`).
pub fn parse_browser_version(version: &str) -> Option<u32> {
    let mut parts = version.trim().split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next().map(str::parse).transpose().ok()?.unwrap_or(0);
    let patch: u32 = parts.next().map(str::parse).transpose().ok()?.unwrap_or(0);
    if parts.next().is_some() || major > 0xFFFF || minor > 0xFF || patch > 0xFF {
        return None;
    }
    Some((major << 16) | (minor << 8) | patch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: CrxConfig = toml::from_str("").unwrap();
        assert_eq!(config.project.out, PathBuf::from("release"));
        assert_eq!(config.scripts.entry, vec!["src/js/*.js".to_string()]);
        assert_eq!(config.styles.bundle_name, "style.css");
        assert_eq!(config.styles.precision, 3);
        assert_eq!(config.images.jpeg_quality, 75);
        assert_eq!(config.copy.src.len(), 3);
        assert_eq!(config.version.manifest, PathBuf::from("manifest.json"));
        assert!(config.is_valid());
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[project]
out = "dist"
include_paths = [".", "vendor/scss"]

[scripts]
src = ["js/**/*.js"]
entry = ["js/*.js"]
dest = "scripts"
transpiler = { program = "npx", args = ["buble"] }

[styles]
src = ["scss/**/*.scss"]
bundle_name = "main.css"
precision = 5

[images]
jpeg_quality = 60

[copy]
src = ["manifest.json"]

[version]
manifest = "ext/manifest.json"
files = ["ext/about.html"]

[targets]
chrome = "100"
firefox = "115.2"
safari = "16.4.1"

[watch]
debounce_ms = 250
clear_screen = true
"#;
        let config: CrxConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.project.out, PathBuf::from("dist"));
        assert_eq!(config.project.include_paths.len(), 2);
        assert_eq!(config.scripts.dest, PathBuf::from("scripts"));
        let tool = config.scripts.transpiler.as_ref().unwrap();
        assert_eq!(tool.program, "npx");
        assert_eq!(tool.args, vec!["buble".to_string()]);
        assert_eq!(config.styles.bundle_name, "main.css");
        assert_eq!(config.styles.precision, 5);
        assert_eq!(config.styles.dest, PathBuf::from("css"));
        assert_eq!(config.images.jpeg_quality, 60);
        assert_eq!(config.copy.src, vec!["manifest.json".to_string()]);
        assert_eq!(config.version.files, vec![PathBuf::from("ext/about.html")]);
        assert_eq!(config.targets.safari.as_deref(), Some("16.4.1"));
        assert_eq!(config.watch.debounce_ms, 250);
        assert!(config.watch.clear_screen);
        assert!(config.is_valid());
    }

    #[test]
    fn test_path_spec_per_category() {
        let config = CrxConfig::default();
        let styles = config.path_spec(Category::Styles);
        assert_eq!(styles.category, Category::Styles);
        assert_eq!(styles.sources, vec!["src/css/**/*.scss".to_string()]);
        assert_eq!(styles.dest, PathBuf::from("css"));

        let copy = config.path_spec(Category::Copy);
        assert_eq!(copy.dest, PathBuf::from("."));
    }

    #[test]
    fn test_validation_bad_bundle_name() {
        let mut config = CrxConfig::default();
        config.styles.bundle_name = "css/out.css".to_string();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "styles.bundle_name"));
    }

    #[test]
    fn test_validation_jpeg_quality() {
        let mut config = CrxConfig::default();
        config.images.jpeg_quality = 0;
        assert!(config.validate().iter().any(|e| e.field == "images.jpeg_quality"));
    }

    #[test]
    fn test_validation_invalid_glob() {
        let mut config = CrxConfig::default();
        config.styles.src = vec!["src/css/[".to_string()];
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "styles.src"));
    }

    #[test]
    fn test_validation_empty_entry() {
        let mut config = CrxConfig::default();
        config.scripts.entry.clear();
        assert!(config.validate().iter().any(|e| e.field == "scripts.entry"));
    }

    #[test]
    fn test_validation_bad_target() {
        let mut config = CrxConfig::default();
        config.targets.edge = Some("latest".to_string());
        assert!(config.validate().iter().any(|e| e.field == "targets.edge"));
    }

    #[test]
    fn test_parse_browser_version() {
        assert_eq!(parse_browser_version("88"), Some(88 << 16));
        assert_eq!(parse_browser_version("15.4"), Some((15 << 16) | (4 << 8)));
        assert_eq!(parse_browser_version("16.4.1"), Some((16 << 16) | (4 << 8) | 1));
        assert_eq!(parse_browser_version("1.2.3.4"), None);
        assert_eq!(parse_browser_version("x"), None);
    }

    #[test]
    fn test_category_display() {
        let names: Vec<String> = Category::ALL.iter().map(|c| c.to_string()).collect();
        assert_eq!(names, vec!["scripts", "styles", "images", "copy"]);
    }
}
