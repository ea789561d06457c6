//! Version bumping across the manifest and the files that repeat its version.
//!
//! The current version is the first double-quoted four-part version in the
//! manifest. Its last component is incremented and every quoted three- or
//! four-part version literal in the manifest and the tracked files is
//! replaced with the result, keeping each literal's quote style. Every file
//! is read and rewritten in memory before anything is written.

use crate::config::VersionConfig;
use regex::Regex;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The manifest has no `"a.b.c.d"` literal
    #[error("No \"a.b.c.d\" version found in {0}")]
    NotFound(PathBuf),
    #[error("Version {0} cannot be incremented")]
    Overflow(String),
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Four-part extension version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version(pub [u64; 4]);

impl Version {
    /// Parse `a.b.c.d`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = [0u64; 4];
        let mut split = text.split('.');
        for part in parts.iter_mut() {
            *part = split.next()?.parse().ok()?;
        }
        if split.next().is_some() {
            return None;
        }
        Some(Version(parts))
    }

    /// Increment the last component.
    pub fn bump(self) -> Option<Self> {
        let [a, b, c, d] = self.0;
        Some(Version([a, b, c, d.checked_add(1)?]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{}.{}.{}.{}", a, b, c, d)
    }
}

static_regex!(manifest_version_re, r#""(\d+\.\d+\.\d+\.\d+)""#);
static_regex!(single_quoted_re, r"'\d+\.\d+\.\d+(?:\.\d+)?'");
static_regex!(double_quoted_re, r#""\d+\.\d+\.\d+(?:\.\d+)?""#);

/// Text of the first double-quoted four-part version.
pub fn find_version(text: &str) -> Option<&str> {
    manifest_version_re().captures(text).and_then(|c| c.get(1)).map(|m| m.as_str())
}

fn replace_quoted(re: &Regex, text: &str, replacement: &str) -> (String, usize) {
    let count = re.find_iter(text).count();
    if count == 0 {
        return (text.to_string(), 0);
    }
    // NoExpand keeps `$` in a replacement literal
    (re.replace_all(text, regex::NoExpand(replacement)).into_owned(), count)
}

/// Replace every quoted version literal with `version`; returns the new text
/// and the number of literals replaced.
pub fn replace_versions(text: &str, version: &Version) -> (String, usize) {
    let (text, singles) = replace_quoted(single_quoted_re(), text, &format!("'{}'", version));
    let (text, doubles) = replace_quoted(double_quoted_re(), &text, &format!("\"{}\"", version));
    (text, singles + doubles)
}

/// Pending rewrite of one file.
#[derive(Debug, Clone)]
pub struct FileChange {
    pub path: PathBuf,
    pub replacements: usize,
    contents: String,
}

/// Everything a bump will do, computed before any write.
#[derive(Debug, Clone)]
pub struct BumpPlan {
    pub old: Version,
    pub new: Version,
    /// Files with at least one version literal
    pub changes: Vec<FileChange>,
    /// Tracked files that exist but contain no version literal
    pub unchanged: Vec<PathBuf>,
    /// Tracked files that do not exist
    pub missing: Vec<PathBuf>,
}

fn read(path: &Path) -> Result<String, VersionError> {
    std::fs::read_to_string(path).map_err(|source| VersionError::Read { path: path.to_path_buf(), source })
}

/// Work out the new version and the rewritten contents of every file.
pub fn plan_bump(root: &Path, config: &VersionConfig) -> Result<BumpPlan, VersionError> {
    let manifest = root.join(&config.manifest);
    let manifest_text = read(&manifest)?;
    let old_text = find_version(&manifest_text).ok_or_else(|| VersionError::NotFound(manifest.clone()))?;
    let old = Version::parse(old_text).ok_or_else(|| VersionError::Overflow(old_text.to_string()))?;
    let new = old.bump().ok_or_else(|| VersionError::Overflow(old.to_string()))?;

    let mut plan = BumpPlan { old, new, changes: vec![], unchanged: vec![], missing: vec![] };
    let mut seen = vec![manifest.clone()];
    let add = |plan: &mut BumpPlan, path: PathBuf, text: &str| {
        let (contents, replacements) = replace_versions(text, &new);
        if replacements == 0 {
            plan.unchanged.push(path);
        } else {
            plan.changes.push(FileChange { path, replacements, contents });
        }
    };
    add(&mut plan, manifest, &manifest_text);

    for file in &config.files {
        let path = root.join(file);
        if seen.contains(&path) {
            continue;
        }
        seen.push(path.clone());
        if !path.exists() {
            log::warn!("{} does not exist, skipping", path.display());
            plan.missing.push(path);
            continue;
        }
        let text = read(&path)?;
        add(&mut plan, path, &text);
    }
    Ok(plan)
}

/// Replace `path` with `contents` through a temp file in the same directory.
fn write_atomic(path: &Path, contents: &str) -> Result<(), VersionError> {
    let err = |source| VersionError::Write { path: path.to_path_buf(), source };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir).map_err(err)?;
    temp.write_all(contents.as_bytes()).map_err(err)?;
    temp.persist(path).map_err(|e| err(e.error))?;
    Ok(())
}

/// Write every planned change.
pub fn apply(plan: &BumpPlan) -> Result<Vec<PathBuf>, VersionError> {
    let mut written = Vec::new();
    for change in &plan.changes {
        write_atomic(&change.path, &change.contents)?;
        log::debug!("Updated {} ({} replacement(s))", change.path.display(), change.replacements);
        written.push(change.path.clone());
    }
    Ok(written)
}

/// Bump the version; with `dry_run` only the plan is returned.
pub fn bump_version(root: &Path, config: &VersionConfig, dry_run: bool) -> Result<BumpPlan, VersionError> {
    let plan = plan_bump(root, config)?;
    if !dry_run {
        apply(&plan)?;
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_version_parse_and_bump() {
        let v = Version::parse("1.0.0.9").unwrap();
        assert_eq!(v.bump().unwrap().to_string(), "1.0.0.10");
        assert_eq!(Version::parse("2.10.3.41").unwrap().bump().unwrap(), Version([2, 10, 3, 42]));
        assert!(Version::parse("1.0.0").is_none());
        assert!(Version::parse("1.0.0.0.1").is_none());
        assert!(Version([0, 0, 0, u64::MAX]).bump().is_none());
    }

    #[test]
    fn test_find_version_first_match() {
        let text = r#"{ "name": "x", "version": "1.2.3.4", "other": "5.6.7.8" }"#;
        assert_eq!(find_version(text), Some("1.2.3.4"));
        assert_eq!(find_version("'1.2.3.4'"), None);
    }

    #[test]
    fn test_replace_versions_keeps_quotes() {
        let v = Version([1, 0, 0, 10]);
        let (text, n) = replace_versions("a = '1.0.0'; b = \"1.0.0.9\"; c = 1.0.0.9;", &v);
        assert_eq!(text, "a = '1.0.0.10'; b = \"1.0.0.10\"; c = 1.0.0.9;");
        assert_eq!(n, 2);

        let (text, n) = replace_versions("no versions here", &v);
        assert_eq!(text, "no versions here");
        assert_eq!(n, 0);
    }

    fn config(files: &[&str]) -> VersionConfig {
        VersionConfig {
            manifest: PathBuf::from("manifest.json"),
            files: files.iter().map(PathBuf::from).collect(),
        }
    }

    #[test]
    fn test_bump_version_rewrites_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("manifest.json"), "{\n  \"version\": \"1.0.0.9\"\n}\n").unwrap();
        fs::write(temp.path().join("ui.js"), "const VERSION = '1.0.0';\n").unwrap();
        fs::write(temp.path().join("plain.txt"), "nothing\n").unwrap();

        let plan = bump_version(temp.path(), &config(&["ui.js", "plain.txt", "gone.xml"]), false)
            .unwrap();
        assert_eq!(plan.new.to_string(), "1.0.0.10");
        assert_eq!(plan.changes.len(), 2);
        assert_eq!(plan.unchanged, vec![temp.path().join("plain.txt")]);
        assert_eq!(plan.missing, vec![temp.path().join("gone.xml")]);

        assert_eq!(
            fs::read_to_string(temp.path().join("manifest.json")).unwrap(),
            "{\n  \"version\": \"1.0.0.10\"\n}\n"
        );
        assert_eq!(
            fs::read_to_string(temp.path().join("ui.js")).unwrap(),
            "const VERSION = '1.0.0.10';\n"
        );
        assert_eq!(fs::read_to_string(temp.path().join("plain.txt")).unwrap(), "nothing\n");
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("manifest.json"), "\"version\": \"3.1.4.1\"").unwrap();
        let plan = bump_version(temp.path(), &config(&[]), true).unwrap();
        assert_eq!(plan.new, Version([3, 1, 4, 2]));
        assert_eq!(
            fs::read_to_string(temp.path().join("manifest.json")).unwrap(),
            "\"version\": \"3.1.4.1\""
        );
    }

    #[test]
    fn test_missing_version_aborts() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("manifest.json"), "{ \"version\": \"1.0\" }").unwrap();
        fs::write(temp.path().join("ui.js"), "'1.0.0'").unwrap();

        let err = bump_version(temp.path(), &config(&["ui.js"]), false).unwrap_err();
        assert!(matches!(err, VersionError::NotFound(_)));
        assert_eq!(fs::read_to_string(temp.path().join("ui.js")).unwrap(), "'1.0.0'");
    }
}
