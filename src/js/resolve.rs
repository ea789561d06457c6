//! Module specifier resolution.
//!
//! Relative specifiers are resolved against the importing file. Bare
//! specifiers are looked up in `node_modules` directories walking up from
//! the importing file, preferring a package's `browser` entry over `module`
//! over `main`.

use std::fs;
use std::path::{Path, PathBuf};

/// Package entry fields, in order of preference.
const ENTRY_FIELDS: [&str; 3] = ["browser", "module", "main"];

/// Resolve `specifier` as imported from the file at `importer`.
pub fn resolve(specifier: &str, importer: &Path) -> Option<PathBuf> {
    let from_dir = importer.parent().unwrap_or(Path::new("."));
    if is_relative(specifier) {
        resolve_file(&from_dir.join(specifier))
    } else {
        resolve_package(specifier, from_dir)
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/')
}

/// Try the path as given, then with `.js` or `.json`, then as a directory index.
fn resolve_file(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(normalize(path));
    }
    for ext in ["js", "json"] {
        let mut candidate = path.as_os_str().to_owned();
        candidate.push(".");
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        if candidate.is_file() {
            return Some(normalize(&candidate));
        }
    }
    let index = path.join("index.js");
    index.is_file().then(|| normalize(&index))
}

fn resolve_package(specifier: &str, from_dir: &Path) -> Option<PathBuf> {
    let (name, subpath) = split_package(specifier);
    let mut dir = Some(from_dir);
    while let Some(current) = dir {
        let package_dir = current.join("node_modules").join(name);
        if package_dir.is_dir() {
            let found = match subpath {
                Some(sub) => resolve_file(&package_dir.join(sub)),
                None => resolve_package_entry(&package_dir),
            };
            if found.is_some() {
                return found;
            }
        }
        dir = current.parent();
    }
    None
}

/// Split `@scope/pkg/sub/path` into (`@scope/pkg`, `sub/path`).
fn split_package(specifier: &str) -> (&str, Option<&str>) {
    let name_parts = if specifier.starts_with('@') { 2 } else { 1 };
    let mut split_at = None;
    for (count, (i, _)) in specifier.match_indices('/').enumerate() {
        if count + 1 == name_parts {
            split_at = Some(i);
            break;
        }
    }
    match split_at {
        Some(i) => (&specifier[..i], Some(&specifier[i + 1..])),
        None => (specifier, None),
    }
}

fn resolve_package_entry(package_dir: &Path) -> Option<PathBuf> {
    let manifest = fs::read_to_string(package_dir.join("package.json"))
        .ok()
        .and_then(|text| serde_json::from_str::<serde_json::Value>(&text).ok());

    if let Some(manifest) = manifest {
        for field in ENTRY_FIELDS {
            // An object-valued `browser` field is a replacement map, not an entry
            if let Some(entry) = manifest.get(field).and_then(|v| v.as_str()) {
                if let Some(found) = resolve_file(&package_dir.join(entry)) {
                    return Some(found);
                }
            }
        }
    }

    resolve_file(&package_dir.join("index.js"))
}

/// Drop `.` components and fold `..` so one file always gets one registry key.
fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
