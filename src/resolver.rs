//! Node-style package resolution.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{AmdifyError, Result};
use crate::options::PACKAGE_NAMESPACE;

/// Resolves `node_modules/...` asset paths the way the runtime loader would.
///
/// Lookup walks upward through the enclosing `node_modules` directories of
/// the base directory, so workspace layouts with hoisted or sibling packages
/// resolve to the same file the host loader picks at runtime. An optional
/// snapshot directory is consulted first, ahead of the walk.
#[derive(Debug, Clone)]
pub struct PackageResolver {
    base_dir: PathBuf,
    snapshot_dir: Option<PathBuf>,
}

impl PackageResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            snapshot_dir: None,
        }
    }

    /// Consult `dir`'s `node_modules` before walking up from the base
    /// directory. Used to prefer the build pipeline's input snapshot over
    /// the on-disk project tree when both carry the package.
    pub fn with_snapshot(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if dir != self.base_dir {
            self.snapshot_dir = Some(dir);
        }
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve an asset path to an absolute file on disk.
    ///
    /// Within each candidate `node_modules` directory, resolution tries the
    /// exact file, the `.js`-suffixed file, a directory's `package.json`
    /// entry point (`browser` before `main`, browser-biased), and finally
    /// `index.js`. Fails with every tried location listed.
    pub fn resolve(&self, relative_path: &str) -> Result<PathBuf> {
        let rest = self.namespace_relative(relative_path)?;
        let mut tried = Vec::new();

        for dir in self.search_dirs() {
            let candidate = dir.join(rest);
            if let Some(file) = resolve_candidate(&candidate, &mut tried) {
                debug!("resolved {} -> {}", relative_path, file.display());
                return Ok(file);
            }
        }

        Err(AmdifyError::EntryNotFound {
            path: relative_path.to_string(),
            tried: display_paths(&tried),
        })
    }

    /// Locate the root directory of the package owning `relative_path`,
    /// for dependency fingerprinting. Scoped names (`@scope/name`) span two
    /// path segments.
    pub fn package_root(&self, relative_path: &str) -> Result<PathBuf> {
        let rest = self.namespace_relative(relative_path)?;
        let name = package_name(rest);
        let mut searched = Vec::new();

        for dir in self.search_dirs() {
            let root = dir.join(&name);
            if root.is_dir() {
                return Ok(root);
            }
            searched.push(root);
        }

        Err(AmdifyError::PackageNotFound {
            path: relative_path.to_string(),
            searched: display_paths(&searched),
        })
    }

    /// Strip the reserved prefix, rejecting paths outside the package
    /// namespace.
    fn namespace_relative<'a>(&self, relative_path: &'a str) -> Result<&'a str> {
        relative_path
            .strip_prefix(PACKAGE_NAMESPACE)
            .filter(|rest| !rest.is_empty())
            .ok_or_else(|| AmdifyError::OutsidePackageNamespace {
                asset: relative_path.to_string(),
            })
    }

    /// Candidate `node_modules` directories, nearest first.
    fn search_dirs(&self) -> Vec<PathBuf> {
        self.snapshot_dir
            .iter()
            .map(|d| d.as_path())
            .chain(self.base_dir.ancestors())
            .map(|dir| dir.join("node_modules"))
            .collect()
    }
}

/// First one or two path segments naming the owning package.
fn package_name(rest: &str) -> String {
    let mut segments = rest.split('/');
    match segments.next() {
        Some(scope) if scope.starts_with('@') => match segments.next() {
            Some(name) => format!("{}/{}", scope, name),
            None => scope.to_string(),
        },
        Some(name) => name.to_string(),
        None => rest.to_string(),
    }
}

fn resolve_candidate(candidate: &Path, tried: &mut Vec<PathBuf>) -> Option<PathBuf> {
    if candidate.is_file() {
        return Some(candidate.to_path_buf());
    }
    tried.push(candidate.to_path_buf());

    // Node appends ".js" rather than replacing an existing extension.
    let with_js = append_js(candidate);
    if with_js.is_file() {
        return Some(with_js);
    }
    tried.push(with_js);

    if candidate.is_dir() {
        if let Some(entry) = manifest_entry_point(candidate) {
            let target = candidate.join(&entry);
            if target.is_file() {
                return Some(target);
            }
            let target_js = append_js(&target);
            if target_js.is_file() {
                return Some(target_js);
            }
            tried.push(target);
        }

        let index = candidate.join("index.js");
        if index.is_file() {
            return Some(index);
        }
        tried.push(index);
    }

    None
}

/// `browser` (string form) before `main`, per the browser-biased resolution
/// mode the transform runs the bundler in.
fn manifest_entry_point(package_dir: &Path) -> Option<String> {
    let raw = std::fs::read(package_dir.join("package.json")).ok()?;
    let manifest: serde_json::Value = serde_json::from_slice(&raw).ok()?;
    manifest["browser"]
        .as_str()
        .or_else(|| manifest["main"].as_str())
        .map(str::to_string)
}

fn append_js(path: &Path) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(".js");
    PathBuf::from(raw)
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
