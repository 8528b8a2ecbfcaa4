//! Dependency fingerprinting for cache invalidation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::debug;
use walkdir::WalkDir;

use crate::cache_key::absorb;
use crate::error::Result;

/// Computes a digest of a package directory's code and declared version.
///
/// The digest covers the package's declared name and version plus the path
/// and content bytes of every regular file under the root, in sorted path
/// order, so a timestamp-only touch does not change it. Results are memoized
/// for the lifetime of the instance and shared across concurrent entry
/// tasks; a freshly constructed instance recomputes from disk.
#[derive(Debug, Clone, Default)]
pub struct DependencyFingerprinter {
    memo: Arc<DashMap<PathBuf, String>>,
}

impl DependencyFingerprinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint `package_root`, in SRI form (`sha256-<base64>`).
    pub fn fingerprint(&self, package_root: &Path) -> Result<String> {
        if let Some(hit) = self.memo.get(package_root) {
            return Ok(hit.clone());
        }

        let digest = fingerprint_package(package_root)?;
        debug!("fingerprinted {} as {}", package_root.display(), digest);
        self.memo.insert(package_root.to_path_buf(), digest.clone());
        Ok(digest)
    }
}

fn fingerprint_package(package_root: &Path) -> Result<String> {
    let mut hasher = Sha256::new();

    // Declared identity first: a version bump changes the digest even when
    // the files were republished byte-identical.
    if let Ok(raw) = std::fs::read(package_root.join("package.json")) {
        if let Ok(manifest) = serde_json::from_slice::<serde_json::Value>(&raw) {
            absorb(&mut hasher, manifest["name"].as_str().unwrap_or("").as_bytes());
            absorb(
                &mut hasher,
                manifest["version"].as_str().unwrap_or("").as_bytes(),
            );
        }
    }

    let mut files: Vec<PathBuf> = WalkDir::new(package_root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    files.sort();

    for file in files {
        let rel = file.strip_prefix(package_root).unwrap_or(&file);
        absorb(&mut hasher, rel.to_string_lossy().as_bytes());
        absorb(&mut hasher, &std::fs::read(&file)?);
    }

    Ok(format!("sha256-{}", BASE64.encode(hasher.finalize())))
}
