//! Disk-backed transform cache.
//!
//! Store layout:
//! ```text
//! <cache root>/
//! └── v1/
//!     └── <cache key>/
//!         ├── meta.json
//!         └── entries/
//!             └── <entry digest>.js
//! ```
//!
//! Namespaces are named by content-derived cache keys, so differing build
//! configurations never collide and entries are immutable once written:
//! concurrent writers for the same key converge on the same bytes. The whole
//! store is safe to delete; the only cost is recomputation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::cache_key::{absorb, CACHE_SCHEMA_VERSION};
use crate::error::Result;

/// Store version for compatibility.
const STORE_VERSION: &str = "v1";

/// Disk-backed key-value store for transformed module text.
#[derive(Debug, Clone)]
pub struct PersistentCache {
    root: PathBuf,
}

impl PersistentCache {
    /// Open (creating if needed) a cache rooted at `root`, or at the user
    /// cache directory when `None`.
    pub fn new(root: Option<PathBuf>) -> Result<Self> {
        let root = root.unwrap_or_else(default_cache_root);
        std::fs::create_dir_all(root.join(STORE_VERSION))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The entry store for one computed cache key.
    pub fn namespace(&self, cache_key: &str) -> CacheNamespace {
        CacheNamespace {
            dir: self.root.join(STORE_VERSION).join(cache_key),
        }
    }

    /// Delete the entire backing store. Always safe: forces recomputation,
    /// never correctness loss.
    pub async fn clear(&self) -> Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root).await?;
        }
        fs::create_dir_all(self.root.join(STORE_VERSION)).await?;
        info!("cleared transform cache at {}", self.root.display());
        Ok(())
    }
}

/// Metadata stamped once per namespace. Diagnostic only, never consulted
/// for correctness.
#[derive(Debug, Serialize, Deserialize)]
struct NamespaceMeta {
    schema: u32,
    tool_version: String,
    created: DateTime<Utc>,
}

/// Entry store for a single cache key.
#[derive(Debug, Clone)]
pub struct CacheNamespace {
    dir: PathBuf,
}

impl CacheNamespace {
    /// Ensure the namespace directories and metadata stamp exist.
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(self.dir.join("entries")).await?;

        let meta_path = self.dir.join("meta.json");
        if !meta_path.exists() {
            let meta = NamespaceMeta {
                schema: CACHE_SCHEMA_VERSION,
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
                created: Utc::now(),
            };
            fs::write(&meta_path, serde_json::to_vec_pretty(&meta)?).await?;
        }
        Ok(())
    }

    /// Look up the cached output for one `(relative_path, output_name)`
    /// pair. Missing or unreadable entries are misses, never errors.
    pub async fn get(&self, relative_path: &str, output_name: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(relative_path, output_name);
        match fs::read(&path).await {
            Ok(bytes) => {
                debug!("cache hit for {} as {}", relative_path, output_name);
                Some(bytes)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!(
                    "unreadable cache entry {}: {} (treating as miss)",
                    path.display(),
                    err
                );
                None
            }
        }
    }

    /// Store the output for one pair. Entries are immutable once written:
    /// when a concurrent writer got there first the existing bytes win,
    /// since both derived them from the same inputs.
    pub async fn set(&self, relative_path: &str, output_name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.entry_path(relative_path, output_name);
        if path.exists() {
            return Ok(());
        }

        // Write-then-rename keeps readers from ever seeing a torn entry.
        let tmp = path.with_extension(format!("{}.tmp", std::process::id()));
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &path).await?;
        debug!("cached {} as {}", relative_path, output_name);
        Ok(())
    }

    fn entry_path(&self, relative_path: &str, output_name: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        absorb(&mut hasher, relative_path.as_bytes());
        absorb(&mut hasher, output_name.as_bytes());
        self.dir
            .join("entries")
            .join(format!("{}.js", hex::encode(hasher.finalize())))
    }
}

/// Default cache root.
fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("amdify")
}
