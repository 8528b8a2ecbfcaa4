//! Stable cache key computation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::options::TransformOptions;

/// Bumped whenever the wrap format or the key derivation changes, so stale
/// namespaces stop matching.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

/// Fingerprint of the transform implementation itself, folded into every
/// cache key so a logic change busts all caches.
pub fn implementation_fingerprint() -> String {
    format!(
        "amdify@{}+schema.{}",
        env!("CARGO_PKG_VERSION"),
        CACHE_SCHEMA_VERSION
    )
}

/// Combine the options map, the implementation fingerprint, and one
/// dependency fingerprint per resolved package root into one stable key.
///
/// The whole options map is folded into the key, so any entry's
/// configuration change re-namespaces every entry jointly. Parts are
/// length-prefixed before hashing so adjacent inputs cannot alias; sorted
/// maps make the result independent of declaration or iteration order.
pub fn compute_cache_key(
    options: &TransformOptions,
    package_fingerprints: &BTreeMap<PathBuf, String>,
) -> Result<String> {
    let mut hasher = Sha256::new();
    absorb(&mut hasher, &options.canonical_bytes()?);
    absorb(&mut hasher, implementation_fingerprint().as_bytes());
    for (root, digest) in package_fingerprints {
        absorb(&mut hasher, root.to_string_lossy().as_bytes());
        absorb(&mut hasher, digest.as_bytes());
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Feed `part` into the hasher behind a length prefix, so consecutive parts
/// cannot alias each other under concatenation.
pub(crate) fn absorb(hasher: &mut Sha256, part: &[u8]) {
    hasher.update((part.len() as u64).to_le_bytes());
    hasher.update(part);
}
