//! Error types for amdify.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for amdify operations.
pub type Result<T> = std::result::Result<T, AmdifyError>;

/// Main error type for amdify.
#[derive(Error, Debug)]
pub enum AmdifyError {
    /// Declared asset is missing its output module name
    #[error("asset `{asset}` must declare an output module name via `as`")]
    MissingOutputName { asset: String },

    /// Same asset declared under two different output names
    #[error(
        "asset `{asset}` is already being transformed as `{existing}`; \
         it cannot also be transformed as `{requested}` (an asset may carry \
         only one output name across the whole build)"
    )]
    ConflictingOutputName {
        asset: String,
        existing: String,
        requested: String,
    },

    /// Asset path does not live under the package namespace
    #[error(
        "cannot transform `{asset}`: only files under node_modules/ can be \
         wrapped; declare the path exactly as it would be required at runtime \
         (e.g. node_modules/foo/index.js)"
    )]
    OutsidePackageNamespace { asset: String },

    /// No enclosing node_modules directory contains the package
    #[error("could not locate the package owning `{path}`; looked in: {searched}")]
    PackageNotFound { path: String, searched: String },

    /// Asset path did not resolve to a file under node-style lookup
    #[error("could not resolve `{path}`; tried: {tried}")]
    EntryNotFound { path: String, tried: String },

    /// The bundler collaborator failed; original diagnostic preserved
    #[error("failed to bundle {}: {message}", .entry.display())]
    Bundle { entry: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config file parse error
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl AmdifyError {
    /// Whether this is a malformed entry declaration, reported synchronously
    /// before any build work starts.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            AmdifyError::MissingOutputName { .. }
                | AmdifyError::ConflictingOutputName { .. }
                | AmdifyError::OutsidePackageNamespace { .. }
        )
    }
}
