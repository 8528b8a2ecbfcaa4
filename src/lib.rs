//! amdify - a build-time transform that wraps CommonJS npm packages as
//! AMD modules carrying explicit identifiers, backed by a persistent,
//! dependency-fingerprinted cache.
//!
//! The orchestrator is built to sit inside an incremental build pipeline:
//! the host decides *when* to build, amdify makes repeated builds cheap by
//! keying all transform work on the options map, its own implementation
//! version, and a content fingerprint of every package it touches.
//!
//! ```no_run
//! use amdify::{CjsTransform, ImportDeclaration, TransformOptions};
//!
//! # async fn demo() -> amdify::Result<()> {
//! let options = TransformOptions::from_declarations([(
//!     "node_modules/foo/index.js",
//!     ImportDeclaration::named("foo"),
//! )])?;
//!
//! let mut transform = CjsTransform::new("/srv/app", "/srv/app", options)?;
//! let report = transform.build(std::path::Path::new("/srv/app/dist")).await?;
//! println!("{} bundled, {} from cache", report.entries_bundled, report.entries_from_cache);
//! # Ok(())
//! # }
//! ```

pub mod bundler;
pub mod cache;
pub mod cache_key;
pub mod cli;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod options;
pub mod resolver;
pub mod transform;
pub mod wrap;

pub use error::{AmdifyError, Result};
pub use options::{ImportDeclaration, PluginConfig, TransformEntry, TransformOptions};
pub use transform::{BuildReport, CjsTransform};
