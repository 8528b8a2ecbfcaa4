//! Bundling boundary.
//!
//! The orchestrator talks to the bundler through a capability interface:
//! given an entry file, resolution rules, and an output descriptor, produce
//! the final module text or fail. Any bundling library satisfying the
//! contract is interchangeable; the crate ships a single-file wrapper.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::error::{AmdifyError, Result};
use crate::options::PluginConfig;
use crate::wrap::wrap_module;

/// How module specifiers are resolved while bundling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionMode {
    /// Prefer `browser` manifest fields over `main`.
    #[default]
    Browser,
    /// Node semantics: `main` only.
    Node,
}

/// Names the target module identifier and export form for one bundle.
#[derive(Debug, Clone)]
pub struct OutputDescriptor {
    /// Identifier the produced module declares.
    pub module_id: String,

    /// Wrap with named-exports interop, so `default` and named exports are
    /// both reachable from the loader.
    pub named_exports: bool,
}

/// Everything a bundler implementation needs for one entry.
#[derive(Debug, Clone)]
pub struct BundleRequest {
    /// Absolute path of the entry file.
    pub entry_file: PathBuf,

    /// Directory module resolution is rooted at for specifiers inside the
    /// entry.
    pub base_dir: PathBuf,

    pub resolution: ResolutionMode,
    pub output: OutputDescriptor,

    /// Built-in plugins first, caller-supplied extras appended after, all
    /// opaque to the orchestrator.
    pub plugins: Vec<PluginConfig>,
}

impl BundleRequest {
    /// The built-in plugin chain: commonjs interop in named-exports mode,
    /// followed by caller extras in declaration order.
    pub fn plugin_chain(extra: &[PluginConfig]) -> Vec<PluginConfig> {
        let mut chain = vec![PluginConfig {
            name: "commonjs".to_string(),
            options: json!({ "exports": "named" }),
        }];
        chain.extend(extra.iter().cloned());
        chain
    }
}

/// Capability interface to the bundler collaborator.
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Produce the final module text for one entry, or fail with the
    /// underlying diagnostic.
    async fn bundle(&self, request: &BundleRequest) -> Result<String>;
}

/// Shipped single-file bundler: reads the entry and wraps it as-is, leaving
/// `require(...)` calls inside the source to the runtime's require hook.
#[derive(Debug, Clone, Copy, Default)]
pub struct WrapBundler;

#[async_trait]
impl Bundler for WrapBundler {
    async fn bundle(&self, request: &BundleRequest) -> Result<String> {
        let source = tokio::fs::read_to_string(&request.entry_file)
            .await
            .map_err(|err| AmdifyError::Bundle {
                entry: request.entry_file.clone(),
                message: err.to_string(),
            })?;

        let extras = request.plugins.len().saturating_sub(1);
        if extras > 0 {
            debug!(
                "{} extra plugin(s) declared for {}; the built-in wrapper forwards them unused",
                extras,
                request.entry_file.display()
            );
        }

        Ok(wrap_module(&request.output.module_id, &source))
    }
}
