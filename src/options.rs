//! Transform options: which assets to wrap, and under what module names.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AmdifyError, Result};

/// Reserved directory prefix identifying third-party sources eligible for
/// the transform.
pub const PACKAGE_NAMESPACE: &str = "node_modules/";

/// An opaque bundler plugin configuration, forwarded to the bundler verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Plugin name.
    pub name: String,

    /// Plugin options, passed through untouched.
    #[serde(default)]
    pub options: serde_json::Value,
}

impl PluginConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: serde_json::Value::Null,
        }
    }
}

/// A single asset to transform.
///
/// Identity is the relative path; the entry is immutable for the lifetime of
/// the orchestrator that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformEntry {
    /// Path of the source asset relative to the input tree
    /// (`node_modules/...`).
    pub relative_path: String,

    /// Module identifier the wrapped output declares.
    pub output_name: String,

    /// Extra bundler plugins, appended after the built-ins in declaration
    /// order.
    #[serde(default)]
    pub extra_plugins: Vec<PluginConfig>,
}

/// A caller-facing import declaration, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportDeclaration {
    /// Module identifier to publish the asset under.
    #[serde(rename = "as")]
    pub output_name: Option<String>,

    /// Extra bundler plugins.
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,
}

impl ImportDeclaration {
    pub fn named(output_name: impl Into<String>) -> Self {
        Self {
            output_name: Some(output_name.into()),
            plugins: Vec::new(),
        }
    }
}

/// The full options map for one build configuration.
///
/// Keys are asset paths relative to the input tree. Backed by a `BTreeMap`
/// so iteration order is canonical regardless of declaration order, which
/// keeps the serialized form (and everything hashed from it) deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformOptions {
    entries: BTreeMap<String, TransformEntry>,
}

impl TransformOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, asset_path: &str) -> Option<&TransformEntry> {
        self.entries.get(asset_path)
    }

    /// Entries in canonical (sorted-path) order.
    pub fn entries(&self) -> impl Iterator<Item = &TransformEntry> {
        self.entries.values()
    }

    /// Merge one import declaration into the map.
    ///
    /// Every declaration must carry an output name. Re-declaring an asset
    /// with the same name is a no-op (the first declaration wins); declaring
    /// it under a different name is a conflict, since an asset may be
    /// transformed under only one fixed output name across the whole build.
    pub fn merge_import_declaration(
        &mut self,
        asset_path: &str,
        declaration: ImportDeclaration,
    ) -> Result<()> {
        let output_name =
            declaration
                .output_name
                .ok_or_else(|| AmdifyError::MissingOutputName {
                    asset: asset_path.to_string(),
                })?;

        if let Some(existing) = self.entries.get(asset_path) {
            if existing.output_name != output_name {
                return Err(AmdifyError::ConflictingOutputName {
                    asset: asset_path.to_string(),
                    existing: existing.output_name.clone(),
                    requested: output_name,
                });
            }
            debug!(
                "{} re-declared as `{}`; keeping first declaration",
                asset_path, output_name
            );
            return Ok(());
        }

        self.entries.insert(
            asset_path.to_string(),
            TransformEntry {
                relative_path: asset_path.to_string(),
                output_name,
                extra_plugins: declaration.plugins,
            },
        );
        Ok(())
    }

    /// Build an options map from `(asset_path, declaration)` pairs.
    pub fn from_declarations<I, S>(declarations: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, ImportDeclaration)>,
        S: AsRef<str>,
    {
        let mut options = Self::new();
        for (asset_path, declaration) in declarations {
            options.merge_import_declaration(asset_path.as_ref(), declaration)?;
        }
        Ok(options)
    }

    /// Deterministic serialization of the whole map, used as cache key
    /// input. Two maps with the same contents serialize identically no
    /// matter the order declarations arrived in.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.entries)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_output_name_is_rejected() {
        let mut options = TransformOptions::new();
        let err = options
            .merge_import_declaration("node_modules/foo/index.js", ImportDeclaration::default())
            .unwrap_err();
        assert!(err.is_usage_error());
        assert!(err.to_string().contains("node_modules/foo/index.js"));
    }

    #[test]
    fn conflicting_output_name_is_rejected() {
        let mut options = TransformOptions::new();
        options
            .merge_import_declaration("node_modules/foo/index.js", ImportDeclaration::named("foo"))
            .unwrap();
        let err = options
            .merge_import_declaration("node_modules/foo/index.js", ImportDeclaration::named("bar"))
            .unwrap_err();
        assert!(matches!(
            err,
            AmdifyError::ConflictingOutputName { ref existing, ref requested, .. }
                if existing == "foo" && requested == "bar"
        ));
    }

    #[test]
    fn redeclaring_same_name_is_a_noop() {
        let mut options = TransformOptions::new();
        options
            .merge_import_declaration("node_modules/foo/index.js", ImportDeclaration::named("foo"))
            .unwrap();
        options
            .merge_import_declaration("node_modules/foo/index.js", ImportDeclaration::named("foo"))
            .unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(
            options.get("node_modules/foo/index.js").unwrap().output_name,
            "foo"
        );
    }

    #[test]
    fn first_declaration_wins_on_redeclare() {
        let mut options = TransformOptions::new();
        options
            .merge_import_declaration("node_modules/foo/index.js", ImportDeclaration::named("foo"))
            .unwrap();

        let mut with_plugins = ImportDeclaration::named("foo");
        with_plugins.plugins.push(PluginConfig::new("minify"));
        options
            .merge_import_declaration("node_modules/foo/index.js", with_plugins)
            .unwrap();

        assert!(options
            .get("node_modules/foo/index.js")
            .unwrap()
            .extra_plugins
            .is_empty());
    }

    #[test]
    fn canonical_bytes_ignore_declaration_order() {
        let a = TransformOptions::from_declarations([
            ("node_modules/a/index.js", ImportDeclaration::named("a")),
            ("node_modules/b/index.js", ImportDeclaration::named("b")),
        ])
        .unwrap();
        let b = TransformOptions::from_declarations([
            ("node_modules/b/index.js", ImportDeclaration::named("b")),
            ("node_modules/a/index.js", ImportDeclaration::named("a")),
        ])
        .unwrap();
        assert_eq!(a.canonical_bytes().unwrap(), b.canonical_bytes().unwrap());
    }

    #[test]
    fn canonical_bytes_reflect_plugin_changes() {
        let plain = TransformOptions::from_declarations([(
            "node_modules/a/index.js",
            ImportDeclaration::named("a"),
        )])
        .unwrap();

        let mut declaration = ImportDeclaration::named("a");
        declaration.plugins.push(PluginConfig::new("minify"));
        let with_plugin =
            TransformOptions::from_declarations([("node_modules/a/index.js", declaration)])
                .unwrap();

        assert_ne!(
            plain.canonical_bytes().unwrap(),
            with_plugin.canonical_bytes().unwrap()
        );
    }

    #[test]
    fn import_declaration_parses_as_field() {
        let declaration: ImportDeclaration =
            serde_json::from_str(r#"{ "as": "bar" }"#).unwrap();
        assert_eq!(declaration.output_name.as_deref(), Some("bar"));
        assert!(declaration.plugins.is_empty());
    }
}
