//! Project configuration (`amdify.toml`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{AmdifyError, Result};
use crate::options::{ImportDeclaration, TransformOptions};

/// Default config file name.
pub const CONFIG_FILE: &str = "amdify.toml";

/// On-disk project configuration.
///
/// ```toml
/// output = "dist"
///
/// [modules."node_modules/foo/index.js"]
/// as = "foo"
///
/// [modules."node_modules/moment/moment.js"]
/// as = "moment"
/// plugins = [{ name = "strip-comments" }]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Output directory for wrapped modules, relative to the project root.
    pub output: PathBuf,

    /// Project root override; defaults to the config file's directory.
    pub project_root: Option<PathBuf>,

    /// Cache directory override.
    pub cache_dir: Option<PathBuf>,

    /// Declared modules: asset path -> import declaration.
    pub modules: BTreeMap<String, ImportDeclaration>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("dist"),
            project_root: None,
            cache_dir: None,
            modules: BTreeMap::new(),
        }
    }
}

impl ProjectConfig {
    /// Load the configuration from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            AmdifyError::Config(format!("cannot read {}: {}", path.display(), err))
        })?;
        let config: ProjectConfig = toml::from_str(&raw)?;
        if config.modules.is_empty() {
            return Err(AmdifyError::Config(format!(
                "{} declares no modules to transform",
                path.display()
            )));
        }
        Ok(config)
    }

    /// Funnel every declaration through the options merger, so config files
    /// get the same validation as host-pipeline callers.
    pub fn to_options(&self) -> Result<TransformOptions> {
        let mut options = TransformOptions::new();
        for (asset_path, declaration) in &self.modules {
            options.merge_import_declaration(asset_path, declaration.clone())?;
        }
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn parses_a_minimal_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"
output = "wrapped"

[modules."node_modules/foo/index.js"]
as = "foo"
"#,
        )
        .unwrap();

        let config = ProjectConfig::load(&path).unwrap();
        assert_eq!(config.output, PathBuf::from("wrapped"));

        let options = config.to_options().unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(
            options.get("node_modules/foo/index.js").unwrap().output_name,
            "foo"
        );
    }

    #[test]
    fn parses_plugin_declarations() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"
[modules."node_modules/foo/index.js"]
as = "foo"
plugins = [{ name = "strip-comments" }]
"#,
        )
        .unwrap();

        let options = ProjectConfig::load(&path).unwrap().to_options().unwrap();
        let entry = options.get("node_modules/foo/index.js").unwrap();
        assert_eq!(entry.extra_plugins.len(), 1);
        assert_eq!(entry.extra_plugins[0].name, "strip-comments");
    }

    #[test]
    fn missing_output_name_is_a_usage_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"
[modules."node_modules/foo/index.js"]
plugins = []
"#,
        )
        .unwrap();

        let err = ProjectConfig::load(&path).unwrap().to_options().unwrap_err();
        assert!(err.is_usage_error());
    }

    #[test]
    fn empty_module_list_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"output = "dist""#).unwrap();

        let err = ProjectConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("no modules"));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = ProjectConfig::load(Path::new("/nonexistent/amdify.toml")).unwrap_err();
        assert!(matches!(err, AmdifyError::Config(_)));
    }
}
