//! `[module]` section configuration.
//!
//! Describes where the compiled module lives and which of its subtrees are
//! generated or ignored.
//!
//! # Example
//!
//! ```toml
//! [module]
//! root = "engine"          # Module source tree (relative to hotbridge.toml)
//! package = "engine"       # Cargo package to build (optional)
//! out_dir = "pkg"          # Generated bindings (relative to root)
//! ignore = ["target"]      # Subtrees of root that never trigger a build
//! name = "engine"          # Artifact stem (default: package, `-` → `_`)
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// Module source tree settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Module source tree.
    pub root: PathBuf,

    /// Cargo package passed as `-p`.
    pub package: Option<String>,

    /// Generated-output subtree, relative to `root`.
    pub out_dir: PathBuf,

    /// Subtrees of `root` whose changes are irrelevant (build caches,
    /// alternate targets).
    pub ignore: Vec<PathBuf>,

    /// Artifact stem used for `<name>.wasm` and `<name>_bg.wasm`.
    pub name: Option<String>,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            package: None,
            out_dir: PathBuf::from("pkg"),
            ignore: vec![PathBuf::from("target")],
            name: None,
        }
    }
}

impl ModuleConfig {
    /// Resolve `root` against the project root and the other paths against
    /// `root`.
    pub fn normalize(&mut self, project_root: &Path) {
        use crate::utils::path::normalize_path;

        self.root = normalize_path(&project_root.join(&self.root));
        self.out_dir = normalize_path(&self.root.join(&self.out_dir));
        self.ignore = self
            .ignore
            .iter()
            .map(|p| normalize_path(&self.root.join(p)))
            .collect();
    }

    /// Artifact stem: explicit `name`, else the package name, else the
    /// `[package] name` of `<root>/Cargo.toml`. Dashes become underscores the
    /// way cargo names the library artifact.
    pub fn artifact_name(&self) -> Option<String> {
        if let Some(name) = &self.name {
            return Some(name.clone());
        }
        let package = match &self.package {
            Some(package) => package.clone(),
            None => manifest_package_name(&self.root)?,
        };
        Some(package.replace('-', "_"))
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !self.root.is_dir() {
            diag.error_with_hint(
                FieldPath::new("module.root"),
                format!("`{}` is not a directory", self.root.display()),
                "point it at the crate that compiles to wasm",
            );
            return;
        }

        if self.out_dir == self.root {
            diag.error_with_hint(
                FieldPath::new("module.out_dir"),
                "must not be the module root itself",
                "generated bindings need their own subtree, e.g. \"pkg\"",
            );
        }

        if self.ignore.iter().any(|p| p == &self.root) {
            diag.error(
                FieldPath::new("module.ignore"),
                "ignoring the module root would disable rebuilds",
            );
        }

        if self.artifact_name().is_none() {
            diag.error_with_hint(
                FieldPath::new("module.name"),
                "cannot determine the artifact name",
                "set `package` or `name`, or add a Cargo.toml with [package] name",
            );
        }
    }
}

/// Read `[package] name` from `<root>/Cargo.toml`.
fn manifest_package_name(root: &Path) -> Option<String> {
    let content = std::fs::read_to_string(root.join("Cargo.toml")).ok()?;
    let manifest: toml::Table = toml::from_str(&content).ok()?;
    manifest
        .get("package")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use tempfile::TempDir;

    #[test]
    fn test_module_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.module.root, PathBuf::from("."));
        assert_eq!(config.module.out_dir, PathBuf::from("pkg"));
        assert_eq!(config.module.ignore, vec![PathBuf::from("target")]);
    }

    #[test]
    fn test_normalize_resolves_against_root() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("engine")).unwrap();
        let mut module = test_parse_config("[module]\nroot = \"engine\"").module;
        module.normalize(dir.path());

        let root = dir.path().canonicalize().unwrap().join("engine");
        assert_eq!(module.root, root);
        assert_eq!(module.out_dir, root.join("pkg"));
        assert_eq!(module.ignore, vec![root.join("target")]);
    }

    #[test]
    fn test_artifact_name_from_package() {
        let module = test_parse_config("[module]\npackage = \"my-engine\"").module;
        assert_eq!(module.artifact_name().as_deref(), Some("my_engine"));
    }

    #[test]
    fn test_artifact_name_explicit_wins() {
        let module =
            test_parse_config("[module]\npackage = \"my-engine\"\nname = \"core\"").module;
        assert_eq!(module.artifact_name().as_deref(), Some("core"));
    }

    #[test]
    fn test_artifact_name_from_manifest() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("Cargo.toml"),
            "[package]\nname = \"render-core\"\nversion = \"0.1.0\"\n",
        )
        .unwrap();
        let mut module = ModuleConfig::default();
        module.normalize(dir.path());
        assert_eq!(module.artifact_name().as_deref(), Some("render_core"));
    }

    #[test]
    fn test_validate_out_dir_equal_root() {
        let dir = TempDir::new().unwrap();
        let mut module =
            test_parse_config("[module]\nout_dir = \".\"\nname = \"x\"").module;
        module.normalize(dir.path());

        let mut diag = ConfigDiagnostics::new();
        module.validate(&mut diag);
        assert_eq!(diag.errors().len(), 1);
        assert_eq!(diag.errors()[0].field.as_str(), "module.out_dir");
    }

    #[test]
    fn test_validate_missing_root() {
        let dir = TempDir::new().unwrap();
        let mut module = test_parse_config("[module]\nroot = \"nope\"").module;
        module.normalize(dir.path());

        let mut diag = ConfigDiagnostics::new();
        module.validate(&mut diag);
        assert_eq!(diag.errors()[0].field.as_str(), "module.root");
    }
}
