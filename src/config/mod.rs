//! Project configuration management for `hotbridge.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── module     # [module]
//! │   ├── build      # [build]
//! │   └── serve      # [serve]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   ├── field      # FieldPath
//! │   └── handle     # Global config handle
//! └── mod.rs         # BridgeConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section    | Purpose                                                |
//! |------------|--------------------------------------------------------|
//! | `[module]` | Module root, package, generated-output and ignore dirs |
//! | `[build]`  | Debounce window, toolchain commands, build mode        |
//! | `[serve]`  | Artifact HTTP server, session WebSocket, watcher       |

pub mod section;
pub mod types;
mod util;

pub use util::find_config_file;

pub use section::{BuildProfile, BuildSectionConfig, ModuleConfig, ServeConfig};
pub use types::{
    ConfigDiagnostic, ConfigDiagnostics, ConfigError, FieldPath, cfg, init_config, reload_config,
};

use crate::{
    cli::{Cli, Commands},
    log,
};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing hotbridge.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// CLI arguments reference (internal use only)
    #[serde(skip)]
    pub cli: Option<&'static Cli>,

    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Module source tree settings
    #[serde(default)]
    pub module: ModuleConfig,

    /// Build settings
    #[serde(default)]
    pub build: BuildSectionConfig,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,
}

impl BridgeConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file. The project root is the
    /// config file's parent directory.
    pub fn load(cli: &'static Cli) -> Result<Self> {
        let Some(config_path) = find_config_file(&cli.config) else {
            let cwd = std::env::current_dir().context("Failed to get current working directory")?;
            log!(
                "error";
                "config file '{}' not found in {} or any parent directory",
                cli.config.display(),
                cwd.display()
            );
            bail!(ConfigError::Validation("config file not found".into()));
        };

        let mut config = Self::from_path(&config_path)?;
        config.cli = Some(cli);
        config.apply_command_options(cli);
        config.finalize(&config_path);
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file without CLI overrides.
    pub fn open(config_path: &Path) -> Result<Self> {
        let mut config = Self::from_path(config_path)?;
        config.finalize(config_path);
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Set config/root paths and resolve every section path to absolute form.
    pub fn finalize(&mut self, config_path: &Path) {
        use crate::utils::path::normalize_path;

        self.config_path = normalize_path(config_path);
        self.root = self
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let root = self.root.clone();
        self.module.normalize(&root);
    }

    /// Get the project root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Get path relative to the project root
    pub fn root_relative(&self, path: impl AsRef<Path>) -> PathBuf {
        path.as_ref()
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.as_ref().to_path_buf())
    }

    /// Artifact stem, validated to exist by [`Self::validate`].
    pub fn artifact_name(&self) -> String {
        self.module.artifact_name().unwrap_or_default()
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, cli: &Cli) {
        crate::logger::set_verbose(cli.verbose);

        match &cli.command {
            Commands::Build { profile } => {
                self.build.profile_override = profile.profile();
            }
            Commands::Serve {
                profile,
                interface,
                port,
                ws_port,
                watch,
            } => {
                self.build.profile_override = profile.profile();
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
                Self::update_option(&mut self.serve.ws_port, ws_port.as_ref());
                Self::update_option(&mut self.serve.watch, watch.as_ref());
            }
            Commands::Check => {}
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration.
    ///
    /// Collects all validation errors and returns them at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();
        self.collect_diagnostics(&mut diag);
        diag.print_warnings();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    /// Run every section validator into `diag`.
    pub fn collect_diagnostics(&self, diag: &mut ConfigDiagnostics) {
        self.module.validate(diag);
        self.build.validate(diag);
        self.serve.validate(diag);
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields to catch typos in tests.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> BridgeConfig {
    let (parsed, ignored) = BridgeConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

/// Write `content` as `hotbridge.toml` next to a module crate named `engine`
/// inside `dir`, then open it.
#[cfg(test)]
pub fn test_open_config(dir: &Path, content: &str) -> BridgeConfig {
    let module = dir.join("engine");
    fs::create_dir_all(module.join("src")).unwrap();
    fs::write(
        module.join("Cargo.toml"),
        "[package]\nname = \"engine\"\nversion = \"0.1.0\"\n",
    )
    .unwrap();
    let path = dir.join("hotbridge.toml");
    fs::write(&path, content).unwrap();
    BridgeConfig::open(&path).unwrap()
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_str_invalid_toml() {
        let result = BridgeConfig::from_str("[module\nroot = \"engine\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_bridge_config_default() {
        let config = BridgeConfig::default();
        assert!(config.cli.is_none());
        assert_eq!(config.config_path, PathBuf::new());
        assert_eq!(config.build.debounce_ms, 500);
        assert_eq!(config.serve.port, 5290);
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[module]\nroot = \"engine\"\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = BridgeConfig::parse_with_ignored(content).unwrap();

        assert_eq!(config.module.root, PathBuf::from("engine"));
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_open_resolves_paths() {
        let dir = TempDir::new().unwrap();
        let config = test_open_config(dir.path(), "[module]\nroot = \"engine\"");

        let root = dir.path().canonicalize().unwrap();
        assert_eq!(config.get_root(), root);
        assert_eq!(config.module.root, root.join("engine"));
        assert_eq!(config.module.out_dir, root.join("engine/pkg"));
        assert_eq!(config.artifact_name(), "engine");
        assert_eq!(
            config.root_relative(&config.module.out_dir),
            PathBuf::from("engine/pkg")
        );
    }

    #[test]
    fn test_open_reports_invalid_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hotbridge.toml");
        fs::write(&path, "[module]\nroot = \"missing\"").unwrap();

        let err = BridgeConfig::open(&path).unwrap_err();
        let config_err = err.downcast_ref::<ConfigError>().unwrap();
        assert!(matches!(config_err, ConfigError::Diagnostics(_)));
    }
}
