//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! debounce_ms = 500                   # Quiet window before a rebuild
//! target = "wasm32-unknown-unknown"   # Stage 1 compile target
//! mode_env = "MODE"                   # `production` selects an optimized build
//! cargo = ["cargo"]                   # Stage 1 program (+ leading args)
//! bindgen = ["wasm-bindgen"]          # Stage 2 program (+ leading args)
//! bindgen_target = "web"              # wasm-bindgen --target
//! timeout_secs = 300                  # Kill a stage after this long (unset = wait)
//! pty = false                         # Run stage 1 in a pseudo-terminal
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// Debug or optimized build variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    /// Profile selected by an environment mode value.
    pub fn from_mode(mode: Option<&str>) -> Self {
        match mode {
            Some(m) if m.eq_ignore_ascii_case("production") => Self::Release,
            _ => Self::Debug,
        }
    }

    /// Directory name under `target/<triple>/`.
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    pub const fn is_release(self) -> bool {
        matches!(self, Self::Release)
    }
}

/// Build settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSectionConfig {
    /// Quiet window in milliseconds.
    pub debounce_ms: u64,

    /// Compile target triple.
    pub target: String,

    /// Environment variable holding the session's environment mode.
    pub mode_env: String,

    /// Stage 1 command prefix.
    pub cargo: Vec<String>,

    /// Stage 2 command prefix.
    pub bindgen: Vec<String>,

    /// `wasm-bindgen --target` value.
    pub bindgen_target: String,

    /// Per-stage timeout. Unset means wait for the toolchain indefinitely.
    pub timeout_secs: Option<u64>,

    /// Run stage 1 in a pseudo-terminal (keeps cargo's colors).
    pub pty: bool,

    /// `--release` / `--debug` override from the command line.
    #[serde(skip)]
    pub profile_override: Option<BuildProfile>,
}

impl Default for BuildSectionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            target: "wasm32-unknown-unknown".into(),
            mode_env: "MODE".into(),
            cargo: vec!["cargo".into()],
            bindgen: vec!["wasm-bindgen".into()],
            bindgen_target: "web".into(),
            timeout_secs: None,
            pty: false,
            profile_override: None,
        }
    }
}

impl BuildSectionConfig {
    /// Debounce quiet window.
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Profile from the CLI override, else from the environment mode.
    pub fn profile(&self) -> BuildProfile {
        if let Some(profile) = self.profile_override {
            return profile;
        }
        let mode = std::env::var(&self.mode_env).ok();
        BuildProfile::from_mode(mode.as_deref())
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        Self::validate_command(&self.cargo, FieldPath::new("build.cargo"), diag);
        Self::validate_command(&self.bindgen, FieldPath::new("build.bindgen"), diag);

        if self.target.trim().is_empty() {
            diag.error(FieldPath::new("build.target"), "must not be empty");
        }
        if self.mode_env.trim().is_empty() {
            diag.error(FieldPath::new("build.mode_env"), "must not be empty");
        }
        if self.timeout_secs == Some(0) {
            diag.error_with_hint(
                FieldPath::new("build.timeout_secs"),
                "a zero timeout kills every build",
                "remove the field to wait indefinitely",
            );
        }
    }

    fn validate_command(command: &[String], field: FieldPath, diag: &mut ConfigDiagnostics) {
        let Some(program) = command.first() else {
            diag.error(field, "command must not be empty");
            return;
        };
        if which::which(program).is_err() {
            diag.warn(field, format!("`{program}` not found in PATH"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_build_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.build.debounce(), Duration::from_millis(500));
        assert_eq!(config.build.target, "wasm32-unknown-unknown");
        assert_eq!(config.build.mode_env, "MODE");
        assert_eq!(config.build.bindgen_target, "web");
        assert!(config.build.timeout().is_none());
        assert!(!config.build.pty);
    }

    #[test]
    fn test_build_config_override() {
        let config = test_parse_config(
            "[build]\ndebounce_ms = 200\ntimeout_secs = 30\ncargo = [\"cross\"]",
        );
        assert_eq!(config.build.debounce(), Duration::from_millis(200));
        assert_eq!(config.build.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.build.cargo, vec!["cross".to_string()]);
    }

    #[test]
    fn test_profile_from_mode() {
        assert_eq!(BuildProfile::from_mode(Some("production")), BuildProfile::Release);
        assert_eq!(BuildProfile::from_mode(Some("PRODUCTION")), BuildProfile::Release);
        assert_eq!(BuildProfile::from_mode(Some("development")), BuildProfile::Debug);
        assert_eq!(BuildProfile::from_mode(None), BuildProfile::Debug);
    }

    #[test]
    fn test_profile_override_wins() {
        let mut build = BuildSectionConfig {
            mode_env: "HOTBRIDGE_TEST_UNSET_MODE".into(),
            ..Default::default()
        };
        assert_eq!(build.profile(), BuildProfile::Debug);
        build.profile_override = Some(BuildProfile::Release);
        assert_eq!(build.profile(), BuildProfile::Release);
    }

    #[test]
    fn test_validate_empty_command() {
        let build = BuildSectionConfig {
            cargo: vec![],
            ..Default::default()
        };
        let mut diag = ConfigDiagnostics::new();
        build.validate(&mut diag);
        assert!(diag.errors().iter().any(|e| e.field.as_str() == "build.cargo"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let build = BuildSectionConfig {
            timeout_secs: Some(0),
            ..Default::default()
        };
        let mut diag = ConfigDiagnostics::new();
        build.validate(&mut diag);
        assert!(
            diag.errors()
                .iter()
                .any(|e| e.field.as_str() == "build.timeout_secs")
        );
    }
}
