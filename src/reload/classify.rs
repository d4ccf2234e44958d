//! Change classification.
//!
//! Pure functions partitioning filesystem changes. No actor machinery, no
//! side effects.
//!
//! Order matters: the generated-output subtree is checked before the module
//! root, because `out_dir` usually lives *inside* the module tree and the
//! toolchain rewrites it on every build. Classifying those writes as source
//! changes would rebuild forever.

use std::path::{Path, PathBuf};

use crate::config::BridgeConfig;
use crate::utils::path::{is_under, normalize_path};

/// What a changed path means to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeCategory {
    /// Module source: schedule a rebuild.
    ModuleSource,
    /// Toolchain output: candidate for a live swap.
    GeneratedOutput,
    /// Build caches, ignored subtrees, anything outside the module.
    Irrelevant,
}

/// Classifies paths against the configured module layout.
///
/// All stored paths are normalized; callers pass normalized paths too.
#[derive(Debug, Clone)]
pub struct ChangeClassifier {
    root: PathBuf,
    out_dir: PathBuf,
    ignore: Vec<PathBuf>,
    config_path: PathBuf,
}

impl ChangeClassifier {
    pub fn new(root: PathBuf, out_dir: PathBuf, ignore: Vec<PathBuf>) -> Self {
        Self {
            root,
            out_dir,
            ignore,
            config_path: PathBuf::new(),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            root: config.module.root.clone(),
            out_dir: config.module.out_dir.clone(),
            ignore: config.module.ignore.clone(),
            config_path: config.config_path.clone(),
        }
    }

    pub fn classify(&self, path: &Path) -> ChangeCategory {
        if is_under(path, &self.out_dir) {
            ChangeCategory::GeneratedOutput
        } else if !is_under(path, &self.root) {
            ChangeCategory::Irrelevant
        } else if self.ignore.iter().any(|dir| is_under(path, dir)) {
            ChangeCategory::Irrelevant
        } else {
            ChangeCategory::ModuleSource
        }
    }

    /// Is `path` the project config file?
    pub fn is_config(&self, path: &Path) -> bool {
        !self.config_path.as_os_str().is_empty() && path == self.config_path
    }

    /// Classify a batch of raw watcher paths.
    pub fn classify_changes(&self, paths: &[PathBuf]) -> ClassifiedChanges {
        let mut result = ClassifiedChanges::default();

        for path in paths {
            // Newly created files may arrive non-canonicalized
            let normalized = normalize_path(path);
            let category = self.classify(&normalized);

            if self.is_config(&normalized) {
                result.config_changed = true;
                continue;
            }
            match category {
                ChangeCategory::ModuleSource => result.source.push(normalized),
                ChangeCategory::GeneratedOutput => result.generated.push(normalized),
                ChangeCategory::Irrelevant => result.irrelevant += 1,
            }
        }

        result
    }
}

/// Result of classifying a batch of changed files.
#[derive(Debug, Default)]
pub struct ClassifiedChanges {
    /// Module source files: trigger a rebuild.
    pub source: Vec<PathBuf>,
    /// Generated outputs: routed to the reload coordinator.
    pub generated: Vec<PathBuf>,
    /// `hotbridge.toml` changed.
    pub config_changed: bool,
    /// Number of dropped paths (for debug logging).
    pub irrelevant: usize,
}

impl ClassifiedChanges {
    pub fn is_empty(&self) -> bool {
        self.source.is_empty() && self.generated.is_empty() && !self.config_changed
    }
}
