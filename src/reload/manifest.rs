//! Content hashes of generated artifacts.
//!
//! The manifest remembers what the session currently runs. Comparing a new
//! build (or a watcher notification) against it tells which artifacts really
//! changed, which also filters out the watcher echo of our own writes.

use std::fmt;
use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};

/// blake3 digest of a file's content.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    pub fn of_file(path: &Path) -> std::io::Result<Self> {
        std::fs::read(path).map(|bytes| Self::of(&bytes))
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..12])
    }
}

/// Role of a generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// `.wasm` module binary.
    Binary,
    /// `.js` glue.
    Glue,
    /// `.d.ts`: the shape of the exported operations.
    Declarations,
    /// `package.json`.
    Package,
    Other,
}

impl ArtifactKind {
    pub fn of(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if name == "package.json" {
            Self::Package
        } else if name.ends_with(".d.ts") {
            Self::Declarations
        } else {
            match path.extension().and_then(|e| e.to_str()) {
                Some("wasm") => Self::Binary,
                Some("js" | "mjs") => Self::Glue,
                _ => Self::Other,
            }
        }
    }

    /// Can a running session pick this change up by re-instantiating the
    /// module, without reloading?
    pub const fn is_hot_swappable(self) -> bool {
        matches!(self, Self::Binary | Self::Glue)
    }
}

/// An artifact whose content differs from the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedArtifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub hash: ContentHash,
}

/// Difference between the manifest and the files on disk.
#[derive(Debug, Default, Clone)]
pub struct ArtifactChanges {
    pub changed: Vec<ChangedArtifact>,
    pub removed: Vec<PathBuf>,
}

impl ArtifactChanges {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }
}

/// Path → hash of every artifact the session has seen.
#[derive(Debug, Default, Clone)]
pub struct ArtifactManifest {
    entries: FxHashMap<PathBuf, ContentHash>,
}

impl ArtifactManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash every file currently in `dir`.
    pub fn seed(dir: &Path) -> Self {
        let mut manifest = Self::new();
        for path in crate::build::list_artifacts(dir) {
            if let Ok(hash) = ContentHash::of_file(&path) {
                manifest.entries.insert(path, hash);
            }
        }
        manifest
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<ContentHash> {
        self.entries.get(path).copied()
    }

    /// Current artifact paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.entries.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Compare individual paths (e.g. from the watcher) with the manifest.
    ///
    /// Existing files with a new or unknown hash are changed; vanished files
    /// the manifest knows are removed; everything else is an echo.
    pub fn changes_for(&self, paths: &[PathBuf]) -> ArtifactChanges {
        let mut changes = ArtifactChanges::default();
        let mut seen = FxHashSet::default();

        for path in paths {
            if !seen.insert(path) {
                continue;
            }
            match ContentHash::of_file(path) {
                Ok(hash) => {
                    if self.get(path) != Some(hash) {
                        changes.changed.push(ChangedArtifact {
                            path: path.clone(),
                            kind: ArtifactKind::of(path),
                            hash,
                        });
                    }
                }
                Err(_) if self.entries.contains_key(path) => changes.removed.push(path.clone()),
                // Directories, or a file created and deleted before we looked
                Err(_) => {}
            }
        }

        changes
    }

    /// Compare a complete build listing with the manifest. Known artifacts
    /// missing from `artifacts` count as removed.
    pub fn changes_since_build(&self, artifacts: &[PathBuf]) -> ArtifactChanges {
        let mut changes = self.changes_for(artifacts);
        let current: FxHashSet<_> = artifacts.iter().collect();
        let mut removed: Vec<_> = self
            .entries
            .keys()
            .filter(|p| !current.contains(p))
            .cloned()
            .collect();
        removed.sort();
        changes.removed.extend(removed);
        changes
    }

    /// Adopt `changes` so later comparisons see them as current.
    pub fn apply(&mut self, changes: &ArtifactChanges) {
        for artifact in &changes.changed {
            self.entries.insert(artifact.path.clone(), artifact.hash);
        }
        for path in &changes.removed {
            self.entries.remove(path);
        }
    }
}
