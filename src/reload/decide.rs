//! Live-swap vs full-reload decisions.
//!
//! ```text
//! Idle ──build succeeded──▶ BuildSucceeded ──▶ LiveSwap | FullReload | (unchanged) ──▶ Idle
//! ```
//!
//! Only post-build output reaches the coordinator. A build is adopted as a
//! whole: the manifest is updated in one step together with the decision,
//! never partially.

use std::path::{Path, PathBuf};

use super::manifest::{ArtifactChanges, ArtifactKind, ArtifactManifest};

/// Notification for the running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadEvent {
    /// Re-instantiate the module from `artifacts` without reloading.
    LiveSwap {
        generation: u64,
        /// Every artifact of the new build.
        artifacts: Vec<PathBuf>,
    },
    /// Discard current module state and reload from scratch.
    FullReload { reason: String },
}

/// Coordinator phase, observable for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorPhase {
    Idle,
    BuildSucceeded,
}

/// Turns new generated output into reload events.
#[derive(Debug)]
pub struct HotReloadCoordinator {
    out_dir: PathBuf,
    manifest: ArtifactManifest,
    generation: u64,
    phase: CoordinatorPhase,
}

impl HotReloadCoordinator {
    /// Seed from what `out_dir` holds now, i.e. what the session loaded.
    pub fn new(out_dir: PathBuf) -> Self {
        let manifest = ArtifactManifest::seed(&out_dir);
        Self::with_manifest(out_dir, manifest)
    }

    pub fn with_manifest(out_dir: PathBuf, manifest: ArtifactManifest) -> Self {
        Self {
            out_dir,
            manifest,
            generation: 0,
            phase: CoordinatorPhase::Idle,
        }
    }

    pub const fn phase(&self) -> CoordinatorPhase {
        self.phase
    }

    /// Generation of the most recent live swap (0 = initial load).
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn manifest(&self) -> &ArtifactManifest {
        &self.manifest
    }

    /// A build succeeded with the complete `artifacts` listing.
    ///
    /// Returns `None` when the build reproduced what the session already runs.
    pub fn on_build_succeeded(&mut self, artifacts: &[PathBuf]) -> Option<ReloadEvent> {
        self.phase = CoordinatorPhase::BuildSucceeded;
        let changes = self.manifest.changes_since_build(artifacts);
        let event = self.adopt(&changes);
        self.phase = CoordinatorPhase::Idle;
        event
    }

    /// Generated files changed on disk outside our own builds (or our own
    /// writes echoing back through the watcher).
    pub fn on_output_changed(&mut self, paths: &[PathBuf]) -> Option<ReloadEvent> {
        let changes = self.manifest.changes_for(paths);
        self.adopt(&changes)
    }

    /// Re-seed the manifest from disk and tell the session to reload, e.g.
    /// after the config changed underneath it.
    pub fn force_full_reload(&mut self, reason: impl Into<String>) -> ReloadEvent {
        self.manifest = ArtifactManifest::seed(&self.out_dir);
        ReloadEvent::FullReload {
            reason: reason.into(),
        }
    }

    /// Follow `out_dir` to a new location. The session reloads from there;
    /// generations keep counting.
    pub fn relocate(&mut self, out_dir: PathBuf, reason: impl Into<String>) -> ReloadEvent {
        self.out_dir = out_dir;
        self.force_full_reload(reason)
    }

    fn adopt(&mut self, changes: &ArtifactChanges) -> Option<ReloadEvent> {
        if changes.is_empty() {
            return None;
        }

        let decision = self.decide(changes);
        self.manifest.apply(changes);

        Some(match decision {
            Decision::LiveSwap => {
                self.generation += 1;
                ReloadEvent::LiveSwap {
                    generation: self.generation,
                    artifacts: self.manifest.paths(),
                }
            }
            Decision::FullReload(reason) => ReloadEvent::FullReload { reason },
        })
    }

    fn decide(&self, changes: &ArtifactChanges) -> Decision {
        if let Some(removed) = changes.removed.first() {
            return Decision::FullReload(format!("{} was removed", self.relative(removed)));
        }
        if let Some(structural) = changes.changed.iter().find(|a| !a.kind.is_hot_swappable()) {
            let what = match structural.kind {
                ArtifactKind::Declarations => "exported interface changed",
                ArtifactKind::Package => "package manifest changed",
                _ => "non-module artifact changed",
            };
            return Decision::FullReload(format!("{what} ({})", self.relative(&structural.path)));
        }
        Decision::LiveSwap
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.out_dir)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

enum Decision {
    LiveSwap,
    FullReload(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        out: PathBuf,
    }

    impl Fixture {
        fn new(files: &[(&str, &str)]) -> Self {
            let dir = TempDir::new().unwrap();
            let out = dir.path().join("pkg");
            std::fs::create_dir_all(&out).unwrap();
            let fixture = Self { _dir: dir, out };
            for (name, data) in files {
                fixture.write(name, data);
            }
            fixture
        }

        fn write(&self, name: &str, data: &str) -> PathBuf {
            let path = self.out.join(name);
            std::fs::write(&path, data).unwrap();
            path
        }

        fn listing(&self) -> Vec<PathBuf> {
            crate::build::list_artifacts(&self.out)
        }
    }

    const INITIAL: &[(&str, &str)] = &[
        ("engine_bg.wasm", "wasm v1"),
        ("engine.js", "glue v1"),
        ("engine.d.ts", "decl v1"),
    ];

    #[test]
    fn test_binary_only_change_is_live_swap() {
        let fx = Fixture::new(INITIAL);
        let mut coordinator = HotReloadCoordinator::new(fx.out.clone());

        fx.write("engine_bg.wasm", "wasm v2");
        let event = coordinator.on_build_succeeded(&fx.listing()).unwrap();

        match event {
            ReloadEvent::LiveSwap {
                generation,
                artifacts,
            } => {
                assert_eq!(generation, 1);
                assert_eq!(artifacts.len(), 3);
            }
            other => panic!("expected live swap, got {other:?}"),
        }
        assert_eq!(coordinator.phase(), CoordinatorPhase::Idle);
    }

    #[test]
    fn test_declaration_change_is_full_reload() {
        let fx = Fixture::new(INITIAL);
        let mut coordinator = HotReloadCoordinator::new(fx.out.clone());

        fx.write("engine_bg.wasm", "wasm v2");
        fx.write("engine.d.ts", "decl v2");
        let event = coordinator.on_build_succeeded(&fx.listing()).unwrap();

        assert!(matches!(
            event,
            ReloadEvent::FullReload { ref reason } if reason.contains("engine.d.ts")
        ));
        assert_eq!(coordinator.generation(), 0);
    }

    #[test]
    fn test_identical_build_emits_nothing() {
        let fx = Fixture::new(INITIAL);
        let mut coordinator = HotReloadCoordinator::new(fx.out.clone());

        fx.write("engine.js", "glue v1");
        assert!(coordinator.on_build_succeeded(&fx.listing()).is_none());
    }

    #[test]
    fn test_removed_artifact_is_full_reload() {
        let fx = Fixture::new(INITIAL);
        let mut coordinator = HotReloadCoordinator::new(fx.out.clone());

        std::fs::remove_file(fx.out.join("engine.d.ts")).unwrap();
        let event = coordinator.on_build_succeeded(&fx.listing()).unwrap();
        assert!(matches!(event, ReloadEvent::FullReload { .. }));
    }

    #[test]
    fn test_first_build_into_empty_out_dir() {
        let fx = Fixture::new(&[]);
        let mut coordinator = HotReloadCoordinator::new(fx.out.clone());

        fx.write("engine_bg.wasm", "wasm v1");
        fx.write("engine.js", "glue v1");
        let event = coordinator.on_build_succeeded(&fx.listing()).unwrap();
        assert!(matches!(event, ReloadEvent::LiveSwap { generation: 1, .. }));
    }

    #[test]
    fn test_watcher_echo_after_build_is_dropped() {
        let fx = Fixture::new(INITIAL);
        let mut coordinator = HotReloadCoordinator::new(fx.out.clone());

        let wasm = fx.write("engine_bg.wasm", "wasm v2");
        assert!(coordinator.on_build_succeeded(&fx.listing()).is_some());
        assert!(coordinator.on_output_changed(&[wasm]).is_none());
    }

    #[test]
    fn test_external_rewrite_goes_through_decision() {
        let fx = Fixture::new(INITIAL);
        let mut coordinator = HotReloadCoordinator::new(fx.out.clone());

        let js = fx.write("engine.js", "glue v2 (hand-run bindgen)");
        let event = coordinator.on_output_changed(&[js]).unwrap();
        assert!(matches!(event, ReloadEvent::LiveSwap { generation: 1, .. }));
    }

    #[test]
    fn test_generations_increase() {
        let fx = Fixture::new(INITIAL);
        let mut coordinator = HotReloadCoordinator::new(fx.out.clone());

        for n in 2..5 {
            fx.write("engine_bg.wasm", &format!("wasm v{n}"));
            coordinator.on_build_succeeded(&fx.listing());
        }
        assert_eq!(coordinator.generation(), 3);
    }

    #[test]
    fn test_relocate_follows_new_out_dir() {
        let fx = Fixture::new(INITIAL);
        let mut coordinator = HotReloadCoordinator::new(fx.out.clone());
        fx.write("engine_bg.wasm", "wasm v2");
        coordinator.on_build_succeeded(&fx.listing());

        let moved = fx._dir.path().join("dist");
        std::fs::create_dir_all(&moved).unwrap();
        std::fs::write(moved.join("engine_bg.wasm"), "wasm v2").unwrap();
        std::fs::write(moved.join("engine.js"), "glue v1").unwrap();

        let event = coordinator.relocate(moved.clone(), "hotbridge.toml changed");
        assert!(matches!(event, ReloadEvent::FullReload { .. }));
        assert_eq!(coordinator.out_dir(), moved);
        assert_eq!(coordinator.generation(), 1);
        assert!(
            coordinator
                .on_build_succeeded(&crate::build::list_artifacts(&moved))
                .is_none()
        );
    }
}
