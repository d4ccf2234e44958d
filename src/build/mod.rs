//! Build orchestration for the compiled module.
//!
//! One logical build is two external stages run strictly in sequence:
//!
//! 1. `cargo build` compiles the module to a wasm binary.
//! 2. `wasm-bindgen` turns that binary into glue + bindings in `out_dir`.
//!
//! Stage 2 reads stage 1's output, so it only starts after stage 1 exited
//! successfully, and builds never overlap ([`BuildSchedule`] guarantees
//! the latter for the watcher-driven path).
//!
//! A failed build never touches the running session: the result is just a
//! value the caller reports.

mod error;
mod schedule;
mod toolchain;

pub use error::{BuildError, Stage};
pub use schedule::{BuildSchedule, ScheduleState};
pub use toolchain::{
    ProcessToolchain, StageCommand, StageOutput, Toolchain, bindgen_command, compile_command,
    compiled_wasm_path, target_dir,
};

use jwalk::WalkDir;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::{BridgeConfig, BuildProfile};

/// Terminal value of one build attempt.
#[derive(Debug, Clone)]
pub struct BuildResult {
    /// Every file in `out_dir` after a successful build, sorted.
    pub outcome: Result<Vec<PathBuf>, BuildError>,
    pub profile: BuildProfile,
    pub elapsed: Duration,
}

impl BuildResult {
    pub const fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn artifacts(&self) -> &[PathBuf] {
        self.outcome.as_deref().unwrap_or_default()
    }

    pub fn error(&self) -> Option<&BuildError> {
        self.outcome.as_ref().err()
    }
}

/// Run one build to completion.
///
/// Blocks for as long as the toolchain runs.
pub fn build_now(config: &BridgeConfig, toolchain: &dyn Toolchain) -> BuildResult {
    let profile = config.build.profile();
    let started = Instant::now();
    let outcome = run_stages(config, toolchain, profile);
    BuildResult {
        outcome,
        profile,
        elapsed: started.elapsed(),
    }
}

fn run_stages(
    config: &BridgeConfig,
    toolchain: &dyn Toolchain,
    profile: BuildProfile,
) -> Result<Vec<PathBuf>, BuildError> {
    let stages = [
        compile_command(config, profile),
        bindgen_command(config, profile),
    ];

    for command in &stages {
        crate::debug!("build"; "{}: {}", command.stage, command.display());
        let output = toolchain.execute(command)?;
        if !output.success {
            return Err(BuildError::Stage {
                stage: command.stage,
                status: output.status,
                stderr: output.stderr,
            });
        }
    }

    for expected in expected_artifacts(config) {
        if !expected.is_file() {
            return Err(BuildError::MissingArtifact(expected));
        }
    }

    Ok(list_artifacts(&config.module.out_dir))
}

/// Files every successful build must leave in `out_dir`.
pub fn expected_artifacts(config: &BridgeConfig) -> [PathBuf; 2] {
    let name = config.artifact_name();
    let out_dir = &config.module.out_dir;
    [
        out_dir.join(format!("{name}_bg.wasm")),
        out_dir.join(format!("{name}.js")),
    ]
}

/// All files below `dir`, sorted. Missing directories yield nothing.
pub fn list_artifacts(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<_> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .collect();
    files.sort();
    files
}

/// Pass the failing subprocess's diagnostic stream through to our stderr.
pub fn write_raw_diagnostics(err: &BuildError) {
    let raw = err.stderr();
    if raw.is_empty() {
        return;
    }
    let mut stderr = std::io::stderr().lock();
    let _ = stderr.write_all(raw);
    if !raw.ends_with(b"\n") {
        let _ = stderr.write_all(b"\n");
    }
    let _ = stderr.flush();
}

// ============================================================================
// Test toolchain
// ============================================================================


#[cfg(test)]
mod tests {
    use super::testing::FakeToolchain;
    use super::*;
    use crate::config::test_open_config;
    use tempfile::TempDir;

    #[test]
    fn test_build_runs_both_stages_in_order() {
        let dir = TempDir::new().unwrap();
        let config = test_open_config(dir.path(), "[module]\nroot = \"engine\"");
        let toolchain = FakeToolchain::engine();

        let result = build_now(&config, &toolchain);

        assert!(result.succeeded());
        assert_eq!(toolchain.stages(), vec![Stage::Compile, Stage::Bindgen]);
        let names: Vec<_> = result
            .artifacts()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["engine.d.ts", "engine.js", "engine_bg.wasm"]);
    }

    #[test]
    fn test_compile_failure_skips_bindgen() {
        let dir = TempDir::new().unwrap();
        let config = test_open_config(dir.path(), "[module]\nroot = \"engine\"");
        let toolchain = FakeToolchain::engine();
        toolchain.fail_at(Some(Stage::Compile));

        let result = build_now(&config, &toolchain);

        assert!(!result.succeeded());
        assert_eq!(toolchain.stages(), vec![Stage::Compile]);
        match result.error().unwrap() {
            BuildError::Stage { stage, stderr, .. } => {
                assert_eq!(*stage, Stage::Compile);
                assert_eq!(stderr, b"error: scripted failure\n");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(result.artifacts().is_empty());
        assert!(!config.module.out_dir.exists());
    }

    #[test]
    fn test_bindgen_failure_is_a_failed_build() {
        let dir = TempDir::new().unwrap();
        let config = test_open_config(dir.path(), "[module]\nroot = \"engine\"");
        let toolchain = FakeToolchain::engine();
        toolchain.fail_at(Some(Stage::Bindgen));

        let result = build_now(&config, &toolchain);
        assert_eq!(result.error().and_then(BuildError::stage), Some(Stage::Bindgen));
    }

    #[test]
    fn test_missing_glue_is_reported() {
        let dir = TempDir::new().unwrap();
        let config = test_open_config(dir.path(), "[module]\nroot = \"engine\"");
        let toolchain = FakeToolchain::new(&[("engine_bg.wasm", b"\0asm")]);

        let result = build_now(&config, &toolchain);
        assert!(matches!(
            result.error(),
            Some(BuildError::MissingArtifact(path)) if path.ends_with("engine.js")
        ));
    }

    #[test]
    fn test_list_artifacts_recurses_and_sorts() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("snippets/engine-1234")).unwrap();
        std::fs::write(dir.path().join("b.js"), "").unwrap();
        std::fs::write(dir.path().join("a_bg.wasm"), "").unwrap();
        std::fs::write(dir.path().join("snippets/engine-1234/inline0.js"), "").unwrap();

        let files = list_artifacts(dir.path());
        assert_eq!(
            files,
            vec![
                dir.path().join("a_bg.wasm"),
                dir.path().join("b.js"),
                dir.path().join("snippets/engine-1234/inline0.js"),
            ]
        );
        assert!(list_artifacts(&dir.path().join("missing")).is_empty());
    }
}
