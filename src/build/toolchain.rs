//! External toolchain invocation.
//!
//! The two stage command lines are derived purely from config; running them
//! goes through the [`Toolchain`] trait so the orchestrator can be exercised
//! without a wasm toolchain installed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{BridgeConfig, BuildProfile};
use crate::utils::exec::{Cmd, TimedOut};

use super::{BuildError, Stage};

/// A fully resolved stage invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCommand {
    pub stage: Stage,
    /// Program followed by its arguments.
    pub argv: Vec<String>,
    pub cwd: PathBuf,
}

impl StageCommand {
    /// Command line as typed in a shell, for logs.
    pub fn display(&self) -> String {
        self.argv.join(" ")
    }
}

/// Exit information of a finished stage.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub success: bool,
    /// Human-readable exit status (`exit status: 101`).
    pub status: String,
    /// Diagnostic stream, unmodified.
    pub stderr: Vec<u8>,
}

/// Runs stage commands to completion.
///
/// Implementations block until the subprocess exits; callers move the call
/// off the async runtime.
pub trait Toolchain: Send + Sync {
    fn execute(&self, command: &StageCommand) -> Result<StageOutput, BuildError>;
}

/// Real subprocess toolchain.
#[derive(Debug, Clone, Default)]
pub struct ProcessToolchain {
    /// Kill a stage that runs longer than this.
    pub timeout: Option<Duration>,
    /// Run the compile stage inside a pseudo-terminal.
    pub pty: bool,
}

impl ProcessToolchain {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            timeout: config.build.timeout(),
            pty: config.build.pty,
        }
    }
}

impl Toolchain for ProcessToolchain {
    fn execute(&self, command: &StageCommand) -> Result<StageOutput, BuildError> {
        let stage = command.stage;
        let pty = self.pty && stage == Stage::Compile;
        let output = Cmd::from_slice(&command.argv)
            .cwd(&command.cwd)
            .pty(pty)
            .timeout(self.timeout)
            .output()
            .map_err(|err| match err.downcast_ref::<TimedOut>() {
                Some(timed_out) => BuildError::TimedOut {
                    stage,
                    limit: timed_out.limit,
                },
                None => BuildError::Spawn {
                    stage,
                    message: format!("{err:#}"),
                },
            })?;

        // A pty merges both streams into stdout
        let stderr = if pty { output.stdout } else { output.stderr };

        Ok(StageOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            stderr,
        })
    }
}

// ============================================================================
// Command lines
// ============================================================================

/// Stage 1: `cargo build --lib --target <triple> [--release] [-p <package>]`.
pub fn compile_command(config: &BridgeConfig, profile: BuildProfile) -> StageCommand {
    let mut argv = config.build.cargo.clone();
    argv.extend(["build", "--lib", "--target"].map(String::from));
    argv.push(config.build.target.clone());
    if profile.is_release() {
        argv.push("--release".into());
    }
    if let Some(package) = &config.module.package {
        argv.push("-p".into());
        argv.push(package.clone());
    }

    StageCommand {
        stage: Stage::Compile,
        argv,
        cwd: config.module.root.clone(),
    }
}

/// Stage 2: `wasm-bindgen --target <t> --out-dir <out> [--debug --keep-debug] <wasm>`.
pub fn bindgen_command(config: &BridgeConfig, profile: BuildProfile) -> StageCommand {
    let mut argv = config.build.bindgen.clone();
    argv.push("--target".into());
    argv.push(config.build.bindgen_target.clone());
    argv.push("--out-dir".into());
    argv.push(config.module.out_dir.display().to_string());
    if !profile.is_release() {
        argv.push("--debug".into());
        argv.push("--keep-debug".into());
    }
    argv.push(compiled_wasm_path(config, profile).display().to_string());

    StageCommand {
        stage: Stage::Bindgen,
        argv,
        cwd: config.module.root.clone(),
    }
}

/// `<target-dir>/<triple>/<debug|release>/<name>.wasm`
pub fn compiled_wasm_path(config: &BridgeConfig, profile: BuildProfile) -> PathBuf {
    target_dir(&config.module.root)
        .join(&config.build.target)
        .join(profile.dir_name())
        .join(format!("{}.wasm", config.artifact_name()))
}

/// Cargo's target directory for a crate rooted at `root`.
///
/// `CARGO_TARGET_DIR` wins; otherwise the outermost enclosing workspace
/// owns `target/`, falling back to the crate's own.
pub fn target_dir(root: &Path) -> PathBuf {
    if let Some(dir) = std::env::var_os("CARGO_TARGET_DIR") {
        let dir = PathBuf::from(dir);
        return if dir.is_absolute() { dir } else { root.join(dir) };
    }
    workspace_root(root).unwrap_or(root).join("target")
}

fn workspace_root(root: &Path) -> Option<&Path> {
    root.ancestors().filter(|dir| is_workspace(dir)).last()
}

fn is_workspace(dir: &Path) -> bool {
    std::fs::read_to_string(dir.join("Cargo.toml"))
        .ok()
        .and_then(|content| content.parse::<toml::Table>().ok())
        .is_some_and(|manifest| manifest.contains_key("workspace"))
}
