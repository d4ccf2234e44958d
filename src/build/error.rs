//! Build failure taxonomy.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// One of the two external toolchain invocations of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Module source → wasm binary (`cargo build`).
    Compile,
    /// wasm binary → JS glue + bindings (`wasm-bindgen`).
    Bindgen,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Compile => "compile",
            Self::Bindgen => "bindgen",
        })
    }
}

/// Why a build produced no usable output.
///
/// Every variant is recoverable: the session keeps its last-good module and
/// the next source change retries.
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    /// The stage ran and exited nonzero. `stderr` is the child's diagnostic
    /// stream, byte for byte.
    #[error("{stage} stage failed ({status})")]
    Stage {
        stage: Stage,
        status: String,
        stderr: Vec<u8>,
    },

    #[error("{stage} stage could not run: {message}")]
    Spawn { stage: Stage, message: String },

    #[error("{stage} stage timed out after {}s", .limit.as_secs())]
    TimedOut { stage: Stage, limit: Duration },

    #[error("expected artifact `{}` was not generated", .0.display())]
    MissingArtifact(PathBuf),
}

impl BuildError {
    /// Stage that failed, if the failure belongs to one.
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } | Self::Spawn { stage, .. } | Self::TimedOut { stage, .. } => {
                Some(*stage)
            }
            Self::MissingArtifact(_) => None,
        }
    }

    /// Raw diagnostic output of the failing subprocess (empty when none ran).
    pub fn stderr(&self) -> &[u8] {
        match self {
            Self::Stage { stderr, .. } => stderr,
            _ => &[],
        }
    }

    /// Message suitable for a browser overlay: the summary plus the
    /// subprocess output with ANSI codes removed.
    pub fn overlay_message(&self) -> String {
        let detail = String::from_utf8_lossy(self.stderr());
        let detail = crate::utils::exec::strip_ansi(detail.trim());
        if detail.is_empty() {
            self.to_string()
        } else {
            format!("{self}\n\n{detail}")
        }
    }
}
