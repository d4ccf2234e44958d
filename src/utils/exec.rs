//! Toolchain subprocess execution.
//!
//! A small builder over `std::process` (or a pseudo-terminal) that always
//! returns the raw output, whatever the exit status, and can give up on a
//! child after a timeout.
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! // Configured command array, e.g. `["rustup", "run", "nightly", "cargo"]`
//! let output = Cmd::from_slice(&argv)
//!     .cwd(root)
//!     .timeout(config.build.timeout())
//!     .output()?;
//! ```

use anyhow::{Context, Result, anyhow};
use portable_pty::{CommandBuilder, NativePtySystem, PtySize, PtySystem};
use regex::Regex;
use std::{
    borrow::Cow,
    ffi::{OsStr, OsString},
    io::Read,
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Output, Stdio},
    sync::LazyLock,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// Poll interval while waiting on a child with a timeout.
const WAIT_POLL: Duration = Duration::from_millis(20);

/// The child outlived its timeout and was killed.
///
/// Returned inside the `anyhow::Error` of [`Cmd::output`]; callers that care
/// use `downcast_ref::<TimedOut>()`.
#[derive(Debug, thiserror::Error)]
#[error("Command `{program}` timed out after {}s", .limit.as_secs())]
pub struct TimedOut {
    pub program: String,
    pub limit: Duration,
}

/// Command builder for one toolchain stage.
#[derive(Debug, Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    use_pty: bool,
    timeout: Option<Duration>,
}

impl Cmd {
    /// Create from a command array: the first element is the program.
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter().map(|s| s.as_ref().to_owned());
        Self {
            program: iter.next().unwrap_or_default(),
            args: iter.filter(|arg| !arg.is_empty()).collect(),
            ..Default::default()
        }
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Run inside a pseudo-terminal so the toolchain keeps its colored
    /// diagnostics. Both streams end up in `stdout`.
    pub fn pty(mut self, enable: bool) -> Self {
        self.use_pty = enable;
        self
    }

    /// Kill the child if it has not exited after `timeout`. `None` waits forever.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Execute the command and return its raw output, whatever the exit status.
    ///
    /// Errors only when the process cannot be spawned, waited on, or timed out.
    pub fn output(self) -> Result<Output> {
        if self.use_pty {
            self.output_with_pty()
        } else {
            self.output_piped()
        }
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    fn output_piped(self) -> Result<Output> {
        let name = self.program_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn `{name}`"))?;

        // Drain both pipes concurrently so a chatty child never blocks on a full pipe
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let status = wait_bounded(&name, self.timeout, || {
            child
                .try_wait()
                .with_context(|| format!("Failed to wait for `{name}`"))
        })
        .inspect_err(|_| {
            let _ = child.kill();
            let _ = child.wait();
        })?;

        Ok(Output {
            status,
            stdout: join_reader(stdout),
            stderr: join_reader(stderr),
        })
    }

    fn output_with_pty(self) -> Result<Output> {
        let name = self.program_name();

        let mut builder = CommandBuilder::new(&self.program);
        builder.args(&self.args);
        if let Some(dir) = &self.cwd {
            builder.cwd(dir);
        }

        let pair = NativePtySystem::default().openpty(PtySize {
            rows: 24,
            cols: 120,
            pixel_width: 0,
            pixel_height: 0,
        })?;

        let mut child = pair
            .slave
            .spawn_command(builder)
            .with_context(|| format!("Failed to spawn `{name}`"))?;
        drop(pair.slave);

        // PTY reads block until EOF
        let output = spawn_reader(pair.master.try_clone_reader()?);

        let status = wait_bounded(&name, self.timeout, || {
            child
                .try_wait()
                .map(|status| status.map(|s| pty_exit_status(s.exit_code())))
                .with_context(|| format!("Failed to wait for `{name}`"))
        })
        .inspect_err(|_| {
            let _ = child.kill();
        });
        drop(pair.master);
        let status = status?;

        let stdout = output
            .join()
            .map_err(|_| anyhow!("Failed to join output reader of `{name}`"))?;
        Ok(Output {
            status,
            stdout,
            stderr: Vec::new(),
        })
    }
}

/// Poll `try_wait` until the child exits or `limit` passes.
fn wait_bounded(
    name: &str,
    limit: Option<Duration>,
    mut try_wait: impl FnMut() -> Result<Option<ExitStatus>>,
) -> Result<ExitStatus> {
    let started = Instant::now();
    loop {
        if let Some(status) = try_wait()? {
            return Ok(status);
        }
        if let Some(limit) = limit
            && started.elapsed() >= limit
        {
            return Err(TimedOut {
                program: name.to_string(),
                limit,
            }
            .into());
        }
        thread::sleep(WAIT_POLL);
    }
}

#[cfg(unix)]
#[allow(clippy::cast_possible_wrap)]
fn pty_exit_status(code: u32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw((code as i32) << 8)
}

#[cfg(windows)]
fn pty_exit_status(code: u32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(code)
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

static ANSI_ESCAPE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").ok());

/// Strip ANSI color codes, e.g. from pty-captured cargo output.
pub fn strip_ansi(s: &str) -> Cow<'_, str> {
    match ANSI_ESCAPE.as_ref() {
        Some(re) => re.replace_all(s, ""),
        None => Cow::Borrowed(s),
    }
}
