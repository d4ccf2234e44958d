//! Build Actor - drives the debounce schedule and runs builds off the runtime.
//!
//! ```text
//! SourceChanged ──▶ BuildSchedule ──deadline──▶ spawn_blocking(build_now) ──▶ ReloadActor
//! ```
//!
//! At most one build task exists at a time. Changes arriving while it runs
//! fold into a single follow-up build that starts one quiet window after
//! the later of (last change, build end).

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

use super::messages::{BuildMsg, ReloadMsg};
use crate::build::{BuildResult, BuildSchedule, Toolchain, build_now, write_raw_diagnostics};
use crate::config::BridgeConfig;
use crate::core::set_serving;
use crate::logger::{status_detach, status_error};

type BuildTask = JoinHandle<BuildResult>;

/// Produces the toolchain for a given config (rebuilt after config reloads).
pub type ToolchainFactory = Box<dyn Fn(&BridgeConfig) -> Arc<dyn Toolchain> + Send>;

/// What the running build was started with.
struct InFlight {
    config: Arc<BridgeConfig>,
    full_reload: Option<String>,
}

pub struct BuildActor {
    rx: mpsc::Receiver<BuildMsg>,
    reload_tx: mpsc::Sender<ReloadMsg>,
    config: Arc<BridgeConfig>,
    toolchain_for: ToolchainFactory,
    toolchain: Arc<dyn Toolchain>,
    schedule: BuildSchedule,
    /// Reason the next build started must end in a full reload
    full_reload: Option<String>,
    in_flight: Option<InFlight>,
}

impl BuildActor {
    pub fn new(
        rx: mpsc::Receiver<BuildMsg>,
        reload_tx: mpsc::Sender<ReloadMsg>,
        config: Arc<BridgeConfig>,
        toolchain_for: ToolchainFactory,
    ) -> Self {
        let toolchain = toolchain_for(&config);
        let schedule = BuildSchedule::new(config.build.debounce());
        Self {
            rx,
            reload_tx,
            config,
            toolchain_for,
            toolchain,
            schedule,
            full_reload: None,
            in_flight: None,
        }
    }

    /// Main event loop
    pub async fn run(mut self) {
        let mut running: Option<BuildTask> = None;

        loop {
            let deadline = self.schedule.deadline();
            let wake = deadline.map_or_else(tokio::time::Instant::now, tokio::time::Instant::from_std);

            tokio::select! {
                biased;

                result = wait_build(&mut running) => {
                    running = None;
                    self.on_build_finished(result).await;
                }

                msg = self.rx.recv() => match msg {
                    Some(BuildMsg::SourceChanged(paths)) => {
                        crate::debug!("build"; "{} source files changed", paths.len());
                        self.schedule.on_source_changed(Instant::now());
                    }
                    Some(BuildMsg::ConfigChanged(config)) => {
                        self.apply_config(config);
                        self.full_reload = Some("hotbridge.toml changed".to_string());
                        self.start_now(&mut running).await;
                    }
                    Some(BuildMsg::BuildNow) => self.start_now(&mut running).await,
                    Some(BuildMsg::Shutdown) | None => break,
                },

                () = tokio::time::sleep_until(wake), if deadline.is_some() => {
                    if self.schedule.poll(Instant::now()) {
                        running = Some(self.spawn_build().await);
                    }
                }
            }
        }

        if running.is_some() {
            // spawn_blocking cannot be aborted; the subprocess finishes detached
            crate::debug!("build"; "shutting down with a build in flight");
        }
    }

    fn apply_config(&mut self, config: Arc<BridgeConfig>) {
        self.schedule.set_window(config.build.debounce());
        self.toolchain = (self.toolchain_for)(&config);
        self.config = config;
    }

    async fn start_now(&mut self, running: &mut Option<BuildTask>) {
        if self.schedule.start_now(Instant::now()) {
            *running = Some(self.spawn_build().await);
        } else {
            crate::debug!("build"; "build in flight, queued a follow-up");
        }
    }

    async fn spawn_build(&mut self) -> BuildTask {
        let _ = self.reload_tx.send(ReloadMsg::BuildStarted).await;

        let config = Arc::clone(&self.config);
        let toolchain = Arc::clone(&self.toolchain);
        // A config change only reaches the session through a build that used it
        self.in_flight = Some(InFlight {
            config: Arc::clone(&config),
            full_reload: self.full_reload.take(),
        });
        crate::debug!("build"; "building ({})", config.build.profile().dir_name());
        tokio::task::spawn_blocking(move || build_now(&config, toolchain.as_ref()))
    }

    async fn on_build_finished(&mut self, result: Result<BuildResult, JoinError>) {
        self.schedule.on_build_finished(Instant::now());
        set_serving();

        let Some(InFlight {
            config,
            full_reload,
        }) = self.in_flight.take()
        else {
            return;
        };

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                self.keep_full_reload(full_reload);
                crate::log!("error"; "build task failed: {}", e);
                return;
            }
        };

        let msg = match result.outcome {
            Ok(artifacts) => ReloadMsg::BuildSucceeded {
                artifacts,
                out_dir: config.module.out_dir.clone(),
                elapsed: result.elapsed,
                full_reload,
            },
            Err(err) => {
                self.keep_full_reload(full_reload);
                // Raw toolchain output first, the status block below it
                status_detach();
                write_raw_diagnostics(&err);
                status_error(&format!("build failed: {err}"), "");
                ReloadMsg::BuildFailed(err)
            }
        };

        let _ = self.reload_tx.send(msg).await;
    }

    /// A failed build hands its full reload on to the next one.
    fn keep_full_reload(&mut self, reason: Option<String>) {
        if self.full_reload.is_none() {
            self.full_reload = reason;
        }
    }
}

/// Wait for the running build (pends forever if none).
async fn wait_build(task: &mut Option<BuildTask>) -> Result<BuildResult, JoinError> {
    match task {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
