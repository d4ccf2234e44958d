//! Reload Actor - turns build output into session notifications.
//!
//! Owns the [`HotReloadCoordinator`]. Every decision goes two ways: to the
//! browser over WebSocket, and to in-process hosts over a broadcast channel
//! (see `CommandQueue::follow`).

use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};

use super::messages::{ReloadMsg, WsMsg};
use crate::logger::{status_success, status_unchanged};
use crate::reload::{HotReloadCoordinator, HotReloadMessage, ReloadEvent};

/// Output events this long after a failed build still belong to it.
/// Every dropped event restarts the window.
const FAILED_OUTPUT_QUIET: Duration = Duration::from_millis(300);

pub struct ReloadActor {
    rx: mpsc::Receiver<ReloadMsg>,
    ws_tx: mpsc::Sender<WsMsg>,
    events_tx: broadcast::Sender<ReloadEvent>,
    coordinator: HotReloadCoordinator,
    /// A build is writing into `out_dir`; watcher echoes are its own
    building: bool,
    /// The browser currently shows a build error overlay
    showing_error: bool,
    /// Writes of the last failed build may still echo in until then
    failed_output_until: Option<Instant>,
}

impl ReloadActor {
    pub fn new(
        rx: mpsc::Receiver<ReloadMsg>,
        ws_tx: mpsc::Sender<WsMsg>,
        events_tx: broadcast::Sender<ReloadEvent>,
        coordinator: HotReloadCoordinator,
    ) -> Self {
        Self {
            rx,
            ws_tx,
            events_tx,
            coordinator,
            building: false,
            showing_error: false,
            failed_output_until: None,
        }
    }

    pub async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                ReloadMsg::BuildStarted => {
                    self.building = true;
                    self.failed_output_until = None;
                }
                ReloadMsg::BuildSucceeded {
                    artifacts,
                    out_dir,
                    elapsed,
                    full_reload,
                } => {
                    self.building = false;
                    self.failed_output_until = None;
                    if self.showing_error {
                        self.showing_error = false;
                        let _ = self.ws_tx.send(WsMsg::ClearError).await;
                    }

                    let event = if out_dir != self.coordinator.out_dir() {
                        let reason =
                            full_reload.unwrap_or_else(|| "output directory moved".to_string());
                        Some(self.coordinator.relocate(out_dir, reason))
                    } else if let Some(reason) = full_reload {
                        Some(self.coordinator.force_full_reload(reason))
                    } else {
                        self.coordinator.on_build_succeeded(&artifacts)
                    };

                    match event {
                        Some(event) => {
                            self.report(&event, Some(elapsed));
                            self.emit(event).await;
                        }
                        None => status_unchanged(&format!(
                            "rebuilt in {}, output unchanged",
                            format_elapsed(elapsed)
                        )),
                    }
                }
                ReloadMsg::BuildFailed(err) => {
                    self.building = false;
                    self.showing_error = true;
                    self.failed_output_until = Some(Instant::now() + FAILED_OUTPUT_QUIET);
                    let _ = self.ws_tx.send(WsMsg::Error(err.overlay_message())).await;
                }
                ReloadMsg::OutputChanged(paths) => {
                    if self.building {
                        crate::debug!("reload"; "ignoring {} paths written by the running build", paths.len());
                        continue;
                    }
                    let now = Instant::now();
                    if self.failed_output_until.is_some_and(|until| now < until) {
                        crate::debug!("reload"; "ignoring {} paths written by the failed build", paths.len());
                        self.failed_output_until = Some(now + FAILED_OUTPUT_QUIET);
                        continue;
                    }
                    // Echoes of a finished build hash-identical and yield nothing
                    if let Some(event) = self.coordinator.on_output_changed(&paths) {
                        crate::log!("reload"; "generated output changed outside a build");
                        self.report(&event, None);
                        self.emit(event).await;
                    }
                }
                ReloadMsg::Shutdown => break,
            }
        }
    }

    async fn emit(&mut self, event: ReloadEvent) {
        let msg = HotReloadMessage::from_event(&event, self.coordinator.out_dir());
        let _ = self.ws_tx.send(WsMsg::Broadcast(msg)).await;
        // No in-process subscribers is fine
        let _ = self.events_tx.send(event);
    }

    fn report(&self, event: &ReloadEvent, elapsed: Option<Duration>) {
        let prefix = match elapsed {
            Some(elapsed) => format!("rebuilt in {}", format_elapsed(elapsed)),
            None => "output changed".to_string(),
        };
        match event {
            ReloadEvent::LiveSwap { generation, .. } => {
                status_success(&format!("{prefix}, live swap to generation {generation}"));
            }
            ReloadEvent::FullReload { reason } => {
                status_success(&format!("{prefix}, full reload ({reason})"));
            }
        }
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    if elapsed.as_secs() >= 1 {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else {
        format!("{}ms", elapsed.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{BuildError, Stage};
    use crate::reload::message::{MODULE_SWAP, SPECIAL_UPDATE};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    struct Harness {
        temp: TempDir,
        reload_tx: mpsc::Sender<ReloadMsg>,
        ws_rx: mpsc::Receiver<WsMsg>,
        events_rx: broadcast::Receiver<ReloadEvent>,
    }

    fn write(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    /// `out_dir` seeded with the artifacts the session initially loaded.
    fn start() -> Harness {
        let temp = TempDir::new().unwrap();
        let out_dir = temp.path().join("pkg");
        std::fs::create_dir_all(&out_dir).unwrap();
        write(&out_dir, "engine_bg.wasm", b"wasm v1");
        write(&out_dir, "engine.js", b"glue v1");
        write(&out_dir, "engine.d.ts", b"decl v1");

        let (reload_tx, reload_rx) = mpsc::channel(32);
        let (ws_tx, ws_rx) = mpsc::channel(32);
        let (events_tx, events_rx) = broadcast::channel(16);
        let actor = ReloadActor::new(
            reload_rx,
            ws_tx,
            events_tx,
            HotReloadCoordinator::new(out_dir),
        );
        tokio::spawn(actor.run());

        Harness {
            temp,
            reload_tx,
            ws_rx,
            events_rx,
        }
    }

    impl Harness {
        fn out_dir(&self) -> PathBuf {
            self.temp.path().join("pkg")
        }

        fn artifacts(&self) -> Vec<PathBuf> {
            crate::build::list_artifacts(&self.out_dir())
        }

        async fn succeeded(&self, full_reload: Option<&str>) {
            self.reload_tx
                .send(ReloadMsg::BuildSucceeded {
                    artifacts: self.artifacts(),
                    out_dir: self.out_dir(),
                    elapsed: Duration::from_millis(1200),
                    full_reload: full_reload.map(String::from),
                })
                .await
                .unwrap();
        }

        async fn next_ws(&mut self) -> WsMsg {
            tokio::time::timeout(Duration::from_secs(5), self.ws_rx.recv())
                .await
                .expect("ws message")
                .expect("channel open")
        }

        async fn next_broadcast(&mut self) -> HotReloadMessage {
            match self.next_ws().await {
                WsMsg::Broadcast(msg) => msg,
                _ => panic!("expected a broadcast"),
            }
        }

        /// Round-trip through the actor so every earlier message was handled.
        async fn settle(&mut self) {
            self.reload_tx
                .send(ReloadMsg::BuildFailed(BuildError::MissingArtifact(PathBuf::from("sync"))))
                .await
                .unwrap();
            assert!(matches!(self.next_ws().await, WsMsg::Error(_)));
        }
    }

    fn custom_event(msg: &HotReloadMessage) -> &str {
        match msg {
            HotReloadMessage::Custom { event, .. } => event.as_str(),
            _ => panic!("expected a custom message"),
        }
    }

    #[tokio::test]
    async fn test_binary_change_live_swaps() {
        let mut h = start();
        write(&h.out_dir(), "engine_bg.wasm", b"wasm v2");

        h.succeeded(None).await;

        assert_eq!(custom_event(&h.next_broadcast().await), MODULE_SWAP);
        match h.events_rx.recv().await.unwrap() {
            ReloadEvent::LiveSwap {
                generation,
                artifacts,
            } => {
                assert_eq!(generation, 1);
                assert_eq!(artifacts.len(), 3);
            }
            other => panic!("expected LiveSwap, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_declaration_change_full_reloads() {
        let mut h = start();
        write(&h.out_dir(), "engine.d.ts", b"decl v2");

        h.succeeded(None).await;

        assert_eq!(custom_event(&h.next_broadcast().await), SPECIAL_UPDATE);
        assert!(matches!(
            h.events_rx.recv().await.unwrap(),
            ReloadEvent::FullReload { .. }
        ));
    }

    #[tokio::test]
    async fn test_identical_rebuild_emits_nothing() {
        let mut h = start();
        h.succeeded(None).await;
        h.settle().await;
        assert!(h.events_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failure_overlay_then_clear() {
        let mut h = start();

        h.reload_tx
            .send(ReloadMsg::BuildFailed(BuildError::Stage {
                stage: Stage::Compile,
                status: "exit status: 101".into(),
                stderr: b"error[E0425]: cannot find value `x`".to_vec(),
            }))
            .await
            .unwrap();
        match h.next_ws().await {
            WsMsg::Error(message) => assert!(message.contains("E0425")),
            _ => panic!("expected an error overlay"),
        }

        write(&h.out_dir(), "engine.js", b"glue v2");
        h.succeeded(None).await;
        assert!(matches!(h.next_ws().await, WsMsg::ClearError));
        assert_eq!(custom_event(&h.next_broadcast().await), MODULE_SWAP);
    }

    #[tokio::test]
    async fn test_output_written_during_build_is_ignored() {
        let mut h = start();
        h.reload_tx.send(ReloadMsg::BuildStarted).await.unwrap();

        // Half-written build output must not be swapped in
        let wasm = write(&h.out_dir(), "engine_bg.wasm", b"wasm v2");
        h.reload_tx
            .send(ReloadMsg::OutputChanged(vec![wasm.clone()]))
            .await
            .unwrap();

        h.succeeded(None).await;
        assert_eq!(custom_event(&h.next_broadcast().await), MODULE_SWAP);

        // Late echo of the same write
        h.reload_tx
            .send(ReloadMsg::OutputChanged(vec![wasm]))
            .await
            .unwrap();
        h.settle().await;

        assert!(h.events_rx.recv().await.is_ok());
        assert!(h.events_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_external_rewrite_goes_through_decision() {
        let mut h = start();
        let glue = write(&h.out_dir(), "engine.js", b"glue edited by hand");

        h.reload_tx
            .send(ReloadMsg::OutputChanged(vec![glue]))
            .await
            .unwrap();

        assert_eq!(custom_event(&h.next_broadcast().await), MODULE_SWAP);
    }

    #[tokio::test]
    async fn test_output_of_failed_build_is_not_adopted() {
        let mut h = start();
        h.reload_tx.send(ReloadMsg::BuildStarted).await.unwrap();

        // bindgen wrote the binary, then the build failed
        let wasm = write(&h.out_dir(), "engine_bg.wasm", b"wasm of a failed build");
        h.reload_tx
            .send(ReloadMsg::BuildFailed(BuildError::MissingArtifact(
                h.out_dir().join("engine.js"),
            )))
            .await
            .unwrap();
        assert!(matches!(h.next_ws().await, WsMsg::Error(_)));

        // The watcher delivers those writes after the failure
        h.reload_tx
            .send(ReloadMsg::OutputChanged(vec![wasm.clone()]))
            .await
            .unwrap();
        h.settle().await;
        assert!(h.events_rx.try_recv().is_err());
        assert!(h.ws_rx.try_recv().is_err());

        // Once quiet, a hand-made rewrite is picked up again
        tokio::time::sleep(FAILED_OUTPUT_QUIET * 2).await;
        h.reload_tx
            .send(ReloadMsg::OutputChanged(vec![wasm]))
            .await
            .unwrap();
        assert_eq!(custom_event(&h.next_broadcast().await), MODULE_SWAP);
    }

    #[tokio::test]
    async fn test_moved_out_dir_relocates_coordinator() {
        let mut h = start();
        let moved = h.temp.path().join("dist");
        std::fs::create_dir_all(&moved).unwrap();
        write(&moved, "engine_bg.wasm", b"wasm v2");
        write(&moved, "engine.js", b"glue v1");
        write(&moved, "engine.d.ts", b"decl v1");

        h.reload_tx
            .send(ReloadMsg::BuildSucceeded {
                artifacts: crate::build::list_artifacts(&moved),
                out_dir: moved.clone(),
                elapsed: Duration::from_millis(900),
                full_reload: None,
            })
            .await
            .unwrap();
        assert_eq!(custom_event(&h.next_broadcast().await), SPECIAL_UPDATE);

        // Later swaps name artifacts under the new directory
        let wasm = write(&moved, "engine_bg.wasm", b"wasm v3");
        h.reload_tx
            .send(ReloadMsg::OutputChanged(vec![wasm]))
            .await
            .unwrap();
        let msg = h.next_broadcast().await;
        assert_eq!(custom_event(&msg), MODULE_SWAP);
        assert!(msg.to_json().contains("engine_bg.wasm"));
    }

    #[tokio::test]
    async fn test_config_change_full_reloads_without_diff() {
        let mut h = start();

        h.succeeded(Some("hotbridge.toml changed")).await;

        let msg = h.next_broadcast().await;
        assert_eq!(custom_event(&msg), SPECIAL_UPDATE);
        assert!(msg.to_json().contains("hotbridge.toml changed"));
    }
}
