//! Actor Coordinator - Wires up the watch/build/reload actor system
//!
//! The Coordinator is a thin orchestrator that:
//! - Creates communication channels
//! - Attaches the watcher before anything is built
//! - Wires up actors and queues the initial build
//! - Runs them until shutdown

mod runtime;
mod watch_paths;

pub(crate) use watch_paths::collect_watch_paths;

use std::sync::Arc;

use anyhow::Result;
use crossbeam::channel::Receiver;
use tokio::sync::{broadcast, mpsc};

use super::build::{BuildActor, ToolchainFactory};
use super::fs::FsActor;
use super::messages::{BuildMsg, ReloadMsg, WsMsg};
use super::reload::ReloadActor;
use super::ws::WsActor;
use crate::build::{ProcessToolchain, Toolchain};
use crate::config::BridgeConfig;
use crate::reload::{HotReloadCoordinator, ReloadEvent};

const CHANNEL_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 16;

/// Coordinator - wires up and runs the actor system.
pub struct Coordinator {
    config: Arc<BridgeConfig>,
    watch: bool,
    ws_port: Option<u16>,
    shutdown_rx: Option<Receiver<()>>,
    events_tx: broadcast::Sender<ReloadEvent>,
    toolchain_for: ToolchainFactory,
}

impl Coordinator {
    pub fn with_config(config: Arc<BridgeConfig>) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            watch: config.serve.watch,
            config,
            ws_port: None,
            shutdown_rx: None,
            events_tx,
            toolchain_for: Box::new(|config: &BridgeConfig| {
                Arc::new(ProcessToolchain::from_config(config)) as Arc<dyn Toolchain>
            }),
        }
    }

    /// Set WebSocket port.
    pub fn with_ws_port(mut self, port: u16) -> Self {
        self.ws_port = Some(port);
        self
    }

    /// Set shutdown signal receiver.
    pub fn with_shutdown_signal(mut self, rx: Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    /// Replace the subprocess toolchain.
    pub fn with_toolchain(mut self, toolchain_for: ToolchainFactory) -> Self {
        self.toolchain_for = toolchain_for;
        self
    }

    /// Reload decisions for in-process hosts (see `CommandQueue::follow`).
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.events_tx.subscribe()
    }

    /// Run the actor system until shutdown.
    pub async fn run(mut self) -> Result<()> {
        let (build_tx, build_rx) = mpsc::channel::<BuildMsg>(CHANNEL_BUFFER);
        let (reload_tx, reload_rx) = mpsc::channel::<ReloadMsg>(CHANNEL_BUFFER);
        let (ws_tx, ws_rx) = mpsc::channel::<WsMsg>(CHANNEL_BUFFER);

        if let Some(port) = self.ws_port {
            let interface = self.config.serve.interface;
            match crate::reload::server::start_ws_server_with_channel(interface, port, ws_tx.clone()) {
                Ok(actual) => crate::log!("serve"; "session socket on ws://{}:{}", interface, actual),
                Err(e) => crate::log!("actor"; "websocket server failed: {}", e),
            }
        }

        // Watcher first: changes made during the initial build are buffered
        let fs_actor = if self.watch {
            let paths = collect_watch_paths(&self.config);
            let actor = FsActor::new(paths, build_tx.clone(), reload_tx.clone(), &self.config)
                .map_err(|e| anyhow::anyhow!("watcher failed: {}", e))?;
            Some(actor)
        } else {
            None
        };

        let reload_actor = ReloadActor::new(
            reload_rx,
            ws_tx.clone(),
            self.events_tx.clone(),
            HotReloadCoordinator::new(self.config.module.out_dir.clone()),
        );
        let build_actor = BuildActor::new(
            build_rx,
            reload_tx.clone(),
            Arc::clone(&self.config),
            self.toolchain_for,
        );
        let ws_actor = WsActor::new(ws_rx);

        build_tx.send(BuildMsg::BuildNow).await?;

        crate::debug!("actor"; "start");
        let shutdown_rx = self.shutdown_rx.take();
        runtime::run_actors(
            runtime::Actors {
                fs: fs_actor,
                build: build_actor,
                reload: reload_actor,
                ws: ws_actor,
            },
            runtime::Senders {
                build: build_tx,
                reload: reload_tx,
                ws: ws_tx,
            },
            shutdown_rx,
        )
        .await;

        crate::debug!("actor"; "stopped");
        Ok(())
    }
}
