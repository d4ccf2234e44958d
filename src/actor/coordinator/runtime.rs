use std::time::Duration;

use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use crate::actor::build::BuildActor;
use crate::actor::fs::FsActor;
use crate::actor::messages::{BuildMsg, ReloadMsg, WsMsg};
use crate::actor::reload::ReloadActor;
use crate::actor::ws::WsActor;

pub(super) struct Actors {
    pub(super) fs: Option<FsActor>,
    pub(super) build: BuildActor,
    pub(super) reload: ReloadActor,
    pub(super) ws: WsActor,
}

pub(super) struct Senders {
    pub(super) build: mpsc::Sender<BuildMsg>,
    pub(super) reload: mpsc::Sender<ReloadMsg>,
    pub(super) ws: mpsc::Sender<WsMsg>,
}

/// Run all actors concurrently until the shutdown signal (or until one of
/// them stops), then shut the pipeline down front to back.
pub(super) async fn run_actors(actors: Actors, senders: Senders, shutdown_rx: Option<Receiver<()>>) {
    let fs_handle = actors.fs.map(|fs| tokio::spawn(fs.run()));
    let mut build_handle = tokio::spawn(actors.build.run());
    let reload_handle = tokio::spawn(actors.reload.run());
    let ws_handle = tokio::spawn(actors.ws.run());

    match shutdown_rx {
        Some(rx) => loop {
            if rx.try_recv().is_ok() || crate::core::is_shutdown() {
                crate::debug!("actor"; "shutdown signal received");
                break;
            }
            if build_handle.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        },
        None => {
            let _ = (&mut build_handle).await;
        }
    }

    if let Some(handle) = fs_handle {
        handle.abort();
    }
    let _ = senders.build.send(BuildMsg::Shutdown).await;
    let _ = senders.reload.send(ReloadMsg::Shutdown).await;
    let _ = senders.ws.send(WsMsg::Shutdown).await;

    let grace = Duration::from_millis(500);
    let _ = tokio::time::timeout(grace, build_handle).await;
    let _ = tokio::time::timeout(grace, reload_handle).await;
    let _ = tokio::time::timeout(grace, ws_handle).await;
}
